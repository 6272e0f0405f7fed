//! Per-LF-group sections: VarDCT's per-group LF coefficients and HF block
//! metadata, plus (for a subset of Modular frames) additional tiled
//! Modular channel data.
//!
//! `LfGlobal`'s global Modular decode (see `lf_global.rs`) only covers the
//! whole pixel grid for single-group, single-pass frames; `crate::Frame::parse`
//! rejects any frame whose table of contents has more than one entry before
//! this module is ever reached (`Error::UnsupportedMultiGroupModular`), so by
//! the time a `TocGroupKind::LfGroup` section would be dispatched here it is
//! only ever skipped past using its table-of-contents byte size, the same way
//! VarDCT's own per-group sections are skipped.

/// Marker type: an `LfGroup` section carries no state this crate retains,
/// it is only ever skipped via [`super::toc::take_group`].
#[derive(Debug, Clone, Copy)]
pub struct LfGroup;
