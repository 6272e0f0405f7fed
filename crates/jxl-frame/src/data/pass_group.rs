//! Per-pass, per-group sections: VarDCT's HF coefficients, plus any
//! remaining tiled Modular channel data. `crate::Frame::parse` rejects
//! multi-group/multi-pass frames up front (see [`super::lf_group`]), so
//! this module only ever needs to skip past a section using its
//! table-of-contents byte size.

/// Marker type: a `GroupPass` section carries no state this crate retains,
/// it is only ever skipped via [`super::toc::take_group`].
#[derive(Debug, Clone, Copy)]
pub struct PassGroup;
