//! `HfGlobal`: VarDCT's dequantization matrix set and HF entropy coding
//! tables. Entirely VarDCT-specific; skipped past using its
//! table-of-contents byte size like every other VarDCT-only section.

/// Marker type: an `HfGlobal` section carries no state this crate retains,
/// it is only ever skipped via [`super::toc::take_group`].
#[derive(Debug, Clone, Copy)]
pub struct HfGlobal;
