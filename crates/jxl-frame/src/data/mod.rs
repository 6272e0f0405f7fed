//! Per-section bitstream records that make up a frame's payload, one
//! module per table-of-contents entry kind.

pub mod hf_global;
pub mod lf_global;
pub mod lf_group;
pub mod noise;
pub mod pass_group;
pub mod patch;
pub mod spline;
pub mod toc;

pub use lf_global::{GlobalModular, LfGlobal, LfGlobalParams, LfGlobalVarDct};
pub use noise::NoiseParameters;
pub use patch::Patches;
pub use spline::Splines;
pub use toc::{Toc, TocGroup, TocGroupKind};
