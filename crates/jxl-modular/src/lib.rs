//! JPEG XL Modular image decoder: prediction, meta-adaptive trees, the
//! entropy-coded pixel loop, and the inverse transforms (RCT, Palette) that
//! sit between the bitstream and the final channel planes.

mod error;
mod image;
mod ma;
mod param;
mod predictor;
mod sample;
mod transform;

pub use error::{Error, Result};
pub use image::ModularImageDestination;
pub use ma::{MaConfig, MaConfigParams};
pub use param::{ChannelShift, ModularChannelParams, ModularParams};
pub use predictor::{Predictor, WpHeader};
pub use sample::Sample;
pub use transform::TransformInfo;

use jxl_bitstream::{Bitstream, U32Specifier::{BitsOffset, Constant}};
use jxl_bundle::Bundle;

/// The per-sub-image header: whether to reuse the frame's global
/// meta-adaptive tree, the weighted-predictor tuning parameters, and the
/// list of transforms (in encode order) applied on top of the raw channels.
#[derive(Debug, Clone)]
pub struct ModularHeader {
    pub use_global_tree: bool,
    pub wp_params: WpHeader,
    pub transform: Vec<TransformInfo>,
}

impl Bundle for ModularHeader {
    type Error = Error;

    fn parse(bitstream: &mut Bitstream, _ctx: ()) -> Result<Self> {
        let use_global_tree = bitstream.read_bool()?;
        let wp_params = WpHeader::parse(bitstream, ())?;
        let nb_transforms = bitstream.read_u32([
            Constant(0),
            Constant(1),
            BitsOffset(2, 4),
            BitsOffset(18, 8),
        ])?;
        if nb_transforms > 512 {
            return Err(Error::TooManyTransforms(nb_transforms));
        }
        let transform = (0..nb_transforms)
            .map(|_| TransformInfo::parse(bitstream, ()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { use_global_tree, wp_params, transform })
    }
}

/// A decoded Modular sub-image, still carrying its transform list until
/// [`ModularImageDestination::into_image_channels`] inverts it.
#[derive(Debug)]
pub struct Modular<S: Sample> {
    inner: Option<ModularImageDestination<S>>,
}

impl<S: Sample> Modular<S> {
    pub fn new(destination: ModularImageDestination<S>) -> Self {
        Self { inner: Some(destination) }
    }

    /// Inverts every transform and returns the final channel planes. `None`
    /// if called more than once.
    pub fn into_image_channels(mut self) -> Option<Result<Vec<jxl_grid::SimpleGrid<S>>>> {
        self.inner.take().map(|dest| dest.into_image_channels())
    }
}
