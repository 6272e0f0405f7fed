//! JPEG XL image header: size information, extra-channel/colour/bit-depth
//! metadata, and the opaque colour-encoding tag set carried once per
//! codestream and referenced by every frame.

mod colour;
mod error;
mod header;

pub use colour::{
    ColourEncoding, ColourSpace, Customxy, EnumColourEncoding, OpsinInverseMatrix, Primaries,
    RenderingIntent, ToneMapping, TransferFunction, WhitePoint,
};
pub use error::{Error, Result};
pub use header::{
    AnimationHeader, BitDepth, Extensions, ExtraChannelInfo, ExtraChannelType, ImageHeader,
    ImageMetadata, PreviewHeader, SizeHeader,
};
