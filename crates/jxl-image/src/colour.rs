//! Colour encoding tag set: primaries, white point, transfer function and
//! rendering intent as opaque enumerations, plus tone mapping and the
//! opsin-inverse-matrix bundle. Full colorimetry (gamut conversion, ICC
//! profile synthesis) is out of scope; these types only carry the tags a
//! downstream colour pipeline would need.

use jxl_bitstream::{Bitstream, U32Specifier::{BitsOffset, Constant}, unpack_signed};
use jxl_bundle::Bundle;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub enum ColourEncoding {
    Enum(EnumColourEncoding),
    IccProfile(ColourSpace),
}

impl Default for ColourEncoding {
    fn default() -> Self {
        Self::Enum(EnumColourEncoding::default())
    }
}

impl Bundle for ColourEncoding {
    type Error = Error;

    fn parse(bitstream: &mut Bitstream, _ctx: ()) -> Result<Self> {
        let all_default = bitstream.read_bool()?;
        if all_default {
            return Ok(Self::default());
        }

        let want_icc = bitstream.read_bool()?;
        let colour_space: ColourSpace = bitstream.read_enum("ColourSpace")?;
        if want_icc {
            return Ok(Self::IccProfile(colour_space));
        }

        let white_point = if colour_space == ColourSpace::Xyb {
            WhitePoint::D65
        } else {
            WhitePoint::parse(bitstream, ())?
        };
        let primaries = if matches!(colour_space, ColourSpace::Xyb | ColourSpace::Grey) {
            Primaries::Srgb
        } else {
            Primaries::parse(bitstream, ())?
        };
        let tf = TransferFunction::parse(bitstream, ())?;
        let rendering_intent: RenderingIntent = bitstream.read_enum("RenderingIntent")?;

        Ok(Self::Enum(EnumColourEncoding { colour_space, white_point, primaries, tf, rendering_intent }))
    }
}

impl ColourEncoding {
    #[inline]
    pub fn colour_space(&self) -> ColourSpace {
        match self {
            Self::Enum(e) => e.colour_space,
            Self::IccProfile(cs) => *cs,
        }
    }

    #[inline]
    pub fn want_icc(&self) -> bool {
        matches!(self, Self::IccProfile(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnumColourEncoding {
    pub colour_space: ColourSpace,
    pub white_point: WhitePoint,
    pub primaries: Primaries,
    pub tf: TransferFunction,
    pub rendering_intent: RenderingIntent,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ColourSpace {
    #[default]
    Rgb = 0,
    Grey = 1,
    Xyb = 2,
    Unknown = 3,
}

impl TryFrom<u32> for ColourSpace {
    type Error = ();

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Rgb,
            1 => Self::Grey,
            2 => Self::Xyb,
            3 => Self::Unknown,
            _ => return Err(()),
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Customxy {
    pub x: i32,
    pub y: i32,
}

impl Bundle for Customxy {
    type Error = Error;

    fn parse(bitstream: &mut Bitstream, _ctx: ()) -> Result<Self> {
        let read_coord = |bitstream: &mut Bitstream| -> Result<i32> {
            let raw = bitstream.read_u32([
                BitsOffset(0, 19),
                BitsOffset(524288, 19),
                BitsOffset(1048576, 20),
                BitsOffset(2097152, 21),
            ])?;
            Ok(unpack_signed(raw))
        };
        let x = read_coord(bitstream)?;
        let y = read_coord(bitstream)?;
        Ok(Self { x, y })
    }
}

impl Customxy {
    #[inline]
    pub fn as_float(self) -> [f32; 2] {
        [self.x as f32 / 1e6, self.y as f32 / 1e6]
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum WhitePoint {
    #[default]
    D65,
    Custom(Customxy),
    E,
    Dci,
}

impl Bundle for WhitePoint {
    type Error = Error;

    fn parse(bitstream: &mut Bitstream, _ctx: ()) -> Result<Self> {
        let discriminant = bitstream.read_enum::<WhitePointDiscriminator>("WhitePoint")?;
        Ok(match discriminant {
            WhitePointDiscriminator::D65 => Self::D65,
            WhitePointDiscriminator::E => Self::E,
            WhitePointDiscriminator::Dci => Self::Dci,
            WhitePointDiscriminator::Custom => Self::Custom(Customxy::parse(bitstream, ())?),
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
enum WhitePointDiscriminator {
    D65 = 1,
    Custom = 2,
    E = 10,
    Dci = 11,
}

impl TryFrom<u32> for WhitePointDiscriminator {
    type Error = ();

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        Ok(match value {
            1 => Self::D65,
            2 => Self::Custom,
            10 => Self::E,
            11 => Self::Dci,
            _ => return Err(()),
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Primaries {
    #[default]
    Srgb,
    Custom { red: Customxy, green: Customxy, blue: Customxy },
    Bt2100,
    P3,
}

impl Bundle for Primaries {
    type Error = Error;

    fn parse(bitstream: &mut Bitstream, _ctx: ()) -> Result<Self> {
        let discriminant = bitstream.read_enum::<PrimariesDiscriminator>("Primaries")?;
        Ok(match discriminant {
            PrimariesDiscriminator::Srgb => Self::Srgb,
            PrimariesDiscriminator::Bt2100 => Self::Bt2100,
            PrimariesDiscriminator::P3 => Self::P3,
            PrimariesDiscriminator::Custom => {
                let red = Customxy::parse(bitstream, ())?;
                let green = Customxy::parse(bitstream, ())?;
                let blue = Customxy::parse(bitstream, ())?;
                Self::Custom { red, green, blue }
            }
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
enum PrimariesDiscriminator {
    Srgb = 1,
    Custom = 2,
    Bt2100 = 9,
    P3 = 11,
}

impl TryFrom<u32> for PrimariesDiscriminator {
    type Error = ();

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        Ok(match value {
            1 => Self::Srgb,
            2 => Self::Custom,
            9 => Self::Bt2100,
            11 => Self::P3,
            _ => return Err(()),
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum RenderingIntent {
    Perceptual = 0,
    #[default]
    Relative = 1,
    Saturation = 2,
    Absolute = 3,
}

impl TryFrom<u32> for RenderingIntent {
    type Error = ();

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Perceptual,
            1 => Self::Relative,
            2 => Self::Saturation,
            3 => Self::Absolute,
            _ => return Err(()),
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum TransferFunction {
    Gamma(u32),
    Bt709,
    Unknown,
    Linear,
    #[default]
    Srgb,
    Pq,
    Dci,
    Hlg,
}

impl TryFrom<u32> for TransferFunction {
    type Error = ();

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        Ok(match value {
            1 => Self::Bt709,
            2 => Self::Unknown,
            8 => Self::Linear,
            13 => Self::Srgb,
            16 => Self::Pq,
            17 => Self::Dci,
            18 => Self::Hlg,
            _ => return Err(()),
        })
    }
}

impl Bundle for TransferFunction {
    type Error = Error;

    fn parse(bitstream: &mut Bitstream, _ctx: ()) -> Result<Self> {
        let has_gamma = bitstream.read_bool()?;
        if has_gamma {
            let gamma = bitstream.read_bits(24)?;
            Ok(Self::Gamma(gamma))
        } else {
            Ok(bitstream.read_enum::<TransferFunction>("TransferFunction")?)
        }
    }
}

/// HDR-to-SDR tone mapping parameters.
#[derive(Debug, Clone, Copy)]
pub struct ToneMapping {
    pub intensity_target: f32,
    pub min_nits: f32,
    pub relative_to_max_display: bool,
    pub linear_below: f32,
}

impl Default for ToneMapping {
    fn default() -> Self {
        Self { intensity_target: 255.0, min_nits: 0.0, relative_to_max_display: false, linear_below: 0.0 }
    }
}

impl Bundle for ToneMapping {
    type Error = Error;

    fn parse(bitstream: &mut Bitstream, _ctx: ()) -> Result<Self> {
        let all_default = bitstream.read_bool()?;
        if all_default {
            return Ok(Self::default());
        }
        let intensity_target = bitstream.read_f16_as_f32()?;
        let min_nits = bitstream.read_f16_as_f32()?;
        let relative_to_max_display = bitstream.read_bool()?;
        let linear_below = bitstream.read_f16_as_f32()?;
        Ok(Self { intensity_target, min_nits, relative_to_max_display, linear_below })
    }
}

/// The matrix and biases used to map XYB-encoded samples back to linear
/// sRGB-primaried light, with the bitstream's built-in default values.
#[derive(Debug, Clone, Copy)]
pub struct OpsinInverseMatrix {
    pub inv_mat: [[f32; 3]; 3],
    pub opsin_bias: [f32; 3],
    pub quant_bias: [f32; 3],
    pub quant_bias_numerator: f32,
}

impl Default for OpsinInverseMatrix {
    fn default() -> Self {
        Self {
            inv_mat: [
                [11.031566901960783, -9.866943921568629, -0.16462299647058826],
                [-3.254147380392157, 4.418770392156863, -0.16462299647058826],
                [-3.6588512862745097, 2.7129230470588235, 1.9459282392156863],
            ],
            opsin_bias: [-0.0037930732552754493; 3],
            quant_bias: [
                1.0 - 0.05465007330715401,
                1.0 - 0.07005449891748593,
                1.0 - 0.049935103337343655,
            ],
            quant_bias_numerator: 0.145,
        }
    }
}

impl Bundle for OpsinInverseMatrix {
    type Error = Error;

    fn parse(bitstream: &mut Bitstream, _ctx: ()) -> Result<Self> {
        let all_default = bitstream.read_bool()?;
        if all_default {
            return Ok(Self::default());
        }
        let mut inv_mat = [[0f32; 3]; 3];
        for row in &mut inv_mat {
            for v in row.iter_mut() {
                *v = bitstream.read_f16_as_f32()?;
            }
        }
        let mut opsin_bias = [0f32; 3];
        for v in &mut opsin_bias {
            *v = bitstream.read_f16_as_f32()?;
        }
        let mut quant_bias = [0f32; 3];
        for v in &mut quant_bias {
            *v = bitstream.read_f16_as_f32()?;
        }
        let quant_bias_numerator = bitstream.read_f16_as_f32()?;
        Ok(Self { inv_mat, opsin_bias, quant_bias, quant_bias_numerator })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_default_colour_encoding_is_srgb_tagged() {
        let mut bs = Bitstream::new(&[0b1]);
        let ce = ColourEncoding::parse(&mut bs, ()).unwrap();
        assert_eq!(ce.colour_space(), ColourSpace::Rgb);
        assert!(!ce.want_icc());
    }

    #[test]
    fn all_default_tone_mapping() {
        let mut bs = Bitstream::new(&[0b1]);
        let tm = ToneMapping::parse(&mut bs, ()).unwrap();
        assert_eq!(tm.intensity_target, 255.0);
    }
}
