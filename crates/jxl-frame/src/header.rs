//! Frame header: geometry, encoding mode, blending/reference plumbing, pass
//! plan, and the restoration filter parameters nested inside it.

use jxl_bitstream::{
    unpack_signed, Bitstream,
    U32Specifier::{BitsOffset, Constant},
};
use jxl_bundle::{Bundle, Name};
use jxl_image::{BitDepth, Extensions, ImageHeader, SizeHeader};

use crate::filter::{EdgePreservingFilter, Gabor};
use crate::Result;

/// Frame header, parsed against the already-decoded image header (it
/// supplies several defaults: canvas size, bit depth, extra-channel count).
#[derive(Debug, Clone)]
pub struct FrameHeader {
    pub frame_type: FrameType,
    pub encoding: Encoding,
    pub flags: FrameFlags,
    pub do_ycbcr: bool,
    encoded_color_channels: u32,
    pub jpeg_upsampling: [u32; 3],
    pub upsampling: u32,
    pub ec_upsampling: Vec<u32>,
    pub group_size_shift: u32,
    pub x_qm_scale: u32,
    pub b_qm_scale: u32,
    pub passes: Passes,
    pub lf_level: u32,
    pub have_crop: bool,
    pub x0: i32,
    pub y0: i32,
    pub width: u32,
    pub height: u32,
    pub blending_info: BlendingInfo,
    pub ec_blending_info: Vec<BlendingInfo>,
    pub duration: u32,
    pub timecode: u32,
    pub is_last: bool,
    pub save_as_reference: u32,
    pub resets_canvas: bool,
    pub save_before_ct: bool,
    pub name: Name,
    pub restoration_filter: RestorationFilter,
    pub extensions: Extensions,
    pub bit_depth: BitDepth,
}

impl Bundle<&ImageHeader> for FrameHeader {
    type Error = crate::Error;

    fn parse(bitstream: &mut Bitstream<'_>, headers: &ImageHeader) -> Result<Self> {
        let all_default = bitstream.read_bool()?;

        let frame_type = if !all_default { FrameType::parse(bitstream, ())? } else { FrameType::RegularFrame };
        let encoding = if !all_default { Encoding::parse(bitstream, ())? } else { Encoding::VarDct };
        let flags = if !all_default { FrameFlags::parse(bitstream, ())? } else { FrameFlags::default() };
        let do_ycbcr = if !all_default && !headers.metadata.xyb_encoded { bitstream.read_bool()? } else { false };

        let actually_grayscale = encoding == Encoding::Modular
            && !do_ycbcr
            && !headers.metadata.xyb_encoded
            && headers.metadata.grayscale();
        let encoded_color_channels = if actually_grayscale { 1 } else { 3 };

        let jpeg_upsampling = if do_ycbcr && !flags.use_lf_frame() {
            let mut out = [0u32; 3];
            for v in &mut out {
                *v = bitstream.read_bits(2)?;
            }
            out
        } else {
            [0; 3]
        };

        let upsampling = if !all_default && !flags.use_lf_frame() {
            bitstream.read_u32([Constant(1), Constant(2), Constant(4), Constant(8)])?
        } else {
            1
        };

        let ec_upsampling = if !all_default && !flags.use_lf_frame() {
            (0..headers.metadata.ec_info.len())
                .map(|_| bitstream.read_u32([Constant(1), Constant(2), Constant(4), Constant(8)]))
                .collect::<std::result::Result<Vec<_>, _>>()?
        } else {
            vec![1; headers.metadata.ec_info.len()]
        };

        let group_size_shift = if encoding == Encoding::Modular { bitstream.read_bits(2)? } else { 1 };

        let default_xqms = if headers.metadata.xyb_encoded && encoding == Encoding::VarDct { 3 } else { 2 };
        let x_qm_scale = if !all_default && headers.metadata.xyb_encoded && encoding == Encoding::VarDct {
            bitstream.read_bits(3)?
        } else {
            default_xqms
        };
        let b_qm_scale = if !all_default && headers.metadata.xyb_encoded && encoding == Encoding::VarDct {
            bitstream.read_bits(3)?
        } else {
            2
        };

        let passes = if !all_default && frame_type != FrameType::ReferenceOnly {
            Passes::parse(bitstream, ())?
        } else {
            Passes::default()
        };

        let lf_level = if frame_type == FrameType::LfFrame { 1 + bitstream.read_bits(2)? } else { 0 };

        let have_crop = if !all_default && frame_type != FrameType::LfFrame { bitstream.read_bool()? } else { false };

        let (x0, y0) = if have_crop && frame_type != FrameType::ReferenceOnly {
            let x0 = unpack_signed(bitstream.read_u32([
                BitsOffset(0, 8),
                BitsOffset(256, 11),
                BitsOffset(2304, 14),
                BitsOffset(18688, 30),
            ])?);
            let y0 = unpack_signed(bitstream.read_u32([
                BitsOffset(0, 8),
                BitsOffset(256, 11),
                BitsOffset(2304, 14),
                BitsOffset(18688, 30),
            ])?);
            (x0, y0)
        } else {
            (0, 0)
        };

        let width = if have_crop {
            bitstream.read_u32([
                BitsOffset(0, 8),
                BitsOffset(256, 11),
                BitsOffset(2304, 14),
                BitsOffset(18688, 30),
            ])?
        } else {
            headers.size.width
        };
        let height = if have_crop {
            bitstream.read_u32([
                BitsOffset(0, 8),
                BitsOffset(256, 11),
                BitsOffset(2304, 14),
                BitsOffset(18688, 30),
            ])?
        } else {
            headers.size.height
        };

        let canvas = CanvasSizeParams { have_crop, x0, y0, width, height, size: &headers.size };
        let has_ec = !headers.metadata.ec_info.is_empty();

        let blending_info = if !all_default && frame_type.is_normal_frame() {
            BlendingInfo::parse(bitstream, (has_ec, None, canvas))?
        } else {
            BlendingInfo::default()
        };
        let ec_blending_info = if !all_default && frame_type.is_normal_frame() {
            (0..headers.metadata.ec_info.len())
                .map(|_| BlendingInfo::parse(bitstream, (has_ec, Some(blending_info.mode), canvas)))
                .collect::<Result<Vec<_>>>()?
        } else {
            vec![BlendingInfo::default(); headers.metadata.ec_info.len()]
        };

        let duration = if !all_default && frame_type.is_normal_frame() && headers.metadata.animation.is_some() {
            bitstream.read_u32([Constant(0), Constant(1), BitsOffset(0, 8), BitsOffset(0, 32)])?
        } else {
            0
        };
        let has_timecodes = headers.metadata.animation.as_ref().map(|a| a.have_timecodes).unwrap_or(false);
        let timecode = if !all_default && frame_type.is_normal_frame() && has_timecodes {
            bitstream.read_bits(32)?
        } else {
            0
        };

        let is_last = if !all_default && frame_type.is_normal_frame() {
            bitstream.read_bool()?
        } else {
            frame_type == FrameType::RegularFrame
        };

        let save_as_reference = if !all_default && frame_type != FrameType::LfFrame && !is_last {
            bitstream.read_bits(2)?
        } else {
            0
        };

        let resets_canvas = FrameHeader::resets_canvas(blending_info.mode, canvas);

        let save_before_ct_cond = !all_default
            && (frame_type == FrameType::ReferenceOnly
                || (resets_canvas
                    && !is_last
                    && (duration == 0 || save_as_reference != 0)
                    && frame_type != FrameType::LfFrame));
        let save_before_ct = if save_before_ct_cond { bitstream.read_bool()? } else { !frame_type.is_normal_frame() };

        let name = if !all_default { Name::parse(bitstream, ())? } else { Name::default() };
        let restoration_filter =
            if !all_default { RestorationFilter::parse(bitstream, encoding)? } else { RestorationFilter::default() };
        let extensions = if !all_default { Extensions::parse(bitstream, ())? } else { Extensions::default() };
        let bit_depth = headers.metadata.bit_depth;

        Ok(Self {
            frame_type,
            encoding,
            flags,
            do_ycbcr,
            encoded_color_channels,
            jpeg_upsampling,
            upsampling,
            ec_upsampling,
            group_size_shift,
            x_qm_scale,
            b_qm_scale,
            passes,
            lf_level,
            have_crop,
            x0,
            y0,
            width,
            height,
            blending_info,
            ec_blending_info,
            duration,
            timecode,
            is_last,
            save_as_reference,
            resets_canvas,
            save_before_ct,
            name,
            restoration_filter,
            extensions,
            bit_depth,
        })
    }
}

#[derive(Clone, Copy)]
struct CanvasSizeParams<'a> {
    have_crop: bool,
    x0: i32,
    y0: i32,
    width: u32,
    height: u32,
    size: &'a SizeHeader,
}

impl FrameHeader {
    fn test_full_image(canvas_size: CanvasSizeParams) -> bool {
        let CanvasSizeParams { x0, y0, width, height, size, .. } = canvas_size;
        if x0 > 0 || y0 > 0 {
            return false;
        }
        let right = x0 as i64 + width as i64;
        let bottom = y0 as i64 + height as i64;
        (right >= size.width as i64) && (bottom >= size.height as i64)
    }

    fn resets_canvas(blending_mode: BlendMode, canvas_size: CanvasSizeParams) -> bool {
        blending_mode == BlendMode::Replace && (!canvas_size.have_crop || Self::test_full_image(canvas_size))
    }

    /// Returns whether this frame is a keyframe that should be displayed.
    #[inline]
    pub fn is_keyframe(&self) -> bool {
        self.frame_type.is_normal_frame() && (self.is_last || self.duration != 0)
    }

    #[inline]
    pub fn can_reference(&self) -> bool {
        !self.is_last && (self.duration == 0 || self.save_as_reference != 0) && self.frame_type != FrameType::LfFrame
    }

    pub fn sample_width(&self, upsampling: u32) -> u32 {
        let mut width = self.width;
        if upsampling > 1 {
            width = width.div_ceil(upsampling);
        }
        if self.lf_level > 0 {
            let div = 1u32 << (3 * self.lf_level);
            width = width.div_ceil(div);
        }
        width
    }

    pub fn sample_height(&self, upsampling: u32) -> u32 {
        let mut height = self.height;
        if upsampling > 1 {
            height = height.div_ceil(upsampling);
        }
        if self.lf_level > 0 {
            let div = 1u32 << (3 * self.lf_level);
            height = height.div_ceil(div);
        }
        height
    }

    pub fn color_sample_width(&self) -> u32 {
        self.sample_width(self.upsampling)
    }

    pub fn color_sample_height(&self) -> u32 {
        self.sample_height(self.upsampling)
    }

    /// Number of channels actually encoded in the bitstream for this frame
    /// (before extra channels): 1 for non-XYB grayscale Modular, 3 otherwise.
    #[inline]
    pub fn encoded_color_channels(&self) -> usize {
        self.encoded_color_channels as usize
    }

    pub fn group_dim(&self) -> u32 {
        128 << self.group_size_shift
    }

    pub fn lf_group_dim(&self) -> u32 {
        self.group_dim() * 8
    }

    pub fn groups_per_row(&self) -> u32 {
        self.color_sample_width().div_ceil(self.group_dim())
    }

    pub fn lf_groups_per_row(&self) -> u32 {
        self.color_sample_width().div_ceil(self.lf_group_dim())
    }

    pub fn num_groups(&self) -> u32 {
        self.groups_per_row() * self.color_sample_height().div_ceil(self.group_dim())
    }

    pub fn num_lf_groups(&self) -> u32 {
        self.lf_groups_per_row() * self.color_sample_height().div_ceil(self.lf_group_dim())
    }

    pub fn group_size_for(&self, group_idx: u32) -> (u32, u32) {
        self.size_for(self.group_dim(), group_idx)
    }

    pub fn lf_group_size_for(&self, lf_group_idx: u32) -> (u32, u32) {
        self.size_for(self.lf_group_dim(), lf_group_idx)
    }

    fn size_for(&self, group_dim: u32, group_idx: u32) -> (u32, u32) {
        let width = self.color_sample_width();
        let height = self.color_sample_height();
        let full_rows = height / group_dim;
        let rows_remainder = height % group_dim;
        let full_cols = width / group_dim;
        let cols_remainder = width % group_dim;

        let stride = full_cols + (cols_remainder > 0) as u32;
        let row = group_idx / stride;
        let col = group_idx % stride;

        let group_width = if col >= full_cols { cols_remainder } else { group_dim };
        let group_height = if row >= full_rows { rows_remainder } else { group_dim };
        (group_width, group_height)
    }

    pub fn lf_group_idx_from_group_idx(&self, group_idx: u32) -> u32 {
        let groups_per_row = self.groups_per_row();
        let lf_group_col = (group_idx % groups_per_row) / 8;
        let lf_group_row = (group_idx / groups_per_row) / 8;
        lf_group_col + lf_group_row * self.lf_groups_per_row()
    }
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum FrameType {
    #[default]
    RegularFrame = 0,
    LfFrame,
    ReferenceOnly,
    SkipProgressive,
}

impl FrameType {
    pub fn is_normal_frame(&self) -> bool {
        matches!(self, Self::RegularFrame | Self::SkipProgressive)
    }

    pub fn is_progressive_frame(&self) -> bool {
        matches!(self, Self::RegularFrame | Self::LfFrame)
    }
}

impl<Ctx> Bundle<Ctx> for FrameType {
    type Error = crate::Error;

    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        Ok(match bitstream.read_bits(2)? {
            0 => Self::RegularFrame,
            1 => Self::LfFrame,
            2 => Self::ReferenceOnly,
            3 => Self::SkipProgressive,
            _ => unreachable!("read_bits(2) is < 4"),
        })
    }
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum Encoding {
    #[default]
    VarDct = 0,
    Modular,
}

impl<Ctx> Bundle<Ctx> for Encoding {
    type Error = crate::Error;

    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        Ok(match bitstream.read_bits(1)? {
            0 => Self::VarDct,
            1 => Self::Modular,
            _ => unreachable!("read_bits(1) is < 2"),
        })
    }
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct FrameFlags(u64);

impl FrameFlags {
    const NOISE: u64 = 0x1;
    const PATCHES: u64 = 0x2;
    const SPLINES: u64 = 0x10;
    const USE_LF_FRAME: u64 = 0x20;
    const SKIP_ADAPTIVE_LF_SMOOTHING: u64 = 0x80;

    pub fn noise(&self) -> bool {
        self.0 & Self::NOISE != 0
    }

    pub fn patches(&self) -> bool {
        self.0 & Self::PATCHES != 0
    }

    pub fn splines(&self) -> bool {
        self.0 & Self::SPLINES != 0
    }

    pub fn use_lf_frame(&self) -> bool {
        self.0 & Self::USE_LF_FRAME != 0
    }

    pub fn skip_adaptive_lf_smoothing(&self) -> bool {
        self.0 & Self::SKIP_ADAPTIVE_LF_SMOOTHING != 0
    }
}

impl<Ctx> Bundle<Ctx> for FrameFlags {
    type Error = crate::Error;

    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        Ok(Self(bitstream.read_u64()?))
    }
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum BlendMode {
    #[default]
    Replace = 0,
    Add = 1,
    Blend = 2,
    MulAdd = 3,
    Mul = 4,
}

impl<Ctx> Bundle<Ctx> for BlendMode {
    type Error = crate::Error;

    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        Ok(match bitstream.read_u32([Constant(0), Constant(1), Constant(2), BitsOffset(3, 2)])? {
            0 => Self::Replace,
            1 => Self::Add,
            2 => Self::Blend,
            3 => Self::MulAdd,
            4 => Self::Mul,
            value => return Err(jxl_bitstream::Error::InvalidEnum { name: "BlendMode", value }.into()),
        })
    }
}

impl BlendMode {
    #[inline]
    pub fn use_alpha(self) -> bool {
        matches!(self, Self::Blend | Self::MulAdd)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Passes {
    pub num_passes: u32,
    pub num_ds: u32,
    pub shift: Vec<u32>,
    pub downsample: Vec<u32>,
    pub last_pass: Vec<u32>,
}

impl<Ctx> Bundle<Ctx> for Passes {
    type Error = crate::Error;

    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        let num_passes = bitstream.read_u32([Constant(1), Constant(2), Constant(3), BitsOffset(4, 3)])?;
        if num_passes == 1 {
            return Ok(Self { num_passes, num_ds: 0, shift: Vec::new(), downsample: Vec::new(), last_pass: Vec::new() });
        }

        let num_ds = bitstream.read_u32([Constant(0), Constant(1), Constant(2), BitsOffset(3, 1)])?;
        let shift = (0..num_passes - 1).map(|_| bitstream.read_bits(2)).collect::<std::result::Result<Vec<_>, _>>()?;
        let downsample = (0..num_ds)
            .map(|_| bitstream.read_u32([Constant(1), Constant(2), Constant(4), Constant(8)]))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let last_pass = (0..num_ds)
            .map(|_| bitstream.read_u32([Constant(0), Constant(1), Constant(2), BitsOffset(0, 3)]))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self { num_passes, num_ds, shift, downsample, last_pass })
    }
}

impl Passes {
    fn default() -> Self {
        Self { num_passes: 1, num_ds: 0, shift: Vec::new(), downsample: Vec::new(), last_pass: Vec::new() }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BlendingInfo {
    pub mode: BlendMode,
    pub alpha_channel: u32,
    pub clamp: bool,
    pub source: u32,
}

impl Bundle<(bool, Option<BlendMode>, CanvasSizeParams<'_>)> for BlendingInfo {
    type Error = crate::Error;

    fn parse(
        bitstream: &mut Bitstream<'_>,
        (has_ec, resets_mode, canvas): (bool, Option<BlendMode>, CanvasSizeParams<'_>),
    ) -> Result<Self> {
        let mode = BlendMode::parse(bitstream, ())?;

        let alpha_cond = has_ec && (mode == BlendMode::Blend || mode == BlendMode::MulAdd);
        let alpha_channel = if alpha_cond {
            bitstream.read_u32([Constant(0), Constant(1), Constant(2), BitsOffset(3, 3)])?
        } else {
            0
        };

        let clamp_cond = alpha_cond || mode == BlendMode::Mul;
        let clamp = if clamp_cond { bitstream.read_bool()? } else { false };

        let source = if !FrameHeader::resets_canvas(resets_mode.unwrap_or(mode), canvas) {
            bitstream.read_bits(2)?
        } else {
            0
        };

        Ok(Self { mode, alpha_channel, clamp, source })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RestorationFilter {
    pub gab: Gabor,
    pub epf: EdgePreservingFilter,
    pub extensions: Extensions,
}

impl Bundle<Encoding> for RestorationFilter {
    type Error = crate::Error;

    fn parse(bitstream: &mut Bitstream<'_>, encoding: Encoding) -> Result<Self> {
        let all_default = bitstream.read_bool()?;
        if all_default {
            return Ok(Self::default());
        }

        let gab = Gabor::parse(bitstream, ())?;
        let epf = EdgePreservingFilter::parse(bitstream, encoding)?;
        let extensions = Extensions::parse(bitstream, ())?;
        Ok(Self { gab, epf, extensions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_single_pass_reads_nothing_else() {
        // selector 00 -> num_passes constant 1, no further fields.
        let mut bs = Bitstream::new(&[0b00, 0xff]);
        let passes = Passes::parse(&mut bs, ()).unwrap();
        assert_eq!(passes.num_passes, 1);
        assert!(passes.downsample.is_empty());
    }

    #[test]
    fn frame_type_round_trips_known_values() {
        let mut bs = Bitstream::new(&[0b10]);
        assert_eq!(FrameType::parse(&mut bs, ()).unwrap(), FrameType::ReferenceOnly);
    }
}
