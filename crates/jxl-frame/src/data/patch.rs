//! Reference patches: a flag-gated list of regions copied from already
//! decoded reference frames onto this frame's canvas. Parsed in full since
//! the values participate in the area-accounting `LfGlobal` does, but the
//! actual copy/blend is out of scope.

use jxl_image::{ExtraChannelType, ImageHeader};

use crate::Result;

#[derive(Debug, Clone)]
pub struct Patches {
    pub patches: Vec<PatchRef>,
}

#[derive(Debug, Clone)]
pub struct PatchRef {
    pub ref_idx: u32,
    pub x0: u32,
    pub y0: u32,
    pub width: u32,
    pub height: u32,
    pub patch_targets: Vec<PatchTarget>,
}

#[derive(Debug, Clone)]
pub struct PatchTarget {
    pub x: u32,
    pub y: u32,
    pub blending: Vec<BlendingModeInformation>,
}

#[derive(Debug, Clone, Copy)]
pub struct BlendingModeInformation {
    pub mode: PatchBlendMode,
    pub alpha_channel: u32,
    pub clamp: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PatchBlendMode {
    None = 0,
    Replace,
    Add,
    Mul,
    BlendAbove,
    BlendBelow,
    MulAddAbove,
    MulAddBelow,
}

impl TryFrom<u32> for PatchBlendMode {
    type Error = jxl_bitstream::Error;

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::None,
            1 => Self::Replace,
            2 => Self::Add,
            3 => Self::Mul,
            4 => Self::BlendAbove,
            5 => Self::BlendBelow,
            6 => Self::MulAddAbove,
            7 => Self::MulAddBelow,
            _ => return Err(jxl_bitstream::Error::InvalidEnum { name: "PatchBlendMode", value }),
        })
    }
}

impl jxl_bundle::Bundle<&ImageHeader> for Patches {
    type Error = crate::Error;

    fn parse(bitstream: &mut jxl_bitstream::Bitstream<'_>, image_header: &ImageHeader) -> Result<Self> {
        let num_extra = image_header.metadata.ec_info.len();
        let alpha_channel_indices = image_header
            .metadata
            .ec_info
            .iter()
            .enumerate()
            .filter_map(|(idx, info)| (info.ty == ExtraChannelType::Alpha).then_some(idx as u32))
            .collect::<Vec<_>>();

        let mut decoder = jxl_coding::Decoder::parse(bitstream, 10)?;
        decoder.begin(bitstream)?;

        let num_patches = decoder.read_varint(bitstream, 0)?;
        let mut patches = Vec::with_capacity(num_patches as usize);
        for _ in 0..num_patches {
            let ref_idx = decoder.read_varint(bitstream, 1)?;
            let x0 = decoder.read_varint(bitstream, 3)?;
            let y0 = decoder.read_varint(bitstream, 3)?;
            let width = decoder.read_varint(bitstream, 2)? + 1;
            let height = decoder.read_varint(bitstream, 2)? + 1;
            let count = decoder.read_varint(bitstream, 7)? + 1;

            let mut prev_xy = None;
            let mut patch_targets = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let (x, y) = if let Some((px, py)) = prev_xy {
                    let dx = decoder.read_varint(bitstream, 6)?;
                    let dy = decoder.read_varint(bitstream, 6)?;
                    (dx + px, dy + py)
                } else {
                    (decoder.read_varint(bitstream, 4)?, decoder.read_varint(bitstream, 4)?)
                };
                prev_xy = Some((x, y));

                let mut blending = Vec::with_capacity(num_extra + 1);
                for _ in 0..=num_extra {
                    let raw_mode = decoder.read_varint(bitstream, 5)?;
                    let mode = PatchBlendMode::try_from(raw_mode)?;
                    let alpha_channel = if raw_mode >= 4 && alpha_channel_indices.len() >= 2 {
                        decoder.read_varint(bitstream, 8)?
                    } else {
                        alpha_channel_indices.first().copied().unwrap_or_default()
                    };
                    let clamp = if raw_mode >= 3 { decoder.read_varint(bitstream, 9)? != 0 } else { false };
                    blending.push(BlendingModeInformation { mode, alpha_channel, clamp });
                }

                patch_targets.push(PatchTarget { x, y, blending });
            }

            patches.push(PatchRef { ref_idx, x0, y0, width, height, patch_targets });
        }

        decoder.finalize()?;
        Ok(Self { patches })
    }
}
