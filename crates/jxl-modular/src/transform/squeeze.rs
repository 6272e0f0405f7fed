//! Squeeze transform: parameter parsing and channel-shape bookkeeping only.
//!
//! The inverse (re-merging a low-resolution channel with its residual to
//! reconstruct the higher-resolution original) is not implemented; decoding
//! a stream that uses Squeeze fails with [`crate::Error::SqueezeNotSupported`]
//! before any channel data is read, rather than silently producing wrong
//! pixels.

use jxl_bitstream::{Bitstream, U32Specifier::{BitsOffset, Constant}};
use jxl_bundle::Bundle;

use crate::param::ModularChannelParams;
use crate::Result;

#[derive(Debug, Clone)]
pub struct Squeeze {
    pub(super) sp: Vec<SqueezeParams>,
}

#[derive(Debug, Clone, Copy)]
pub(super) struct SqueezeParams {
    pub horizontal: bool,
    pub in_place: bool,
    pub begin_c: u32,
    pub num_c: u32,
}

impl Bundle for Squeeze {
    type Error = crate::Error;

    fn parse(bitstream: &mut Bitstream, _ctx: ()) -> Result<Self> {
        let num_sq = bitstream.read_u32([
            Constant(0),
            BitsOffset(1, 4),
            BitsOffset(9, 6),
            BitsOffset(41, 8),
        ])?;
        let sp = (0..num_sq)
            .map(|_| SqueezeParams::parse(bitstream, ()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { sp })
    }
}

impl Bundle for SqueezeParams {
    type Error = crate::Error;

    fn parse(bitstream: &mut Bitstream, _ctx: ()) -> Result<Self> {
        let horizontal = bitstream.read_bool()?;
        let in_place = bitstream.read_bool()?;
        let begin_c = bitstream.read_u32([
            BitsOffset(0, 3),
            BitsOffset(8, 6),
            BitsOffset(72, 10),
            BitsOffset(1096, 13),
        ])?;
        let num_c = bitstream.read_u32([
            Constant(1),
            Constant(2),
            Constant(3),
            BitsOffset(4, 4),
        ])?;
        Ok(Self { horizontal, in_place, begin_c, num_c })
    }
}

impl Squeeze {
    /// Fills in the libjxl-defined default squeeze plan when the bitstream
    /// left `sp` empty, so that channel-shape bookkeeping still matches what
    /// an encoder with implicit defaults would have produced.
    pub(super) fn set_default_params(&mut self, channels: &[ModularChannelParams], nb_meta_channels: u32) {
        if !self.sp.is_empty() {
            return;
        }

        let first = nb_meta_channels;
        let Some(first_ch) = channels.get(first as usize) else {
            return;
        };
        let mut w = first_ch.width;
        let mut h = first_ch.height;

        if channels.len() as u32 - first >= 3 {
            let next = &channels[first as usize + 1];
            if next.width == w && next.height == h {
                self.sp.push(SqueezeParams { horizontal: true, in_place: false, begin_c: first + 1, num_c: 2 });
                self.sp.push(SqueezeParams { horizontal: false, in_place: false, begin_c: first + 1, num_c: 2 });
            }
        }

        let num_c = channels.len() as u32 - first;
        if h >= w && h > 8 {
            self.sp.push(SqueezeParams { horizontal: false, in_place: true, begin_c: first, num_c });
            h = h.div_ceil(2);
        }
        while w > 8 || h > 8 {
            if w > 8 {
                self.sp.push(SqueezeParams { horizontal: true, in_place: true, begin_c: first, num_c });
                w = w.div_ceil(2);
            }
            if h > 8 {
                self.sp.push(SqueezeParams { horizontal: false, in_place: true, begin_c: first, num_c });
                h = h.div_ceil(2);
            }
        }
    }
}
