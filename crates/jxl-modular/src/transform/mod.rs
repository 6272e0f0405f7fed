//! Inverse transforms applied to a Modular sub-image after pixel decoding:
//! reversible colour transform, palette expansion, and (unsupported) squeeze.

mod palette;
mod rct;
mod squeeze;

pub(crate) use squeeze::Squeeze;

use jxl_bitstream::{Bitstream, U32Specifier::{BitsOffset, Constant}};
use jxl_bundle::Bundle;
use jxl_grid::SimpleGrid;

use crate::param::{ChannelShift, ModularChannelParams};
use crate::predictor::{Predictor, WpHeader};
use crate::sample::Sample;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub enum TransformInfo {
    Rct(Rct),
    Palette(Palette),
    Squeeze(Squeeze),
}

impl Bundle for TransformInfo {
    type Error = crate::Error;

    fn parse(bitstream: &mut Bitstream, _ctx: ()) -> Result<Self> {
        match bitstream.read_bits(2)? {
            0 => Rct::parse(bitstream, ()).map(Self::Rct),
            1 => Palette::parse(bitstream, ()).map(Self::Palette),
            2 => Squeeze::parse(bitstream, ()).map(Self::Squeeze),
            value => Err(Error::Bitstream(jxl_bitstream::Error::InvalidEnum {
                name: "TransformId",
                value,
            })),
        }
    }
}

impl TransformInfo {
    /// Mutates the decode-time channel list (and `nb_meta_channels`) to
    /// reflect what this transform does to channel count and shape, in
    /// forward (encode) order. Channels are decoded in the resulting shape;
    /// [`TransformInfo::inverse`] undoes the transforms in reverse order
    /// afterwards.
    pub(crate) fn prepare(
        &mut self,
        channels: &mut Vec<ModularChannelParams>,
        nb_meta_channels: &mut u32,
    ) -> Result<()> {
        match self {
            Self::Rct(rct) => rct.prepare(channels.as_slice()),
            Self::Palette(pal) => pal.prepare(channels, nb_meta_channels),
            Self::Squeeze(sq) => {
                sq.set_default_params(channels.as_slice(), *nb_meta_channels);
                Err(Error::SqueezeNotSupported)
            }
        }
    }

    pub(crate) fn inverse<S: Sample>(&self, channels: &mut [SimpleGrid<S>], bit_depth: u32) -> Result<()> {
        match self {
            Self::Rct(rct) => rct.inverse(channels),
            Self::Palette(pal) => pal.inverse(channels, bit_depth),
            Self::Squeeze(_) => Err(Error::SqueezeNotSupported),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Rct {
    begin_c: u32,
    rct_type: u32,
}

impl Bundle for Rct {
    type Error = crate::Error;

    fn parse(bitstream: &mut Bitstream, _ctx: ()) -> Result<Self> {
        let begin_c = bitstream.read_u32([
            BitsOffset(0, 3),
            BitsOffset(8, 6),
            BitsOffset(72, 10),
            BitsOffset(1096, 13),
        ])?;
        let rct_type = bitstream.read_u32([
            Constant(6),
            BitsOffset(0, 2),
            BitsOffset(2, 4),
            BitsOffset(10, 6),
        ])?;
        if rct_type >= 42 {
            return Err(Error::InvalidRctParams);
        }
        Ok(Self { begin_c, rct_type })
    }
}

impl Rct {
    fn prepare(&self, channels: &[ModularChannelParams]) -> Result<()> {
        let begin_c = self.begin_c as usize;
        let end_c = begin_c + 3;
        if end_c > channels.len() {
            return Err(Error::InvalidRctParams);
        }
        let (width, height) = (channels[begin_c].width, channels[begin_c].height);
        for ch in &channels[begin_c + 1..end_c] {
            if ch.width != width || ch.height != height {
                return Err(Error::InvalidRctParams);
            }
        }
        Ok(())
    }

    fn inverse<S: Sample>(&self, channels: &mut [SimpleGrid<S>]) -> Result<()> {
        let begin_c = self.begin_c as usize;
        if begin_c + 3 > channels.len() {
            return Err(Error::InvalidRctParams);
        }
        let permutation = self.rct_type / 7;
        let ty = self.rct_type % 7;
        let [a, b, c] = channels[begin_c..begin_c + 3]
            .iter_mut()
            .collect::<Vec<_>>()
            .try_into()
            .map_err(|_| Error::InvalidRctParams)?;
        match ty {
            0 => rct::inverse_rct::<S, 0>(permutation, [a, b, c]),
            1 => rct::inverse_rct::<S, 1>(permutation, [a, b, c]),
            2 => rct::inverse_rct::<S, 2>(permutation, [a, b, c]),
            3 => rct::inverse_rct::<S, 3>(permutation, [a, b, c]),
            4 => rct::inverse_rct::<S, 4>(permutation, [a, b, c]),
            5 => rct::inverse_rct::<S, 5>(permutation, [a, b, c]),
            6 => rct::inverse_rct::<S, 6>(permutation, [a, b, c]),
            _ => unreachable!("validated to be < 42 at parse time"),
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Palette {
    begin_c: u32,
    num_c: u32,
    nb_colours: u32,
    nb_deltas: u32,
    d_pred: Predictor,
    wp_header: Option<WpHeader>,
}

impl Bundle for Palette {
    type Error = crate::Error;

    fn parse(bitstream: &mut Bitstream, _ctx: ()) -> Result<Self> {
        let begin_c = bitstream.read_u32([
            BitsOffset(0, 3),
            BitsOffset(8, 6),
            BitsOffset(72, 10),
            BitsOffset(1096, 13),
        ])?;
        let num_c = bitstream.read_u32([
            Constant(1),
            Constant(3),
            Constant(4),
            BitsOffset(1, 13),
        ])?;
        let nb_colours = bitstream.read_u32([
            BitsOffset(0, 8),
            BitsOffset(256, 10),
            BitsOffset(1280, 12),
            BitsOffset(5376, 16),
        ])?;
        let nb_deltas = bitstream.read_u32([
            Constant(0),
            BitsOffset(1, 8),
            BitsOffset(257, 10),
            BitsOffset(1281, 16),
        ])?;
        let d_pred = Predictor::try_from(bitstream.read_bits(4)?)
            .map_err(|_| Error::InvalidPaletteParams)?;
        let wp_header = if d_pred == Predictor::SelfCorrecting {
            Some(WpHeader::parse(bitstream, ())?)
        } else {
            None
        };
        Ok(Self { begin_c, num_c, nb_colours, nb_deltas, d_pred, wp_header })
    }
}

impl Palette {
    fn prepare(&self, channels: &mut Vec<ModularChannelParams>, nb_meta_channels: &mut u32) -> Result<()> {
        let begin_c = self.begin_c;
        let end_c = begin_c + self.num_c;
        if end_c as usize > channels.len() || self.num_c == 0 {
            return Err(Error::InvalidPaletteParams);
        }
        if begin_c < *nb_meta_channels {
            if end_c > *nb_meta_channels {
                return Err(Error::InvalidPaletteParams);
            }
            *nb_meta_channels = *nb_meta_channels + 2 - self.num_c;
        } else {
            *nb_meta_channels += 1;
        }

        let (width, height) = (channels[begin_c as usize].width, channels[begin_c as usize].height);
        for ch in &channels[begin_c as usize + 1..end_c as usize] {
            if ch.width != width || ch.height != height {
                return Err(Error::InvalidPaletteParams);
            }
        }

        channels.drain(begin_c as usize + 1..end_c as usize);
        channels.insert(0, ModularChannelParams::with_shift(self.nb_colours, self.num_c, ChannelShift::Raw(-1, -1)));
        Ok(())
    }

    /// Decoding collapses `num_c` channels into a single index channel, so
    /// reconstructing them needs `num_c - 1` freshly allocated planes: the
    /// decoded channel list only ever held the one index channel.
    fn inverse<S: Sample>(&self, channels: &mut Vec<SimpleGrid<S>>, bit_depth: u32) -> Result<()> {
        if channels.is_empty() {
            return Err(Error::InvalidPaletteParams);
        }
        let palette = channels.remove(0);
        let begin_c = self.begin_c as usize;
        let num_c = self.num_c as usize;
        if begin_c >= channels.len() || num_c == 0 {
            return Err(Error::InvalidPaletteParams);
        }

        let leader = channels.remove(begin_c);
        let (width, height) = (leader.width(), leader.height());
        let mut targets = Vec::with_capacity(num_c);
        targets.push(leader);
        for _ in 1..num_c {
            targets.push(SimpleGrid::new(width, height));
        }

        {
            let mut refs: Vec<&mut SimpleGrid<S>> = targets.iter_mut().collect();
            self.inverse_inner(&palette, &mut refs, bit_depth);
        }

        for (i, grid) in targets.into_iter().enumerate() {
            channels.insert(begin_c + i, grid);
        }
        Ok(())
    }
}
