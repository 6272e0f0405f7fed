//! The per-pixel decode loop: walks the meta-adaptive tree, reads a residual
//! from the entropy decoder, evaluates the chosen predictor, and folds the
//! two together into the reconstructed sample.

use jxl_bitstream::Bitstream;
use jxl_grid::SimpleGrid;

use crate::ma::MaConfig;
use crate::param::{ModularChannelParams, ModularParams};
use crate::predictor::PredictorState;
use crate::sample::Sample;
use crate::transform::TransformInfo;
use crate::{Error, ModularHeader, Result};

/// A decoded Modular sub-image: every channel named by [`ModularParams`],
/// including any meta-channels the transform list introduced, still in the
/// order pixels were read off the bitstream.
#[derive(Debug)]
pub struct ModularImageDestination<S: Sample> {
    bit_depth: u32,
    transforms: Vec<TransformInfo>,
    channels: Vec<SimpleGrid<S>>,
}

impl<S: Sample> ModularImageDestination<S> {
    /// Decodes one Modular sub-image in full: the header (global-tree flag,
    /// weighted-predictor parameters, transform list), the local
    /// meta-adaptive tree if `use_global_tree` is false, then every
    /// channel's pixels in turn.
    pub fn decode(bitstream: &mut Bitstream, params: ModularParams<'_, '_>) -> Result<Self> {
        let ModularParams { group_dim: _, bit_depth, channels, ma_config, tracker } = params;

        let mut header = ModularHeader::parse(bitstream, ())?;

        let mut channel_params = channels;
        let mut nb_meta_channels = 0u32;
        for info in header.transform.iter_mut() {
            info.prepare(&mut channel_params, &mut nb_meta_channels)?;
        }
        if channel_params.len() > (1 << 16) {
            return Err(Error::TooManyChannels(channel_params.len()));
        }

        let local_ma_config;
        let ma_config = if header.use_global_tree {
            ma_config.ok_or(Error::GlobalMaTreeNotAvailable)?
        } else {
            let total_samples: usize = channel_params
                .iter()
                .map(|c| c.width as usize * c.height as usize)
                .sum();
            let node_limit = (1024 + total_samples).min(1 << 20);
            local_ma_config = MaConfig::parse(bitstream, crate::MaConfigParams { tracker, node_limit })?;
            &local_ma_config
        };
        let flat_tree = ma_config.make_flat_tree();
        let wp_params = header.wp_params.clone();

        let dist_multiplier = channel_params.iter().map(|c| c.width).max().unwrap_or(0);

        let mut decoder = ma_config.decoder().clone();
        decoder.begin(bitstream)?;

        let mut decoded: Vec<SimpleGrid<S>> = Vec::with_capacity(channel_params.len());
        for (stream_index, chparam) in channel_params.iter().enumerate() {
            let (width, height) = (chparam.width, chparam.height);
            let mut grid = SimpleGrid::with_alloc_tracker(width as usize, height as usize, tracker)?;

            let matching_rev: Vec<usize> = decoded
                .iter()
                .enumerate()
                .filter(|&(_, g)| g.width() == width as usize && g.height() == height as usize)
                .map(|(idx, _)| idx)
                .rev()
                .collect();

            let wp_ref = flat_tree.need_self_correcting().then_some(&wp_params);
            let mut state = PredictorState::new(width, stream_index as u32, stream_index as u32, matching_rev.len(), wp_ref);
            let mut prev_samples = vec![0i32; matching_rev.len()];
            let is_meta = chparam.shift.hshift() < 0 || chparam.shift.vshift() < 0;

            for y in 0..height {
                for x in 0..width {
                    for (slot, &idx) in prev_samples.iter_mut().zip(&matching_rev) {
                        *slot = decoded[idx].get(x as usize, y as usize).to_i32();
                    }

                    let properties = state.properties(&prev_samples);
                    let (diff, predictor) =
                        flat_tree.decode_sample(bitstream, &mut decoder, &properties, dist_multiplier)?;
                    let prediction = predictor.predict(&properties);
                    let wide = prediction + diff as i64;
                    if !S::in_pixel_range(wide, bit_depth, is_meta) {
                        return Err(Error::PixelOverflow { value: wide, bit_depth });
                    }
                    let value = wide as i32;

                    grid.set(x as usize, y as usize, S::from_i32(value));
                    properties.record(value);
                }
            }

            decoded.push(grid);
        }
        decoder.finalize()?;

        Ok(Self {
            bit_depth,
            transforms: header.transform,
            channels: decoded,
        })
    }

    /// Applies every transform's inverse, in reverse declaration order. Any
    /// meta-channels a transform introduced (e.g. a palette's lookup table)
    /// are consumed by that transform's own inverse and never appear here.
    pub fn into_image_channels(mut self) -> Result<Vec<SimpleGrid<S>>> {
        for transform in self.transforms.iter().rev() {
            transform.inverse(&mut self.channels, self.bit_depth)?;
        }
        Ok(self.channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::ChannelShift;

    #[test]
    fn zero_channel_image_decodes_to_empty_list() {
        let params = ModularParams::with_channels(128, 8, Vec::<ModularChannelParams>::new(), None, None);
        assert!(params.channels.is_empty());
        let _ = ChannelShift::from_shift(0);
    }
}
