//! `LfGlobal`: the per-frame section carrying patches, splines, noise,
//! the LF dequantization/quantizer/correlation parameters, and the global
//! Modular stream (colour channels for Modular frames, always the extra
//! channels).

use jxl_bitstream::Bitstream;
use jxl_bundle::Bundle;
use jxl_grid::AllocTracker;
use jxl_image::ImageHeader;
use jxl_modular::{
    ChannelShift, MaConfig, MaConfigParams, Modular, ModularChannelParams, ModularImageDestination,
    ModularParams, Sample,
};
use jxl_vardct::{HfBlockContext, LfChannelCorrelation, LfChannelDequantization, Quantizer};

use crate::header::{Encoding, FrameHeader};
use crate::Result;

use super::{noise::NoiseParameters, patch::Patches, spline::Splines};

#[derive(Debug)]
pub struct LfGlobal<S: Sample> {
    pub patches: Option<Patches>,
    pub splines: Option<Splines>,
    pub noise: Option<NoiseParameters>,
    pub lf_dequant: LfChannelDequantization,
    pub vardct: Option<LfGlobalVarDct>,
    pub gmodular: GlobalModular<S>,
}

#[derive(Clone, Copy)]
pub struct LfGlobalParams<'a, 'b> {
    pub image_header: &'a ImageHeader,
    pub frame_header: &'a FrameHeader,
    pub tracker: Option<&'b AllocTracker>,
}

impl<S: Sample> Bundle<LfGlobalParams<'_, '_>> for LfGlobal<S> {
    type Error = crate::Error;

    fn parse(bitstream: &mut Bitstream<'_>, params: LfGlobalParams<'_, '_>) -> Result<Self> {
        let LfGlobalParams { image_header, frame_header: header, .. } = params;
        let image_size = (header.width as u64) * (header.height as u64);

        let patches = if header.flags.patches() {
            let patches = Patches::parse(bitstream, image_header)?;
            for target in patches.patches.iter().flat_map(|p| &p.patch_targets) {
                for blending_info in &target.blending {
                    if blending_info.mode.use_alpha()
                        && blending_info.alpha_channel as usize >= image_header.metadata.ec_info.len()
                    {
                        return Err(jxl_bitstream::Error::ValidationFailed(
                            "blending_info.alpha_channel out of range",
                        )
                        .into());
                    }
                }
            }
            Some(patches)
        } else {
            None
        };

        let splines = if header.flags.splines() { Some(Splines::parse(bitstream, header)?) } else { None };
        let noise = if header.flags.noise() { Some(NoiseParameters::parse(bitstream, ())?) } else { None };

        let lf_dequant = LfChannelDequantization::parse(bitstream, ())?;
        let modular_dequants =
            [lf_dequant.m_x_lf_unscaled(), lf_dequant.m_y_lf_unscaled(), lf_dequant.m_b_lf_unscaled()];
        if modular_dequants.into_iter().any(|v| v < 1e-8) {
            tracing::error!(?modular_dequants, "modular dequant weight is too small");
            return Err(jxl_bitstream::Error::ValidationFailed("modular dequant weight is too small").into());
        }

        let vardct =
            if header.encoding == Encoding::VarDct { Some(LfGlobalVarDct::parse(bitstream, ())?) } else { None };

        if let Some(splines) = &splines {
            let estimated_area = splines.estimate_area();

            // Level 10 conformance bound.
            let max_estimated_area = (1u64 << 42).min(1024 * image_size + (1u64 << 32));
            if estimated_area > max_estimated_area {
                tracing::error!(estimated_area, max_estimated_area, "too large estimated area for splines");
                return Err(jxl_bitstream::Error::ValidationFailed("too large estimated area for splines").into());
            }
            // Level 5 conformance bound: not fatal, just a performance warning.
            if estimated_area > (1u64 << 30).min(8 * image_size + (1u64 << 25)) {
                tracing::warn!(estimated_area, "large estimated spline area, expect slower decoding");
            }
        }

        let gmodular = GlobalModular::<S>::parse(bitstream, params)?;

        Ok(Self { patches, splines, noise, lf_dequant, vardct, gmodular })
    }
}

/// VarDCT-only parameters nested in `LfGlobal`. Parsed so the bitstream
/// cursor lands in the right place; `Frame` does not consult any of it.
#[derive(Debug, Clone, Copy)]
pub struct LfGlobalVarDct {
    pub quantizer: Quantizer,
    pub hf_block_ctx: HfBlockContext,
    pub lf_chan_corr: LfChannelCorrelation,
}

impl<Ctx> Bundle<Ctx> for LfGlobalVarDct {
    type Error = crate::Error;

    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        let quantizer = Quantizer::parse(bitstream, ())?;
        let hf_block_ctx = HfBlockContext::parse(bitstream, ())?;
        let lf_chan_corr = LfChannelCorrelation::parse(bitstream, ())?;
        Ok(Self { quantizer, hf_block_ctx, lf_chan_corr })
    }
}

/// The global Modular stream: colour channels for Modular-encoded frames
/// (always), plus every extra channel (always, regardless of encoding).
#[derive(Debug)]
pub struct GlobalModular<S: Sample> {
    pub ma_config: Option<MaConfig>,
    pub modular: Modular<S>,
    extra_channel_from: usize,
}

impl<S: Sample> GlobalModular<S> {
    pub fn ma_config(&self) -> Option<&MaConfig> {
        self.ma_config.as_ref()
    }

    pub fn extra_channel_from(&self) -> usize {
        self.extra_channel_from
    }
}

impl<S: Sample> Bundle<LfGlobalParams<'_, '_>> for GlobalModular<S> {
    type Error = crate::Error;

    fn parse(bitstream: &mut Bitstream<'_>, params: LfGlobalParams<'_, '_>) -> Result<Self> {
        let LfGlobalParams { image_header, frame_header: header, tracker } = params;

        let num_channels = (header.encoded_color_channels() + image_header.metadata.ec_info.len()) as u64;
        let max_global_ma_nodes =
            (1u64 << 22).min(1024 + header.width as u64 * header.height as u64 * num_channels / 16) as usize;
        let ma_config_params = MaConfigParams { tracker, node_limit: max_global_ma_nodes };
        let ma_config =
            if bitstream.read_bool()? { Some(MaConfig::parse(bitstream, ma_config_params)?) } else { None };

        let color_width = header.color_sample_width();
        let color_height = header.color_sample_height();

        let mut shifts = Vec::new();
        if header.encoding == Encoding::Modular {
            if header.do_ycbcr {
                for idx in 0..3 {
                    shifts.push(ModularChannelParams::jpeg(color_width, color_height, header.jpeg_upsampling, idx));
                }
            } else {
                let channel_param = ModularChannelParams::new(color_width, color_height);
                shifts.extend(std::iter::repeat(channel_param).take(header.encoded_color_channels()));
            }
        }

        let extra_channel_from = shifts.len();
        let color_upsampling_shift = header.upsampling.trailing_zeros();

        for (&ec_upsampling, ec_info) in header.ec_upsampling.iter().zip(image_header.metadata.ec_info.iter()) {
            let ec_upsampling_shift = ec_upsampling.trailing_zeros();
            let dim_shift = ec_info.dim_shift;
            let actual_dim_shift = ec_upsampling_shift + dim_shift - color_upsampling_shift;
            shifts.push(ModularChannelParams::with_shift(
                color_width,
                color_height,
                ChannelShift::from_shift(actual_dim_shift),
            ));
        }

        let group_dim = header.group_dim();
        let modular_params = ModularParams::with_channels(
            group_dim,
            image_header.metadata.bit_depth.bits_per_sample(),
            shifts,
            ma_config.as_ref(),
            tracker,
        );
        let destination = ModularImageDestination::decode(bitstream, modular_params)?;
        let modular = Modular::new(destination);

        Ok(Self { ma_config, modular, extra_channel_from })
    }
}
