//! VarDCT header parsing.
//!
//! VarDCT (the DCT-based, lossy coding mode) carries a quantizer, a set of
//! per-channel dequantization scales, a block-context map for HF coefficient
//! entropy coding, and chroma-from-luma correlation parameters in every
//! frame's `LfGlobal` section. This crate parses exactly that: enough to
//! keep the bitstream cursor positioned correctly past a VarDCT frame's
//! `LfGlobal`. It does not evaluate dequantization matrices, decode HF
//! coefficients, or run a DCT inverse; later VarDCT-only table-of-contents
//! sections (per-group LF coefficients, `HfGlobal`, per-group HF
//! coefficients) are skipped by byte size rather than parsed at all, since
//! nothing downstream of `LfGlobal` needs their contents to decode a
//! Modular frame or to report that a VarDCT frame's samples are
//! unavailable.

mod error;

pub use error::{Error, Result};

use jxl_bitstream::{
    unpack_signed, Bitstream,
    U32Specifier::{BitsOffset, Constant},
};
use jxl_bundle::Bundle;

/// Per-channel LF (DC) dequantization scales.
#[derive(Debug, Clone, Copy)]
pub struct LfChannelDequantization {
    pub m_x_lf: f32,
    pub m_y_lf: f32,
    pub m_b_lf: f32,
}

impl Default for LfChannelDequantization {
    fn default() -> Self {
        Self { m_x_lf: 1.0 / 32.0, m_y_lf: 1.0 / 4.0, m_b_lf: 1.0 / 2.0 }
    }
}

impl<Ctx> Bundle<Ctx> for LfChannelDequantization {
    type Error = Error;

    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        if bitstream.read_bool()? {
            return Ok(Self::default());
        }
        let m_x_lf = bitstream.read_f16_as_f32()?;
        let m_y_lf = bitstream.read_f16_as_f32()?;
        let m_b_lf = bitstream.read_f16_as_f32()?;
        Ok(Self { m_x_lf, m_y_lf, m_b_lf })
    }
}

impl LfChannelDequantization {
    #[inline]
    pub fn m_x_lf_unscaled(&self) -> f32 {
        self.m_x_lf / 128.0
    }

    #[inline]
    pub fn m_y_lf_unscaled(&self) -> f32 {
        self.m_y_lf / 128.0
    }

    #[inline]
    pub fn m_b_lf_unscaled(&self) -> f32 {
        self.m_b_lf / 128.0
    }
}

/// Global quantizer multipliers: an overall scale and the LF-band step.
#[derive(Debug, Clone, Copy)]
pub struct Quantizer {
    pub global_scale: u32,
    pub quant_lf: u32,
}

impl<Ctx> Bundle<Ctx> for Quantizer {
    type Error = Error;

    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        let global_scale = bitstream.read_u32([
            BitsOffset(1, 11),
            BitsOffset(2049, 11),
            BitsOffset(4097, 12),
            BitsOffset(8193, 16),
        ])?;
        let quant_lf = bitstream.read_u32([
            Constant(16),
            BitsOffset(1, 5),
            BitsOffset(1, 8),
            BitsOffset(1, 16),
        ])?;
        Ok(Self { global_scale, quant_lf })
    }
}

/// Chroma-from-luma correlation parameters.
#[derive(Debug, Clone, Copy)]
pub struct LfChannelCorrelation {
    pub colour_factor: u32,
    pub base_correlation_x: f32,
    pub base_correlation_b: f32,
    pub x_factor_lf: u32,
    pub b_factor_lf: u32,
}

impl Default for LfChannelCorrelation {
    fn default() -> Self {
        Self {
            colour_factor: 84,
            base_correlation_x: 0.0,
            base_correlation_b: 1.0,
            x_factor_lf: 128,
            b_factor_lf: 128,
        }
    }
}

impl<Ctx> Bundle<Ctx> for LfChannelCorrelation {
    type Error = Error;

    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        if bitstream.read_bool()? {
            return Ok(Self::default());
        }
        let colour_factor = bitstream.read_u32([
            Constant(84),
            Constant(256),
            BitsOffset(2, 8),
            BitsOffset(258, 16),
        ])?;
        let base_correlation_x = bitstream.read_f16_as_f32()?;
        let base_correlation_b = bitstream.read_f16_as_f32()?;
        let x_factor_lf = bitstream.read_bits(8)?;
        let b_factor_lf = bitstream.read_bits(8)?;
        Ok(Self {
            colour_factor,
            base_correlation_x,
            base_correlation_b,
            x_factor_lf,
            b_factor_lf,
        })
    }
}

/// Block-context map for HF coefficient entropy coding.
///
/// Parsed in full (it governs how many bytes the following `HfGlobal` and
/// per-group HF coefficient sections occupy is *not* derivable from this
/// map — those sections are located purely from the frame's table of
/// contents), but never consulted: this crate stops short of decoding HF
/// coefficients.
#[derive(Debug, Default, Clone)]
pub struct HfBlockContext {
    pub qf_thresholds: Vec<u32>,
    pub lf_thresholds: [Vec<i32>; 3],
    pub block_ctx_map: Vec<u8>,
    pub num_block_clusters: u32,
}

impl<Ctx> Bundle<Ctx> for HfBlockContext {
    type Error = Error;

    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        let mut qf_thresholds = Vec::new();
        let mut lf_thresholds = [Vec::new(), Vec::new(), Vec::new()];

        let (num_block_clusters, block_ctx_map) = if bitstream.read_bool()? {
            (
                15,
                vec![
                    0, 1, 2, 2, 3, 3, 4, 5, 6, 6, 6, 6, 6, 7, 8, 9, 9, 10, 11, 12, 13, 14, 14, 14,
                    14, 14, 7, 8, 9, 9, 10, 11, 12, 13, 14, 14, 14, 14, 14,
                ],
            )
        } else {
            let mut bsize = 1u32;
            for thr in &mut lf_thresholds {
                let num_lf_thresholds = bitstream.read_bits(4)?;
                bsize *= num_lf_thresholds + 1;
                for _ in 0..num_lf_thresholds {
                    let t = bitstream.read_u32([
                        BitsOffset(0, 4),
                        BitsOffset(16, 8),
                        BitsOffset(272, 16),
                        BitsOffset(65808, 32),
                    ])?;
                    thr.push(unpack_signed(t));
                }
            }
            let num_qf_thresholds = bitstream.read_bits(4)?;
            bsize *= num_qf_thresholds + 1;
            for _ in 0..num_qf_thresholds {
                let t = bitstream.read_u32([
                    BitsOffset(0, 2),
                    BitsOffset(4, 3),
                    BitsOffset(12, 5),
                    BitsOffset(44, 8),
                ])?;
                qf_thresholds.push(1 + t);
            }

            if bsize > 64 {
                tracing::warn!(bsize, "bsize > 64");
            }

            let (num_clusters, ctx_map) = jxl_coding::read_clusters(bitstream, bsize * 39)?;
            if num_clusters > 16 {
                tracing::warn!(num_clusters, "num_clusters > 16");
            }

            (num_clusters, ctx_map)
        };

        Ok(Self { qf_thresholds, lf_thresholds, block_ctx_map, num_block_clusters })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lf_channel_dequantization_default() {
        let mut bs = Bitstream::new(&[0b1]);
        let deq = LfChannelDequantization::parse(&mut bs, ()).unwrap();
        assert_eq!(deq.m_x_lf, 1.0 / 32.0);
        assert_eq!(deq.m_y_lf, 1.0 / 4.0);
        assert_eq!(deq.m_b_lf, 1.0 / 2.0);
    }

    #[test]
    fn lf_channel_correlation_default() {
        let mut bs = Bitstream::new(&[0b1]);
        let corr = LfChannelCorrelation::parse(&mut bs, ()).unwrap();
        assert_eq!(corr.colour_factor, 84);
        assert_eq!(corr.base_correlation_x, 0.0);
        assert_eq!(corr.base_correlation_b, 1.0);
        assert_eq!(corr.x_factor_lf, 128);
        assert_eq!(corr.b_factor_lf, 128);
    }

    #[test]
    fn hf_block_context_default_map() {
        // selector bit = 1 -> the built-in 13x3 default map, 15 clusters.
        let mut bs = Bitstream::new(&[0b1]);
        let ctx = HfBlockContext::parse(&mut bs, ()).unwrap();
        assert_eq!(ctx.num_block_clusters, 15);
        assert_eq!(ctx.block_ctx_map.len(), 39);
    }
}
