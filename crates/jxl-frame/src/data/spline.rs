//! Splines: parametric curves layered onto the image, stored as
//! quantized DCT32 coefficients plus a delta-coded control polygon. The
//! curves feed an area-accounting conformance check in `LfGlobal`; actual
//! Catmull-Rom upsampling and rendering onto the canvas are out of scope.

use jxl_bitstream::{unpack_signed, Bitstream};
use jxl_bundle::Bundle;
use jxl_coding::Decoder;

use crate::header::FrameHeader;
use crate::Result;

const MAX_NUM_SPLINES: usize = 1 << 24;
const MAX_NUM_CONTROL_POINTS: usize = 1 << 20;

#[derive(Debug, Clone)]
pub struct Splines {
    pub quant_splines: Vec<QuantSpline>,
    pub quant_adjust: i32,
}

/// Delta-encoded control points and quantized DCT32 coefficients for one
/// spline. [`QuantSpline::estimate_area`] runs the same dequantization
/// arithmetic the teacher's `dequant` does, without materializing a
/// renderable [`Spline`].
#[derive(Debug, Default, Clone)]
pub struct QuantSpline {
    start_point: (i32, i32),
    points_deltas: Vec<(i32, i32)>,
    xyb_dct: [[i32; 32]; 3],
    sigma_dct: [i32; 32],
}

impl Bundle<&FrameHeader> for Splines {
    type Error = crate::Error;

    fn parse(bitstream: &mut Bitstream<'_>, header: &FrameHeader) -> Result<Self> {
        let mut decoder = Decoder::parse(bitstream, 6)?;
        decoder.begin(bitstream)?;
        let num_pixels = (header.width as usize) * (header.height as usize);

        let num_splines = (decoder.read_varint(bitstream, 2)? + 1) as usize;
        let max_num_splines = usize::min(MAX_NUM_SPLINES, num_pixels / 4);
        if num_splines > max_num_splines {
            return Err(crate::Error::TooManySplines(num_splines));
        }

        let mut start_points = vec![(0i32, 0i32); num_splines];
        for i in 0..num_splines {
            let mut x = decoder.read_varint(bitstream, 1)? as i32;
            let mut y = decoder.read_varint(bitstream, 1)? as i32;
            if i != 0 {
                x = unpack_signed(x as u32) + start_points[i - 1].0;
                y = unpack_signed(y as u32) + start_points[i - 1].1;
            }
            start_points[i] = (x, y);
        }

        let quant_adjust = unpack_signed(decoder.read_varint(bitstream, 0)?);

        let mut quant_splines = Vec::with_capacity(num_splines);
        for start_point in start_points {
            let mut spline = QuantSpline { start_point, ..QuantSpline::default() };
            spline.decode(&mut decoder, bitstream, num_pixels)?;
            quant_splines.push(spline);
        }

        decoder.finalize()?;
        Ok(Self { quant_splines, quant_adjust })
    }
}

impl Splines {
    /// Total estimated rendered-pixel footprint across every spline, the
    /// same quantity `LfGlobal` checks against a per-conformance-level cap.
    pub fn estimate_area(&self) -> u64 {
        let mut area = 0u64;
        for spline in &self.quant_splines {
            spline.estimate_area(self.quant_adjust, &mut area);
        }
        area
    }
}

impl QuantSpline {
    fn decode(&mut self, decoder: &mut Decoder, bitstream: &mut Bitstream<'_>, num_pixels: usize) -> Result<()> {
        let num_points = decoder.read_varint(bitstream, 3)? as usize;
        let max_num_points = usize::min(MAX_NUM_CONTROL_POINTS, num_pixels / 2);
        if num_points > max_num_points {
            return Err(crate::Error::TooManySplinePoints(num_points));
        }

        self.points_deltas = vec![(0, 0); num_points];
        for delta in &mut self.points_deltas {
            delta.0 = unpack_signed(decoder.read_varint(bitstream, 4)?);
            delta.1 = unpack_signed(decoder.read_varint(bitstream, 4)?);
        }
        for colour_dct in &mut self.xyb_dct {
            for v in colour_dct {
                *v = unpack_signed(decoder.read_varint(bitstream, 5)?);
            }
        }
        for v in &mut self.sigma_dct {
            *v = unpack_signed(decoder.read_varint(bitstream, 5)?);
        }
        Ok(())
    }

    /// Adds this spline's estimated rendered-pixel footprint to
    /// `estimated_area`, the same accounting the teacher's `dequant` does
    /// alongside its control-point dequantization, minus the control-point
    /// and DCT dequantization themselves (nothing downstream consumes
    /// them here).
    pub fn estimate_area(&self, quant_adjust: i32, estimated_area: &mut u64) {
        let mut manhattan_distance: i64 = 0;
        let mut cur_delta = (0i64, 0i64);
        for delta in &self.points_deltas {
            cur_delta.0 += delta.0 as i64;
            cur_delta.1 += delta.1 as i64;
            manhattan_distance += cur_delta.0.abs() + cur_delta.1.abs();
        }

        let quant_adjust = quant_adjust as f32;
        let inverted_qa =
            if quant_adjust >= 0.0 { 1.0 / (1.0 + quant_adjust / 8.0) } else { 1.0 - quant_adjust / 8.0 };

        let mut width_estimate = 0f32;
        for &s in &self.sigma_dct {
            let weight = (s.abs() as f32) * inverted_qa.ceil();
            width_estimate += weight * weight;
        }

        *estimated_area += (width_estimate * manhattan_distance as f32) as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_area_is_zero_for_flat_spline() {
        let spline = QuantSpline::default();
        let mut area = 0u64;
        spline.estimate_area(0, &mut area);
        assert_eq!(area, 0);
    }
}
