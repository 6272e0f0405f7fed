//! Procedural film-grain noise parameters: an 8-entry lookup table driving
//! the noise synthesis RNG. The RNG itself renders samples onto the image
//! and is out of scope; only the LUT is parsed.

use jxl_bitstream::Bitstream;
use jxl_bundle::Bundle;

use crate::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct NoiseParameters {
    pub lut: [f32; 8],
}

impl<Ctx> Bundle<Ctx> for NoiseParameters {
    type Error = crate::Error;

    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self> {
        let mut lut = [0.0f32; 8];
        for v in &mut lut {
            *v = bitstream.read_bits(10)? as f32 / 1024.0;
        }
        Ok(Self { lut })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_zero_lut() {
        let mut bs = Bitstream::new(&[0u8; 10]);
        let noise = NoiseParameters::parse(&mut bs, ()).unwrap();
        assert_eq!(noise.lut, [0.0; 8]);
    }
}
