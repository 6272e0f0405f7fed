//! Top-level facade tying the bitstream, image, frame and modular crates
//! together: detect framing (bare codestream or ISOBMFF-like container),
//! assemble the codestream, parse the image header once, then decode every
//! frame in turn.
//!
//! Colour management, progressive rendering, animation playback and the
//! VarDCT inverse are out of scope (see the crate's design notes); this
//! facade exists to drive the entropy/modular pipeline end to end for a
//! single still image.

mod error;

pub use error::{Error, Result};

use jxl_bitstream::{Bitstream, ContainerParser};
use jxl_bundle::Bundle;
use jxl_frame::header::Encoding;
use jxl_frame::Frame;
use jxl_grid::{AllocTracker, SimpleGrid};
use jxl_image::ImageHeader;

/// Default allocation budget handed to a decode when the caller doesn't
/// supply one: generous enough for any image this core is expected to
/// handle, small enough to reject a pathological header promptly.
pub const DEFAULT_ALLOC_BUDGET: usize = 1 << 30;

/// A still image's decoded channel planes, carried as whichever pixel width
/// the codestream declared (`modular_16bit_buffers` in the image metadata).
/// This mirrors `jxl_modular::Sample` being implemented for both `i16` and
/// `i32`: rather than decode generically over a type parameter the caller
/// has to name, the facade picks the width at runtime and returns the
/// matching variant.
#[derive(Debug)]
pub enum Planes {
    Narrow(Vec<SimpleGrid<i16>>),
    Wide(Vec<SimpleGrid<i32>>),
}

impl Planes {
    pub fn len(&self) -> usize {
        match self {
            Self::Narrow(planes) => planes.len(),
            Self::Wide(planes) => planes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One decoded frame: its header plus, for a Modular-encoded frame, the
/// fully-inverted channel planes.
#[derive(Debug)]
pub struct DecodedFrame {
    pub header: jxl_frame::FrameHeader,
    pub planes: Planes,
}

/// The result of decoding a whole codestream: the image header (shared by
/// every frame) plus each frame decoded in bitstream order.
#[derive(Debug)]
pub struct DecodedImage {
    pub image_header: ImageHeader,
    pub frames: Vec<DecodedFrame>,
}

/// Entry point: detects framing, assembles the codestream, and decodes
/// every frame.
pub struct JxlDecoder {
    alloc_budget: usize,
}

impl Default for JxlDecoder {
    fn default() -> Self {
        Self { alloc_budget: DEFAULT_ALLOC_BUDGET }
    }
}

impl JxlDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the allocation budget passed to every channel/LZ77/error-row
    /// buffer this decode allocates (see `jxl_grid::AllocTracker`).
    pub fn with_alloc_budget(alloc_budget: usize) -> Self {
        Self { alloc_budget }
    }

    /// Decodes a complete byte slice: a bare `FF 0A` codestream, or an
    /// ISOBMFF-like container whose `jxlc`/`jxlp` boxes are assembled into
    /// one codestream first.
    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedImage> {
        let codestream = match ContainerParser::detect(bytes) {
            jxl_bitstream::BitstreamKind::Container => ContainerParser::assemble_codestream(bytes)?,
            jxl_bitstream::BitstreamKind::BareCodestream => bytes.to_vec(),
            jxl_bitstream::BitstreamKind::Unknown => {
                return Err(Error::ShortInput);
            }
            jxl_bitstream::BitstreamKind::Invalid => {
                return Err(Error::NotJxl);
            }
        };

        let tracker = AllocTracker::with_limit(self.alloc_budget);
        let mut bitstream = Bitstream::new(&codestream);
        let image_header = ImageHeader::parse(&mut bitstream, ())?;

        let mut frames = Vec::new();
        loop {
            let header_before = bitstream.num_read_bits();
            let decoded = decode_one_frame(&mut bitstream, &image_header, Some(&tracker))?;
            let is_last = decoded.header.is_last;
            frames.push(decoded);
            if is_last {
                break;
            }
            if bitstream.remaining_bytes().is_empty() {
                // Made no further progress and ran out of input without a
                // frame marked `is_last`: treat as a truncated codestream
                // rather than looping forever.
                if bitstream.num_read_bits() == header_before {
                    return Err(Error::ShortInput);
                }
                break;
            }
        }

        Ok(DecodedImage { image_header, frames })
    }
}

fn decode_one_frame(
    bitstream: &mut Bitstream<'_>,
    image_header: &ImageHeader,
    tracker: Option<&AllocTracker>,
) -> Result<DecodedFrame> {
    if image_header.metadata.modular_16bit_buffers {
        let frame = Frame::<i16>::parse(bitstream, image_header, tracker)?;
        into_decoded_frame(frame, Planes::Narrow)
    } else {
        let frame = Frame::<i32>::parse(bitstream, image_header, tracker)?;
        into_decoded_frame(frame, Planes::Wide)
    }
}

fn into_decoded_frame<S, F>(frame: Frame<S>, wrap: F) -> Result<DecodedFrame>
where
    S: jxl_modular::Sample,
    F: FnOnce(Vec<SimpleGrid<S>>) -> Planes,
{
    if frame.header().encoding == Encoding::VarDct {
        return Err(Error::VarDctUnsupported);
    }

    let (header, _toc, lf_global) = frame.into_parts();
    let planes = lf_global
        .gmodular
        .modular
        .into_image_channels()
        .ok_or(Error::FrameAlreadyConsumed)??;

    Ok(DecodedFrame { header, planes: wrap(planes) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_short_input_is_rejected() {
        let decoder = JxlDecoder::new();
        let err = decoder.decode(&[0x00]).unwrap_err();
        assert!(matches!(err, Error::ShortInput));
    }

    #[test]
    fn garbage_signature_is_rejected() {
        let decoder = JxlDecoder::new();
        let bytes = [0x12u8; 16];
        let err = decoder.decode(&bytes).unwrap_err();
        assert!(matches!(err, Error::NotJxl));
    }
}
