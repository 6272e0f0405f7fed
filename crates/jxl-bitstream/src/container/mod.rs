mod box_header;

pub use box_header::{ContainerBoxHeader, ContainerBoxType};

use box_header::HeaderParseResult;

use crate::{Error, Result};

/// What kind of framing a byte slice appears to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitstreamKind {
    /// Not enough bytes yet to tell.
    Unknown,
    /// Starts with the raw codestream signature `FF 0A`.
    BareCodestream,
    /// Starts with the ISOBMFF-like `JXL ` signature box.
    Container,
    /// Neither signature matched.
    Invalid,
}

const CODESTREAM_SIGNATURE: [u8; 2] = [0xff, 0x0a];
const CONTAINER_SIGNATURE: [u8; 12] = [
    0x00, 0x00, 0x00, 0x0c, 0x4a, 0x58, 0x4c, 0x20, 0x0d, 0x0a, 0x87, 0x0a,
];

/// One event produced while walking a container byte slice.
#[derive(Debug)]
pub enum ParseEvent<'buf> {
    BitstreamKind(BitstreamKind),
    /// A range of codestream bytes, in codestream order. May be emitted
    /// multiple times if the codestream is split across `jxlp` boxes.
    Codestream(&'buf [u8]),
    /// An auxiliary (non-codestream) box was encountered; its type and raw
    /// payload are reported but not interpreted further by this crate.
    AuxBox {
        ty: ContainerBoxType,
        data: &'buf [u8],
    },
}

/// Detects framing and, for containers, assembles the codestream from
/// `jxlc`/`jxlp` boxes in order.
///
/// This operates on a single complete byte slice rather than an
/// incrementally-fed stream: the input to this crate is a byte slice (see
/// the external-interfaces contract), so there is no I/O suspension to
/// model. The only "re-entry" the format requires -- continuing to read
/// codestream bytes across a `jxlp` part boundary -- falls out naturally
/// from concatenating the parts before handing them to the bit reader.
pub struct ContainerParser;

impl ContainerParser {
    pub fn detect(bytes: &[u8]) -> BitstreamKind {
        if bytes.len() >= CODESTREAM_SIGNATURE.len() && bytes[..2] == CODESTREAM_SIGNATURE {
            return BitstreamKind::BareCodestream;
        }
        if bytes.len() >= CONTAINER_SIGNATURE.len() && bytes[..12] == CONTAINER_SIGNATURE {
            return BitstreamKind::Container;
        }
        if bytes.len() < CONTAINER_SIGNATURE.len() {
            return BitstreamKind::Unknown;
        }
        BitstreamKind::Invalid
    }

    /// Walks every box in `bytes`, calling `on_event` for each. `bytes` must
    /// start with the container signature box (use [`Self::detect`] first).
    pub fn walk<'buf>(
        bytes: &'buf [u8],
        mut on_event: impl FnMut(ParseEvent<'buf>),
    ) -> Result<()> {
        on_event(ParseEvent::BitstreamKind(BitstreamKind::Container));

        let mut rest = bytes;
        while !rest.is_empty() {
            let (header, header_size) = match ContainerBoxHeader::parse(rest)? {
                HeaderParseResult::Done { header, header_size } => (header, header_size),
                HeaderParseResult::NeedMoreData => {
                    return Err(Error::ValidationFailed("truncated box header"));
                }
            };

            let payload_start = header_size;
            let payload = match header.box_size() {
                Some(size) => {
                    let size = size as usize;
                    if rest.len() < payload_start + size {
                        return Err(Error::ValidationFailed("truncated box payload"));
                    }
                    &rest[payload_start..payload_start + size]
                }
                None => &rest[payload_start..],
            };

            let consumed = payload_start + payload.len();

            match header.box_type() {
                ContainerBoxType::CODESTREAM => {
                    on_event(ParseEvent::Codestream(payload));
                }
                ContainerBoxType::PARTIAL_CODESTREAM => {
                    if payload.len() < 4 {
                        return Err(Error::ValidationFailed("jxlp box too small for index"));
                    }
                    let (_index_bytes, codestream) = payload.split_at(4);
                    on_event(ParseEvent::Codestream(codestream));
                }
                ty => {
                    on_event(ParseEvent::AuxBox { ty, data: payload });
                }
            }

            rest = &rest[consumed..];
        }

        Ok(())
    }

    /// Convenience wrapper over [`Self::walk`] that concatenates every
    /// codestream-carrying box into a single owned buffer, preserving
    /// codestream order.
    pub fn assemble_codestream(bytes: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        Self::walk(bytes, |event| {
            if let ParseEvent::Codestream(chunk) = event {
                out.extend_from_slice(chunk);
            }
        })?;
        Ok(out)
    }
}
