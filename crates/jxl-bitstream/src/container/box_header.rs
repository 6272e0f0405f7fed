use crate::{Error, Result};

/// 4-character box type tag, e.g. `b"ftyp"`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerBoxType(pub [u8; 4]);

impl std::fmt::Debug for ContainerBoxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "ContainerBoxType({s:?})"),
            Err(_) => write!(f, "ContainerBoxType({:?})", self.0),
        }
    }
}

impl ContainerBoxType {
    pub const SIGNATURE: Self = Self(*b"JXL ");
    pub const FILE_TYPE: Self = Self(*b"ftyp");
    pub const JXL_LEVEL: Self = Self(*b"jxll");
    pub const JUMBF: Self = Self(*b"jumb");
    pub const EXIF: Self = Self(*b"Exif");
    pub const XML: Self = Self(*b"xml ");
    pub const BROTLI_COMPRESSED: Self = Self(*b"brob");
    pub const FRAME_INDEX: Self = Self(*b"jxli");
    pub const CODESTREAM: Self = Self(*b"jxlc");
    pub const PARTIAL_CODESTREAM: Self = Self(*b"jxlp");
    pub const JPEG_RECONSTRUCTION: Self = Self(*b"jbrd");
}

#[derive(Debug, Clone, Copy)]
pub struct ContainerBoxHeader {
    ty: ContainerBoxType,
    /// `None` means "extends to the end of the stream" (32-bit size field
    /// was zero).
    box_size: Option<u64>,
}

pub(super) enum HeaderParseResult {
    Done {
        header: ContainerBoxHeader,
        header_size: usize,
    },
    NeedMoreData,
}

impl ContainerBoxHeader {
    pub(super) fn parse(buf: &[u8]) -> Result<HeaderParseResult> {
        if buf.len() < 8 {
            return Ok(HeaderParseResult::NeedMoreData);
        }

        let small_size = u32::from_be_bytes(buf[0..4].try_into().unwrap());
        let ty = ContainerBoxType(buf[4..8].try_into().unwrap());

        if small_size == 1 {
            if buf.len() < 16 {
                return Ok(HeaderParseResult::NeedMoreData);
            }
            let xlbox = u64::from_be_bytes(buf[8..16].try_into().unwrap());
            let box_size = xlbox.checked_sub(16).ok_or(Error::InvalidBoxSize)?;
            Ok(HeaderParseResult::Done {
                header: Self {
                    ty,
                    box_size: Some(box_size),
                },
                header_size: 16,
            })
        } else if small_size == 0 {
            Ok(HeaderParseResult::Done {
                header: Self { ty, box_size: None },
                header_size: 8,
            })
        } else {
            let box_size = (small_size as u64).checked_sub(8).ok_or(Error::InvalidBoxSize)?;
            Ok(HeaderParseResult::Done {
                header: Self {
                    ty,
                    box_size: Some(box_size),
                },
                header_size: 8,
            })
        }
    }

    pub fn box_type(&self) -> ContainerBoxType {
        self.ty
    }

    /// Box payload size in bytes, excluding the header; `None` if the box
    /// runs to the end of input.
    pub fn box_size(&self) -> Option<u64> {
        self.box_size
    }
}
