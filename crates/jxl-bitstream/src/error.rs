use std::fmt;

/// Errors produced while reading bits or demuxing a container.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// The input ended before the requested number of bits was available.
    Io(std::io::Error),
    /// A container box declared an internally inconsistent size.
    InvalidBoxSize,
    /// `zero_pad_to_byte` found a nonzero bit in the padding.
    NonZeroPadding,
    /// A half-precision float decoded to NaN or infinity.
    InvalidFloat,
    /// An `enum()` read produced a value outside of its known range.
    InvalidEnum { name: &'static str, value: u32 },
    /// A checkable bitstream invariant was violated.
    ValidationFailed(&'static str),
    /// A box name was not valid UTF-8 / ASCII.
    NonUtf8Name,
    /// `skip` could not advance by the requested number of bits.
    CannotSkip,
    /// A read was attempted while the cursor was not byte-aligned.
    NotAligned,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "unexpected end of bitstream: {e}"),
            Self::InvalidBoxSize => write!(f, "invalid container box size"),
            Self::NonZeroPadding => write!(f, "nonzero bit padding before byte alignment"),
            Self::InvalidFloat => write!(f, "float16 decoded to NaN or infinity"),
            Self::InvalidEnum { name, value } => {
                write!(f, "invalid value {value} for enum {name}")
            }
            Self::ValidationFailed(what) => write!(f, "validation failed: {what}"),
            Self::NonUtf8Name => write!(f, "box/name field was not valid UTF-8"),
            Self::CannotSkip => write!(f, "cannot skip past end of bitstream"),
            Self::NotAligned => write!(f, "bitstream cursor is not byte-aligned"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl Error {
    /// Whether this error represents running out of input, as opposed to a
    /// structural malformation.
    pub fn unexpected_eof(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
