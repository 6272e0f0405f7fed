#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    Bitstream(jxl_bitstream::Error),
    Decoder(jxl_coding::Error),
    Buffer(jxl_grid::Error),
    Modular(jxl_modular::Error),
    VarDct(jxl_vardct::Error),
    InvalidTocPermutation,
    MissingLfGlobal,
    TooManySplines(usize),
    TooManySplinePoints(usize),
    OutOfMemory,
    UnsupportedMultiGroupModular,
}

impl From<jxl_bitstream::Error> for Error {
    fn from(err: jxl_bitstream::Error) -> Self {
        Self::Bitstream(err)
    }
}

impl From<jxl_coding::Error> for Error {
    fn from(err: jxl_coding::Error) -> Self {
        Self::Decoder(err)
    }
}

impl From<jxl_grid::Error> for Error {
    fn from(err: jxl_grid::Error) -> Self {
        Self::Buffer(err)
    }
}

impl From<jxl_modular::Error> for Error {
    fn from(err: jxl_modular::Error) -> Self {
        Self::Modular(err)
    }
}

impl From<jxl_vardct::Error> for Error {
    fn from(err: jxl_vardct::Error) -> Self {
        Self::VarDct(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bitstream(err) => write!(f, "bitstream error: {err}"),
            Self::Decoder(err) => write!(f, "entropy decoder error: {err}"),
            Self::Buffer(err) => write!(f, "{err}"),
            Self::Modular(err) => write!(f, "modular stream error: {err}"),
            Self::VarDct(err) => write!(f, "vardct error: {err}"),
            Self::InvalidTocPermutation => write!(f, "invalid TOC permutation"),
            Self::MissingLfGlobal => write!(f, "frame table of contents has no LfGlobal section"),
            Self::TooManySplines(n) => write!(f, "too many splines ({n})"),
            Self::TooManySplinePoints(n) => write!(f, "too many spline control points ({n})"),
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::UnsupportedMultiGroupModular => write!(
                f,
                "modular channel data split across LF groups and pass groups is not supported"
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bitstream(err) => Some(err),
            Self::Decoder(err) => Some(err),
            Self::Buffer(err) => Some(err),
            Self::Modular(err) => Some(err),
            Self::VarDct(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
