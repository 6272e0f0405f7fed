#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    InvalidMaTree,
    GlobalMaTreeNotAvailable,
    InvalidRctParams,
    InvalidPaletteParams,
    InvalidSqueezeParams,
    SqueezeNotSupported,
    TooManyTransforms(u32),
    TooManyChannels(usize),
    PixelOverflow { value: i64, bit_depth: u32 },
    Bitstream(jxl_bitstream::Error),
    Decoder(jxl_coding::Error),
    Buffer(jxl_grid::Error),
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

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Error::*;
        match self {
            InvalidMaTree => write!(f, "invalid meta-adaptive tree"),
            GlobalMaTreeNotAvailable => write!(f, "global meta-adaptive tree requested but unavailable"),
            InvalidRctParams => write!(f, "invalid RCT transform parameters"),
            InvalidPaletteParams => write!(f, "invalid Palette transform parameters"),
            InvalidSqueezeParams => write!(f, "invalid Squeeze transform parameters"),
            SqueezeNotSupported => write!(f, "Squeeze inverse transform is not implemented"),
            TooManyTransforms(n) => write!(f, "nb_transforms {n} exceeds the conformance limit"),
            TooManyChannels(n) => write!(f, "transformed channel count {n} exceeds the conformance limit"),
            PixelOverflow { value, bit_depth } => {
                write!(f, "decoded pixel value {value} is outside the {bit_depth}-bit channel's nominal range")
            }
            Bitstream(err) => write!(f, "bitstream error: {err}"),
            Decoder(err) => write!(f, "entropy decoder error: {err}"),
            Buffer(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use Error::*;
        match self {
            Bitstream(err) => Some(err),
            Decoder(err) => Some(err),
            Buffer(err) => Some(err),
            _ => None,
        }
    }
}

impl Error {
    pub fn unexpected_eof(&self) -> bool {
        match self {
            Error::Bitstream(e) => e.unexpected_eof(),
            Error::Decoder(e) => e.unexpected_eof(),
            _ => false,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
