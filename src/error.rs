#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// Input ended before framing (container vs. bare codestream) could be
    /// determined, or a frame ran out of input mid-decode.
    ShortInput,
    /// Neither the bare-codestream nor the container signature matched.
    NotJxl,
    /// A VarDCT-encoded frame was reached; this core only produces pixels
    /// for Modular frames (see `jxl_vardct`'s parsing-only stub).
    VarDctUnsupported,
    /// `Modular::into_image_channels` was already called once for this
    /// frame; should not happen since the facade only calls it once.
    FrameAlreadyConsumed,
    Bitstream(jxl_bitstream::Error),
    Image(jxl_image::Error),
    Frame(jxl_frame::Error),
    Modular(jxl_modular::Error),
}

impl From<jxl_bitstream::Error> for Error {
    fn from(err: jxl_bitstream::Error) -> Self {
        Self::Bitstream(err)
    }
}

impl From<jxl_image::Error> for Error {
    fn from(err: jxl_image::Error) -> Self {
        Self::Image(err)
    }
}

impl From<jxl_frame::Error> for Error {
    fn from(err: jxl_frame::Error) -> Self {
        Self::Frame(err)
    }
}

impl From<jxl_modular::Error> for Error {
    fn from(err: jxl_modular::Error) -> Self {
        Self::Modular(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShortInput => write!(f, "input ended before it could be decoded"),
            Self::NotJxl => write!(f, "input is neither a JPEG XL codestream nor container"),
            Self::VarDctUnsupported => write!(f, "VarDCT frame decoding is not implemented"),
            Self::FrameAlreadyConsumed => write!(f, "frame's modular image was already consumed"),
            Self::Bitstream(err) => write!(f, "{err}"),
            Self::Image(err) => write!(f, "image header error: {err}"),
            Self::Frame(err) => write!(f, "frame error: {err}"),
            Self::Modular(err) => write!(f, "modular stream error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bitstream(err) => Some(err),
            Self::Image(err) => Some(err),
            Self::Frame(err) => Some(err),
            Self::Modular(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
