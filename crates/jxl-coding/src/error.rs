use std::fmt;

#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    Bitstream(jxl_bitstream::Error),
    Lz77NotAllowed,
    InvalidAnsHistogram,
    InvalidAnsStream,
    InvalidIntegerConfig,
    InvalidPermutation,
    InvalidPrefixHistogram,
    PrefixSymbolTooLarge(usize),
    InvalidCluster(u32),
    ClusterHole {
        num_expected_clusters: u32,
        num_actual_clusters: u32,
    },
    UnexpectedLz77Repeat,
    InvalidLz77Symbol,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bitstream(e) => write!(f, "{e}"),
            Self::Lz77NotAllowed => write!(f, "LZ77 is not allowed in this context"),
            Self::InvalidAnsHistogram => write!(f, "rANS distribution does not sum to 4096"),
            Self::InvalidAnsStream => write!(f, "rANS stream did not end in the expected state"),
            Self::InvalidIntegerConfig => write!(f, "hybrid-integer config violates msb+lsb<=split_exponent<=log_alpha_size"),
            Self::InvalidPermutation => write!(f, "Lehmer-coded permutation out of range"),
            Self::InvalidPrefixHistogram => write!(f, "prefix code length counts do not form a valid code"),
            Self::PrefixSymbolTooLarge(sym) => write!(f, "prefix code symbol {sym} exceeds alphabet size"),
            Self::InvalidCluster(id) => write!(f, "cluster map references unknown cluster {id}"),
            Self::ClusterHole { num_expected_clusters, num_actual_clusters } => write!(
                f,
                "cluster ids do not form a contiguous range: expected {num_expected_clusters}, found {num_actual_clusters}"
            ),
            Self::UnexpectedLz77Repeat => write!(f, "LZ77 copy requested with no prior decoded tokens"),
            Self::InvalidLz77Symbol => write!(f, "LZ77 distance token decoded out of range"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bitstream(e) => Some(e),
            _ => None,
        }
    }
}

impl From<jxl_bitstream::Error> for Error {
    fn from(value: jxl_bitstream::Error) -> Self {
        Self::Bitstream(value)
    }
}

impl Error {
    pub fn unexpected_eof(&self) -> bool {
        matches!(self, Self::Bitstream(e) if e.unexpected_eof())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
