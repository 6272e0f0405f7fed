//! Entropy decoder shared by the modular and VarDCT pipelines: canonical
//! prefix codes, rANS with alias-table decoding, the hybrid-integer token
//! scheme, and the LZ77 back-reference overlay that sits in front of both.

use jxl_bitstream::Bitstream;

mod ans;
mod error;
mod permutation;
mod prefix;

pub use error::Error;
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub use permutation::read_permutation;

/// An entropy decoder for a single code spec (one `num_dist`-sized group of
/// contexts sharing a cluster map, config set and coding method).
#[derive(Debug, Clone)]
pub struct Decoder {
    lz77: Lz77,
    inner: DecoderInner,
}

impl Decoder {
    /// Reads LZ77 params, the cluster map, per-cluster hybrid-int configs
    /// and the prefix/rANS distributions from the bitstream.
    pub fn parse(bitstream: &mut Bitstream, num_dist: u32) -> Result<Self> {
        let lz77 = Lz77::parse(bitstream)?;
        let num_dist = if matches!(lz77, Lz77::Disabled) {
            num_dist
        } else {
            num_dist + 1
        };
        let inner = DecoderInner::parse(bitstream, num_dist)?;
        Ok(Self { lz77, inner })
    }

    /// Like [`Self::parse`], but rejects a code spec that enables LZ77 —
    /// used for the single-distribution streams nested inside a cluster map
    /// or a TOC permutation, where a back-reference overlay makes no sense.
    fn parse_assume_no_lz77(bitstream: &mut Bitstream, num_dist: u32) -> Result<Self> {
        let lz77_enabled = bitstream.read_bool()?;
        if lz77_enabled {
            return Err(Error::Lz77NotAllowed);
        }
        let inner = DecoderInner::parse(bitstream, num_dist)?;
        Ok(Self { lz77: Lz77::Disabled, inner })
    }

    /// Reads one value from context `ctx`, with no LZ77 distance scaling.
    #[inline]
    pub fn read_varint(&mut self, bitstream: &mut Bitstream, ctx: u32) -> Result<u32> {
        self.read_varint_with_multiplier(bitstream, ctx, 0)
    }

    /// Reads one value from context `ctx`. `dist_multiplier` scales LZ77
    /// special distances and should be the modular channel's row stride
    /// (or 0 outside the modular pipeline, where LZ77 distances are plain).
    #[inline]
    pub fn read_varint_with_multiplier(
        &mut self,
        bitstream: &mut Bitstream,
        ctx: u32,
        dist_multiplier: u32,
    ) -> Result<u32> {
        let cluster = self.inner.clusters[ctx as usize];
        self.read_varint_with_multiplier_clustered(bitstream, cluster, dist_multiplier)
    }

    /// Same as [`Self::read_varint_with_multiplier`], but takes an
    /// already-resolved cluster id rather than a context.
    #[inline]
    pub fn read_varint_with_multiplier_clustered(
        &mut self,
        bitstream: &mut Bitstream,
        cluster: u8,
        dist_multiplier: u32,
    ) -> Result<u32> {
        match &mut self.lz77 {
            Lz77::Enabled { state, min_symbol, min_length } => {
                let min_symbol = *min_symbol;
                let min_length = *min_length;
                self.inner.read_varint_with_multiplier_clustered_lz77(
                    bitstream,
                    cluster,
                    dist_multiplier,
                    state,
                    min_symbol as u16,
                    min_length,
                )
            }
            Lz77::Disabled => self.inner.read_varint_clustered(bitstream, cluster),
        }
    }

    /// The single symbol this cluster always emits, if its distribution is
    /// degenerate and that symbol decodes to a plain (non-LZ77) token.
    #[inline]
    pub fn single_token(&self, cluster: u8) -> Option<u32> {
        self.inner.single_token(cluster)
    }

    /// Reads the initial rANS state. Harmless to skip: the state is lazily
    /// initialized on first read. Exposed so callers can pin down exactly
    /// where in the bitstream the 32-bit initial state lives.
    #[inline]
    pub fn begin(&mut self, bitstream: &mut Bitstream) -> Result<()> {
        self.inner.code.begin(bitstream)
    }

    /// Checks the rANS final state against the value the format mandates.
    /// Always succeeds for prefix-coded streams.
    #[inline]
    pub fn finalize(&self) -> Result<()> {
        self.inner.code.finalize()
    }

    /// The resolved context-to-cluster mapping.
    #[inline]
    pub fn cluster_map(&self) -> &[u8] {
        &self.inner.clusters
    }
}

#[derive(Debug, Clone)]
enum Lz77 {
    Disabled,
    Enabled {
        min_symbol: u32,
        min_length: u32,
        state: Lz77State,
    },
}

impl Lz77 {
    fn parse(bitstream: &mut Bitstream) -> Result<Self> {
        Ok(if bitstream.read_bool()? {
            let min_symbol = bitstream.read_u32([
                jxl_bitstream::U32Specifier::Constant(224),
                jxl_bitstream::U32Specifier::Constant(512),
                jxl_bitstream::U32Specifier::Constant(4096),
                jxl_bitstream::U32Specifier::BitsOffset(8, 15),
            ])?;
            let min_length = bitstream.read_u32([
                jxl_bitstream::U32Specifier::Constant(3),
                jxl_bitstream::U32Specifier::Constant(4),
                jxl_bitstream::U32Specifier::BitsOffset(5, 2),
                jxl_bitstream::U32Specifier::BitsOffset(9, 8),
            ])?;
            let lz_len_conf = IntegerConfig::parse(bitstream, 8)?;
            Self::Enabled {
                min_symbol,
                min_length,
                state: Lz77State::new(lz_len_conf),
            }
        } else {
            Self::Disabled
        })
    }
}

#[derive(Clone)]
struct Lz77State {
    lz_len_conf: IntegerConfig,
    window: Vec<u32>,
    num_to_copy: u32,
    copy_pos: u32,
    num_decoded: u32,
}

impl std::fmt::Debug for Lz77State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lz77State")
            .field("num_to_copy", &self.num_to_copy)
            .field("copy_pos", &self.copy_pos)
            .field("num_decoded", &self.num_decoded)
            .finish_non_exhaustive()
    }
}

impl Lz77State {
    const WINDOW_LEN: usize = 1 << 20;

    fn new(lz_len_conf: IntegerConfig) -> Self {
        Self {
            lz_len_conf,
            window: Vec::new(),
            num_to_copy: 0,
            copy_pos: 0,
            num_decoded: 0,
        }
    }

    fn window_mut(&mut self) -> &mut Vec<u32> {
        if self.window.is_empty() {
            self.window = vec![0u32; Self::WINDOW_LEN];
        }
        &mut self.window
    }
}

#[derive(Debug, Clone, Copy)]
struct IntegerConfig {
    split_exponent: u32,
    split: u32,
    msb_in_token: u32,
    lsb_in_token: u32,
}

impl IntegerConfig {
    fn parse(bitstream: &mut Bitstream, log_alphabet_size: u32) -> Result<Self> {
        let split_exponent_bits = add_log2_ceil(log_alphabet_size) as usize;
        let split_exponent = bitstream.read_bits(split_exponent_bits)?;
        let (msb_in_token, lsb_in_token) = if split_exponent != log_alphabet_size {
            let msb_bits = add_log2_ceil(split_exponent) as usize;
            let msb_in_token = bitstream.read_bits(msb_bits)?;
            if msb_in_token > split_exponent {
                return Err(Error::InvalidIntegerConfig);
            }
            let lsb_bits = add_log2_ceil(split_exponent - msb_in_token) as usize;
            let lsb_in_token = bitstream.read_bits(lsb_bits)?;
            (msb_in_token, lsb_in_token)
        } else {
            (0u32, 0u32)
        };
        if lsb_in_token + msb_in_token > split_exponent {
            return Err(Error::InvalidIntegerConfig);
        }
        Ok(Self {
            split_exponent,
            split: 1 << split_exponent,
            msb_in_token,
            lsb_in_token,
        })
    }
}

#[derive(Debug, Clone)]
struct DecoderInner {
    clusters: Vec<u8>,
    configs: Vec<IntegerConfig>,
    code: Coder,
}

impl DecoderInner {
    fn parse(bitstream: &mut Bitstream, num_dist: u32) -> Result<Self> {
        let (num_clusters, clusters) = read_clusters(bitstream, num_dist)?;
        let use_prefix_code = bitstream.read_bool()?;
        let log_alphabet_size = if use_prefix_code {
            15
        } else {
            5 + bitstream.read_bits(2)?
        };
        let configs = (0..num_clusters)
            .map(|_| IntegerConfig::parse(bitstream, log_alphabet_size))
            .collect::<Result<Vec<_>>>()?;
        let code = if use_prefix_code {
            let counts = (0..num_clusters)
                .map(|_| -> Result<_> {
                    let count = if bitstream.read_bool()? {
                        let n = bitstream.read_bits(4)? as usize;
                        1 + (1 << n) + bitstream.read_bits(n)?
                    } else {
                        1
                    };
                    if count > 1 << 15 {
                        return Err(Error::InvalidPrefixHistogram);
                    }
                    Ok(count)
                })
                .collect::<Result<Vec<_>>>()?;
            let dist = counts
                .into_iter()
                .map(|count| prefix::Histogram::parse(bitstream, count))
                .collect::<Result<Vec<_>>>()?;
            Coder::PrefixCode(dist)
        } else {
            let dist = (0..num_clusters)
                .map(|_| ans::Histogram::parse(bitstream, log_alphabet_size))
                .collect::<Result<Vec<_>>>()?;
            Coder::Ans { dist, state: 0, initial: true }
        };
        Ok(Self { clusters, configs, code })
    }

    #[inline]
    fn single_token(&self, cluster: u8) -> Option<u32> {
        let single_symbol = self.code.single_symbol(cluster)? as u32;
        let IntegerConfig { split, .. } = self.configs[cluster as usize];
        (single_symbol < split).then_some(single_symbol)
    }

    #[inline]
    fn read_varint_clustered(&mut self, bitstream: &mut Bitstream, cluster: u8) -> Result<u32> {
        let token = self.code.read_symbol(bitstream, cluster)?;
        Self::read_uint(bitstream, &self.configs[cluster as usize], token as u32)
    }

    fn read_varint_with_multiplier_clustered_lz77(
        &mut self,
        bitstream: &mut Bitstream,
        cluster: u8,
        dist_multiplier: u32,
        state: &mut Lz77State,
        min_symbol: u16,
        min_length: u32,
    ) -> Result<u32> {
        const SPECIAL_DISTANCES: [[i8; 2]; 120] = [
            [0, 1], [1, 0], [1, 1], [-1, 1], [0, 2], [2, 0], [1, 2], [-1, 2], [2, 1], [-2, 1], [2, 2],
            [-2, 2], [0, 3], [3, 0], [1, 3], [-1, 3], [3, 1], [-3, 1], [2, 3], [-2, 3], [3, 2],
            [-3, 2], [0, 4], [4, 0], [1, 4], [-1, 4], [4, 1], [-4, 1], [3, 3], [-3, 3], [2, 4],
            [-2, 4], [4, 2], [-4, 2], [0, 5], [3, 4], [-3, 4], [4, 3], [-4, 3], [5, 0], [1, 5],
            [-1, 5], [5, 1], [-5, 1], [2, 5], [-2, 5], [5, 2], [-5, 2], [4, 4], [-4, 4], [3, 5],
            [-3, 5], [5, 3], [-5, 3], [0, 6], [6, 0], [1, 6], [-1, 6], [6, 1], [-6, 1], [2, 6],
            [-2, 6], [6, 2], [-6, 2], [4, 5], [-4, 5], [5, 4], [-5, 4], [3, 6], [-3, 6], [6, 3],
            [-6, 3], [0, 7], [7, 0], [1, 7], [-1, 7], [5, 5], [-5, 5], [7, 1], [-7, 1], [4, 6],
            [-4, 6], [6, 4], [-6, 4], [2, 7], [-2, 7], [7, 2], [-7, 2], [3, 7], [-3, 7], [7, 3],
            [-7, 3], [5, 6], [-5, 6], [6, 5], [-6, 5], [8, 0], [4, 7], [-4, 7], [7, 4], [-7, 4],
            [8, 1], [8, 2], [6, 6], [-6, 6], [8, 3], [5, 7], [-5, 7], [7, 5], [-7, 5], [8, 4], [6, 7],
            [-6, 7], [7, 6], [-7, 6], [8, 5], [7, 7], [-7, 7], [8, 6], [8, 7],
        ];

        let r;
        if state.num_to_copy > 0 {
            r = state.window_mut()[(state.copy_pos & 0xfffff) as usize];
            state.copy_pos += 1;
            state.num_to_copy -= 1;
        } else {
            let token = self.code.read_symbol(bitstream, cluster)?;
            if token >= min_symbol {
                let lz_dist_cluster = self.lz_dist_cluster();

                state.num_to_copy = Self::read_uint(bitstream, &state.lz_len_conf, (token - min_symbol) as u32)? + min_length;
                let dist_token = self.code.read_symbol(bitstream, lz_dist_cluster)?;
                let distance = Self::read_uint(bitstream, &self.configs[lz_dist_cluster as usize], dist_token as u32)?;
                let distance = if dist_multiplier == 0 {
                    distance + 1
                } else if distance < 120 {
                    let [offset, dist] = SPECIAL_DISTANCES[distance as usize];
                    let dist = offset as i32 + dist_multiplier as i32 * dist as i32;
                    dist.max(1) as u32
                } else {
                    distance - 119
                };

                if distance == 0 || distance as u64 > state.num_decoded as u64 {
                    return Err(Error::InvalidLz77Symbol);
                }
                let distance = (1u32 << 20).min(distance).min(state.num_decoded);
                state.copy_pos = state.num_decoded - distance;

                r = state.window_mut()[(state.copy_pos & 0xfffff) as usize];
                state.copy_pos += 1;
                state.num_to_copy -= 1;
            } else {
                r = Self::read_uint(bitstream, &self.configs[cluster as usize], token as u32)?;
            }
        }
        let idx = (state.num_decoded & 0xfffff) as usize;
        state.window_mut()[idx] = r;
        state.num_decoded += 1;
        Ok(r)
    }

    #[inline]
    fn read_uint(bitstream: &mut Bitstream, config: &IntegerConfig, token: u32) -> Result<u32> {
        let &IntegerConfig { split_exponent, split, msb_in_token, lsb_in_token } = config;
        if token < split {
            return Ok(token);
        }

        // `token` comes straight off the entropy decoder and can be as
        // large as the cluster's alphabet (up to `1 << 15`, see
        // `InvalidPrefixHistogram`'s check above), so the mid-bit count
        // below can balloon far past what `Bitstream::read_bits` accepts
        // (`u(32)` max) for an adversarial `IntegerConfig`/token pairing.
        // Compute it with checked arithmetic and reject rather than
        // overflow into a bit count the reader would panic on.
        let split_bits = msb_in_token + lsb_in_token;
        let n = split_exponent
            .checked_sub(split_bits)
            .zip((token - split).checked_shr(split_bits))
            .and_then(|(base, extra)| base.checked_add(extra))
            .ok_or(Error::InvalidIntegerConfig)?;
        if n > 32 {
            return Err(Error::InvalidIntegerConfig);
        }
        let low_bits = token & ((1 << lsb_in_token) - 1);
        let token = token >> lsb_in_token;
        let token = token & ((1 << msb_in_token) - 1);
        let token = token | (1 << msb_in_token);
        let rest_bits = bitstream.read_bits(n as usize)?;
        Ok((((token << n) | rest_bits) << lsb_in_token) | low_bits)
    }

    #[inline]
    fn lz_dist_cluster(&self) -> u8 {
        *self.clusters.last().unwrap()
    }
}

#[derive(Debug, Clone)]
enum Coder {
    PrefixCode(Vec<prefix::Histogram>),
    Ans {
        dist: Vec<ans::Histogram>,
        state: u32,
        initial: bool,
    },
}

impl Coder {
    #[inline]
    fn read_symbol(&mut self, bitstream: &mut Bitstream, cluster: u8) -> Result<u16> {
        match self {
            Self::PrefixCode(dist) => dist[cluster as usize].read_symbol(bitstream),
            Self::Ans { dist, state, initial } => {
                if *initial {
                    *state = bitstream.read_bits(32)?;
                    *initial = false;
                }
                Ok(dist[cluster as usize].read_symbol(bitstream, state)? as u16)
            }
        }
    }

    #[inline]
    fn single_symbol(&self, cluster: u8) -> Option<u16> {
        match self {
            Self::PrefixCode(dist) => dist[cluster as usize].single_symbol(),
            Self::Ans { dist, .. } => dist[cluster as usize].single_symbol().map(|s| s as u16),
        }
    }

    fn begin(&mut self, bitstream: &mut Bitstream) -> Result<()> {
        match self {
            Self::PrefixCode(_) => Ok(()),
            Self::Ans { state, initial, .. } => {
                *state = bitstream.read_bits(32)?;
                *initial = false;
                Ok(())
            }
        }
    }

    fn finalize(&self) -> Result<()> {
        match *self {
            Self::PrefixCode(_) => Ok(()),
            Self::Ans { state, .. } => {
                if state == 0x130000 {
                    Ok(())
                } else {
                    Err(Error::InvalidAnsStream)
                }
            }
        }
    }
}

/// `ceil(log2(x + 1))`: the number of bits needed to encode a value in `0..=x`.
fn add_log2_ceil(x: u32) -> u32 {
    (x + 1).next_power_of_two().trailing_zeros()
}

/// Reads the context-to-cluster map shared by a code spec: either `nbits`
/// bits per context, or a nested single-distribution stream optionally
/// followed by a move-to-front decode.
pub fn read_clusters(bitstream: &mut Bitstream, num_dist: u32) -> Result<(u32, Vec<u8>)> {
    if num_dist == 1 {
        return Ok((1, vec![0u8]));
    }

    let (num_clusters, clusters) = if bitstream.read_bool()? {
        let nbits = bitstream.read_bits(2)? as usize;
        let ret = (0..num_dist)
            .map(|_| bitstream.read_bits(nbits).map(|b| b as u8))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let num_clusters = *ret.iter().max().unwrap() as u32 + 1;
        (num_clusters, ret)
    } else {
        let use_mtf = bitstream.read_bool()?;
        let mut decoder = if num_dist <= 2 {
            Decoder::parse_assume_no_lz77(bitstream, 1)?
        } else {
            Decoder::parse(bitstream, 1)?
        };
        decoder.begin(bitstream)?;
        let mut ret = (0..num_dist)
            .map(|_| decoder.read_varint(bitstream, 0).map(|b| b as u8))
            .collect::<Result<Vec<_>>>()?;
        decoder.finalize()?;
        if use_mtf {
            let mut mtfmap = [0u8; 256];
            for (idx, mtf) in mtfmap.iter_mut().enumerate() {
                *mtf = idx as u8;
            }
            for cluster in &mut ret {
                let idx = *cluster as usize;
                *cluster = mtfmap[idx];
                mtfmap.copy_within(0..idx, 1);
                mtfmap[0] = *cluster;
            }
        }
        let num_clusters = *ret.iter().max().unwrap() as u32 + 1;
        (num_clusters, ret)
    };

    let mut seen = vec![false; num_clusters as usize];
    for &c in &clusters {
        if c as u32 >= num_clusters {
            return Err(Error::InvalidCluster(c as u32));
        }
        seen[c as usize] = true;
    }
    let num_actual_clusters = seen.iter().filter(|&&b| b).count() as u32;
    if num_actual_clusters != num_clusters {
        return Err(Error::ClusterHole {
            num_expected_clusters: num_clusters,
            num_actual_clusters,
        });
    }

    Ok((num_clusters, clusters))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_log2_ceil_matches_bit_length() {
        assert_eq!(add_log2_ceil(0), 0);
        assert_eq!(add_log2_ceil(1), 1);
        assert_eq!(add_log2_ceil(8), 4);
        assert_eq!(add_log2_ceil(15), 4);
        assert_eq!(add_log2_ceil(16), 5);
    }

    #[test]
    fn read_clusters_single_distribution_is_trivial() {
        let bytes = [0u8; 4];
        let mut bitstream = Bitstream::new(&bytes);
        let (num_clusters, clusters) = read_clusters(&mut bitstream, 1).unwrap();
        assert_eq!(num_clusters, 1);
        assert_eq!(clusters, vec![0]);
        assert_eq!(bitstream.num_read_bits(), 0);
    }

    #[test]
    fn read_uint_rejects_oversized_mid_bit_count_instead_of_panicking() {
        // split_exponent = msb_in_token = lsb_in_token = 0, so every token
        // past `split` (1) falls straight into the mid-bit branch with
        // `n = token - split`. A token near the top of a 15-bit alphabet
        // would ask `Bitstream::read_bits` for thousands of bits.
        let config = IntegerConfig { split_exponent: 0, split: 1, msb_in_token: 0, lsb_in_token: 0 };
        let bytes = [0u8; 8];
        let mut bitstream = Bitstream::new(&bytes);
        let err = DecoderInner::read_uint(&mut bitstream, &config, (1 << 15) - 1).unwrap_err();
        assert!(matches!(err, Error::InvalidIntegerConfig));
    }

    #[test]
    fn read_uint_accepts_in_range_mid_bit_count() {
        let config = IntegerConfig { split_exponent: 4, split: 16, msb_in_token: 1, lsb_in_token: 1 };
        let bytes = [0u8; 8];
        let mut bitstream = Bitstream::new(&bytes);
        assert!(DecoderInner::read_uint(&mut bitstream, &config, 16).is_ok());
    }
}
