//! rANS distribution parsing and alias-table decoding (RFC/spec section 4.3).

use jxl_bitstream::Bitstream;

use crate::{Error, Result};

/// One bucket of the alias table for a 12-bit-normalized distribution.
///
/// `dist` holds this bucket's own share of the probability mass (`D[i]`);
/// `alias_cutoff`/`alias_symbol`/`alias_offset` describe where the bucket's
/// leftover capacity was filled in from during the Vose walk. Settled
/// buckets (`alias_cutoff == bucket_size`) map every position back to
/// themselves; the source aliases this storage with the construction-time
/// "unsettled" link, but here the two phases just read disjoint fields of
/// the same plain struct instead.
#[derive(Debug, Clone, Copy)]
struct Bucket {
    dist: u16,
    alias_cutoff: u16,
    alias_symbol: u16,
    alias_offset: u16,
}

#[derive(Debug, Clone)]
pub struct Histogram {
    buckets: Vec<Bucket>,
    log_bucket_size: u32,
    bucket_mask: u32,
    single_symbol: Option<u32>,
}

impl Histogram {
    /// `log_alphabet_size`: `5 + u(2)`, so in `[5, 8]`.
    pub fn parse(bitstream: &mut Bitstream, log_alphabet_size: u32) -> Result<Self> {
        debug_assert!((5..=8).contains(&log_alphabet_size));
        let table_size = 1usize << log_alphabet_size;
        let log_bucket_size = 12 - log_alphabet_size;
        let bucket_size = 1u16 << log_bucket_size;

        let alphabet_size;
        let mut dist = vec![0u16; table_size];
        if bitstream.read_bool()? {
            if bitstream.read_bool()? {
                // binary
                let v0 = read_u8(bitstream)? as usize;
                let v1 = read_u8(bitstream)? as usize;
                if v0 == v1 {
                    return Err(Error::InvalidAnsHistogram);
                }
                alphabet_size = v0.max(v1) + 1;
                if alphabet_size > table_size {
                    return Err(Error::InvalidAnsHistogram);
                }
                let prob = bitstream.read_bits(12)? as u16;
                dist[v0] = prob;
                dist[v1] = (1u16 << 12) - prob;
            } else {
                // unary
                let val = read_u8(bitstream)? as usize;
                alphabet_size = val + 1;
                if alphabet_size > table_size {
                    return Err(Error::InvalidAnsHistogram);
                }
                dist[val] = 1 << 12;
            }
        } else if bitstream.read_bool()? {
            // evenly distributed
            alphabet_size = read_u8(bitstream)? as usize + 1;
            if alphabet_size > table_size {
                return Err(Error::InvalidAnsHistogram);
            }
            let base = (1usize << 12) / alphabet_size;
            let leftover = (1usize << 12) % alphabet_size;
            dist[0..leftover].fill(base as u16 + 1);
            dist[leftover..alphabet_size].fill(base as u16);
        } else {
            // bit-counted + RLE, one implicit "omit" slot
            let mut len = 0usize;
            while len < 3 {
                if bitstream.read_bool()? {
                    len += 1;
                } else {
                    break;
                }
            }
            let shift = (bitstream.read_bits(len)? + (1 << len) - 1) as i16;
            if shift > 13 {
                return Err(Error::InvalidAnsHistogram);
            }
            alphabet_size = read_u8(bitstream)? as usize + 3;
            if alphabet_size > table_size {
                return Err(Error::InvalidAnsHistogram);
            }

            let mut repeat_ranges = Vec::new();
            let mut omit_data = None;
            let mut idx = 0;
            while idx < alphabet_size {
                dist[idx] = read_prefix(bitstream)?;
                if dist[idx] == 13 {
                    let repeat_count = read_u8(bitstream)? as usize + 4;
                    if idx + repeat_count > alphabet_size {
                        return Err(Error::InvalidAnsHistogram);
                    }
                    repeat_ranges.push(idx..(idx + repeat_count));
                    idx += repeat_count;
                    continue;
                }
                match &mut omit_data {
                    Some((log, pos)) => {
                        if dist[idx] > *log {
                            *log = dist[idx];
                            *pos = idx;
                        }
                    }
                    data => *data = Some((dist[idx], idx)),
                }
                idx += 1;
            }
            let Some((_, omit_pos)) = omit_data else {
                return Err(Error::InvalidAnsHistogram);
            };
            if dist.get(omit_pos + 1) == Some(&13) {
                return Err(Error::InvalidAnsHistogram);
            }

            let mut repeat_range_idx = 0usize;
            let mut acc = 0u16;
            let mut prev_dist = 0u16;
            for (idx, code) in dist.iter_mut().enumerate() {
                if repeat_range_idx < repeat_ranges.len() && repeat_ranges[repeat_range_idx].start <= idx {
                    if repeat_ranges[repeat_range_idx].end == idx {
                        repeat_range_idx += 1;
                    } else {
                        *code = prev_dist;
                        acc += *code;
                        if acc > (1 << 12) {
                            return Err(Error::InvalidAnsHistogram);
                        }
                        continue;
                    }
                }

                if *code == 0 {
                    prev_dist = 0;
                    continue;
                }
                if idx == omit_pos {
                    prev_dist = 0;
                    continue;
                }
                if *code > 1 {
                    let zeros = (*code - 1) as i16;
                    let bitcount = (shift - ((12 - zeros) >> 1)).clamp(0, zeros);
                    *code = (1 << zeros) + ((bitstream.read_bits(bitcount as usize)? as u16) << (zeros - bitcount));
                }
                prev_dist = *code;
                acc += *code;
                if acc > (1 << 12) {
                    return Err(Error::InvalidAnsHistogram);
                }
            }
            dist[omit_pos] = (1 << 12) - acc;
        }

        if dist.iter().sum::<u16>() != 1 << 12 {
            return Err(Error::InvalidAnsHistogram);
        }

        if let Some(single_sym_idx) = dist.iter().position(|&d| d == 1 << 12) {
            let buckets = dist
                .into_iter()
                .enumerate()
                .map(|(i, dist)| Bucket {
                    dist,
                    alias_cutoff: 0,
                    alias_symbol: single_sym_idx as u16,
                    alias_offset: bucket_size * i as u16,
                })
                .collect();
            return Ok(Self {
                buckets,
                log_bucket_size,
                bucket_mask: (1 << log_bucket_size) - 1,
                single_symbol: Some(single_sym_idx as u32),
            });
        }

        let mut working: Vec<Bucket> = dist
            .into_iter()
            .enumerate()
            .map(|(i, dist)| Bucket {
                dist,
                alias_cutoff: dist,
                alias_symbol: if i < alphabet_size { i as u16 } else { 0 },
                alias_offset: 0,
            })
            .collect();

        let mut underfull = Vec::new();
        let mut overfull = Vec::new();
        for (idx, bucket) in working.iter().enumerate() {
            match bucket.dist.cmp(&bucket_size) {
                std::cmp::Ordering::Less => underfull.push(idx),
                std::cmp::Ordering::Equal => {}
                std::cmp::Ordering::Greater => overfull.push(idx),
            }
        }
        while let (Some(o), Some(u)) = (overfull.pop(), underfull.pop()) {
            let by = bucket_size - working[u].alias_cutoff;
            working[o].alias_cutoff -= by;
            working[u].alias_symbol = o as u16;
            working[u].alias_offset = working[o].alias_cutoff;
            match working[o].alias_cutoff.cmp(&bucket_size) {
                std::cmp::Ordering::Less => underfull.push(o),
                std::cmp::Ordering::Equal => {}
                std::cmp::Ordering::Greater => overfull.push(o),
            }
        }

        let buckets = working
            .iter()
            .enumerate()
            .map(|(idx, bucket)| {
                if bucket.alias_cutoff == bucket_size {
                    Bucket {
                        dist: bucket.dist,
                        alias_cutoff: bucket_size,
                        alias_symbol: idx as u16,
                        alias_offset: 0,
                    }
                } else {
                    Bucket {
                        dist: bucket.dist,
                        alias_cutoff: bucket.alias_cutoff,
                        alias_symbol: bucket.alias_symbol,
                        alias_offset: bucket.alias_offset - bucket.alias_cutoff,
                    }
                }
            })
            .collect();

        Ok(Self {
            buckets,
            log_bucket_size,
            bucket_mask: (1 << log_bucket_size) - 1,
            single_symbol: None,
        })
    }

    /// Decodes one symbol, advancing the rANS state and pulling fresh bits
    /// from the stream when the state underflows.
    #[inline]
    pub fn read_symbol(&self, bitstream: &mut Bitstream, state: &mut u32) -> Result<u32> {
        let index = *state & 0xfff;
        let i = (index >> self.log_bucket_size) as usize;
        let pos = index & self.bucket_mask;
        let bucket = self.buckets[i];

        let (symbol, offset) = if pos < bucket.alias_cutoff as u32 {
            (i as u32, 0u32)
        } else {
            (bucket.alias_symbol as u32, bucket.alias_offset as u32)
        };
        let dist = self.buckets[symbol as usize].dist as u32;

        let next_state = dist * (*state >> 12) + offset + pos;
        *state = if next_state < (1 << 16) {
            let appended = (next_state << 16) | bitstream.peek_bits(16);
            bitstream.consume_bits(16)?;
            appended
        } else {
            next_state
        };
        Ok(symbol)
    }

    #[inline]
    pub fn single_symbol(&self) -> Option<u32> {
        self.single_symbol
    }
}

fn read_u8(bitstream: &mut Bitstream) -> Result<u8> {
    Ok(if bitstream.read_bool()? {
        let n = bitstream.read_bits(3)? as usize;
        ((1 << n) + bitstream.read_bits(n)?) as u8
    } else {
        0
    })
}

fn read_prefix(bitstream: &mut Bitstream) -> Result<u16> {
    Ok(match bitstream.read_bits(3)? {
        0 => 10,
        1 => {
            for val in [4, 0, 11, 13] {
                if bitstream.read_bool()? {
                    return Ok(val);
                }
            }
            12
        }
        2 => 7,
        3 => {
            if bitstream.read_bool()? {
                1
            } else {
                3
            }
        }
        4 => 6,
        5 => 8,
        6 => 9,
        7 => {
            if bitstream.read_bool()? {
                2
            } else {
                5
            }
        }
        _ => unreachable!(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_symbol_distribution_always_decodes_same_symbol() {
        // unary: bit 1, bit 1, then read_u8 for val=0 (bit 0 -> val 0).
        let bytes = [0b0000_0011u8, 0, 0, 0];
        let mut bs = Bitstream::new(&bytes);
        let hist = Histogram::parse(&mut bs, 5).unwrap();
        assert_eq!(hist.single_symbol(), Some(0));

        let mut state = 0x130000u32;
        let bytes = [0u8; 8];
        let mut reader = Bitstream::new(&bytes);
        let sym = hist.read_symbol(&mut reader, &mut state).unwrap();
        assert_eq!(sym, 0);
    }
}
