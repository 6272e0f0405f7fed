//! Canonical prefix (Huffman) codes, following the Brotli code-length scheme.

use jxl_bitstream::{Bitstream, U32Specifier::Constant};

use crate::{Error, Result};

const CODE_LENGTH_ORDER: [usize; 18] = [
    1, 2, 3, 4, 0, 5, 17, 6, 16, 7, 8, 9, 10, 11, 12, 13, 14, 15,
];

/// A decoded canonical prefix code, ready to read symbols from a bitstream.
///
/// Internally this is the same "config table" shape the rANS alias table
/// build shares conceptually with Brotli decoders: entries are searched in
/// order of increasing code length, with each entry storing the cumulative
/// bit-reversed boundary reached by codes up to that length and the symbol
/// offset at which its block of same-length symbols begins.
#[derive(Debug, Clone)]
pub struct Histogram {
    configs: Vec<u32>,
    symbols: Vec<u16>,
}

impl Histogram {
    fn with_code_lengths(code_lengths: Vec<u8>) -> Result<Self> {
        let mut syms_for_length: Vec<Vec<u16>> = Vec::with_capacity(15);
        for (sym, len) in code_lengths.into_iter().enumerate() {
            let sym = sym as u16;
            if len > 0 {
                if syms_for_length.len() < len as usize {
                    syms_for_length.resize_with(len as usize, Vec::new);
                }
                syms_for_length[len as usize - 1].push(sym);
            }
        }

        let mut configs = Vec::new();
        let mut symbols = Vec::new();
        let mut current_bits = 0u16;
        for (idx, syms) in syms_for_length.into_iter().enumerate() {
            let shifts = 14 - idx;
            let sym_count = syms.len() as u16;
            current_bits += sym_count << shifts;

            configs.push(((current_bits as u32) << 16) | (symbols.len() as u32));
            symbols.extend(syms);
        }

        if current_bits == 1 << 15 {
            Ok(Self { configs, symbols })
        } else {
            Err(Error::InvalidPrefixHistogram)
        }
    }

    fn with_single_symbol(symbol: u16) -> Self {
        Self { configs: Vec::new(), symbols: vec![symbol] }
    }

    /// Parses a prefix code distribution over `alphabet_size` symbols.
    pub fn parse(bitstream: &mut Bitstream, alphabet_size: u32) -> Result<Self> {
        if alphabet_size == 1 {
            return Ok(Self::with_single_symbol(0));
        }

        let hskip = bitstream.read_bits(2)?;
        if hskip == 1 {
            Self::parse_simple(bitstream, alphabet_size)
        } else {
            Self::parse_complex(bitstream, alphabet_size, hskip)
        }
    }

    fn parse_simple(bitstream: &mut Bitstream, alphabet_size: u32) -> Result<Self> {
        let alphabet_bits = alphabet_size.next_power_of_two().trailing_zeros() as usize;
        let nsym = bitstream.read_bits(2)? + 1;

        let it: Vec<(usize, u8)> = match nsym {
            1 => {
                let sym = bitstream.read_bits(alphabet_bits)?;
                if sym >= alphabet_size {
                    return Err(Error::InvalidPrefixHistogram);
                }
                return Ok(Self::with_single_symbol(sym as u16));
            }
            2 => {
                let syms = [
                    bitstream.read_bits(alphabet_bits)? as usize,
                    bitstream.read_bits(alphabet_bits)? as usize,
                ];
                syms.into_iter().zip([0u8, 0]).collect()
            }
            3 => {
                let syms = [
                    bitstream.read_bits(alphabet_bits)? as usize,
                    bitstream.read_bits(alphabet_bits)? as usize,
                    bitstream.read_bits(alphabet_bits)? as usize,
                ];
                syms.into_iter().zip([0u8, 1, 2]).collect()
            }
            4 => {
                let syms = [
                    bitstream.read_bits(alphabet_bits)? as usize,
                    bitstream.read_bits(alphabet_bits)? as usize,
                    bitstream.read_bits(alphabet_bits)? as usize,
                    bitstream.read_bits(alphabet_bits)? as usize,
                ];
                let tree_selector = bitstream.read_bool()?;
                if tree_selector {
                    syms.into_iter().zip([1u8, 2, 3, 3]).collect()
                } else {
                    syms.into_iter().zip([2u8, 2, 2, 2]).collect()
                }
            }
            _ => unreachable!(),
        };

        let mut code_lengths = vec![0u8; alphabet_size as usize];
        for (sym, len) in it {
            let Some(out) = code_lengths.get_mut(sym) else {
                return Err(Error::InvalidPrefixHistogram);
            };
            *out = len;
        }
        Self::with_code_lengths(code_lengths)
    }

    fn parse_complex(bitstream: &mut Bitstream, alphabet_size: u32, hskip: u32) -> Result<Self> {
        let mut code_length_code_lengths = [0u8; 18];
        let mut bitacc = 0usize;

        let mut nonzero_count = 0;
        let mut nonzero_sym = 0;
        for idx in CODE_LENGTH_ORDER.into_iter().skip(hskip as usize) {
            let base = bitstream.read_u32([Constant(0), Constant(4), Constant(3), Constant(8)])?;
            let len = if base == 8 {
                if bitstream.read_bool()? {
                    if bitstream.read_bool()? { 5 } else { 1 }
                } else {
                    2
                }
            } else {
                base
            };

            code_length_code_lengths[idx] = len as u8;
            if len != 0 {
                nonzero_count += 1;
                nonzero_sym = idx;
                bitacc += 32 >> len;

                match bitacc.cmp(&32) {
                    std::cmp::Ordering::Less => {}
                    std::cmp::Ordering::Equal => break,
                    std::cmp::Ordering::Greater => return Err(Error::InvalidPrefixHistogram),
                }
            }
        }

        let code_length_histogram = if nonzero_count == 1 {
            Histogram::with_single_symbol(nonzero_sym as u16)
        } else if bitacc != 32 {
            return Err(Error::InvalidPrefixHistogram);
        } else {
            Histogram::with_code_lengths(code_length_code_lengths.to_vec())?
        };

        let mut code_lengths = vec![0u8; alphabet_size as usize];
        let mut bitacc = 0usize;

        let mut prev_sym = 8u8;
        let mut last_nonzero_sym = 8u8;
        let mut last_repeat_count = 0usize;

        let mut repeat_count = 0usize;
        let mut repeat_sym = 0u8;
        for len in &mut code_lengths {
            if repeat_count > 0 {
                *len = repeat_sym;
                repeat_count -= 1;
            } else {
                let sym = code_length_histogram.read_symbol(bitstream)? as u8;
                match sym {
                    0 => {}
                    1..=15 => {
                        *len = sym;
                        last_nonzero_sym = sym;
                    }
                    16 => {
                        repeat_count = bitstream.read_bits(2)? as usize + 3;
                        if prev_sym == 16 {
                            repeat_count += last_repeat_count * 3 - 8;
                            last_repeat_count += repeat_count;
                        } else {
                            last_repeat_count = repeat_count;
                        }
                        repeat_sym = last_nonzero_sym;

                        *len = repeat_sym;
                        repeat_count -= 1;
                    }
                    17 => {
                        repeat_count = bitstream.read_bits(3)? as usize + 3;
                        if prev_sym == 17 {
                            repeat_count += last_repeat_count * 7 - 16;
                            last_repeat_count += repeat_count;
                        } else {
                            last_repeat_count = repeat_count;
                        }
                        repeat_sym = 0;

                        *len = repeat_sym;
                        repeat_count -= 1;
                    }
                    _ => return Err(Error::InvalidPrefixHistogram),
                }
                prev_sym = sym;
            }

            if *len != 0 {
                bitacc += 32768 >> *len;
                if bitacc > 32768 {
                    return Err(Error::InvalidPrefixHistogram);
                } else if bitacc == 32768 && repeat_count == 0 {
                    break;
                }
            }
        }

        if bitacc != 32768 || repeat_count > 0 {
            return Err(Error::InvalidPrefixHistogram);
        }
        Self::with_code_lengths(code_lengths)
    }
}

impl Histogram {
    /// Reads one symbol, consuming exactly its code length in bits.
    #[inline]
    pub fn read_symbol(&self, bitstream: &mut Bitstream) -> Result<u16> {
        let Self { configs, symbols } = self;
        if configs.is_empty() {
            return Ok(symbols[0]);
        }

        let peeked = bitstream.peek_bits(15);
        let bits = (peeked.reverse_bits() >> 1) | 0xffff;
        let mut prev = 0u32;
        for (count, &config) in configs.iter().enumerate() {
            if bits < config {
                bitstream.consume_bits(count + 1)?;
                let offset = ((bits - prev) >> (30 - count)) + (config & 0xffff);
                let symbol = symbols[offset as usize];
                return Ok(symbol);
            }
            prev = config;
        }
        bitstream.consume_bits(configs.len())?;
        Ok(symbols[0])
    }

    /// Returns the lone symbol of a degenerate (zero-bit) code, if any.
    pub fn single_symbol(&self) -> Option<u16> {
        let &[symbol] = &*self.symbols else { return None };
        Some(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Packs a sequence of (value, bit_count) fields the same way `Bitstream`
    // consumes them: within a field, bit 0 (LSB) is read first.
    fn pack_fields(fields: &[(u32, usize)]) -> Vec<u8> {
        let mut acc: Vec<u8> = Vec::new();
        let mut cur = 0u8;
        let mut cur_len = 0usize;
        for &(value, len) in fields {
            for i in 0..len {
                let bit = (value >> i) & 1;
                cur |= (bit as u8) << cur_len;
                cur_len += 1;
                if cur_len == 8 {
                    acc.push(cur);
                    cur = 0;
                    cur_len = 0;
                }
            }
        }
        if cur_len > 0 {
            acc.push(cur);
        }
        acc
    }

    #[test]
    fn alphabet_size_one_consumes_nothing() {
        let bytes = [0u8; 4];
        let mut bitstream = Bitstream::new(&bytes);
        let histogram = Histogram::parse(&mut bitstream, 1).unwrap();
        assert_eq!(bitstream.num_read_bits(), 0);
        assert_eq!(histogram.single_symbol(), Some(0));
    }

    #[test]
    fn simple_single_symbol() {
        // hskip selector = 1 (simple), nsym-1 = 0 (one symbol), then 2-bit symbol id = 3.
        let bytes = pack_fields(&[(1, 2), (0, 2), (3, 2)]);
        let mut bitstream = Bitstream::new(&bytes);
        let histogram = Histogram::parse(&mut bitstream, 4).unwrap();
        assert_eq!(histogram.single_symbol(), Some(3));
    }

    #[test]
    fn simple_two_symbol_roundtrip() {
        // hskip = 1, nsym-1 = 1 (two symbols, both length 1), symbols {0, 1}.
        let bytes = pack_fields(&[(1, 2), (1, 2), (0, 2), (1, 2)]);
        let mut bitstream = Bitstream::new(&bytes);
        let histogram = Histogram::parse(&mut bitstream, 4).unwrap();
        assert!(histogram.single_symbol().is_none());

        let code0 = pack_fields(&[(0, 1)]);
        let mut reader0 = Bitstream::new(&code0);
        assert_eq!(histogram.read_symbol(&mut reader0).unwrap(), 0);

        let code1 = pack_fields(&[(1, 1)]);
        let mut reader1 = Bitstream::new(&code1);
        assert_eq!(histogram.read_symbol(&mut reader1).unwrap(), 1);
    }
}
