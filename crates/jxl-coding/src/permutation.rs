use jxl_bitstream::Bitstream;

use crate::{add_log2_ceil, Decoder, Error, Result};

/// Reads a Lehmer-coded permutation of `0..size`, with the first `skip`
/// elements left untouched (used for the optional TOC permutation).
pub fn read_permutation(
    bitstream: &mut Bitstream,
    decoder: &mut Decoder,
    size: u32,
    skip: u32,
) -> Result<Vec<usize>> {
    let end = decoder.read_varint(bitstream, get_context(size))?;
    if end > size - skip {
        tracing::error!(size, skip, end, "invalid permutation length");
        return Err(Error::InvalidPermutation);
    }

    let mut lehmer = vec![0u32; end as usize];
    let mut prev_val = 0u32;
    for (idx, val) in lehmer.iter_mut().enumerate() {
        let idx = idx as u32;
        *val = decoder.read_varint(bitstream, get_context(prev_val))?;
        if *val >= size - skip - idx {
            tracing::error!(idx = idx + skip, size, lehmer = *val, "invalid permutation entry");
            return Err(Error::InvalidPermutation);
        }
        prev_val = *val;
    }

    let mut temp = ((skip as usize)..(size as usize)).collect::<Vec<_>>();
    let mut permutation = Vec::with_capacity(size as usize);
    for idx in 0..skip {
        permutation.push(idx as usize);
    }
    for idx in lehmer {
        permutation.push(temp.remove(idx as usize));
    }
    permutation.extend(temp);

    Ok(permutation)
}

fn get_context(x: u32) -> u32 {
    add_log2_ceil(x).min(7)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_log2_of_previous_value_capped_at_seven() {
        assert_eq!(get_context(0), 0);
        assert_eq!(get_context(1), 1);
        assert_eq!(get_context(4), 3);
        assert_eq!(get_context(u32::MAX), 7);
    }
}
