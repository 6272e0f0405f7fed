//! Table of contents: per-section byte sizes and what each section holds,
//! read right after the frame header. Sections are independently
//! byte-aligned, so once a section's size is known the main bitstream can
//! skip straight past it without parsing a byte of its contents -- the
//! mechanism this crate leans on to ignore VarDCT-only sections entirely.

use jxl_bitstream::{
    Bitstream,
    U32Specifier::{BitsOffset, Constant},
};
use jxl_bundle::Bundle;

use crate::header::FrameHeader;
use crate::Result;

#[derive(Debug, Clone)]
pub struct Toc {
    /// Sections in the order they physically appear in the bitstream.
    pub groups: Vec<TocGroup>,
}

#[derive(Debug, Clone, Copy)]
pub struct TocGroup {
    pub kind: TocGroupKind,
    pub size: u32,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum TocGroupKind {
    All,
    LfGlobal,
    LfGroup(u32),
    HfGlobal,
    GroupPass { pass_idx: u32, group_idx: u32 },
}

impl Toc {
    pub fn is_single_entry(&self) -> bool {
        self.groups.len() <= 1
    }

    pub fn total_byte_size(&self) -> u64 {
        self.groups.iter().map(|g| g.size as u64).sum()
    }
}

impl Bundle<&FrameHeader> for Toc {
    type Error = crate::Error;

    fn parse(bitstream: &mut Bitstream<'_>, header: &FrameHeader) -> Result<Self> {
        let num_groups = header.num_groups();
        let num_lf_groups = header.num_lf_groups();
        let num_passes = header.passes.num_passes;

        let entry_count = if num_groups == 1 && num_passes == 1 {
            1
        } else {
            1 + num_lf_groups + 1 + num_groups * num_passes
        };

        if entry_count > 65536 {
            return Err(jxl_bitstream::Error::ValidationFailed("too many TOC entries").into());
        }

        let permutated_toc = bitstream.read_bool()?;
        let permutation = if permutated_toc {
            let mut decoder = jxl_coding::Decoder::parse(bitstream, 8)?;
            decoder.begin(bitstream)?;
            let permutation = jxl_coding::read_permutation(bitstream, &mut decoder, entry_count, 0)?;
            decoder.finalize()?;
            permutation
        } else {
            Vec::new()
        };

        bitstream.zero_pad_to_byte()?;
        let sizes = (0..entry_count)
            .map(|_| {
                bitstream.read_u32([
                    BitsOffset(0, 10),
                    BitsOffset(1024, 14),
                    BitsOffset(17408, 22),
                    BitsOffset(4211712, 30),
                ])
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        bitstream.zero_pad_to_byte()?;

        let section_kinds = if entry_count == 1 {
            vec![TocGroupKind::All]
        } else {
            let mut out = Vec::with_capacity(entry_count as usize);
            out.push(TocGroupKind::LfGlobal);
            for idx in 0..num_lf_groups {
                out.push(TocGroupKind::LfGroup(idx));
            }
            out.push(TocGroupKind::HfGlobal);
            for pass_idx in 0..num_passes {
                for group_idx in 0..num_groups {
                    out.push(TocGroupKind::GroupPass { pass_idx, group_idx });
                }
            }
            out
        };

        let groups = sizes
            .into_iter()
            .enumerate()
            .map(|(physical_idx, size)| {
                let kind = if permutated_toc {
                    section_kinds[permutation[physical_idx]]
                } else {
                    section_kinds[physical_idx]
                };
                TocGroup { kind, size }
            })
            .collect();

        Ok(Self { groups })
    }
}

/// Carves `group`'s independent byte range out of `bitstream`'s remaining
/// bytes and advances `bitstream` past it. `bitstream` must be byte-aligned,
/// which it always is right after [`Toc::parse`] or a preceding group.
pub fn take_group<'buf>(bitstream: &mut Bitstream<'buf>, group: &TocGroup) -> Result<&'buf [u8]> {
    let size = group.size as usize;
    let all = bitstream.current_bytes()?;
    if all.len() < size {
        return Err(jxl_bitstream::Error::ValidationFailed("TOC entry runs past end of input").into());
    }
    let slice = &all[..size];
    bitstream.skip_bits(size * 8)?;
    Ok(slice)
}
