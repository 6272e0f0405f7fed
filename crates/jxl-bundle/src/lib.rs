//! Shared `Bundle` trait for bitstream-backed header types.
//!
//! Header-shaped records (image metadata, frame headers, transform records)
//! are parsed by hand-written `parse` functions that read their fields in
//! declaration order, mirroring the conditional-field layout the format
//! itself describes. This crate supplies the common trait those `impl`s
//! hang off of, plus a couple of field types (`Name`) that recur across
//! several header kinds.

use jxl_bitstream::Bitstream;

/// A type that can be read from a bitstream given some context `Ctx`
/// (usually `()`, or a reference to an already-parsed enclosing bundle).
pub trait Bundle<Ctx = ()>: Sized {
    type Error;

    fn parse(bitstream: &mut Bitstream<'_>, ctx: Ctx) -> Result<Self, Self::Error>;
}

impl<T, Ctx> Bundle<Ctx> for Option<T>
where
    T: Bundle<Ctx>,
{
    type Error = T::Error;

    fn parse(bitstream: &mut Bitstream<'_>, ctx: Ctx) -> Result<Self, Self::Error> {
        T::parse(bitstream, ctx).map(Some)
    }
}

/// A length-prefixed UTF-8 name field, as used by frame headers and a few
/// other bundles: `u32(0, u(4), 16+u(5), 48+u(10))` bytes follow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Name(pub String);

impl std::ops::Deref for Name {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<Ctx> Bundle<Ctx> for Name {
    type Error = jxl_bitstream::Error;

    fn parse(bitstream: &mut Bitstream<'_>, _ctx: Ctx) -> Result<Self, Self::Error> {
        use jxl_bitstream::U32Specifier::{BitsOffset, Constant};
        let len = bitstream.read_u32([
            Constant(0),
            BitsOffset(0, 4),
            BitsOffset(16, 5),
            BitsOffset(48, 10),
        ])? as usize;
        let mut data = vec![0u8; len];
        for b in &mut data {
            *b = bitstream.read_bits(8)? as u8;
        }
        let name = String::from_utf8(data)
            .map_err(|_| jxl_bitstream::Error::ValidationFailed("non-UTF-8 name"))?;
        Ok(Self(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_empty() {
        // selector 00 -> length 0, no bytes follow.
        let mut bs = Bitstream::new(&[0]);
        let name = Name::parse(&mut bs, ()).unwrap();
        assert_eq!(name.0, "");
    }
}
