mod bitstream;
mod container;
mod error;

pub use bitstream::{unpack_signed, unpack_signed_u64, Bitstream, U32Specifier, U};
pub use container::{BitstreamKind, ContainerBoxType, ContainerParser, ParseEvent};
pub use error::{Error, Result};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_bare_codestream() {
        assert_eq!(
            ContainerParser::detect(&[0xff, 0x0a, 0, 0]),
            BitstreamKind::BareCodestream
        );
    }

    #[test]
    fn detects_container() {
        let sig = [
            0x00, 0x00, 0x00, 0x0c, 0x4a, 0x58, 0x4c, 0x20, 0x0d, 0x0a, 0x87, 0x0a,
        ];
        assert_eq!(ContainerParser::detect(&sig), BitstreamKind::Container);
    }

    #[test]
    fn assembles_single_jxlc() {
        let mut bytes = vec![
            0x00, 0x00, 0x00, 0x0c, 0x4a, 0x58, 0x4c, 0x20, 0x0d, 0x0a, 0x87, 0x0a,
        ];
        // ftyp box, minimal
        bytes.extend_from_slice(&20u32.to_be_bytes());
        bytes.extend_from_slice(b"ftyp");
        bytes.extend_from_slice(b"jxl ");
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(b"jxl ");
        // jxlc box with payload [0xff, 0x0a, 1, 2, 3]
        let payload = [0xff, 0x0a, 1, 2, 3];
        bytes.extend_from_slice(&((8 + payload.len()) as u32).to_be_bytes());
        bytes.extend_from_slice(b"jxlc");
        bytes.extend_from_slice(&payload);

        let codestream = ContainerParser::assemble_codestream(&bytes).unwrap();
        assert_eq!(codestream, payload);
    }

    #[test]
    fn assembles_split_jxlp_parts_in_order() {
        let mut bytes = vec![
            0x00, 0x00, 0x00, 0x0c, 0x4a, 0x58, 0x4c, 0x20, 0x0d, 0x0a, 0x87, 0x0a,
        ];
        let part0 = [0xffu8, 0x0a];
        let mut jxlp0_payload = 0u32.to_be_bytes().to_vec();
        jxlp0_payload.extend_from_slice(&part0);
        bytes.extend_from_slice(&((8 + jxlp0_payload.len()) as u32).to_be_bytes());
        bytes.extend_from_slice(b"jxlp");
        bytes.extend_from_slice(&jxlp0_payload);

        let part1 = [1u8, 2, 3];
        let mut jxlp1_payload = (1u32 | 0x8000_0000).to_be_bytes().to_vec();
        jxlp1_payload.extend_from_slice(&part1);
        bytes.extend_from_slice(&((8 + jxlp1_payload.len()) as u32).to_be_bytes());
        bytes.extend_from_slice(b"jxlp");
        bytes.extend_from_slice(&jxlp1_payload);

        let codestream = ContainerParser::assemble_codestream(&bytes).unwrap();
        assert_eq!(codestream, [0xff, 0x0a, 1, 2, 3]);
    }
}
