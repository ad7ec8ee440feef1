//! SHA-2 digest helpers.
//!
//! DHM packets carry a SHA-224 integrity hash; signatures are computed
//! over a SHA-512 digest of the input file.

use std::io::Read;

use sha2::{Digest, Sha224, Sha512};

use crate::error::Result;

/// Size of a SHA-224 digest in bytes.
pub const SHA224_SIZE: usize = 28;

/// Size of a SHA-512 digest in bytes.
pub const SHA512_SIZE: usize = 64;

/// SHA-224 of a byte slice.
pub fn sha224(data: &[u8]) -> [u8; SHA224_SIZE] {
    let mut out = [0u8; SHA224_SIZE];
    out.copy_from_slice(&Sha224::digest(data));
    out
}

/// SHA-512 of everything remaining in a reader.
pub fn sha512_reader(reader: &mut impl Read) -> Result<[u8; SHA512_SIZE]> {
    let mut hasher = Sha512::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let mut out = [0u8; SHA512_SIZE];
    out.copy_from_slice(&hasher.finalize());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_sha224_known_answer() {
        // FIPS 180-2 test vector for "abc"
        let digest = sha224(b"abc");
        let expected = [
            0x23, 0x09, 0x7D, 0x22, 0x34, 0x05, 0xD8, 0x22, 0x86, 0x42, 0xA4, 0x77, 0xBD, 0xA2,
            0x55, 0xB3, 0x2A, 0xAD, 0xBC, 0xE4, 0xBD, 0xA0, 0xB3, 0xF7, 0xE3, 0x6C, 0x9D, 0xA7,
        ];
        assert_eq!(digest, expected);
    }

    #[test]
    fn test_sha512_reader_matches_one_shot() {
        let data: Vec<u8> = (0..9_999u32).map(|i| (i * 31 % 256) as u8).collect();
        let streamed = sha512_reader(&mut Cursor::new(&data)).unwrap();
        let mut direct = [0u8; SHA512_SIZE];
        direct.copy_from_slice(&Sha512::digest(&data));
        assert_eq!(streamed, direct);
    }

    #[test]
    fn test_sha512_empty() {
        let digest = sha512_reader(&mut Cursor::new(Vec::new())).unwrap();
        // SHA-512 of the empty string starts with cf83e135
        assert_eq!(&digest[..4], &[0xCF, 0x83, 0xE1, 0x35]);
    }
}
