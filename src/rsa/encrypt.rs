//! Block encryptor.
//!
//! Each plaintext block starts life as fresh random bytes; the top byte
//! is zeroed so the block, read as a big-endian integer, stays below the
//! modulus. The first block carries the file-info header; payload fills
//! the space after the padding region, and trailing slack stays random.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::bigint::{from_fixed_be, write_fixed_be};
use crate::checksum::crc32_reader;
use crate::entropy::EntropySource;
use crate::error::{Error, Result};

use super::{
    epoch_seconds, read_upto, CodecConfig, FileInfo, RsaPublicKey, BLOCK_PADDING, DATA_OFFSET,
    FILEINFO_SIZE,
};

/// Summary of an encryption run.
#[derive(Clone, Copy, Debug)]
pub struct EncryptReport {
    /// Plaintext bytes consumed.
    pub bytes: u64,
    /// Ciphertext blocks written.
    pub blocks: u64,
    /// CRC-32 of the plaintext, as embedded in the first block.
    pub crc: u32,
}

/// Encrypt a stream into block-aligned ciphertext.
///
/// A zero-length input writes nothing and reports zero blocks.
pub fn encrypt(
    input: &mut (impl Read + Seek),
    output: &mut impl Write,
    key: &RsaPublicKey,
    config: &CodecConfig,
    entropy: &EntropySource,
) -> Result<EncryptReport> {
    let block_size = key.block_size();
    let capacity = block_size - BLOCK_PADDING;
    let first_capacity = capacity - FILEINFO_SIZE;

    let length = input.seek(SeekFrom::End(0))?;
    input.seek(SeekFrom::Start(0))?;
    if length == 0 {
        tracing::warn!("zero-length input, nothing to encrypt");
        return Ok(EncryptReport {
            bytes: 0,
            blocks: 0,
            crc: 0,
        });
    }
    let size = u32::try_from(length).map_err(|_| Error::InputTooLarge(length))?;

    let crc = crc32_reader(input)?;
    input.seek(SeekFrom::Start(0))?;
    tracing::debug!(size, crc = %format_args!("{crc:08X}"), "encrypting");

    let mut block = vec![0u8; block_size];
    let mut cipher = vec![0u8; block_size];
    let mut blocks = 0u64;

    // first block: random fill, zero top byte, header, then payload
    entropy.fill(&mut block)?;
    block[0] = 0;
    let flags = entropy.fill_array::<1>()?[0] & !super::FLAG_SIGNED;
    let info = FileInfo {
        flags,
        size,
        crc,
        time: epoch_seconds(),
        latitude: config.latitude,
        longitude: config.longitude,
    };
    info.write_to(&mut block);

    let payload_start = DATA_OFFSET + FILEINFO_SIZE;
    let used = read_upto(input, &mut block[payload_start..payload_start + first_capacity])?;
    let mut last = used < first_capacity;

    seal_block(&block, &mut cipher, key)?;
    output.write_all(&cipher)?;
    blocks += 1;

    while !last {
        entropy.fill(&mut block)?;
        block[0] = 0;
        let used = read_upto(input, &mut block[DATA_OFFSET..DATA_OFFSET + capacity])?;
        if used == 0 {
            break;
        }
        last = used < capacity;

        seal_block(&block, &mut cipher, key)?;
        output.write_all(&cipher)?;
        blocks += 1;
    }

    tracing::debug!(blocks, "encryption complete");
    Ok(EncryptReport {
        bytes: length,
        blocks,
        crc,
    })
}

fn seal_block(plain: &[u8], cipher: &mut [u8], key: &RsaPublicKey) -> Result<()> {
    let m = from_fixed_be(plain);
    let c = key.public_op(&m);
    write_fixed_be(&c, cipher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn setup() -> (&'static crate::rsa::RsaPrivateKey, CodecConfig, EntropySource) {
        let key = crate::rsa::test_key();
        let config = CodecConfig {
            threads: 2,
            ..CodecConfig::default()
        };
        (key, config, EntropySource::open().unwrap())
    }

    #[test]
    fn test_zero_length_input_writes_nothing() {
        let (key, config, entropy) = setup();
        let mut output = Vec::new();
        let report = encrypt(
            &mut Cursor::new(Vec::new()),
            &mut output,
            &key.public_key(),
            &config,
            &entropy,
        )
        .unwrap();
        assert_eq!(report.blocks, 0);
        assert!(output.is_empty());
    }

    #[test]
    fn test_output_is_block_aligned() {
        let (key, config, entropy) = setup();
        let block_size = key.block_size();
        let data = vec![0x5Au8; 500];

        let mut output = Vec::new();
        let report = encrypt(
            &mut Cursor::new(data),
            &mut output,
            &key.public_key(),
            &config,
            &entropy,
        )
        .unwrap();

        assert_eq!(output.len() % block_size, 0);
        assert_eq!(output.len(), report.blocks as usize * block_size);
        // 96-byte blocks: 51 bytes in the first, 84 in each after
        assert_eq!(report.blocks, 1 + (500u64 - 51).div_ceil(84));
    }

    #[test]
    fn test_first_block_masks_top_byte() {
        // however the random fill starts, the first plaintext byte of
        // every block must come back as 0x00
        let (key, config, entropy) = setup();
        let data = vec![0xFFu8; 200];

        let mut output = Vec::new();
        encrypt(
            &mut Cursor::new(data),
            &mut output,
            &key.public_key(),
            &config,
            &entropy,
        )
        .unwrap();

        let block_size = key.block_size();
        for chunk in output.chunks(block_size) {
            let c = from_fixed_be(chunk);
            let plain = crate::bigint::to_fixed_be(&key.private_op(&c), block_size).unwrap();
            assert_eq!(plain[0], 0x00);
        }
    }

    #[test]
    fn test_first_block_header_contents() {
        let (key, config, entropy) = setup();
        let config = CodecConfig {
            latitude: 37.7750,
            longitude: -122.4183,
            ..config
        };
        let data = b"header check payload".to_vec();
        let crc = crate::checksum::crc32(&data);

        let mut output = Vec::new();
        encrypt(
            &mut Cursor::new(data.clone()),
            &mut output,
            &key.public_key(),
            &config,
            &entropy,
        )
        .unwrap();

        let block_size = key.block_size();
        let c = from_fixed_be(&output[..block_size]);
        let plain = crate::bigint::to_fixed_be(&key.private_op(&c), block_size).unwrap();

        let info = FileInfo::read_from(&plain).unwrap();
        assert_eq!(info.size, data.len() as u32);
        assert_eq!(info.crc, crc);
        assert!(!info.is_signed());
        assert!((info.latitude - 37.7750).abs() < 1e-4);
        assert!((info.longitude + 122.4183).abs() < 1e-4);
        assert!(info.time > 0);

        // payload follows the header
        let payload_start = DATA_OFFSET + FILEINFO_SIZE;
        assert_eq!(&plain[payload_start..payload_start + data.len()], &data[..]);
    }

    #[test]
    fn test_oversized_input_rejected() {
        let (key, config, entropy) = setup();

        struct HugeInput;
        impl Read for HugeInput {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Ok(0)
            }
        }
        impl Seek for HugeInput {
            fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
                match pos {
                    SeekFrom::End(_) => Ok(u64::from(u32::MAX) + 1),
                    _ => Ok(0),
                }
            }
        }

        let err = encrypt(
            &mut HugeInput,
            &mut Vec::new(),
            &key.public_key(),
            &config,
            &entropy,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InputTooLarge(_)));
    }
}
