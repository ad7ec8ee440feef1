//! File signatures: raw RSA over a SHA-512 digest.
//!
//! A signature is a single ciphertext block. The plaintext layout is a
//! zero byte, seven random padding bytes, the 64-byte digest at offset
//! 8, then the timestamp and geolocation at offsets 72, 80, and 84
//! (little-endian on the wire). Signing encrypts with the private
//! exponent; verification decrypts with the public exponent and compares
//! digests.

use std::io::{Read, Write};

use crate::bigint::{from_fixed_be, to_fixed_be, write_fixed_be};
use crate::digest::{sha512_reader, SHA512_SIZE};
use crate::entropy::EntropySource;
use crate::error::{Error, Result};

use super::{epoch_seconds, read_upto, CodecConfig, RsaPrivateKey, RsaPublicKey, DATA_OFFSET};

/// Offset of the digest within the signature block.
const DIGEST_OFFSET: usize = DATA_OFFSET;

/// Offset of the little-endian timestamp.
const TIME_OFFSET: usize = 72;

/// Offset of the little-endian latitude.
const LATITUDE_OFFSET: usize = 80;

/// Offset of the little-endian longitude.
const LONGITUDE_OFFSET: usize = 84;

/// Metadata embedded in (and recovered from) a signature block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SignatureInfo {
    /// Epoch seconds at signing time.
    pub time: i64,
    /// Latitude at signing time, decimal degrees.
    pub latitude: f32,
    /// Longitude at signing time, decimal degrees.
    pub longitude: f32,
}

/// Sign a stream: SHA-512 the input and encrypt the digest block under
/// the private exponent.
pub fn sign(
    input: &mut impl Read,
    signature: &mut impl Write,
    key: &RsaPrivateKey,
    config: &CodecConfig,
    entropy: &EntropySource,
) -> Result<SignatureInfo> {
    let block_size = key.block_size();
    let digest = sha512_reader(input)?;

    let mut block = vec![0u8; block_size];
    entropy.fill(&mut block)?;
    block[0] = 0;
    block[DIGEST_OFFSET..DIGEST_OFFSET + SHA512_SIZE].copy_from_slice(&digest);

    let info = SignatureInfo {
        time: epoch_seconds(),
        latitude: config.latitude,
        longitude: config.longitude,
    };
    block[TIME_OFFSET..TIME_OFFSET + 8].copy_from_slice(&info.time.to_le_bytes());
    block[LATITUDE_OFFSET..LATITUDE_OFFSET + 4].copy_from_slice(&info.latitude.to_le_bytes());
    block[LONGITUDE_OFFSET..LONGITUDE_OFFSET + 4].copy_from_slice(&info.longitude.to_le_bytes());

    let s = key.private_op(&from_fixed_be(&block));
    let mut cipher = vec![0u8; block_size];
    write_fixed_be(&s, &mut cipher)?;
    signature.write_all(&cipher)?;

    tracing::info!(time = info.time, "signature written");
    Ok(info)
}

/// Verify a stream against a signature block.
///
/// Returns the embedded signing metadata when the digests match, and
/// [`Error::VerifyFailed`] when they do not.
pub fn verify(
    input: &mut impl Read,
    signature: &mut impl Read,
    key: &RsaPublicKey,
) -> Result<SignatureInfo> {
    let block_size = key.block_size();
    let digest = sha512_reader(input)?;

    let mut cipher = vec![0u8; block_size];
    if read_upto(signature, &mut cipher)? != block_size {
        // signature doesn't even span one block for this key
        return Err(Error::KeyError);
    }

    let m = key.public_op(&from_fixed_be(&cipher));
    let plain = to_fixed_be(&m, block_size)?;

    if plain[DIGEST_OFFSET..DIGEST_OFFSET + SHA512_SIZE] != digest {
        return Err(Error::VerifyFailed);
    }

    let mut time_bytes = [0u8; 8];
    time_bytes.copy_from_slice(&plain[TIME_OFFSET..TIME_OFFSET + 8]);
    let mut lat_bytes = [0u8; 4];
    lat_bytes.copy_from_slice(&plain[LATITUDE_OFFSET..LATITUDE_OFFSET + 4]);
    let mut long_bytes = [0u8; 4];
    long_bytes.copy_from_slice(&plain[LONGITUDE_OFFSET..LONGITUDE_OFFSET + 4]);

    let info = SignatureInfo {
        time: i64::from_le_bytes(time_bytes),
        latitude: f32::from_le_bytes(lat_bytes),
        longitude: f32::from_le_bytes(long_bytes),
    };
    tracing::info!(
        time = info.time,
        latitude = info.latitude as f64,
        longitude = info.longitude as f64,
        "verify OK"
    );
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn setup() -> (&'static RsaPrivateKey, CodecConfig, EntropySource) {
        let key = crate::rsa::test_key();
        let config = CodecConfig {
            threads: 2,
            latitude: 37.7750,
            longitude: -122.4183,
            ..CodecConfig::default()
        };
        (key, config, EntropySource::open().unwrap())
    }

    #[test]
    fn test_sign_verify_round_trip() {
        let (key, config, entropy) = setup();
        let data = b"document to be signed".to_vec();

        let mut sig = Vec::new();
        let signed =
            sign(&mut Cursor::new(data.clone()), &mut sig, key, &config, &entropy).unwrap();
        assert_eq!(sig.len(), key.block_size());

        let verified = verify(
            &mut Cursor::new(data),
            &mut Cursor::new(sig),
            &key.public_key(),
        )
        .unwrap();

        assert_eq!(verified, signed);
        assert!((verified.latitude - 37.7750).abs() < 1e-4);
        assert!((verified.longitude + 122.4183).abs() < 1e-4);
        assert!(verified.time > 0);
    }

    #[test]
    fn test_modified_input_fails() {
        let (key, config, entropy) = setup();
        let data = vec![0x33u8; 5000];

        let mut sig = Vec::new();
        sign(&mut Cursor::new(data.clone()), &mut sig, key, &config, &entropy).unwrap();

        for tamper_at in [0, 2500, 4999] {
            let mut modified = data.clone();
            modified[tamper_at] ^= 0x01;
            let err = verify(
                &mut Cursor::new(modified),
                &mut Cursor::new(sig.clone()),
                &key.public_key(),
            )
            .unwrap_err();
            assert!(matches!(err, Error::VerifyFailed));
        }
    }

    #[test]
    fn test_tampered_signature_fails() {
        let (key, config, entropy) = setup();
        let data = b"payload".to_vec();

        let mut sig = Vec::new();
        sign(&mut Cursor::new(data.clone()), &mut sig, key, &config, &entropy).unwrap();
        sig[10] ^= 0x80;

        let err = verify(
            &mut Cursor::new(data),
            &mut Cursor::new(sig),
            &key.public_key(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::VerifyFailed));
    }

    #[test]
    fn test_short_signature_file() {
        let (key, _config, _entropy) = setup();
        let err = verify(
            &mut Cursor::new(b"data".to_vec()),
            &mut Cursor::new(vec![0u8; 10]),
            &key.public_key(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::KeyError));
    }

    #[test]
    fn test_signing_empty_input_still_verifies() {
        let (key, config, entropy) = setup();

        let mut sig = Vec::new();
        sign(&mut Cursor::new(Vec::new()), &mut sig, key, &config, &entropy).unwrap();
        verify(
            &mut Cursor::new(Vec::new()),
            &mut Cursor::new(sig),
            &key.public_key(),
        )
        .unwrap();
    }
}
