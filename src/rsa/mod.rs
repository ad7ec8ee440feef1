//! RSA key generation, block codec, and signatures.
//!
//! Keys are produced by a pool of worker threads racing to find a
//! structurally valid key; the block codec encrypts files into
//! block-aligned ciphertext with a file-info header in the first block,
//! and decrypts with a fan-out worker pool using CRT acceleration.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  keygen: T workers race, first valid key rings the bell │
//! ├─────────────────────────────────────────────────────────┤
//! │  keyfile: TLV records (tags 1-8), optional PEM armor    │
//! ├─────────────────────────────────────────────────────────┤
//! │  codec: block encrypt / parallel CRT decrypt            │
//! ├─────────────────────────────────────────────────────────┤
//! │  signature: raw RSA over a SHA-512 digest               │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod decrypt;
mod encrypt;
mod fileinfo;
mod key;
mod keyfile;
mod keygen;
mod signature;

pub use decrypt::{decrypt, DecryptReport};
pub use encrypt::{encrypt, EncryptReport};
pub use fileinfo::{FileInfo, FILEINFO_SIZE, FLAG_SIGNED};
pub use key::{RsaPrivateKey, RsaPublicKey};
pub use keyfile::{
    from_pem, to_pem, write_private, write_private_pem, write_public, write_public_pem,
    KeyItemTag, KeyMaterial, PEM_PRIVATE_LABEL, PEM_PUBLIC_LABEL,
};
pub use keygen::{generate, KeygenConfig};
pub use signature::{sign, verify, SignatureInfo};

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Largest supported modulus width in bits.
pub const MAX_BITS: u32 = 262_144;

/// Smallest supported modulus width in bits.
pub const MIN_BITS: u32 = 768;

/// Modulus widths must be a multiple of this.
pub const BITS_STEP: u32 = 256;

/// Hard cap on worker threads for key generation and decryption.
pub const MAX_THREADS: usize = 48;

/// Random padding bytes consumed per block (zero byte + 7 random bytes
/// ahead of the payload, plus slack at the tail).
pub const BLOCK_PADDING: usize = 12;

/// Offset of the payload (or file-info header) within a plaintext block.
pub const DATA_OFFSET: usize = 8;

/// Configuration for the block codec operations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Worker threads for the decrypt fan-out.
    pub threads: usize,
    /// Use Chinese-Remainder acceleration for private-key operations.
    pub use_crt: bool,
    /// Latitude embedded in headers and signatures, decimal degrees.
    pub latitude: f32,
    /// Longitude embedded in headers and signatures, decimal degrees.
    pub longitude: f32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            threads: detect_threads(),
            use_crt: true,
            latitude: 0.0,
            longitude: 0.0,
        }
    }
}

impl CodecConfig {
    /// Thread count clamped to the supported range.
    pub(crate) fn worker_count(&self) -> usize {
        self.threads.clamp(1, MAX_THREADS)
    }
}

/// Detected logical-CPU count, clamped to the thread cap.
pub(crate) fn detect_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(8)
        .min(MAX_THREADS)
}

/// Current wall-clock time as epoch seconds.
pub(crate) fn epoch_seconds() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Read until the buffer is full or the reader is exhausted; returns the
/// number of bytes placed.
pub(crate) fn read_upto(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
pub(crate) fn test_key() -> &'static RsaPrivateKey {
    use std::sync::OnceLock;
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let entropy = crate::entropy::EntropySource::open().unwrap();
        let config = KeygenConfig {
            bits: MIN_BITS,
            threads: 2,
        };
        generate(&config, &entropy).unwrap()
    })
}
