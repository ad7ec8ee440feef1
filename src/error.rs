//! Error types for the keybridge toolkit.

use thiserror::Error;

/// Result type alias for keybridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during key agreement, key generation, or the
/// block codec operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Cannot open the randomness device
    #[error("unable to open randomness source")]
    OpenRandom(#[source] std::io::Error),

    /// Short read (or read error) from the randomness device
    #[error("unable to read randomness source")]
    ReadRandom,

    /// Close of the randomness device failed
    #[error("unable to close randomness source")]
    CloseRandom(#[source] std::io::Error),

    /// An exported integer did not fit its fixed-width field
    #[error("value too wide for {width}-byte field")]
    Value {
        /// Width of the destination field in bytes
        width: usize,
    },

    /// A packet buffer had the wrong length for its type
    #[error("truncated packet: expected {expected} bytes, got {actual}")]
    TruncatedPacket {
        /// Required packet length
        expected: usize,
        /// Observed buffer length
        actual: usize,
    },

    /// Received an unexpected packet type
    #[error("unrecognized packet type 0x{0:04X}")]
    WrongPacketType(u16),

    /// Packet hash check failure
    #[error("packet hash check failure")]
    HashFailure,

    /// First-block header failed its self-consistency check, or a
    /// signature block was malformed
    #[error("wrong key file or damaged key")]
    KeyError,

    /// Recovered plaintext CRC differs from the embedded CRC
    #[error("CRC failure: expected {expected:08X}, got {actual:08X}")]
    CrcMismatch {
        /// CRC embedded in the first block at encryption time
        expected: u32,
        /// CRC computed over the decrypted output
        actual: u32,
    },

    /// Decrypted signature digest does not match the computed digest
    #[error("signature verification failed")]
    VerifyFailed,

    /// Ciphertext length is not a multiple of the block size
    #[error("input length must be a multiple of the {0}-byte block size")]
    BlockAlignment(usize),

    /// Modulus bit width outside the supported range
    #[error("invalid bit width {0}: must be 768..=262144 and a multiple of 256")]
    InvalidBits(u32),

    /// Malformed or incomplete key file
    #[error("malformed key file: {0}")]
    KeyFile(String),

    /// Input file exceeds the 32-bit embedded size field
    #[error("input too large to encrypt: {0} bytes")]
    InputTooLarge(u64),

    /// Underlying I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new key-file error
    pub fn key_file(msg: impl Into<String>) -> Self {
        Error::KeyFile(msg.into())
    }

    /// Check if this error indicates tampered or mismatched data rather
    /// than an environmental failure.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            Error::HashFailure | Error::KeyError | Error::CrcMismatch { .. } | Error::VerifyFailed
        )
    }

    /// Check if this error came from the randomness device.
    pub fn is_entropy_failure(&self) -> bool {
        matches!(
            self,
            Error::OpenRandom(_) | Error::ReadRandom | Error::CloseRandom(_)
        )
    }
}
