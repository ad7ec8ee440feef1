//! Shared cryptographic randomness source.
//!
//! Wraps the operating system's randomness device behind a mutex so a
//! single handle can feed several worker threads. All sampling in the
//! toolkit goes through this type: DHM prime search, private exponents,
//! RSA candidate primes, and block padding.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use parking_lot::Mutex;

use crate::error::{Error, Result};

/// Conventional path of the randomness device.
pub const RANDOM_DEVICE: &str = "/dev/urandom";

/// Size of one warm-up read.
const WARMUP_CHUNK: usize = 256;

/// Number of warm-up reads performed by [`EntropySource::warm`].
const WARMUP_ROUNDS: usize = 32;

/// A process-wide source of cryptographically random bytes.
///
/// Reads are serialized through a mutex; concurrent callers each see a
/// distinct, non-overlapping byte stream.
#[derive(Debug)]
pub struct EntropySource {
    device: Mutex<File>,
}

impl EntropySource {
    /// Open the default randomness device.
    pub fn open() -> Result<Self> {
        Self::open_path(RANDOM_DEVICE)
    }

    /// Open an alternative randomness device or file.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let device = File::open(path).map_err(Error::OpenRandom)?;
        Ok(Self {
            device: Mutex::new(device),
        })
    }

    /// Read and discard 32 x 256 bytes to get the entropy moving.
    pub fn warm(&self) -> Result<()> {
        let mut scratch = [0u8; WARMUP_CHUNK];
        for _ in 0..WARMUP_ROUNDS {
            self.fill(&mut scratch)?;
        }
        Ok(())
    }

    /// Fill a caller buffer with random bytes.
    ///
    /// A short read from the device is an error: callers size their
    /// buffers exactly and never retry partial fills.
    pub fn fill(&self, buf: &mut [u8]) -> Result<()> {
        let mut device = self.device.lock();
        device.read_exact(buf).map_err(|_| Error::ReadRandom)
    }

    /// Generate a fixed-size array of random bytes.
    pub fn fill_array<const N: usize>(&self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    /// Sample a random 32-bit word.
    pub fn word(&self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.fill_array::<4>()?))
    }

    /// Release the underlying device handle.
    pub fn close(self) -> Result<()> {
        drop(self.device.into_inner());
        Ok(())
    }
}
