//! First-block file-info header.
//!
//! The first plaintext block of an encrypted file carries a 33-byte
//! header at the payload offset: flags, the input length and CRC (each
//! big-endian with an XOR twin for self-consistency checking), then a
//! timestamp and geolocation stored little-endian on the wire on every
//! host.

use crate::error::{Error, Result};

use super::DATA_OFFSET;

/// Serialized size of the header in bytes.
pub const FILEINFO_SIZE: usize = 33;

/// Flags high bit: set for signed content, clear for encrypted content.
pub const FLAG_SIGNED: u8 = 0x80;

/// Metadata embedded in the first block of an encrypted file.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FileInfo {
    /// Random byte; only the high bit is meaningful.
    pub flags: u8,
    /// Plaintext length in bytes.
    pub size: u32,
    /// CRC-32 of the plaintext.
    pub crc: u32,
    /// Epoch seconds at encryption time.
    pub time: i64,
    /// Latitude, decimal degrees.
    pub latitude: f32,
    /// Longitude, decimal degrees.
    pub longitude: f32,
}

impl FileInfo {
    /// Whether the content is a signature rather than encrypted data.
    pub fn is_signed(&self) -> bool {
        self.flags & FLAG_SIGNED != 0
    }

    /// Serialize into a plaintext block at the payload offset.
    ///
    /// The block must be at least `DATA_OFFSET + FILEINFO_SIZE` bytes.
    pub fn write_to(&self, block: &mut [u8]) {
        let field = &mut block[DATA_OFFSET..DATA_OFFSET + FILEINFO_SIZE];
        field[0] = self.flags;
        field[1..5].copy_from_slice(&self.size.to_be_bytes());
        field[5..9].copy_from_slice(&(self.size ^ u32::MAX).to_be_bytes());
        field[9..13].copy_from_slice(&self.crc.to_be_bytes());
        field[13..17].copy_from_slice(&(self.crc ^ u32::MAX).to_be_bytes());
        field[17..25].copy_from_slice(&self.time.to_le_bytes());
        field[25..29].copy_from_slice(&self.latitude.to_le_bytes());
        field[29..33].copy_from_slice(&self.longitude.to_le_bytes());
    }

    /// Deserialize from a decrypted first block, checking the XOR twins.
    ///
    /// A failed self-consistency check means the block was decrypted with
    /// the wrong key (or the key was damaged) and yields
    /// [`Error::KeyError`].
    pub fn read_from(block: &[u8]) -> Result<Self> {
        if block.len() < DATA_OFFSET + FILEINFO_SIZE {
            return Err(Error::KeyError);
        }
        let field = &block[DATA_OFFSET..DATA_OFFSET + FILEINFO_SIZE];

        let flags = field[0];
        let size = u32::from_be_bytes([field[1], field[2], field[3], field[4]]);
        let size_xor = u32::from_be_bytes([field[5], field[6], field[7], field[8]]);
        let crc = u32::from_be_bytes([field[9], field[10], field[11], field[12]]);
        let crc_xor = u32::from_be_bytes([field[13], field[14], field[15], field[16]]);

        if size != size_xor ^ u32::MAX {
            return Err(Error::KeyError);
        }
        if crc != crc_xor ^ u32::MAX {
            return Err(Error::KeyError);
        }

        let mut time_bytes = [0u8; 8];
        time_bytes.copy_from_slice(&field[17..25]);
        let mut lat_bytes = [0u8; 4];
        lat_bytes.copy_from_slice(&field[25..29]);
        let mut long_bytes = [0u8; 4];
        long_bytes.copy_from_slice(&field[29..33]);

        Ok(FileInfo {
            flags,
            size,
            crc,
            time: i64::from_le_bytes(time_bytes),
            latitude: f32::from_le_bytes(lat_bytes),
            longitude: f32::from_le_bytes(long_bytes),
        })
    }
}
