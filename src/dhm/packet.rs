//! Handshake packet framing and serialization.
//!
//! Both packets use the same packed layout: a big-endian packtype stamp,
//! a SHA-224 digest, then the hashed payload starting with the session
//! GUID. Big integers are serialized big-endian into fixed 272-byte
//! fields, right-justified with leading zeros.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::digest::sha224;
use crate::error::{Error, Result};

use super::{
    ALICE_PACKET_SIZE, ALICE_PACKTYPE, BOB_PACKET_SIZE, BOB_PACKTYPE, GUID_SIZE, HASHED_OFFSET,
    HASH_SIZE, PUB_SIZE,
};

/// The packet sent by the initiator to start a key agreement.
///
/// Wire format (588 bytes, no padding):
/// ```text
/// [  0..  2]  packtype = 0xC1A5 (BE)
/// [  2.. 30]  SHA-224 over bytes 30..588
/// [ 30.. 42]  session GUID
/// [ 42.. 44]  generator g = 3 or 5 (BE)
/// [ 44..316]  prime modulus p, right-justified
/// [316..588]  A = g^a mod p, right-justified
/// ```
#[derive(Clone, Debug)]
pub struct AlicePacket {
    /// Integrity hash over every byte after the hash field.
    pub hash: [u8; HASH_SIZE],
    /// Session GUID, stamped from the initiator's session.
    pub guid: [u8; GUID_SIZE],
    /// Generator primitive, randomly chosen to be 3 or 5.
    pub generator: u16,
    /// Public prime modulus.
    pub p: [u8; PUB_SIZE],
    /// Initiator's exponentiation result.
    pub public: [u8; PUB_SIZE],
}

impl AlicePacket {
    /// Serialize to the 588-byte wire form.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(ALICE_PACKET_SIZE);
        buf.put_u16(ALICE_PACKTYPE);
        buf.put_slice(&self.hash);
        buf.put_slice(&self.hashed_bytes());
        buf.freeze()
    }

    /// Deserialize from wire bytes.
    ///
    /// The buffer must be exactly one packet long, and the packtype field
    /// (decoded big-endian) must carry the Alice stamp.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != ALICE_PACKET_SIZE {
            return Err(Error::TruncatedPacket {
                expected: ALICE_PACKET_SIZE,
                actual: data.len(),
            });
        }
        let mut data = data;
        let packtype = data.get_u16();
        if packtype != ALICE_PACKTYPE {
            return Err(Error::WrongPacketType(packtype));
        }

        let mut packet = AlicePacket {
            hash: [0; HASH_SIZE],
            guid: [0; GUID_SIZE],
            generator: 0,
            p: [0; PUB_SIZE],
            public: [0; PUB_SIZE],
        };
        data.copy_to_slice(&mut packet.hash);
        data.copy_to_slice(&mut packet.guid);
        packet.generator = data.get_u16();
        data.copy_to_slice(&mut packet.p);
        data.copy_to_slice(&mut packet.public);
        Ok(packet)
    }

    /// Recompute the integrity digest and stamp it into the packet.
    pub fn seal(&mut self) {
        self.hash = sha224(&self.hashed_bytes());
    }

    /// Verify the integrity digest against the packet contents.
    pub fn verify_hash(&self) -> Result<()> {
        if sha224(&self.hashed_bytes()) != self.hash {
            return Err(Error::HashFailure);
        }
        Ok(())
    }

    /// The byte range covered by the hash: guid through end of packet.
    fn hashed_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(ALICE_PACKET_SIZE - HASHED_OFFSET);
        buf.put_slice(&self.guid);
        buf.put_u16(self.generator);
        buf.put_slice(&self.p);
        buf.put_slice(&self.public);
        buf
    }
}

/// The packet sent by the responder to complete a key agreement.
///
/// Wire format (314 bytes):
/// ```text
/// [  0..  2]  packtype = 0xC2A5 (BE)
/// [  2.. 30]  SHA-224 over bytes 30..314
/// [ 30.. 42]  session GUID, copied from the Alice packet
/// [ 42..314]  B = g^b mod p, right-justified
/// ```
#[derive(Clone, Debug)]
pub struct BobPacket {
    /// Integrity hash over every byte after the hash field.
    pub hash: [u8; HASH_SIZE],
    /// Session GUID, echoed from the initiator.
    pub guid: [u8; GUID_SIZE],
    /// Responder's exponentiation result.
    pub public: [u8; PUB_SIZE],
}

impl BobPacket {
    /// Serialize to the 314-byte wire form.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(BOB_PACKET_SIZE);
        buf.put_u16(BOB_PACKTYPE);
        buf.put_slice(&self.hash);
        buf.put_slice(&self.hashed_bytes());
        buf.freeze()
    }

    /// Deserialize from wire bytes.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != BOB_PACKET_SIZE {
            return Err(Error::TruncatedPacket {
                expected: BOB_PACKET_SIZE,
                actual: data.len(),
            });
        }
        let mut data = data;
        let packtype = data.get_u16();
        if packtype != BOB_PACKTYPE {
            return Err(Error::WrongPacketType(packtype));
        }

        let mut packet = BobPacket {
            hash: [0; HASH_SIZE],
            guid: [0; GUID_SIZE],
            public: [0; PUB_SIZE],
        };
        data.copy_to_slice(&mut packet.hash);
        data.copy_to_slice(&mut packet.guid);
        data.copy_to_slice(&mut packet.public);
        Ok(packet)
    }

    /// Recompute the integrity digest and stamp it into the packet.
    pub fn seal(&mut self) {
        self.hash = sha224(&self.hashed_bytes());
    }

    /// Verify the integrity digest against the packet contents.
    pub fn verify_hash(&self) -> Result<()> {
        if sha224(&self.hashed_bytes()) != self.hash {
            return Err(Error::HashFailure);
        }
        Ok(())
    }

    fn hashed_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(BOB_PACKET_SIZE - HASHED_OFFSET);
        buf.put_slice(&self.guid);
        buf.put_slice(&self.public);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_alice() -> AlicePacket {
        let mut packet = AlicePacket {
            hash: [0; HASH_SIZE],
            guid: [0xAB; GUID_SIZE],
            generator: 5,
            p: [0x11; PUB_SIZE],
            public: [0x22; PUB_SIZE],
        };
        packet.seal();
        packet
    }

    #[test]
    fn test_alice_encode_decode() {
        let original = sample_alice();
        let wire = original.encode();
        assert_eq!(wire.len(), ALICE_PACKET_SIZE);
        assert_eq!(&wire[..2], &[0xC1, 0xA5]);

        let decoded = AlicePacket::decode(&wire).unwrap();
        assert_eq!(decoded.guid, original.guid);
        assert_eq!(decoded.generator, 5);
        assert_eq!(decoded.p, original.p);
        assert_eq!(decoded.public, original.public);
        decoded.verify_hash().unwrap();
    }

    #[test]
    fn test_hash_covers_bytes_after_header() {
        let packet = sample_alice();
        let wire = packet.encode();
        assert_eq!(sha224(&wire[HASHED_OFFSET..]), packet.hash);
    }

    #[test]
    fn test_alice_decode_rejects_wrong_packtype() {
        let mut wire = sample_alice().encode().to_vec();
        wire[0] = 0xC2;
        let err = AlicePacket::decode(&wire).unwrap_err();
        assert!(matches!(err, Error::WrongPacketType(0xC2A5)));
    }

    #[test]
    fn test_alice_decode_rejects_short_buffer() {
        let wire = sample_alice().encode();
        let err = AlicePacket::decode(&wire[..100]).unwrap_err();
        assert!(matches!(
            err,
            Error::TruncatedPacket {
                expected: ALICE_PACKET_SIZE,
                actual: 100
            }
        ));
    }

    #[test]
    fn test_tampered_payload_fails_hash() {
        let mut wire = sample_alice().encode().to_vec();
        // flip a byte inside the hashed region
        wire[HASHED_OFFSET + 40] ^= 0x01;
        let decoded = AlicePacket::decode(&wire).unwrap();
        assert!(matches!(decoded.verify_hash(), Err(Error::HashFailure)));
    }

    #[test]
    fn test_bob_encode_decode() {
        let mut original = BobPacket {
            hash: [0; HASH_SIZE],
            guid: [0x07; GUID_SIZE],
            public: [0x33; PUB_SIZE],
        };
        original.seal();

        let wire = original.encode();
        assert_eq!(wire.len(), BOB_PACKET_SIZE);
        assert_eq!(&wire[..2], &[0xC2, 0xA5]);

        let decoded = BobPacket::decode(&wire).unwrap();
        assert_eq!(decoded.guid, original.guid);
        assert_eq!(decoded.public, original.public);
        decoded.verify_hash().unwrap();
    }

    #[test]
    fn test_bob_tamper_detection() {
        let mut packet = BobPacket {
            hash: [0; HASH_SIZE],
            guid: [0x07; GUID_SIZE],
            public: [0x33; PUB_SIZE],
        };
        packet.seal();
        packet.guid[3] ^= 0x80;
        assert!(matches!(packet.verify_hash(), Err(Error::HashFailure)));
    }
}
