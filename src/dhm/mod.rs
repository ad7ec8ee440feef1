//! Diffie-Hellman-Merkle session and packet engine.
//!
//! A bespoke key agreement with a freshly sampled 2176-bit prime per
//! session. The initiator ("Alice") sends a framed packet carrying the
//! prime, the generator, and her public exponentiation result; the
//! responder ("Bob") answers with his own result and both sides derive
//! the same 272-byte shared secret. Packets carry a SHA-224 digest over
//! every byte after the digest field.
//!
//! ```text
//!   initiator                                 responder
//!   ---------                                 ---------
//!   Session::open()
//!   generate_alice()  --- AlicePacket ---->   Session::open()
//!                                             generate_bob()      [secret]
//!   derive_alice_secret() <-- BobPacket ---
//!   [secret]
//! ```

mod packet;
mod session;

pub use packet::{AlicePacket, BobPacket};
pub use session::{PrivateKey, Session};

/// Bit width of the public modulus and exponentiation results.
pub const PUB_BITS: usize = 2176;

/// Byte width of the public modulus and exponentiation results.
pub const PUB_SIZE: usize = PUB_BITS / 8;

/// Bit width of the private exponents.
pub const PRIV_BITS: usize = 368;

/// Byte width of the private exponents.
pub const PRIV_SIZE: usize = PRIV_BITS / 8;

/// Size of the session GUID token.
pub const GUID_SIZE: usize = 12;

/// Size of the packet integrity hash (SHA-224).
pub const HASH_SIZE: usize = 28;

/// Packet type stamp of an Alice packet, big-endian on the wire.
pub const ALICE_PACKTYPE: u16 = 0xC1A5;

/// Packet type stamp of a Bob packet, big-endian on the wire.
pub const BOB_PACKTYPE: u16 = 0xC2A5;

/// Total wire size of an Alice packet.
pub const ALICE_PACKET_SIZE: usize = 2 + HASH_SIZE + GUID_SIZE + 2 + PUB_SIZE + PUB_SIZE;

/// Total wire size of a Bob packet.
pub const BOB_PACKET_SIZE: usize = 2 + HASH_SIZE + GUID_SIZE + PUB_SIZE;

/// Offset of the first hashed byte (everything after packtype + hash).
pub(crate) const HASHED_OFFSET: usize = 2 + HASH_SIZE;
