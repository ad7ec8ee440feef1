//! # keybridge
//!
//! A bespoke key-agreement and RSA file toolkit: Diffie-Hellman-Merkle
//! sessions establish a shared secret over an untrusted channel, and the
//! RSA side generates key pairs and performs block-oriented encryption,
//! decryption, signing, and verification of files.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  DHM engine (sessions, Alice/Bob packets, secrets)      │
//! ├─────────────────────────────────────────────────────────┤
//! │  RSA engine (keygen race, block codec, signatures)      │
//! ├─────────────────────────────────────────────────────────┤
//! │  Codec helpers (fixed-width ints, CRC-32, SHA-2)        │
//! ├─────────────────────────────────────────────────────────┤
//! │  Entropy (shared randomness device, mutex-serialized)   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Notes
//!
//! 1. **Fixed-width fields**: every serialized big integer is big-endian
//!    and right-justified into a fixed buffer with leading zeros.
//! 2. **Bespoke formats**: the packet framing, block padding, and
//!    integrity checks are this toolkit's own contract, not an
//!    interoperable implementation of any standardized protocol.
//! 3. **Thread model**: shared-memory workers with mutexes and condition
//!    variables; no async runtime.
//!
//! ## Example
//!
//! ```no_run
//! use keybridge::dhm::Session;
//!
//! # fn main() -> keybridge::Result<()> {
//! let mut initiator = Session::open()?;
//! let mut responder = Session::open()?;
//!
//! let (alice, alice_key) = initiator.generate_alice()?;
//! let (bob, _bob_key) = responder.generate_bob(&alice)?;
//! initiator.derive_alice_secret(&alice, &bob, &alice_key)?;
//!
//! assert_eq!(initiator.secret(), responder.secret());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod bigint;
pub mod checksum;
pub mod dhm;
pub mod digest;
pub mod entropy;
pub mod error;
pub mod rsa;

pub use entropy::EntropySource;
pub use error::{Error, Result};
