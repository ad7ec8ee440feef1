//! Session lifecycle and the three handshake operations.

use num_bigint_dig::BigUint;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::bigint::{from_fixed_be, is_probable_prime, next_probable_prime, write_fixed_be};
use crate::entropy::EntropySource;
use crate::error::Result;

use super::{AlicePacket, BobPacket, GUID_SIZE, HASH_SIZE, PRIV_SIZE, PUB_SIZE};

/// A private exponent. Never transmitted; zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; PRIV_SIZE]);

impl PrivateKey {
    /// Raw exponent bytes, big-endian.
    pub fn as_bytes(&self) -> &[u8; PRIV_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey").field("0", &"<redacted>").finish()
    }
}

/// The derived shared secret, held inside the session. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct SharedSecret([u8; PUB_SIZE]);

/// A key-agreement session.
///
/// Owns the randomness source and a 12-byte GUID stamped into every
/// packet. The secret slot is written on the responder side during
/// [`Session::generate_bob`] and on the initiator side during
/// [`Session::derive_alice_secret`]. The session allocates nothing on
/// behalf of the caller; packets and private keys are returned by value.
pub struct Session {
    entropy: EntropySource,
    guid: [u8; GUID_SIZE],
    secret: Option<SharedSecret>,
}

impl Session {
    /// Open a session: acquire the randomness source, warm it, and draw
    /// a fresh GUID.
    pub fn open() -> Result<Self> {
        let entropy = EntropySource::open()?;
        entropy.warm()?;
        let guid = entropy.fill_array()?;
        Ok(Self {
            entropy,
            guid,
            secret: None,
        })
    }

    /// The session GUID.
    pub fn guid(&self) -> &[u8; GUID_SIZE] {
        &self.guid
    }

    /// The derived shared secret, once a handshake has completed.
    pub fn secret(&self) -> Option<&[u8; PUB_SIZE]> {
        self.secret.as_ref().map(|s| &s.0)
    }

    /// Close the session, releasing the randomness source.
    pub fn close(self) -> Result<()> {
        self.entropy.close()
    }

    /// Initiator step: build an Alice packet and its private exponent.
    pub fn generate_alice(&mut self) -> Result<(AlicePacket, PrivateKey)> {
        // sample a 2176-bit candidate; force it into [2^2175, 2^2176) and odd
        let mut p_field = [0u8; PUB_SIZE];
        self.entropy.fill(&mut p_field)?;
        p_field[0] |= 0x80;
        p_field[PUB_SIZE - 1] |= 0x01;

        let mut p = from_fixed_be(&p_field);
        if !is_probable_prime(&p) {
            tracing::debug!("candidate composite, advancing to next probable prime");
            p = next_probable_prime(&p);
        }
        write_fixed_be(&p, &mut p_field)?;

        let generator = choose_generator(self.entropy.word()?);

        let key = PrivateKey(self.entropy.fill_array()?);
        let a = from_fixed_be(key.as_bytes());

        let result = BigUint::from(generator).modpow(&a, &p);
        let mut public = [0u8; PUB_SIZE];
        write_fixed_be(&result, &mut public)?;

        let mut packet = AlicePacket {
            hash: [0; HASH_SIZE],
            guid: self.guid,
            generator,
            p: p_field,
            public,
        };
        packet.seal();
        tracing::debug!(g = generator, "generated Alice packet");
        Ok((packet, key))
    }

    /// Responder step: validate the Alice packet, build a Bob packet,
    /// and derive the shared secret into this session.
    ///
    /// The responder adopts the initiator's GUID as its own session GUID.
    pub fn generate_bob(&mut self, alice: &AlicePacket) -> Result<(BobPacket, PrivateKey)> {
        alice.verify_hash()?;

        self.guid = alice.guid;

        let key = PrivateKey(self.entropy.fill_array()?);
        let b = from_fixed_be(key.as_bytes());

        let p = from_fixed_be(&alice.p);
        let g = BigUint::from(alice.generator);
        let their_public = from_fixed_be(&alice.public);

        let result = g.modpow(&b, &p);
        let mut public = [0u8; PUB_SIZE];
        write_fixed_be(&result, &mut public)?;

        let shared = their_public.modpow(&b, &p);
        let mut secret = SharedSecret([0; PUB_SIZE]);
        write_fixed_be(&shared, &mut secret.0)?;
        self.secret = Some(secret);

        let mut packet = BobPacket {
            hash: [0; HASH_SIZE],
            guid: self.guid,
            public,
        };
        packet.seal();
        tracing::debug!("generated Bob packet, secret derived");
        Ok((packet, key))
    }

    /// Initiator step: validate the Bob packet and derive the shared
    /// secret into this session.
    pub fn derive_alice_secret(
        &mut self,
        alice: &AlicePacket,
        bob: &BobPacket,
        key: &PrivateKey,
    ) -> Result<()> {
        bob.verify_hash()?;

        let p = from_fixed_be(&alice.p);
        let their_public = from_fixed_be(&bob.public);
        let a = from_fixed_be(key.as_bytes());

        let shared = their_public.modpow(&a, &p);
        let mut secret = SharedSecret([0; PUB_SIZE]);
        write_fixed_be(&shared, &mut secret.0)?;
        self.secret = Some(secret);
        tracing::debug!("secret derived on initiator side");
        Ok(())
    }
}

/// Generator selection: the low bit of a freshly sampled word picks
/// between 3 and 5.
fn choose_generator(word: u32) -> u16 {
    if word & 0x01 == 0 {
        3
    } else {
        5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dhm::{ALICE_PACKTYPE, BOB_PACKTYPE};
    use std::sync::OnceLock;

    struct Handshake {
        alice_wire: Vec<u8>,
        bob_wire: Vec<u8>,
        guid: [u8; GUID_SIZE],
        secret_a: [u8; PUB_SIZE],
        secret_b: [u8; PUB_SIZE],
    }

    // Prime search at 2176 bits is expensive, so the full exchange runs
    // once and every test inspects the captured artifacts.
    fn handshake() -> &'static Handshake {
        static FIXTURE: OnceLock<Handshake> = OnceLock::new();
        FIXTURE.get_or_init(|| {
            let mut initiator = Session::open().unwrap();
            let mut responder = Session::open().unwrap();

            let (alice, alice_key) = initiator.generate_alice().unwrap();
            let guid = *initiator.guid();

            let relayed = AlicePacket::decode(&alice.encode()).unwrap();
            let (bob, _bob_key) = responder.generate_bob(&relayed).unwrap();
            let secret_b = *responder.secret().unwrap();

            let bob_back = BobPacket::decode(&bob.encode()).unwrap();
            initiator
                .derive_alice_secret(&alice, &bob_back, &alice_key)
                .unwrap();
            let secret_a = *initiator.secret().unwrap();

            assert_eq!(*responder.guid(), guid);

            let fixture = Handshake {
                alice_wire: alice.encode().to_vec(),
                bob_wire: bob.encode().to_vec(),
                guid,
                secret_a,
                secret_b,
            };
            initiator.close().unwrap();
            responder.close().unwrap();
            fixture
        })
    }

    #[test]
    fn test_both_sides_agree() {
        let hs = handshake();
        assert_eq!(hs.secret_a, hs.secret_b);
        assert!(!hs.secret_a.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_alice_packet_invariants() {
        let hs = handshake();
        let alice = AlicePacket::decode(&hs.alice_wire).unwrap();

        assert_eq!(u16::from_be_bytes([hs.alice_wire[0], hs.alice_wire[1]]), ALICE_PACKTYPE);
        assert!(alice.generator == 3 || alice.generator == 5);
        assert_eq!(alice.guid, hs.guid);
        // top bit set, odd
        assert_ne!(alice.p[0] & 0x80, 0);
        assert_ne!(alice.p[PUB_SIZE - 1] & 0x01, 0);
        alice.verify_hash().unwrap();
    }

    #[test]
    fn test_bob_packet_invariants() {
        let hs = handshake();
        let bob = BobPacket::decode(&hs.bob_wire).unwrap();

        assert_eq!(u16::from_be_bytes([hs.bob_wire[0], hs.bob_wire[1]]), BOB_PACKTYPE);
        assert_eq!(bob.guid, hs.guid);
        bob.verify_hash().unwrap();
    }

    #[test]
    fn test_tampered_alice_rejected_by_responder() {
        let hs = handshake();
        let mut session = Session::open().unwrap();

        for offset in [30, 43, 100, 400, 587] {
            let mut wire = hs.alice_wire.clone();
            wire[offset] ^= 0x01;
            let packet = AlicePacket::decode(&wire).unwrap();
            let err = session.generate_bob(&packet).unwrap_err();
            assert!(matches!(err, crate::Error::HashFailure), "offset {offset}");
        }
    }

    #[test]
    fn test_flipped_packtype_rejected() {
        let hs = handshake();

        let mut wire = hs.alice_wire.clone();
        wire[1] = 0xFF;
        assert!(matches!(
            AlicePacket::decode(&wire),
            Err(crate::Error::WrongPacketType(0xC1FF))
        ));

        let mut wire = hs.bob_wire.clone();
        wire[0] = 0x00;
        assert!(matches!(
            BobPacket::decode(&wire),
            Err(crate::Error::WrongPacketType(0x00A5))
        ));
    }

    #[test]
    fn test_generator_selection_parity() {
        assert_eq!(choose_generator(0x00000002), 3);
        assert_eq!(choose_generator(0x00000003), 5);
        assert_eq!(choose_generator(0), 3);
        assert_eq!(choose_generator(u32::MAX), 5);
    }

    #[test]
    fn test_sessions_have_distinct_guids() {
        let a = Session::open().unwrap();
        let b = Session::open().unwrap();
        assert_ne!(a.guid(), b.guid());
        assert!(a.secret().is_none());
    }
}
