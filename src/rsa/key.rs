//! RSA key material and the raw modular-exponentiation operations.

use num_bigint_dig::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::One;

use crate::bigint::carmichael;
use crate::error::{Error, Result};

/// The public half of an RSA key pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RsaPublicKey {
    /// Modulus width in bits.
    pub bits: u32,
    /// Modulus n = p * q.
    pub n: BigUint,
    /// Public exponent, the smallest probable prime above 65536 coprime
    /// with the Carmichael totient.
    pub e: BigUint,
}

impl RsaPublicKey {
    /// Ciphertext block size in bytes.
    pub fn block_size(&self) -> usize {
        (self.bits / 8) as usize
    }

    /// Raw public operation: x^e mod n.
    pub fn public_op(&self, x: &BigUint) -> BigUint {
        x.modpow(&self.e, &self.n)
    }
}

/// A full RSA private key with CRT auxiliary values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RsaPrivateKey {
    /// Modulus width in bits.
    pub bits: u32,
    /// Modulus n = p * q.
    pub n: BigUint,
    /// Public exponent.
    pub e: BigUint,
    /// Private exponent d = e^-1 mod lcm(p-1, q-1).
    pub d: BigUint,
    /// First prime factor.
    pub p: BigUint,
    /// Second prime factor.
    pub q: BigUint,
    /// d mod (p - 1).
    pub dp: BigUint,
    /// d mod (q - 1).
    pub dq: BigUint,
    /// q^-1 mod p.
    pub qinv: BigUint,
}

impl RsaPrivateKey {
    /// Ciphertext block size in bytes.
    pub fn block_size(&self) -> usize {
        (self.bits / 8) as usize
    }

    /// Project out the public half.
    pub fn public_key(&self) -> RsaPublicKey {
        RsaPublicKey {
            bits: self.bits,
            n: self.n.clone(),
            e: self.e.clone(),
        }
    }

    /// Raw private operation: x^d mod n.
    pub fn private_op(&self, x: &BigUint) -> BigUint {
        x.modpow(&self.d, &self.n)
    }

    /// CRT-accelerated private operation.
    ///
    /// m1 = c^dp mod p; m2 = c^dq mod q;
    /// h = qinv * (m1 - m2) mod p; m = m2 + h * q.
    pub fn private_op_crt(&self, c: &BigUint) -> BigUint {
        let m1 = c.modpow(&self.dp, &self.p);
        let m2 = c.modpow(&self.dq, &self.q);

        let diff = BigInt::from(m1) - BigInt::from(m2.clone());
        let p = BigInt::from(self.p.clone());
        let h = (BigInt::from(self.qinv.clone()) * diff).mod_floor(&p);

        match h.to_biguint() {
            Some(h) => m2 + h * &self.q,
            // mod_floor against a positive modulus is never negative
            None => m2,
        }
    }

    /// Check the structural invariants of the key.
    ///
    /// Verifies n = p * q, the congruence e * d = 1 (mod lcm(p-1, q-1)),
    /// the CRT values, and the minimum private-exponent width.
    pub fn validate(&self) -> Result<()> {
        let p1 = &self.p - 1u32;
        let q1 = &self.q - 1u32;
        let lambda = carmichael(&p1, &q1);

        if self.n != &self.p * &self.q {
            return Err(Error::key_file("modulus does not match prime factors"));
        }
        if (&self.e * &self.d) % &lambda != BigUint::one() {
            return Err(Error::key_file("exponents are not inverses mod lambda"));
        }
        if self.dp != &self.d % &p1 || self.dq != &self.d % &q1 {
            return Err(Error::key_file("CRT exponents inconsistent"));
        }
        if (&self.qinv * &self.q) % &self.p != BigUint::one() {
            return Err(Error::key_file("CRT coefficient inconsistent"));
        }
        if self.d.bits() < (self.bits - 4) as usize {
            return Err(Error::key_file("private exponent too narrow"));
        }
        Ok(())
    }
}
