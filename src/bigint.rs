//! Big-integer facade and fixed-width byte codec.
//!
//! Every serialized integer in this toolkit is a fixed-width big-endian
//! field. Arbitrary-precision exports strip leading zeros, so each
//! conversion is wrapped with an explicit right-justification step that
//! pads the vacated space on the left.

use num_bigint_dig::{prime, BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Zero};

use crate::error::{Error, Result};

/// Rounds used for every probabilistic primality test in the toolkit.
pub const MILLER_RABIN_ROUNDS: usize = 50;

/// The odd primes up to 100. Candidate RSA primes p are rejected when
/// p - 1 shares a factor with any of these.
pub const SMALL_ODD_PRIMES: [u32; 24] = [
    3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
];

/// Import a big-endian byte buffer as an unsigned integer.
pub fn from_fixed_be(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

/// Export an integer into a fixed-width big-endian field.
///
/// The magnitude bytes land at the tail of `out`; the space on the left
/// is zero-filled. An integer wider than the field is a [`Error::Value`]
/// error.
pub fn write_fixed_be(value: &BigUint, out: &mut [u8]) -> Result<()> {
    let raw = value.to_bytes_be();
    if raw.len() > out.len() {
        return Err(Error::Value { width: out.len() });
    }
    let pad = out.len() - raw.len();
    out[..pad].fill(0);
    out[pad..].copy_from_slice(&raw);
    Ok(())
}

/// Export an integer as a freshly allocated fixed-width buffer.
pub fn to_fixed_be(value: &BigUint, width: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; width];
    write_fixed_be(value, &mut out)?;
    Ok(out)
}

/// 50-round probabilistic primality test.
pub fn is_probable_prime(n: &BigUint) -> bool {
    prime::probably_prime(n, MILLER_RABIN_ROUNDS)
}

/// Smallest probable prime strictly greater than `n`.
pub fn next_probable_prime(n: &BigUint) -> BigUint {
    let two = BigUint::from(2u32);
    if *n < two {
        return two;
    }
    let mut candidate = n + BigUint::one();
    if candidate.is_even() {
        candidate += BigUint::one();
    }
    while !is_probable_prime(&candidate) {
        candidate += &two;
    }
    candidate
}

/// Modular inverse via the extended Euclidean algorithm.
///
/// Returns `x` with `a * x = 1 (mod m)`, or `None` when `gcd(a, m) != 1`.
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    if m.is_zero() {
        return None;
    }
    let modulus = BigInt::from(m.clone());
    let mut old_r = BigInt::from(a.clone());
    let mut r = modulus.clone();
    let mut old_s = BigInt::one();
    let mut s = BigInt::zero();

    while !r.is_zero() {
        let q = &old_r / &r;
        let next_r = &old_r - &q * &r;
        old_r = std::mem::replace(&mut r, next_r);
        let next_s = &old_s - &q * &s;
        old_s = std::mem::replace(&mut s, next_s);
    }

    if !old_r.is_one() {
        return None;
    }
    old_s.mod_floor(&modulus).to_biguint()
}

/// Carmichael totient for an RSA modulus: lcm(p - 1, q - 1).
pub fn carmichael(p_minus_1: &BigUint, q_minus_1: &BigUint) -> BigUint {
    p_minus_1.lcm(q_minus_1)
}

/// First small odd prime dividing `n`, if any.
pub fn small_odd_factor(n: &BigUint) -> Option<u32> {
    SMALL_ODD_PRIMES.iter().copied().find(|&p| {
        let p_big = BigUint::from(p);
        n.gcd(&p_big) == p_big
    })
}
