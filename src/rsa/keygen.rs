//! Multi-threaded RSA key generation.
//!
//! A pool of workers races to produce a structurally valid key. The
//! first finisher rings a shared bell; the others observe it at their
//! loop head and stand down. The orchestrator joins every worker before
//! handing the key to the caller, so a failed run leaves nothing behind.

use std::sync::atomic::{AtomicBool, Ordering};

use num_bigint_dig::BigUint;
use num_integer::Integer;
use num_traits::One;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::bigint::{
    from_fixed_be, is_probable_prime, next_probable_prime, small_odd_factor, write_fixed_be,
    mod_inverse, carmichael,
};
use crate::entropy::EntropySource;
use crate::error::{Error, Result};

use super::{detect_threads, RsaPrivateKey, BITS_STEP, MAX_BITS, MAX_THREADS, MIN_BITS};

/// Configuration for key generation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeygenConfig {
    /// Modulus width in bits: 768..=262144, a multiple of 256.
    pub bits: u32,
    /// Number of racing workers.
    pub threads: usize,
}

impl Default for KeygenConfig {
    fn default() -> Self {
        Self {
            bits: 4096,
            threads: detect_threads(),
        }
    }
}

impl KeygenConfig {
    /// Police the modulus width.
    pub fn validate(&self) -> Result<()> {
        if self.bits < MIN_BITS || self.bits > MAX_BITS || self.bits % BITS_STEP != 0 {
            return Err(Error::InvalidBits(self.bits));
        }
        Ok(())
    }

    fn worker_count(&self) -> usize {
        self.threads.clamp(1, MAX_THREADS)
    }
}

/// Generate an RSA private key.
///
/// Blocks until one worker wins the race and every other worker has been
/// joined. Candidate rejections are silent retries; only entropy
/// failures abort the run.
pub fn generate(config: &KeygenConfig, entropy: &EntropySource) -> Result<RsaPrivateKey> {
    config.validate()?;
    let workers = config.worker_count();
    tracing::info!(bits = config.bits, workers, "searching for key");

    let bell = AtomicBool::new(false);
    let slot: Mutex<Option<Result<RsaPrivateKey>>> = Mutex::new(None);

    std::thread::scope(|scope| {
        for id in 0..workers {
            let bell = &bell;
            let slot = &slot;
            let bits = config.bits;
            scope.spawn(move || worker(id, bits, entropy, bell, slot));
        }
    });

    match slot.into_inner() {
        Some(result) => {
            if result.is_ok() {
                tracing::info!(bits = config.bits, "key found");
            }
            result
        }
        None => unreachable!("a worker always deposits a result before ringing the bell"),
    }
}

fn worker(
    id: usize,
    bits: u32,
    entropy: &EntropySource,
    bell: &AtomicBool,
    slot: &Mutex<Option<Result<RsaPrivateKey>>>,
) {
    let mut attempt = 0u64;
    while !bell.load(Ordering::Acquire) {
        attempt += 1;
        tracing::debug!(worker = id, attempt, "attempting key generation");

        let outcome = match attempt_key(bits, entropy) {
            Ok(Some(key)) => Some(Ok(key)),
            Ok(None) => None, // rejected candidate, retry
            Err(e) => Some(Err(e)),
        };

        if let Some(result) = outcome {
            if bell
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                *slot.lock() = Some(result);
            }
            return;
        }
    }
}

/// One attempt of the candidate pipeline. `Ok(None)` is a structural
/// rejection; the worker simply tries again.
fn attempt_key(bits: u32, entropy: &EntropySource) -> Result<Option<RsaPrivateKey>> {
    let half_bytes = (bits / 16) as usize;

    // candidate p: top two bits set, odd
    let mut p_buf = vec![0u8; half_bytes];
    entropy.fill(&mut p_buf)?;
    p_buf[0] |= 0xC0;
    p_buf[half_bytes - 1] |= 0x01;

    let mut p = from_fixed_be(&p_buf);
    if !is_probable_prime(&p) {
        p = next_probable_prime(&p);
    }
    write_fixed_be(&p, &mut p_buf)?;

    // candidate q: same shape, then force a distinct top nibble
    let mut q_buf = vec![0u8; half_bytes];
    entropy.fill(&mut q_buf)?;
    q_buf[0] |= 0xC0;
    q_buf[half_bytes - 1] |= 0x01;
    if (q_buf[0] & 0xF0) == (p_buf[0] & 0xF0) {
        q_buf[0] ^= 0x30;
    }

    let mut q = from_fixed_be(&q_buf);
    if !is_probable_prime(&q) {
        q = next_probable_prime(&q);
    }

    let p1 = &p - 1u32;
    let q1 = &q - 1u32;

    // p-1 and q-1 must not have small prime factors
    if let Some(factor) = small_odd_factor(&p1) {
        tracing::trace!(factor, "rejected: p - 1 has a small prime factor");
        return Ok(None);
    }
    if let Some(factor) = small_odd_factor(&q1) {
        tracing::trace!(factor, "rejected: q - 1 has a small prime factor");
        return Ok(None);
    }

    let n = &p * &q;
    let lambda = carmichael(&p1, &q1);

    // e: smallest probable prime above 65536 that is coprime with lambda
    let mut e = next_probable_prime(&BigUint::from(65536u32));
    while !e.gcd(&lambda).is_one() {
        e = next_probable_prime(&e);
    }

    let d = match mod_inverse(&e, &lambda) {
        Some(d) => d,
        None => {
            tracing::trace!("rejected: no modular inverse for e");
            return Ok(None);
        }
    };

    // d must fill all but the top nibble of the modulus width
    if d.bits() < (bits - 4) as usize {
        tracing::trace!(bits = d.bits(), "rejected: private exponent too narrow");
        return Ok(None);
    }

    let dp = &d % &p1;
    let dq = &d % &q1;
    let qinv = match mod_inverse(&q, &p) {
        Some(v) => v,
        None => {
            tracing::trace!("rejected: no CRT coefficient");
            return Ok(None);
        }
    };

    Ok(Some(RsaPrivateKey {
        bits,
        n,
        e,
        d,
        p,
        q,
        dp,
        dq,
        qinv,
    }))
}
