//! Parallel block decryptor.
//!
//! Ciphertext blocks fan out to a pool of workers over a
//! one-signal-per-worker protocol: each worker owns a mutex, a condition
//! variable, and cipher/plain scratch buffers. The orchestrator assigns
//! a batch of at most T blocks, waits on a global tally until the batch
//! completes, then consumes the plaintexts in block order so the output
//! stream stays monotonic in block index regardless of which worker
//! finished first.

use std::io::{Read, Seek, SeekFrom, Write};

use parking_lot::{Condvar, Mutex};

use crate::bigint::{from_fixed_be, write_fixed_be};
use crate::checksum::crc32_reader;
use crate::error::{Error, Result};

use super::{read_upto, CodecConfig, FileInfo, RsaPrivateKey, BLOCK_PADDING, DATA_OFFSET, FILEINFO_SIZE};

/// Summary of a decryption run, taken from the recovered header.
#[derive(Clone, Copy, Debug)]
pub struct DecryptReport {
    /// Plaintext length in bytes.
    pub size: u32,
    /// Embedded CRC-32, confirmed against the written output.
    pub crc: u32,
    /// Epoch seconds at encryption time.
    pub time: i64,
    /// Latitude embedded at encryption time.
    pub latitude: f32,
    /// Longitude embedded at encryption time.
    pub longitude: f32,
}

struct SlotState {
    sigflag: bool,
    runflag: bool,
    curblock: u64,
    cipher: Vec<u8>,
    plain: Vec<u8>,
}

struct WorkerSlot {
    state: Mutex<SlotState>,
    signal: Condvar,
}

impl WorkerSlot {
    fn new(block_size: usize) -> Self {
        Self {
            state: Mutex::new(SlotState {
                sigflag: false,
                runflag: true,
                curblock: 0,
                cipher: vec![0u8; block_size],
                plain: vec![0u8; block_size],
            }),
            signal: Condvar::new(),
        }
    }
}

#[derive(Default)]
struct Tally {
    done: Mutex<usize>,
    signal: Condvar,
}

/// Decrypt block-aligned ciphertext back into the original stream.
///
/// The output must be readable and seekable so the CRC embedded in the
/// first block can be confirmed against the written bytes; on a CRC
/// mismatch the output is left in place and [`Error::CrcMismatch`] is
/// returned.
pub fn decrypt(
    input: &mut (impl Read + Seek),
    output: &mut (impl Read + Write + Seek),
    key: &RsaPrivateKey,
    config: &CodecConfig,
) -> Result<DecryptReport> {
    let block_size = key.block_size();

    let length = input.seek(SeekFrom::End(0))?;
    input.seek(SeekFrom::Start(0))?;
    if length % block_size as u64 != 0 {
        return Err(Error::BlockAlignment(block_size));
    }
    if length == 0 {
        // no first block to recover a header from
        return Err(Error::KeyError);
    }

    let workers = config.worker_count();
    let use_crt = config.use_crt;
    tracing::debug!(blocks = length / block_size as u64, workers, use_crt, "decrypting");

    let slots: Vec<WorkerSlot> = (0..workers).map(|_| WorkerSlot::new(block_size)).collect();
    let tally = Tally::default();

    let info = std::thread::scope(|scope| {
        for slot in &slots {
            let tally = &tally;
            scope.spawn(move || worker_loop(slot, key, use_crt, tally));
        }

        let result = orchestrate(input, output, &slots, &tally, block_size);

        for slot in &slots {
            let mut state = slot.state.lock();
            state.runflag = false;
            slot.signal.notify_one();
        }
        result
    })?;

    // confirm the recovered output against the embedded CRC
    output.seek(SeekFrom::Start(0))?;
    let actual = crc32_reader(output)?;
    if actual != info.crc {
        return Err(Error::CrcMismatch {
            expected: info.crc,
            actual,
        });
    }
    tracing::info!(crc = %format_args!("{actual:08X}"), "CRC OK");

    Ok(DecryptReport {
        size: info.size,
        crc: info.crc,
        time: info.time,
        latitude: info.latitude,
        longitude: info.longitude,
    })
}

fn worker_loop(slot: &WorkerSlot, key: &RsaPrivateKey, use_crt: bool, tally: &Tally) {
    loop {
        let mut state = slot.state.lock();
        while !state.sigflag && state.runflag {
            slot.signal.wait(&mut state);
        }
        if !state.runflag {
            return;
        }

        let c = from_fixed_be(&state.cipher);
        let m = if use_crt {
            key.private_op_crt(&c)
        } else {
            key.private_op(&c)
        };
        // m < n, so it always fits the block
        if write_fixed_be(&m, &mut state.plain).is_err() {
            state.plain.fill(0);
        }
        state.sigflag = false;
        drop(state);

        let mut done = tally.done.lock();
        *done += 1;
        tally.signal.notify_one();
    }
}

fn orchestrate(
    input: &mut (impl Read + Seek),
    output: &mut impl Write,
    slots: &[WorkerSlot],
    tally: &Tally,
    block_size: usize,
) -> Result<FileInfo> {
    let capacity = block_size - BLOCK_PADDING;
    let first_capacity = capacity - FILEINFO_SIZE;
    let payload_start = DATA_OFFSET + FILEINFO_SIZE;

    let mut block_index = 0u64;
    let mut info: Option<FileInfo> = None;
    let mut written = 0u64;

    loop {
        // hand a batch of blocks to the pool
        let mut assigned = 0;
        for slot in slots {
            let mut state = slot.state.lock();
            let got = read_upto(input, &mut state.cipher)?;
            if got == 0 {
                break;
            }
            if got < block_size {
                return Err(Error::BlockAlignment(block_size));
            }
            block_index += 1;
            state.curblock = block_index;
            state.sigflag = true;
            slot.signal.notify_one();
            drop(state);
            assigned += 1;
        }
        if assigned == 0 {
            break;
        }

        // wait for the whole batch, then reset the tally
        {
            let mut done = tally.done.lock();
            while *done < assigned {
                tally.signal.wait(&mut done);
            }
            *done = 0;
        }

        // consume plaintexts in ascending block order
        for slot in &slots[..assigned] {
            let state = slot.state.lock();
            if state.curblock == 1 {
                let header = FileInfo::read_from(&state.plain)?;
                tracing::info!(
                    size = header.size,
                    time = header.time,
                    latitude = header.latitude as f64,
                    longitude = header.longitude as f64,
                    "recovered file header"
                );
                let take = (first_capacity as u64).min(u64::from(header.size)) as usize;
                output.write_all(&state.plain[payload_start..payload_start + take])?;
                written += take as u64;
                info = Some(header);
            } else {
                let header = info.as_ref().ok_or(Error::KeyError)?;
                let remaining = u64::from(header.size).saturating_sub(written);
                let take = (capacity as u64).min(remaining) as usize;
                output.write_all(&state.plain[DATA_OFFSET..DATA_OFFSET + take])?;
                written += take as u64;
            }
        }

        let header = info.as_ref().ok_or(Error::KeyError)?;
        if written >= u64::from(header.size) {
            break;
        }
    }

    info.ok_or(Error::KeyError)
}
