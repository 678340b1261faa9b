//! Job building: coinbase assembly, Merkle folding, header serialization.
//!
//! A `mining.notify` notification carries the raw material for work: the
//! split coinbase, the Merkle branch, and the header fields as wire hex.
//! This module splices the extranonce into the coinbase, folds the branch
//! into a Merkle root, and serializes the 80-byte block header as the
//! 160-character hex string a miner hashes, leaving the final nonce word
//! zeroed for the search.

use bitcoin::hashes::{sha256d, Hash};

use crate::error::{Error, Result};
use crate::messages::JobNotification;
use crate::target;

/// Hex placeholder for the nonce word the miner will roll.
const NONCE_PLACEHOLDER: &str = "00000000";

/// A hashable unit of work built from the current notification and state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Job identifier, echoed back on submit.
    pub job_id: String,

    /// Block header as 160 lowercase hex characters; the last eight are
    /// the zeroed nonce placeholder.
    pub header_hex: String,

    /// Share target as eight little-endian u32 words.
    pub target: [u32; 8],

    /// Extranonce2 value spliced into the coinbase.
    pub extranonce2: u32,

    /// Width of the extranonce2 field in bytes.
    pub extranonce2_size: u32,
}

/// A solved share, ready for `mining.submit`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobResult {
    /// Worker identity the share is credited to.
    pub worker_name: String,

    /// Job the nonce was found against.
    pub job_id: String,

    /// Header timestamp used while hashing.
    pub ntime: u32,

    /// The winning nonce.
    pub nonce: u32,

    /// Extranonce2 value used while hashing.
    pub extranonce2: u32,

    /// Width of the extranonce2 field in bytes.
    pub extranonce2_size: u32,
}

impl JobResult {
    /// A result is empty iff it names no job.
    pub fn is_empty(&self) -> bool {
        self.job_id.is_empty()
    }
}

/// Reverse the byte pairs of a hex string: `"1a44b9f2"` -> `"f2b9441a"`.
///
/// The input must have even length and be ASCII hex; anything else is a
/// programmer error.
pub fn hex_reverse(hex: &str) -> String {
    assert!(
        hex.len() % 2 == 0,
        "hex_reverse requires an even number of digits"
    );

    let mut out = String::with_capacity(hex.len());
    let mut i = hex.len();
    while i >= 2 {
        out.push_str(&hex[i - 2..i]);
        i -= 2;
    }
    out
}

/// Render a u32 as eight lowercase hex chars in hashing byte order, i.e.
/// bytes reversed relative to the host value: `0x12345678` -> `"78563412"`.
///
/// This is the byte order pools expect for the ntime and nonce fields of
/// `mining.submit`.
pub(crate) fn swapped_u32_hex(value: u32) -> String {
    hex::encode(value.to_le_bytes())
}

/// Render an extranonce2 value as lowercase big-endian hex, zero-padded to
/// `2 * size` characters.
pub(crate) fn extranonce2_hex(value: u32, size: u32) -> Result<String> {
    let bytes = extranonce2_be_bytes(value, size)?;
    Ok(hex::encode(bytes))
}

/// Serialize an extranonce2 value as exactly `size` big-endian bytes.
fn extranonce2_be_bytes(value: u32, size: u32) -> Result<Vec<u8>> {
    let size = size as usize;
    if size == 0 {
        return Err(Error::LocalReject(
            "extranonce2 size is zero".to_string(),
        ));
    }

    let be = value.to_be_bytes();
    if size >= be.len() {
        let mut bytes = vec![0u8; size - be.len()];
        bytes.extend_from_slice(&be);
        Ok(bytes)
    } else {
        if u64::from(value) >= 1u64 << (8 * size) {
            return Err(Error::LocalReject(format!(
                "extranonce2 {:#x} does not fit in {} bytes",
                value, size
            )));
        }
        Ok(be[be.len() - size..].to_vec())
    }
}

fn decode_hex(field: &str, hex: &str) -> Result<Vec<u8>> {
    hex::decode(hex)
        .map_err(|err| Error::ProtocolShape(format!("{} hex: {}", field, err)))
}

/// Build a [`Job`] from a notification plus the extranonce snapshot and
/// difficulty in force for it.
///
/// Splices `extranonce1 || extranonce2` between the coinbase halves,
/// double-SHA256s the result, folds the Merkle branch, and serializes the
/// header with a zeroed nonce. Pure: no connection state is touched.
pub fn build(
    notification: &JobNotification,
    extranonce1: &str,
    extranonce2_size: u32,
    extranonce2: u32,
    difficulty: f64,
) -> Result<Job> {
    // Assemble the coinbase transaction around the extranonce splice.
    let mut coinbase = decode_hex("coinb1", &notification.coinb1)?;
    coinbase.extend_from_slice(&decode_hex("extranonce1", extranonce1)?);
    coinbase.extend_from_slice(&extranonce2_be_bytes(extranonce2, extranonce2_size)?);
    coinbase.extend_from_slice(&decode_hex("coinb2", &notification.coinb2)?);

    // Climb the Merkle tree from the coinbase hash.
    let mut acc = sha256d::Hash::hash(&coinbase).to_byte_array();
    for branch in &notification.merkle_branch {
        let mut combined = Vec::with_capacity(64);
        combined.extend_from_slice(&acc);
        combined.extend_from_slice(&decode_hex("merkle branch", branch)?);
        acc = sha256d::Hash::hash(&combined).to_byte_array();
    }

    let mut header_hex = String::with_capacity(160);
    header_hex.push_str(&hex_reverse(&notification.block_version));
    header_hex.push_str(&notification.prev_hash);
    header_hex.push_str(&hex::encode(acc));
    header_hex.push_str(&hex_reverse(&notification.ntime));
    header_hex.push_str(&hex_reverse(&notification.nbits));
    header_hex.push_str(NONCE_PLACEHOLDER);

    Ok(Job {
        job_id: notification.job_id.clone(),
        header_hex,
        target: target::difficulty_to_target(difficulty),
        extranonce2,
        extranonce2_size,
    })
}
