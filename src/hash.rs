//! Hash computation for signed bridge claims
//!
//! Each host chain wraps a signed message in its own envelope before hashing:
//!
//! - Ethereum and the Kanban ledger: EIP-191 personal message, keccak256
//! - TRON: the same layout with the TRON header
//! - Bitcoin family: signed-message magic with a varint length, double SHA-256

use sha2::{Digest, Sha256};
use tiny_keccak::{Hasher, Keccak};

/// Compute keccak256 hash of data
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// Single SHA-256
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Double SHA-256, as used by Bitcoin-family chains
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// Lowercase hex SHA-256 of a string
pub fn sha256_hex(value: &str) -> String {
    hex::encode(sha256(value.as_bytes()))
}

// ============================================================================
// Signed-message envelopes
// ============================================================================

const ETHEREUM_HEADER: &[u8] = b"\x19Ethereum Signed Message:\n";
const TRON_HEADER: &[u8] = b"\x19TRON Signed Message:\n";

pub const BITCOIN_MAGIC: &[u8] = b"\x18Bitcoin Signed Message:\n";
pub const LITECOIN_MAGIC: &[u8] = b"\x19Litecoin Signed Message:\n";
pub const DOGECOIN_MAGIC: &[u8] = b"\x19Dogecoin Signed Message:\n";

fn personal_message_hash(header: &[u8], message: &[u8]) -> [u8; 32] {
    let len = message.len().to_string();
    let mut data = Vec::with_capacity(header.len() + len.len() + message.len());
    data.extend_from_slice(header);
    data.extend_from_slice(len.as_bytes());
    data.extend_from_slice(message);
    keccak256(&data)
}

/// EIP-191 personal-message hash
pub fn eip191_hash(message: &[u8]) -> [u8; 32] {
    personal_message_hash(ETHEREUM_HEADER, message)
}

/// TRON personal-message hash
pub fn tron_message_hash(message: &[u8]) -> [u8; 32] {
    personal_message_hash(TRON_HEADER, message)
}

/// Bitcoin compact-size integer
pub fn write_varint(out: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => out.push(n as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&n.to_le_bytes());
        }
    }
}

/// Bitcoin-family signed-message hash with the given magic prefix
pub fn bitcoin_message_hash(magic: &[u8], message: &[u8]) -> [u8; 32] {
    let mut data = Vec::with_capacity(magic.len() + 9 + message.len());
    data.extend_from_slice(magic);
    write_varint(&mut data, message.len() as u64);
    data.extend_from_slice(message);
    sha256d(&data)
}
