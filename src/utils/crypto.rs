use crate::error::{AcademyError, Result};
use data_encoding::HEXLOWER;
use ring::digest::{Context, SHA256};
use ripemd::{Digest as RipemdDigest, Ripemd160};

/// Hash prefix length used by the on-screen demos
pub const DISPLAY_HASH_LEN: usize = 8;

const CHECKSUM_LEN: usize = 4;

pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    digest.as_ref().to_vec()
}

/// SHA-256 applied twice to raw bytes (Bitcoin block and txid hashing)
pub fn hash256_digest(data: &[u8]) -> Vec<u8> {
    sha256_digest(&sha256_digest(data))
}

/// RIPEMD-160 of SHA-256, as used for Bitcoin addresses
pub fn hash160_digest(data: &[u8]) -> Vec<u8> {
    let mut hasher = Ripemd160::new();
    hasher.update(sha256_digest(data));
    hasher.finalize().to_vec()
}

/// Lowercase hex SHA-256 of the UTF-8 encoding of `text`
pub fn sha256(text: &str) -> String {
    HEXLOWER.encode(&sha256_digest(text.as_bytes()))
}

/// `sha256(sha256(text))`, chaining through the hex text of the first round
pub fn hash256(text: &str) -> String {
    sha256(&sha256(text))
}

/// Hex of the double SHA-256 over raw digest bytes
pub fn double_sha256_hex(text: &str) -> String {
    HEXLOWER.encode(&hash256_digest(text.as_bytes()))
}

pub fn to_hex(data: &[u8]) -> String {
    HEXLOWER.encode(data)
}

pub fn from_hex(text: &str) -> Result<Vec<u8>> {
    hex::decode(text.trim()).map_err(|e| {
        log::error!("Rejected hex input {text:?}: {e}");
        AcademyError::Encoding(format!("Invalid hex: {e}"))
    })
}

/// Flip the byte order of a hex string (txids are displayed little-endian)
pub fn reverse_hex(text: &str) -> Result<String> {
    let mut bytes = from_hex(text)?;
    bytes.reverse();
    Ok(to_hex(&bytes))
}

pub fn u32_to_le_hex(value: u32) -> String {
    to_hex(&value.to_le_bytes())
}

pub fn le_hex_to_u32(text: &str) -> Result<u32> {
    let bytes = from_hex(text)?;
    let array: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
        AcademyError::Encoding(format!("Expected 4 bytes, got {}", bytes.len()))
    })?;
    Ok(u32::from_le_bytes(array))
}

pub fn base58check_encode(version: u8, payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(1 + payload.len() + CHECKSUM_LEN);
    data.push(version);
    data.extend_from_slice(payload);
    let checksum = hash256_digest(&data);
    data.extend_from_slice(&checksum[..CHECKSUM_LEN]);
    bs58::encode(data).into_string()
}

/// Decode and verify a Base58Check string, returning `(version, payload)`
pub fn base58check_decode(text: &str) -> Result<(u8, Vec<u8>)> {
    let data = bs58::decode(text)
        .into_vec()
        .map_err(|e| AcademyError::Encoding(format!("Invalid base58 encoding: {e}")))?;
    if data.len() < 1 + CHECKSUM_LEN {
        return Err(AcademyError::Encoding(
            "Base58Check data too short".to_string(),
        ));
    }

    let (body, checksum) = data.split_at(data.len() - CHECKSUM_LEN);
    if hash256_digest(body)[..CHECKSUM_LEN] != *checksum {
        return Err(AcademyError::Encoding(
            "Base58Check checksum mismatch".to_string(),
        ));
    }
    Ok((body[0], body[1..].to_vec()))
}

/// Shorten a hex hash for display only. Never compare truncated hashes.
pub fn truncate_hash(hash: &str, len: usize) -> String {
    hash.chars().take(len).collect()
}
