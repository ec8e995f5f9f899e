//! Utility functions and helpers
//!
//! Hashing primitives plus the hex, byte-order and Base58Check helpers
//! the lessons use to show what Bitcoin data looks like.

pub mod crypto;

pub use crypto::{
    base58check_decode, base58check_encode, double_sha256_hex, from_hex, hash160_digest, hash256,
    hash256_digest, le_hex_to_u32, reverse_hex, sha256, sha256_digest, to_hex, truncate_hash,
    u32_to_le_hex, DISPLAY_HASH_LEN,
};
