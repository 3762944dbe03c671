//! Shared-secret handshake.
//!
//! The server sends a random nonce; the client proves knowledge of the key by
//! returning `HMAC-SHA256(key, nonce)`. Digests are compared in constant time.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const BLOCK_SIZE: usize = 64;
const NONCE_LEN: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("challenge nonce is not valid base64")]
    MalformedNonce,
    #[error("authentication digest rejected")]
    DigestMismatch,
}

/// HMAC-SHA256 (RFC 2104).
pub fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; 32] {
    let mut k = [0u8; BLOCK_SIZE];
    if key.len() > BLOCK_SIZE {
        let hashed = Sha256::digest(key);
        k[..hashed.len()].copy_from_slice(&hashed);
    } else {
        k[..key.len()].copy_from_slice(key);
    }

    let mut ipad = [0x36u8; BLOCK_SIZE];
    let mut opad = [0x5cu8; BLOCK_SIZE];
    for i in 0..BLOCK_SIZE {
        ipad[i] ^= k[i];
        opad[i] ^= k[i];
    }

    let inner = Sha256::new().chain_update(ipad).chain_update(message).finalize();
    Sha256::new().chain_update(opad).chain_update(inner).finalize().into()
}

/// Generate a fresh base64 nonce for a challenge frame.
pub fn new_nonce() -> String {
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    STANDARD.encode(nonce)
}

/// Client side: compute the base64 digest answering `nonce`.
pub fn answer_challenge(key: &str, nonce: &str) -> Result<String, AuthError> {
    let raw = STANDARD.decode(nonce).map_err(|_| AuthError::MalformedNonce)?;
    Ok(STANDARD.encode(hmac_sha256(key.as_bytes(), &raw)))
}

/// Server side: check a client's digest against the expected one.
pub fn verify_digest(key: &str, nonce: &str, digest: &str) -> Result<(), AuthError> {
    let expected = answer_challenge(key, nonce)?;
    if expected.as_bytes().ct_eq(digest.as_bytes()).into() {
        Ok(())
    } else {
        Err(AuthError::DigestMismatch)
    }
}

/// Decide which key the server will require.
///
/// Every connection is authenticated. An explicit key always wins; without
/// one a key is generated and printed once on stderr.
pub fn resolve_auth_key(user_key: Option<String>) -> String {
    if let Some(key) = user_key.filter(|k| !k.is_empty()) {
        return key;
    }
    let key = generate_key();
    eprintln!("zap-server: auth key: {}", key);
    key
}

fn generate_key() -> String {
    use rand::Rng;
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}
