//! PKCE (RFC 7636) and state-parameter helpers shared by the interactive
//! flows.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Random hex string of `byte_count` bytes, used for the OAuth `state`.
pub fn random_state(byte_count: usize) -> String {
    let buf = random_bytes(byte_count);
    buf.iter().map(|b| format!("{b:02x}")).collect()
}

/// Random URL-safe code verifier (43 chars from 32 bytes).
pub fn generate_code_verifier() -> String {
    URL_SAFE_NO_PAD.encode(random_bytes(32))
}

/// S256 code challenge for a verifier.
pub fn compute_code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

fn random_bytes(byte_count: usize) -> Vec<u8> {
    let mut buf = vec![0u8; byte_count];
    for chunk in buf.chunks_mut(16) {
        let id = uuid::Uuid::new_v4();
        let bytes = id.as_bytes();
        let len = chunk.len().min(16);
        chunk[..len].copy_from_slice(&bytes[..len]);
    }
    buf
}
