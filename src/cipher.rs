//! Authenticated encryption with AES-256-GCM
//!
//! The tag is verified before any plaintext is returned; a failed open
//! never yields partial output.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::{ErrorCategory, ErrorKind, Result, SvpError};
use crate::kdf::KEY_LEN;

/// Length of nonce in bytes
pub const NONCE_LEN: usize = 12;

/// Length of the GCM authentication tag appended to every ciphertext
pub const TAG_LEN: usize = 16;

/// Message shown for any tag mismatch. Wrong password and tampering are
/// deliberately indistinguishable.
pub const AUTH_FAILED_MSG: &str = "wrong password or corrupted data";

/// Fresh nonce from the OS CSPRNG.
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypt `plaintext`, returning ciphertext with the tag appended.
pub fn encrypt(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
    aad: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let payload = Payload {
        msg: plaintext,
        aad: aad.unwrap_or_default(),
    };
    cipher
        .encrypt(Nonce::from_slice(nonce), payload)
        .map_err(|_| {
            SvpError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::InternalInvariant,
                "AES-GCM encryption failed",
            )
        })
}

/// Verify and decrypt `sealed` (ciphertext || tag).
pub fn decrypt(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    sealed: &[u8],
    aad: Option<&[u8]>,
) -> Result<Vec<u8>> {
    if sealed.len() < TAG_LEN {
        return Err(SvpError::format(
            ErrorKind::Truncated,
            "ciphertext shorter than the authentication tag",
        ));
    }

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let payload = Payload {
        msg: sealed,
        aad: aad.unwrap_or_default(),
    };
    cipher
        .decrypt(Nonce::from_slice(nonce), payload)
        .map_err(|_| {
            SvpError::with_kind(
                ErrorCategory::User,
                ErrorKind::AuthenticationFailed,
                AUTH_FAILED_MSG,
            )
        })
}
