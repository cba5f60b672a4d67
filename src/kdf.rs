//! Password-based key derivation (PBKDF2-HMAC-SHA256)
//!
//! The iteration count is not stored in the envelope. Whatever count was
//! used to seal must be supplied again to open.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{ErrorCategory, ErrorKind, Result, SvpError};

/// Length of salt in bytes
pub const SALT_LEN: usize = 16;

/// Length of derived key in bytes
pub const KEY_LEN: usize = 32;

/// Work factor used when the caller has no reason to pick another.
pub const DEFAULT_ITERATIONS: u32 = 150_000;

/// A 256-bit key that is wiped from memory when dropped.
pub type DerivedKey = Zeroizing<[u8; KEY_LEN]>;

/// Derive a 32-byte key from a password and salt.
///
/// An empty password is accepted; refusing it is caller policy.
pub fn derive_key(password: &[u8], salt: &[u8; SALT_LEN], iterations: u32) -> Result<DerivedKey> {
    if iterations == 0 {
        return Err(SvpError::with_kind(
            ErrorCategory::User,
            ErrorKind::KeyDerivation,
            "iteration count must be at least 1",
        ));
    }

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(password, salt, iterations, key.as_mut_slice());
    Ok(key)
}
