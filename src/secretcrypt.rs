//! Password-based sealing: PBKDF2-HMAC-SHA256 + AES-256-GCM in an envelope
//!
//! `seal` draws a fresh salt and nonce for every call, derives the key,
//! encrypts and encodes. `open` runs the same steps in reverse, parsing the
//! envelope completely before the key is derived.

use rand::RngCore;
use rand::rngs::OsRng;
use tracing::debug;

use crate::cipher::{self, NONCE_LEN};
use crate::envelope::{self, Version};
use crate::error::Result;
use crate::kdf::{self, SALT_LEN};

/// Plaintext recovered from an envelope, together with the file name it
/// carried (file-mode envelopes only).
#[derive(Debug, PartialEq, Eq)]
pub struct Opened {
    pub plaintext: Vec<u8>,
    pub file_name: Option<String>,
}

/// Fresh salt from the OS CSPRNG.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Seal plaintext with a password using random salt and nonce.
///
/// Passing a `file_name` produces a file-mode (`SVP2`) envelope.
pub fn seal(
    password: &[u8],
    plaintext: &[u8],
    file_name: Option<&str>,
    iterations: u32,
) -> Result<Vec<u8>> {
    seal_with(
        password,
        plaintext,
        file_name,
        iterations,
        &generate_salt(),
        &cipher::generate_nonce(),
    )
}

/// Seal plaintext with a password using provided salt and nonce.
///
/// This function is ONLY for testing purposes to generate deterministic output.
/// NEVER use this in production - always use `seal()` which generates random salt/nonce.
pub fn seal_with(
    password: &[u8],
    plaintext: &[u8],
    file_name: Option<&str>,
    iterations: u32,
    salt: &[u8; SALT_LEN],
    nonce: &[u8; NONCE_LEN],
) -> Result<Vec<u8>> {
    // Validate metadata before spending time on key derivation.
    let header = envelope::encode_header(salt, nonce, file_name)?;
    let aad = file_name.map(|_| header.as_slice());

    let key = kdf::derive_key(password, salt, iterations)?;
    let sealed = cipher::encrypt(&key, nonce, plaintext, aad)?;

    debug!(
        plaintext_len = plaintext.len(),
        iterations,
        file_mode = file_name.is_some(),
        "sealed envelope"
    );

    let mut output = header;
    output.extend_from_slice(&sealed);
    Ok(output)
}

/// Open an envelope with a password.
pub fn open(password: &[u8], data: &[u8], iterations: u32) -> Result<Opened> {
    let env = envelope::decode(data)?;
    let aad = match env.version() {
        Version::V1 => None,
        Version::V2 => Some(env.header),
    };

    let key = kdf::derive_key(password, &env.salt, iterations)?;
    let plaintext = cipher::decrypt(&key, &env.nonce, env.ciphertext, aad)?;

    debug!(
        plaintext_len = plaintext.len(),
        iterations,
        version = ?env.version(),
        "opened envelope"
    );

    Ok(Opened {
        plaintext,
        file_name: env.file_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::TAG_LEN;
    use crate::envelope::FIXED_HEADER_LEN;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    // Low work factor keeps the unit tests fast; the format does not depend on it.
    const ITERS: u32 = 1000;

    #[test]
    fn test_empty_plaintext() {
        let sealed = seal(b"test", b"", None, ITERS).unwrap();
        assert_eq!(sealed.len(), FIXED_HEADER_LEN + TAG_LEN);
        let opened = open(b"test", &sealed, ITERS).unwrap();
        assert!(opened.plaintext.is_empty());
        assert_eq!(opened.file_name, None);
    }

    #[test]
    fn test_small_plaintext() {
        let sealed = seal(b"test", b"hello", None, ITERS).unwrap();
        assert_eq!(open(b"test", &sealed, ITERS).unwrap().plaintext, b"hello");
    }

    #[test]
    fn test_file_name_roundtrip() {
        let sealed = seal(b"test", b"data", Some("report.pdf"), ITERS).unwrap();
        assert_eq!(&sealed[..4], b"SVP2");
        let opened = open(b"test", &sealed, ITERS).unwrap();
        assert_eq!(opened.plaintext, b"data");
        assert_eq!(opened.file_name.as_deref(), Some("report.pdf"));
    }

    #[test]
    fn test_deterministic_encryption() {
        let salt = [1u8; SALT_LEN];
        let nonce = [2u8; NONCE_LEN];

        let ct1 = seal_with(b"test", b"hello world", None, ITERS, &salt, &nonce).unwrap();
        let ct2 = seal_with(b"test", b"hello world", None, ITERS, &salt, &nonce).unwrap();

        // Same salt/nonce produces identical ciphertext
        assert_eq!(ct1, ct2);
        assert_eq!(open(b"test", &ct1, ITERS).unwrap().plaintext, b"hello world");
    }

    #[test]
    fn test_fresh_salt_and_nonce_per_seal() {
        let ct1 = seal(b"test", b"hello world", None, ITERS).unwrap();
        let ct2 = seal(b"test", b"hello world", None, ITERS).unwrap();

        let e1 = envelope::decode(&ct1).unwrap();
        let e2 = envelope::decode(&ct2).unwrap();
        assert_ne!(e1.salt, e2.salt);
        assert_ne!(e1.nonce, e2.nonce);
        assert_ne!(e1.ciphertext, e2.ciphertext);
    }

    #[test]
    fn test_wrong_password() {
        let sealed = seal(b"correct", b"secret data", None, ITERS).unwrap();
        let err = open(b"wrong", &sealed, ITERS).expect_err("wrong password");
        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
        assert_eq!(err.message(), cipher::AUTH_FAILED_MSG);
    }

    #[test]
    fn test_wrong_iteration_count() {
        let sealed = seal(b"pw", b"secret data", None, ITERS).unwrap();
        let err = open(b"pw", &sealed, ITERS + 1).expect_err("different work factor");
        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
    }

    #[test]
    fn test_bit_flips_in_ciphertext_detected() {
        let sealed = seal_with(b"pw", b"flip me", None, 1, &[0u8; SALT_LEN], &[0u8; NONCE_LEN])
            .unwrap();
        for byte in FIXED_HEADER_LEN..sealed.len() {
            for bit in 0..8 {
                let mut tampered = sealed.clone();
                tampered[byte] ^= 1 << bit;
                let err = open(b"pw", &tampered, 1).expect_err("tampering must be detected");
                assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
            }
        }
    }

    #[test]
    fn test_renamed_file_detected() {
        let sealed = seal(b"pw", b"data", Some("a.txt"), ITERS).unwrap();
        let mut tampered = sealed.clone();
        // Swap the first letter of the embedded name
        tampered[FIXED_HEADER_LEN + 1] = b'b';
        let err = open(b"pw", &tampered, ITERS).expect_err("renamed");
        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
    }

    #[test]
    fn test_format_errors_come_before_kdf() {
        // Iterations of 0 would fail key derivation, so a format error here
        // proves decoding ran first.
        let err = open(b"pw", b"SVP1short", 0).expect_err("truncated");
        assert_eq!(err.kind, Some(ErrorKind::Truncated));

        let err = open(b"pw", b"nope, not an envelope at all......", 0).expect_err("bad magic");
        assert_eq!(err.kind, Some(ErrorKind::NotAnEnvelope));
    }

    #[test]
    fn test_long_file_name_rejected_before_kdf() {
        let name = "x".repeat(300);
        let err = seal(b"pw", b"data", Some(&name), 0).expect_err("name too long");
        assert_eq!(err.kind, Some(ErrorKind::MetadataOutOfRange));
    }

    #[test]
    fn test_all_byte_values() {
        let plaintext: Vec<u8> = (0..=255).collect();
        let sealed = seal(b"test", &plaintext, None, ITERS).unwrap();
        assert_eq!(open(b"test", &sealed, ITERS).unwrap().plaintext, plaintext);
    }

    #[test]
    fn test_large_plaintext() {
        let plaintext = vec![0x42u8; 128 * 1024]; // 128KB
        let sealed = seal(b"test", &plaintext, None, ITERS).unwrap();
        assert_eq!(open(b"test", &sealed, ITERS).unwrap().plaintext, plaintext);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_open_inverts_seal(
            password in ".{0,32}",
            plaintext in proptest::collection::vec(any::<u8>(), 0..512),
            file_name in proptest::option::of("\\PC{1,60}"),
        ) {
            let sealed = seal(password.as_bytes(), &plaintext, file_name.as_deref(), 1).unwrap();
            let opened = open(password.as_bytes(), &sealed, 1).unwrap();
            prop_assert_eq!(opened.plaintext, plaintext);
            prop_assert_eq!(opened.file_name, file_name);

            let mut wrong = password.into_bytes();
            wrong.push(b'!');
            let err = open(&wrong, &sealed, 1).unwrap_err();
            prop_assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
        }
    }
}
