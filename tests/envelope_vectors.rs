//! Envelope known-answer checks
//!
//! Builds envelopes through an independent path (the raw `pbkdf2` and
//! `aes-gcm` crates) and checks that svpbox reads them, and that what svpbox
//! writes has the documented layout.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use sha2::Sha256;

use svpbox::envelope::{self, FIXED_HEADER_LEN, Version};
use svpbox::{ErrorKind, armor, secretcrypt};

const ITERS: u32 = 1000;
const ZERO_SALT: [u8; 16] = [0u8; 16];
const ZERO_NONCE: [u8; 12] = [0u8; 12];

/// `"SVP1" || salt || iv || ct`, sealed with no associated data.
fn reference_v1(password: &str, plaintext: &[u8], salt: &[u8; 16], nonce: &[u8; 12]) -> Vec<u8> {
    let mut key = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, ITERS, &mut key);
    let cipher = Aes256Gcm::new_from_slice(&key).unwrap();
    let ct = cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .unwrap();

    let mut out = b"SVP1".to_vec();
    out.extend_from_slice(salt);
    out.extend_from_slice(nonce);
    out.extend_from_slice(&ct);
    out
}

#[test]
fn test_zero_salt_nonce_layout() {
    let sealed =
        secretcrypt::seal_with(b"pw", b"hi", None, ITERS, &ZERO_SALT, &ZERO_NONCE).unwrap();

    // magic, 16 zero salt bytes, 12 zero nonce bytes
    let expected_header = format!("53565031{}", "00".repeat(28));
    assert_eq!(hex::encode(&sealed[..FIXED_HEADER_LEN]), expected_header);
    // 2 plaintext bytes plus the 16-byte tag
    assert_eq!(sealed.len(), FIXED_HEADER_LEN + 2 + 16);

    let opened = secretcrypt::open(b"pw", &sealed, ITERS).unwrap();
    assert_eq!(opened.plaintext, b"hi");
    assert_eq!(opened.file_name, None);
}

#[test]
fn test_matches_reference_construction() {
    let salt = [0x11u8; 16];
    let nonce = [0x22u8; 12];
    let reference = reference_v1("correct horse", b"attack at dawn", &salt, &nonce);
    let ours = secretcrypt::seal_with(
        b"correct horse",
        b"attack at dawn",
        None,
        ITERS,
        &salt,
        &nonce,
    )
    .unwrap();
    assert_eq!(hex::encode(&ours), hex::encode(&reference));
}

#[test]
fn test_opens_reference_text_artifact() {
    let reference = reference_v1("pw", "héllo wörld".as_bytes(), &[7u8; 16], &[9u8; 12]);
    let armored = armor::wrap(&reference);
    assert!(armored.starts_with("U1ZQMQ"));

    let data = armor::unwrap(&armored).unwrap();
    let opened = secretcrypt::open(b"pw", &data, ITERS).unwrap();
    assert_eq!(opened.plaintext, "héllo wörld".as_bytes());
}

#[test]
fn test_file_mode_header_is_authenticated() {
    let sealed = secretcrypt::seal_with(
        b"pw",
        b"data",
        Some("a.txt"),
        ITERS,
        &ZERO_SALT,
        &ZERO_NONCE,
    )
    .unwrap();

    let env = envelope::decode(&sealed).unwrap();
    assert_eq!(env.version(), Version::V2);
    assert_eq!(env.file_name.as_deref(), Some("a.txt"));
    assert_eq!(sealed[FIXED_HEADER_LEN], 5);
    assert_eq!(&sealed[FIXED_HEADER_LEN + 1..FIXED_HEADER_LEN + 6], b"a.txt");

    // Same length rename: the header still decodes but no longer authenticates.
    let mut renamed = sealed.clone();
    renamed[FIXED_HEADER_LEN + 1] = b'b';
    let err = secretcrypt::open(b"pw", &renamed, ITERS).expect_err("renamed");
    assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));

    // Stripping the name and downgrading to SVP1 must not authenticate either.
    let mut downgraded = b"SVP1".to_vec();
    downgraded.extend_from_slice(&sealed[4..FIXED_HEADER_LEN]);
    downgraded.extend_from_slice(&sealed[FIXED_HEADER_LEN + 6..]);
    let err = secretcrypt::open(b"pw", &downgraded, ITERS).expect_err("downgraded");
    assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
}

#[test]
fn test_unknown_versions_and_foreign_data() {
    let mut sealed =
        secretcrypt::seal_with(b"pw", b"x", None, ITERS, &ZERO_SALT, &ZERO_NONCE).unwrap();
    sealed[3] = b'9';
    let err = secretcrypt::open(b"pw", &sealed, ITERS).expect_err("SVP9");
    assert_eq!(err.kind, Some(ErrorKind::UnsupportedVersion));
    assert!(err.is_format());

    let err = secretcrypt::open(b"pw", b"PK\x03\x04 not ours", ITERS).expect_err("zip");
    assert_eq!(err.kind, Some(ErrorKind::NotAnEnvelope));
}
