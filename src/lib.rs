//! svpbox - Password-based text and file encryption (PBKDF2 + AES-256-GCM)
//! with a credential risk scanner

#![forbid(unsafe_code)]

pub mod armor;
pub mod breach;
pub mod cipher;
pub mod config;
pub mod envelope;
pub mod error;
pub mod file_ops;
pub mod kdf;
pub mod ops;
pub mod passphrase;
pub mod risk;
pub mod secretcrypt;
pub mod strength;

pub use error::{ErrorCategory, ErrorKind, Result, SvpError};
