//! Password input and validation

use crate::error::{ErrorCategory, ErrorKind, Result, SvpError};
use std::io::{self, IsTerminal, Read, Write};
use zeroize::Zeroizing;

/// Default minimum password length, in characters.
pub const DEFAULT_MIN_PASSWORD_LEN: usize = 1;

/// A password chosen for encryption that passed validation.
///
/// Only constructible through [`NewPassword::confirm`], so holding one means
/// the checks ran. Wiped from memory when dropped.
#[derive(Clone)]
pub struct NewPassword(Zeroizing<String>);

impl NewPassword {
    /// Validate a password and its confirmation.
    ///
    /// Rejects an empty password, one shorter than `min_len` characters,
    /// and a confirmation that differs.
    pub fn confirm(password: &str, confirmation: &str, min_len: usize) -> Result<Self> {
        if password.is_empty() {
            return Err(validation("password must not be empty"));
        }
        if password != confirmation {
            return Err(validation("passwords do not match"));
        }
        let len = password.chars().count();
        if len < min_len {
            return Err(validation(format!(
                "password must be at least {} characters (got {})",
                min_len, len
            )));
        }
        Ok(Self(Zeroizing::new(password.to_owned())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for NewPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NewPassword(<redacted>)")
    }
}

fn validation(msg: impl Into<String>) -> SvpError {
    SvpError::with_kind(ErrorCategory::User, ErrorKind::Validation, msg)
}

/// Trait for reading passwords from various sources
pub trait PassphraseReader {
    /// Read a password, showing `prompt` if the source is interactive.
    ///
    /// Returns the password wrapped in `Zeroizing` to ensure it is securely
    /// wiped from memory when dropped.
    fn read_passphrase(&mut self, prompt: &str) -> Result<Zeroizing<String>>;

    /// Whether a second, confirming read is meaningful for this source.
    fn is_interactive(&self) -> bool {
        false
    }
}

/// Read a password for encryption, asking for confirmation when the source
/// is interactive.
pub fn read_new_password(reader: &mut dyn PassphraseReader, min_len: usize) -> Result<NewPassword> {
    let password = reader.read_passphrase("Password (svpbox): ")?;
    let confirmation = if reader.is_interactive() {
        reader.read_passphrase("Confirm password (svpbox): ")?
    } else {
        password.clone()
    };
    NewPassword::confirm(&password, &confirmation, min_len)
}

/// Returns a fixed password (for testing)
pub struct ConstantPassphraseReader {
    passphrase: Zeroizing<String>,
}

impl ConstantPassphraseReader {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase.into()),
        }
    }
}

impl PassphraseReader for ConstantPassphraseReader {
    fn read_passphrase(&mut self, _prompt: &str) -> Result<Zeroizing<String>> {
        Ok(self.passphrase.clone())
    }
}

/// Reads a password from any io::Read source
///
/// The whole stream is the password, minus one trailing line ending so that
/// `echo secret | svpbox ...` behaves as expected.
pub struct ReaderPassphraseReader {
    reader: Box<dyn Read>,
}

impl ReaderPassphraseReader {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl PassphraseReader for ReaderPassphraseReader {
    fn read_passphrase(&mut self, _prompt: &str) -> Result<Zeroizing<String>> {
        let mut data = Zeroizing::new(String::new());
        self.reader.read_to_string(&mut data).map_err(|e| {
            SvpError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::Io,
                "error reading password",
                e,
            )
        })?;
        if data.ends_with('\n') {
            data.pop();
            if data.ends_with('\r') {
                data.pop();
            }
        }
        Ok(data)
    }
}

/// Reads a password from the terminal with no echo
#[derive(Default)]
pub struct TerminalPassphraseReader;

impl TerminalPassphraseReader {
    pub fn new() -> Self {
        Self
    }
}

impl PassphraseReader for TerminalPassphraseReader {
    fn read_passphrase(&mut self, prompt: &str) -> Result<Zeroizing<String>> {
        if !io::stdin().is_terminal() {
            return Err(SvpError::with_kind(
                ErrorCategory::User,
                ErrorKind::Io,
                "cannot read password from terminal - stdin is not a terminal",
            ));
        }

        io::stderr()
            .write_all(prompt.as_bytes())
            .and_then(|()| io::stderr().flush())
            .map_err(|e| {
                SvpError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    "failed to write prompt",
                    e,
                )
            })?;

        // Read password *without echo*
        let passphrase = rpassword::read_password().map_err(|e| {
            SvpError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                "failure reading password",
                e,
            )
        })?;

        Ok(Zeroizing::new(passphrase))
    }

    fn is_interactive(&self) -> bool {
        true
    }
}
