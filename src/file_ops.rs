//! File encryption/decryption operations
//!
//! Encrypted files are raw envelope bytes with an `.enc` suffix. The
//! original file name travels inside the envelope so decryption can
//! restore it.

use crate::error::{ErrorCategory, ErrorKind, Result, SvpError};
use crate::passphrase::NewPassword;
use crate::secretcrypt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Suffix marking an encrypted container.
pub const ENCRYPTED_SUFFIX: &str = ".enc";

/// Name used when an envelope carries no usable file name and the input
/// has no suffix to strip.
pub const FALLBACK_DECRYPTED_NAME: &str = "decrypted_file";

/// Encrypt a file with a password
///
/// Writes `<input>.enc` next to the input unless `output` is given, and
/// returns the path written. The output file is created with mode 0o600
/// (read/write for owner only) on Unix systems.
pub fn encrypt_file(
    input: &Path,
    output: Option<&Path>,
    password: &NewPassword,
    iterations: u32,
) -> Result<PathBuf> {
    let file_name = input
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            SvpError::with_kind(
                ErrorCategory::User,
                ErrorKind::Validation,
                format!("{} has no valid UTF-8 file name", input.display()),
            )
        })?;

    let plaintext = fs::read(input).map_err(|e| read_error(input, e))?;
    let sealed = secretcrypt::seal(password.as_bytes(), &plaintext, Some(file_name), iterations)
        .map_err(|e| e.with_context(format!("failed to encrypt {}", input.display())))?;

    let (target, overwrite) = match output {
        Some(path) => (path.to_path_buf(), true),
        None => (encrypted_path(input), false),
    };
    write_file_secure(&target, &sealed, overwrite)
        .map_err(|e| e.with_context(format!("failed to write to {}", target.display())))?;

    debug!(input = %input.display(), output = %target.display(), "encrypted file");
    Ok(target)
}

/// Decrypt a file with a password
///
/// Without an explicit `output`, the plaintext is written next to the input
/// under the file name stored in the envelope. An existing file is never
/// overwritten in that case. Nothing is written if decryption fails.
pub fn decrypt_file(
    input: &Path,
    output: Option<&Path>,
    password: &str,
    iterations: u32,
) -> Result<PathBuf> {
    let data = fs::read(input).map_err(|e| read_error(input, e))?;
    let opened = secretcrypt::open(password.as_bytes(), &data, iterations)
        .map_err(|e| e.with_context(format!("failed to decrypt {}", input.display())))?;

    let (target, overwrite) = match output {
        Some(path) => (path.to_path_buf(), true),
        None => (decrypted_path(input, opened.file_name.as_deref()), false),
    };
    write_file_secure(&target, &opened.plaintext, overwrite)
        .map_err(|e| e.with_context(format!("failed to write to {}", target.display())))?;

    debug!(input = %input.display(), output = %target.display(), "decrypted file");
    Ok(target)
}

/// `<input>.enc`
pub fn encrypted_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push(ENCRYPTED_SUFFIX);
    PathBuf::from(name)
}

/// Where to restore a decrypted file when the caller did not choose.
///
/// Only the base name of `embedded` is honoured, so an envelope cannot
/// direct output outside the input's directory.
pub fn decrypted_path(input: &Path, embedded: Option<&str>) -> PathBuf {
    let dir = input.parent().unwrap_or_else(|| Path::new(""));

    if let Some(name) = embedded {
        match Path::new(name).file_name() {
            Some(base) => return dir.join(base),
            None => warn!(embedded = name, "ignoring unusable embedded file name"),
        }
    }

    let stripped = input
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_suffix(ENCRYPTED_SUFFIX))
        .filter(|n| !n.is_empty());
    dir.join(stripped.unwrap_or(FALLBACK_DECRYPTED_NAME))
}

/// Write file atomically with secure permissions (0o600 on Unix)
///
/// The contents go to a temp file in the target directory which is fsynced
/// and then renamed over the target, so readers see the old file or the
/// new one, never a partial write. With `overwrite` false an existing
/// target is left alone and the write fails.
pub fn write_file_secure(path: &Path, contents: &[u8], overwrite: bool) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        SvpError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Io,
            format!("failed to create tempfile in {}", dir.display()),
            e,
        )
    })?;

    temp_file.write_all(contents).map_err(|e| {
        SvpError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to write to tempfile",
            e,
        )
    })?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file.flush().map_err(|e| {
        SvpError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to flush tempfile",
            e,
        )
    })?;
    temp_file.as_file().sync_all().map_err(|e| {
        SvpError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to sync file prior to rename",
            e,
        )
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| {
                SvpError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    "failed to set tempfile permissions",
                    e,
                )
            })?;
    }

    let persisted = if overwrite {
        temp_file.persist(path)
    } else {
        temp_file.persist_noclobber(path)
    };
    persisted.map_err(|e| {
        let category = if e.error.kind() == io::ErrorKind::AlreadyExists {
            ErrorCategory::User
        } else {
            ErrorCategory::Internal
        };
        SvpError::with_kind_and_source(
            category,
            ErrorKind::Io,
            format!("failed to rename to target file {}", path.display()),
            e.error,
        )
    })?;
    Ok(())
}

fn read_error(path: &Path, err: io::Error) -> SvpError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    SvpError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}
