//! Caller-facing operations
//!
//! Every operation takes its inputs explicitly and runs as one independent
//! unit of work. Key derivation is deliberately slow, so sealing and
//! opening run on tokio's blocking pool instead of stalling the runtime.

use std::path::{Path, PathBuf};

use tokio::task;
use zeroize::Zeroizing;

use crate::armor;
use crate::breach::RangeClient;
use crate::error::{ErrorCategory, ErrorKind, Result, SvpError};
use crate::file_ops;
use crate::passphrase::NewPassword;
use crate::risk::{RiskAssessment, RiskInput, RiskScorer};
use crate::secretcrypt;

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(f).await.map_err(|e| {
        SvpError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            "background crypto task failed",
            e,
        )
    })?
}

/// Encrypt `text` into a base64 text-mode envelope.
pub async fn encrypt_text(text: &str, password: &NewPassword, iterations: u32) -> Result<String> {
    let text = Zeroizing::new(text.to_owned());
    let password = password.clone();
    run_blocking(move || {
        let sealed = secretcrypt::seal(password.as_bytes(), text.as_bytes(), None, iterations)?;
        Ok(armor::wrap(&sealed))
    })
    .await
}

/// Decrypt a base64 text-mode envelope back into text.
pub async fn decrypt_text(armored: &str, password: &str, iterations: u32) -> Result<String> {
    // Structural problems are reported without touching the blocking pool.
    let data = armor::unwrap(armored)?;
    crate::envelope::decode(&data)?;

    let password = Zeroizing::new(password.to_owned());
    run_blocking(move || {
        let opened = secretcrypt::open(password.as_bytes(), &data, iterations)?;
        String::from_utf8(opened.plaintext).map_err(|e| {
            let msg = "decrypted data is not valid UTF-8 text; decrypt it as a file instead";
            // Scrub the rejected plaintext before it is dropped.
            drop(Zeroizing::new(e.into_bytes()));
            SvpError::format(ErrorKind::BinaryFormat, msg)
        })
    })
    .await
}

/// Encrypt a file, returning the path of the written envelope.
pub async fn encrypt_file(
    input: &Path,
    output: Option<&Path>,
    password: &NewPassword,
    iterations: u32,
) -> Result<PathBuf> {
    let input = input.to_path_buf();
    let output = output.map(Path::to_path_buf);
    let password = password.clone();
    run_blocking(move || {
        file_ops::encrypt_file(&input, output.as_deref(), &password, iterations)
    })
    .await
}

/// Decrypt a file, returning the path of the restored plaintext.
pub async fn decrypt_file(
    input: &Path,
    output: Option<&Path>,
    password: &str,
    iterations: u32,
) -> Result<PathBuf> {
    let input = input.to_path_buf();
    let output = output.map(Path::to_path_buf);
    let password = Zeroizing::new(password.to_owned());
    run_blocking(move || {
        file_ops::decrypt_file(&input, output.as_deref(), &password, iterations)
    })
    .await
}

/// Score a set of credentials. Always completes; breach lookup problems
/// show up as warnings on the assessment.
pub async fn assess_risk<C: RangeClient>(
    scorer: &RiskScorer<C>,
    input: &RiskInput<'_>,
) -> RiskAssessment {
    scorer.assess(input).await
}
