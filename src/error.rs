use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to any other error
    /// category in this enum.
    ///
    /// In particular this means that use of Internal is never a guarantee
    /// the error is not, for example due to a user error - merely that it
    /// cannot be confidently determined by the code.
    Internal,

    /// The user provided invalid input or performed an action that is
    /// unsupported or impossible to complete.
    User,

    /// A remote service could not be reached or answered with something
    /// unusable. Never fatal to the operation that triggered it.
    Network,
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Password missing, too short, or not matching its confirmation.
    Validation,
    /// Input does not start with an envelope magic tag.
    NotAnEnvelope,
    /// Input carries the envelope tag but a version we do not support.
    UnsupportedVersion,
    /// Input ended before the fixed header or the authentication tag.
    Truncated,
    /// A metadata length field points past the end of the buffer, or a
    /// file name does not fit in the length field.
    MetadataOutOfRange,
    /// Envelope fields are present but their contents are invalid
    /// (non-UTF-8 file name or plaintext).
    BinaryFormat,
    /// Base64 decoding of a text-mode envelope failed.
    ArmoringDecode,
    /// Authentication failed due to an incorrect password or tampering
    /// or corruption.
    AuthenticationFailed,
    /// Key derivation parameters were rejected.
    KeyDerivation,
    /// The breach lookup service could not be reached.
    Network,
    /// The breach lookup service did not answer in time.
    Timeout,
    /// The breach lookup service answered with an unparsable body.
    MalformedResponse,
    /// Unexpected state reached within svpbox logic.
    InternalInvariant,
    /// Interaction with the filesystem, stdin/stdout, or other I/O failed.
    Io,
}

impl ErrorKind {
    /// True for every structural envelope/armor failure, including
    /// unsupported versions. These are always reported before any
    /// cryptographic work is attempted.
    pub fn is_format(self) -> bool {
        matches!(
            self,
            ErrorKind::NotAnEnvelope
                | ErrorKind::UnsupportedVersion
                | ErrorKind::Truncated
                | ErrorKind::MetadataOutOfRange
                | ErrorKind::BinaryFormat
                | ErrorKind::ArmoringDecode
        )
    }
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct SvpError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Optional specific condition tag for consumers that need to
    /// branch their behavior. Any code consuming errors MUST handle
    /// the absence of a defined kind.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl SvpError {
    /// Creates a new error with a required category and display message.
    pub fn new(category: ErrorCategory, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: None,
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that also tags the failure with a kind.
    pub fn with_kind(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that carries both a kind tag and the originating source error.
    pub fn with_kind_and_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// Shorthand for a structural envelope failure caused by the input.
    pub(crate) fn format(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorCategory::User, kind, msg)
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// True if this error, or the error it wraps, is a format-family failure.
    pub fn is_format(&self) -> bool {
        self.effective_kind().is_some_and(ErrorKind::is_format)
    }

    /// The kind of this error, falling back to the kind of the innermost
    /// wrapped `SvpError` when a context layer carries none.
    pub fn effective_kind(&self) -> Option<ErrorKind> {
        if self.kind.is_some() {
            return self.kind;
        }
        self.source
            .as_deref()
            .and_then(|s| s.downcast_ref::<SvpError>())
            .and_then(SvpError::effective_kind)
    }

    /// Wraps the current error with a higher-level message while preserving the original as source.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }

    /// The message followed by every underlying cause, `": "`-separated.
    pub fn chain(&self) -> String {
        let mut out = self.msg.clone();
        let mut source = StdError::source(self);
        while let Some(cause) = source {
            out.push_str(": ");
            out.push_str(&cause.to_string());
            source = cause.source();
        }
        out
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SvpError>;
