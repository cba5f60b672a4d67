//! Binary envelope layout
//!
//! ```text
//! SVP1: magic(4) | salt(16) | nonce(12) | ciphertext+tag
//! SVP2: magic(4) | salt(16) | nonce(12) | name_len(1) | name | ciphertext+tag
//! ```
//!
//! Decoding is a purely structural parse. It never touches key material,
//! so format errors are always reported ahead of authentication errors.

use crate::cipher::{NONCE_LEN, TAG_LEN};
use crate::error::{ErrorCategory, ErrorKind, Result, SvpError};
use crate::kdf::SALT_LEN;

/// Prefix shared by every envelope version.
const MAGIC_PREFIX: &[u8; 3] = b"SVP";

/// Text/blob envelope without metadata.
pub const MAGIC_V1: &[u8; 4] = b"SVP1";

/// File envelope carrying the original file name.
pub const MAGIC_V2: &[u8; 4] = b"SVP2";

const MAGIC_LEN: usize = 4;

/// magic + salt + nonce
pub const FIXED_HEADER_LEN: usize = MAGIC_LEN + SALT_LEN + NONCE_LEN;

/// Largest file name the one-byte length field can describe.
pub const MAX_METADATA_LEN: usize = u8::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V1,
    V2,
}

impl Version {
    fn magic(self) -> &'static [u8; 4] {
        match self {
            Version::V1 => MAGIC_V1,
            Version::V2 => MAGIC_V2,
        }
    }
}

/// A decoded envelope borrowing its ciphertext from the input buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    pub file_name: Option<String>,
    /// Everything the AEAD must authenticate as associated data. Empty for
    /// V1 envelopes; the full header for V2.
    pub header: &'a [u8],
    pub ciphertext: &'a [u8],
}

impl Envelope<'_> {
    pub fn version(&self) -> Version {
        if self.file_name.is_some() {
            Version::V2
        } else {
            Version::V1
        }
    }
}

/// Build the header (everything before the ciphertext) for the given fields.
///
/// The version follows from whether a file name is present.
pub fn encode_header(
    salt: &[u8; SALT_LEN],
    nonce: &[u8; NONCE_LEN],
    file_name: Option<&str>,
) -> Result<Vec<u8>> {
    let version = if file_name.is_some() {
        Version::V2
    } else {
        Version::V1
    };

    let name = file_name.map(str::as_bytes).unwrap_or_default();
    if name.len() > MAX_METADATA_LEN {
        return Err(SvpError::format(
            ErrorKind::MetadataOutOfRange,
            format!(
                "file name is {} bytes; at most {} bytes can be stored",
                name.len(),
                MAX_METADATA_LEN
            ),
        ));
    }

    let mut header = Vec::with_capacity(FIXED_HEADER_LEN + 1 + name.len());
    header.extend_from_slice(version.magic());
    header.extend_from_slice(salt);
    header.extend_from_slice(nonce);
    if version == Version::V2 {
        header.push(name.len() as u8);
        header.extend_from_slice(name);
    }
    Ok(header)
}

/// Concatenate header and ciphertext into one envelope.
pub fn encode(
    salt: &[u8; SALT_LEN],
    nonce: &[u8; NONCE_LEN],
    file_name: Option<&str>,
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    let mut out = encode_header(salt, nonce, file_name)?;
    out.extend_from_slice(ciphertext);
    Ok(out)
}

/// Parse an envelope without attempting decryption.
pub fn decode(data: &[u8]) -> Result<Envelope<'_>> {
    let version = read_version(data)?;

    if data.len() < FIXED_HEADER_LEN {
        return Err(SvpError::format(
            ErrorKind::Truncated,
            "input likely truncated while reading salt and nonce",
        ));
    }

    let mut pos = MAGIC_LEN;
    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&data[pos..pos + SALT_LEN]);
    pos += SALT_LEN;

    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&data[pos..pos + NONCE_LEN]);
    pos += NONCE_LEN;

    let file_name = match version {
        Version::V1 => None,
        Version::V2 => {
            let Some(&name_len) = data.get(pos) else {
                return Err(SvpError::format(
                    ErrorKind::Truncated,
                    "input likely truncated while reading file name length",
                ));
            };
            pos += 1;
            let name_len = usize::from(name_len);
            let Some(name) = data.get(pos..pos + name_len) else {
                return Err(SvpError::format(
                    ErrorKind::MetadataOutOfRange,
                    "file name length points past the end of the input",
                ));
            };
            pos += name_len;
            let name = std::str::from_utf8(name).map_err(|e| {
                SvpError::with_kind_and_source(
                    ErrorCategory::User,
                    ErrorKind::BinaryFormat,
                    "embedded file name is not valid UTF-8",
                    e,
                )
            })?;
            Some(name.to_owned())
        }
    };

    let ciphertext = &data[pos..];
    if ciphertext.len() < TAG_LEN {
        return Err(SvpError::format(
            ErrorKind::Truncated,
            "input likely truncated while reading ciphertext",
        ));
    }

    let header = match version {
        Version::V1 => &data[..0],
        Version::V2 => &data[..pos],
    };

    Ok(Envelope {
        salt,
        nonce,
        file_name,
        header,
        ciphertext,
    })
}

/// Check the magic tag and report the version, without parsing further.
pub fn read_version(data: &[u8]) -> Result<Version> {
    let Some(magic) = data.get(..MAGIC_LEN) else {
        return Err(SvpError::format(
            ErrorKind::NotAnEnvelope,
            "input size smaller than magic marker; likely truncated",
        ));
    };

    if magic == MAGIC_V1 {
        Ok(Version::V1)
    } else if magic == MAGIC_V2 {
        Ok(Version::V2)
    } else if magic.starts_with(MAGIC_PREFIX) {
        Err(SvpError::format(
            ErrorKind::UnsupportedVersion,
            "input claims to be an svpbox envelope, but not a version we support",
        ))
    } else {
        Err(SvpError::format(
            ErrorKind::NotAnEnvelope,
            "input unrecognized as svpbox data",
        ))
    }
}
