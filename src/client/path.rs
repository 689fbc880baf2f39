//! Secret path syntax.
//!
//! # Responsibilities
//! - Validate raw paths before any client call
//! - Split off an optional `:<version>` suffix
//!
//! # Design Decisions
//! - Paths are `namespace/repository[/dir...]/secret`
//! - Only the last segment may carry a version
//! - `:latest` is the same as no version at all

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Minimum number of segments: namespace, repository and secret name.
pub const MIN_SEGMENTS: usize = 3;

/// Maximum number of segments in a secret path.
pub const MAX_SEGMENTS: usize = 16;

/// Maximum length of a single segment.
pub const MAX_SEGMENT_LEN: usize = 64;

const VERSION_SEPARATOR: char = ':';
const LATEST: &str = "latest";

/// Reasons a secret path is rejected.
///
/// The `Display` text is returned verbatim to proxy callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("secret path is empty")]
    Empty,

    #[error("secret path `{path}` must not start or end with a slash")]
    Slash { path: String },

    #[error("secret path `{path}` contains an empty segment")]
    EmptySegment { path: String },

    #[error("secret path `{path}` must contain at least a namespace, a repository and a secret name")]
    TooShallow { path: String },

    #[error("secret path `{path}` has more than {max} segments", max = MAX_SEGMENTS)]
    TooDeep { path: String },

    #[error("segment `{segment}` of secret path `{path}` is longer than {max} characters", max = MAX_SEGMENT_LEN)]
    SegmentTooLong { path: String, segment: String },

    #[error("segment `{segment}` of secret path `{path}` contains invalid characters; only letters, digits, `-`, `_` and `.` are allowed")]
    InvalidCharacters { path: String, segment: String },

    #[error("segment `{segment}` of secret path `{path}` is reserved")]
    Reserved { path: String, segment: String },

    #[error("version `{version}` in secret path `{path}` must be a positive number or `latest`")]
    InvalidVersion { path: String, version: String },

    #[error("secret path `{path}` must not contain an encoded slash")]
    EncodedSlash { path: String },

    #[error("secret path `{path}` is not valid UTF-8 once decoded")]
    InvalidEncoding { path: String },
}

/// A validated secret path with an optional version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretPath {
    path: String,
    version: Option<u64>,
}

impl SecretPath {
    /// Percent-decode a path taken from a request URI, then validate it.
    ///
    /// `%2F` is rejected rather than decoded into a segment separator.
    pub fn from_uri_path(raw: &str) -> Result<Self, PathError> {
        if raw.contains("%2F") || raw.contains("%2f") {
            return Err(PathError::EncodedSlash { path: raw.to_string() });
        }
        let decoded = urlencoding::decode(raw)
            .map_err(|_| PathError::InvalidEncoding { path: raw.to_string() })?;
        Self::parse(&decoded)
    }

    /// Validate `raw` and build a [`SecretPath`] from it.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }
        if raw.starts_with('/') || raw.ends_with('/') {
            return Err(PathError::Slash { path: raw.to_string() });
        }

        let (path, version) = match raw.rsplit_once(VERSION_SEPARATOR) {
            // A separator before the last slash belongs to a directory segment,
            // which the charset check below rejects.
            Some((path, version)) if !version.contains('/') => {
                (path, Some(parse_version(raw, version)?))
            }
            _ => (raw, None),
        };

        let segments: Vec<&str> = path.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(PathError::EmptySegment { path: raw.to_string() });
        }
        if segments.len() < MIN_SEGMENTS {
            return Err(PathError::TooShallow { path: raw.to_string() });
        }
        if segments.len() > MAX_SEGMENTS {
            return Err(PathError::TooDeep { path: raw.to_string() });
        }
        for segment in &segments {
            validate_segment(raw, segment)?;
        }

        Ok(Self {
            path: path.to_string(),
            version: version.flatten(),
        })
    }

    /// The path without its version suffix.
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// The explicit version, if one was requested.
    pub fn version(&self) -> Option<u64> {
        self.version
    }

    pub fn has_version(&self) -> bool {
        self.version.is_some()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/')
    }
}

impl fmt::Display for SecretPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version {
            Some(version) => write!(f, "{}{}{}", self.path, VERSION_SEPARATOR, version),
            None => f.write_str(&self.path),
        }
    }
}

impl FromStr for SecretPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_version(raw: &str, version: &str) -> Result<Option<u64>, PathError> {
    if version == LATEST {
        return Ok(None);
    }
    match version.parse::<u64>() {
        Ok(n) if n > 0 && version.bytes().all(|b| b.is_ascii_digit()) => Ok(Some(n)),
        _ => Err(PathError::InvalidVersion {
            path: raw.to_string(),
            version: version.to_string(),
        }),
    }
}

fn validate_segment(raw: &str, segment: &str) -> Result<(), PathError> {
    if segment.len() > MAX_SEGMENT_LEN {
        return Err(PathError::SegmentTooLong {
            path: raw.to_string(),
            segment: segment.to_string(),
        });
    }
    if !segment
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
    {
        return Err(PathError::InvalidCharacters {
            path: raw.to_string(),
            segment: segment.to_string(),
        });
    }
    if segment == "." || segment == ".." {
        return Err(PathError::Reserved {
            path: raw.to_string(),
            segment: segment.to_string(),
        });
    }
    Ok(())
}
