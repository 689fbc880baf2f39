//! Protocol revisions of the HTTP surface.
//!
//! | Revision | Mount prefix           | Verbs             |
//! |----------|------------------------|-------------------|
//! | legacy   | `/v1/secrets/`         | GET, POST         |
//! | current  | `/v1beta/secrets/raw/` | GET, POST, DELETE |
//!
//! The verb list drives both dispatch and the `Allow` header, so the two
//! cannot drift apart.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::http::handler::Verb;

const LEGACY_VERBS: &[Verb] = &[Verb::Get, Verb::Post];
const CURRENT_VERBS: &[Verb] = &[Verb::Get, Verb::Post, Verb::Delete];

/// One consistent generation of the proxy's HTTP API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Revision {
    Legacy,
    #[default]
    Current,
}

impl Revision {
    /// Prefix stripped from request paths before they reach the handler.
    pub const fn mount_prefix(self) -> &'static str {
        match self {
            Revision::Legacy => "/v1/secrets/",
            Revision::Current => "/v1beta/secrets/raw/",
        }
    }

    /// Verbs served under the mount prefix, in `Allow` header order.
    pub const fn verbs(self) -> &'static [Verb] {
        match self {
            Revision::Legacy => LEGACY_VERBS,
            Revision::Current => CURRENT_VERBS,
        }
    }

    /// Value of the `Allow` header for this revision.
    pub fn allow_header(self) -> String {
        self.verbs()
            .iter()
            .map(|verb| verb.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revision::Legacy => f.write_str("legacy"),
            Revision::Current => f.write_str("current"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_headers() {
        assert_eq!(Revision::Legacy.allow_header(), "GET, POST");
        assert_eq!(Revision::Current.allow_header(), "GET, POST, DELETE");
    }

    #[test]
    fn test_mount_prefixes_end_with_slash() {
        for revision in [Revision::Legacy, Revision::Current] {
            assert!(revision.mount_prefix().starts_with('/'));
            assert!(revision.mount_prefix().ends_with('/'));
        }
    }
}
