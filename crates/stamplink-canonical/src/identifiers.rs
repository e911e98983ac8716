use crate::validation::ValidationError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefixes carried by identifiers printed on physical cards or issued at
/// registration. A raw scan that is not structured JSON is only accepted as a
/// bare id when it starts with one of these.
pub const BARE_ID_PREFIXES: [&str; 2] = ["user-", "mem-"];

macro_rules! newtype {
    ($name:ident, $doc:expr, $pattern:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new instance without validation; callers are responsible for conformity.
            pub fn new(value: String) -> Self {
                Self(value)
            }

            /// Parses a validated identifier from a string. Surrounding whitespace is trimmed.
            pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
                let s = value.into().trim().to_string();
                if s.is_empty() {
                    return Err(ValidationError::Empty {
                        field: stringify!($name),
                    });
                }
                if !Regex::new($pattern).expect("invalid regex").is_match(&s) {
                    return Err(ValidationError::PatternMismatch {
                        field: stringify!($name),
                        value: s,
                    });
                }
                Ok(Self(s))
            }

            /// Borrows the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

newtype!(
    MemberId,
    "Opaque, stable member identifier assigned by the ledger (e.g. `user-1717171717`).",
    r"^[A-Za-z0-9][A-Za-z0-9_-]{0,127}$"
);
newtype!(
    PeerSessionId,
    "Ephemeral peer session id, valid only while the owning device is listening.",
    r"^[A-Za-z0-9._:\[\]-]{1,128}$"
);

impl MemberId {
    /// Returns true if `raw` is a bare identifier with a known prefix.
    pub fn looks_like_bare_id(raw: &str) -> bool {
        let raw = raw.trim();
        BARE_ID_PREFIXES
            .iter()
            .any(|prefix| raw.len() > prefix.len() && raw.starts_with(prefix))
    }
}
