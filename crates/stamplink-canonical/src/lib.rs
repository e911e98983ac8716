//! Canonical primitives shared by every StampLink crate.
//!
//! Identifiers that cross a device or network boundary (member ids scanned
//! from a code, peer session ids, ledger request keys) are validated here so
//! the rest of the workspace never handles an unchecked string.
//!
#![deny(missing_docs)]

/// Canonical request keys for de-duplicating ledger reads.
pub mod canonicalizer;
/// Member and peer session identifiers.
pub mod identifiers;
/// Phone number normalization for login and registration.
pub mod phone;
/// Validation helpers used by canonical types.
pub mod validation;

pub use canonicalizer::{CanonicalizationError, RequestKey};
pub use identifiers::{MemberId, PeerSessionId};
pub use validation::ValidationError;
