//! Ledger gateway for StampLink.
//!
//! This crate provides:
//! - `LedgerTransport`, the seam between the gateway and the remote ledger
//! - An HTTP transport (`HttpTransport`) and an in-process ledger (`MemoryLedger`)
//! - `LedgerGateway`, the typed operations every other component goes through
//! - `SingleFlightCache`, which collapses identical concurrent reads
//! - History filters and reward progress views
//!
//! Core invariants:
//! - Stamp increments are one mutation per unit; a rejected unit stops the loop
//! - At most one read per logical request key is in flight at a time
//! - An invalid checkpoint configuration never reaches the ledger

#![deny(missing_docs)]

/// Single-flight read cache.
pub mod cache;
/// Response envelope decoding.
pub mod envelope;
/// Error types for ledger operations.
pub mod error;
/// History filtering API.
pub mod filter;
/// Typed ledger operations.
pub mod gateway;
/// HTTP transport.
pub mod http;
/// In-process ledger.
pub mod memory;
/// Transport and publisher traits.
pub mod traits;
/// Reward progress views.
pub mod view;

pub use cache::{Lookup, SingleFlightCache};
pub use envelope::{Envelope, Rejection};
pub use error::LedgerError;
pub use filter::{
    filter_history, AndFilter, ConfirmedFilter, EventTypeFilter, HistoryFilter, TimeRangeFilter,
};
pub use gateway::{
    GatewayOptions, IncrementOutcome, LedgerGateway, Registration, DEFAULT_CONFIG_TTL,
};
pub use http::{HttpTransport, DEFAULT_TIMEOUT};
pub use memory::{Fault, MemoryLedger};
pub use traits::{LedgerRequest, LedgerTransport, UpdatePublisher};
pub use view::{earned_rewards, progress, Progress};
