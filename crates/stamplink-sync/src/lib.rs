//! Stamp synchronization for StampLink devices.
//!
//! This crate provides:
//! - `ScanPayload` and `IdentityResolver` for the admin's scanner
//! - `StampDesk`, which commits stamps and notifies the member's device
//! - `ReconciliationEngine`, which owns the member device's view
//! - `SyncBus` for same-device update signals
//! - `SyncConfig`, the TOML settings shared by both roles
//! - `SyncError`, the failure taxonomy surfaced to both roles
//!
//! Core invariants:
//! - The ledger is the only writer of record; peer messages are advisory
//! - A forced refresh always follows the notification that armed it and
//!   overwrites the optimistic view with the ledger's record
//! - Peer failures after a successful commit are logged, never returned

#![deny(missing_docs)]

/// Same-device update bus.
pub mod bus;
/// Settings file.
pub mod config;
/// Admin stamp flow.
pub mod desk;
/// Member-side reconciliation.
pub mod engine;
/// Failure taxonomy.
pub mod error;
/// Scanned code parsing.
pub mod payload;
/// Identity resolution.
pub mod resolver;

pub use bus::{SyncBus, SyncSignal, DEFAULT_BUS_CAPACITY};
pub use config::SyncConfig;
pub use desk::{AuditEntry, StampDesk, StampReceipt};
pub use engine::{EngineHandle, EngineOptions, ReconciliationEngine, SyncPhase};
pub use error::SyncError;
pub use payload::{CodePayload, ScanPayload};
pub use resolver::{IdentityResolver, Resolution, ResolutionSource};
