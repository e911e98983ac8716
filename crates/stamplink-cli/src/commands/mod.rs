//! Subcommand implementations.

pub mod add;
pub mod checkpoints;
pub mod code;
pub mod history;
pub mod host;
pub mod init;
pub mod list;
pub mod member;
pub mod resolve;
pub mod session;
