//! Core types and pure logic for the wabridge addon client.
//!
//! This crate carries everything that does not touch the network:
//! recipient address normalization, whitelist evaluation, statistics
//! tracking, configuration, and the error taxonomy shared across the
//! workspace.

pub mod config;
pub mod error;
pub mod event;
pub mod jid;
pub mod stats;
pub mod whitelist;

pub use config::ClientConfig;
pub use error::{BridgeError, Result};
pub use event::InboundEvent;
pub use stats::{DispatchOutcome, RemoteStats, Stats, StatsTracker};
