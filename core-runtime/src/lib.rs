//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the catalog crates:
//! - Catalog configuration with fail-fast validation
//! - Logging and tracing setup
//! - Progress event bus
//!
//! ## Overview
//!
//! Nothing in this crate talks to the network or the catalog store. It holds
//! the settings a catalog run needs, the conventions every crate logs with,
//! and the channel through which runs report what they changed.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CatalogConfig, GatherTypes, RateLimitConfig};
pub use error::{Error, Result};
pub use events::{CatalogEvent, EventBus, EventStream, RunKind, RunTotals};
