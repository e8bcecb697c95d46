//! # Seafile Provider
//!
//! Remote library access for Seafile servers.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`SeafileConnector`]: the `api2` endpoints (token exchange, library and
//!   directory listing, download links, ranged fetches) as a
//!   [`RemoteLibraryApi`](bridge_traits::storage::RemoteLibraryApi)
//! - [`RateLimitedGateway`]: wraps any remote call and waits out throttling
//!   using the delay the server advertises, within configured bounds
//! - Wire types for the JSON bodies the server returns

pub mod connector;
pub mod error;
pub mod gateway;
pub mod types;

pub use connector::SeafileConnector;
pub use error::{Result, SeafileError};
pub use gateway::{parse_advisory_wait, RateLimitedGateway};
