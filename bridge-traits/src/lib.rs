//! # Host Bridge Traits
//!
//! Capability contracts between the catalog core and the host it runs in.
//!
//! ## Overview
//!
//! The core never talks to the network, the keychain or the host's logging
//! pipeline directly. Each of those is a trait defined here and implemented
//! by a host crate (`bridge-desktop` for native builds) or by a provider crate
//! (`provider-seafile` implements [`RemoteLibraryApi`]).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP with every status surfaced to the caller
//! - [`RemoteLibraryApi`](storage::RemoteLibraryApi) - Library listing, directory listing,
//!   download-link issuance and ranged fetches against a remote file store
//!
//! ### Security
//! - [`SecureStore`](storage::SecureStore) - Credential persistence (API tokens)
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for record timestamps
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! must map remote throttling to `RateLimited`, missing resources to `NotFound`
//! and rejected credentials to `Unauthorized`; the layers above rely on that
//! classification to decide between retry, skip and abort.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so adapters can be shared behind
//! `Arc` across async tasks.

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{ByteRange, HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use storage::{EntryKind, RemoteEntry, RemoteLibrary, RemoteLibraryApi, SecureStore};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
