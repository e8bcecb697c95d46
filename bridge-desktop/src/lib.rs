//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for native builds
//! (macOS, Windows, Linux).
//!
//! - `HttpClient` using `reqwest` with rustls
//! - `SecureStore` held in process memory
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{InMemorySecureStore, ReqwestHttpClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http_client = Arc::new(ReqwestHttpClient::new()?);
//!     let secure_store = Arc::new(InMemorySecureStore::new());
//!     // hand both to the catalog backend
//!     Ok(())
//! }
//! ```

mod http;
mod secure_store;

pub use http::ReqwestHttpClient;
pub use secure_store::InMemorySecureStore;
