//! # Tag Reading
//!
//! Turns a local byte source into catalog tag fields and classifies remote
//! files by extension.
//!
//! ## Overview
//!
//! - [`TagReader`]: the tag-parsing contract the sync pipeline consumes
//! - [`LoftyTagReader`]: `lofty`-backed reader that trusts a declared file
//!   size, so a truncated download still reports the real file's size
//! - [`classify`]: audio / video / unsupported by file extension

pub mod error;
pub mod extractor;
pub mod media;

pub use error::{MetadataError, Result};
pub use extractor::{LoftyTagReader, TagReader};
pub use media::{classify, MediaKind};
