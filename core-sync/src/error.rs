use core_library::LibraryError;
use core_metadata::MetadataError;
use provider_seafile::SeafileError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Library \"{name}\" not found on the server")]
    LibraryNotFound { name: String },

    #[error("Malformed virtual path \"{path}\": {reason}")]
    MalformedVirtualPath { path: String, reason: String },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Remote error: {0}")]
    Remote(SeafileError),

    #[error("Catalog store error: {0}")]
    Store(#[from] LibraryError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sync cancelled")]
    Cancelled,
}

impl SyncError {
    /// Whether the error ends the whole run instead of a single file or record.
    pub fn is_fatal(&self) -> bool {
        match self {
            SyncError::Config(_)
            | SyncError::LibraryNotFound { .. }
            | SyncError::Authentication(_)
            | SyncError::Cancelled => true,
            SyncError::Store(e) => !matches!(e, LibraryError::InvalidInput { .. }),
            SyncError::Remote(e) => matches!(e, SeafileError::RateLimitExhausted { .. }),
            SyncError::MalformedVirtualPath { .. }
            | SyncError::Metadata(_)
            | SyncError::Io(_) => false,
        }
    }

    /// Whether the failure happened on the local side (temporary files,
    /// the tag parser's worker) rather than on the remote file.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            SyncError::Io(_)
                | SyncError::Metadata(MetadataError::Io(_))
                | SyncError::Metadata(MetadataError::TaskFailed(_))
        )
    }

    /// Whether the remote confirmed the target does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::Remote(e) if e.is_not_found())
    }
}

impl From<SeafileError> for SyncError {
    fn from(error: SeafileError) -> Self {
        if error.is_cancelled() {
            SyncError::Cancelled
        } else if error.is_unauthorized() {
            SyncError::Authentication(error.to_string())
        } else {
            SyncError::Remote(error)
        }
    }
}

impl From<core_runtime::Error> for SyncError {
    fn from(error: core_runtime::Error) -> Self {
        SyncError::Config(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
