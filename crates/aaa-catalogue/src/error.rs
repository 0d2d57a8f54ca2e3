//! Error types for catalogue resolution

use aaa_core::AaaError;
use thiserror::Error;

/// Result type for catalogue operations
pub type Result<T> = std::result::Result<T, CatalogueError>;

/// Errors that can occur while resolving a catalogue item
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogueError {
    /// The catalogue has no item with this id
    #[error("Catalogue item not found: {0}")]
    NotFound(String),

    /// The catalogue could not be reached or answered with a server error
    #[error("Catalogue unavailable: {0}")]
    Unavailable(String),

    /// The catalogue answered with something that is not a descriptor
    #[error("Invalid catalogue response: {0}")]
    InvalidResponse(String),
}

impl CatalogueError {
    /// Whether retrying the lookup later could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, CatalogueError::Unavailable(_))
    }
}

impl From<serde_json::Error> for CatalogueError {
    fn from(err: serde_json::Error) -> Self {
        CatalogueError::InvalidResponse(err.to_string())
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for CatalogueError {
    fn from(err: reqwest::Error) -> Self {
        CatalogueError::Unavailable(err.to_string())
    }
}

/// An unreachable or misbehaving catalogue is a dependency outage, not a
/// statement about the resource.
impl From<CatalogueError> for AaaError {
    fn from(err: CatalogueError) -> Self {
        match err {
            CatalogueError::NotFound(id) => AaaError::NotFound(format!("resource '{}'", id)),
            CatalogueError::Unavailable(msg) => AaaError::Store(format!("catalogue: {}", msg)),
            CatalogueError::InvalidResponse(msg) => {
                AaaError::Store(format!("catalogue response: {}", msg))
            }
        }
    }
}
