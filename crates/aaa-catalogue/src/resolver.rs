//! The catalogue lookup boundary

use aaa_core::ResourceDescriptor;
use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

/// Resolves an opaque resource identifier to its catalogue descriptor
///
/// Implementations must be cheap to share across request tasks.
#[async_trait]
pub trait CatalogueResolver: Send + Sync {
    /// Look up a catalogue item
    ///
    /// # Returns
    /// * `Ok(ResourceDescriptor)` - The item's descriptor
    /// * `Err(CatalogueError::NotFound)` - The catalogue has no such item
    /// * `Err(CatalogueError::Unavailable)` - The catalogue could not answer
    async fn resolve(&self, resource_id: &str) -> Result<ResourceDescriptor>;

    /// Get a description of this resolver (for logging)
    fn description(&self) -> &str {
        "catalogue resolver"
    }
}

#[async_trait]
impl<T: CatalogueResolver + ?Sized> CatalogueResolver for Arc<T> {
    async fn resolve(&self, resource_id: &str) -> Result<ResourceDescriptor> {
        (**self).resolve(resource_id).await
    }

    fn description(&self) -> &str {
        (**self).description()
    }
}
