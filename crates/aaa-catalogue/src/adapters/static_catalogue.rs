//! Static Catalogue
//!
//! A fixed set of descriptors held in memory. Used for single-instance
//! deployments with a catalogue export file, and for tests.

use aaa_core::ResourceDescriptor;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{CatalogueError, Result};
use crate::resolver::CatalogueResolver;

/// In-memory catalogue keyed by resource id
#[derive(Debug, Clone, Default)]
pub struct StaticCatalogue {
    items: HashMap<String, ResourceDescriptor>,
}

impl StaticCatalogue {
    /// Create an empty catalogue
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item, replacing any item with the same id
    pub fn with_item(mut self, item: ResourceDescriptor) -> Self {
        self.insert(item);
        self
    }

    pub fn insert(&mut self, item: ResourceDescriptor) {
        self.items.insert(item.id.clone(), item);
    }

    pub fn from_items<I: IntoIterator<Item = ResourceDescriptor>>(items: I) -> Self {
        let mut catalogue = Self::new();
        for item in items {
            catalogue.insert(item);
        }
        catalogue
    }

    /// Parse a JSON array of descriptors
    pub fn from_json_str(json: &str) -> Result<Self> {
        let items: Vec<ResourceDescriptor> = serde_json::from_str(json)?;
        Ok(Self::from_items(items))
    }

    /// Load a JSON array of descriptors from a file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            CatalogueError::Unavailable(format!("cannot read {}: {}", path.display(), e))
        })?;
        let catalogue = Self::from_json_str(&json)?;
        info!(path = %path.display(), items = catalogue.len(), "Loaded static catalogue");
        Ok(catalogue)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl CatalogueResolver for StaticCatalogue {
    async fn resolve(&self, resource_id: &str) -> Result<ResourceDescriptor> {
        match self.items.get(resource_id) {
            Some(item) => Ok(item.clone()),
            None => {
                debug!(resource_id = %resource_id, "Item not in static catalogue");
                Err(CatalogueError::NotFound(resource_id.to_string()))
            }
        }
    }

    fn description(&self) -> &str {
        "static catalogue"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aaa_core::ResourceType;

    #[tokio::test]
    async fn test_resolve_known_and_unknown() {
        let catalogue = StaticCatalogue::new().with_item(ResourceDescriptor::new(
            "rs/item-1",
            "provider-a",
            ResourceType::Resource,
        ));

        let item = catalogue.resolve("rs/item-1").await.unwrap();
        assert_eq!(item.provider_id, "provider-a");

        assert_eq!(
            catalogue.resolve("rs/missing").await,
            Err(CatalogueError::NotFound("rs/missing".into()))
        );
    }

    #[test]
    fn test_from_json_str() {
        let catalogue = StaticCatalogue::from_json_str(
            r#"[
                {"id": "rs/aqm/station-28", "provider_id": "provider-a",
                 "resource_type": "resource", "group_id": "rs/aqm",
                 "capabilities": ["actions", "row_limit"]},
                {"id": "rs/aqm", "provider_id": "provider-a", "resource_type": "resource_group"}
            ]"#,
        )
        .unwrap();

        assert_eq!(catalogue.len(), 2);
    }

    #[test]
    fn test_from_json_str_rejects_garbage() {
        assert!(matches!(
            StaticCatalogue::from_json_str("{\"id\": 1}"),
            Err(CatalogueError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        assert!(matches!(
            StaticCatalogue::from_json_file("/nonexistent/catalogue.json"),
            Err(CatalogueError::Unavailable(_))
        ));
    }
}
