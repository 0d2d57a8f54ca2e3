//! Shared fixtures for server integration tests

#![allow(dead_code)]

use aaa_catalogue::{CatalogueError, CatalogueResolver, StaticCatalogue};
use aaa_core::{ResourceDescriptor, ResourceType};
use aaa_server::{AppState, KeyMaterial, MemoryStore, PolicyEngine, TokenSettings};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const ISSUER: &str = "auth.example.org";
pub const PROVIDER: &str = "provider-a";
pub const OTHER_PROVIDER: &str = "provider-b";
pub const CONSUMER: &str = "consumer-c";

pub const ITEM: &str = "rs/aqm/station-28";
pub const SIBLING: &str = "rs/aqm/station-29";
pub const GROUP: &str = "rs/aqm";
pub const LOOSE_ITEM: &str = "rs/flood/sensor-1";
pub const FOREIGN_ITEM: &str = "rs/traffic/cam-1";

/// Provider A owns a group with two items, a loose item, and a provider
/// entry; provider B owns one item
pub fn catalogue() -> StaticCatalogue {
    StaticCatalogue::new()
        .with_item(ResourceDescriptor::new(PROVIDER, PROVIDER, ResourceType::Provider))
        .with_item(ResourceDescriptor::new(GROUP, PROVIDER, ResourceType::ResourceGroup))
        .with_item(
            ResourceDescriptor::new(ITEM, PROVIDER, ResourceType::Resource)
                .with_endpoint("rs.example.org")
                .in_group(GROUP)
                .with_capabilities(["actions", "row_limit", "time_window"]),
        )
        .with_item(ResourceDescriptor::new(SIBLING, PROVIDER, ResourceType::Resource).in_group(GROUP))
        .with_item(ResourceDescriptor::new(LOOSE_ITEM, PROVIDER, ResourceType::Resource))
        .with_item(ResourceDescriptor::new(FOREIGN_ITEM, OTHER_PROVIDER, ResourceType::Resource))
}

/// Static catalogue that can be switched into an outage
pub struct FlakyCatalogue {
    inner: StaticCatalogue,
    down: AtomicBool,
}

impl FlakyCatalogue {
    pub fn new(inner: StaticCatalogue) -> Self {
        Self {
            inner,
            down: AtomicBool::new(false),
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl CatalogueResolver for FlakyCatalogue {
    async fn resolve(&self, resource_id: &str) -> Result<ResourceDescriptor, CatalogueError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(CatalogueError::Unavailable("connection refused".into()));
        }
        self.inner.resolve(resource_id).await
    }
}

pub fn engine() -> PolicyEngine {
    PolicyEngine::new(Arc::new(MemoryStore::new()), Arc::new(catalogue()))
}

pub fn state() -> AppState {
    state_with_lifetime(std::time::Duration::from_secs(300))
}

pub fn state_with_lifetime(lifetime: std::time::Duration) -> AppState {
    AppState::new(
        Arc::new(MemoryStore::new()),
        Arc::new(catalogue()),
        Arc::new(KeyMaterial::generate("aaa-test-1")),
        TokenSettings::new(ISSUER, lifetime).expect("valid settings"),
    )
}
