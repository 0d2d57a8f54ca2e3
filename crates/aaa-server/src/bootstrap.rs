//! Process start: turn a `ServerConfig` into shared application state
//!
//! Every failure here is `FatalConfig`; the server does not start without
//! its key, store and catalogue.

use aaa_catalogue::{CatalogueResolver, StaticCatalogue};
use aaa_core::{AaaError, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::handlers::AppState;
use crate::config::{CatalogueSource, ServerConfig};
use crate::core::TokenSettings;
use crate::keys::KeyMaterial;
use crate::storage::{MemoryStore, PolicyStore};

/// Load the key, connect the store and catalogue, and wire the services
pub async fn build_state(config: &ServerConfig) -> Result<Arc<AppState>> {
    let settings = TokenSettings::new(&config.issuer_domain, config.token_lifetime)?;
    let keys = Arc::new(KeyMaterial::load(
        &config.keystore_path,
        &config.keystore_password,
    )?);
    let store = connect_store(config).await?;
    let catalogue = connect_catalogue(config)?;

    info!(
        issuer = %config.issuer_domain,
        kid = %keys.kid(),
        catalogue = catalogue.description(),
        "Control plane state ready"
    );

    Ok(Arc::new(AppState::new(store, catalogue, keys, settings)))
}

async fn connect_store(config: &ServerConfig) -> Result<Arc<dyn PolicyStore>> {
    match &config.database_url {
        None => {
            warn!("AAA_DATABASE_URL not set; policies are kept in memory and lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "postgres")]
        Some(url) => {
            let store = crate::storage::PostgresStore::new(url, config.pool_size)
                .await
                .map_err(|e| AaaError::FatalConfig(format!("policy store: {}", e)))?;
            info!(pool_size = config.pool_size, "Using PostgreSQL policy store");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "postgres"))]
        Some(_) => Err(AaaError::FatalConfig(
            "AAA_DATABASE_URL is set but the server was built without the 'postgres' feature"
                .into(),
        )),
    }
}

fn connect_catalogue(config: &ServerConfig) -> Result<Arc<dyn CatalogueResolver>> {
    match &config.catalogue {
        CatalogueSource::File(path) => {
            let catalogue = StaticCatalogue::from_json_file(path)
                .map_err(|e| AaaError::FatalConfig(format!("catalogue: {}", e)))?;
            Ok(Arc::new(catalogue))
        }
        #[cfg(feature = "http-catalogue")]
        CatalogueSource::Url(url) => {
            let client = aaa_catalogue::HttpCatalogue::new(url.as_str())
                .map_err(|e| AaaError::FatalConfig(format!("catalogue: {}", e)))?;
            info!(
                url = %url,
                ttl_secs = config.catalogue_cache_ttl.as_secs(),
                "Using remote catalogue"
            );
            Ok(Arc::new(aaa_catalogue::CachedCatalogue::new(
                client,
                config.catalogue_cache_ttl,
            )))
        }
        #[cfg(not(feature = "http-catalogue"))]
        CatalogueSource::Url(_) => Err(AaaError::FatalConfig(
            "AAA_CATALOGUE_URL is set but the server was built without the 'http-catalogue' feature"
                .into(),
        )),
    }
}
