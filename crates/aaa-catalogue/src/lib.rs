//! Catalogue Resolver
//!
//! The policy engine never owns catalogue data. It asks a resolver for the
//! descriptor of a resource item and uses only the provider, group and
//! capability fields.
//!
//! ## Adapters
//!
//! - **Static**: A fixed in-memory set of descriptors, optionally loaded from a JSON file
//! - **HTTP**: Queries a remote catalogue service (feature `http`)
//! - **Cached**: Wraps any resolver with a TTL-bounded cache
//!
//! ## Usage
//!
//! ```ignore
//! use aaa_catalogue::{CachedCatalogue, CatalogueResolver, StaticCatalogue};
//!
//! let catalogue = CachedCatalogue::new(
//!     StaticCatalogue::from_json_file("catalogue.json")?,
//!     Duration::from_secs(300),
//! );
//!
//! let item = catalogue.resolve("rs/aqm/station-28").await?;
//! println!("Owned by: {}", item.provider_id);
//! ```

pub mod adapters;
pub mod error;
pub mod resolver;

pub use adapters::{CachedCatalogue, StaticCatalogue};
#[cfg(feature = "http")]
pub use adapters::HttpCatalogue;
pub use error::{CatalogueError, Result};
pub use resolver::CatalogueResolver;
