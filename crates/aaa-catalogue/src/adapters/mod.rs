//! Catalogue resolver adapters

pub mod cached;
#[cfg(feature = "http")]
pub mod http;
pub mod static_catalogue;

pub use cached::CachedCatalogue;
#[cfg(feature = "http")]
pub use http::HttpCatalogue;
pub use static_catalogue::StaticCatalogue;
