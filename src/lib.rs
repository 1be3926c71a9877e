//! medline-search: a search gateway over the MedlinePlus health topics table
//!
//! Forwards title-substring searches to a hosted PostgREST table and returns
//! matching rows in a stable JSON envelope.

pub mod config;
pub mod gateway;
pub mod source;
pub mod web;

pub use config::Settings;
pub use gateway::{GatewayError, SearchGateway, SearchRequest, SearchResponse};
pub use source::{MemorySource, PostgrestSource, TableSource};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
