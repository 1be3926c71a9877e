//! Search gateway module
//!
//! Turns a search request into one filtered, limited read against the
//! external table and maps the outcome into a stable envelope.

mod error;
mod executor;
mod models;

pub use error::{ErrorResponse, GatewayError};
pub use executor::{GatewayOptions, ResolvedSearch, SearchGateway};
pub use models::*;
