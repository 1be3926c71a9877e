//! Web server module
//!
//! Provides the HTTP API for the search gateway.

mod cors;
mod handlers;
mod middleware;
mod routes;
mod state;

pub use cors::{CorsPolicy, OriginMatcher};
pub use handlers::{HelloResponse, ServiceInfo};
pub use middleware::REQUEST_ID_HEADER;
pub use routes::create_router;
pub use state::AppState;
