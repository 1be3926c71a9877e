//! Application state shared across handlers

use crate::config::Settings;
use crate::gateway::{GatewayOptions, SearchGateway};
use crate::source::TableSource;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Global settings
    pub settings: Arc<Settings>,
    /// Search gateway
    pub gateway: Arc<SearchGateway>,
}

impl AppState {
    /// Create new application state around an injected data source
    pub fn new(settings: Settings, source: Arc<dyn TableSource>) -> Self {
        let gateway = SearchGateway::new(source, GatewayOptions::from_settings(&settings));

        Self {
            settings: Arc::new(settings),
            gateway: Arc::new(gateway),
        }
    }

    /// Name reported by the root endpoint
    pub fn service_name(&self) -> &str {
        &self.settings.general.service_name
    }
}
