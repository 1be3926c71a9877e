//! Cross-origin policy built from settings

use crate::config::{CorsSettings, SettingsError};
use axum::http::{header, HeaderName, HeaderValue, Method};
use regex::Regex;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

/// Matches request origins against exact entries and `*` patterns
#[derive(Debug, Clone)]
pub struct OriginMatcher {
    exact: Vec<String>,
    patterns: Vec<Regex>,
}

impl OriginMatcher {
    pub fn new(origins: &[String]) -> Result<Self, SettingsError> {
        let mut exact = Vec::new();
        let mut patterns = Vec::new();

        for origin in origins {
            if origin.contains('*') {
                let body = origin
                    .split('*')
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join("[A-Za-z0-9-]+");
                let regex = Regex::new(&format!("^{}$", body))
                    .map_err(|e| SettingsError::InvalidCors(e.to_string()))?;
                patterns.push(regex);
            } else {
                exact.push(origin.trim_end_matches('/').to_string());
            }
        }

        Ok(Self { exact, patterns })
    }

    pub fn matches(&self, origin: &str) -> bool {
        self.exact.iter().any(|o| o == origin) || self.patterns.iter().any(|p| p.is_match(origin))
    }
}

/// CORS layers for the router
pub struct CorsPolicy {
    pub layer: CorsLayer,
    pub methods: SetResponseHeaderLayer<HeaderValue>,
    pub headers: SetResponseHeaderLayer<HeaderValue>,
}

impl CorsPolicy {
    pub fn from_settings(settings: &CorsSettings) -> Result<Self, SettingsError> {
        // tower-http panics on a wildcard origin with credentials
        settings.validate()?;

        let methods = settings
            .allowed_methods
            .iter()
            .map(|m| {
                Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                    .map_err(|_| SettingsError::InvalidCors(format!("invalid method '{}'", m)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let headers = settings
            .allowed_headers
            .iter()
            .map(|h| {
                HeaderName::from_bytes(h.to_ascii_lowercase().as_bytes())
                    .map_err(|_| SettingsError::InvalidCors(format!("invalid header '{}'", h)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let allow_origin = if settings.is_wildcard() {
            AllowOrigin::any()
        } else {
            let matcher = OriginMatcher::new(&settings.allowed_origins)?;
            AllowOrigin::predicate(move |origin: &HeaderValue, _| {
                origin.to_str().map(|o| matcher.matches(o)).unwrap_or(false)
            })
        };

        let layer = CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(methods.clone())
            .allow_headers(headers.clone())
            .allow_credentials(settings.allow_credentials)
            .max_age(Duration::from_secs(settings.max_age_secs));

        // Non-preflight responses advertise the policy too
        let methods_value = join_header(methods.iter().map(Method::as_str))?;
        let headers_value = join_header(headers.iter().map(HeaderName::as_str))?;

        Ok(Self {
            layer,
            methods: SetResponseHeaderLayer::if_not_present(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                methods_value,
            ),
            headers: SetResponseHeaderLayer::if_not_present(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                headers_value,
            ),
        })
    }
}

fn join_header<'a>(values: impl Iterator<Item = &'a str>) -> Result<HeaderValue, SettingsError> {
    let joined = values.collect::<Vec<_>>().join(", ");
    HeaderValue::from_str(&joined).map_err(|e| SettingsError::InvalidCors(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_matcher() {
        let matcher = OriginMatcher::new(&[
            "http://localhost:3000".to_string(),
            "https://plainmed-*.vercel.app".to_string(),
        ])
        .unwrap();

        assert!(matcher.matches("http://localhost:3000"));
        assert!(matcher.matches("https://plainmed-git-main.vercel.app"));
        assert!(!matcher.matches("https://plainmed-.vercel.app"));
        assert!(!matcher.matches("https://evil.example/plainmed-x.vercel.app"));
        assert!(!matcher.matches("https://plainmed-x.vercel.app.evil.example"));
        assert!(!matcher.matches("http://localhost:5173"));
    }

    #[test]
    fn test_policy_from_defaults() {
        assert!(CorsPolicy::from_settings(&CorsSettings::default()).is_ok());
    }

    #[test]
    fn test_invalid_method_rejected() {
        let settings = CorsSettings {
            allowed_methods: vec!["GE T".to_string()],
            ..CorsSettings::default()
        };
        assert!(CorsPolicy::from_settings(&settings).is_err());
    }

    #[test]
    fn test_wildcard_with_credentials_is_an_error() {
        let settings = CorsSettings {
            allowed_origins: vec!["*".to_string()],
            allow_credentials: true,
            ..CorsSettings::default()
        };
        assert!(matches!(
            CorsPolicy::from_settings(&settings),
            Err(SettingsError::InvalidCors(_))
        ));
    }
}
