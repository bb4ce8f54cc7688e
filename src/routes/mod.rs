//! Router assembly: common, docs and collection routes plus the response-header, body-limit and trace layers.

pub mod collection;
pub mod common;
pub mod docs;

pub use collection::collection_routes;
pub use common::common_routes;
pub use docs::docs_routes;

use crate::config::{CorsConfig, ServerConfig};
use crate::error::ConfigError;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

fn header_value(key: &'static str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value).map_err(|e| ConfigError::Invalid {
        key,
        message: e.to_string(),
    })
}

/// Origin, methods, headers and credentials values, in that order.
fn cors_headers(cors: &CorsConfig) -> Result<[HeaderValue; 4], ConfigError> {
    Ok([
        header_value("REQUEST_HEADER_ACCESS_CONTROL_ALLOW_ORIGIN", &cors.allow_origin)?,
        header_value("REQUEST_HEADER_ACCESS_CONTROL_ALLOW_METHODS", &cors.allow_methods)?,
        header_value("REQUEST_HEADER_ACCESS_CONTROL_ALLOW_HEADERS", &cors.allow_headers)?,
        header_value("REQUEST_HEADER_ACCESS_CONTROL_ALLOW_CREDENTIALS", &cors.allow_credentials)?,
    ])
}

/// Complete application router. Fixed routes take precedence over the `/:collection` routes.
pub fn app_router(state: AppState, config: &ServerConfig) -> Result<Router, ConfigError> {
    let [origin, methods, headers, credentials] = cors_headers(&config.cors)?;
    Ok(Router::new()
        .merge(common_routes())
        .merge(docs_routes())
        .merge(collection_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(SetResponseHeaderLayer::overriding(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin))
        .layer(SetResponseHeaderLayer::overriding(header::ACCESS_CONTROL_ALLOW_METHODS, methods))
        .layer(SetResponseHeaderLayer::overriding(header::ACCESS_CONTROL_ALLOW_HEADERS, headers))
        .layer(SetResponseHeaderLayer::overriding(header::ACCESS_CONTROL_ALLOW_CREDENTIALS, credentials))
        .layer(TraceLayer::new_for_http()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cors_headers_are_valid() {
        let headers = cors_headers(&CorsConfig::default()).unwrap();
        assert_eq!(headers.len(), 4);
        assert_eq!(headers[0], "*");
        assert_eq!(headers[1], "GET, POST, OPTIONS, PUT, PATCH, DELETE");
    }

    #[test]
    fn unrepresentable_header_value_is_a_config_error() {
        let cors = CorsConfig {
            allow_origin: "bad\nvalue".into(),
            ..CorsConfig::default()
        };
        assert!(matches!(
            cors_headers(&cors),
            Err(ConfigError::Invalid {
                key: "REQUEST_HEADER_ACCESS_CONTROL_ALLOW_ORIGIN",
                ..
            })
        ));
    }
}
