//! Runtime settings read from the environment (`.env` is loaded by the server binary).

use crate::error::ConfigError;
use crate::store::StoreKind;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// Full connection URI; overrides host, port and credentials.
    pub connection_string: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    /// PostgreSQL schema whose tables are exposed.
    pub schema: String,
    pub max_connections: u32,
    pub sample_schema: bool,
}

impl StoreConfig {
    /// Database name for display, falling back to the last path segment of the URI.
    pub fn database_label(&self) -> String {
        if let Some(db) = &self.database {
            return db.clone();
        }
        self.connection_string
            .as_deref()
            .and_then(|uri| uri.split('?').next())
            .and_then(|uri| uri.rsplit_once('/'))
            .map(|(head, db)| if head.ends_with('/') { "" } else { db })
            .filter(|db| !db.is_empty())
            .unwrap_or("default")
            .to_string()
    }
}

/// Header values set verbatim on every response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorsConfig {
    pub allow_origin: String,
    pub allow_methods: String,
    pub allow_headers: String,
    pub allow_credentials: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        CorsConfig {
            allow_origin: "*".into(),
            allow_methods: "GET, POST, OPTIONS, PUT, PATCH, DELETE".into(),
            allow_headers: "X-Requested-With,content-type".into(),
            allow_credentials: "true".into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocsConfig {
    pub custom_css: String,
    pub custom_css_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub max_body_bytes: usize,
    pub store: StoreConfig,
    pub cors: CorsConfig,
    pub docs: DocsConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset and empty values are treated alike.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let connection_string = get("CONNECTION_STRING");
        let kind = match get("STORE_KIND") {
            Some(k) => parse_store_kind(&k)?,
            None => match &connection_string {
                Some(uri) => kind_from_uri(uri)?,
                None => return Err(ConfigError::Missing("CONNECTION_STRING or STORE_KIND")),
            },
        };
        let database = get("DATABASE_NAME");
        if kind == StoreKind::MongoDb && database.is_none() {
            return Err(ConfigError::Missing("DATABASE_NAME"));
        }

        let store = StoreConfig {
            kind,
            connection_string,
            host: get("DATABASE_HOST").unwrap_or_else(|| "localhost".into()),
            port: get("DATABASE_PORT").map(|v| parse_num("DATABASE_PORT", &v)).transpose()?,
            user: get("DATABASE_USER"),
            password: get("DATABASE_PASSWORD"),
            database,
            schema: get("DATABASE_SCHEMA").unwrap_or_else(|| "public".into()),
            max_connections: get("DATABASE_MAX_CONNECTIONS")
                .map(|v| parse_num("DATABASE_MAX_CONNECTIONS", &v))
                .transpose()?
                .unwrap_or(5),
            sample_schema: get("DOCUMENT_SAMPLE_SCHEMA")
                .map(|v| parse_bool("DOCUMENT_SAMPLE_SCHEMA", &v))
                .transpose()?
                .unwrap_or(false),
        };

        let defaults = CorsConfig::default();
        let cors = CorsConfig {
            allow_origin: get("REQUEST_HEADER_ACCESS_CONTROL_ALLOW_ORIGIN").unwrap_or(defaults.allow_origin),
            allow_methods: get("REQUEST_HEADER_ACCESS_CONTROL_ALLOW_METHODS").unwrap_or(defaults.allow_methods),
            allow_headers: get("REQUEST_HEADER_ACCESS_CONTROL_ALLOW_HEADERS").unwrap_or(defaults.allow_headers),
            allow_credentials: get("REQUEST_HEADER_ACCESS_CONTROL_ALLOW_CREDENTIALS")
                .unwrap_or(defaults.allow_credentials),
        };

        Ok(ServerConfig {
            bind_address: get("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0".into()),
            port: get("PORT").map(|v| parse_num("PORT", &v)).transpose()?.unwrap_or(DEFAULT_PORT),
            max_body_bytes: get("MAX_BODY_BYTES")
                .map(|v| parse_num("MAX_BODY_BYTES", &v))
                .transpose()?
                .unwrap_or(DEFAULT_MAX_BODY_BYTES),
            store,
            cors,
            docs: DocsConfig {
                custom_css: get("CUSTOM_CSS").unwrap_or_default(),
                custom_css_url: get("CUSTOM_CSS_URL").unwrap_or_default(),
            },
        })
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

fn parse_store_kind(value: &str) -> Result<StoreKind, ConfigError> {
    match value.to_lowercase().as_str() {
        "mongodb" | "mongo" => Ok(StoreKind::MongoDb),
        "postgres" | "postgresql" => Ok(StoreKind::Postgres),
        other => Err(ConfigError::Invalid {
            key: "STORE_KIND",
            message: format!("unknown store kind '{}'", other),
        }),
    }
}

fn kind_from_uri(uri: &str) -> Result<StoreKind, ConfigError> {
    let scheme = uri.split_once("://").map(|(s, _)| s.to_lowercase()).unwrap_or_default();
    match scheme.as_str() {
        "mongodb" | "mongodb+srv" => Ok(StoreKind::MongoDb),
        "postgres" | "postgresql" => Ok(StoreKind::Postgres),
        _ => Err(ConfigError::Invalid {
            key: "CONNECTION_STRING",
            message: format!("unsupported scheme '{}'", scheme),
        }),
    }
}

fn parse_num<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        message: format!("'{}': {}", value, e),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            message: format!("'{}' is not a boolean", value),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ServerConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn postgres_defaults() {
        let c = load(&[("CONNECTION_STRING", "postgres://u:p@db:5432/shop")]).unwrap();
        assert_eq!(c.store.kind, StoreKind::Postgres);
        assert_eq!(c.port, 8080);
        assert_eq!(c.listen_address(), "0.0.0.0:8080");
        assert_eq!(c.max_body_bytes, 2_097_152);
        assert_eq!(c.store.schema, "public");
        assert_eq!(c.store.max_connections, 5);
        assert!(!c.store.sample_schema);
        assert_eq!(c.store.database_label(), "shop");
        assert_eq!(c.cors, CorsConfig::default());
        assert_eq!(c.docs, DocsConfig::default());
    }

    #[test]
    fn mongo_requires_database_name() {
        let err = load(&[("CONNECTION_STRING", "mongodb://localhost:27017")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_NAME")));

        let c = load(&[
            ("CONNECTION_STRING", "mongodb+srv://cluster.example.net"),
            ("DATABASE_NAME", "shop"),
            ("DOCUMENT_SAMPLE_SCHEMA", "true"),
        ])
        .unwrap();
        assert_eq!(c.store.kind, StoreKind::MongoDb);
        assert_eq!(c.store.database_label(), "shop");
        assert!(c.store.sample_schema);
    }

    #[test]
    fn store_kind_without_connection_string() {
        let c = load(&[
            ("STORE_KIND", "postgres"),
            ("DATABASE_HOST", "db"),
            ("DATABASE_PORT", "6543"),
            ("DATABASE_USER", "app"),
        ])
        .unwrap();
        assert_eq!(c.store.connection_string, None);
        assert_eq!(c.store.host, "db");
        assert_eq!(c.store.port, Some(6543));
        assert_eq!(c.store.user.as_deref(), Some("app"));
        assert_eq!(c.store.database_label(), "default");

        assert!(matches!(load(&[]), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let base = ("CONNECTION_STRING", "postgres://localhost/db");
        assert!(matches!(
            load(&[base, ("PORT", "eighty")]),
            Err(ConfigError::Invalid { key: "PORT", .. })
        ));
        assert!(matches!(
            load(&[base, ("STORE_KIND", "redis")]),
            Err(ConfigError::Invalid { key: "STORE_KIND", .. })
        ));
        assert!(matches!(
            load(&[("CONNECTION_STRING", "redis://localhost")]),
            Err(ConfigError::Invalid { key: "CONNECTION_STRING", .. })
        ));
    }

    #[test]
    fn overrides_and_empty_values() {
        let c = load(&[
            ("CONNECTION_STRING", "postgres://localhost/db"),
            ("PORT", "3000"),
            ("REQUEST_HEADER_ACCESS_CONTROL_ALLOW_ORIGIN", "https://app.example.com"),
            ("REQUEST_HEADER_ACCESS_CONTROL_ALLOW_METHODS", ""),
            ("CUSTOM_CSS", ".topbar { display: none }"),
        ])
        .unwrap();
        assert_eq!(c.port, 3000);
        assert_eq!(c.cors.allow_origin, "https://app.example.com");
        assert_eq!(c.cors.allow_methods, CorsConfig::default().allow_methods);
        assert_eq!(c.docs.custom_css, ".topbar { display: none }");
    }
}
