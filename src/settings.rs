//! Runtime settings read from the environment.

use crate::error::SettingsError;
use crate::storage::S3Settings;
use std::path::PathBuf;

pub const DEFAULT_SCHEMA: &str = "documents";
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_MODELS_DIR: &str = "models";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Absent means the in-memory store.
    pub database_url: Option<String>,
    pub schema: String,
    /// Prepended to every generated path, e.g. `/api/v1`.
    pub api_prefix: String,
    /// Whether the engine allocates integer ids for backends without native auto-increment.
    pub id_auto_incr: bool,
    pub body_limit: usize,
    pub bind_addr: String,
    pub models_dir: PathBuf,
    /// Object storage is enabled when a bucket is configured.
    pub s3: Option<S3Settings>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: None,
            schema: DEFAULT_SCHEMA.to_string(),
            api_prefix: String::new(),
            id_auto_incr: true,
            body_limit: DEFAULT_BODY_LIMIT,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            models_dir: PathBuf::from(DEFAULT_MODELS_DIR),
            s3: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Settings::default();

        let id_auto_incr = match get("ID_AUTO_INCR") {
            None => defaults.id_auto_incr,
            Some(v) => parse_bool(&v).ok_or(SettingsError::Invalid {
                key: "ID_AUTO_INCR",
                expected: "a boolean",
                value: v,
            })?,
        };
        let body_limit = match get("BODY_LIMIT_BYTES") {
            None => defaults.body_limit,
            Some(v) => v.parse().map_err(|_| SettingsError::Invalid {
                key: "BODY_LIMIT_BYTES",
                expected: "a byte count",
                value: v,
            })?,
        };
        let s3 = get("S3_BUCKET").map(|bucket| S3Settings {
            endpoint: get("S3_ENDPOINT"),
            bucket,
            public_url: get("S3_PUBLIC_URL"),
        });

        Ok(Settings {
            database_url: get("DATABASE_URL"),
            schema: get("CRUD_SCHEMA").unwrap_or(defaults.schema),
            api_prefix: normalize_prefix(get("API_PREFIX").as_deref().unwrap_or("")),
            id_auto_incr,
            body_limit,
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            models_dir: get("MODELS_DIR").map(PathBuf::from).unwrap_or(defaults.models_dir),
            s3,
        })
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// `api/v1/` -> `/api/v1`; `/` and empty -> empty.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Settings, SettingsError> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(from_pairs(&[]).unwrap(), Settings::default());
    }

    #[test]
    fn reads_every_key() {
        let s = from_pairs(&[
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("CRUD_SCHEMA", "shop"),
            ("API_PREFIX", "api/v1/"),
            ("ID_AUTO_INCR", "off"),
            ("BODY_LIMIT_BYTES", "2048"),
            ("BIND_ADDR", "0.0.0.0:8080"),
            ("MODELS_DIR", "/etc/models"),
            ("S3_BUCKET", "uploads"),
            ("S3_ENDPOINT", "http://localhost:9000"),
        ])
        .unwrap();
        assert_eq!(s.database_url.as_deref(), Some("postgres://localhost/shop"));
        assert_eq!(s.schema, "shop");
        assert_eq!(s.api_prefix, "/api/v1");
        assert!(!s.id_auto_incr);
        assert_eq!(s.body_limit, 2048);
        assert_eq!(s.bind_addr, "0.0.0.0:8080");
        assert_eq!(s.models_dir, PathBuf::from("/etc/models"));
        let s3 = s.s3.unwrap();
        assert_eq!(s3.bucket, "uploads");
        assert_eq!(s3.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(s3.public_url, None);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = from_pairs(&[("ID_AUTO_INCR", "maybe")]).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { key: "ID_AUTO_INCR", .. }));
        assert!(from_pairs(&[("BODY_LIMIT_BYTES", "1mb")]).is_err());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let s = from_pairs(&[("DATABASE_URL", "  "), ("API_PREFIX", "/")]).unwrap();
        assert_eq!(s.database_url, None);
        assert_eq!(s.api_prefix, "");
    }
}
