//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Client settings.
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ext = &self.server.document_extension;
        if ext.is_empty() || ext.starts_with('.') {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid document_extension '{ext}'. Use a bare extension such as \"pdf\""
                ),
            });
        }
        if self.server.collection_name.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "collection_name cannot be empty".to_string(),
            });
        }
        if self.client.display_limit == 0 {
            return Err(ConfigError::ValidationError {
                message: "display_limit must be greater than zero".to_string(),
            });
        }
        if self.client.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "request_timeout_secs must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Document server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Directory scanned for documents.
    #[serde(default = "default_documents_dir")]
    pub documents_dir: PathBuf,

    /// Extension of supported documents, without the dot.
    #[serde(default = "default_document_extension")]
    pub document_extension: String,

    /// Search index file. Without one the search tools report that the
    /// collection is not initialised.
    #[serde(default)]
    pub index_path: Option<PathBuf>,

    /// Collection name reported by `get_collection_info`.
    #[serde(default = "default_collection_name")]
    pub collection_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            documents_dir: default_documents_dir(),
            document_extension: default_document_extension(),
            index_path: None,
            collection_name: default_collection_name(),
        }
    }
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from("documents")
}

fn default_document_extension() -> String {
    "pdf".to_string()
}

fn default_collection_name() -> String {
    "pdf_collection".to_string()
}

/// Interactive client settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Characters of resource content shown before truncating.
    #[serde(default = "default_display_limit")]
    pub display_limit: usize,

    /// Seconds to wait for each reply.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            display_limit: default_display_limit(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

const fn default_display_limit() -> usize {
    500
}

const fn default_request_timeout() -> u64 {
    30
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.document_extension, "pdf");
        assert_eq!(config.client.display_limit, 500);
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "_comment": "Test config",
            "server": {
                "documents_dir": "/srv/papers",
                "document_extension": "txt",
                "index_path": "/srv/papers/index.json",
                "collection_name": "papers"
            },
            "client": {
                "display_limit": 200,
                "request_timeout_secs": 5
            },
            "logging": {
                "level": "debug"
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.documents_dir, PathBuf::from("/srv/papers"));
        assert_eq!(
            config.server.index_path,
            Some(PathBuf::from("/srv/papers/index.json"))
        );
        assert_eq!(config.server.collection_name, "papers");
        assert_eq!(config.client.display_limit, 200);
        assert_eq!(config.client.request_timeout_secs, 5);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn logging_config_defaults() {
        assert_eq!(LoggingConfig::default().level, "warn");
    }

    #[test]
    fn reject_dotted_extension() {
        let json = r#"{ "server": { "document_extension": ".pdf" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_zero_display_limit() {
        let json = r#"{ "client": { "display_limit": 0 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_unknown_fields() {
        let result: Result<Config, _> = serde_json::from_str(r#"{ "unknown_field": "value" }"#);
        assert!(result.is_err());
    }
}
