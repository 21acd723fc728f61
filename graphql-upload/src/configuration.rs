//! Logic for loading configuration in to an object model

use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

use displaydoc::Display;
use schemars::gen::SchemaSettings;
use schemars::schema::RootSchema;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::file_uploads::FileUploadsConfig;

/// Configuration error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// could not read configuration file {path}: {error}
    CannotReadConfig {
        path: String,
        error: std::io::Error,
    },
    /// could not deserialize configuration: {0}
    DeserializeConfigError(#[from] serde_yaml::Error),
    /// {message}: {error}
    InvalidConfiguration {
        message: &'static str,
        error: String,
    },
}

/// The configuration for the upload router.
///
/// Can be created through `serde::Deserialize` from various formats, usually YAML.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Configuration {
    /// Configuration options pertaining to the http server component.
    pub server: Server,

    /// GraphQL multipart request handling.
    pub file_uploads: FileUploadsConfig,
}

/// Configuration options pertaining to the http server component.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Server {
    /// The socket address and port to listen on.
    /// Defaults to 127.0.0.1:4000
    pub listen: SocketAddr,

    /// The HTTP path on which GraphQL requests will be served.
    /// Defaults to "/".
    pub path: String,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 4000)),
            path: "/".to_string(),
        }
    }
}

impl Configuration {
    /// Reads and validates the YAML configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let content =
            std::fs::read_to_string(path).map_err(|error| ConfigurationError::CannotReadConfig {
                path: path.display().to_string(),
                error,
            })?;
        content.parse()
    }

    /// JSON schema of the configuration file.
    pub fn schema() -> RootSchema {
        let settings = SchemaSettings::draft07().with(|s| {
            s.inline_subschemas = false;
        });
        settings.into_generator().into_root_schema_for::<Configuration>()
    }

    fn validate(self) -> Result<Self, ConfigurationError> {
        if !self.server.path.starts_with('/') {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "invalid 'server.path' configuration",
                error: format!("'{}' must start with '/'", self.server.path),
            });
        }
        if self.file_uploads.file_prefix.contains(std::path::is_separator) {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "invalid 'file_uploads.file_prefix' configuration",
                error: format!(
                    "'{}' must not contain a path separator",
                    self.file_uploads.file_prefix
                ),
            });
        }
        Ok(self)
    }
}

impl FromStr for Configuration {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let configuration: Configuration = serde_yaml::from_str(s)?;
        configuration.validate()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn it_defaults_everything() {
        let configuration: Configuration = "{}".parse().unwrap();
        assert_eq!(configuration.server.listen.to_string(), "127.0.0.1:4000");
        assert_eq!(configuration.server.path, "/");
        assert!(configuration.file_uploads.enabled);
        assert_eq!(
            configuration.file_uploads.max_parse_size.as_u64(),
            64 * 1024 * 1024
        );
    }

    #[test]
    fn it_reads_a_full_configuration() {
        let configuration: Configuration = r#"
server:
  listen: 0.0.0.0:8080
  path: /graphql
file_uploads:
  max_parse_size: 10MiB
  temp_dir: /var/uploads
  file_prefix: upload-
  serialize_requests: true
"#
        .parse()
        .unwrap();
        assert_eq!(configuration.server.listen.to_string(), "0.0.0.0:8080");
        assert_eq!(configuration.server.path, "/graphql");
        let file_uploads = configuration.file_uploads;
        assert_eq!(file_uploads.max_parse_size.as_u64(), 10 * 1024 * 1024);
        assert_eq!(file_uploads.temp_dir, Some(PathBuf::from("/var/uploads")));
        assert_eq!(file_uploads.file_prefix, "upload-");
        assert!(file_uploads.serialize_requests);
    }

    #[test]
    fn it_rejects_unknown_fields() {
        let err = "plugins: {}".parse::<Configuration>().unwrap_err();
        assert!(matches!(err, ConfigurationError::DeserializeConfigError(_)));
    }

    #[test]
    fn it_rejects_invalid_values() {
        let err = "server:\n  path: graphql".parse::<Configuration>().unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"invalid 'server.path' configuration: 'graphql' must start with '/'");

        let err = "file_uploads:\n  file_prefix: a/b"
            .parse::<Configuration>()
            .unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"invalid 'file_uploads.file_prefix' configuration: 'a/b' must not contain a path separator");
    }

    #[test]
    fn it_fails_on_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = Configuration::load(&dir.path().join("router.yaml")).unwrap_err();
        assert!(matches!(err, ConfigurationError::CannotReadConfig { .. }));
    }

    #[test]
    fn it_generates_a_schema() {
        let schema = serde_json::to_value(Configuration::schema()).unwrap();
        let properties = &schema["properties"];
        assert!(properties["server"].is_object());
        assert!(properties["file_uploads"].is_object());
        assert_eq!(schema["additionalProperties"], serde_json::json!(false));
    }
}
