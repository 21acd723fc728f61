use std::path::PathBuf;

use bytesize::ByteSize;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

pub(crate) const DEFAULT_FILE_PREFIX: &str = "graphqlupload-";

/// Configuration for file uploads
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct FileUploadsConfig {
    /// Rewrite `multipart/form-data` GraphQL requests. When disabled every request is
    /// forwarded untouched.
    pub enabled: bool,

    /// Maximum size of a whole multipart request body (e.g. `64MiB`).
    #[schemars(with = "String")]
    pub max_parse_size: ByteSize,

    /// Directory receiving the uploaded files. Defaults to the OS temporary directory.
    pub temp_dir: Option<PathBuf>,

    /// Prefix of the generated file names.
    pub file_prefix: String,

    /// Serialize the rewrite of every upload request behind a single process-wide lock.
    pub serialize_requests: bool,
}

impl Default for FileUploadsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_parse_size: ByteSize::mib(64),
            temp_dir: None,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            serialize_requests: false,
        }
    }
}

impl FileUploadsConfig {
    pub(crate) fn storage_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
