//! The `Upload` scalar handed to the GraphQL execution layer.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use displaydoc::Display;
use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
use serde_json_bytes::Value;
use thiserror::Error;

/// Uploaded file, stored in a temporary file on disk.
///
/// **Reference:** <https://github.com/jaydenseric/graphql-multipart-request-spec>
///
/// Declare the scalar in the schema and accept it as an argument:
///
/// ```graphql
/// scalar Upload
///
/// type Mutation {
///   upload(file: Upload!, title: String!): Boolean
/// }
/// ```
///
/// The multipart middleware writes `{filename, mimetype, filepath}` objects into the
/// request variables; [`Upload::from_input`] turns such an input value back into an
/// `Upload`. The backing file is not deleted once the request completes: that is left to
/// whoever consumes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upload {
    /// File name declared by the client.
    pub filename: String,
    /// MIME type detected from the file content.
    #[serde(rename = "mimetype")]
    pub mime_type: String,
    /// Absolute path of the stored file.
    pub filepath: PathBuf,
}

/// Errors raised while turning an input value into an [`Upload`].
#[derive(Debug, Error, Display)]
pub enum UploadValueError {
    /// cannot unmarshal received type as an Upload type
    InvalidType,
    /// cannot unmarshal received object as an Upload type: {0}
    InvalidShape(String),
}

impl Upload {
    /// Name of the GraphQL scalar.
    pub const TYPE_NAME: &'static str = "Upload";

    /// Whether this value implements the GraphQL scalar named `name`.
    pub fn implements_graphql_type(name: &str) -> bool {
        name == Self::TYPE_NAME
    }

    /// Hydrates an `Upload` from a GraphQL input value.
    ///
    /// Only objects shaped like `{filename, mimetype, filepath}` are accepted.
    pub fn from_input(input: &Value) -> Result<Self, UploadValueError> {
        match input {
            Value::Object(_) => serde_json_bytes::from_value(input.clone())
                .map_err(|err| UploadValueError::InvalidShape(err.to_string())),
            _ => Err(UploadValueError::InvalidType),
        }
    }

    /// Opens the stored file for reading.
    pub fn open(&self) -> std::io::Result<BufReader<File>> {
        File::open(&self.filepath).map(BufReader::new)
    }

    /// Opens the stored file for reading without blocking the runtime.
    pub async fn reader(&self) -> std::io::Result<tokio::io::BufReader<tokio::fs::File>> {
        tokio::fs::File::open(&self.filepath)
            .await
            .map(tokio::io::BufReader::new)
    }
}

impl From<Upload> for Value {
    fn from(upload: Upload) -> Self {
        let mut object = Map::new();
        object.insert(
            ByteString::from("filename"),
            Value::String(upload.filename.into()),
        );
        object.insert(
            ByteString::from("mimetype"),
            Value::String(upload.mime_type.into()),
        );
        object.insert(
            ByteString::from("filepath"),
            Value::String(upload.filepath.to_string_lossy().into_owned().into()),
        );
        Value::Object(object)
    }
}
