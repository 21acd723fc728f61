use axum::body::Body;
use displaydoc::Display;
use http::header::CONTENT_TYPE;
use http::HeaderValue;
use http::StatusCode;
use thiserror::Error;

/// Errors that may occur while rewriting a multipart upload request.
///
/// Every variant is fatal for the current request and is reported to the client as a
/// `400 Bad Request` carrying the error message.
#[derive(Debug, Error, Display)]
#[ignore_extra_doc_attributes]
#[non_exhaustive]
pub enum FileUploadError {
    /// invalid multipart request: {0}
    InvalidMultipartRequest(#[from] multer::Error),

    /// missing multipart field '{0}'
    MissingField(&'static str),

    /// cannot parse '{field}' field: malformed query: {reason}
    MalformedQuery {
        /// The multipart field holding the invalid JSON.
        field: &'static str,
        /// The JSON parser error.
        reason: String,
    },

    /// invalid path '{path}' found inside 'map' field: {reason}
    PathResolution {
        /// The dotted path, as sent by the client.
        path: String,
        /// Why the path does not resolve.
        reason: String,
    },

    /// could not access multipart file '{0}'
    FilePart(String),

    /// could not complete the multipart rewrite: {0}
    RewriteTask(tokio::task::JoinError),

    /// could not store multipart file '{filename}': {source}
    Storage {
        /// The client-declared file name.
        filename: String,
        /// The underlying I/O failure.
        source: std::io::Error,
    },
}

impl FileUploadError {
    pub(crate) fn path(path: &str, reason: impl Into<String>) -> Self {
        Self::PathResolution {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Plain-text client error response for this failure.
    pub fn into_response(self) -> http::Response<Body> {
        let mut response = http::Response::new(Body::from(self.to_string()));
        *response.status_mut() = StatusCode::BAD_REQUEST;
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}
