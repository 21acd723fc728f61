//! GraphQL multipart request support.
//!
//! Requests following the [GraphQL multipart request spec] are turned back into plain JSON
//! GraphQL requests before they reach the execution layer: every uploaded file is stored
//! on disk and replaced, inside the request variables, by an [`Upload`](crate::Upload)
//! value describing it.
//!
//! [GraphQL multipart request spec]: https://github.com/jaydenseric/graphql-multipart-request-spec

use axum::body::Body;
use http::header::CONTENT_LENGTH;
use http::header::CONTENT_TYPE;
use http::header::TRANSFER_ENCODING;
use http::HeaderValue;
use http::Method;
use mediatype::names::BOUNDARY;
use mediatype::names::FORM_DATA;
use mediatype::names::MULTIPART;
use mediatype::MediaType;
use mediatype::ReadParams;

use self::multipart_form_data::MultipartFormData;
use self::rewrite::rewrite_operations;
use self::storage::TempStorage;

mod config;
mod error;
mod layer;
mod map_field;
mod multipart_form_data;
mod path;
mod rewrite;
mod sniff;
mod storage;

pub use self::config::FileUploadsConfig;
pub use self::error::FileUploadError;
pub use self::layer::FileUploadLayer;
pub use self::layer::FileUploadService;

type Result<T> = std::result::Result<T, error::FileUploadError>;

static APPLICATION_JSON: HeaderValue = HeaderValue::from_static("application/json");

fn get_multipart_mime<B>(req: &http::Request<B>) -> Option<MediaType<'_>> {
    if req.method() != Method::POST {
        return None;
    }
    req.headers()
        .get(CONTENT_TYPE)
        // Anything that is not a multipart content type is left to the inner service.
        .and_then(|header| header.to_str().ok())
        .and_then(|str| MediaType::parse(str).ok())
        .filter(|mime| mime.ty == MULTIPART && mime.subty == FORM_DATA)
}

/// Whether the request is a multipart upload the middleware should rewrite.
pub fn is_multipart_upload<B>(req: &http::Request<B>) -> bool {
    get_multipart_mime(req).is_some()
}

/// Rewrites a multipart upload request into a JSON GraphQL request.
///
/// Requests that are not multipart uploads are returned unchanged.
pub(crate) async fn rewrite_request(
    req: http::Request<Body>,
    config: &FileUploadsConfig,
    storage: &TempStorage,
) -> Result<http::Request<Body>> {
    let Some(mime) = get_multipart_mime(&req) else {
        return Ok(req);
    };
    let boundary = mime
        .get_param(BOUNDARY)
        .ok_or_else(|| FileUploadError::InvalidMultipartRequest(multer::Error::NoBoundary))?
        .to_string();

    let (mut parts, body) = req.into_parts();
    let form =
        MultipartFormData::read(body.into_data_stream(), boundary, config.max_parse_size).await?;

    let storage = storage.clone();
    let rewritten = tokio::task::spawn_blocking(move || rewrite_operations(&form, &storage))
        .await
        .map_err(FileUploadError::RewriteTask)??;

    tracing::debug!(
        uploads = rewritten.uploads,
        substitutions = rewritten.substitutions,
        "rewrote multipart upload request"
    );

    // The new body has a known length: a chunked framing header would contradict it.
    parts.headers.remove(TRANSFER_ENCODING);
    parts.headers.insert(CONTENT_TYPE, APPLICATION_JSON.clone());
    parts
        .headers
        .insert(CONTENT_LENGTH, HeaderValue::from(rewritten.body.len()));
    Ok(http::Request::from_parts(parts, Body::from(rewritten.body)))
}
