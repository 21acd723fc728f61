use std::sync::Arc;
use std::task::Poll;

use axum::body::Body;
use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tower::Layer;
use tower::Service;

use super::config::FileUploadsConfig;
use super::is_multipart_upload;
use super::rewrite_request;
use super::storage::TempStorage;

struct Shared {
    config: FileUploadsConfig,
    storage: TempStorage,
    // Only set when `serialize_requests` is enabled.
    lock: Option<Mutex<()>>,
}

/// Tower layer that turns GraphQL multipart upload requests into JSON requests
#[derive(Clone)]
pub struct FileUploadLayer {
    shared: Arc<Shared>,
}

impl FileUploadLayer {
    pub fn new(config: FileUploadsConfig) -> Self {
        let storage = TempStorage::from_config(&config);
        let lock = config.serialize_requests.then(|| Mutex::new(()));
        Self {
            shared: Arc::new(Shared {
                config,
                storage,
                lock,
            }),
        }
    }
}

impl<S> Layer<S> for FileUploadLayer {
    type Service = FileUploadService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        FileUploadService {
            inner,
            shared: self.shared.clone(),
        }
    }
}

/// Tower service rewriting multipart upload requests before calling the inner service
///
/// Failed rewrites are answered with a `400 Bad Request` and never reach the inner service.
#[derive(Clone)]
pub struct FileUploadService<S> {
    inner: S,
    shared: Arc<Shared>,
}

impl<S> Service<http::Request<Body>> for FileUploadService<S>
where
    S: Service<http::Request<Body>, Response = http::Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = http::Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<Body>) -> Self::Future {
        if !self.shared.config.enabled || !is_multipart_upload(&req) {
            return Box::pin(self.inner.call(req));
        }

        let shared = self.shared.clone();
        let mut inner = self.inner.clone();
        std::mem::swap(&mut inner, &mut self.inner);
        Box::pin(async move {
            let rewritten = {
                let _guard = match &shared.lock {
                    Some(lock) => Some(lock.lock().await),
                    None => None,
                };
                rewrite_request(req, &shared.config, &shared.storage).await
            };

            match rewritten {
                Ok(req) => inner.call(req).await,
                Err(err) => {
                    tracing::info!(error = %err, "rejected multipart upload request");
                    Ok(err.into_response())
                }
            }
        })
    }
}
