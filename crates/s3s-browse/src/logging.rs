//! Per-request observability
//!
//! [`WithLogging`] wraps a service and emits one `INFO` event per request with the method,
//! duration, response status, host, path and query string. The response passes through
//! untouched.

use std::fmt;
use std::future::Future;
use std::time::Instant;

use futures::future::BoxFuture;
use http::header::HOST;
use http::{Method, StatusCode};
use tracing::info;

/// A service decorator that logs every request.
#[derive(Debug, Clone)]
pub struct WithLogging<S> {
    inner: S,
}

impl<S> WithLogging<S> {
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

/// Request attributes captured before the inner service consumes the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub method: Method,
    pub host: String,
    pub path: String,
    pub query: String,
}

impl RequestRecord {
    pub fn from_request<B>(req: &http::Request<B>) -> Self {
        let uri = req.uri();
        let host = req
            .headers()
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| uri.authority().map(http::uri::Authority::as_str))
            .unwrap_or_default();
        Self {
            method: req.method().clone(),
            host: host.to_owned(),
            path: uri.path().to_owned(),
            query: uri.query().unwrap_or_default().to_owned(),
        }
    }

    fn emit(&self, status: StatusCode, start: Instant, error: Option<&str>) {
        info!(
            method = %self.method,
            duration = ?start.elapsed(),
            status = status.as_u16(),
            host = %self.host,
            path = %self.path,
            query = %self.query,
            error,
            "request"
        );
    }
}

fn observe<F, B, E>(record: RequestRecord, fut: F) -> BoxFuture<'static, Result<http::Response<B>, E>>
where
    F: Future<Output = Result<http::Response<B>, E>> + Send + 'static,
    B: 'static,
    E: fmt::Display + 'static,
{
    let start = Instant::now();
    Box::pin(async move {
        let result = fut.await;
        match &result {
            Ok(resp) => record.emit(resp.status(), start, None),
            Err(err) => record.emit(StatusCode::INTERNAL_SERVER_ERROR, start, Some(&err.to_string())),
        }
        result
    })
}

impl<S, ReqBody, ResBody> hyper::service::Service<http::Request<ReqBody>> for WithLogging<S>
where
    S: hyper::service::Service<http::Request<ReqBody>, Response = http::Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: fmt::Display + 'static,
    ResBody: 'static,
{
    type Response = http::Response<ResBody>;

    type Error = S::Error;

    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn call(&self, req: http::Request<ReqBody>) -> Self::Future {
        let record = RequestRecord::from_request(&req);
        observe(record, hyper::service::Service::call(&self.inner, req))
    }
}

impl<S, ReqBody, ResBody> tower::Service<http::Request<ReqBody>> for WithLogging<S>
where
    S: tower::Service<http::Request<ReqBody>, Response = http::Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: fmt::Display + 'static,
    ResBody: 'static,
{
    type Response = http::Response<ResBody>;

    type Error = S::Error;

    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut std::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
        tower::Service::poll_ready(&mut self.inner, cx)
    }

    fn call(&mut self, req: http::Request<ReqBody>) -> Self::Future {
        let record = RequestRecord::from_request(&req);
        observe(record, tower::Service::call(&mut self.inner, req))
    }
}
