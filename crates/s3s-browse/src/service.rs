//! Browse Service and Builder
//!
//! [`BrowseService`] is a hyper and tower service. Every request is dispatched on its path alone:
//!
//! - a path ending with `/` is a directory: the prefix is listed and rendered as HTML (`200`)
//! - any other path is an object: the response is a `308 Permanent Redirect` to a presigned URL
//!
//! Storage and signing failures produce a `500` whose plain-text body is the error message.
//! Nothing is partially rendered.
//!
//! # Example
//!
//! ```no_run
//! use s3s_browse::service::BrowseServiceBuilder;
//! use hyper_util::rt::{TokioExecutor, TokioIo};
//! use hyper_util::server::conn::auto::Builder as ConnBuilder;
//! use tokio::net::TcpListener;
//!
//! # async fn run(client: aws_sdk_s3::Client) -> Result<(), Box<dyn std::error::Error>> {
//! let service = BrowseServiceBuilder::new(client, "my-bucket").build();
//! let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!
//! loop {
//!     let (stream, _) = listener.accept().await?;
//!     let io = TokioIo::new(stream);
//!     let service = service.clone();
//!
//!     tokio::spawn(async move {
//!         let _ = ConnBuilder::new(TokioExecutor::new())
//!             .serve_connection(io, service)
//!             .await;
//!     });
//! }
//! # }
//! ```

use crate::error::{Error, Result};
use crate::lister::{DELIMITER, LINK_TTL, Lister, key_of};
use crate::render::Renderer;
use crate::storage::Storage;

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use http::header::{CONTENT_TYPE, LOCATION, X_CONTENT_TYPE_OPTIONS};
use http::request::Parts;
use http::{HeaderValue, Method, StatusCode};
use http_body_util::Full;
use tracing::debug;

pub type HttpResponse = http::Response<Full<Bytes>>;

const TEXT_HTML: &str = "text/html; charset=utf-8";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Builder for [`BrowseService`].
pub struct BrowseServiceBuilder {
    lister: Lister,
    link_ttl: Duration,
}

impl BrowseServiceBuilder {
    #[must_use]
    pub fn new(storage: impl Storage, bucket: impl Into<String>) -> Self {
        Self::from_shared(Arc::new(storage), bucket)
    }

    #[must_use]
    pub fn from_shared(storage: Arc<dyn Storage>, bucket: impl Into<String>) -> Self {
        Self {
            lister: Lister::new(storage, bucket),
            link_ttl: LINK_TTL,
        }
    }

    /// Sets the validity of generated links.
    ///
    /// Default: [`LINK_TTL`] (5 minutes)
    pub fn set_link_ttl(&mut self, ttl: Duration) {
        self.link_ttl = ttl;
    }

    #[must_use]
    pub fn build(self) -> BrowseService {
        BrowseService {
            inner: Arc::new(Inner {
                lister: self.lister,
                link_ttl: self.link_ttl,
            }),
        }
    }
}

/// An HTTP service browsing one bucket.
///
/// `BrowseService` is cheap to clone (uses `Arc` internally).
#[derive(Clone)]
pub struct BrowseService {
    inner: Arc<Inner>,
}

struct Inner {
    lister: Lister,
    link_ttl: Duration,
}

impl fmt::Debug for BrowseService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowseService")
            .field("bucket", &self.inner.lister.bucket())
            .finish_non_exhaustive()
    }
}

impl BrowseService {
    /// Handles a request. The request body is ignored.
    pub async fn call<B>(&self, req: http::Request<B>) -> HttpResponse {
        let (parts, _) = req.into_parts();
        self.handle(&parts).await
    }

    #[tracing::instrument(level = "debug", skip(self, parts), fields(path = %parts.uri.path()))]
    async fn handle(&self, parts: &Parts) -> HttpResponse {
        match self.dispatch(parts).await {
            Ok(resp) => resp,
            Err(err) => {
                debug!(%err, "request failed");
                error_response(&err)
            }
        }
    }

    async fn dispatch(&self, parts: &Parts) -> Result<HttpResponse> {
        let path = urlencoding::decode(parts.uri.path())?;
        if path.ends_with(DELIMITER) {
            self.list_directory(&path).await
        } else {
            self.redirect_object(&parts.method, &path).await
        }
    }

    async fn list_directory(&self, path: &str) -> Result<HttpResponse> {
        let lister = &self.inner.lister;
        let entries = lister.list_by_prefix(path).await?;
        let html = Renderer::new(lister)
            .with_link_ttl(self.inner.link_ttl)
            .render(path, entries)
            .await?;
        Ok(text_response(StatusCode::OK, TEXT_HTML, html))
    }

    async fn redirect_object(&self, method: &Method, path: &str) -> Result<HttpResponse> {
        let url = self.inner.lister.temporary_link(key_of(path), self.inner.link_ttl).await?;
        let location = HeaderValue::try_from(url.as_str())?;

        let mut resp = if *method == Method::GET {
            let body = format!("<a href=\"{}\">Permanent Redirect</a>.\n\n", quick_xml::escape::escape(url.as_str()));
            text_response(StatusCode::PERMANENT_REDIRECT, TEXT_HTML, body)
        } else {
            let mut resp = HttpResponse::new(Full::default());
            *resp.status_mut() = StatusCode::PERMANENT_REDIRECT;
            if *method == Method::HEAD {
                resp.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_HTML));
            }
            resp
        };
        resp.headers_mut().insert(LOCATION, location);
        Ok(resp)
    }

    async fn call_owned(self, parts: Parts) -> Result<HttpResponse, Infallible> {
        Ok(self.handle(&parts).await)
    }
}

fn text_response(status: StatusCode, content_type: &'static str, body: String) -> HttpResponse {
    let mut resp = HttpResponse::new(Full::new(Bytes::from(body)));
    *resp.status_mut() = status;
    resp.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    resp
}

fn error_response(err: &Error) -> HttpResponse {
    let mut resp = text_response(StatusCode::INTERNAL_SERVER_ERROR, TEXT_PLAIN, format!("{err}\n"));
    resp.headers_mut().insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    resp
}

impl hyper::service::Service<http::Request<hyper::body::Incoming>> for BrowseService {
    type Response = HttpResponse;

    type Error = Infallible;

    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn call(&self, req: http::Request<hyper::body::Incoming>) -> Self::Future {
        let (parts, _) = req.into_parts();
        let service = self.clone();
        Box::pin(service.call_owned(parts))
    }
}

impl<B> tower::Service<http::Request<B>> for BrowseService {
    type Response = HttpResponse;

    type Error = Infallible;

    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut std::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let (parts, _) = req.into_parts();
        let service = self.clone();
        Box::pin(service.call_owned(parts))
    }
}
