//! Browse an S3 bucket over HTTP
//!
//! `s3s-browse` exposes the contents of a single bucket as a browsable file tree. Paths ending
//! with `/` are answered with a plain HTML listing of the objects and "directories" under that
//! prefix. Any other path is answered with a `308 Permanent Redirect` to a presigned `GetObject`
//! URL that expires after [`LINK_TTL`](lister::LINK_TTL).
//!
//! # Architecture
//!
//! - [`storage`]: the abstract storage capability (list a page by prefix, presign a key)
//! - [`aws`]: the [`Storage`](storage::Storage) implementation for `aws_sdk_s3::Client`
//! - [`lister`]: paginated listing by prefix, assembled into [`Entry`](lister::Entry) values
//! - [`render`]: the HTML listing with tab-aligned rows and per-row links
//! - [`service`]: the hyper/tower service that dispatches between listing and redirect
//! - [`logging`]: one structured log line per request
//!
//! # Example
//!
//! ```no_run
//! use s3s_browse::config::StorageConfig;
//! use s3s_browse::logging::WithLogging;
//! use s3s_browse::service::BrowseServiceBuilder;
//!
//! # async fn run() {
//! let config = StorageConfig::new("my-bucket");
//! let client = s3s_browse::aws::build_client(&config).await;
//! let service = WithLogging::new(BrowseServiceBuilder::new(client, config.bucket).build());
//! // Serve `service` with hyper-util, see the `s3s-browse` binary.
//! # drop(service);
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(
    clippy::bool_assert_comparison,  // I don't like `assert!(!expression)`. It's very misleading.
    clippy::multiple_crate_versions, // Sometimes not fixable
    clippy::module_name_repetitions,
)]

mod error;

pub mod aws;
pub mod config;
pub mod lister;
pub mod logging;
pub mod render;
pub mod service;
pub mod storage;
pub mod tabwriter;

pub use self::error::*;
