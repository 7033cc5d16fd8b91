//! Abstract storage capability
//!
//! The browser only needs two things from an object store: one page of a delimiter-based listing
//! and a presigned read URL for a key. [`Storage`] captures exactly that, so the listing logic can
//! run against `aws_sdk_s3::Client` in production and against an in-memory double in tests.

use std::error::Error as StdErrorTrait;
use std::time::Duration;

use time::OffsetDateTime;

pub type StdError = Box<dyn StdErrorTrait + Send + Sync + 'static>;

/// An object returned by a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub last_modified: OffsetDateTime,
}

/// One page of a `ListObjectsV2`-style listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub objects: Vec<ObjectInfo>,
    /// Keys grouped by the delimiter, each ending with the delimiter.
    pub common_prefixes: Vec<String>,
    pub next_continuation_token: Option<String>,
    pub is_truncated: bool,
}

/// An error reported by the storage backend.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct StorageError {
    message: String,
    #[source]
    source: Option<StdError>,
}

impl StorageError {
    /// Wraps a backend error, keeping its display output as the message.
    #[must_use]
    pub fn new(source: impl Into<StdError>) -> Self {
        let source = source.into();
        Self {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Wraps a backend error with an explicit message.
    #[must_use]
    pub fn with_message(message: impl Into<String>, source: impl Into<StdError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    #[must_use]
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The storage operations the browser depends on.
///
/// Implementations must be safe for concurrent use: one instance serves every request.
#[async_trait::async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Lists one page of keys under `prefix`, grouping keys by `delimiter`.
    ///
    /// # Errors
    /// Returns an error if the backend request fails.
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
        continuation_token: Option<String>,
    ) -> Result<ListPage, StorageError>;

    /// Generates a URL granting read access to `key` for `ttl`, starting now.
    ///
    /// # Errors
    /// Returns an error if the request cannot be built or signed.
    async fn presign_get(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String, StorageError>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// In-memory [`Storage`] serving pre-built pages per prefix.
    ///
    /// Continuation tokens are page indices. A page listed in `fail_pages` fails when requested.
    #[derive(Default)]
    pub struct MemoryStorage {
        pages: BTreeMap<String, Vec<ListPage>>,
        fail_pages: BTreeMap<String, usize>,
        fail_presign: Option<String>,
        pub calls: Mutex<Vec<(String, Option<String>)>>,
    }

    impl MemoryStorage {
        pub fn new() -> Self {
            Self::default()
        }

        /// Splits `objects` and `prefixes` into pages of `page_size` entries under `prefix`.
        pub fn with_listing(mut self, prefix: &str, objects: Vec<ObjectInfo>, prefixes: Vec<&str>, page_size: usize) -> Self {
            let mut items: Vec<(Option<ObjectInfo>, Option<String>)> = Vec::new();
            items.extend(objects.into_iter().map(|o| (Some(o), None)));
            items.extend(prefixes.into_iter().map(|p| (None, Some(p.to_owned()))));

            let chunks: Vec<_> = items.chunks(page_size.max(1)).map(<[_]>::to_vec).collect();
            let total = chunks.len();
            let mut pages = Vec::with_capacity(total.max(1));
            for (i, chunk) in chunks.into_iter().enumerate() {
                let mut page = ListPage::default();
                for (obj, pfx) in chunk {
                    if let Some(obj) = obj {
                        page.objects.push(obj);
                    }
                    if let Some(pfx) = pfx {
                        page.common_prefixes.push(pfx);
                    }
                }
                if i + 1 < total {
                    page.is_truncated = true;
                    page.next_continuation_token = Some((i + 1).to_string());
                }
                pages.push(page);
            }
            if pages.is_empty() {
                pages.push(ListPage::default());
            }
            self.pages.insert(prefix.to_owned(), pages);
            self
        }

        pub fn with_failing_page(mut self, prefix: &str, page: usize) -> Self {
            self.fail_pages.insert(prefix.to_owned(), page);
            self
        }

        pub fn with_failing_presign(mut self, key: &str) -> Self {
            self.fail_presign = Some(key.to_owned());
            self
        }
    }

    pub fn object(key: &str, size: u64) -> ObjectInfo {
        ObjectInfo {
            key: key.to_owned(),
            size,
            last_modified: time::macros::datetime!(2024-03-01 12:30:45 UTC),
        }
    }

    #[async_trait::async_trait]
    impl Storage for MemoryStorage {
        async fn list_page(
            &self,
            _bucket: &str,
            prefix: &str,
            delimiter: &str,
            continuation_token: Option<String>,
        ) -> Result<ListPage, StorageError> {
            assert_eq!(delimiter, "/");
            self.calls.lock().unwrap().push((prefix.to_owned(), continuation_token.clone()));

            let index = match continuation_token {
                Some(token) => token.parse::<usize>().map_err(StorageError::new)?,
                None => 0,
            };
            if self.fail_pages.get(prefix) == Some(&index) {
                return Err(StorageError::from_message(format!("InternalError: page {index} failed")));
            }
            let page = self.pages.get(prefix).and_then(|pages| pages.get(index)).cloned();
            Ok(page.unwrap_or_default())
        }

        async fn presign_get(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String, StorageError> {
            if key.is_empty() || self.fail_presign.as_deref() == Some(key) {
                return Err(StorageError::from_message(format!("cannot sign key {key:?}")));
            }
            Ok(format!("https://{bucket}.s3.test/{key}?X-Amz-Expires={}&X-Amz-Signature=abc", ttl.as_secs()))
        }
    }

    #[tokio::test]
    async fn memory_storage_pages_follow_tokens() {
        let storage = MemoryStorage::new().with_listing("p/", vec![object("p/a", 1), object("p/b", 2)], vec!["p/c/"], 2);

        let first = storage.list_page("bucket", "p/", "/", None).await.unwrap();
        assert!(first.is_truncated);
        assert_eq!(first.objects.len(), 2);

        let second = storage.list_page("bucket", "p/", "/", first.next_continuation_token).await.unwrap();
        assert_eq!(second.is_truncated, false);
        assert_eq!(second.common_prefixes, vec!["p/c/".to_owned()]);
    }

    #[test]
    fn storage_error_message() {
        let err = StorageError::new(std::io::Error::other("connection reset"));
        assert_eq!(err.to_string(), "connection reset");
        assert!(StdErrorTrait::source(&err).is_some());

        let err = StorageError::with_message("NoSuchBucket: gone", std::io::Error::other("raw"));
        assert_eq!(err.message(), "NoSuchBucket: gone");
    }
}
