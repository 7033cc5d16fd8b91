//! Paginated listing by prefix

use crate::error::Result;
use crate::storage::Storage;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::debug;

/// Separator used to emulate a directory hierarchy over flat keys.
pub const DELIMITER: &str = "/";

/// Validity window of every presigned link.
pub const LINK_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// A common prefix, listed as a virtual directory.
    Directory,
    /// A stored object with its size in bytes and last modification time.
    Object { size: u64, last_modified: OffsetDateTime },
}

/// An object or virtual directory under a listed prefix.
///
/// `name` is the full key or prefix as returned by storage, not relative to the listed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
}

impl Entry {
    #[must_use]
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }

    #[must_use]
    pub fn object(name: impl Into<String>, size: u64, last_modified: OffsetDateTime) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Object { size, last_modified },
        }
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }
}

/// Lists a bucket through a shared [`Storage`] handle.
#[derive(Clone)]
pub struct Lister {
    storage: Arc<dyn Storage>,
    bucket: String,
}

impl fmt::Debug for Lister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lister").field("bucket", &self.bucket).finish_non_exhaustive()
    }
}

/// Maps a request path to a storage key by dropping one leading separator.
#[must_use]
pub fn key_of(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

impl Lister {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, bucket: impl Into<String>) -> Self {
        Self {
            storage,
            bucket: bucket.into(),
        }
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Lists every object and common prefix directly under `path`.
    ///
    /// All pages are fetched before returning. Within a page, objects come before common prefixes.
    ///
    /// # Errors
    /// Returns the first page error. Entries from earlier pages are discarded.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn list_by_prefix(&self, path: &str) -> Result<Vec<Entry>> {
        let prefix = key_of(path);
        let mut entries = Vec::new();
        let mut continuation_token = None;
        let mut page_no = 0_usize;

        loop {
            let page = self
                .storage
                .list_page(&self.bucket, prefix, DELIMITER, continuation_token)
                .await?;
            page_no += 1;

            debug!(page_no, objects = page.objects.len(), prefixes = page.common_prefixes.len(), "listed page");

            entries.extend(
                page.objects
                    .into_iter()
                    .map(|obj| Entry::object(obj.key, obj.size, obj.last_modified)),
            );
            entries.extend(page.common_prefixes.into_iter().map(Entry::directory));

            match page.next_continuation_token {
                Some(token) if page.is_truncated => continuation_token = Some(token),
                _ => break,
            }
        }

        Ok(entries)
    }

    /// Generates a presigned read URL for the exact object `key`.
    ///
    /// # Errors
    /// Returns an error if the backend cannot sign the request.
    pub async fn temporary_link(&self, key: &str, ttl: Duration) -> Result<String> {
        Ok(self.storage.presign_get(&self.bucket, key, ttl).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::Error;
    use crate::storage::tests::{MemoryStorage, object};

    use std::collections::BTreeSet;

    fn names(entries: &[Entry]) -> BTreeSet<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn key_strips_one_leading_separator() {
        assert_eq!(key_of("/photos/"), "photos/");
        assert_eq!(key_of("photos/a.jpg"), "photos/a.jpg");
        assert_eq!(key_of("/"), "");
        assert_eq!(key_of("//x"), "/x");
    }

    #[tokio::test]
    async fn aggregates_all_pages_regardless_of_page_size() {
        let objects: Vec<_> = (0..7).map(|i| object(&format!("data/f{i}.txt"), i)).collect();
        let prefixes = vec!["data/a/", "data/b/", "data/c/"];

        for page_size in [1, 2, 3, 4, 10, 100] {
            let storage = MemoryStorage::new().with_listing("data/", objects.clone(), prefixes.clone(), page_size);
            let lister = Lister::new(Arc::new(storage), "bucket");

            let entries = lister.list_by_prefix("/data/").await.unwrap();
            assert_eq!(entries.len(), 10, "page_size = {page_size}");
            assert_eq!(names(&entries).len(), 10, "duplicates with page_size = {page_size}");
            assert_eq!(entries.iter().filter(|e| e.is_dir()).count(), 3);
        }
    }

    #[tokio::test]
    async fn follows_continuation_tokens_in_order() {
        let storage = Arc::new(MemoryStorage::new().with_listing("", vec![object("a", 1), object("b", 2)], vec!["c/"], 1));
        let lister = Lister::new(storage.clone(), "bucket");

        let entries = lister.list_by_prefix("/").await.unwrap();
        assert_eq!(entries.len(), 3);

        let calls = storage.calls.lock().unwrap().clone();
        let tokens: Vec<_> = calls.iter().map(|(_, t)| t.clone()).collect();
        assert_eq!(tokens, vec![None, Some("1".to_owned()), Some("2".to_owned())]);
        assert!(calls.iter().all(|(prefix, _)| prefix.is_empty()));
    }

    #[tokio::test]
    async fn directories_and_objects_are_typed() {
        let storage = MemoryStorage::new().with_listing("photos/", vec![object("photos/a.jpg", 2048)], vec!["photos/2020/"], 10);
        let lister = Lister::new(Arc::new(storage), "bucket");

        let entries = lister.list_by_prefix("/photos/").await.unwrap();
        assert_eq!(entries[0].name, "photos/a.jpg");
        assert!(matches!(entries[0].kind, EntryKind::Object { size: 2048, .. }));
        assert_eq!(entries[1], Entry::directory("photos/2020/"));
    }

    #[tokio::test]
    async fn empty_prefix_yields_no_entries() {
        let lister = Lister::new(Arc::new(MemoryStorage::new()), "bucket");
        let entries = lister.list_by_prefix("/nothing/").await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn failing_page_discards_earlier_pages() {
        let storage = Arc::new(
            MemoryStorage::new()
                .with_listing("logs/", vec![object("logs/1", 1), object("logs/2", 2), object("logs/3", 3)], vec![], 1)
                .with_failing_page("logs/", 1),
        );
        let lister = Lister::new(storage.clone(), "bucket");

        let err = lister.list_by_prefix("/logs/").await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(err.to_string(), "InternalError: page 1 failed");

        // no further pages are requested after the failure
        assert_eq!(storage.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn temporary_link_uses_bucket_and_ttl() {
        let lister = Lister::new(Arc::new(MemoryStorage::new()), "media");
        let url = lister.temporary_link("photos/a.jpg", LINK_TTL).await.unwrap();
        assert_eq!(url, "https://media.s3.test/photos/a.jpg?X-Amz-Expires=300&X-Amz-Signature=abc");
    }

    #[tokio::test]
    async fn temporary_link_propagates_errors() {
        let lister = Lister::new(Arc::new(MemoryStorage::new()), "media");
        assert!(lister.temporary_link("", LINK_TTL).await.is_err());
    }
}
