//! HTML directory listing
//!
//! The page is a single `<pre>` block: the current path, an optional `..` link, then one
//! tab-aligned row per entry. Entries are sorted by their full name, so directories and objects
//! are interleaved. Directory rows show the name only; object rows also show the last-modified
//! time and a human-readable size.
//!
//! Links are attached to the name cell of each row. Directory names link to their own listing,
//! object names to a presigned URL generated during rendering.

use crate::error::{Error, Result};
use crate::lister::{DELIMITER, Entry, EntryKind, LINK_TTL, Lister};
use crate::tabwriter::{Cell, TabWriter};

use std::borrow::Cow;
use std::time::Duration;

use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Formats a byte count with decimal (SI) units, e.g. `1500` becomes `1.50 kB`.
#[must_use]
pub fn humanize_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1000;
    const PREFIXES: [char; 6] = ['k', 'M', 'G', 'T', 'P', 'E'];

    if bytes < UNIT {
        return format!("{bytes} B");
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    #[allow(clippy::cast_precision_loss)]
    let value = bytes as f64 / div as f64;
    format!("{value:.2} {}B", PREFIXES[exp])
}

const LAST_MODIFIED: &[FormatItem<'_>] = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

/// Formats a timestamp as `YYYY-MM-DDTHH:MM:SSZ` in UTC. Subseconds are dropped.
///
/// # Errors
/// Returns an error if `t` cannot be written in this format.
pub fn format_timestamp(t: OffsetDateTime) -> Result<String, time::error::Format> {
    t.to_offset(UtcOffset::UTC).format(LAST_MODIFIED)
}

/// Returns the listing path one level above `path`.
///
/// `/photos/2020/` becomes `/photos/`, and `/photos/` becomes `/`.
#[must_use]
pub fn parent_path(path: &str) -> &str {
    let trimmed = path.strip_suffix(DELIMITER).unwrap_or(path);
    match trimmed.rfind(DELIMITER) {
        Some(idx) => &path[..=idx],
        None => DELIMITER,
    }
}

/// Percent-encodes each segment of `path`, keeping the separators.
#[must_use]
pub fn encode_path(path: &str) -> String {
    path.split(DELIMITER)
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join(DELIMITER)
}

fn escape(s: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(s)
}

fn anchor(href: &str, text: &str) -> String {
    format!("<a href=\"{}\">{}</a>", escape(href), escape(text))
}

/// Renders listings, presigning object links through a [`Lister`].
#[derive(Debug)]
pub struct Renderer<'a> {
    lister: &'a Lister,
    link_ttl: Duration,
}

impl<'a> Renderer<'a> {
    #[must_use]
    pub fn new(lister: &'a Lister) -> Self {
        Self {
            lister,
            link_ttl: LINK_TTL,
        }
    }

    #[must_use]
    pub fn with_link_ttl(mut self, ttl: Duration) -> Self {
        self.link_ttl = ttl;
        self
    }

    /// Renders the listing page of `request_path`.
    ///
    /// # Errors
    /// Returns [`Error::Link`] if any object link cannot be presigned, or [`Error::Timestamp`] if a
    /// modification time cannot be formatted. Nothing is rendered then.
    pub async fn render(&self, request_path: &str, mut entries: Vec<Entry>) -> Result<String> {
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let mut out = String::new();
        out.push_str("<pre>\n");
        out.push_str(&escape(request_path));
        out.push_str("\n\n");

        if request_path != DELIMITER {
            let parent = encode_path(parent_path(request_path));
            out.push_str(&anchor(&parent, ".."));
            out.push('\n');
        }

        let mut tw = TabWriter::new(0, 1, ' ');
        for entry in &entries {
            let href = self.href(entry).await?;
            let name = Cell::new(entry.name.as_str()).with_display(anchor(&href, &entry.name));
            match entry.kind {
                EntryKind::Directory => tw.push_row([name, Cell::new(""), Cell::new(""), Cell::new("")]),
                EntryKind::Object { size, last_modified } => tw.push_row([
                    name,
                    Cell::new(format_timestamp(last_modified)?),
                    Cell::new(humanize_bytes(size)),
                ]),
            }
        }

        out.push_str(&tw.finish());
        out.push_str("\n</pre>\n");
        Ok(out)
    }

    async fn href(&self, entry: &Entry) -> Result<String> {
        match entry.kind {
            EntryKind::Directory => Ok(format!("{DELIMITER}{}", encode_path(&entry.name))),
            EntryKind::Object { .. } => match self.lister.temporary_link(&entry.name, self.link_ttl).await {
                Ok(url) => Ok(url),
                Err(Error::Storage(source)) => Err(Error::Link {
                    key: entry.name.clone(),
                    source,
                }),
                Err(err) => Err(err),
            },
        }
    }
}
