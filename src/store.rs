// src/store.rs
//! Read-only access to the FreshRSS SQLite database.
//!
//! FreshRSS keeps writing to the same file while we read, so every fetch
//! opens a fresh read-only connection and closes it when done. The schema is
//! owned by FreshRSS; this module only knows the three tables it joins.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::error::Result;
use crate::sanitize::clean_html;

/// One feed article as read from the store. Immutable after construction;
/// `id` is the sole deduplication key across runs.
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: i64,
    pub title: String,
    pub author: Option<String>,
    /// Sanitized plain text, fed to the summarization prompts.
    pub content: String,
    /// Original markup as stored by FreshRSS.
    pub raw_content: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    /// Feed category, "Uncategorized" when the feed has none.
    pub category: String,
    pub feed_name: String,
}

const RECENT_ENTRIES_SQL: &str = "\
    SELECT e.id, e.title, e.author, e.content, e.link, e.date, \
           c.name AS category, f.name AS feed_name \
    FROM entry e \
    JOIN feed f ON e.id_feed = f.id \
    LEFT JOIN category c ON f.category = c.id \
    WHERE e.date >= ?1 \
    ORDER BY e.date DESC";

/// Handle on the FreshRSS database file.
#[derive(Debug, Clone)]
pub struct EntryStore {
    db_path: PathBuf,
}

impl EntryStore {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// Entries published within the last `hours_back` hours, newest first,
    /// with already-processed ids removed. The blocking SQLite work runs on
    /// the blocking pool.
    pub async fn fetch_recent(
        &self,
        hours_back: u64,
        excluded: HashSet<i64>,
    ) -> Result<Vec<Entry>> {
        let cutoff = Utc::now() - Duration::hours(hours_back as i64);
        let path = self.db_path.clone();
        tokio::task::spawn_blocking(move || fetch_since(&path, cutoff.timestamp(), &excluded))
            .await?
    }
}

/// Blocking fetch of all entries at or after `cutoff_unix`, newest first,
/// minus the excluded ids. Fails when the store cannot be opened or queried.
pub fn fetch_since(
    db_path: &Path,
    cutoff_unix: i64,
    excluded: &HashSet<i64>,
) -> Result<Vec<Entry>> {
    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    let mut stmt = conn.prepare(RECENT_ENTRIES_SQL)?;
    let mut rows = stmt.query([cutoff_unix])?;

    let mut entries = Vec::new();
    let mut skipped = 0usize;
    while let Some(row) = rows.next()? {
        let id: i64 = row.get("id")?;
        if excluded.contains(&id) {
            skipped += 1;
            continue;
        }
        let raw_content: String = row.get::<_, Option<String>>("content")?.unwrap_or_default();
        let published: i64 = row.get("date")?;
        entries.push(Entry {
            id,
            title: row.get::<_, Option<String>>("title")?.unwrap_or_default(),
            author: row.get("author")?,
            content: clean_html(&raw_content),
            raw_content,
            link: row.get::<_, Option<String>>("link")?.unwrap_or_default(),
            published_at: DateTime::from_timestamp(published, 0).unwrap_or(DateTime::UNIX_EPOCH),
            category: row
                .get::<_, Option<String>>("category")?
                .unwrap_or_else(|| "Uncategorized".to_string()),
            feed_name: row
                .get::<_, Option<String>>("feed_name")?
                .unwrap_or_default(),
        });
    }

    debug!(
        count = entries.len(),
        skipped, cutoff_unix, "fetched recent entries"
    );
    Ok(entries)
}
