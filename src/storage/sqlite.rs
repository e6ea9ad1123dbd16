//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ItemRepository trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ItemRepository, StorageError, StorageResult};
use crate::storage::{CommentRecord, ForumCount, ItemQuery, PostRecord, StoredItem};
use crate::Timestamp;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite item repository
///
/// The connection sits behind a mutex so the repository can be shared across
/// concurrently running sync tasks; each upsert is a single statement.
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Opens or creates a database file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteRepository)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRecord> {
    Ok(PostRecord {
        id: row.get(0)?,
        forum: row.get(1)?,
        title: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<CommentRecord> {
    Ok(CommentRecord {
        id: row.get(0)?,
        post_id: row.get(1)?,
        forum: row.get(2)?,
        body: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl ItemRepository for SqliteRepository {
    // ===== Writes =====

    fn upsert_post(&self, post: &PostRecord) -> StorageResult<()> {
        post.validate()?;
        self.conn()?.execute(
            "INSERT INTO posts (id, forum, title, created_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                forum = excluded.forum,
                title = excluded.title,
                created_at = excluded.created_at",
            params![post.id, post.forum, post.title, post.created_at],
        )?;
        Ok(())
    }

    fn upsert_comment(&self, comment: &CommentRecord) -> StorageResult<()> {
        comment.validate()?;
        self.conn()?.execute(
            "INSERT INTO comments (id, post_id, forum, body, created_at) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                post_id = excluded.post_id,
                forum = excluded.forum,
                body = excluded.body,
                created_at = excluded.created_at",
            params![
                comment.id,
                comment.post_id,
                comment.forum,
                comment.body,
                comment.created_at
            ],
        )?;
        Ok(())
    }

    // ===== Crawl Queries =====

    fn list_posts(&self) -> StorageResult<Vec<PostRecord>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, forum, title, created_at FROM posts ORDER BY created_at DESC")?;
        let posts = stmt
            .query_map([], post_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    fn max_comment_timestamp(&self, post_id: &str) -> StorageResult<Option<Timestamp>> {
        let max: Option<Timestamp> = self.conn()?.query_row(
            "SELECT MAX(created_at) FROM comments WHERE post_id = ?1",
            params![post_id],
            |row| row.get(0),
        )?;
        Ok(max)
    }

    fn get_post(&self, id: &str) -> StorageResult<Option<PostRecord>> {
        let post = self
            .conn()?
            .query_row(
                "SELECT id, forum, title, created_at FROM posts WHERE id = ?1",
                params![id],
                post_from_row,
            )
            .optional()?;
        Ok(post)
    }

    fn get_comment(&self, id: &str) -> StorageResult<Option<CommentRecord>> {
        let comment = self
            .conn()?
            .query_row(
                "SELECT id, post_id, forum, body, created_at FROM comments WHERE id = ?1",
                params![id],
                comment_from_row,
            )
            .optional()?;
        Ok(comment)
    }

    // ===== Read Queries =====

    fn query_items(&self, query: &ItemQuery) -> StorageResult<Vec<StoredItem>> {
        let conn = self.conn()?;
        let range = params![query.forum, query.from, query.to];

        let mut stmt = conn.prepare(
            "SELECT id, forum, title, created_at FROM posts
             WHERE forum = ?1 AND created_at >= ?2 AND created_at <= ?3",
        )?;
        let mut items = stmt
            .query_map(range, post_from_row)?
            .map(|row| row.map(StoredItem::Post))
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT id, post_id, forum, body, created_at FROM comments
             WHERE forum = ?1 AND created_at >= ?2 AND created_at <= ?3",
        )?;
        let comments = stmt
            .query_map(range, comment_from_row)?
            .map(|row| row.map(StoredItem::Comment))
            .collect::<Result<Vec<_>, _>>()?;
        items.extend(comments);

        items.retain(|item| query.matches_keyword(item.text()));
        items.sort_by(|a, b| {
            b.created_at()
                .total_cmp(&a.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(items)
    }

    fn forum_counts(&self) -> StorageResult<Vec<ForumCount>> {
        let conn = self.conn()?;
        let mut counts: BTreeMap<String, (u64, u64)> = BTreeMap::new();

        let mut stmt = conn.prepare("SELECT forum, COUNT(*) FROM posts GROUP BY forum")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
        for row in rows {
            let (forum, count) = row?;
            counts.entry(forum).or_default().0 = count as u64;
        }

        let mut stmt = conn.prepare("SELECT forum, COUNT(*) FROM comments GROUP BY forum")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
        for row in rows {
            let (forum, count) = row?;
            counts.entry(forum).or_default().1 = count as u64;
        }

        Ok(counts
            .into_iter()
            .map(|(forum, (posts, comments))| ForumCount {
                forum,
                posts,
                comments,
            })
            .collect())
    }
}
