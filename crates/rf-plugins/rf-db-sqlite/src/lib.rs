//! # rf-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `rf-core` domain models, plus the store-side halves of the post
//! tree: id assignment, materialized path persistence and the three
//! traversal queries.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rf_core::error::{AppError, Result};
use rf_core::models::{NewPost, Post, Thread, ThreadPatch, UserIdentity, Vote};
use rf_core::path::MaterializedPath;
use rf_core::traits::{PostRepo, ThreadRepo, UserDirectory, VoteLedger};
use rf_core::traversal::{PageQuery, Traversal};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteRow,
};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, info};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub const DEFAULT_MAX_CONNECTIONS: u32 = 8;

const POST_COLUMNS: &str =
    "id, author_nickname, created, forum_slug, is_edited, message, parent_id, thread_id, path";

const THREAD_SELECT: &str = "SELECT t.id, t.slug, t.title, t.author_nickname, t.forum, t.message, t.created, \
     COALESCE((SELECT SUM(v.voice) FROM votes v WHERE v.thread_id = t.id), 0) AS votes \
     FROM threads t";

pub struct SqliteForumRepo {
    pool: SqlitePool,
}

fn internal(err: sqlx::Error) -> AppError {
    AppError::internal(err)
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn post_from_row(row: &SqliteRow) -> Result<Post> {
    let path: Vec<u8> = row.try_get("path").map_err(internal)?;
    Ok(Post {
        id: row.try_get("id").map_err(internal)?,
        author: row.try_get("author_nickname").map_err(internal)?,
        created: row.try_get("created").map_err(internal)?,
        forum: row.try_get("forum_slug").map_err(internal)?,
        is_edited: row.try_get("is_edited").map_err(internal)?,
        message: row.try_get("message").map_err(internal)?,
        parent: row.try_get("parent_id").map_err(internal)?,
        thread: row.try_get("thread_id").map_err(internal)?,
        path: MaterializedPath::decode(&path)?,
    })
}

fn thread_from_row(row: &SqliteRow) -> Result<Thread> {
    Ok(Thread {
        id: row.try_get("id").map_err(internal)?,
        slug: row.try_get("slug").map_err(internal)?,
        title: row.try_get("title").map_err(internal)?,
        author: row.try_get("author_nickname").map_err(internal)?,
        forum: row.try_get("forum").map_err(internal)?,
        message: row.try_get("message").map_err(internal)?,
        created: row.try_get("created").map_err(internal)?,
        votes: row.try_get("votes").map_err(internal)?,
    })
}

/// Reads a stored path through the transaction's connection.
async fn load_path(conn: &mut SqliteConnection, id: i64) -> Result<Option<MaterializedPath>> {
    let bytes: Option<Vec<u8>> = sqlx::query_scalar("SELECT path FROM posts WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(internal)?;
    bytes.map(|b| MaterializedPath::decode(&b)).transpose()
}

/// The nickname as registered, whatever case the caller typed.
async fn canonical_nickname(conn: &mut SqliteConnection, nickname: &str) -> Result<Option<String>> {
    sqlx::query_scalar("SELECT nickname FROM users WHERE nickname = ?")
        .bind(nickname)
        .fetch_optional(conn)
        .await
        .map_err(internal)
}

impl SqliteForumRepo {
    /// Opens (or creates) the database at `url` and applies pending migrations.
    pub async fn new(url: &str) -> Result<Self> {
        Self::connect(url, DEFAULT_MAX_CONNECTIONS, true).await
    }

    /// In-memory databases live and die with their connection, so they are
    /// pinned to a single connection that never expires.
    pub async fn connect(url: &str, max_connections: u32, create_if_missing: bool) -> Result<Self> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let mut options = SqliteConnectOptions::from_str(url)
            .map_err(internal)?
            .create_if_missing(create_if_missing)
            .foreign_keys(true);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections)
        };
        let pool = pool_options.connect_with(options).await.map_err(internal)?;

        MIGRATOR.run(&pool).await.map_err(AppError::internal)?;
        info!(in_memory, "sqlite store ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn fetch_thread(&self, clause: &str, key: ThreadKey<'_>) -> Result<Option<Thread>> {
        let sql = format!("{THREAD_SELECT} WHERE {clause}");
        let query = sqlx::query(&sql);
        let query = match key {
            ThreadKey::Id(id) => query.bind(id),
            ThreadKey::Slug(slug) => query.bind(slug),
        };
        let row = query.fetch_optional(&self.pool).await.map_err(internal)?;
        row.as_ref().map(thread_from_row).transpose()
    }
}

enum ThreadKey<'a> {
    Id(i64),
    Slug(&'a str),
}

#[async_trait]
impl ThreadRepo for SqliteForumRepo {
    async fn get_thread_by_id(&self, id: i64) -> Result<Option<Thread>> {
        self.fetch_thread("t.id = ?", ThreadKey::Id(id)).await
    }

    async fn get_thread_by_slug(&self, slug: &str) -> Result<Option<Thread>> {
        self.fetch_thread("t.slug = ?", ThreadKey::Slug(slug)).await
    }

    async fn update_thread(&self, id: i64, patch: &ThreadPatch) -> Result<Option<Thread>> {
        let done = sqlx::query(
            "UPDATE threads \
             SET message = COALESCE(NULLIF(?, ''), message), \
                 title = COALESCE(NULLIF(?, ''), title) \
             WHERE id = ?",
        )
        .bind(&patch.message)
        .bind(&patch.title)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(internal)?;

        if done.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_thread_by_id(id).await
    }
}

#[async_trait]
impl PostRepo for SqliteForumRepo {
    async fn get_post(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        row.as_ref().map(post_from_row).transpose()
    }

    /// Atomic insert of a whole batch.
    ///
    /// # Developer Note
    /// Ids come from the INSERT itself, so each path is written right after
    /// its row, inside the same transaction. Dropping `tx` on any error rolls
    /// the entire batch back.
    async fn insert_posts(&self, posts: Vec<NewPost>) -> Result<Vec<Post>> {
        let mut tx = self.pool.begin().await.map_err(internal)?;
        let mut parent_paths: HashMap<i64, MaterializedPath> = HashMap::new();
        let mut authors: HashMap<String, String> = HashMap::new();
        let mut inserted = Vec::with_capacity(posts.len());

        for post in posts {
            let author = match authors.get(&post.author) {
                Some(nickname) => nickname.clone(),
                None => {
                    let nickname = canonical_nickname(&mut *tx, &post.author)
                        .await?
                        .ok_or_else(|| AppError::AuthorNotFound(post.author.clone()))?;
                    authors.insert(post.author.clone(), nickname.clone());
                    nickname
                }
            };

            let id: i64 = sqlx::query_scalar(
                "INSERT INTO posts (author_nickname, created, forum_slug, message, parent_id, thread_id) \
                 VALUES (?, ?, ?, ?, ?, ?) \
                 RETURNING id",
            )
            .bind(&author)
            .bind(post.created)
            .bind(&post.forum)
            .bind(&post.message)
            .bind(post.parent)
            .bind(post.thread)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    AppError::AuthorNotFound(post.author.clone())
                } else if is_unique_violation(&e) {
                    AppError::DuplicateInBatch
                } else {
                    internal(e)
                }
            })?;

            let path = if post.parent == 0 {
                MaterializedPath::root(id)
            } else {
                let parent = match parent_paths.get(&post.parent) {
                    Some(path) => path.clone(),
                    None => {
                        let path = load_path(&mut *tx, post.parent)
                            .await?
                            .ok_or(AppError::ParentNotFound(post.parent))?;
                        parent_paths.insert(post.parent, path.clone());
                        path
                    }
                };
                parent.child(id)
            };

            sqlx::query("UPDATE posts SET path = ?, root_id = ? WHERE id = ?")
                .bind(path.encode())
                .bind(path.root_id().unwrap_or(id))
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(internal)?;

            inserted.push(Post {
                id,
                author,
                created: post.created,
                forum: post.forum,
                is_edited: false,
                message: post.message,
                parent: post.parent,
                thread: post.thread,
                path,
            });
        }

        tx.commit().await.map_err(internal)?;
        debug!(count = inserted.len(), "post batch committed");
        Ok(inserted)
    }

    async fn list_posts(&self, query: &PageQuery) -> Result<Vec<Post>> {
        let desc = query.direction.is_desc();
        let after = if desc { " < " } else { " > " };
        let limit = i64::from(query.limit);

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts WHERE thread_id = "));
        qb.push_bind(query.thread);

        match &query.traversal {
            Traversal::Flat { after_id } => {
                if let Some(since) = after_id {
                    qb.push(" AND id").push(after).push_bind(*since);
                }
                qb.push(if desc {
                    " ORDER BY created DESC, id DESC"
                } else {
                    " ORDER BY created, id"
                });
                qb.push(" LIMIT ").push_bind(limit);
            }
            Traversal::Tree { after_path } => {
                if let Some(since) = after_path {
                    qb.push(" AND path").push(after).push_bind(since.encode());
                }
                qb.push(if desc { " ORDER BY path DESC" } else { " ORDER BY path" });
                qb.push(" LIMIT ").push_bind(limit);
            }
            Traversal::ParentTree { after_root } => {
                qb.push(" AND root_id IN (SELECT id FROM posts WHERE thread_id = ")
                    .push_bind(query.thread)
                    .push(" AND parent_id = 0");
                if let Some(root) = after_root {
                    qb.push(" AND id").push(after).push_bind(*root);
                }
                qb.push(if desc { " ORDER BY id DESC" } else { " ORDER BY id" });
                qb.push(" LIMIT ").push_bind(limit).push(")");
                qb.push(if desc {
                    " ORDER BY root_id DESC, path"
                } else {
                    " ORDER BY root_id, path"
                });
            }
        }

        let rows = qb.build().fetch_all(&self.pool).await.map_err(internal)?;
        rows.iter().map(post_from_row).collect()
    }

    async fn update_post_message(&self, id: i64, message: &str) -> Result<Option<Post>> {
        // SET expressions all see the row as it was before the update.
        let done = sqlx::query(
            "UPDATE posts \
             SET is_edited = CASE WHEN COALESCE(NULLIF(?, ''), message) <> message THEN 1 ELSE is_edited END, \
                 message = COALESCE(NULLIF(?, ''), message) \
             WHERE id = ?",
        )
        .bind(message)
        .bind(message)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(internal)?;

        if done.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_post(id).await
    }
}

#[async_trait]
impl UserDirectory for SqliteForumRepo {
    async fn resolve_user(&self, nickname: &str) -> Result<Option<UserIdentity>> {
        let row = sqlx::query("SELECT nickname, fullname, email, about FROM users WHERE nickname = ?")
            .bind(nickname)
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;

        row.map(|row| {
            Ok(UserIdentity {
                nickname: row.try_get("nickname").map_err(internal)?,
                fullname: row.try_get("fullname").map_err(internal)?,
                email: row.try_get("email").map_err(internal)?,
                about: row.try_get("about").map_err(internal)?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl VoteLedger for SqliteForumRepo {
    async fn upsert_vote(&self, vote: &Vote) -> Result<()> {
        sqlx::query(
            "INSERT INTO votes (nickname, thread_id, voice) VALUES (?, ?, ?) \
             ON CONFLICT (nickname, thread_id) DO UPDATE SET voice = excluded.voice",
        )
        .bind(&vote.nickname)
        .bind(vote.thread)
        .bind(vote.voice)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::UserNotFound(vote.nickname.clone())
            } else {
                internal(e)
            }
        })?;
        Ok(())
    }
}
