//! # Core Traits (Ports)
//!
//! Any storage plugin must implement these traits to be used by the binary.
//! Implementations translate their own integrity failures into [`AppError`]
//! variants; a raw store code never crosses these signatures.
//!
//! [`AppError`]: crate::error::AppError

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{NewPost, Post, Thread, ThreadPatch, UserIdentity, Vote};
use crate::traversal::PageQuery;

/// Thread metadata lookups and edits.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ThreadRepo: Send + Sync {
    async fn get_thread_by_id(&self, id: i64) -> Result<Option<Thread>>;
    async fn get_thread_by_slug(&self, slug: &str) -> Result<Option<Thread>>;

    /// Applies `patch` and returns the updated thread, or `None` if the id is
    /// unknown.
    async fn update_thread(&self, id: i64, patch: &ThreadPatch) -> Result<Option<Thread>>;
}

/// Post persistence: the immutable tree plus message edits.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepo: Send + Sync {
    async fn get_post(&self, id: i64) -> Result<Option<Post>>;

    /// Inserts the whole batch atomically, assigning ids and paths in input
    /// order. Nothing is persisted if any element fails.
    async fn insert_posts(&self, posts: Vec<NewPost>) -> Result<Vec<Post>>;

    async fn list_posts(&self, query: &PageQuery) -> Result<Vec<Post>>;

    /// Replaces the message when `message` is non-empty. `is_edited` flips only
    /// when the text actually changes. Returns `None` for an unknown id.
    async fn update_post_message(&self, id: i64, message: &str) -> Result<Option<Post>>;
}

/// Resolves nicknames to identities.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn resolve_user(&self, nickname: &str) -> Result<Option<UserIdentity>>;
}

/// Per-(user, thread) vote storage.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait VoteLedger: Send + Sync {
    /// Insert-or-overwrite keyed by `(nickname, thread)`.
    async fn upsert_vote(&self, vote: &Vote) -> Result<()>;
}
