//! # ForumService
//!
//! Orchestrates thread resolution, bulk post creation, traversal, edits and
//! votes on top of the storage ports. Holds no mutable state of its own; all
//! ordering and atomicity come from the store.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::error::{AppError, Result};
use crate::models::{
    NewPost, Post, PostCandidate, PostDetails, Related, Thread, ThreadPatch, Vote,
};
use crate::resolver::ThreadToken;
use crate::traits::{PostRepo, ThreadRepo, UserDirectory, VoteLedger};
use crate::traversal::{PageQuery, PageRequest, Traversal};

/// Shared by every request worker; cheap to clone.
#[derive(Clone)]
pub struct ForumService {
    threads: Arc<dyn ThreadRepo>,
    posts: Arc<dyn PostRepo>,
    users: Arc<dyn UserDirectory>,
    votes: Arc<dyn VoteLedger>,
}

impl ForumService {
    pub fn new(
        threads: Arc<dyn ThreadRepo>,
        posts: Arc<dyn PostRepo>,
        users: Arc<dyn UserDirectory>,
        votes: Arc<dyn VoteLedger>,
    ) -> Self {
        Self { threads, posts, users, votes }
    }

    async fn resolve(&self, slug_or_id: &str) -> Result<Thread> {
        ThreadToken::parse(slug_or_id).resolve(self.threads.as_ref()).await
    }

    /// Thread details with the live vote score.
    #[instrument(skip(self))]
    pub async fn get_thread(&self, slug_or_id: &str) -> Result<Thread> {
        self.resolve(slug_or_id).await
    }

    /// Validates and atomically inserts a batch of posts into one thread.
    ///
    /// Every candidate shares one creation timestamp, so flat order inside the
    /// batch falls back to the ids the store assigns.
    #[instrument(skip(self, candidates), fields(batch = candidates.len()))]
    pub async fn create_posts(
        &self,
        slug_or_id: &str,
        candidates: Vec<PostCandidate>,
    ) -> Result<Vec<Post>> {
        let thread = self.resolve(slug_or_id).await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        // Parents repeat a lot inside one batch (replies to the same post).
        let mut checked: HashSet<i64> = HashSet::new();
        for candidate in &candidates {
            let parent_id = candidate.parent;
            if parent_id == 0 || checked.contains(&parent_id) {
                continue;
            }
            let parent = self
                .posts
                .get_post(parent_id)
                .await?
                .ok_or(AppError::ParentNotFound(parent_id))?;
            if parent.forum != thread.forum || parent.thread != thread.id {
                debug!(parent = parent_id, parent_thread = parent.thread, "rejecting cross-thread parent");
                return Err(AppError::CrossThreadParent { parent: parent_id, thread: thread.id });
            }
            checked.insert(parent_id);
        }

        let created = Utc::now();
        let batch = candidates
            .into_iter()
            .map(|c| NewPost {
                author: c.author,
                message: c.message,
                parent: c.parent,
                thread: thread.id,
                forum: thread.forum.clone(),
                created,
            })
            .collect();

        let posts = self.posts.insert_posts(batch).await?;
        info!(thread = thread.id, inserted = posts.len(), "posts created");
        Ok(posts)
    }

    /// One page of a thread's posts in the requested order.
    #[instrument(skip(self))]
    pub async fn get_posts(&self, slug_or_id: &str, request: PageRequest) -> Result<Vec<Post>> {
        let thread = self.resolve(slug_or_id).await?;

        let cursor = match request.cursor() {
            Some(since) => {
                let post = self
                    .posts
                    .get_post(since)
                    .await?
                    .ok_or(AppError::CursorNotFound(since))?;
                if post.thread != thread.id {
                    return Err(AppError::CursorOutsideThread { since, thread: thread.id });
                }
                Some(post)
            }
            None => None,
        };

        let query = PageQuery {
            thread: thread.id,
            traversal: Traversal::plan(request.sort, cursor.as_ref()),
            limit: request.effective_limit(),
            direction: request.direction,
        };
        let page = self.posts.list_posts(&query).await?;
        debug!(thread = thread.id, sort = query.traversal.mode().as_str(), returned = page.len(), "page served");
        Ok(page)
    }

    #[instrument(skip(self))]
    pub async fn get_post(&self, id: i64) -> Result<Post> {
        self.posts.get_post(id).await?.ok_or(AppError::PostNotFound(id))
    }

    /// A post plus the related entities the caller asked for.
    #[instrument(skip(self))]
    pub async fn post_details(&self, id: i64, related: &[Related]) -> Result<PostDetails> {
        let post = self.get_post(id).await?;
        let mut details = PostDetails { post, author: None, thread: None };

        for item in related {
            match item {
                Related::User => {
                    let author = &details.post.author;
                    details.author = Some(
                        self.users
                            .resolve_user(author)
                            .await?
                            .ok_or_else(|| AppError::UserNotFound(author.clone()))?,
                    );
                }
                Related::Thread => {
                    let thread_id = details.post.thread;
                    details.thread = Some(
                        self.threads
                            .get_thread_by_id(thread_id)
                            .await?
                            .ok_or(AppError::ThreadNotFoundById(thread_id))?,
                    );
                }
                // Forum metadata belongs to the forum service.
                Related::Forum => {}
            }
        }
        Ok(details)
    }

    /// Edits a post's message. Empty or unchanged text leaves `is_edited` alone.
    #[instrument(skip(self, message))]
    pub async fn update_post(&self, id: i64, message: &str) -> Result<Post> {
        self.posts
            .update_post_message(id, message)
            .await?
            .ok_or(AppError::PostNotFound(id))
    }

    /// Replaces the non-empty fields of `patch` on the thread.
    #[instrument(skip(self, patch))]
    pub async fn update_thread(&self, slug_or_id: &str, patch: ThreadPatch) -> Result<Thread> {
        let token = ThreadToken::parse(slug_or_id);
        let thread = token.resolve(self.threads.as_ref()).await?;
        if patch.is_noop() {
            return Ok(thread);
        }
        self.threads
            .update_thread(thread.id, &patch)
            .await?
            .ok_or_else(|| token.not_found())
    }

    /// Records (or overwrites) `nickname`'s vote and returns the thread with
    /// its refreshed score.
    #[instrument(skip(self))]
    pub async fn vote(&self, slug_or_id: &str, nickname: &str, voice: i32) -> Result<Thread> {
        if voice != 1 && voice != -1 {
            return Err(AppError::Validation(format!("vote must be -1 or 1, got {voice}")));
        }
        let token = ThreadToken::parse(slug_or_id);
        let thread = token.resolve(self.threads.as_ref()).await?;
        let user = self
            .users
            .resolve_user(nickname)
            .await?
            .ok_or_else(|| AppError::UserNotFound(nickname.to_string()))?;

        self.votes
            .upsert_vote(&Vote { nickname: user.nickname, thread: thread.id, voice })
            .await?;

        self.threads
            .get_thread_by_id(thread.id)
            .await?
            .ok_or_else(|| token.not_found())
    }
}
