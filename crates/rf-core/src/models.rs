//! # Domain Models
//!
//! These structs represent the core entities of Rusty-Forum.
//! Ids are assigned by the store and increase monotonically; callers never
//! supply them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::path::MaterializedPath;

/// Identity returned by the user directory for a nickname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub nickname: String,
    pub fullname: String,
    pub email: String,
    pub about: String,
}

/// A discussion thread inside a forum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: i64,
    /// Optional human readable handle, unique when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub title: String,
    pub author: String,
    /// Slug of the owning forum
    pub forum: String,
    pub message: String,
    pub created: DateTime<Utc>,
    /// Live sum of all votes, computed at read time
    pub votes: i64,
}

/// Field replacements for a thread. Empty strings leave a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadPatch {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub title: String,
}

impl ThreadPatch {
    pub fn is_noop(&self) -> bool {
        self.message.is_empty() && self.title.is_empty()
    }
}

/// The fundamental unit of conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub author: String,
    pub created: DateTime<Utc>,
    pub forum: String,
    pub is_edited: bool,
    pub message: String,
    /// 0 for a root post
    pub parent: i64,
    pub thread: i64,
    #[serde(skip)]
    pub path: MaterializedPath,
}

impl Post {
    pub fn is_root(&self) -> bool {
        self.parent == 0
    }

    /// Id of the root post this post hangs under (itself for roots).
    pub fn root_id(&self) -> i64 {
        self.path.root_id().unwrap_or(self.id)
    }
}

/// What a client submits for one post of a bulk create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCandidate {
    pub author: String,
    #[serde(default)]
    pub parent: i64,
    pub message: String,
}

/// A validated, stamped candidate ready for the store.
///
/// The store assigns the id and derives the path inside the insert
/// transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub author: String,
    pub message: String,
    pub parent: i64,
    pub thread: i64,
    pub forum: String,
    pub created: DateTime<Utc>,
}

/// A signed vote. Stored once per (nickname, thread).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub nickname: String,
    pub thread: i64,
    pub voice: i32,
}

/// Extra entities that can be attached to a post lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Related {
    User,
    Thread,
    Forum,
}

impl Related {
    /// Parses a comma separated list such as `user,thread`. Unknown entries
    /// are skipped.
    pub fn parse_list(raw: &str) -> Vec<Related> {
        let mut out = Vec::new();
        for item in raw.split(',').map(str::trim) {
            let related = match item {
                "user" => Related::User,
                "thread" => Related::Thread,
                "forum" => Related::Forum,
                _ => continue,
            };
            if !out.contains(&related) {
                out.push(related);
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetails {
    pub post: Post,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<UserIdentity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
}
