//! # Traversal Engine
//!
//! Three orderings over the posts of a single thread, each with an exclusive
//! `since` cursor and a direction:
//!
//! - `flat`: by `(created, id)`; the cursor compares ids only.
//! - `tree`: by materialized path (pre-order); the cursor compares full paths.
//! - `parent_tree`: pages over root posts by id, then returns every descendant
//!   of the selected roots grouped by root and ordered by path inside each
//!   group. The limit caps roots, not posts.
//!
//! The store executes a [`PageQuery`] natively. [`PageQuery::apply`] is the
//! same contract over an in-memory slice.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::Post;
use crate::path::MaterializedPath;

pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Flat,
    Tree,
    ParentTree,
}

impl SortMode {
    /// Unknown or missing modes fall back to `flat` instead of failing.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("tree") => SortMode::Tree,
            Some("parent_tree") => SortMode::ParentTree,
            _ => SortMode::Flat,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Flat => "flat",
            SortMode::Tree => "tree",
            SortMode::ParentTree => "parent_tree",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn from_desc(desc: bool) -> Self {
        if desc {
            Direction::Desc
        } else {
            Direction::Asc
        }
    }

    pub fn is_desc(&self) -> bool {
        matches!(self, Direction::Desc)
    }

    fn orient(&self, ord: Ordering) -> Ordering {
        match self {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    }

    /// True when `key` lies strictly after `cursor` in this direction.
    fn is_past<T: Ord + ?Sized>(&self, key: &T, cursor: &T) -> bool {
        self.orient(key.cmp(cursor)) == Ordering::Greater
    }
}

/// What a caller asks for when listing a thread's posts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: Option<u32>,
    pub since: Option<i64>,
    pub sort: SortMode,
    pub direction: Direction,
}

impl PageRequest {
    /// A missing or zero limit means the default page size.
    pub fn effective_limit(&self) -> u32 {
        match self.limit {
            Some(0) | None => DEFAULT_PAGE_SIZE,
            Some(limit) => limit,
        }
    }

    /// `since = 0` is treated the same as no cursor.
    pub fn cursor(&self) -> Option<i64> {
        self.since.filter(|id| *id != 0)
    }
}

/// A strategy together with its resolved cursor key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Traversal {
    Flat { after_id: Option<i64> },
    Tree { after_path: Option<MaterializedPath> },
    ParentTree { after_root: Option<i64> },
}

impl Traversal {
    /// Builds the strategy for `mode`, keyed off the already validated cursor
    /// post. Under `parent_tree` any post may be the cursor; only its root
    /// ancestor bounds the page.
    pub fn plan(mode: SortMode, cursor: Option<&Post>) -> Self {
        match mode {
            SortMode::Flat => Traversal::Flat {
                after_id: cursor.map(|p| p.id),
            },
            SortMode::Tree => Traversal::Tree {
                after_path: cursor.map(|p| p.path.clone()),
            },
            SortMode::ParentTree => Traversal::ParentTree {
                after_root: cursor.map(Post::root_id),
            },
        }
    }

    pub fn mode(&self) -> SortMode {
        match self {
            Traversal::Flat { .. } => SortMode::Flat,
            Traversal::Tree { .. } => SortMode::Tree,
            Traversal::ParentTree { .. } => SortMode::ParentTree,
        }
    }
}

/// A fully resolved page query handed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub thread: i64,
    pub traversal: Traversal,
    pub limit: u32,
    pub direction: Direction,
}

impl PageQuery {
    /// Computes the page from an in-memory set of posts. Posts of other
    /// threads are ignored.
    pub fn apply(&self, posts: &[Post]) -> Vec<Post> {
        let limit = self.limit as usize;
        let dir = self.direction;
        let mut scoped: Vec<&Post> = posts.iter().filter(|p| p.thread == self.thread).collect();

        match &self.traversal {
            Traversal::Flat { after_id } => {
                if let Some(after) = after_id {
                    scoped.retain(|p| dir.is_past(&p.id, after));
                }
                scoped.sort_by(|a, b| dir.orient((a.created, a.id).cmp(&(b.created, b.id))));
                scoped.into_iter().take(limit).cloned().collect()
            }
            Traversal::Tree { after_path } => {
                if let Some(after) = after_path {
                    scoped.retain(|p| dir.is_past(&p.path, after));
                }
                scoped.sort_by(|a, b| dir.orient(a.path.cmp(&b.path)));
                scoped.into_iter().take(limit).cloned().collect()
            }
            Traversal::ParentTree { after_root } => {
                let mut roots: Vec<i64> = scoped
                    .iter()
                    .filter(|p| p.is_root())
                    .map(|p| p.id)
                    .filter(|id| after_root.map_or(true, |after| dir.is_past(id, &after)))
                    .collect();
                roots.sort_by(|a, b| dir.orient(a.cmp(b)));
                roots.truncate(limit);

                let rank: HashMap<i64, usize> =
                    roots.iter().enumerate().map(|(i, id)| (*id, i)).collect();
                let mut page: Vec<(usize, &Post)> = scoped
                    .into_iter()
                    .filter_map(|p| rank.get(&p.root_id()).map(|r| (*r, p)))
                    .collect();
                page.sort_by(|(ra, a), (rb, b)| ra.cmp(rb).then_with(|| a.path.cmp(&b.path)));
                page.into_iter().map(|(_, p)| p.clone()).collect()
            }
        }
    }
}
