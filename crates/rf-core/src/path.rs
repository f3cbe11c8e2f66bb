//! # Materialized Paths
//!
//! Every post stores the ids of its ancestors followed by its own id. Comparing
//! two paths element by element yields a pre-order walk of the thread: a parent
//! sorts immediately before its children, siblings sort by id.
//!
//! The persisted form is a byte string of 8-byte big-endian ids. Ids are
//! positive, so byte-wise comparison of two encodings matches element-wise
//! comparison of the paths, with a proper prefix sorting first.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AppError, Result};

const SEGMENT_LEN: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterializedPath(Vec<i64>);

impl MaterializedPath {
    /// Path of a root post: just its own id.
    pub fn root(id: i64) -> Self {
        Self(vec![id])
    }

    /// Path of a reply: the parent's path with `id` appended.
    pub fn child(&self, id: i64) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend_from_slice(&self.0);
        segments.push(id);
        Self(segments)
    }

    /// Derives the path for a freshly assigned id. `parent` is `None` for roots.
    pub fn for_post(id: i64, parent: Option<&MaterializedPath>) -> Self {
        match parent {
            Some(parent) => parent.child(id),
            None => Self::root(id),
        }
    }

    /// Id of the root post this path descends from.
    pub fn root_id(&self) -> Option<i64> {
        self.0.first().copied()
    }

    /// Id of the post the path belongs to.
    pub fn leaf_id(&self) -> Option<i64> {
        self.0.last().copied()
    }

    pub fn segments(&self) -> &[i64] {
        &self.0
    }

    pub fn is_ancestor_of(&self, other: &MaterializedPath) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.0.len() * SEGMENT_LEN);
        for id in &self.0 {
            out.extend_from_slice(&id.to_be_bytes());
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() || bytes.len() % SEGMENT_LEN != 0 {
            return Err(AppError::internal(format!(
                "corrupt materialized path of {} bytes",
                bytes.len()
            )));
        }
        let segments = bytes
            .chunks_exact(SEGMENT_LEN)
            .map(|chunk| {
                let mut buf = [0u8; SEGMENT_LEN];
                buf.copy_from_slice(chunk);
                i64::from_be_bytes(buf)
            })
            .collect();
        Ok(Self(segments))
    }
}

impl From<Vec<i64>> for MaterializedPath {
    fn from(segments: Vec<i64>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for MaterializedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for id in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{id}")?;
            first = false;
        }
        Ok(())
    }
}
