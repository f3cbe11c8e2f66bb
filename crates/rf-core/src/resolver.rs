//! # Thread Resolver
//!
//! Clients address threads with a single token that is either a decimal id or
//! a slug. The numeric reading is tried first; every entry point resolves the
//! token through here so the two readings never diverge.

use std::fmt;

use crate::error::{AppError, Result};
use crate::models::Thread;
use crate::traits::ThreadRepo;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadToken {
    Id(i64),
    Slug(String),
}

impl ThreadToken {
    /// Only plain ASCII digits that fit an `i64` count as an id. Signs,
    /// whitespace and overflow all make the token a slug.
    pub fn parse(raw: &str) -> Self {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = raw.parse::<i64>() {
                return ThreadToken::Id(id);
            }
        }
        ThreadToken::Slug(raw.to_string())
    }

    /// Fetches the thread, reporting which kind of lookup missed.
    pub async fn resolve(&self, threads: &dyn ThreadRepo) -> Result<Thread> {
        match self {
            ThreadToken::Id(id) => threads
                .get_thread_by_id(*id)
                .await?
                .ok_or(AppError::ThreadNotFoundById(*id)),
            ThreadToken::Slug(slug) => threads
                .get_thread_by_slug(slug)
                .await?
                .ok_or_else(|| AppError::ThreadNotFoundBySlug(slug.clone())),
        }
    }

    pub fn not_found(&self) -> AppError {
        match self {
            ThreadToken::Id(id) => AppError::ThreadNotFoundById(*id),
            ThreadToken::Slug(slug) => AppError::ThreadNotFoundBySlug(slug.clone()),
        }
    }
}

impl fmt::Display for ThreadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadToken::Id(id) => write!(f, "{id}"),
            ThreadToken::Slug(slug) => f.write_str(slug),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockThreadRepo;
    use chrono::Utc;
    use mockall::predicate::eq;

    fn thread(id: i64, slug: &str) -> Thread {
        Thread {
            id,
            slug: Some(slug.into()),
            title: "t".into(),
            author: "a".into(),
            forum: "f".into(),
            message: "m".into(),
            created: Utc::now(),
            votes: 0,
        }
    }

    #[test]
    fn numeric_tokens_parse_first() {
        assert_eq!(ThreadToken::parse("42"), ThreadToken::Id(42));
        assert_eq!(ThreadToken::parse("007"), ThreadToken::Id(7));
        assert_eq!(ThreadToken::parse("rust-42"), ThreadToken::Slug("rust-42".into()));
        assert_eq!(ThreadToken::parse("-1"), ThreadToken::Slug("-1".into()));
        assert_eq!(ThreadToken::parse("+1"), ThreadToken::Slug("+1".into()));
        assert_eq!(
            ThreadToken::parse("99999999999999999999"),
            ThreadToken::Slug("99999999999999999999".into())
        );
    }

    #[tokio::test]
    async fn resolves_by_id_and_by_slug() {
        let mut repo = MockThreadRepo::new();
        repo.expect_get_thread_by_id()
            .with(eq(7))
            .returning(|id| Ok(Some(thread(id, "seven"))));
        repo.expect_get_thread_by_slug()
            .withf(|slug| slug == "seven")
            .returning(|_| Ok(Some(thread(7, "seven"))));

        let by_id = ThreadToken::parse("7").resolve(&repo).await.unwrap();
        let by_slug = ThreadToken::parse("seven").resolve(&repo).await.unwrap();
        assert_eq!(by_id.id, 7);
        assert_eq!(by_slug.id, 7);
    }

    #[tokio::test]
    async fn misses_report_lookup_kind() {
        let mut repo = MockThreadRepo::new();
        repo.expect_get_thread_by_id().returning(|_| Ok(None));
        repo.expect_get_thread_by_slug().returning(|_| Ok(None));

        let err = ThreadToken::parse("12").resolve(&repo).await.unwrap_err();
        assert!(matches!(err, AppError::ThreadNotFoundById(12)));

        let err = ThreadToken::parse("nope").resolve(&repo).await.unwrap_err();
        assert!(matches!(err, AppError::ThreadNotFoundBySlug(ref s) if s == "nope"));
    }
}
