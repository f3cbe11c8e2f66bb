//! Shared fixtures: an in-memory store with a few users, forums and threads,
//! wired into a `ForumService`.
//!
//! Seeded data:
//! - users `alice`, `bob`, `carol`
//! - forums `rust`, `golang`
//! - thread 1 `borrowck` in `rust`, thread 2 `goroutines` in `golang`,
//!   thread 3 (no slug) in `rust`

use std::sync::Arc;

use chrono::Utc;
use rf_core::{ForumService, Post, PostCandidate};
use rf_db_sqlite::SqliteForumRepo;

pub struct Fixture {
    pub service: ForumService,
    pub repo: Arc<SqliteForumRepo>,
}

pub async fn fixture() -> Fixture {
    let repo = Arc::new(
        SqliteForumRepo::new("sqlite::memory:")
            .await
            .expect("in-memory store"),
    );
    seed(&repo).await;

    let service = ForumService::new(repo.clone(), repo.clone(), repo.clone(), repo.clone());
    Fixture { service, repo }
}

async fn seed(repo: &SqliteForumRepo) {
    let pool = repo.pool();
    for nick in ["alice", "bob", "carol"] {
        sqlx::query("INSERT INTO users (nickname, fullname, email, about) VALUES (?, ?, ?, ?)")
            .bind(nick)
            .bind(format!("{nick} tester"))
            .bind(format!("{nick}@example.org"))
            .bind("seeded")
            .execute(pool)
            .await
            .expect("seed user");
    }
    for (slug, owner) in [("rust", "alice"), ("golang", "bob")] {
        sqlx::query("INSERT INTO forums (slug, title, author_nickname) VALUES (?, ?, ?)")
            .bind(slug)
            .bind(format!("All about {slug}"))
            .bind(owner)
            .execute(pool)
            .await
            .expect("seed forum");
    }
    for (slug, forum) in [(Some("borrowck"), "rust"), (Some("goroutines"), "golang"), (None, "rust")] {
        sqlx::query(
            "INSERT INTO threads (slug, title, author_nickname, forum, message, created) \
             VALUES (?, 'Original title', 'alice', ?, 'Original message', ?)",
        )
        .bind(slug)
        .bind(forum)
        .bind(Utc::now())
        .execute(pool)
        .await
        .expect("seed thread");
    }
}

pub fn reply(author: &str, parent: i64, message: &str) -> PostCandidate {
    PostCandidate {
        author: author.to_string(),
        parent,
        message: message.to_string(),
    }
}

pub fn root(author: &str, message: &str) -> PostCandidate {
    reply(author, 0, message)
}

pub fn ids(posts: &[Post]) -> Vec<i64> {
    posts.iter().map(|p| p.id).collect()
}
