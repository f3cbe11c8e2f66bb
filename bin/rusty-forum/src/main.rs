//! # Rusty-Forum Binary
//!
//! Assembles the store selected by compile-time features, then brings its
//! schema up to date. Transports embed `rf_core::ForumService` on top of the
//! same store.

use rf_config::{LogSettings, Settings};
use tracing::info;
use tracing_subscriber::EnvFilter;

// Feature-gated imports: the store is chosen at compile time
#[cfg(feature = "db-sqlite")]
use rf_db_sqlite::SqliteForumRepo;

#[cfg(not(feature = "db-sqlite"))]
compile_error!("enable a database feature, e.g. `--features db-sqlite`");

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_tracing(&settings.log);

    // 1. Initialize Database Implementation (applies pending migrations)
    #[cfg(feature = "db-sqlite")]
    let repo = SqliteForumRepo::connect(
        settings.database.url(),
        settings.database.max_connections,
        settings.database.create_if_missing,
    )
    .await?;

    repo.pool().close().await;
    info!(
        max_connections = settings.database.max_connections,
        "Rusty-Forum store is up to date"
    );
    Ok(())
}
