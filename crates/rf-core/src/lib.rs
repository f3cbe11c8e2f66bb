//! rusty-forum/crates/rf-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Rusty-Forum:
//! the post tree, its traversal orders, and the ports a store must provide.

pub mod error;
pub mod models;
pub mod path;
pub mod resolver;
pub mod service;
pub mod traits;
pub mod traversal;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use path::MaterializedPath;
pub use resolver::ThreadToken;
pub use service::ForumService;
pub use traits::*;
pub use traversal::*;
