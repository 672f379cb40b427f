//! Data layer module
//!
//! All state here is in-memory and volatile:
//! - Repository-list cache (TTL-bounded, per session)

mod cache;

pub use cache::RepoListCache;
