//! Query caching.
//!
//! # Data Flow
//! ```text
//! Read handler:
//!     → keys.rs (deterministic key from collection + query params)
//!     → ttl.rs get → hit: return cached value
//!                  → miss: query database, ttl.rs set
//!
//! Write handler:
//!     → ttl.rs invalidate_prefix(namespace_prefix(collection))
//!
//! Background:
//!     sweeper task → ttl.rs sweep_expired on a fixed interval
//! ```

pub mod keys;
pub mod ttl;

pub use keys::{entity_key, namespace_prefix, query_key};
pub use ttl::{CacheStats, TtlCache};
