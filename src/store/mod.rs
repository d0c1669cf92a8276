//! # Store layer
//!
//! ```text
//! CacheStoreAdapter               <- key normalization + enum dispatch
//!   ├── Redis(RedisStoreService)  <- ConnectionManager-based async Redis
//!   ├── Memory(MemoryStoreService)<- in-process, for tests/single instance
//!   └── NoOp(NoOpStoreService)    <- always-miss, never-write fallback
//! ```
//!
//! ## Design Decisions
//!
//! - **Enum dispatch**: zero vtable overhead for the hot read path
//! - **Graceful degradation**: Redis failure → NoOp fallback, never blocks
//!   startup
//! - **Keys normalized once**: digest + prefix happen at the adapter so
//!   providers and external invalidation tooling agree on wire keys

pub mod adapter;
pub mod providers;
pub mod traits;

pub use adapter::CacheStoreAdapter;
pub use providers::{MemoryStoreService, NoOpStoreService};
pub use traits::StoreService;

#[cfg(feature = "redis-store")]
pub use providers::RedisStoreService;
