//! Concrete store providers behind the `StoreService` trait

pub mod memory;
pub mod noop;

#[cfg(feature = "redis-store")]
pub mod redis;

pub use memory::MemoryStoreService;
pub use noop::NoOpStoreService;

#[cfg(feature = "redis-store")]
pub use redis::RedisStoreService;
