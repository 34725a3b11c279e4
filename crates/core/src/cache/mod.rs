//! Token cache and cache key derivation

pub mod keys;
pub mod memory;
pub mod ports;
pub mod token_cache;

pub use memory::InMemoryTokenStore;
pub use ports::TokenCacheStore;
pub use token_cache::TokenCache;
