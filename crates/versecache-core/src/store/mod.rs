//! Key-value persistence shared by the content cache and progress records.
//!
//! Both the `CacheManager` and the quiz progress store consume only the
//! narrow `KeyValueStore` interface. Two backings are provided:
//! - `FileStore`: one JSON file per key under a directory
//! - `MemoryStore`: an in-process map, used by tests and ephemeral runs
//!
//! Writes are atomic per key. No operation spans two keys.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use anyhow::Result;

/// Byte-oriented key-value store.
///
/// Implementations must make `set` atomic with respect to a single key: a
/// concurrent `get` observes either the old or the new value, never a
/// partial one.
pub trait KeyValueStore: Send + Sync {
    /// Read the value for `key`, `None` if absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Create or overwrite the value for `key`.
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;
}
