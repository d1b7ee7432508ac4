//! Persistent key-value storage backing the session and local caches.
//!
//! Mirrors browser local storage: origin-scoped, string keys, string values.

mod file;
mod mem;

pub use file::FileStore;
pub use mem::MemoryStore;

use crate::error::Result;

/// Key holding the bearer token.
pub const TOKEN_KEY: &str = "token";
/// Key holding the last logged-in [`crate::model::User`] as JSON.
pub const USER_KEY: &str = "user";
/// Key holding the cached user list as a JSON array.
pub const USERS_KEY: &str = "users";

/// Port for string-keyed persistence.
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite a value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}
