//! Process-wide holder of the bearer token and the logged-in username.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Result;
use crate::storage::{KeyValueStore, TOKEN_KEY, USER_KEY, USERS_KEY};

/// In-memory session fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    /// Derived from the token subject. Only trustworthy right after a
    /// successful validity check.
    pub logged_in_username: Option<String>,
}

/// Owns the canonical token. Persistent storage is a durable mirror.
pub struct TokenStore {
    storage: Arc<dyn KeyValueStore>,
    session: RwLock<Session>,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            session: RwLock::new(Session::default()),
        }
    }

    /// Persistence handle shared with the caches.
    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.storage
    }

    /// Set the in-memory token and write it through to storage.
    pub fn save_token(&self, token: &str) -> Result<()> {
        self.session.write().token = Some(token.to_owned());
        self.storage.set(TOKEN_KEY, token)
    }

    /// Replace the in-memory token by the persisted one.
    ///
    /// When storage cannot be read, the in-memory token is dropped too.
    pub fn load_token(&self) -> Result<()> {
        let token = self.storage.get(TOKEN_KEY);
        let mut session = self.session.write();
        match token {
            Ok(token) => {
                session.token = token;
                Ok(())
            },
            Err(err) => {
                session.token = None;
                Err(err)
            },
        }
    }

    pub fn token(&self) -> Option<String> {
        self.session.read().token.clone()
    }

    pub fn logged_in_username(&self) -> Option<String> {
        self.session.read().logged_in_username.clone()
    }

    pub(crate) fn set_logged_in_username(&self, username: &str) {
        self.session.write().logged_in_username = Some(username.to_owned());
    }

    pub fn session(&self) -> Session {
        self.session.read().clone()
    }

    /// Forget the session in memory and wipe every persisted key.
    ///
    /// Memory is cleared first so no half-cleared session is observable
    /// even when a storage removal fails.
    pub fn clear(&self) -> Result<()> {
        *self.session.write() = Session::default();

        let mut outcome = Ok(());
        for key in [USER_KEY, TOKEN_KEY, USERS_KEY] {
            if let Err(err) = self.storage.remove(key) {
                tracing::error!(error = %err, key, "cannot remove key from storage");
                outcome = Err(err);
            }
        }
        outcome
    }
}
