//! Route changes requested by the guard and the flows.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::{ClientError, Result};

pub const LOGIN_ROUTE: &str = "/login";
pub const USER_MANAGEMENT_ROUTE: &str = "/user/management";
pub const PASSWORD_RESET_ROUTE: &str = "/auth/password-reset-request";

/// Port for the application router.
#[async_trait]
pub trait Navigator: Send + Sync {
    /// Navigate to an absolute route such as `/login`.
    async fn navigate_by_url(&self, url: &str) -> Result<()>;
}

/// Router keeping the current route and its history in memory.
#[derive(Debug)]
pub struct MemoryNavigator {
    current: watch::Sender<String>,
    history: Mutex<Vec<String>>,
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNavigator {
    pub fn new() -> Self {
        let (current, _) = watch::channel(String::from("/"));
        Self {
            current,
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn current(&self) -> String {
        self.current.borrow().clone()
    }

    /// Every route navigated to, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history.lock().clone()
    }

    /// Be notified of route changes.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.current.subscribe()
    }
}

#[async_trait]
impl Navigator for MemoryNavigator {
    async fn navigate_by_url(&self, url: &str) -> Result<()> {
        if !url.starts_with('/') {
            return Err(ClientError::Navigation(format!(
                "`{url}` is not an absolute route"
            )));
        }

        self.history.lock().push(url.to_owned());
        self.current.send_replace(url.to_owned());
        tracing::debug!(route = url, "navigated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_navigator() {
        let navigator = MemoryNavigator::new();
        let mut changes = navigator.subscribe();
        assert_eq!(navigator.current(), "/");

        navigator.navigate_by_url(LOGIN_ROUTE).await.unwrap();
        changes.changed().await.unwrap();
        assert_eq!(*changes.borrow(), LOGIN_ROUTE);

        assert!(navigator.navigate_by_url("login").await.is_err());
        assert_eq!(navigator.history(), vec![LOGIN_ROUTE.to_owned()]);
    }
}
