//! Screen controllers driving the services, decoupled from any UI toolkit.

mod login;
mod register;

pub use login::{LoginFlow, LoginForm};
pub use register::{RegisterFlow, RegisterForm};

use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use regex_lite::Regex;
use tokio::task::AbortHandle;
use validator::ValidationError;

use crate::auth::AuthenticationService;
use crate::navigation::Navigator;
use crate::notification::Notifier;

static ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]+$").unwrap());

/// Collaborators shared by every flow.
#[derive(Clone)]
pub struct FlowContext {
    pub auth: Arc<AuthenticationService>,
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
}

impl FlowContext {
    pub fn new(
        auth: Arc<AuthenticationService>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            auth,
            navigator,
            notifier,
        }
    }

    /// Navigate, then show an info notification.
    ///
    /// A failed navigation is only logged.
    pub(crate) async fn navigate_and_inform(&self, route: &str, message: &str) {
        match self.navigator.navigate_by_url(route).await {
            Ok(()) => self.notifier.info(message, "Information"),
            Err(err) => tracing::error!(error = %err, route, "navigation failed"),
        }
    }

    pub(crate) async fn navigate(&self, route: &str) {
        if let Err(err) = self.navigator.navigate_by_url(route).await {
            tracing::error!(error = %err, route, "navigation failed");
        }
    }
}

/// Pending calls of a flow. Aborting them discards their continuations.
#[derive(Default)]
pub(crate) struct Subscriptions(Mutex<Vec<AbortHandle>>);

impl Subscriptions {
    pub(crate) fn push(&self, handle: AbortHandle) {
        let mut handles = self.0.lock();
        handles.retain(|handle| !handle.is_finished());
        handles.push(handle);
    }

    pub(crate) fn abort_all(&self) {
        for handle in self.0.lock().drain(..) {
            handle.abort();
        }
    }
}

/// Usernames are plain ASCII letters and digits.
pub(crate) fn validate_username(username: &str) -> Result<(), ValidationError> {
    if ALPHANUMERIC.is_match(username) {
        Ok(())
    } else {
        Err(ValidationError::new("username"))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::clock::FixedClock;
    use crate::error::Result;
    use crate::http::mock::MockTransport;
    use crate::http::{Request, Response, Transport};
    use crate::navigation::MemoryNavigator;
    use crate::notification::tests::RecordingNotifier;
    use crate::session::TokenStore;
    use crate::storage::MemoryStore;
    use crate::token::tests::NOW;

    /// Never answers.
    pub struct PendingTransport;

    #[async_trait]
    impl Transport for PendingTransport {
        async fn send(&self, _: Request) -> Result<Response> {
            std::future::pending().await
        }
    }

    pub struct Fixture {
        pub context: FlowContext,
        pub storage: Arc<MemoryStore>,
        pub navigator: Arc<MemoryNavigator>,
        pub notifier: Arc<RecordingNotifier>,
    }

    pub fn fixture(transport: Arc<dyn Transport>) -> Fixture {
        let storage = Arc::new(MemoryStore::new());
        let navigator = Arc::new(MemoryNavigator::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let auth = Arc::new(AuthenticationService::new(
            "http://api.test",
            transport,
            Arc::new(TokenStore::new(storage.clone())),
            Arc::new(FixedClock::new(NOW)),
        ));

        Fixture {
            context: FlowContext::new(auth, navigator.clone(), notifier.clone()),
            storage,
            navigator,
            notifier,
        }
    }

    pub fn mock() -> (Arc<MockTransport>, Fixture) {
        let transport = Arc::new(MockTransport::new());
        let fixture = fixture(transport.clone());
        (transport, fixture)
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice01").is_ok());
        assert!(validate_username("alice_01").is_err());
        assert!(validate_username("élise").is_err());
        assert!(validate_username("").is_err());
    }
}
