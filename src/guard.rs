//! Gate protected routes behind a live session.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::auth::AuthenticationService;
use crate::navigation::{LOGIN_ROUTE, Navigator};
use crate::notification::Notifier;

/// Shown once the user has been sent back to the login page.
pub const FORBIDDEN_MESSAGE: &str = "You need to log in to access this page";
const FORBIDDEN_TITLE: &str = "Information";

/// Outcome of a guard check.
#[derive(Debug)]
pub struct Activation {
    pub allowed: bool,
    /// Redirect started on denial, independent of the denied navigation.
    pub redirect: Option<JoinHandle<()>>,
}

/// Route guard consulted before any protected route renders.
pub struct AuthenticationGuard {
    auth: Arc<AuthenticationService>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
}

impl AuthenticationGuard {
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

    /// Decide synchronously whether the navigation may proceed.
    pub fn can_activate(&self) -> bool {
        self.activate().allowed
    }

    /// Same as [`Self::can_activate`], exposing the redirect task.
    ///
    /// Outside a Tokio runtime the redirect cannot be started, which is
    /// logged and leaves the user where they are.
    pub fn activate(&self) -> Activation {
        if self.auth.is_login() {
            return Activation {
                allowed: true,
                redirect: None,
            };
        }

        let redirect = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => Some(runtime.spawn(redirect_to_login(
                Arc::clone(&self.navigator),
                Arc::clone(&self.notifier),
            ))),
            Err(err) => {
                tracing::error!(error = %err, "cannot redirect to login page");
                None
            },
        };

        Activation {
            allowed: false,
            redirect,
        }
    }
}

async fn redirect_to_login(navigator: Arc<dyn Navigator>, notifier: Arc<dyn Notifier>) {
    match navigator.navigate_by_url(LOGIN_ROUTE).await {
        Ok(()) => {
            tracing::debug!("navigated to login page");
            notifier.info(FORBIDDEN_MESSAGE, FORBIDDEN_TITLE);
        },
        Err(err) => tracing::error!(error = %err, "navigation to login page failed"),
    }
}
