use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinHandle;
use validator::Validate;

use super::{FlowContext, Subscriptions};
use crate::error::{ClientError, Result};
use crate::model::User;
use crate::navigation::{LOGIN_ROUTE, PASSWORD_RESET_ROUTE, USER_MANAGEMENT_ROUTE};
use crate::token::JWT_TOKEN_HEADER;

/// Values of the login screen.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(
        length(min = 5, max = 20, message = "Username must contain 5 to 20 characters."),
        custom(
            function = "super::validate_username",
            message = "Username must be alphanumeric."
        )
    )]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
    pub remember_me: bool,
}

/// Login screen controller.
pub struct LoginFlow {
    context: FlowContext,
    subscriptions: Subscriptions,
    loading: Arc<AtomicBool>,
}

impl LoginFlow {
    pub fn new(context: FlowContext) -> Self {
        Self {
            context,
            subscriptions: Subscriptions::default(),
            loading: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a login call is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Route the user depending on the session, then build the initial form.
    ///
    /// The username is pre-filled from the remembered user.
    pub async fn on_init(&self) -> LoginForm {
        if self.context.auth.is_login() {
            self.context
                .navigate_and_inform(USER_MANAGEMENT_ROUTE, "You already logged in !")
                .await;
        } else {
            self.context
                .navigate_and_inform(LOGIN_ROUTE, "Welcome !")
                .await;
        }

        match self.context.auth.get_user_from_local_storage() {
            Some(user) => LoginForm {
                username: user.username,
                remember_me: true,
                ..Default::default()
            },
            None => LoginForm::default(),
        }
    }

    /// Validate `form` and start the login call.
    ///
    /// On success the token is saved, the login body is remembered as is
    /// when asked to, then the user lands on the management page. The body
    /// is never decoded into a [`User`]. Failures are notified
    /// and also returned through the handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn on_login(&self, form: LoginForm) -> Result<JoinHandle<Result<()>>> {
        form.validate()?;

        self.loading.store(true, Ordering::Release);
        let context = self.context.clone();
        let loading = Arc::clone(&self.loading);

        let handle = tokio::spawn(async move {
            let outcome = login(&context, form).await;
            loading.store(false, Ordering::Release);

            if let Err(err) = &outcome {
                tracing::warn!(error = %err, "login failed");
                let (message, title) = err.notification();
                context.notifier.error(&message, &title);
            }
            outcome
        });

        self.subscriptions.push(handle.abort_handle());
        Ok(handle)
    }

    /// Go to the password reset request page.
    pub async fn on_reset_password(&self) {
        self.context.navigate(PASSWORD_RESET_ROUTE).await;
    }

    /// Discard every pending call.
    pub fn on_destroy(&self) {
        self.subscriptions.abort_all();
        self.loading.store(false, Ordering::Release);
    }
}

async fn login(context: &FlowContext, form: LoginForm) -> Result<()> {
    let auth = &context.auth;
    let response = auth
        .login(&User::credentials(&form.username, &form.password))
        .await?;

    let token = response
        .header(JWT_TOKEN_HEADER)
        .filter(|token| !token.is_empty())
        .ok_or(ClientError::MissingToken)?;
    auth.save_token(token)?;

    if form.remember_me {
        // Kept verbatim, unknown fields included.
        match response.json::<Value>() {
            Ok(body) => auth.add_user_to_local_storage(&body)?,
            Err(err) => {
                tracing::warn!(error = %err, "login body is not JSON, user not remembered")
            },
        }
    }

    context.navigate(USER_MANAGEMENT_ROUTE).await;
    Ok(())
}
