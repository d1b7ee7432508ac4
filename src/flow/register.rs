use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use validator::Validate;

use super::{FlowContext, Subscriptions};
use crate::error::Result;
use crate::model::User;
use crate::navigation::{LOGIN_ROUTE, USER_MANAGEMENT_ROUTE};

/// Values of the registration screen.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct RegisterForm {
    #[validate(length(min = 1, message = "First name is required."))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required."))]
    pub last_name: String,
    #[validate(
        length(min = 5, max = 20, message = "Username must contain 5 to 20 characters."),
        custom(
            function = "super::validate_username",
            message = "Username must be alphanumeric."
        )
    )]
    pub username: String,
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
}

impl From<RegisterForm> for User {
    fn from(form: RegisterForm) -> Self {
        User {
            first_name: form.first_name,
            last_name: form.last_name,
            username: form.username,
            email: form.email,
            ..Default::default()
        }
    }
}

/// Registration screen controller.
pub struct RegisterFlow {
    context: FlowContext,
    subscriptions: Subscriptions,
}

impl RegisterFlow {
    pub fn new(context: FlowContext) -> Self {
        Self {
            context,
            subscriptions: Subscriptions::default(),
        }
    }

    /// Logged-in users have nothing to register.
    pub async fn on_init(&self) {
        if self.context.auth.is_login() {
            self.context.navigate(USER_MANAGEMENT_ROUTE).await;
        }
    }

    /// Validate `form` and start the registration call.
    ///
    /// The backend mails the generated password, so a success sends the user
    /// to the login page.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn on_register(&self, form: RegisterForm) -> Result<JoinHandle<Result<User>>> {
        form.validate()?;

        let context = self.context.clone();
        let handle = tokio::spawn(async move {
            match context.auth.register(&form.into()).await {
                Ok(user) => {
                    context.notifier.success(
                        &format!(
                            "A new account was created for {}. Please check your email for password to log in.",
                            user.first_name
                        ),
                        "Success",
                    );
                    context.navigate(LOGIN_ROUTE).await;
                    Ok(user)
                },
                Err(err) => {
                    tracing::warn!(error = %err, "registration failed");
                    let (message, title) = err.notification();
                    context.notifier.error(&message, &title);
                    Err(err)
                },
            }
        });

        self.subscriptions.push(handle.abort_handle());
        Ok(handle)
    }

    /// Discard every pending call.
    pub fn on_destroy(&self) {
        self.subscriptions.abort_all();
    }
}
