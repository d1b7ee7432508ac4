//! Authentication service: login, registration and session state.

use std::sync::Arc;

use serde::Serialize;

use crate::clock::Clock;
use crate::error::Result;
use crate::http::{Request, Response, Transport, endpoint};
use crate::model::User;
use crate::session::TokenStore;
use crate::storage::USER_KEY;
use crate::token::{Claims, TokenValidator};

/// Single source of truth for the session state.
pub struct AuthenticationService {
    host: String,
    transport: Arc<dyn Transport>,
    tokens: Arc<TokenStore>,
    validator: TokenValidator,
}

impl AuthenticationService {
    pub fn new(
        host: &str,
        transport: Arc<dyn Transport>,
        tokens: Arc<TokenStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            host: host.trim_end_matches('/').to_owned(),
            transport,
            tokens,
            validator: TokenValidator::new(clock),
        }
    }

    /// Base URL of the backend.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// `POST {host}/user/login`.
    ///
    /// The token travels in the `Jwt-Token` response header, never in the
    /// body, so the whole response is handed back.
    pub async fn login(&self, user: &User) -> Result<Response> {
        let url = endpoint(&self.host, &["user", "login"])?;
        let response = self
            .transport
            .send(Request::post(url).json(user)?)
            .await?
            .error_for_status()?;

        tracing::info!(username = %user.username, "logged in");
        Ok(response)
    }

    /// `POST {host}/user/register`, returns the created user.
    pub async fn register(&self, user: &User) -> Result<User> {
        let url = endpoint(&self.host, &["user", "register"])?;
        let created: User = self
            .transport
            .send(Request::post(url).json(user)?)
            .await?
            .error_for_status()?
            .json()?;

        tracing::info!(username = %created.username, "account registered");
        Ok(created)
    }

    /// Forget the session and wipe the `user`, `token` and `users` keys.
    pub fn logout(&self) -> Result<()> {
        self.tokens.clear()?;
        tracing::info!("logged out");
        Ok(())
    }

    pub fn save_token(&self, token: &str) -> Result<()> {
        self.tokens.save_token(token)
    }

    /// Must precede [`Self::get_token`] for it to reflect storage.
    pub fn load_token(&self) -> Result<()> {
        self.tokens.load_token()
    }

    pub fn get_token(&self) -> Option<String> {
        self.tokens.token()
    }

    pub fn logged_in_username(&self) -> Option<String> {
        self.tokens.logged_in_username()
    }

    /// Remember `user` under the `user` key.
    ///
    /// Accepts the raw login body as well as a [`User`], so fields unknown
    /// to [`User`] are kept.
    pub fn add_user_to_local_storage<T: Serialize + ?Sized>(&self, user: &T) -> Result<()> {
        let json = serde_json::to_string(user)?;
        self.tokens.storage().set(USER_KEY, &json)
    }

    /// Last remembered user. Unreadable entries count as absent.
    pub fn get_user_from_local_storage(&self) -> Option<User> {
        let raw = match self.tokens.storage().get(USER_KEY) {
            Ok(raw) => raw?,
            Err(err) => {
                tracing::warn!(error = %err, "cannot read remembered user");
                return None;
            },
        };

        serde_json::from_str(&raw)
            .inspect_err(|err| tracing::warn!(error = %err, "remembered user is malformed"))
            .ok()
    }

    /// Claims of the current session, if it is still alive.
    ///
    /// Same side effects as [`Self::is_login`].
    pub fn current_claims(&self) -> Option<Claims> {
        if let Err(err) = self.tokens.load_token() {
            tracing::warn!(error = %err, "cannot reload token from storage");
        }
        let token = self.tokens.token();

        match self.validator.validate(token.as_deref()) {
            Some(claims) => {
                if let Some(subject) = claims.subject() {
                    self.tokens.set_logged_in_username(subject);
                }
                Some(claims)
            },
            None => {
                if token.is_some() {
                    tracing::warn!("stale session wiped");
                }
                if let Err(err) = self.logout() {
                    tracing::error!(error = %err, "cannot wipe stale session");
                }
                None
            },
        }
    }

    /// Whether a live session exists.
    ///
    /// NOT read-only: the token is reloaded from storage, and an invalid
    /// session (missing, malformed, subjectless or expired token) is fully
    /// logged out before `false` is returned.
    pub fn is_login(&self) -> bool {
        self.current_claims().is_some()
    }
}
