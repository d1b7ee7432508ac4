//! Session-aware client for the user management API.

#![forbid(unsafe_code)]
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod flow;
pub mod guard;
pub mod http;
pub mod interceptor;
pub mod model;
pub mod navigation;
pub mod notification;
pub mod session;
pub mod storage;
pub mod telemetry;
pub mod token;
pub mod user;

use std::sync::Arc;

use crate::auth::AuthenticationService;
use crate::clock::SystemClock;
use crate::config::Configuration;
use crate::error::Result;
use crate::flow::{FlowContext, LoginFlow, RegisterFlow};
use crate::guard::AuthenticationGuard;
use crate::http::{ReqwestTransport, Transport};
use crate::interceptor::AuthInterceptor;
use crate::model::{FormData, ProfileImage, User};
use crate::navigation::{MemoryNavigator, Navigator};
use crate::notification::Notifier;
use crate::session::TokenStore;
use crate::storage::{FileStore, KeyValueStore, MemoryStore};
use crate::user::UserService;

/// State shared between commands.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Configuration>,
    pub storage: Arc<dyn KeyValueStore>,
    pub auth: Arc<AuthenticationService>,
    pub users: Arc<UserService>,
    pub guard: Arc<AuthenticationGuard>,
    pub navigator: Arc<MemoryNavigator>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn flow_context(&self) -> FlowContext {
        FlowContext::new(
            Arc::clone(&self.auth),
            Arc::clone(&self.navigator) as Arc<dyn Navigator>,
            Arc::clone(&self.notifier),
        )
    }

    pub fn login_flow(&self) -> LoginFlow {
        LoginFlow::new(self.flow_context())
    }

    pub fn register_flow(&self) -> RegisterFlow {
        RegisterFlow::new(self.flow_context())
    }

    /// Form for a new user, sent on behalf of the logged-in user.
    pub fn new_user_form(&self, user: &User, profile_image: Option<ProfileImage>) -> FormData {
        let current_username = self.auth.logged_in_username();
        self.users
            .create_user_form_data(current_username.as_deref(), user, profile_image)
    }
}

/// Initialize the application state.
pub fn initialize_state(
    config: Arc<Configuration>,
    notifier: Arc<dyn Notifier>,
) -> Result<AppState> {
    let storage: Arc<dyn KeyValueStore> = match &config.storage {
        Some(storage) => Arc::new(FileStore::new(&storage.path)?),
        None => {
            tracing::warn!("no `storage` entry, the session will not outlive the process");
            Arc::new(MemoryStore::new())
        },
    };

    let tokens = Arc::new(TokenStore::new(Arc::clone(&storage)));
    let transport: Arc<dyn Transport> = Arc::new(AuthInterceptor::new(
        ReqwestTransport::new()?,
        Arc::clone(&tokens),
        &config.host,
    ));

    let auth = Arc::new(AuthenticationService::new(
        &config.host,
        Arc::clone(&transport),
        tokens,
        Arc::new(SystemClock),
    ));
    let users = Arc::new(UserService::new(
        &config.host,
        transport,
        Arc::clone(&storage),
    ));

    let navigator = Arc::new(MemoryNavigator::new());
    let guard = Arc::new(AuthenticationGuard::new(
        Arc::clone(&auth),
        Arc::clone(&navigator) as Arc<dyn Navigator>,
        Arc::clone(&notifier),
    ));

    Ok(AppState {
        config,
        storage,
        auth,
        users,
        guard,
        navigator,
        notifier,
    })
}
