//! User directory: CRUD calls and the local list mirror.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::error::Result;
use crate::http::{Request, Transport, UploadEvent, endpoint};
use crate::model::{CustomHttpResponse, FormData, ProfileImage, User};
use crate::storage::{KeyValueStore, USERS_KEY};

/// Thin wrapper over the `/user/*` endpoints.
///
/// Every call goes out through the injected transport, which is expected to
/// be wrapped by [`crate::interceptor::AuthInterceptor`].
pub struct UserService {
    host: String,
    transport: Arc<dyn Transport>,
    storage: Arc<dyn KeyValueStore>,
}

impl UserService {
    pub fn new(host: &str, transport: Arc<dyn Transport>, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            host: host.trim_end_matches('/').to_owned(),
            transport,
            storage,
        }
    }

    /// `GET {host}/user/list`. A successful fetch overwrites the local cache.
    pub async fn get_users(&self) -> Result<Vec<User>> {
        let url = endpoint(&self.host, &["user", "list"])?;
        let users: Vec<User> = self
            .transport
            .send(Request::get(url))
            .await?
            .error_for_status()?
            .json()?;

        self.add_users_to_local_cache(&users)?;
        Ok(users)
    }

    /// `POST {host}/user/add` with a multipart form.
    pub async fn add_user(&self, form: FormData) -> Result<User> {
        let url = endpoint(&self.host, &["user", "add"])?;
        let user: User = self
            .transport
            .send(Request::post(url).multipart(form))
            .await?
            .error_for_status()?
            .json()?;

        tracing::info!(username = %user.username, "user added");
        Ok(user)
    }

    /// `POST {host}/user/update` with a multipart form.
    pub async fn update_user(&self, form: FormData) -> Result<User> {
        let url = endpoint(&self.host, &["user", "update"])?;
        let user: User = self
            .transport
            .send(Request::post(url).multipart(form))
            .await?
            .error_for_status()?
            .json()?;

        tracing::info!(username = %user.username, "user updated");
        Ok(user)
    }

    /// `GET {host}/user/reset-password/{email}`.
    pub async fn reset_password(&self, email: &str) -> Result<CustomHttpResponse> {
        let url = endpoint(&self.host, &["user", "reset-password", email])?;
        self.transport
            .send(Request::get(url))
            .await?
            .error_for_status()?
            .json()
    }

    /// `POST {host}/user/updateProfileImage`.
    ///
    /// When `events` is given it receives [`UploadEvent::Sent`], progress
    /// reports, then [`UploadEvent::Response`] once the backend answered.
    pub async fn update_profile_image(
        &self,
        form: FormData,
        events: Option<UnboundedSender<UploadEvent>>,
    ) -> Result<User> {
        let url = endpoint(&self.host, &["user", "updateProfileImage"])?;
        let mut request = Request::post(url).multipart(form);
        if let Some(events) = &events {
            request = request.progress(events.clone());
        }

        let user: User = self
            .transport
            .send(request)
            .await?
            .error_for_status()?
            .json()?;

        if let Some(events) = events {
            // Receiver may be gone already, the upload still succeeded.
            let _ = events.send(UploadEvent::Response(user.clone()));
        }
        Ok(user)
    }

    /// `DELETE {host}/user/delete/{id}`.
    pub async fn delete_user(&self, id: u64) -> Result<CustomHttpResponse> {
        let url = endpoint(&self.host, &["user", "delete", &id.to_string()])?;
        let response = self
            .transport
            .send(Request::delete(url))
            .await?
            .error_for_status()?
            .json()?;

        tracing::info!(id, "user deleted");
        Ok(response)
    }

    /// Overwrite the `users` key with `users`.
    pub fn add_users_to_local_cache(&self, users: &[User]) -> Result<()> {
        let json = serde_json::to_string(users)?;
        self.storage.set(USERS_KEY, &json)
    }

    /// Last fetched list, `None` when nothing usable is cached.
    pub fn get_users_from_local_cache(&self) -> Option<Vec<User>> {
        let raw = match self.storage.get(USERS_KEY) {
            Ok(raw) => raw?,
            Err(err) => {
                tracing::warn!(error = %err, "cannot read cached users");
                return None;
            },
        };

        serde_json::from_str(&raw)
            .inspect_err(|err| tracing::warn!(error = %err, "cached users are malformed"))
            .ok()
    }

    /// Build the multipart form expected by `/user/add` and `/user/update`.
    pub fn create_user_form_data(
        &self,
        logged_in_username: Option<&str>,
        user: &User,
        profile_image: Option<ProfileImage>,
    ) -> FormData {
        let mut form = FormData::new();
        form.append("currentUsername", logged_in_username.unwrap_or_default())
            .append("firstName", user.first_name.as_str())
            .append("lastName", user.last_name.as_str())
            .append("username", user.username.as_str())
            .append("email", user.email.as_str())
            .append("role", user.role.as_str())
            .append("isActive", user.active.to_string())
            .append("isNotLocked", user.not_locked.to_string());

        if let Some(image) = profile_image {
            form.append_file("profileImage", image);
        }
        form
    }
}
