//! End-to-end tests against a local mock of the user management API.

use std::io::Write;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};
use usermanager::config::Configuration;
use usermanager::flow::LoginForm;
use usermanager::http::UploadEvent;
use usermanager::model::{FormData, ProfileImage};
use usermanager::navigation::LOGIN_ROUTE;
use usermanager::notification::{NotificationType, Notifier};
use usermanager::storage::{KeyValueStore, TOKEN_KEY, USER_KEY, USERS_KEY};
use usermanager::{AppState, initialize_state};

/// Call seen by the backend: method, path and `Authorization` header.
type Call = (String, String, Option<String>);

#[derive(Clone, Default)]
struct Backend {
    token: String,
    calls: Arc<Mutex<Vec<Call>>>,
    uploads: Arc<Mutex<Vec<(String, usize)>>>,
}

impl Backend {
    fn record(&self, method: &str, path: &str, headers: &HeaderMap) {
        let authorization = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        self.calls
            .lock()
            .unwrap()
            .push((method.to_owned(), path.to_owned(), authorization));
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            == Some(format!("Bearer {}", self.token).as_str())
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

fn envelope(status: StatusCode, message: &str) -> Value {
    let reason = status.canonical_reason().unwrap_or_default().to_uppercase();
    json!({
        "httpStatusCode": status.as_u16(),
        "httpStatus": reason.replace(' ', "_"),
        "reason": reason,
        "message": message,
        "timeStamp": "10-14-2026 09:00:00",
    })
}

fn forbidden() -> (StatusCode, Json<Value>) {
    (
        StatusCode::FORBIDDEN,
        Json(envelope(
            StatusCode::FORBIDDEN,
            "You need to log in to access this page",
        )),
    )
}

fn alice() -> Value {
    json!({
        "id": 1,
        "userId": "5698214730",
        "firstName": "Alice",
        "lastName": "Martin",
        "username": "alice01",
        "email": "alice@example.com",
        "joinDate": 1_700_000_000_000_i64,
        "active": true,
        "notLocked": true,
        "role": "ROLE_SUPER_ADMIN",
        "authorities": ["user:read", "user:update", "user:create", "user:delete"],
    })
}

async fn login(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    backend.record("POST", "/user/login", &headers);

    if body["username"] == "alice01" && body["password"] == "secret" {
        let mut response = Json(alice()).into_response();
        response
            .headers_mut()
            .insert("jwt-token", backend.token.parse().unwrap());
        response
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(envelope(
                StatusCode::BAD_REQUEST,
                "Username / password incorrect. Please try again",
            )),
        )
            .into_response()
    }
}

async fn list(State(backend): State<Backend>, headers: HeaderMap) -> impl IntoResponse {
    backend.record("GET", "/user/list", &headers);

    if !backend.authorized(&headers) {
        return forbidden().into_response();
    }
    Json(json!([alice(), { "id": 2, "username": "bob0001", "email": "bob@example.com" }]))
        .into_response()
}

async fn reset_password(
    State(backend): State<Backend>,
    Path(email): Path<String>,
    headers: HeaderMap,
) -> Json<Value> {
    backend.record("GET", &format!("/user/reset-password/{email}"), &headers);
    Json(envelope(
        StatusCode::OK,
        &format!("An email with a new password was sent to: {email}"),
    ))
}

async fn delete_user(
    State(backend): State<Backend>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> impl IntoResponse {
    backend.record("DELETE", &format!("/user/delete/{id}"), &headers);

    if !backend.authorized(&headers) {
        return forbidden().into_response();
    }
    Json(envelope(StatusCode::OK, "User deleted successfully")).into_response()
}

async fn update_profile_image(
    State(backend): State<Backend>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> impl IntoResponse {
    backend.record("POST", "/user/updateProfileImage", &headers);

    if !backend.authorized(&headers) {
        return forbidden().into_response();
    }

    let mut username = String::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_owned();
        let data = field.bytes().await.unwrap();
        match name.as_str() {
            "username" => username = String::from_utf8(data.to_vec()).unwrap(),
            _ => backend.uploads.lock().unwrap().push((name, data.len())),
        }
    }

    Json(json!({
        "username": username,
        "profileImageUrl": format!("http://localhost:8081/user/image/{username}"),
    }))
    .into_response()
}

fn token() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let claims = json!({
        "sub": "alice01",
        "iss": "Get Array, LLC",
        "aud": "User Management Portal",
        "iat": now,
        "exp": now + 3600,
        "authorities": ["user:read", "user:update", "user:create", "user:delete"],
    });

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS512),
        &claims,
        &EncodingKey::from_secret(b"backend-secret"),
    )
    .unwrap()
}

async fn serve(backend: Backend) -> SocketAddr {
    let app = Router::new()
        .route("/user/login", post(login))
        .route("/user/list", get(list))
        .route("/user/reset-password/{email}", get(reset_password))
        .route("/user/delete/{id}", delete(delete_user))
        .route("/user/updateProfileImage", post(update_profile_image))
        .with_state(backend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    addr
}

#[derive(Default)]
struct Recorder(Mutex<Vec<(NotificationType, String, String)>>);

impl Notifier for Recorder {
    fn notify(&self, kind: NotificationType, message: &str, title: &str) {
        self.0
            .lock()
            .unwrap()
            .push((kind, message.to_owned(), title.to_owned()));
    }
}

struct Client {
    state: AppState,
    notifier: Arc<Recorder>,
    storage_path: std::path::PathBuf,
    _dir: tempfile::TempDir,
}

async fn client(addr: SocketAddr) -> Client {
    let dir = tempfile::tempdir().unwrap();
    let storage_path = dir.path().join("storage.json");
    let config_path = dir.path().join("config.yaml");

    let mut file = std::fs::File::create(&config_path).unwrap();
    writeln!(
        file,
        "host: http://{addr}/\nstorage:\n  path: {}\nlog_level: debug",
        storage_path.display()
    )
    .unwrap();

    let config = Configuration::default().path(config_path).read().unwrap();
    assert_eq!(config.host, format!("http://{addr}"));

    let notifier = Arc::new(Recorder::default());
    let state = initialize_state(config, notifier.clone()).unwrap();

    Client {
        state,
        notifier,
        storage_path,
        _dir: dir,
    }
}

fn credentials(password: &str) -> LoginForm {
    LoginForm {
        username: "alice01".into(),
        password: password.into(),
        remember_me: true,
    }
}

#[tokio::test]
async fn test_session_lifecycle() {
    let backend = Backend {
        token: token(),
        ..Default::default()
    };
    let addr = serve(backend.clone()).await;
    let Client {
        state,
        storage_path,
        _dir,
        ..
    } = client(addr).await;

    assert!(!state.guard.can_activate());

    state
        .login_flow()
        .on_login(credentials("secret"))
        .unwrap()
        .await
        .unwrap()
        .unwrap();
    let remembered: Value =
        serde_json::from_str(&state.storage.get(USER_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(remembered, alice());
    assert_eq!(state.auth.get_token(), Some(backend.token.clone()));
    assert!(state.guard.can_activate());
    assert_eq!(state.auth.logged_in_username().as_deref(), Some("alice01"));

    let users = state.users.get_users().await.unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(state.users.get_users_from_local_cache(), Some(users));

    let response = state.users.delete_user(42).await.unwrap();
    assert_eq!(response.message, "User deleted successfully");

    let response = state.users.reset_password("alice@example.com").await.unwrap();
    assert_eq!(response.reason, "OK");

    let bearer = Some(format!("Bearer {}", backend.token));
    assert_eq!(
        backend.calls(),
        vec![
            ("POST".to_owned(), "/user/login".to_owned(), None),
            ("GET".to_owned(), "/user/list".to_owned(), bearer.clone()),
            ("DELETE".to_owned(), "/user/delete/42".to_owned(), bearer),
            (
                "GET".to_owned(),
                "/user/reset-password/alice@example.com".to_owned(),
                None
            ),
        ]
    );

    // Everything survived on disk.
    let persisted: Value =
        serde_json::from_str(&std::fs::read_to_string(&storage_path).unwrap()).unwrap();
    assert_eq!(persisted[TOKEN_KEY], backend.token.as_str());
    assert!(persisted[USER_KEY].is_string());
    assert!(persisted[USERS_KEY].is_string());

    state.auth.logout().unwrap();
    let persisted: Value =
        serde_json::from_str(&std::fs::read_to_string(&storage_path).unwrap()).unwrap();
    assert_eq!(persisted, json!({}));

    let activation = state.guard.activate();
    assert!(!activation.allowed);
    activation.redirect.unwrap().await.unwrap();
    assert_eq!(state.navigator.current(), LOGIN_ROUTE);

    // The backend rejects the now tokenless call.
    let err = state.users.get_users().await.unwrap_err();
    assert_eq!(err.notification().0, "You need to log in to access this page");
    let (_, path, authorization) = backend.calls().pop().unwrap();
    assert_eq!(path, "/user/list");
    // Trailing whitespace does not survive header parsing.
    assert_eq!(authorization.as_deref().map(str::trim_end), Some("Bearer"));
}

#[tokio::test]
async fn test_bad_credentials() {
    let backend = Backend {
        token: token(),
        ..Default::default()
    };
    let addr = serve(backend.clone()).await;
    let Client {
        state, notifier, _dir, ..
    } = client(addr).await;

    let flow = state.login_flow();
    let err = flow
        .on_login(credentials("wrong"))
        .unwrap()
        .await
        .unwrap()
        .unwrap_err();

    assert_eq!(err.response().map(|body| body.http_status_code), Some(400));
    assert_eq!(
        notifier.0.lock().unwrap().last().cloned(),
        Some((
            NotificationType::Error,
            "Username / password incorrect. Please try again".to_owned(),
            "BAD REQUEST".to_owned()
        ))
    );
    assert_eq!(state.auth.get_token(), None);
    assert!(!flow.is_loading());
}

#[tokio::test]
async fn test_profile_image_upload_progress() {
    let backend = Backend {
        token: token(),
        ..Default::default()
    };
    let addr = serve(backend.clone()).await;
    let Client { state, _dir, .. } = client(addr).await;

    state
        .login_flow()
        .on_login(credentials("secret"))
        .unwrap()
        .await
        .unwrap()
        .unwrap();

    let size = 40 * 1024;
    let mut form = FormData::new();
    form.append("username", "alice01")
        .append_file("profileImage", ProfileImage::new("alice.png", vec![7; size]));

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let user = state
        .users
        .update_profile_image(form, Some(tx))
        .await
        .unwrap();
    assert_eq!(user.profile_image_url, "http://localhost:8081/user/image/alice01");

    // Every event was emitted before the call returned.
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    assert_eq!(events.first(), Some(&UploadEvent::Sent));
    assert_eq!(events.last(), Some(&UploadEvent::Response(user)));
    let progress: Vec<(u64, u64)> = events
        .iter()
        .filter_map(|event| match event {
            UploadEvent::Progress { loaded, total } => Some((*loaded, *total)),
            _ => None,
        })
        .collect();
    assert_eq!(progress.last(), Some(&(size as u64, size as u64)));
    assert!(progress.windows(2).all(|pair| pair[0].0 < pair[1].0));

    assert_eq!(
        backend.uploads.lock().unwrap().clone(),
        vec![("profileImage".to_owned(), size)]
    );
}
