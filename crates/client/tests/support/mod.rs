// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process mock of the parkbnb API for integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use parkbnb_client::session::store::SessionStore;
use parkbnb_client::{ApiClient, ClientConfig};

/// How the mock answers `POST /auth/refresh`.
#[derive(Clone)]
pub enum RefreshBehavior {
    /// Issue this access token (and make it valid).
    Issue(&'static str),
    /// Reject with the given status.
    Reject(u16),
}

pub struct Backend {
    valid_tokens: Mutex<HashSet<String>>,
    refresh: Mutex<RefreshBehavior>,
    refresh_delay: Mutex<Duration>,
    pub refresh_calls: AtomicU32,
    /// `(path, Authorization header)` for every authenticated call.
    seen: Mutex<Vec<(String, Option<String>)>>,
    /// Bodies received by `PATCH /profile/`.
    patches: Mutex<Vec<Value>>,
    /// Bodies received by `POST /signup`.
    signups: Mutex<Vec<Value>>,
    profile: Mutex<Value>,
}

impl Backend {
    fn new() -> Self {
        Self {
            valid_tokens: Mutex::new(HashSet::new()),
            refresh: Mutex::new(RefreshBehavior::Issue("T2")),
            refresh_delay: Mutex::new(Duration::ZERO),
            refresh_calls: AtomicU32::new(0),
            seen: Mutex::new(Vec::new()),
            patches: Mutex::new(Vec::new()),
            signups: Mutex::new(Vec::new()),
            profile: Mutex::new(json!({
                "id": 1,
                "email": "guest@parkbnb.test",
                "username": "guest",
                "firstname": "Guest",
                "lastname": "User",
                "phone_number": "0712345678",
                "role": "MOTORIST",
            })),
        }
    }

    pub fn accept_token(&self, token: &str) {
        self.valid_tokens.lock().expect("lock").insert(token.to_owned());
    }

    pub fn revoke_all(&self) {
        self.valid_tokens.lock().expect("lock").clear();
    }

    pub fn set_refresh(&self, behavior: RefreshBehavior) {
        *self.refresh.lock().expect("lock") = behavior;
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock().expect("lock") = delay;
    }

    pub fn refresh_count(&self) -> u32 {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<(String, Option<String>)> {
        self.seen.lock().expect("lock").clone()
    }

    pub fn patches(&self) -> Vec<Value> {
        self.patches.lock().expect("lock").clone()
    }

    pub fn signups(&self) -> Vec<Value> {
        self.signups.lock().expect("lock").clone()
    }

    /// Record the call and check its bearer token.
    fn authorize(&self, path: &str, headers: &HeaderMap) -> bool {
        let auth = headers.get("authorization").and_then(|v| v.to_str().ok()).map(str::to_owned);
        self.seen.lock().expect("lock").push((path.to_owned(), auth.clone()));
        let Some(token) = auth.as_deref().and_then(|h| h.strip_prefix("Bearer ")) else {
            return false;
        };
        self.valid_tokens.lock().expect("lock").contains(token)
    }
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "Token is invalid or expired" })))
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["email"] == "guest@parkbnb.test" && body["password"] == "guest123" {
        (
            StatusCode::OK,
            Json(json!({
                "access_token": "T1",
                "refresh_token": "R1",
                "user": {
                    "id": 1,
                    "email": "guest@parkbnb.test",
                    "username": "guest",
                    "firstname": "Guest",
                    "lastname": "User",
                    "role": "MOTORIST",
                },
            })),
        )
    } else if body["email"] == "tenant@parkbnb.test" && body["password"] == "tenant123" {
        (
            StatusCode::OK,
            Json(json!({
                "access_token": "T9",
                "refresh_token": "R9",
                "user": { "id": 9, "email": "tenant@parkbnb.test", "role": "tenant" },
            })),
        )
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Invalid email or password" })))
    }
}

async fn signup(
    State(b): State<Arc<Backend>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    b.signups.lock().expect("lock").push(body.clone());
    (StatusCode::CREATED, Json(json!({ "id": 9, "email": body["email"], "is_active": false })))
}

async fn refresh(
    State(b): State<Arc<Backend>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    b.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let delay = *b.refresh_delay.lock().expect("lock");
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let behavior = b.refresh.lock().expect("lock").clone();
    match behavior {
        RefreshBehavior::Issue(token) if body["refresh_token"] == "R1" => {
            b.accept_token(token);
            (StatusCode::OK, Json(json!({ "access_token": token })))
        }
        RefreshBehavior::Issue(_) => unauthorized(),
        RefreshBehavior::Reject(status) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::UNAUTHORIZED),
            Json(json!({ "detail": "Token is invalid or expired" })),
        ),
    }
}

async fn get_profile(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if !b.authorize("/profile/", &headers) {
        return unauthorized();
    }
    (StatusCode::OK, Json(b.profile.lock().expect("lock").clone()))
}

async fn patch_profile(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !b.authorize("/profile/", &headers) {
        return unauthorized();
    }
    b.patches.lock().expect("lock").push(body.clone());
    let mut profile = b.profile.lock().expect("lock");
    if let (Some(current), Some(changes)) = (profile.as_object_mut(), body.as_object()) {
        for (k, v) in changes {
            current.insert(k.clone(), v.clone());
        }
    }
    (StatusCode::OK, Json(profile.clone()))
}

async fn change_password(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !b.authorize("/profile/change-password/", &headers) {
        return unauthorized();
    }
    if body["current_password"] != "guest123x" {
        return (StatusCode::BAD_REQUEST, Json(json!({ "message": "Current password is wrong" })));
    }
    (StatusCode::OK, Json(json!({ "detail": "Password updated" })))
}

async fn always_unauthorized(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    b.authorize("/always-401", &headers);
    unauthorized()
}

async fn broken(State(b): State<Arc<Backend>>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    b.authorize("/broken", &headers);
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": "boom" })))
}

/// Start the mock on an ephemeral port. Returns the API base URL.
pub async fn spawn_backend() -> (String, Arc<Backend>) {
    let backend = Arc::new(Backend::new());
    let api = Router::new()
        .route("/login", post(login))
        .route("/signup", post(signup))
        .route("/auth/refresh", post(refresh))
        .route("/profile/", get(get_profile).patch(patch_profile))
        .route("/profile/change-password/", post(change_password))
        .route("/always-401", get(always_unauthorized))
        .route("/broken", get(broken))
        .with_state(Arc::clone(&backend));
    let app = Router::new().nest("/api/v1.0", api);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr: SocketAddr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    (format!("http://{addr}/api/v1.0"), backend)
}

/// In-memory client pointed at `base`.
pub fn client(base: &str) -> ApiClient {
    ApiClient::new(ClientConfig::with_api_url(base), SessionStore::in_memory()).expect("client")
}

/// Client logged in as the guest user, whose `T1` the backend has already
/// expired.
pub async fn logged_in_with_expired_token() -> (ApiClient, Arc<Backend>) {
    let (base, backend) = spawn_backend().await;
    let client = client(&base);
    client.login("guest@parkbnb.test", "guest123").await.expect("login");
    (client, backend)
}
