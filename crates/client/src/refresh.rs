// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Access token renewal, at most one exchange in flight.
//!
//! Every caller that hits a 401 asks the coordinator for a fresh token. The
//! first one moves it from `Idle` to `Refreshing` and spawns the exchange;
//! everyone who arrives while it runs is parked on a one-shot channel. When
//! the exchange settles the whole queue is released with the same outcome.
//!
//! A failed exchange is fatal to the session: the store is cleared and a
//! [`SessionEvent::Redirect`] is broadcast. There is no retry.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, Mutex};

use crate::error::{extract_message, ApiError};
use crate::session::store::SessionStore;
use crate::session::{LogoutReason, SessionEvent};

/// Body of a successful `POST /auth/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

type Waiter = oneshot::Sender<Result<String, ApiError>>;

enum RefreshState {
    Idle,
    /// An exchange started under session `epoch` is on the wire.
    Refreshing { epoch: u64, waiters: Vec<Waiter> },
}

/// Coordinates token refreshes for one session store.
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    store: Arc<SessionStore>,
    http: reqwest::Client,
    refresh_url: String,
    redirect_to: String,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<SessionStore>,
        http: reqwest::Client,
        refresh_url: impl Into<String>,
        redirect_to: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(RefreshState::Idle),
            store,
            http,
            refresh_url: refresh_url.into(),
            redirect_to: redirect_to.into(),
        })
    }

    pub async fn is_refreshing(&self) -> bool {
        matches!(*self.state.lock().await, RefreshState::Refreshing { .. })
    }

    /// Get a usable access token after a request sent with `stale` got a 401.
    ///
    /// If the store already holds a different token (another refresh finished
    /// after the request went out) that token is returned straight away.
    /// Otherwise the caller joins the exchange running for the current
    /// session, starting one if there is none. Without a session there is
    /// nothing to refresh and the 401 stands.
    pub async fn renew(self: &Arc<Self>, stale: Option<&str>) -> Result<String, ApiError> {
        let current = self.store.token_state().await;
        if let Some(token) = current.access_token {
            if stale != Some(token.as_str()) {
                tracing::debug!("token already renewed, skipping exchange");
                return Ok(token);
            }
        }

        let rx = {
            let mut state = self.state.lock().await;
            let in_flight = match &*state {
                RefreshState::Refreshing { epoch, .. } => Some(*epoch),
                RefreshState::Idle => None,
            };
            let (tx, rx) = oneshot::channel();
            match in_flight {
                Some(started) if started == current.epoch => {
                    if let RefreshState::Refreshing { waiters, .. } = &mut *state {
                        waiters.push(tx);
                        tracing::debug!(queued = waiters.len(), "refresh in flight, queued");
                    }
                }
                // A login or logout landed after the snapshot above.
                Some(started) if started > current.epoch => return Err(ApiError::SessionCleared),
                Some(_) if !current.is_authenticated => return Err(ApiError::SessionCleared),
                None if !current.is_authenticated => return Err(ApiError::Unauthorized),
                _ => {
                    // Idle, or the exchange in flight belongs to an ended session.
                    let previous = std::mem::replace(
                        &mut *state,
                        RefreshState::Refreshing { epoch: current.epoch, waiters: vec![tx] },
                    );
                    if let RefreshState::Refreshing { waiters, .. } = previous {
                        reject_all(waiters);
                    }
                    self.spawn_exchange(current.epoch);
                }
            }
            rx
        };

        rx.await.unwrap_or(Err(ApiError::SessionCleared))
    }

    /// Reject every queued caller with [`ApiError::SessionCleared`].
    ///
    /// Called on logout. An exchange already on the wire keeps running, but
    /// its result is discarded because the store epoch has moved on.
    pub async fn cancel_pending(&self) {
        let mut state = self.state.lock().await;
        if let RefreshState::Refreshing { waiters, .. } = &mut *state {
            let n = waiters.len();
            reject_all(std::mem::take(waiters));
            if n > 0 {
                tracing::debug!(cancelled = n, "cancelled queued requests on logout");
            }
        }
    }

    fn spawn_exchange(self: &Arc<Self>, epoch: u64) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = this.exchange().await;
            this.settle(epoch, outcome).await;
        });
    }

    async fn exchange(&self) -> Result<TokenResponse, ApiError> {
        let refresh_token = self
            .store
            .refresh_token()
            .await
            .ok_or_else(|| ApiError::RefreshFailed("no refresh token".to_owned()))?;
        tracing::debug!(url = %self.refresh_url, "exchanging refresh token");
        do_refresh(&self.http, &self.refresh_url, &refresh_token).await
    }

    async fn settle(&self, epoch: u64, outcome: Result<TokenResponse, ApiError>) {
        let result = match outcome {
            Ok(token) => {
                let access = token.access_token.clone();
                if self.store.set_tokens_if(epoch, token.access_token, token.refresh_token).await {
                    tracing::info!("access token refreshed");
                    Ok(access)
                } else {
                    tracing::debug!("session changed during refresh, discarding new token");
                    Err(ApiError::SessionCleared)
                }
            }
            Err(e) => {
                tracing::warn!(err = %e, "token refresh failed, ending session");
                if self.store.logout_if(epoch, LogoutReason::RefreshFailed).await {
                    self.store.emit(SessionEvent::Redirect { location: self.redirect_to.clone() });
                    Err(into_refresh_failed(e))
                } else {
                    Err(ApiError::SessionCleared)
                }
            }
        };

        let waiters = {
            let mut state = self.state.lock().await;
            // A newer session may have started its own exchange since.
            let ours = matches!(
                &*state,
                RefreshState::Refreshing { epoch: started, .. } if *started == epoch
            );
            if ours {
                match std::mem::replace(&mut *state, RefreshState::Idle) {
                    RefreshState::Refreshing { waiters, .. } => waiters,
                    RefreshState::Idle => Vec::new(),
                }
            } else {
                Vec::new()
            }
        };
        tracing::debug!(released = waiters.len(), ok = result.is_ok(), "refresh settled");
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }
}

fn reject_all(waiters: Vec<Waiter>) {
    for waiter in waiters {
        let _ = waiter.send(Err(ApiError::SessionCleared));
    }
}

fn into_refresh_failed(e: ApiError) -> ApiError {
    match e {
        ApiError::RefreshFailed(_) => e,
        other => ApiError::RefreshFailed(other.to_string()),
    }
}

/// Perform a single refresh token exchange.
pub async fn do_refresh(
    client: &reqwest::Client,
    refresh_url: &str,
    refresh_token: &str,
) -> Result<TokenResponse, ApiError> {
    let resp = client
        .post(refresh_url)
        .json(&serde_json::json!({ "refresh_token": refresh_token }))
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        return Err(ApiError::RefreshFailed(format!("{status}: {}", extract_message(&text))));
    }

    let token: TokenResponse = resp.json().await?;
    Ok(token)
}
