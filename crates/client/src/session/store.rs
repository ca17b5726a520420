// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The session store: single owner of the current [`Session`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};

use crate::error::ApiError;
use crate::session::{persist, LogoutReason, Session, SessionEvent, User};

/// Token, authentication flag and epoch read under one lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenState {
    pub access_token: Option<String>,
    pub is_authenticated: bool,
    pub epoch: u64,
}

struct Inner {
    session: Session,
    /// Bumped on login and logout. A refresh started under one epoch must not
    /// write into another.
    epoch: u64,
}

/// Holds the current tokens and user; every mutation is persisted and
/// broadcast as a [`SessionEvent`].
pub struct SessionStore {
    inner: RwLock<Inner>,
    path: Option<PathBuf>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    /// A store that lives only in memory.
    pub fn in_memory() -> Arc<Self> {
        Self::with_session(Session::default(), None)
    }

    /// Open the store persisted at `path`.
    ///
    /// A missing file starts an empty session. An unreadable or corrupt file is
    /// logged and ignored; it is overwritten on the next mutation.
    pub fn open(path: impl Into<PathBuf>) -> Arc<Self> {
        let path = path.into();
        let session = match persist::load(&path) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(path = %path.display(), err = %e, "ignoring unreadable session file");
                Session::default()
            }
        };
        if session.is_authenticated {
            tracing::debug!(path = %path.display(), "restored persisted session");
        }
        Self::with_session(session, Some(path))
    }

    fn with_session(session: Session, path: Option<PathBuf>) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(64);
        Arc::new(Self { inner: RwLock::new(Inner { session, epoch: 0 }), path, event_tx })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    pub async fn snapshot(&self) -> Session {
        self.inner.read().await.session.clone()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.inner.read().await.session.access_token.clone()
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.inner.read().await.session.refresh_token.clone()
    }

    pub async fn user(&self) -> Option<User> {
        self.inner.read().await.session.user.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.read().await.session.is_authenticated
    }

    pub async fn epoch(&self) -> u64 {
        self.inner.read().await.epoch
    }

    pub async fn token_state(&self) -> TokenState {
        let inner = self.inner.read().await;
        TokenState {
            access_token: inner.session.access_token.clone(),
            is_authenticated: inner.session.is_authenticated,
            epoch: inner.epoch,
        }
    }

    /// Start a new session.
    pub async fn login(&self, access_token: String, refresh_token: Option<String>, user: User) {
        let user_id = user.id.clone();
        {
            let mut inner = self.inner.write().await;
            inner.session = Session {
                access_token: Some(access_token),
                refresh_token,
                user: Some(user),
                is_authenticated: true,
            };
            inner.epoch += 1;
            self.persist(&inner.session);
        }
        tracing::info!(user = %user_id, "logged in");
        self.emit(SessionEvent::LoggedIn { user_id });
    }

    /// Clear the session.
    pub async fn logout(&self, reason: LogoutReason) {
        {
            let mut inner = self.inner.write().await;
            inner.session = Session::default();
            inner.epoch += 1;
            self.persist(&inner.session);
        }
        tracing::info!(?reason, "logged out");
        self.emit(SessionEvent::LoggedOut { reason });
    }

    /// Clear the session only if no login/logout happened since `epoch`.
    pub async fn logout_if(&self, epoch: u64, reason: LogoutReason) -> bool {
        {
            let mut inner = self.inner.write().await;
            if inner.epoch != epoch {
                return false;
            }
            inner.session = Session::default();
            inner.epoch += 1;
            self.persist(&inner.session);
        }
        tracing::info!(?reason, "logged out");
        self.emit(SessionEvent::LoggedOut { reason });
        true
    }

    /// Replace the access token, and the refresh token when a new one is given.
    pub async fn set_tokens(&self, access_token: String, refresh_token: Option<String>) {
        {
            let mut inner = self.inner.write().await;
            Self::apply_tokens(&mut inner.session, access_token, refresh_token);
            self.persist(&inner.session);
        }
        self.emit(SessionEvent::Refreshed);
    }

    /// [`Self::set_tokens`], but only if no login/logout happened since `epoch`.
    pub async fn set_tokens_if(
        &self,
        epoch: u64,
        access_token: String,
        refresh_token: Option<String>,
    ) -> bool {
        {
            let mut inner = self.inner.write().await;
            if inner.epoch != epoch {
                return false;
            }
            Self::apply_tokens(&mut inner.session, access_token, refresh_token);
            self.persist(&inner.session);
        }
        self.emit(SessionEvent::Refreshed);
        true
    }

    fn apply_tokens(session: &mut Session, access_token: String, refresh_token: Option<String>) {
        session.access_token = Some(access_token);
        if let Some(refresh) = refresh_token {
            session.refresh_token = Some(refresh);
        }
    }

    /// Merge the non-null fields of `patch` into the current user.
    ///
    /// Returns the updated user, or `None` when nobody is signed in.
    pub async fn update_user(&self, patch: &serde_json::Value) -> Result<Option<User>, ApiError> {
        let serde_json::Value::Object(fields) = patch else {
            return Err(ApiError::validation("profile update must be a JSON object"));
        };
        let updated = {
            let mut inner = self.inner.write().await;
            let Some(current) = inner.session.user.as_ref() else {
                return Ok(None);
            };
            let mut merged = serde_json::to_value(current)?;
            if let serde_json::Value::Object(ref mut map) = merged {
                for (key, value) in fields {
                    if !value.is_null() {
                        map.insert(key.clone(), value.clone());
                    }
                }
            }
            let user: User = serde_json::from_value(merged)?;
            inner.session.user = Some(user.clone());
            self.persist(&inner.session);
            user
        };
        self.emit(SessionEvent::ProfileUpdated);
        Ok(Some(updated))
    }

    fn persist(&self, session: &Session) {
        let Some(path) = self.path.as_deref() else {
            return;
        };
        if let Err(e) = persist::save(path, session) {
            tracing::warn!(path = %path.display(), err = %e, "failed to persist session");
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
