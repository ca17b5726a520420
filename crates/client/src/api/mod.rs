// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed wrappers over the parkbnb endpoints.

pub mod auth;
pub mod profile;
pub mod validate;

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::config::ClientConfig;
use crate::dispatch::Dispatcher;
use crate::error::ApiError;
use crate::session::store::SessionStore;
use crate::session::Session;

/// High-level client: one session, one dispatcher.
pub struct ApiClient {
    dispatcher: Dispatcher,
    last_profile: Mutex<Option<Value>>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, store: Arc<SessionStore>) -> Result<Self, ApiError> {
        Ok(Self { dispatcher: Dispatcher::new(config, store)?, last_profile: Mutex::new(None) })
    }

    /// Client backed by the session file under the configured state dir.
    pub fn open(config: ClientConfig) -> Result<Self, ApiError> {
        let store = SessionStore::open(config.session_path());
        Self::new(config, store)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        self.dispatcher.store()
    }

    pub async fn session(&self) -> Session {
        self.store().snapshot().await
    }

    async fn forget_profile(&self) {
        *self.last_profile.lock().await = None;
    }
}
