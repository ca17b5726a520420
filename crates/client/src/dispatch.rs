// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated request dispatch.
//!
//! Every request carries the current access token as a bearer credential. A
//! 401 is handed to the [`RefreshCoordinator`] and the request is resubmitted
//! once with the renewed token; a second failure goes back to the caller.

use std::sync::{Arc, Once};

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{extract_message, ApiError};
use crate::refresh::RefreshCoordinator;
use crate::session::store::SessionStore;

/// Build the shared HTTP client.
pub fn http_client(config: &ClientConfig) -> Result<reqwest::Client, ApiError> {
    static CRYPTO: Once = Once::new();
    CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
    Ok(reqwest::Client::builder().timeout(config.timeout()).build()?)
}

/// Sends requests to the API on behalf of the current session.
pub struct Dispatcher {
    config: ClientConfig,
    http: reqwest::Client,
    store: Arc<SessionStore>,
    coordinator: Arc<RefreshCoordinator>,
}

impl Dispatcher {
    pub fn new(config: ClientConfig, store: Arc<SessionStore>) -> Result<Self, ApiError> {
        let http = http_client(&config)?;
        let coordinator = RefreshCoordinator::new(
            Arc::clone(&store),
            http.clone(),
            config.endpoint("/auth/refresh"),
            config.auth_path.clone(),
        );
        Ok(Self { config, http, store, coordinator })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// Send an authenticated request and return the JSON body.
    ///
    /// An empty success body is returned as `Value::Null`.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = self.config.endpoint(path);
        let token = self.store.access_token().await;

        let resp = self.execute(&method, &url, body, token.as_deref()).await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return read_body(resp).await;
        }

        tracing::debug!(%method, %url, "401, renewing access token");
        let renewed = self.coordinator.renew(token.as_deref()).await?;

        let resp = self.execute(&method, &url, body, Some(&renewed)).await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            tracing::debug!(%method, %url, "still unauthorized after refresh");
            return Err(ApiError::Unauthorized);
        }
        read_body(resp).await
    }

    /// Send a request without credentials and without 401 interception.
    ///
    /// Used for the endpoints that establish a session in the first place.
    pub async fn send_public(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = self.config.endpoint(path);
        let resp = self.execute(&method, &url, body, None).await?;
        read_body(resp).await
    }

    async fn execute(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<reqwest::Response, ApiError> {
        let mut req = self.http.request(method.clone(), url);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await?;
        tracing::debug!(%method, %url, status = resp.status().as_u16(), "response");
        Ok(resp)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        decode(self.send(Method::GET, path, None).await?)
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        decode(self.send(Method::POST, path, Some(&body)).await?)
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        decode(self.send(Method::PUT, path, Some(&body)).await?)
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        decode(self.send(Method::PATCH, path, Some(&body)).await?)
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        decode(self.send(Method::DELETE, path, None).await?)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    Ok(serde_json::from_value(value)?)
}

async fn read_body(resp: reqwest::Response) -> Result<Value, ApiError> {
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        return Err(ApiError::Status { status: status.as_u16(), message: extract_message(&text) });
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
}
