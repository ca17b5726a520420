// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Login, signup and logout.

use std::fmt;
use std::str::FromStr;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::api::validate::validate_signup;
use crate::api::ApiClient;
use crate::error::ApiError;
use crate::session::{LogoutReason, User, UserRole};

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of a successful `POST /login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: User,
}

/// Roles open to self-registration. The backend expects them uppercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignupRole {
    Owner,
    Motorist,
}

impl SignupRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Motorist => "MOTORIST",
        }
    }
}

impl fmt::Display for SignupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignupRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "motorist" => Ok(Self::Motorist),
            other => Err(format!("cannot sign up as {other}: choose owner or motorist")),
        }
    }
}

impl From<SignupRole> for UserRole {
    fn from(role: SignupRole) -> Self {
        match role {
            SignupRole::Owner => Self::Owner,
            SignupRole::Motorist => Self::Motorist,
        }
    }
}

/// Body of `POST /signup`.
///
/// `confirm_password` is checked locally and never sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(skip)]
    pub confirm_password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub role: SignupRole,
    pub first_name: String,
    pub last_name: String,
}

impl ApiClient {
    /// Exchange credentials for a session and store it.
    ///
    /// Goes out without a bearer token; a 401 here means bad credentials and
    /// is returned as-is rather than triggering a refresh.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ApiError::validation("email and password are required"));
        }
        let body = serde_json::to_value(LoginRequest { email: email.trim(), password })?;
        let value = self.dispatcher.send_public(Method::POST, "/login", Some(&body)).await?;
        let resp: LoginResponse = serde_json::from_value(value)?;

        let user = resp.user.clone();
        self.dispatcher.store().login(resp.access_token, resp.refresh_token, resp.user).await;
        self.forget_profile().await;
        Ok(user)
    }

    /// Register a new account. The account still needs activation, so no
    /// session is created.
    pub async fn signup(&self, req: &SignupRequest) -> Result<serde_json::Value, ApiError> {
        validate_signup(req)?;
        let body = serde_json::to_value(req)?;
        let value = self.dispatcher.send_public(Method::POST, "/signup", Some(&body)).await?;
        tracing::info!(email = %req.email, role = %req.role, "signed up");
        Ok(value)
    }

    /// End the session locally and cancel any request waiting on a refresh.
    pub async fn logout(&self) {
        self.dispatcher.store().logout(LogoutReason::User).await;
        self.dispatcher.coordinator().cancel_pending().await;
        self.forget_profile().await;
    }
}
