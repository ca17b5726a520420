// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session state: tokens, the signed-in user, and role-based access.
//!
//! The [`store::SessionStore`] owns the one [`Session`] and is the only place
//! it is mutated. It is persisted to `<state_dir>/parkbnb-auth.json` so a
//! restarted client picks up where it left off.

pub mod persist;
pub mod store;

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Fixed name of the persisted session store.
pub const STORE_NAME: &str = "parkbnb-auth";

/// Marketplace roles. Parsing ignores case (`"MOTORIST"` == `"motorist"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum UserRole {
    Guest,
    Host,
    Admin,
    Owner,
    Manager,
    Motorist,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Host => "host",
            Self::Admin => "admin",
            Self::Owner => "owner",
            Self::Manager => "manager",
            Self::Motorist => "motorist",
        }
    }

    /// Landing dashboard for this role.
    pub fn dashboard_route(&self) -> &'static str {
        match self {
            Self::Admin => "/admin",
            Self::Host | Self::Owner | Self::Manager => "/host",
            Self::Guest | Self::Motorist => "/guest",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "guest" => Ok(Self::Guest),
            "host" => Ok(Self::Host),
            "admin" => Ok(Self::Admin),
            "owner" => Ok(Self::Owner),
            "manager" => Ok(Self::Manager),
            "motorist" => Ok(Self::Motorist),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl TryFrom<String> for UserRole {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<UserRole> for String {
    fn from(role: UserRole) -> Self {
        role.as_str().to_owned()
    }
}

/// The signed-in user as returned by the API.
///
/// Fields the client does not model are kept in `extra` so a profile
/// round-trips without loss.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middlename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_role", skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Ids arrive as either JSON strings or numbers.
fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Num(serde_json::Number),
    }
    Ok(match Id::deserialize(d)? {
        Id::Str(s) => s,
        Id::Num(n) => n.to_string(),
    })
}

/// A role the client does not know reads as no role.
fn lenient_role<'de, D: Deserializer<'de>>(d: D) -> Result<Option<UserRole>, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.and_then(|s| match s.parse() {
        Ok(role) => Some(role),
        Err(e) => {
            tracing::debug!(err = %e, "ignoring unrecognised role");
            None
        }
    }))
}

/// Credential and identity state of the current user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub is_authenticated: bool,
}

/// Outcome of a role-gated access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    NotLoggedIn,
    Unauthorised,
}

impl Session {
    /// Decide whether this session may enter an area restricted to `allowed`.
    ///
    /// An empty allow-list admits any authenticated user.
    pub fn access(&self, allowed: &[UserRole]) -> Access {
        if !self.is_authenticated {
            return Access::NotLoggedIn;
        }
        if allowed.is_empty() {
            return Access::Granted;
        }
        match self.user.as_ref().and_then(|u| u.role) {
            Some(role) if allowed.contains(&role) => Access::Granted,
            _ => Access::Unauthorised,
        }
    }

    pub fn role(&self) -> Option<UserRole> {
        self.user.as_ref().and_then(|u| u.role)
    }

    /// Dashboard to land on after login; `/guest` when the role is unknown.
    pub fn dashboard_route(&self) -> &'static str {
        self.role().map(|r| r.dashboard_route()).unwrap_or("/guest")
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    User,
    RefreshFailed,
}

/// Events emitted by the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    LoggedIn { user_id: String },
    /// A new access token replaced the previous one.
    Refreshed,
    LoggedOut { reason: LogoutReason },
    ProfileUpdated,
    /// The session ended and the user should be sent to `location`.
    Redirect { location: String },
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
