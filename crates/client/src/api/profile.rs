// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Profile read/update and password change.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::validate::{validate_password_change, validate_profile};
use crate::api::ApiClient;
use crate::error::ApiError;
use crate::session::User;

pub const PROFILE_PATH: &str = "/profile/";
pub const CHANGE_PASSWORD_PATH: &str = "/profile/change-password/";

/// Editable profile fields. `None` means "leave unchanged".
///
/// Email and username are read-only on the server and not part of an update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middlename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Fields of `update` whose value differs from `original`.
pub fn changed_fields(update: &ProfileUpdate, original: &Value) -> Map<String, Value> {
    let mut changed = Map::new();
    let fields = [
        ("firstname", &update.firstname),
        ("middlename", &update.middlename),
        ("lastname", &update.lastname),
        ("phone_number", &update.phone_number),
    ];
    for (key, value) in fields {
        let Some(value) = value else { continue };
        let new = Value::String(value.clone());
        if original.get(key) != Some(&new) {
            changed.insert(key.to_owned(), new);
        }
    }
    changed
}

impl ApiClient {
    /// Fetch the signed-in user's profile.
    ///
    /// The result is remembered so [`Self::update_profile`] can send only the
    /// fields that changed.
    pub async fn profile(&self) -> Result<Value, ApiError> {
        let profile: Value = self.dispatcher.get(PROFILE_PATH).await?;
        *self.last_profile.lock().await = Some(profile.clone());
        Ok(profile)
    }

    /// Send the changed fields of `update` and merge the result into the
    /// session's user.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        validate_profile(update)?;

        let cached = self.last_profile.lock().await.clone();
        let original = match cached {
            Some(p) => p,
            None => self.profile().await?,
        };
        let changed = changed_fields(update, &original);
        if changed.is_empty() {
            return Err(ApiError::validation("no changes detected"));
        }
        tracing::debug!(fields = ?changed.keys().collect::<Vec<_>>(), "updating profile");

        let updated: Value = self.dispatcher.patch(PROFILE_PATH, &Value::Object(changed)).await?;
        *self.last_profile.lock().await = Some(updated.clone());

        match self.dispatcher.store().update_user(&updated).await? {
            Some(user) => Ok(user),
            None => Ok(serde_json::from_value(updated)?),
        }
    }

    pub async fn change_password(&self, change: &PasswordChange) -> Result<Value, ApiError> {
        validate_password_change(change)?;
        let body = serde_json::json!({
            "current_password": change.current_password,
            "new_password": change.new_password,
        });
        self.dispatcher.post(CHANGE_PASSWORD_PATH, &body).await
    }
}

#[cfg(test)]
#[path = "profile_tests.rs"]
mod tests;
