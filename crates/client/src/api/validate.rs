// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Input checks run before any request leaves the client.

use std::sync::LazyLock;

use regex::Regex;

use crate::api::auth::SignupRequest;
use crate::api::profile::{PasswordChange, ProfileUpdate};
use crate::error::ApiError;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MIN_NAME_LEN: usize = 2;
pub const MIN_SIGNUP_USERNAME_LEN: usize = 2;
pub const MIN_SIGNUP_PASSWORD_LEN: usize = 6;

static PHONE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{10,15}$"));

fn phone_ok(phone: &str) -> bool {
    match PHONE.as_ref() {
        Ok(re) => re.is_match(phone),
        Err(_) => false,
    }
}

fn min_len(field: &str, value: &str, min: usize) -> Result<(), ApiError> {
    if value.chars().count() < min {
        return Err(ApiError::validation(format!("{field} must be at least {min} characters")));
    }
    Ok(())
}

pub fn validate_profile(update: &ProfileUpdate) -> Result<(), ApiError> {
    if let Some(ref first) = update.firstname {
        min_len("first name", first, MIN_NAME_LEN)?;
    }
    if let Some(ref last) = update.lastname {
        min_len("last name", last, MIN_NAME_LEN)?;
    }
    if let Some(ref phone) = update.phone_number {
        if !phone.is_empty() && !phone_ok(phone) {
            return Err(ApiError::validation("invalid phone number"));
        }
    }
    Ok(())
}

pub fn validate_password_change(change: &PasswordChange) -> Result<(), ApiError> {
    min_len("current password", &change.current_password, MIN_PASSWORD_LEN)?;
    min_len("new password", &change.new_password, MIN_PASSWORD_LEN)?;
    if change.new_password != change.confirm_password {
        return Err(ApiError::validation("passwords don't match"));
    }
    Ok(())
}

pub fn validate_signup(req: &SignupRequest) -> Result<(), ApiError> {
    if !req.email.contains('@') {
        return Err(ApiError::validation("invalid email address"));
    }
    min_len("username", &req.username, MIN_SIGNUP_USERNAME_LEN)?;
    min_len("password", &req.password, MIN_SIGNUP_PASSWORD_LEN)?;
    if req.password != req.confirm_password {
        return Err(ApiError::validation("passwords do not match"));
    }
    if let Some(ref phone) = req.phone_number {
        if !phone.is_empty() && !phone_ok(phone) {
            return Err(ApiError::validation("invalid phone number"));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
