// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! parkbnb client: session-aware access to the parkbnb marketplace API.
//!
//! Requests go through a [`dispatch::Dispatcher`] that attaches the current
//! bearer token and, on a 401, waits on the [`refresh::RefreshCoordinator`]
//! for a renewed token before resubmitting once. The
//! [`session::store::SessionStore`] is the single owner of tokens and user.

pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod refresh;
pub mod session;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::ApiError;
