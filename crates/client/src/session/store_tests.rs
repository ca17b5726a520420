// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;

use super::*;
use crate::session::UserRole;

fn motorist() -> User {
    User {
        id: "1".into(),
        email: "guest@parkbnb.test".into(),
        firstname: Some("Guest".into()),
        role: Some(UserRole::Motorist),
        ..User::default()
    }
}

#[tokio::test]
async fn login_populates_session_and_emits() {
    let store = SessionStore::in_memory();
    let mut rx = store.subscribe();

    store.login("T1".into(), Some("R1".into()), motorist()).await;

    let session = store.snapshot().await;
    assert!(session.is_authenticated);
    assert_eq!(session.access_token.as_deref(), Some("T1"));
    assert_eq!(session.refresh_token.as_deref(), Some("R1"));
    assert_eq!(rx.try_recv().ok(), Some(SessionEvent::LoggedIn { user_id: "1".into() }));
}

#[tokio::test]
async fn logout_clears_everything() {
    let store = SessionStore::in_memory();
    store.login("T1".into(), Some("R1".into()), motorist()).await;
    let mut rx = store.subscribe();

    store.logout(LogoutReason::User).await;

    assert_eq!(store.snapshot().await, Session::default());
    assert_eq!(
        rx.try_recv().ok(),
        Some(SessionEvent::LoggedOut { reason: LogoutReason::User })
    );
}

#[tokio::test]
async fn set_tokens_keeps_refresh_token_unless_rotated() {
    let store = SessionStore::in_memory();
    store.login("T1".into(), Some("R1".into()), motorist()).await;

    store.set_tokens("T2".into(), None).await;
    assert_eq!(store.access_token().await.as_deref(), Some("T2"));
    assert_eq!(store.refresh_token().await.as_deref(), Some("R1"));

    store.set_tokens("T3".into(), Some("R2".into())).await;
    assert_eq!(store.access_token().await.as_deref(), Some("T3"));
    assert_eq!(store.refresh_token().await.as_deref(), Some("R2"));
}

#[tokio::test]
async fn conditional_mutations_respect_epoch() {
    let store = SessionStore::in_memory();
    store.login("T1".into(), Some("R1".into()), motorist()).await;
    let epoch = store.epoch().await;

    store.logout(LogoutReason::User).await;

    assert!(!store.set_tokens_if(epoch, "T2".into(), None).await);
    assert!(!store.logout_if(epoch, LogoutReason::RefreshFailed).await);
    assert_eq!(store.access_token().await, None);
    assert!(!store.is_authenticated().await);

    let current = store.epoch().await;
    store.login("T5".into(), Some("R5".into()), motorist()).await;
    assert!(!store.logout_if(current, LogoutReason::RefreshFailed).await);
    assert!(store.is_authenticated().await);
}

#[tokio::test]
async fn update_user_merges_non_null_fields() -> anyhow::Result<()> {
    let store = SessionStore::in_memory();
    store.login("T1".into(), None, motorist()).await;

    let updated = store
        .update_user(&json!({ "lastname": "Driver", "firstname": null, "vehicle_model": "Civic" }))
        .await?
        .expect("signed in");

    assert_eq!(updated.firstname.as_deref(), Some("Guest"));
    assert_eq!(updated.lastname.as_deref(), Some("Driver"));
    assert_eq!(updated.extra.get("vehicle_model"), Some(&json!("Civic")));
    assert_eq!(store.user().await, Some(updated));
    Ok(())
}

#[tokio::test]
async fn update_user_without_session_is_noop() -> anyhow::Result<()> {
    let store = SessionStore::in_memory();
    assert_eq!(store.update_user(&json!({ "lastname": "X" })).await?, None);
    assert!(store.update_user(&json!(["not", "an", "object"])).await.is_err());
    Ok(())
}

#[tokio::test]
async fn session_survives_reopen() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("parkbnb-auth.json");

    let store = SessionStore::open(&path);
    store.login("T1".into(), Some("R1".into()), motorist()).await;
    drop(store);

    let reopened = SessionStore::open(&path);
    assert_eq!(reopened.access_token().await.as_deref(), Some("T1"));
    assert_eq!(reopened.user().await.and_then(|u| u.role), Some(UserRole::Motorist));

    reopened.logout(LogoutReason::User).await;
    let again = SessionStore::open(&path);
    assert!(!again.is_authenticated().await);
    Ok(())
}

#[tokio::test]
async fn corrupt_file_opens_empty() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("parkbnb-auth.json");
    std::fs::write(&path, "garbage")?;

    let store = SessionStore::open(&path);
    assert_eq!(store.snapshot().await, Session::default());
    Ok(())
}

#[tokio::test]
async fn token_state_tracks_login_and_logout() {
    let store = SessionStore::in_memory();
    let empty = store.token_state().await;
    assert_eq!(empty, TokenState { access_token: None, is_authenticated: false, epoch: 0 });

    store.login("T1".into(), Some("R1".into()), motorist()).await;
    let live = store.token_state().await;
    assert_eq!(live.access_token.as_deref(), Some("T1"));
    assert!(live.is_authenticated);
    assert_eq!(live.epoch, 1);

    store.set_tokens("T2".into(), None).await;
    assert_eq!(store.token_state().await.epoch, 1);

    store.logout(LogoutReason::User).await;
    assert_eq!(store.token_state().await.epoch, 2);
}
