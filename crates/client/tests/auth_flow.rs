mod common;

use std::sync::Arc;

use axum::http::StatusCode;

use amakuru_client::auth::SESSION_EXPIRED_MESSAGE;
use amakuru_client::{AuthContext, PortalApi};
use amakuru_core::roles::Role;
use amakuru_core::session::SessionStatus;
use amakuru_session::{FileStorage, PersistedSession, SessionStore, TOKEN_KEY, USER_KEY};

use common::{jwt_expiring_in, portal, spawn_mock, EDITOR_EMAIL, GOOD_TOKEN, PASSWORD};

fn editor_session(token: &str) -> PersistedSession {
    PersistedSession {
        token: token.to_string(),
        principal: serde_json::from_value(common::user_json("EDITOR")).unwrap(),
    }
}

#[tokio::test]
async fn login_persists_token_and_user_together() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let (base_url, _mock) = spawn_mock().await;
    let store = SessionStore::new(Arc::new(FileStorage::new(&path)));
    let api = Arc::new(PortalApi::new(base_url, store.clone()));
    let auth = AuthContext::new(api, store);

    assert!(auth.login(EDITOR_EMAIL, PASSWORD).await);
    assert!(auth.is_authenticated());
    assert_eq!(auth.user().map(|u| u.role), Some(Role::Editor));

    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk[TOKEN_KEY], GOOD_TOKEN);
    assert!(on_disk[USER_KEY].is_string());
}

#[tokio::test]
async fn failed_login_leaves_nothing_behind() {
    let (_api, auth, _mock) = portal().await;

    assert!(!auth.login(EDITOR_EMAIL, "wrong").await);

    let snapshot = auth.snapshot();
    assert_eq!(snapshot.status(), SessionStatus::Anonymous);
    assert_eq!(snapshot.last_error(), Some("Invalid credentials"));
    assert!(!auth.has_persisted_token());
}

#[tokio::test]
async fn logout_clears_both_keys() {
    let (api, auth, _mock) = portal().await;
    assert!(auth.login(EDITOR_EMAIL, PASSWORD).await);

    auth.logout();
    auth.logout();

    assert_eq!(auth.snapshot().status(), SessionStatus::Anonymous);
    assert_eq!(api.session().load().unwrap(), None);
}

#[tokio::test]
async fn restore_survives_a_restart_through_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let (base_url, mock) = spawn_mock().await;

    {
        let store = SessionStore::new(Arc::new(FileStorage::new(&path)));
        let api = Arc::new(PortalApi::new(base_url.clone(), store.clone()));
        assert!(AuthContext::new(api, store).login(EDITOR_EMAIL, PASSWORD).await);
    }

    // The server now reports a promotion.
    mock.set_me_role("ADMIN");

    let store = SessionStore::new(Arc::new(FileStorage::new(&path)));
    let api = Arc::new(PortalApi::new(base_url, store.clone()));
    let auth = AuthContext::new(api, store.clone());
    auth.restore().await;

    assert!(auth.is_authenticated());
    assert_eq!(auth.user().map(|u| u.role), Some(Role::Admin));
    assert_eq!(store.load().unwrap().map(|s| s.principal.role), Some(Role::Admin));
    assert_eq!(mock.requests_to("/api/auth/me").len(), 1);
}

#[tokio::test]
async fn restore_with_revoked_token_goes_anonymous() {
    let (api, auth, _mock) = portal().await;
    api.session().save(&editor_session("revoked")).unwrap();

    auth.restore().await;

    assert_eq!(auth.snapshot().status(), SessionStatus::Anonymous);
    assert!(!auth.has_persisted_token());
}

#[tokio::test]
async fn restore_keeps_session_when_server_is_down() {
    let (api, auth, mock) = portal().await;
    api.session().save(&editor_session(GOOD_TOKEN)).unwrap();
    mock.fail_me_with(StatusCode::SERVICE_UNAVAILABLE);

    auth.restore().await;

    let snapshot = auth.snapshot();
    assert_eq!(snapshot.status(), SessionStatus::Authenticated);
    assert_eq!(snapshot.last_error(), Some("Service unavailable"));
    assert!(auth.has_persisted_token());
}

#[tokio::test]
async fn expired_jwt_is_dropped_without_a_network_call() {
    let (api, auth, mock) = portal().await;
    api.session()
        .save(&editor_session(&jwt_expiring_in(-3600)))
        .unwrap();

    auth.restore().await;

    let snapshot = auth.snapshot();
    assert_eq!(snapshot.status(), SessionStatus::Anonymous);
    assert_eq!(snapshot.last_error(), Some(SESSION_EXPIRED_MESSAGE));
    assert!(!auth.has_persisted_token());
    assert!(mock.requests_to("/api/auth/me").is_empty());
}

#[tokio::test]
async fn unexpired_jwt_is_validated_with_the_server() {
    let (api, auth, mock) = portal().await;
    api.session()
        .save(&editor_session(&jwt_expiring_in(3600)))
        .unwrap();

    auth.restore().await;

    // The mock only accepts its opaque token, so this one is rejected.
    assert_eq!(auth.snapshot().status(), SessionStatus::Anonymous);
    assert_eq!(mock.requests_to("/api/auth/me").len(), 1);
}

#[tokio::test]
async fn validation_can_be_switched_off() {
    let (base_url, mock) = spawn_mock().await;
    let store = SessionStore::in_memory();
    store.save(&editor_session("revoked")).unwrap();
    let api = Arc::new(PortalApi::new(base_url, store.clone()));
    let auth = AuthContext::new(api, store).with_validation(false);

    auth.restore().await;

    assert!(auth.is_authenticated());
    assert!(mock.requests_to("/api/auth/me").is_empty());
}

#[tokio::test]
async fn auth_error_from_a_screen_ends_the_session() {
    let (api, auth, _mock) = portal().await;
    assert!(auth.login(EDITOR_EMAIL, PASSWORD).await);

    // Another tab logged out: storage is gone but memory still says
    // authenticated until the next protected call fails.
    api.session().clear().unwrap();
    let err = api.get_dashboard_stats().await.unwrap_err();

    assert!(auth.handle_api_error(&err));
    assert!(!auth.is_authenticated());
}
