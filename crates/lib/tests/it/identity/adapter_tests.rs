//! Identity adapter tests: the result contract, self-healing, error mapping
//! and the local identity mirror.

use servicehub::{
    KeyValueStore, Role, StorageKeys,
    identity::{
        BackendOp, IdentityPatch, ProviderErrorCode,
        errors::{GENERIC_ERROR_MESSAGE, NO_USER_LOGGED_IN, PROFILE_UPDATE_FAILED},
        memory::MAX_FAILED_ATTEMPTS,
    },
};

use crate::helpers::{EMAIL, NAME, PASSWORD, TestApp};

#[tokio::test]
async fn register_then_authenticate_returns_same_user() {
    let app = TestApp::new();

    let registered = app
        .adapter
        .register(EMAIL, PASSWORD, NAME, Role::User, None)
        .await
        .unwrap();
    assert!(registered.needs_verification);
    assert_eq!(registered.user.display_name.as_deref(), Some(NAME));
    assert_eq!(registered.user.role, Role::User);

    app.adapter.sign_out().await;
    let signed_in = app.adapter.authenticate(EMAIL, PASSWORD).await.unwrap();
    assert_eq!(signed_in.user.uid, registered.user.uid);
    assert!(signed_in.needs_verification);
}

#[tokio::test]
async fn authenticate_refreshes_last_login() {
    let app = TestApp::new();
    let uid = app.register_default().await;
    let created = app.backend.profile(&uid).unwrap();

    app.clock.advance(60_000);
    let signed_in = app.adapter.authenticate(EMAIL, PASSWORD).await.unwrap();

    assert_eq!(signed_in.user.created_at, created.created_at);
    assert!(signed_in.user.last_login > created.last_login);
    assert_eq!(app.backend.profile(&uid).unwrap().last_login, signed_in.user.last_login);
}

#[tokio::test]
async fn authenticate_self_heals_missing_profile() {
    let app = TestApp::new();
    let uid = app
        .adapter
        .register(EMAIL, PASSWORD, NAME, Role::Provider, Some("555"))
        .await
        .unwrap()
        .user
        .uid;
    app.adapter.sign_out().await;
    app.backend.delete_profile(&uid);

    let healed = app.adapter.authenticate(EMAIL, PASSWORD).await.unwrap();

    assert_eq!(healed.user.uid, uid);
    assert_eq!(healed.user.role, Role::User);
    let record = app.backend.profile(&uid).expect("default record written");
    assert_eq!(record.role, Role::User);
    assert_eq!(record.display_name.as_deref(), Some(NAME));
}

#[tokio::test]
async fn external_sign_in_creates_verified_default_profile() {
    let app = TestApp::new();
    app.backend
        .script_popup("g@x.com", Some("Gabe"), Some("https://img/g.png"));

    let ok = app.adapter.authenticate_with_external_provider().await.unwrap();

    assert!(!ok.needs_verification);
    assert_eq!(ok.user.role, Role::User);
    assert_eq!(ok.user.photo_url.as_deref(), Some("https://img/g.png"));
    assert_eq!(app.backend.profile(&ok.user.uid), Some(ok.user.clone()));
}

#[tokio::test]
async fn provider_failures_map_to_fixed_messages() {
    let app = TestApp::new();
    app.register_default().await;

    let dup = app
        .adapter
        .register(EMAIL, PASSWORD, NAME, Role::User, None)
        .await
        .unwrap_err();
    assert_eq!(dup.code, Some(ProviderErrorCode::EmailAlreadyInUse));
    assert_eq!(dup.message, "This email is already registered. Please login.");

    let weak = app
        .adapter
        .register("b@x.com", "123", NAME, Role::User, None)
        .await
        .unwrap_err();
    assert_eq!(weak.code, Some(ProviderErrorCode::WeakPassword));

    let wrong = app.adapter.authenticate(EMAIL, "nope-nope").await.unwrap_err();
    assert_eq!(wrong.message, "Incorrect password. Please try again.");

    let missing = app.adapter.authenticate("ghost@x.com", PASSWORD).await.unwrap_err();
    assert_eq!(missing.code, Some(ProviderErrorCode::UserNotFound));

    let invalid = app.adapter.authenticate("not-an-email", PASSWORD).await.unwrap_err();
    assert_eq!(invalid.message, "Please enter a valid email address.");

    let popup = app
        .adapter
        .authenticate_with_external_provider()
        .await
        .unwrap_err();
    assert_eq!(popup.code, Some(ProviderErrorCode::PopupClosedByUser));
}

#[tokio::test]
async fn unknown_codes_fall_back_to_generic_message() {
    let app = TestApp::new();
    app.backend.fail_next(
        BackendOp::SignIn,
        ProviderErrorCode::parse("auth/quota-exceeded"),
    );

    let err = app.adapter.authenticate(EMAIL, PASSWORD).await.unwrap_err();
    assert_eq!(err.message, GENERIC_ERROR_MESSAGE);
}

#[tokio::test]
async fn repeated_wrong_passwords_are_rate_limited() {
    let app = TestApp::new();
    app.register_default().await;
    app.adapter.sign_out().await;

    for _ in 0..MAX_FAILED_ATTEMPTS {
        app.adapter.authenticate(EMAIL, "wrong-pass").await.unwrap_err();
    }
    let err = app.adapter.authenticate(EMAIL, PASSWORD).await.unwrap_err();
    assert_eq!(err.code, Some(ProviderErrorCode::TooManyRequests));
}

#[tokio::test]
async fn offline_provider_reports_network_error() {
    let app = TestApp::new();
    app.backend.set_offline(true);

    let err = app.adapter.authenticate(EMAIL, PASSWORD).await.unwrap_err();
    assert_eq!(err.message, "Network error. Please check your connection.");
}

#[tokio::test]
async fn sign_out_clears_cache_and_token_even_when_provider_fails() {
    let app = TestApp::new();
    app.register_default().await;
    assert!(app.adapter.cached_identity().is_some());
    assert!(app.adapter.bearer_token().is_some());

    app.backend
        .fail_next(BackendOp::SignOut, ProviderErrorCode::NetworkRequestFailed);
    app.adapter.sign_out().await;

    assert_eq!(app.adapter.cached_identity(), None);
    assert_eq!(app.adapter.bearer_token(), None);
}

#[tokio::test]
async fn cached_identity_survives_garbage() {
    let app = TestApp::new();
    app.durable
        .set(&StorageKeys::default().identity(), "not json at all")
        .unwrap();
    assert_eq!(app.adapter.cached_identity(), None);
}

#[tokio::test]
async fn update_profile_requires_a_cached_identity() {
    let app = TestApp::new();
    let err = app
        .adapter
        .update_profile(&IdentityPatch {
            display_name: Some("X".into()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.message, NO_USER_LOGGED_IN);
    assert_eq!(err.code, None);
}

#[tokio::test]
async fn update_profile_merges_remote_and_cache() {
    let app = TestApp::new();
    let uid = app.register_default().await;

    let updated = app
        .adapter
        .update_profile(&IdentityPatch {
            display_name: Some("Ana B".into()),
            profile_completed: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(updated.display_name.as_deref(), Some("Ana B"));
    let record = app.backend.profile(&uid).unwrap();
    assert_eq!(record.display_name.as_deref(), Some("Ana B"));
    assert!(record.profile_completed);
    assert_eq!(app.adapter.cached_identity(), Some(updated));
}

#[tokio::test]
async fn update_profile_failure_uses_update_message() {
    let app = TestApp::new();
    app.register_default().await;
    app.backend
        .fail_next(BackendOp::MergeProfile, ProviderErrorCode::NetworkRequestFailed);

    let err = app
        .adapter
        .update_profile(&IdentityPatch {
            phone: Some("555".into()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.message, PROFILE_UPDATE_FAILED);
}

#[tokio::test]
async fn update_profile_recreates_deleted_record() {
    let app = TestApp::new();
    let uid = app.register_default().await;
    app.backend.delete_profile(&uid);

    let updated = app
        .adapter
        .update_profile(&IdentityPatch {
            phone: Some("555".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(updated.phone.as_deref(), Some("555"));
    let record = app.backend.profile(&uid).unwrap();
    assert_eq!(record.phone.as_deref(), Some("555"));
    assert_eq!(record.role, Role::User);
}

#[tokio::test]
async fn password_reset_goes_to_provider() {
    let app = TestApp::new();
    app.register_default().await;

    app.adapter.send_password_reset(EMAIL).await.unwrap();
    assert_eq!(app.backend.password_reset_requests(), vec![EMAIL.to_string()]);

    let err = app.adapter.send_password_reset("").await.unwrap_err();
    assert_eq!(err.code, Some(ProviderErrorCode::MissingEmail));
}

#[tokio::test]
async fn failed_verification_email_does_not_fail_registration() {
    let app = TestApp::new();
    app.backend.fail_next(
        BackendOp::EmailVerification,
        ProviderErrorCode::TooManyRequests,
    );

    let ok = app
        .adapter
        .register(EMAIL, PASSWORD, NAME, Role::User, None)
        .await
        .unwrap();
    assert!(ok.needs_verification);
    assert!(app.backend.verification_requests().is_empty());
}
