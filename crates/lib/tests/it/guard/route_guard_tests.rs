//! Route guard decisions and the delayed prompt timer, run on a paused clock.
//!
//! The guard redirects before its prompt timer can fire, so on a real first
//! visit (where the redirect unmounts the guard or moves it to a public route)
//! the prompt never shows. Several tests below pin that ordering down.

use std::{sync::Arc, time::Duration};

use servicehub::{
    GuardOutcome, KeyValueStore, Role, SessionState, SessionUser, Settings, StorageKeys,
};

use crate::helpers::TestApp;

const PROTECTED: &str = "/profile";

fn signed_in() -> SessionState {
    SessionState::Authenticated(Arc::new(SessionUser {
        uid: "u1".into(),
        email: Some("a@x.com".into()),
        display_name: Some("Ana".into()),
        photo_url: None,
        role: Role::User,
        is_email_verified: true,
        created_at: None,
        last_login: None,
        profile: Default::default(),
    }))
}

fn redirect_home(from: &str) -> GuardOutcome {
    GuardOutcome::Redirect {
        to: "/".into(),
        from: from.into(),
    }
}

/// Let spawned timers observe a clock advance.
async fn elapse(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
}

fn seen_flag(app: &TestApp) -> Option<String> {
    app.session_storage
        .get(&StorageKeys::default().prompt_seen())
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn first_visit_redirect_then_public_route_never_prompts() {
    let app = TestApp::new();
    let mut guard = app.guard(true);

    assert_eq!(guard.render(&SessionState::Anonymous, PROTECTED), redirect_home(PROTECTED));
    assert!(guard.is_timer_armed());

    // Following the redirect lands on a public route; the timer is cancelled.
    assert_eq!(guard.render(&SessionState::Anonymous, "/"), GuardOutcome::Render);
    assert!(!guard.is_timer_armed());

    elapse(5_000).await;
    assert!(!guard.prompt_triggered());
    assert_eq!(seen_flag(&app), None);
}

#[tokio::test(start_paused = true)]
async fn unmount_cancels_pending_timer() {
    let app = TestApp::new();
    let mut guard = app.guard(true);
    guard.render(&SessionState::Anonymous, PROTECTED);
    drop(guard);

    elapse(5_000).await;
    assert_eq!(seen_flag(&app), None);
}

#[tokio::test(start_paused = true)]
async fn guard_left_mounted_past_delay_shows_prompt_with_content() {
    let app = TestApp::new();
    let mut guard = app.guard(true);
    let flags = guard.subscribe_prompt();

    assert_eq!(guard.render(&SessionState::Anonymous, PROTECTED), redirect_home(PROTECTED));

    elapse(2_999).await;
    assert!(!guard.prompt_triggered());

    elapse(1).await;
    assert!(flags.has_changed().unwrap());
    assert!(guard.prompt_triggered());
    assert_eq!(seen_flag(&app).as_deref(), Some("true"));

    // Prompt and content together, never a redirect alongside it.
    assert_eq!(guard.render(&SessionState::Anonymous, PROTECTED), GuardOutcome::RenderWithPrompt);
    assert!(!guard.is_timer_armed());
}

#[tokio::test(start_paused = true)]
async fn rerender_with_same_inputs_keeps_the_timer() {
    let app = TestApp::new();
    let mut guard = app.guard(true);

    guard.render(&SessionState::Anonymous, PROTECTED);
    elapse(2_000).await;
    // Another protected path: the classification did not change.
    guard.render(&SessionState::Anonymous, "/settings");
    elapse(1_000).await;

    assert!(guard.prompt_triggered());
}

#[tokio::test(start_paused = true)]
async fn signing_in_cancels_the_timer() {
    let app = TestApp::new();
    let mut guard = app.guard(true);

    guard.render(&SessionState::Anonymous, PROTECTED);
    assert_eq!(guard.render(&signed_in(), PROTECTED), GuardOutcome::Render);

    elapse(5_000).await;
    assert!(!guard.prompt_triggered());
}

#[tokio::test(start_paused = true)]
async fn prompt_is_shown_once_per_browser_session() {
    let app = TestApp::new();
    {
        let mut guard = app.guard(true);
        guard.render(&SessionState::Anonymous, PROTECTED);
        elapse(3_000).await;
        assert!(guard.prompt_triggered());

        guard.close_prompt();
        // Closed and already seen: back to redirecting, no new timer.
        assert_eq!(guard.render(&SessionState::Anonymous, PROTECTED), redirect_home(PROTECTED));
        assert!(!guard.is_timer_armed());
    }

    let mut guard = app.guard(true);
    assert!(guard.has_seen_prompt());
    guard.render(&SessionState::Anonymous, "/bookings/new");
    guard.render(&SessionState::Anonymous, PROTECTED);
    assert!(!guard.is_timer_armed());
    elapse(5_000).await;
    assert!(!guard.prompt_triggered());
}

#[tokio::test(start_paused = true)]
async fn cleared_session_storage_shows_prompt_again() {
    let app = TestApp::new();
    app.session_storage
        .set(&StorageKeys::default().prompt_seen(), "true")
        .unwrap();
    app.session_storage.clear().unwrap();

    let mut guard = app.guard(true);
    assert!(!guard.has_seen_prompt());
    guard.render(&SessionState::Anonymous, PROTECTED);
    assert!(guard.is_timer_armed());
}

#[tokio::test(start_paused = true)]
async fn loading_renders_placeholder_and_arms_nothing() {
    let app = TestApp::new();
    let mut guard = app.guard(true);

    assert_eq!(guard.render(&SessionState::Loading, PROTECTED), GuardOutcome::Loading);
    assert_eq!(guard.render(&SessionState::Loading, "/"), GuardOutcome::Loading);
    elapse(5_000).await;
    assert!(!guard.prompt_triggered());
}

#[tokio::test(start_paused = true)]
async fn require_auth_off_renders_but_still_arms() {
    let app = TestApp::new();
    let mut guard = app.guard(false);

    assert_eq!(guard.render(&SessionState::Anonymous, PROTECTED), GuardOutcome::Render);
    // The timer depends only on session, classification and the seen flag.
    assert!(guard.is_timer_armed());
    elapse(3_000).await;
    assert!(guard.prompt_triggered());
    assert_eq!(guard.render(&SessionState::Anonymous, PROTECTED), GuardOutcome::Render);
}

#[tokio::test(start_paused = true)]
async fn anonymous_protected_visit_has_exactly_one_outcome() {
    let app = TestApp::new();
    let mut guard = app.guard(true);

    for step in 0..8 {
        let outcome = guard.render(&SessionState::Anonymous, PROTECTED);
        match outcome {
            GuardOutcome::Redirect { .. } => assert!(!guard.prompt_triggered()),
            GuardOutcome::RenderWithPrompt => assert!(guard.prompt_triggered()),
            other => panic!("step {step}: unexpected {other:?}"),
        }
        elapse(500).await;
    }
}

#[tokio::test(start_paused = true)]
async fn custom_home_route_and_delay() {
    let settings = Settings {
        home_route: "/login".into(),
        prompt_delay_ms: 100,
        ..Settings::default()
    };
    let app = TestApp::with_settings(settings);
    let mut guard = app.guard(true);

    assert_eq!(
        guard.render(&SessionState::Anonymous, "/wallet?x=1"),
        GuardOutcome::Redirect {
            to: "/login".into(),
            from: "/wallet?x=1".into()
        }
    );
    elapse(100).await;
    assert!(guard.prompt_triggered());
    assert_eq!(
        app.session_storage
            .get(&app.settings.keys().prompt_seen())
            .unwrap()
            .as_deref(),
        Some("true")
    );
}
