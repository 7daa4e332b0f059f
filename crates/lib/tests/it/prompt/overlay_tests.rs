//! The auth prompt against a live session store.

use std::time::Duration;

use servicehub::{
    AuthPrompt, PromptEvent, Settings,
    prompt::PromptPhase,
};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::helpers::{TestApp, fill_signup};

fn quick_settings() -> Settings {
    Settings {
        auto_close_delay_ms: 20,
        dismiss_fade_ms: 10,
        ..Settings::default()
    }
}

async fn next_event(events: &mut UnboundedReceiver<PromptEvent>) -> Option<PromptEvent> {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("prompt event within timeout")
}

#[tokio::test]
async fn closes_itself_after_sign_in_elsewhere() {
    let app = TestApp::with_settings(quick_settings());
    let session = app.settled_session().await;
    let (prompt, mut events) = AuthPrompt::open(session.subscribe(), &app.settings);

    app.register_default().await;

    assert_eq!(next_event(&mut events).await, Some(PromptEvent::LoginSuccess));
    assert_eq!(next_event(&mut events).await, Some(PromptEvent::Closed));
    assert!(prompt.is_closed());
}

#[tokio::test]
async fn form_sign_in_reports_login_once_then_closes() {
    let app = TestApp::with_settings(quick_settings());
    let session = app.settled_session().await;
    let (mut prompt, mut events) = AuthPrompt::open(session.subscribe(), &app.settings);

    assert!(prompt.open_credential_form());
    let mut form = app.form(&session);
    fill_signup(&mut form);
    form.submit().await.unwrap();
    prompt.on_form_success();

    assert_eq!(next_event(&mut events).await, Some(PromptEvent::LoginSuccess));
    assert_eq!(next_event(&mut events).await, Some(PromptEvent::Closed));
    assert_eq!(prompt.phase(), PromptPhase::Closed);

    // The channel closes once the prompt is gone, with nothing after Closed.
    drop(prompt);
    assert_eq!(next_event(&mut events).await, None);
}

#[tokio::test]
async fn dismissed_prompt_does_not_report_a_later_sign_in() {
    let app = TestApp::with_settings(quick_settings());
    let session = app.settled_session().await;
    let (mut prompt, mut events) = AuthPrompt::open(session.subscribe(), &app.settings);

    prompt.dismiss();
    assert_eq!(prompt.phase(), PromptPhase::Dismissing);
    assert!(!prompt.open_credential_form());
    assert_eq!(next_event(&mut events).await, Some(PromptEvent::Closed));

    app.register_default().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn prompt_opened_over_signed_in_session_closes() {
    let app = TestApp::with_settings(quick_settings());
    let session = app.settled_session().await;
    let uid = app.register_default().await;
    crate::helpers::wait_for_user(&session, &uid).await;

    let (_prompt, mut events) = AuthPrompt::open(session.subscribe(), &app.settings);
    assert_eq!(next_event(&mut events).await, Some(PromptEvent::LoginSuccess));
    assert_eq!(next_event(&mut events).await, Some(PromptEvent::Closed));
}
