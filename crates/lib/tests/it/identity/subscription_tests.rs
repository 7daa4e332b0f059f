//! Identity change subscription: initial delivery, ordering, the single
//! subscriber slot and the no-self-heal lookup path.

use std::time::Duration;

use servicehub::{
    Identity,
    identity::{IdentityBackend, IdentityError},
};
use tokio::sync::mpsc;

use crate::helpers::{EMAIL, PASSWORD, TestApp};

async fn next(rx: &mut mpsc::UnboundedReceiver<Option<Identity>>) -> Option<Identity> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("callback fired")
        .expect("subscription alive")
}

#[tokio::test]
async fn callbacks_follow_provider_order() {
    let app = TestApp::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _sub = app.adapter.subscribe(move |id| {
        let _ = tx.send(id);
    })
    .unwrap();

    assert_eq!(next(&mut rx).await, None);

    let uid = app.register_default().await;
    let signed_in = next(&mut rx).await.expect("identity after register");
    assert_eq!(signed_in.uid, uid);
    // The lookup waited for registration to write the record.
    assert_eq!(signed_in.display_name.as_deref(), Some("Ana"));

    app.adapter.sign_out().await;
    assert_eq!(next(&mut rx).await, None);
}

#[tokio::test]
async fn lookup_path_does_not_self_heal() {
    let app = TestApp::new();
    let uid = app.register_default().await;
    app.adapter.sign_out().await;
    app.backend.delete_profile(&uid);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _sub = app.adapter.subscribe(move |id| {
        let _ = tx.send(id);
    })
    .unwrap();
    assert_eq!(next(&mut rx).await, None);

    // Sign in at the provider directly, bypassing the adapter's self-heal.
    app.backend.sign_in_with_password(EMAIL, PASSWORD).await.unwrap();

    assert_eq!(next(&mut rx).await, None);
    assert_eq!(app.backend.profile(&uid), None);
}

#[tokio::test]
async fn only_one_subscriber_at_a_time() {
    let app = TestApp::new();
    let first = app.adapter.subscribe(|_| {}).unwrap();
    assert!(first.is_active());

    let err = app.adapter.subscribe(|_| {}).unwrap_err();
    assert!(matches!(err, IdentityError::AlreadySubscribed));

    drop(first);
    let second = app.adapter.subscribe(|_| {});
    assert!(second.is_ok());
}

#[tokio::test]
async fn unsubscribe_stops_delivery() {
    let app = TestApp::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let sub = app.adapter.subscribe(move |id| {
        let _ = tx.send(id);
    })
    .unwrap();
    assert_eq!(next(&mut rx).await, None);

    sub.unsubscribe();
    app.register_default().await;

    // The callback (and its sender) went away with the task.
    assert!(rx.recv().await.is_none());
}
