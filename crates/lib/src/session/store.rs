//! The session store.
//!
//! Owns the only identity subscription, turns each identity change into a
//! [`SessionState`], and publishes it on a `watch` channel.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::sync::watch;

use super::{
    errors::SessionError,
    types::{SessionState, SessionStatus, SessionUser, UserPatch},
};
use crate::{
    config::StorageKeys,
    identity::{Identity, IdentityAdapter, IdentityError, IdentityPatch, IdentitySubscription},
    storage::{self, KeyValueStore},
};

/// Read the cached extended profile for `uid`. Unreadable blobs are ignored.
fn cached_profile(storage: &dyn KeyValueStore, keys: &StorageKeys, uid: &str) -> Option<UserPatch> {
    match storage::read_json::<UserPatch>(storage, &keys.profile(uid)) {
        Ok(patch) => patch,
        Err(e) => {
            tracing::warn!(%uid, error = %e, "Ignoring unreadable cached profile");
            None
        }
    }
}

/// Merge the canonical identity with whatever profile is cached for it.
fn resolve(identity: Option<Identity>, storage: &dyn KeyValueStore, keys: &StorageKeys) -> SessionState {
    let Some(identity) = identity else {
        return SessionState::Anonymous;
    };
    let mut user = SessionUser::from_identity(&identity);
    if let Some(cached) = cached_profile(storage, keys, &identity.uid) {
        user.apply(&cached);
    }
    SessionState::Authenticated(Arc::new(user))
}

#[derive(Debug)]
struct Inner {
    adapter: IdentityAdapter,
    storage: Arc<dyn KeyValueStore>,
    keys: StorageKeys,
    state: Arc<watch::Sender<SessionState>>,
    subscription: Mutex<Option<IdentitySubscription>>,
}

/// Single source of truth for who is using the app.
///
/// Clones share the same state and subscription.
#[derive(Clone, Debug)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    /// Subscribe to `adapter` and start in the `Loading` state.
    ///
    /// The state leaves `Loading` when the first identity callback lands. Must
    /// be called from within a Tokio runtime, and only once per adapter.
    pub fn start(
        adapter: IdentityAdapter,
        storage: Arc<dyn KeyValueStore>,
        keys: StorageKeys,
    ) -> Result<Self, IdentityError> {
        let (tx, _) = watch::channel(SessionState::Loading);
        let state = Arc::new(tx);

        let subscription = {
            let state = Arc::clone(&state);
            let storage = Arc::clone(&storage);
            let keys = keys.clone();
            adapter.subscribe(move |identity| {
                let next = resolve(identity, storage.as_ref(), &keys);
                match next.user() {
                    Some(user) => tracing::debug!(uid = %user.uid, "Session authenticated"),
                    None => tracing::debug!("Session anonymous"),
                }
                state.send_replace(next);
            })?
        };

        Ok(Self {
            inner: Arc::new(Inner {
                adapter,
                storage,
                keys,
                state,
                subscription: Mutex::new(Some(subscription)),
            }),
        })
    }

    pub fn adapter(&self) -> &IdentityAdapter {
        &self.inner.adapter
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.state.borrow().status()
    }

    /// The merged user, when authenticated.
    pub fn user(&self) -> Option<Arc<SessionUser>> {
        self.inner.state.borrow().user().cloned()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Merge `patch` into the session user and persist the whole result.
    ///
    /// Returns `false` without doing anything unless the session is
    /// authenticated. When the patch carries a display name or avatar, the
    /// provider's copy is updated in the background; a failure there is logged
    /// and does not undo the local change.
    pub fn update(&self, patch: UserPatch) -> bool {
        let mut merged = None;
        // Persist while the channel is locked so concurrent updates reach
        // storage in the order they were merged.
        self.inner.state.send_if_modified(|state| {
            let SessionState::Authenticated(current) = state else {
                return false;
            };
            let next = Arc::new(current.merged(&patch));
            let key = self.inner.keys.profile(&next.uid);
            if let Err(e) = storage::write_json(self.inner.storage.as_ref(), &key, next.as_ref()) {
                tracing::warn!(uid = %next.uid, error = %e, "Failed to persist session user");
            }
            *state = SessionState::Authenticated(Arc::clone(&next));
            merged = Some(next);
            true
        });
        let Some(user) = merged else {
            tracing::debug!("Ignoring session update while not authenticated");
            return false;
        };

        if patch.touches_identity() {
            self.push_identity_fields(&user);
        }
        true
    }

    /// Re-read the cached profile and merge it over the current user.
    ///
    /// Never contacts the identity provider. Returns `false` unless the
    /// session is authenticated.
    pub fn refresh(&self) -> bool {
        let Some(user) = self.user() else {
            return false;
        };
        let Some(cached) = cached_profile(self.inner.storage.as_ref(), &self.inner.keys, &user.uid) else {
            return true;
        };
        self.inner.state.send_if_modified(|state| match state {
            SessionState::Authenticated(current) if current.uid == user.uid => {
                let next = Arc::new(current.merged(&cached));
                *state = SessionState::Authenticated(next);
                true
            }
            _ => false,
        });
        true
    }

    /// Wait until the session user is `uid`.
    ///
    /// Used after a sign-in so follow-up updates are not dropped because the
    /// identity callback has not landed yet.
    pub async fn wait_for_user(&self, uid: &str, timeout: Duration) -> Result<Arc<SessionUser>, SessionError> {
        let mut rx = self.subscribe();
        let wait = async {
            loop {
                let found = rx
                    .borrow_and_update()
                    .user()
                    .filter(|user| user.uid == uid)
                    .cloned();
                if let Some(user) = found {
                    return Ok(user);
                }
                if rx.changed().await.is_err() {
                    return Err(SessionError::Closed);
                }
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .unwrap_or_else(|_| {
                Err(SessionError::Timeout {
                    uid: uid.to_string(),
                    waited_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                })
            })
    }

    /// Drop the identity subscription. Later calls do nothing.
    pub fn shutdown(&self) {
        let subscription = self
            .inner
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
            tracing::debug!("Session store shut down");
        }
    }

    fn push_identity_fields(&self, user: &SessionUser) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(uid = %user.uid, "No runtime to propagate profile fields to provider");
            return;
        };
        let adapter = self.inner.adapter.clone();
        let patch = IdentityPatch {
            display_name: user.display_name.clone(),
            photo_url: user.photo_url.clone(),
            ..Default::default()
        };
        let uid = user.uid.clone();
        runtime.spawn(async move {
            if let Err(e) = adapter.update_profile(&patch).await {
                tracing::warn!(%uid, error = %e, "Failed to propagate profile fields to provider");
            }
        });
    }
}
