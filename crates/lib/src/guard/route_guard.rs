//! Per-subtree access decision with the delayed soft sign-in prompt.

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::{sync::watch, task::JoinHandle};

use super::routes::RouteTable;
use crate::{
    config::{Settings, StorageKeys},
    session::{SessionState, SessionStatus},
    storage::KeyValueStore,
};

/// What the view layer should show for one render of a guarded subtree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GuardOutcome {
    /// The session has not resolved yet.
    Loading,
    /// Show the subtree.
    Render,
    /// Show the subtree with the sign-in prompt over it.
    RenderWithPrompt,
    /// Replace the location with `to`, remembering where the visitor was headed.
    Redirect { to: String, from: String },
}

/// Prompt state owned by one guard instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PromptFlags {
    /// The prompt has been triggered and not closed.
    pub shown: bool,
    /// The prompt was shown at some point in this browser session.
    pub seen: bool,
}

/// Inputs the prompt timer depends on. A change cancels the pending timer.
#[derive(Clone, Debug, PartialEq, Eq)]
struct TimerDeps {
    status: SessionStatus,
    uid: Option<String>,
    is_public: bool,
    seen: bool,
}

impl TimerDeps {
    fn should_arm(&self) -> bool {
        self.status == SessionStatus::Anonymous && !self.is_public && !self.seen
    }
}

/// Guard wrapping one subtree of views.
///
/// Created with [`mount`](Self::mount) and driven by calling
/// [`render`](Self::render) whenever the session or location changes. Dropping
/// the guard is the unmount and cancels any pending prompt timer.
#[derive(Debug)]
pub struct RouteGuard {
    routes: RouteTable,
    home_route: String,
    prompt_delay: Duration,
    require_auth: bool,
    session_storage: Arc<dyn KeyValueStore>,
    keys: StorageKeys,
    flags: Arc<watch::Sender<PromptFlags>>,
    deps: Option<TimerDeps>,
    timer: Option<JoinHandle<()>>,
}

impl RouteGuard {
    /// Mount a guard.
    ///
    /// # Arguments
    /// * `settings` - Route table, home route and prompt delay
    /// * `session_storage` - Session-scoped store holding the prompt-seen flag
    /// * `require_auth` - Whether anonymous visitors are kept out of protected routes
    pub fn mount(settings: &Settings, session_storage: Arc<dyn KeyValueStore>, require_auth: bool) -> Self {
        let keys = settings.keys();
        let seen = match session_storage.get(&keys.prompt_seen()) {
            Ok(value) => value.is_some_and(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read prompt-seen flag");
                false
            }
        };
        let (flags, _) = watch::channel(PromptFlags { shown: false, seen });

        Self {
            routes: settings.route_table(),
            home_route: settings.home_route.clone(),
            prompt_delay: settings.prompt_delay(),
            require_auth,
            session_storage,
            keys,
            flags: Arc::new(flags),
            deps: None,
            timer: None,
        }
    }

    pub fn require_auth(&self) -> bool {
        self.require_auth
    }

    /// Decide what to show for `location` under `session`.
    ///
    /// Also arms the prompt timer when an anonymous visitor is on a protected
    /// route and has not seen the prompt, and cancels it when any of those
    /// inputs change.
    pub fn render(&mut self, session: &SessionState, location: &str) -> GuardOutcome {
        let is_public = self.routes.is_public(location);
        let seen = self.flags.borrow().seen;
        self.sync_timer(TimerDeps {
            status: session.status(),
            uid: session.user().map(|u| u.uid.clone()),
            is_public,
            seen,
        });

        if session.is_loading() {
            return GuardOutcome::Loading;
        }

        if session.is_anonymous() && !is_public && self.require_auth {
            if self.flags.borrow().shown {
                return GuardOutcome::RenderWithPrompt;
            }
            tracing::debug!(%location, to = %self.home_route, "Redirecting anonymous visitor");
            return GuardOutcome::Redirect {
                to: self.home_route.clone(),
                from: location.to_string(),
            };
        }

        GuardOutcome::Render
    }

    /// Hide the prompt. Called when the prompt closes or reports a sign-in.
    pub fn close_prompt(&mut self) {
        self.flags.send_modify(|flags| flags.shown = false);
    }

    /// Whether the prompt timer has fired and the prompt is still open.
    pub fn prompt_triggered(&self) -> bool {
        self.flags.borrow().shown
    }

    pub fn has_seen_prompt(&self) -> bool {
        self.flags.borrow().seen
    }

    /// Whether a prompt timer is pending.
    pub fn is_timer_armed(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Receiver notified when the prompt flags change, so the caller knows to render again.
    pub fn subscribe_prompt(&self) -> watch::Receiver<PromptFlags> {
        self.flags.subscribe()
    }

    fn sync_timer(&mut self, deps: TimerDeps) {
        if self.deps.as_ref() == Some(&deps) {
            return;
        }
        self.cancel_timer();
        if deps.should_arm() {
            self.arm_timer();
        }
        self.deps = Some(deps);
    }

    fn arm_timer(&mut self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No runtime, prompt timer not armed");
            return;
        };
        let deadline = tokio::time::Instant::now() + self.prompt_delay;
        let flags = Arc::clone(&self.flags);
        let storage = Arc::clone(&self.session_storage);
        let key = self.keys.prompt_seen();

        self.timer = Some(runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Err(e) = storage.set(&key, "true") {
                tracing::warn!(error = %e, "Failed to persist prompt-seen flag");
            }
            flags.send_modify(|flags| {
                flags.shown = true;
                flags.seen = true;
            });
            tracing::debug!("Soft sign-in prompt triggered");
        }));
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for RouteGuard {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
