//! The soft sign-in prompt overlay.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::{config::Settings, session::SessionState};

/// Notifications from the prompt to whoever opened it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptEvent {
    /// A sign-in completed while the prompt was open.
    LoginSuccess,
    /// The prompt is gone. Always the last event.
    Closed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PromptPhase {
    #[default]
    Open,
    /// The credential form is showing over the prompt.
    CredentialForm,
    /// Fading out after a dismiss.
    Dismissing,
    Closed,
}

#[derive(Debug, Default)]
struct Shared {
    phase: PromptPhase,
    login_reported: bool,
}

#[derive(Clone, Debug)]
struct Notifier {
    shared: Arc<Mutex<Shared>>,
    events: mpsc::UnboundedSender<PromptEvent>,
}

impl Notifier {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, event: PromptEvent) {
        // The opener may have stopped listening, which is fine.
        let _ = self.events.send(event);
    }

    fn login_success(&self) {
        let mut shared = self.lock();
        if shared.phase == PromptPhase::Closed || shared.login_reported {
            return;
        }
        shared.login_reported = true;
        self.send(PromptEvent::LoginSuccess);
    }

    fn close(&self) {
        let mut shared = self.lock();
        if shared.phase == PromptPhase::Closed {
            return;
        }
        shared.phase = PromptPhase::Closed;
        self.send(PromptEvent::Closed);
        tracing::debug!("Auth prompt closed");
    }
}

/// A dismissible overlay nudging an anonymous visitor to sign in.
///
/// Closes itself a short while after the session becomes authenticated,
/// reporting [`PromptEvent::LoginSuccess`] then [`PromptEvent::Closed`].
/// Dropping the prompt cancels its pending timers.
#[derive(Debug)]
pub struct AuthPrompt {
    notifier: Notifier,
    fade: Duration,
    watcher: Option<JoinHandle<()>>,
    fading: Option<JoinHandle<()>>,
}

impl AuthPrompt {
    /// Open the prompt, watching `session` for a sign-in.
    pub fn open(
        session: watch::Receiver<SessionState>,
        settings: &Settings,
    ) -> (Self, mpsc::UnboundedReceiver<PromptEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let notifier = Notifier {
            shared: Arc::new(Mutex::new(Shared::default())),
            events: tx,
        };

        let watcher = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => Some(runtime.spawn(auto_close(
                session,
                settings.auto_close_delay(),
                notifier.clone(),
            ))),
            Err(_) => {
                tracing::warn!("No runtime, auth prompt will not close itself on sign-in");
                None
            }
        };

        let prompt = Self {
            notifier,
            fade: settings.dismiss_fade(),
            watcher,
            fading: None,
        };
        (prompt, rx)
    }

    pub fn phase(&self) -> PromptPhase {
        self.notifier.lock().phase
    }

    pub fn is_closed(&self) -> bool {
        self.phase() == PromptPhase::Closed
    }

    /// Show the credential form. Returns `false` if the prompt is fading or closed.
    pub fn open_credential_form(&mut self) -> bool {
        let mut shared = self.notifier.lock();
        match shared.phase {
            PromptPhase::Open | PromptPhase::CredentialForm => {
                shared.phase = PromptPhase::CredentialForm;
                true
            }
            _ => false,
        }
    }

    /// Hide the credential form without signing in.
    pub fn close_credential_form(&mut self) {
        let mut shared = self.notifier.lock();
        if shared.phase == PromptPhase::CredentialForm {
            shared.phase = PromptPhase::Open;
        }
    }

    /// The credential form reported a successful sign-in.
    pub fn on_form_success(&mut self) {
        self.close_credential_form();
        self.notifier.login_success();
    }

    /// Dismiss the prompt. [`PromptEvent::Closed`] follows once the fade-out ends.
    pub fn dismiss(&mut self) {
        {
            let mut shared = self.notifier.lock();
            if matches!(shared.phase, PromptPhase::Dismissing | PromptPhase::Closed) {
                return;
            }
            shared.phase = PromptPhase::Dismissing;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.notifier.close();
            return;
        };
        let notifier = self.notifier.clone();
        let deadline = tokio::time::Instant::now() + self.fade;
        self.fading = Some(runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            notifier.close();
        }));
    }
}

impl Drop for AuthPrompt {
    fn drop(&mut self) {
        for task in [self.watcher.take(), self.fading.take()].into_iter().flatten() {
            task.abort();
        }
    }
}

async fn auto_close(mut session: watch::Receiver<SessionState>, delay: Duration, notifier: Notifier) {
    loop {
        if session.borrow_and_update().is_authenticated() {
            break;
        }
        if session.changed().await.is_err() {
            return;
        }
    }
    tokio::time::sleep(delay).await;
    notifier.login_success();
    notifier.close();
}
