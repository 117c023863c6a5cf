use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use widget_client::{WidgetApi, WidgetApiClient};
use widget_core::{AuthCredential, ConversationMessage, HistorySession, SessionId, WidgetConfig};
use widget_state::{
    AuthState, HistoryStatus, NavigationOutcome, Notice, StateTransition, ViewKind, ViewState,
    ViewNavigator,
};

use crate::auth::AuthController;
use crate::error::{EngineError, Result};
use crate::events::{EventBroadcaster, WidgetEvent};
use crate::history::HistoryLoader;
use crate::pipeline::{MessagePipeline, SendOutcome};
use crate::storage::{CredentialVault, FileKeyValueStore, KeyValueStore};
use crate::transcript::Transcript;

/// Which top-level panel is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Surface {
    #[default]
    Closed,
    /// Email / OTP entry.
    Auth,
    /// Chat, history and session-detail views.
    Chat,
}

/// One mounted widget. Cheap to clone; clones share the instance.
#[derive(Clone)]
pub struct Widget {
    inner: Arc<Inner>,
}

struct Inner {
    config: WidgetConfig,
    session_id: SessionId,
    auth: Arc<AuthController>,
    pipeline: MessagePipeline,
    history: HistoryLoader,
    navigator: Mutex<ViewNavigator>,
    surface: Mutex<Surface>,
    transcript: Arc<Mutex<Transcript>>,
    events: EventBroadcaster,
    shutdown: CancellationToken,
}

impl Widget {
    pub fn new(
        config: WidgetConfig,
        api: Arc<dyn WidgetApi>,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        config.validate()?;

        let session_id = SessionId::generate();
        let events = EventBroadcaster::new();
        let shutdown = CancellationToken::new();
        let transcript = Arc::new(Mutex::new(Transcript::with_welcome()));

        let auth = Arc::new(AuthController::new(
            Arc::clone(&api),
            CredentialVault::new(store),
            config.client_id.clone(),
            events.clone(),
        ));
        let pipeline = MessagePipeline::new(
            Arc::clone(&api),
            Arc::clone(&auth),
            config.client_id.clone(),
            session_id.clone(),
            config.pacing.clone(),
            Arc::clone(&transcript),
            events.clone(),
            shutdown.clone(),
        );
        let history = HistoryLoader::new(api, Arc::clone(&auth));

        info!(session_id = %session_id, client_id = %config.client_id, "widget created");
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                session_id,
                auth,
                pipeline,
                history,
                navigator: Mutex::new(ViewNavigator::new()),
                surface: Mutex::new(Surface::Closed),
                transcript,
                events,
                shutdown,
            }),
        })
    }

    /// Build a widget backed by the HTTP client and file storage under the
    /// configured storage directory.
    pub fn connect(config: WidgetConfig) -> Result<Self> {
        config.validate()?;
        let api = Arc::new(WidgetApiClient::new(&config)?);
        let store = Arc::new(FileKeyValueStore::new(config.storage_dir()));
        Self::new(config, api, store)
    }

    /// Restore a stored credential, if any.
    pub async fn mount(&self) -> AuthState {
        self.inner.auth.restore().await
    }

    // ========== Accessors ==========

    pub fn config(&self) -> &WidgetConfig {
        &self.inner.config
    }

    pub fn session_id(&self) -> &SessionId {
        &self.inner.session_id
    }

    pub fn auth_state(&self) -> AuthState {
        self.inner.auth.state()
    }

    pub fn auth_notice(&self) -> Option<Notice> {
        self.inner.auth.notice()
    }

    pub fn credential(&self) -> Option<AuthCredential> {
        self.inner.auth.credential()
    }

    pub fn surface(&self) -> Surface {
        *self.inner.surface.lock()
    }

    pub fn view(&self) -> ViewState {
        self.inner.navigator.lock().view().clone()
    }

    pub fn history_status(&self) -> HistoryStatus {
        self.inner.navigator.lock().status().clone()
    }

    pub fn transcript(&self) -> Vec<ConversationMessage> {
        self.inner.transcript.lock().messages().to_vec()
    }

    pub fn is_typing(&self) -> bool {
        self.inner.transcript.lock().is_typing()
    }

    pub fn is_sending(&self) -> bool {
        self.inner.pipeline.is_in_flight()
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<WidgetEvent> {
        self.inner.events.subscribe()
    }

    // ========== Surfaces ==========

    fn set_surface(&self, surface: Surface) {
        let changed = std::mem::replace(&mut *self.inner.surface.lock(), surface) != surface;
        if changed {
            debug!(?surface, "surface changed");
            self.inner.events.broadcast(WidgetEvent::SurfaceChanged(surface));
        }
    }

    /// Open the widget. Without a credential the auth flow is shown instead
    /// of the chat.
    pub fn open(&self) -> Surface {
        if self.is_torn_down() {
            return self.surface();
        }
        let surface = if self.inner.auth.is_authenticated() {
            Surface::Chat
        } else {
            Surface::Auth
        };
        self.set_surface(surface);
        surface
    }

    pub fn close(&self) {
        self.set_surface(Surface::Closed);
    }

    /// Lost the credential mid-session: drop history state and fall back to
    /// the auth flow if the chat was showing.
    fn sync_with_auth(&self) {
        if self.inner.auth.is_authenticated() {
            return;
        }
        self.inner.navigator.lock().reset();
        if self.surface() == Surface::Chat {
            self.set_surface(Surface::Auth);
        }
    }

    // ========== Auth ==========

    pub async fn submit_email(&self, email: &str) -> Option<StateTransition> {
        self.inner.auth.submit_email(email).await
    }

    /// On success the auth surface switches to the chat.
    pub async fn verify_otp(&self, code: &str) -> Option<StateTransition> {
        let transition = self.inner.auth.verify_otp(code).await;
        if self.inner.auth.is_authenticated() && self.surface() == Surface::Auth {
            self.set_surface(Surface::Chat);
        }
        transition
    }

    pub async fn resend_otp(&self) -> Option<StateTransition> {
        self.inner.auth.resend_otp().await
    }

    /// Clear the credential and close the widget.
    pub async fn logout(&self) -> Option<StateTransition> {
        let transition = self.inner.auth.logout().await;
        if transition.is_some() {
            self.inner.navigator.lock().reset();
            self.close();
        }
        transition
    }

    // ========== Chat ==========

    pub async fn send(&self, text: &str) -> SendOutcome {
        let outcome = self.inner.pipeline.send(text).await;
        self.sync_with_auth();
        outcome
    }

    /// A suggestion or follow-up click; identical to typing the label.
    pub async fn send_follow_up(&self, label: &str) -> SendOutcome {
        self.send(label).await
    }

    // ========== Views ==========

    fn ensure_signed_in(&self) -> Result<()> {
        if self.is_torn_down() {
            return Err(EngineError::TornDown);
        }
        if !self.inner.auth.is_authenticated() {
            return Err(EngineError::NotAuthenticated);
        }
        Ok(())
    }

    /// Switch to the history list, fetching unless a cached list may be
    /// reused.
    pub async fn show_history(&self) -> Result<HistoryStatus> {
        self.ensure_signed_in()?;
        let outcome = self.inner.navigator.lock().open_history();
        self.enter_history(outcome).await
    }

    /// From a session detail back to the list it came from.
    pub async fn back_to_history(&self) -> Result<HistoryStatus> {
        self.ensure_signed_in()?;
        let outcome = self.inner.navigator.lock().back_to_history()?;
        self.enter_history(outcome).await
    }

    async fn enter_history(&self, outcome: NavigationOutcome) -> Result<HistoryStatus> {
        self.inner
            .events
            .broadcast(WidgetEvent::ViewChanged(ViewKind::History));

        if outcome.fetch_required {
            let ticket = self.inner.navigator.lock().begin_fetch();
            self.inner
                .events
                .broadcast(WidgetEvent::HistoryUpdated(HistoryStatus::Loading));

            let load = self.inner.history.load_summaries().await;

            let applied = {
                let mut navigator = self.inner.navigator.lock();
                navigator
                    .complete_fetch(ticket, load)
                    .then(|| navigator.status().clone())
            };
            if let Some(status) = applied {
                self.inner.events.broadcast(WidgetEvent::HistoryUpdated(status));
            }
            self.sync_with_auth();
        } else {
            let status = self.history_status();
            self.inner.events.broadcast(WidgetEvent::HistoryUpdated(status));
        }

        Ok(self.history_status())
    }

    /// Open one session from the cached list. No network call.
    pub fn select_session(&self, index: usize) -> Result<HistorySession> {
        let session = self.inner.navigator.lock().select_session(index)?;
        self.inner
            .events
            .broadcast(WidgetEvent::ViewChanged(ViewKind::SessionDetail));
        self.inner
            .events
            .broadcast(WidgetEvent::SessionOpened(session.clone()));
        Ok(session)
    }

    /// Back to the live chat. Drops the history cache.
    pub fn show_chat(&self) -> Result<()> {
        self.inner.navigator.lock().back_to_chat()?;
        self.inner
            .events
            .broadcast(WidgetEvent::ViewChanged(ViewKind::Chat));
        Ok(())
    }

    // ========== Lifecycle ==========

    /// Cancel every reveal and scheduled block. Requests already in flight
    /// may finish but change nothing visible.
    pub fn teardown(&self) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }
        self.inner.shutdown.cancel();
        info!(session_id = %self.inner.session_id, "widget torn down");
        self.inner.events.broadcast(WidgetEvent::TornDown);
    }
}
