//! View navigation - chat / history / session-detail router
//!
//! Owns the history cache. Arriving at the history view from chat always
//! refetches; coming back from a session detail reuses what was fetched.
//! Returning to chat drops the cache so the next visit shows server state.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use widget_core::HistorySession;

pub const NO_HISTORY_MESSAGE: &str =
    "No chat history found. Start a conversation to see your history here!";
pub const HISTORY_LOAD_FAILED_MESSAGE: &str = "Failed to load chat history. Please try again later.";
pub const LOADING_HISTORY_MESSAGE: &str = "Loading your chat history...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewKind {
    Chat,
    History,
    SessionDetail,
}

/// The active view. Exactly one is active at a time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ViewState {
    #[default]
    Chat,
    History,
    SessionDetail { session: HistorySession },
}

impl ViewState {
    pub fn kind(&self) -> ViewKind {
        match self {
            ViewState::Chat => ViewKind::Chat,
            ViewState::History => ViewKind::History,
            ViewState::SessionDetail { .. } => ViewKind::SessionDetail,
        }
    }
}

/// Result of one history fetch, as classified by the loader.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryLoad {
    Loaded(Vec<HistorySession>),
    Empty,
    Failed(String),
}

/// What the history view is currently showing.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HistoryStatus {
    #[default]
    Idle,
    Loading,
    Loaded(Vec<HistorySession>),
    Empty,
    Failed(String),
}

impl HistoryStatus {
    /// Placeholder text for states that have no session list.
    pub fn message(&self) -> Option<&str> {
        match self {
            HistoryStatus::Idle | HistoryStatus::Loaded(_) => None,
            HistoryStatus::Loading => Some(LOADING_HISTORY_MESSAGE),
            HistoryStatus::Empty => Some(NO_HISTORY_MESSAGE),
            HistoryStatus::Failed(message) => Some(message),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("No route from {from:?} to {to:?}")]
    NoRoute { from: ViewKind, to: ViewKind },

    #[error("History has not been loaded")]
    NoCachedHistory,

    #[error("Session {index} out of range ({len} sessions)")]
    SessionOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationOutcome {
    pub from: ViewKind,
    pub to: ViewKind,
    /// The caller must start a history fetch.
    pub fetch_required: bool,
}

/// Handle for one outstanding history fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

#[derive(Debug, Default)]
pub struct ViewNavigator {
    view: ViewState,
    cache: Option<Vec<HistorySession>>,
    status: HistoryStatus,
    fetch_seq: u64,
    pending_fetch: Option<u64>,
}

impl ViewNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn kind(&self) -> ViewKind {
        self.view.kind()
    }

    pub fn status(&self) -> &HistoryStatus {
        &self.status
    }

    pub fn cached_sessions(&self) -> Option<&[HistorySession]> {
        self.cache.as_deref()
    }

    /// Switch to the history view.
    pub fn open_history(&mut self) -> NavigationOutcome {
        let from = self.kind();
        let fetch_required = match from {
            ViewKind::Chat => {
                self.cache = None;
                true
            }
            ViewKind::History | ViewKind::SessionDetail => self.cache.is_none(),
        };

        self.view = ViewState::History;
        if let Some(sessions) = &self.cache {
            self.status = HistoryStatus::Loaded(sessions.clone());
        }

        debug!(?from, fetch_required, "opened history view");
        NavigationOutcome {
            from,
            to: ViewKind::History,
            fetch_required,
        }
    }

    /// Mark a fetch as started. Only the newest ticket can complete.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.fetch_seq += 1;
        self.pending_fetch = Some(self.fetch_seq);
        self.status = HistoryStatus::Loading;
        FetchTicket(self.fetch_seq)
    }

    /// Apply a fetch result. Returns `false` when the result is stale: a newer
    /// fetch started or the user already left the history view.
    pub fn complete_fetch(&mut self, ticket: FetchTicket, load: HistoryLoad) -> bool {
        if self.pending_fetch != Some(ticket.0) || self.kind() != ViewKind::History {
            debug!(ticket = ticket.0, "discarding stale history fetch");
            return false;
        }
        self.pending_fetch = None;

        match load {
            HistoryLoad::Loaded(sessions) => {
                self.status = HistoryStatus::Loaded(sessions.clone());
                self.cache = Some(sessions);
            }
            HistoryLoad::Empty => {
                self.cache = None;
                self.status = HistoryStatus::Empty;
            }
            HistoryLoad::Failed(message) => {
                self.cache = None;
                self.status = HistoryStatus::Failed(message);
            }
        }
        true
    }

    /// Open one cached session. Pure lookup, no fetch.
    pub fn select_session(&mut self, index: usize) -> Result<HistorySession, NavigationError> {
        if self.kind() != ViewKind::History {
            return Err(NavigationError::NoRoute {
                from: self.kind(),
                to: ViewKind::SessionDetail,
            });
        }
        let sessions = self.cache.as_ref().ok_or(NavigationError::NoCachedHistory)?;
        let session = sessions
            .get(index)
            .cloned()
            .ok_or(NavigationError::SessionOutOfRange {
                index,
                len: sessions.len(),
            })?;

        self.view = ViewState::SessionDetail {
            session: session.clone(),
        };
        Ok(session)
    }

    /// Leave a session detail for the list it was opened from.
    pub fn back_to_history(&mut self) -> Result<NavigationOutcome, NavigationError> {
        if self.kind() != ViewKind::SessionDetail {
            return Err(NavigationError::NoRoute {
                from: self.kind(),
                to: ViewKind::History,
            });
        }
        Ok(self.open_history())
    }

    /// Return to the live chat. Session detail has no direct route; go
    /// through history.
    pub fn back_to_chat(&mut self) -> Result<NavigationOutcome, NavigationError> {
        let from = self.kind();
        if from == ViewKind::SessionDetail {
            return Err(NavigationError::NoRoute {
                from,
                to: ViewKind::Chat,
            });
        }
        self.reset();
        Ok(NavigationOutcome {
            from,
            to: ViewKind::Chat,
            fetch_required: false,
        })
    }

    /// Back to chat from anywhere and forget all history state.
    pub fn reset(&mut self) {
        self.view = ViewState::Chat;
        self.cache = None;
        self.status = HistoryStatus::Idle;
        self.pending_fetch = None;
    }
}
