//! widget_state - Pure state machines for the chat widget
//!
//! Nothing in this crate performs I/O. The engine feeds events in and
//! renders whatever state comes out.

pub mod auth;
pub mod navigator;

// Re-export commonly used types
pub use auth::{
    AuthEvent, AuthMachine, AuthState, Notice, NoticeKind, StateTransition, TransitionError,
    SESSION_EXPIRED_NOTICE,
};
pub use navigator::{
    FetchTicket, HistoryLoad, HistoryStatus, NavigationError, NavigationOutcome, ViewKind,
    ViewNavigator, ViewState, HISTORY_LOAD_FAILED_MESSAGE, NO_HISTORY_MESSAGE,
};
