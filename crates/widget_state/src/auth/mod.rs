//! Authentication state machine
//!
//! Email entry, OTP verification and the authenticated session.

mod events;
mod states;
mod transitions;

pub use events::AuthEvent;
pub use states::{AuthState, Notice, NoticeKind};
pub use transitions::{AuthMachine, StateTransition, TransitionError, SESSION_EXPIRED_NOTICE};
