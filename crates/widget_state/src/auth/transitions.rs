//! State transitions - auth FSM transition logic
//!
//! Implements the state machine that handles event-driven auth transitions.

use thiserror::Error;
use tracing::debug;

use super::events::AuthEvent;
use super::states::{AuthState, Notice};

pub const SESSION_EXPIRED_NOTICE: &str = "Your session has expired. Please sign in again.";

/// Error type for invalid state transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid transition from {from:?} with event {event}")]
    InvalidTransition { from: AuthState, event: String },
}

/// Represents a state transition result.
#[derive(Debug, Clone)]
pub struct StateTransition {
    /// The state before the transition.
    pub from: AuthState,
    /// The state after the transition.
    pub to: AuthState,
    /// The event that triggered the transition.
    pub event: AuthEvent,
    /// Whether the state actually changed.
    pub changed: bool,
}

/// Next state plus what happens to the inline notice.
struct Step {
    state: AuthState,
    notice: Option<Notice>,
}

impl Step {
    fn to(state: AuthState) -> Self {
        Self {
            state,
            notice: None,
        }
    }

    fn with(state: AuthState, notice: Notice) -> Self {
        Self {
            state,
            notice: Some(notice),
        }
    }
}

/// State machine for the email/OTP authentication flow.
#[derive(Debug, Clone)]
pub struct AuthMachine {
    /// Current state.
    current_state: AuthState,
    /// Message shown under the current step.
    notice: Option<Notice>,
    /// Transition history (limited).
    history: Vec<StateTransition>,
    /// Max history entries to keep.
    max_history: usize,
}

impl Default for AuthMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthMachine {
    /// Create a new machine in the Anonymous state.
    pub fn new() -> Self {
        Self::with_state(AuthState::Anonymous)
    }

    /// Create a machine with a specific initial state.
    pub fn with_state(state: AuthState) -> Self {
        Self {
            current_state: state,
            notice: None,
            history: Vec::new(),
            max_history: 50,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.current_state
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    /// Handle an event. Events with no rule for the current state leave it
    /// untouched and report `changed == false`.
    pub fn handle_event(&mut self, event: AuthEvent) -> StateTransition {
        match Self::compute_next_state(&self.current_state, &event) {
            Some(step) => self.apply(step, event),
            None => {
                debug!(
                    state = ?self.current_state,
                    event = event.name(),
                    "auth event ignored"
                );
                StateTransition {
                    from: self.current_state.clone(),
                    to: self.current_state.clone(),
                    event,
                    changed: false,
                }
            }
        }
    }

    /// Like [`handle_event`](Self::handle_event), but an event with no rule
    /// for the current state is an error.
    pub fn try_handle_event(&mut self, event: AuthEvent) -> Result<StateTransition, TransitionError> {
        match Self::compute_next_state(&self.current_state, &event) {
            Some(step) => Ok(self.apply(step, event)),
            None => Err(TransitionError::InvalidTransition {
                from: self.current_state.clone(),
                event: event.name().to_string(),
            }),
        }
    }

    fn apply(&mut self, step: Step, event: AuthEvent) -> StateTransition {
        let old_state = std::mem::replace(&mut self.current_state, step.state);
        self.notice = step.notice;
        let changed = old_state != self.current_state;

        let transition = StateTransition {
            from: old_state,
            to: self.current_state.clone(),
            event,
            changed,
        };

        self.history.push(transition.clone());
        if self.history.len() > self.max_history {
            self.history.remove(0);
        }

        transition
    }

    /// Compute the next state given current state and event.
    fn compute_next_state(state: &AuthState, event: &AuthEvent) -> Option<Step> {
        use AuthEvent::*;
        use AuthState::*;

        let step = match (state, event) {
            // ========== Local validation ==========
            (Anonymous | EmailEntered { .. } | OtpPending { .. }, ValidationFailed { message }) => {
                Step::with(state.clone(), Notice::error(message.clone()))
            }

            // ========== Email step ==========
            (Anonymous | EmailEntered { .. }, EmailSubmitted { email }) => {
                Step::to(EmailEntered {
                    email: email.clone(),
                })
            }
            (EmailEntered { email }, OtpSent) => Step::to(OtpPending {
                email: email.clone(),
            }),
            (EmailEntered { .. }, OtpSendFailed { message }) => {
                Step::with(state.clone(), Notice::error(message.clone()))
            }

            // ========== OTP step ==========
            (OtpPending { .. }, OtpVerified { email }) => Step::to(Authenticated {
                email: email.clone(),
            }),
            (OtpPending { .. }, OtpRejected { message })
            | (OtpPending { .. }, OtpResendFailed { message }) => {
                Step::with(state.clone(), Notice::error(message.clone()))
            }
            (OtpPending { .. }, OtpResent { message }) => {
                Step::with(state.clone(), Notice::info(message.clone()))
            }

            // ========== Stored token ==========
            (Anonymous | EmailEntered { .. } | OtpPending { .. }, TokenVerified { email }) => {
                Step::to(Authenticated {
                    email: email.clone(),
                })
            }
            (Anonymous | EmailEntered { .. } | OtpPending { .. }, TokenRejected) => {
                Step::to(state.clone())
            }

            // ========== Session end ==========
            (Authenticated { .. }, LoggedOut) => Step::to(Anonymous),
            (Authenticated { .. }, CredentialRevoked) => {
                Step::with(Anonymous, Notice::info(SESSION_EXPIRED_NOTICE))
            }

            _ => return None,
        };
        Some(step)
    }

    /// Check if an event has a rule in the current state.
    pub fn can_transition(&self, event: &AuthEvent) -> bool {
        Self::compute_next_state(&self.current_state, event).is_some()
    }

    /// Reset to Anonymous, dropping any notice.
    pub fn reset(&mut self) {
        self.current_state = AuthState::Anonymous;
        self.notice = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(email: &str) -> AuthState {
        AuthState::OtpPending {
            email: email.into(),
        }
    }

    #[test]
    fn test_basic_flow() {
        let mut sm = AuthMachine::new();
        assert_eq!(sm.state(), &AuthState::Anonymous);

        let t1 = sm.handle_event(AuthEvent::EmailSubmitted {
            email: "demo@test.com".into(),
        });
        assert!(t1.changed);
        assert_eq!(sm.state().email(), Some("demo@test.com"));

        let t2 = sm.handle_event(AuthEvent::OtpSent);
        assert!(t2.changed);
        assert_eq!(sm.state(), &pending("demo@test.com"));

        let t3 = sm.handle_event(AuthEvent::OtpVerified {
            email: "demo@test.com".into(),
        });
        assert!(t3.changed);
        assert!(sm.state().is_authenticated());
        assert!(sm.notice().is_none());
    }

    #[test]
    fn test_send_failure_keeps_email_step() {
        let mut sm = AuthMachine::with_state(AuthState::EmailEntered {
            email: "demo@test.com".into(),
        });
        let t = sm.handle_event(AuthEvent::OtpSendFailed {
            message: "Network error".into(),
        });
        assert!(!t.changed);
        assert!(matches!(sm.state(), AuthState::EmailEntered { .. }));
        assert_eq!(sm.notice(), Some(&Notice::error("Network error")));

        // Retry clears the notice.
        sm.handle_event(AuthEvent::EmailSubmitted {
            email: "demo@test.com".into(),
        });
        assert!(sm.notice().is_none());
    }

    #[test]
    fn test_rejected_otp_stays_pending_with_error() {
        let mut sm = AuthMachine::with_state(pending("demo@test.com"));
        sm.handle_event(AuthEvent::OtpRejected {
            message: "Invalid OTP. Please try again.".into(),
        });
        assert_eq!(sm.state(), &pending("demo@test.com"));
        assert!(sm.notice().unwrap().is_error());
    }

    #[test]
    fn test_resend_does_not_change_state() {
        let mut sm = AuthMachine::with_state(pending("demo@test.com"));
        let t = sm.handle_event(AuthEvent::OtpResent {
            message: "OTP resent successfully.".into(),
        });
        assert!(!t.changed);
        assert_eq!(sm.notice(), Some(&Notice::info("OTP resent successfully.")));
    }

    #[test]
    fn test_logout_and_revocation() {
        let mut sm = AuthMachine::with_state(AuthState::Authenticated {
            email: "demo@test.com".into(),
        });
        sm.handle_event(AuthEvent::LoggedOut);
        assert_eq!(sm.state(), &AuthState::Anonymous);

        let mut sm = AuthMachine::with_state(AuthState::Authenticated {
            email: "demo@test.com".into(),
        });
        sm.handle_event(AuthEvent::CredentialRevoked);
        assert_eq!(sm.state(), &AuthState::Anonymous);
        assert_eq!(sm.notice(), Some(&Notice::info(SESSION_EXPIRED_NOTICE)));
    }

    #[test]
    fn test_stored_token_paths() {
        let mut sm = AuthMachine::new();
        sm.handle_event(AuthEvent::TokenRejected);
        assert_eq!(sm.state(), &AuthState::Anonymous);

        sm.handle_event(AuthEvent::TokenVerified {
            email: "demo@test.com".into(),
        });
        assert!(sm.state().is_authenticated());
    }

    #[test]
    fn test_otp_verified_requires_pending() {
        let mut sm = AuthMachine::new();
        let err = sm
            .try_handle_event(AuthEvent::OtpVerified {
                email: "demo@test.com".into(),
            })
            .unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
        assert_eq!(sm.state(), &AuthState::Anonymous);
        assert!(!sm.can_transition(&AuthEvent::LoggedOut));
    }

    #[test]
    fn test_unknown_event_is_ignored() {
        let mut sm = AuthMachine::new();
        let t = sm.handle_event(AuthEvent::OtpSent);
        assert!(!t.changed);
        assert!(sm.history().is_empty());
    }

    #[test]
    fn test_history_tracking() {
        let mut sm = AuthMachine::new();
        sm.handle_event(AuthEvent::EmailSubmitted {
            email: "demo@test.com".into(),
        });
        sm.handle_event(AuthEvent::OtpSent);

        assert_eq!(sm.history().len(), 2);
        assert_eq!(sm.history()[1].to, pending("demo@test.com"));
    }
}
