//! Auth controller - drives the auth machine with backend calls
//!
//! Every request is followed by exactly one machine event, so the machine
//! never sees a half-finished step. Failures become inline notices; nothing
//! is returned to the caller as an error.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use widget_client::{ApiError, SendOtpRequest, VerifyOtpRequest, WidgetApi};
use widget_core::{is_valid_email, normalize_otp, AuthCredential};
use widget_state::{AuthEvent, AuthMachine, AuthState, Notice, StateTransition};

use crate::events::{EventBroadcaster, WidgetEvent};
use crate::guard::BusyFlag;
use crate::storage::CredentialVault;

pub const EMPTY_EMAIL_MESSAGE: &str = "Please enter your email address";
pub const INVALID_EMAIL_MESSAGE: &str = "Please enter a valid email address";
pub const EMPTY_OTP_MESSAGE: &str = "Please enter the verification code";
pub const SEND_OTP_FAILED_MESSAGE: &str = "Failed to send OTP. Please try again.";
pub const NETWORK_ERROR_MESSAGE: &str =
    "Network error. Please check your connection and try again.";
pub const INVALID_OTP_MESSAGE: &str = "Invalid OTP. Please try again.";
pub const VERIFICATION_FAILED_MESSAGE: &str = "Verification failed. Please try again.";
pub const OTP_RESENT_MESSAGE: &str = "OTP resent successfully.";
pub const RESEND_FAILED_MESSAGE: &str = "Failed to resend OTP. Please try again.";

pub struct AuthController {
    api: Arc<dyn WidgetApi>,
    vault: CredentialVault,
    client_id: String,
    machine: Mutex<AuthMachine>,
    credential: Mutex<Option<AuthCredential>>,
    busy: BusyFlag,
    events: EventBroadcaster,
}

impl AuthController {
    pub fn new(
        api: Arc<dyn WidgetApi>,
        vault: CredentialVault,
        client_id: impl Into<String>,
        events: EventBroadcaster,
    ) -> Self {
        Self {
            api,
            vault,
            client_id: client_id.into(),
            machine: Mutex::new(AuthMachine::new()),
            credential: Mutex::new(None),
            busy: BusyFlag::new(),
            events,
        }
    }

    pub fn state(&self) -> AuthState {
        self.machine.lock().state().clone()
    }

    pub fn notice(&self) -> Option<Notice> {
        self.machine.lock().notice().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.machine.lock().state().is_authenticated()
    }

    /// The held credential. Present exactly when authenticated.
    pub fn credential(&self) -> Option<AuthCredential> {
        self.credential.lock().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    fn apply(&self, event: AuthEvent) -> StateTransition {
        let (transition, notice) = {
            let mut machine = self.machine.lock();
            let transition = machine.handle_event(event);
            (transition, machine.notice().cloned())
        };
        debug!(
            from = ?transition.from,
            to = ?transition.to,
            event = transition.event.name(),
            "auth transition"
        );
        self.events.broadcast(WidgetEvent::AuthChanged {
            state: transition.to.clone(),
            notice,
        });
        transition
    }

    /// Check a stored token at mount. Any failure leaves no credential
    /// behind, in memory or in storage.
    pub async fn restore(&self) -> AuthState {
        let Some(_guard) = self.busy.try_acquire() else {
            return self.state();
        };

        let stored = self.vault.load().await;
        let Some(token) = stored.token else {
            if stored.email.is_some() {
                self.forget_stored().await;
            }
            return self.state();
        };

        match self.api.verify_token(&token).await {
            Ok(response) => match response.verified_email() {
                Some(email) => {
                    if let Err(e) = self.vault.save_email(&email).await {
                        warn!(error = %e, "failed to refresh stored email");
                    }
                    *self.credential.lock() = Some(AuthCredential::new(token, email.clone()));
                    self.apply(AuthEvent::TokenVerified { email });
                    info!("stored credential verified");
                }
                None => {
                    debug!(message = ?response.message, "stored token rejected");
                    self.reject_stored().await;
                }
            },
            Err(e) => {
                warn!(error = %e, "stored token could not be verified");
                self.reject_stored().await;
            }
        }
        self.state()
    }

    async fn reject_stored(&self) {
        *self.credential.lock() = None;
        self.forget_stored().await;
        self.apply(AuthEvent::TokenRejected);
    }

    async fn forget_stored(&self) {
        if let Err(e) = self.vault.clear().await {
            warn!(error = %e, "failed to clear stored credential");
        }
    }

    /// Email step. Returns `None` when the step is not available (another
    /// auth request in flight, or the current state has no email step).
    pub async fn submit_email(&self, input: &str) -> Option<StateTransition> {
        let _guard = self.busy.try_acquire()?;

        let email = input.trim();
        if email.is_empty() {
            return Some(self.validation_failed(EMPTY_EMAIL_MESSAGE));
        }
        if !is_valid_email(email) {
            return Some(self.validation_failed(INVALID_EMAIL_MESSAGE));
        }

        let submitted = AuthEvent::EmailSubmitted {
            email: email.to_string(),
        };
        if !self.machine.lock().can_transition(&submitted) {
            return None;
        }
        self.apply(submitted);

        let request = SendOtpRequest {
            email: email.to_string(),
        };
        let event = match self.api.send_otp(request).await {
            Ok(response) if response.success => AuthEvent::OtpSent,
            Ok(response) => AuthEvent::OtpSendFailed {
                message: server_message(response.message, SEND_OTP_FAILED_MESSAGE),
            },
            Err(e) => {
                warn!(error = %e, "send-otp failed");
                AuthEvent::OtpSendFailed {
                    message: NETWORK_ERROR_MESSAGE.to_string(),
                }
            }
        };
        Some(self.apply(event))
    }

    fn validation_failed(&self, message: &str) -> StateTransition {
        self.apply(AuthEvent::ValidationFailed {
            message: message.to_string(),
        })
    }

    /// OTP step. The code is opaque: trimmed, capped at six characters and
    /// otherwise sent as typed.
    pub async fn verify_otp(&self, code: &str) -> Option<StateTransition> {
        let _guard = self.busy.try_acquire()?;

        let email = match self.machine.lock().state() {
            AuthState::OtpPending { email } => email.clone(),
            _ => return None,
        };
        let Some(otp) = normalize_otp(code) else {
            return Some(self.validation_failed(EMPTY_OTP_MESSAGE));
        };

        let request = VerifyOtpRequest {
            email,
            otp,
            client_id: self.client_id.clone(),
        };
        let event = match self.api.verify_otp(request).await {
            Ok(response) => match response.credential() {
                Some(credential) => {
                    if let Err(e) = self.vault.save(&credential).await {
                        warn!(error = %e, "credential could not be persisted");
                    }
                    let email = credential.email.clone();
                    *self.credential.lock() = Some(credential);
                    info!(%email, "signed in");
                    AuthEvent::OtpVerified { email }
                }
                None => AuthEvent::OtpRejected {
                    message: server_message(response.message, INVALID_OTP_MESSAGE),
                },
            },
            Err(e) => {
                warn!(error = %e, "verify-otp failed");
                AuthEvent::OtpRejected {
                    message: VERIFICATION_FAILED_MESSAGE.to_string(),
                }
            }
        };
        Some(self.apply(event))
    }

    /// Ask for a new code. State is unchanged; only the notice moves.
    pub async fn resend_otp(&self) -> Option<StateTransition> {
        let _guard = self.busy.try_acquire()?;

        let email = match self.machine.lock().state() {
            AuthState::OtpPending { email } => email.clone(),
            _ => return None,
        };

        let event = match self.api.resend_otp(SendOtpRequest { email }).await {
            Ok(response) if response.success => AuthEvent::OtpResent {
                message: OTP_RESENT_MESSAGE.to_string(),
            },
            Ok(_) => AuthEvent::OtpResendFailed {
                message: RESEND_FAILED_MESSAGE.to_string(),
            },
            Err(e) => {
                warn!(error = %e, "resend-otp failed");
                AuthEvent::OtpResendFailed {
                    message: NETWORK_ERROR_MESSAGE.to_string(),
                }
            }
        };
        Some(self.apply(event))
    }

    pub async fn logout(&self) -> Option<StateTransition> {
        if !self.is_authenticated() {
            return None;
        }
        *self.credential.lock() = None;
        self.forget_stored().await;
        info!("signed out");
        Some(self.apply(AuthEvent::LoggedOut))
    }

    /// An authenticated call came back with an auth error.
    pub async fn revoke(&self, error: &ApiError) -> Option<StateTransition> {
        if !self.is_authenticated() {
            return None;
        }
        warn!(%error, "credential rejected by server");
        *self.credential.lock() = None;
        self.forget_stored().await;
        Some(self.apply(AuthEvent::CredentialRevoked))
    }
}

fn server_message(message: Option<String>, fallback: &str) -> String {
    message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}
