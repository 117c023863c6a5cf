//! Auth states - every step of the email/OTP flow

use serde::{Deserialize, Serialize};

/// Defines the possible states of the widget's authentication.
///
/// Only `Authenticated` may issue chat or history requests.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum AuthState {
    /// No credential; the auth surface shows the email step.
    #[default]
    Anonymous,

    /// A valid email was submitted and the send-OTP request is outstanding
    /// or failed.
    EmailEntered { email: String },

    /// The server sent a code to `email`; waiting for the user to enter it.
    OtpPending { email: String },

    /// A credential for `email` is held.
    Authenticated { email: String },
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated { .. })
    }

    /// The email this state refers to, if any.
    pub fn email(&self) -> Option<&str> {
        match self {
            AuthState::Anonymous => None,
            AuthState::EmailEntered { email }
            | AuthState::OtpPending { email }
            | AuthState::Authenticated { email } => Some(email),
        }
    }

    /// Whether the OTP entry step is the one on screen.
    pub fn shows_otp_step(&self) -> bool {
        matches!(self, AuthState::OtpPending { .. })
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Error,
    Info,
}

/// Inline message shown under the current auth step.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}
