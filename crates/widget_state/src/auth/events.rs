//! Auth events - inputs that drive the authentication machine

use serde::{Deserialize, Serialize};

/// Defines the events that can trigger auth state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEvent {
    // ========== Local Events ==========
    /// Input failed a local check; nothing was sent.
    ValidationFailed { message: String },

    /// A syntactically valid email was submitted.
    EmailSubmitted { email: String },

    /// The user logged out.
    LoggedOut,

    // ========== Server Events ==========
    /// The server accepted the send-OTP request.
    OtpSent,

    /// The send-OTP request failed (server or transport).
    OtpSendFailed { message: String },

    /// The server accepted the code and issued a credential for `email`.
    OtpVerified { email: String },

    /// The code was rejected or could not be verified.
    OtpRejected { message: String },

    /// A resend request was accepted.
    OtpResent { message: String },

    /// A resend request failed.
    OtpResendFailed { message: String },

    /// A stored token was confirmed at mount.
    TokenVerified { email: String },

    /// A stored token was rejected or could not be checked.
    TokenRejected,

    /// An authenticated API call was answered with an auth error.
    CredentialRevoked,
}

impl AuthEvent {
    /// Check if this event came back from the backend.
    pub fn is_server_event(&self) -> bool {
        matches!(
            self,
            Self::OtpSent
                | Self::OtpSendFailed { .. }
                | Self::OtpVerified { .. }
                | Self::OtpRejected { .. }
                | Self::OtpResent { .. }
                | Self::OtpResendFailed { .. }
                | Self::TokenVerified { .. }
                | Self::TokenRejected
                | Self::CredentialRevoked
        )
    }

    /// Check if this event reports a failure to show inline.
    pub fn is_error_event(&self) -> bool {
        matches!(
            self,
            Self::ValidationFailed { .. }
                | Self::OtpSendFailed { .. }
                | Self::OtpRejected { .. }
                | Self::OtpResendFailed { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ValidationFailed { .. } => "validation_failed",
            Self::EmailSubmitted { .. } => "email_submitted",
            Self::LoggedOut => "logged_out",
            Self::OtpSent => "otp_sent",
            Self::OtpSendFailed { .. } => "otp_send_failed",
            Self::OtpVerified { .. } => "otp_verified",
            Self::OtpRejected { .. } => "otp_rejected",
            Self::OtpResent { .. } => "otp_resent",
            Self::OtpResendFailed { .. } => "otp_resend_failed",
            Self::TokenVerified { .. } => "token_verified",
            Self::TokenRejected => "token_rejected",
            Self::CredentialRevoked => "credential_revoked",
        }
    }
}
