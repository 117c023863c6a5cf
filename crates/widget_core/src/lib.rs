//! widget_core - Core types for the chat widget
//!
//! This crate provides the foundational types used across all widget crates:
//! - `session` - per-mount correlation id
//! - `message` - live transcript messages
//! - `history` - past sessions returned by the backend
//! - `config` - widget configuration, theme and pacing
//! - `validation` - local checks that run before any network call

pub mod config;
pub mod error;
pub mod history;
pub mod message;
pub mod paths;
pub mod session;
pub mod validation;

// Re-export commonly used types
pub use config::{
    FollowUpTiming, PacingConfig, RevealMode, Theme, WidgetConfig, WidgetPosition, WidgetSize,
};
pub use error::ConfigError;
pub use history::{Confidence, HistorySession, HistoryTurn};
pub use message::{AuthCredential, ConversationMessage, MessageId, Sender, StoredCredential};
pub use session::SessionId;
pub use validation::{is_valid_email, normalize_otp, OTP_MAX_LEN};
