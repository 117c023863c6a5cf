//! Transcript messages and the credential pair they are sent under.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        MessageId(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

/// One entry of the live chat transcript.
///
/// Suggestion and follow-up blocks are separate bot entries whose
/// `in_reply_to` names the answer that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: MessageId,
    pub sender: Sender,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub follow_ups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<MessageId>,
    /// True while the typewriter is still revealing `text`; the cursor is
    /// drawn exactly when this is set.
    #[serde(default)]
    pub revealing: bool,
}

impl ConversationMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text.into())
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(Sender::Bot, text.into())
    }

    /// An empty bot message that the typewriter will fill in.
    pub fn bot_revealing() -> Self {
        let mut message = Self::new(Sender::Bot, String::new());
        message.revealing = true;
        message
    }

    pub fn suggestions(answer: MessageId, label: &str, suggestions: Vec<String>) -> Self {
        let mut message = Self::bot(label);
        message.suggestions = suggestions;
        message.in_reply_to = Some(answer);
        message
    }

    pub fn follow_ups(answer: MessageId, label: &str, follow_ups: Vec<String>) -> Self {
        let mut message = Self::bot(label);
        message.follow_ups = follow_ups;
        message.in_reply_to = Some(answer);
        message
    }

    fn new(sender: Sender, text: String) -> Self {
        Self {
            id: MessageId::new(),
            sender,
            text,
            suggestions: Vec::new(),
            follow_ups: Vec::new(),
            in_reply_to: None,
            revealing: false,
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }

    /// Labels this message offers as clickable shortcuts.
    pub fn shortcuts(&self) -> impl Iterator<Item = &str> {
        self.suggestions
            .iter()
            .chain(self.follow_ups.iter())
            .map(String::as_str)
    }
}

/// Bearer token plus the email it was issued to. Both are required, so a
/// credential is never half populated.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthCredential {
    pub token: String,
    pub email: String,
}

impl AuthCredential {
    pub fn new(token: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            email: email.into(),
        }
    }
}

impl fmt::Debug for AuthCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCredential")
            .field("token", &"***")
            .field("email", &self.email)
            .finish()
    }
}

/// Raw values read back from durable storage at mount, before verification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredCredential {
    pub token: Option<String>,
    pub email: Option<String>,
}

impl StoredCredential {
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.email.is_none()
    }
}
