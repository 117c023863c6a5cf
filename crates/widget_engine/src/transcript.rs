use widget_core::{ConversationMessage, MessageId};

pub const WELCOME_MESSAGE: &str = "Hello! How can I help you today?";

/// The live chat transcript. Append-only; only a message that is still
/// being revealed may have its text changed.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ConversationMessage>,
    typing: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_welcome() -> Self {
        let mut transcript = Self::new();
        transcript.push(ConversationMessage::bot(WELCOME_MESSAGE));
        transcript
    }

    pub fn push(&mut self, message: ConversationMessage) -> MessageId {
        let id = message.id;
        self.messages.push(message);
        id
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn get(&self, id: MessageId) -> Option<&ConversationMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// Returns whether the indicator changed.
    pub fn set_typing(&mut self, visible: bool) -> bool {
        std::mem::replace(&mut self.typing, visible) != visible
    }

    /// Replace the visible prefix of a message under reveal.
    pub fn update_reveal(&mut self, id: MessageId, visible: &str) -> bool {
        match self.revealing_mut(id) {
            Some(message) => {
                message.text.clear();
                message.text.push_str(visible);
                true
            }
            None => false,
        }
    }

    /// Drop the cursor; the text is final from here on.
    pub fn finish_reveal(&mut self, id: MessageId) -> bool {
        match self.revealing_mut(id) {
            Some(message) => {
                message.revealing = false;
                true
            }
            None => false,
        }
    }

    fn revealing_mut(&mut self, id: MessageId) -> Option<&mut ConversationMessage> {
        self.messages
            .iter_mut()
            .rev()
            .find(|m| m.id == id)
            .filter(|m| m.revealing)
    }
}
