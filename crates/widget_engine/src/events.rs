use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use widget_core::{ConversationMessage, HistorySession, MessageId};
use widget_state::{AuthState, HistoryStatus, Notice, ViewKind};

use crate::widget::Surface;

/// State changes a rendering layer subscribes to.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    SurfaceChanged(Surface),
    AuthChanged {
        state: AuthState,
        notice: Option<Notice>,
    },
    MessageAppended(ConversationMessage),
    TypingIndicator {
        visible: bool,
    },
    /// `visible` is the full revealed prefix, not a delta.
    RevealProgress {
        id: MessageId,
        visible: String,
    },
    RevealCompleted {
        id: MessageId,
    },
    ViewChanged(ViewKind),
    HistoryUpdated(HistoryStatus),
    SessionOpened(HistorySession),
    TornDown,
}

/// Fan-out of widget events to any number of subscribers. Closed
/// subscribers are dropped on the next broadcast.
#[derive(Clone, Default)]
pub struct EventBroadcaster {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<WidgetEvent>>>>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<WidgetEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscribers = self.subscribers.lock();
        subscribers.push(tx);
        tracing::debug!(
            subscriber_count = subscribers.len(),
            "New widget event subscriber added"
        );
        rx
    }

    pub fn broadcast(&self, event: WidgetEvent) {
        let mut subscribers = self.subscribers.lock();
        if subscribers.is_empty() {
            return;
        }
        subscribers.retain(|sender| sender.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
