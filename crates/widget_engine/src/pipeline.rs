//! Message pipeline - one chat turn from input to revealed answer
//!
//! Order within one `send`: user message, typing indicator on, one chat
//! request, indicator off, answer reveal, then suggestion and follow-up
//! blocks. Sends are serialized by an in-flight flag; a second send while one
//! is outstanding is dropped, not queued.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use widget_client::{ApiError, ChatRequest, ResolvedReply, WidgetApi};
use widget_core::{ConversationMessage, FollowUpTiming, MessageId, PacingConfig, SessionId};

use crate::auth::AuthController;
use crate::events::{EventBroadcaster, WidgetEvent};
use crate::guard::BusyFlag;
use crate::transcript::Transcript;
use crate::typewriter::{RevealHandle, RevealSink, TypewriterRenderer};

pub const CONNECTION_ERROR_REPLY: &str =
    "Sorry, I'm having trouble connecting. Please try again later.";
pub const GENERIC_ERROR_REPLY: &str = "Sorry, I encountered an error. Please try again.";
pub const SUGGESTIONS_LABEL: &str = "Here are some related questions:";
pub const FOLLOW_UPS_LABEL: &str = "Follow-up questions:";

#[derive(Debug)]
pub enum SendOutcome {
    /// The request went out and its reply is being delivered.
    Sent(Delivery),
    EmptyInput,
    NotAuthenticated,
    /// Another send is still in flight.
    Busy,
    TornDown,
}

impl SendOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, SendOutcome::Sent(_))
    }
}

/// Tracks the visible effects of one sent message.
#[derive(Debug)]
pub struct Delivery {
    answer: Option<MessageId>,
    settled: watch::Receiver<bool>,
}

impl Delivery {
    /// The bot message the reply is revealed into.
    pub fn answer(&self) -> Option<MessageId> {
        self.answer
    }

    /// Wait until the answer is fully revealed and every suggestion and
    /// follow-up block has been appended. `false` if teardown cut it short.
    pub async fn settled(mut self) -> bool {
        self.settled.wait_for(|done| *done).await.is_ok()
    }
}

/// Writes reveal output and appended blocks into the transcript.
#[derive(Clone)]
struct TranscriptSink {
    transcript: Arc<Mutex<Transcript>>,
    events: EventBroadcaster,
}

impl TranscriptSink {
    fn append(&self, message: ConversationMessage) -> MessageId {
        let id = self.transcript.lock().push(message.clone());
        self.events.broadcast(WidgetEvent::MessageAppended(message));
        id
    }

    fn set_typing(&self, visible: bool) {
        if self.transcript.lock().set_typing(visible) {
            self.events
                .broadcast(WidgetEvent::TypingIndicator { visible });
        }
    }
}

impl RevealSink for TranscriptSink {
    fn on_progress(&self, id: MessageId, visible: &str) {
        if self.transcript.lock().update_reveal(id, visible) {
            self.events.broadcast(WidgetEvent::RevealProgress {
                id,
                visible: visible.to_string(),
            });
        }
    }

    fn on_complete(&self, id: MessageId) {
        if self.transcript.lock().finish_reveal(id) {
            self.events.broadcast(WidgetEvent::RevealCompleted { id });
        }
    }
}

/// What to show for one chat turn.
enum Reply {
    Answer(ResolvedReply),
    Apology(&'static str),
}

pub struct MessagePipeline {
    api: Arc<dyn WidgetApi>,
    auth: Arc<AuthController>,
    client_id: String,
    session_id: SessionId,
    pacing: PacingConfig,
    sink: TranscriptSink,
    renderer: TypewriterRenderer,
    shutdown: CancellationToken,
    in_flight: BusyFlag,
}

impl MessagePipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api: Arc<dyn WidgetApi>,
        auth: Arc<AuthController>,
        client_id: impl Into<String>,
        session_id: SessionId,
        pacing: PacingConfig,
        transcript: Arc<Mutex<Transcript>>,
        events: EventBroadcaster,
        shutdown: CancellationToken,
    ) -> Self {
        let renderer = TypewriterRenderer::new(&pacing, shutdown.clone());
        Self {
            api,
            auth,
            client_id: client_id.into(),
            session_id,
            pacing,
            sink: TranscriptSink { transcript, events },
            renderer,
            shutdown,
            in_flight: BusyFlag::new(),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_busy()
    }

    pub async fn send(&self, text: &str) -> SendOutcome {
        let query = text.trim();
        if query.is_empty() {
            return SendOutcome::EmptyInput;
        }
        if self.shutdown.is_cancelled() {
            return SendOutcome::TornDown;
        }
        let Some(credential) = self.auth.credential() else {
            return SendOutcome::NotAuthenticated;
        };
        let Some(_guard) = self.in_flight.try_acquire() else {
            debug!("send ignored, previous message still in flight");
            return SendOutcome::Busy;
        };

        self.sink.append(ConversationMessage::user(query));
        self.sink.set_typing(true);

        let request = ChatRequest {
            client_id: self.client_id.clone(),
            query: query.to_string(),
            session_id: self.session_id.to_string(),
        };
        let result = self.api.chat(&credential.token, request).await;

        self.sink.set_typing(false);

        let reply = match result {
            Ok(response) => match response.resolve() {
                Some(reply) => Reply::Answer(reply),
                None => {
                    debug!(message = ?response.message, "chat response had no answer");
                    Reply::Apology(GENERIC_ERROR_REPLY)
                }
            },
            Err(e @ ApiError::Unauthorized(_)) => {
                self.auth.revoke(&e).await;
                Reply::Apology(GENERIC_ERROR_REPLY)
            }
            // A body that is not JSON at all (a proxy error page) reads as
            // a connection problem.
            Err(ApiError::Decode(e)) => {
                warn!(error = %e, "chat response could not be decoded");
                Reply::Apology(CONNECTION_ERROR_REPLY)
            }
            Err(e) => {
                warn!(error = %e, "chat request failed");
                Reply::Apology(CONNECTION_ERROR_REPLY)
            }
        };

        // The request may outlive the widget; its effects may not.
        if self.shutdown.is_cancelled() {
            debug!("widget torn down while request was in flight");
            return SendOutcome::Sent(Delivery::done(None));
        }

        SendOutcome::Sent(self.deliver(reply))
    }

    fn deliver(&self, reply: Reply) -> Delivery {
        let (text, suggestions, follow_ups) = match reply {
            Reply::Answer(reply) => (reply.answer, reply.suggestions, reply.follow_ups),
            Reply::Apology(text) => (text.to_string(), Vec::new(), Vec::new()),
        };

        let started = Instant::now();
        let Some((answer_id, reveal)) = self.reveal(&text) else {
            return Delivery::done(None);
        };

        let (done_tx, done_rx) = watch::channel(false);
        let schedule = ExtrasSchedule {
            pacing: self.pacing.clone(),
            sink: self.sink.clone(),
            answer_id,
            answer: text,
            started,
            suggestions,
            follow_ups,
        };
        let cancel = self.shutdown.child_token();
        tokio::spawn(async move {
            let delivered = tokio::select! {
                _ = cancel.cancelled() => false,
                delivered = schedule.run(reveal) => delivered,
            };
            if delivered {
                let _ = done_tx.send(true);
            }
        });

        Delivery {
            answer: Some(answer_id),
            settled: done_rx,
        }
    }

    fn reveal(&self, text: &str) -> Option<(MessageId, RevealHandle)> {
        let message = ConversationMessage::bot_revealing();
        let id = message.id;
        self.sink.append(message);

        let sink: Arc<dyn RevealSink> = Arc::new(self.sink.clone());
        match self.renderer.start(id, text, sink) {
            Ok(handle) => Some((id, handle)),
            Err(e) => {
                debug!(error = %e, "reveal not started");
                let mut transcript = self.sink.transcript.lock();
                transcript.update_reveal(id, text);
                transcript.finish_reveal(id);
                None
            }
        }
    }
}

impl Delivery {
    fn done(answer: Option<MessageId>) -> Self {
        let (_, settled) = watch::channel(true);
        Self { answer, settled }
    }
}

/// Suggestion and follow-up blocks for one answer.
struct ExtrasSchedule {
    pacing: PacingConfig,
    sink: TranscriptSink,
    answer_id: MessageId,
    answer: String,
    started: Instant,
    suggestions: Vec<String>,
    follow_ups: Vec<String>,
}

impl ExtrasSchedule {
    /// Never appends before the answer's reveal has completed.
    async fn run(self, mut reveal: RevealHandle) -> bool {
        if !reveal.finished().await {
            return false;
        }

        let base = match self.pacing.follow_up_timing {
            FollowUpTiming::Heuristic => self.started,
            FollowUpTiming::AfterReveal => Instant::now(),
        };

        if !self.suggestions.is_empty() {
            sleep_until(base + self.pacing.suggestion_delay(&self.answer)).await;
            self.sink.append(ConversationMessage::suggestions(
                self.answer_id,
                SUGGESTIONS_LABEL,
                self.suggestions,
            ));
        }
        if !self.follow_ups.is_empty() {
            sleep_until(base + self.pacing.follow_up_delay(&self.answer)).await;
            self.sink.append(ConversationMessage::follow_ups(
                self.answer_id,
                FOLLOW_UPS_LABEL,
                self.follow_ups,
            ));
        }
        true
    }
}
