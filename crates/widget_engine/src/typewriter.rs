//! Typewriter reveal
//!
//! [`Typewriter`] is the pure stepper: each tick exposes one more character
//! (or word) of the text. [`TypewriterRenderer`] drives steppers on tokio
//! intervals, one task per message, all hanging off a shared shutdown token.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use widget_core::{MessageId, PacingConfig, RevealMode};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RevealError {
    #[error("message {0} is already being revealed")]
    AlreadyRevealing(MessageId),

    #[error("renderer has been shut down")]
    ShutDown,
}

/// Incremental reveal of one text.
#[derive(Debug, Clone)]
pub struct Typewriter {
    text: String,
    /// Byte offset where each revealed prefix ends.
    boundaries: Vec<usize>,
    step: usize,
}

impl Typewriter {
    pub fn new(text: impl Into<String>, mode: RevealMode) -> Self {
        let text = text.into();
        let boundaries = if text.is_empty() {
            Vec::new()
        } else {
            match mode {
                RevealMode::Character => text
                    .char_indices()
                    .map(|(i, c)| i + c.len_utf8())
                    .collect(),
                RevealMode::Word => {
                    let mut ends = Vec::new();
                    let mut start = 0;
                    for word in text.split(' ') {
                        ends.push(start + word.len());
                        start += word.len() + 1;
                    }
                    ends
                }
            }
        };
        Self {
            text,
            boundaries,
            step: 0,
        }
    }

    /// Ticks needed to reveal everything.
    pub fn total_ticks(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_complete(&self) -> bool {
        self.step >= self.boundaries.len()
    }

    pub fn visible(&self) -> &str {
        match self.step {
            0 => "",
            n => &self.text[..self.boundaries[n - 1]],
        }
    }

    /// Reveal one more unit. `None` once complete.
    pub fn tick(&mut self) -> Option<&str> {
        if self.is_complete() {
            return None;
        }
        self.step += 1;
        Some(self.visible())
    }
}

/// Receives reveal output. Called from the reveal task; must not block.
pub trait RevealSink: Send + Sync + 'static {
    fn on_progress(&self, id: MessageId, visible: &str);

    fn on_complete(&self, id: MessageId);
}

/// Completion signal of one reveal.
#[derive(Debug, Clone)]
pub struct RevealHandle {
    id: MessageId,
    done: watch::Receiver<bool>,
}

impl RevealHandle {
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Wait until the reveal ends. `true` if it completed, `false` if it
    /// was cancelled first.
    pub async fn finished(&mut self) -> bool {
        self.done.wait_for(|done| *done).await.is_ok()
    }
}

/// Runs reveals. At most one task per message id at a time.
#[derive(Clone)]
pub struct TypewriterRenderer {
    mode: RevealMode,
    period: Duration,
    active: Arc<Mutex<HashSet<MessageId>>>,
    shutdown: CancellationToken,
}

impl TypewriterRenderer {
    pub fn new(pacing: &PacingConfig, shutdown: CancellationToken) -> Self {
        Self {
            mode: pacing.reveal_mode,
            period: pacing.reveal_interval(),
            active: Arc::new(Mutex::new(HashSet::new())),
            shutdown,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_revealing(&self, id: MessageId) -> bool {
        self.active.lock().contains(&id)
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    /// Start revealing `text` into message `id`. The first unit appears one
    /// period after the call.
    pub fn start(
        &self,
        id: MessageId,
        text: impl Into<String>,
        sink: Arc<dyn RevealSink>,
    ) -> Result<RevealHandle, RevealError> {
        if self.shutdown.is_cancelled() {
            return Err(RevealError::ShutDown);
        }
        if !self.active.lock().insert(id) {
            return Err(RevealError::AlreadyRevealing(id));
        }

        let (done_tx, done_rx) = watch::channel(false);
        let mut typewriter = Typewriter::new(text, self.mode);
        let period = self.period;
        let cancel = self.shutdown.child_token();
        let active = Arc::clone(&self.active);

        debug!(%id, ticks = typewriter.total_ticks(), "reveal started");
        tokio::spawn(async move {
            let mut completed = typewriter.is_complete();
            if !completed {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => {
                            if let Some(visible) = typewriter.tick() {
                                sink.on_progress(id, visible);
                            }
                            if typewriter.is_complete() {
                                completed = true;
                                break;
                            }
                        }
                    }
                }
            }

            active.lock().remove(&id);
            if completed {
                sink.on_complete(id);
                let _ = done_tx.send(true);
                trace!(%id, "reveal completed");
            } else {
                debug!(%id, "reveal cancelled");
            }
        });

        Ok(RevealHandle { id, done: done_rx })
    }
}
