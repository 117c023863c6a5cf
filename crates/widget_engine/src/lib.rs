//! widget_engine - One chat widget instance per mount
//!
//! A [`Widget`] owns its session id, credential, transcript, view and
//! history cache. Hosts drive it through async operations and render by
//! subscribing to [`WidgetEvent`]s.

pub mod auth;
pub mod error;
pub mod events;
pub mod guard;
pub mod history;
pub mod host;
pub mod pipeline;
pub mod storage;
pub mod transcript;
pub mod typewriter;
pub mod widget;

pub use auth::AuthController;
pub use error::{EngineError, Result};
pub use events::{EventBroadcaster, WidgetEvent};
pub use history::HistoryLoader;
pub use host::WidgetHost;
pub use pipeline::{Delivery, MessagePipeline, SendOutcome};
pub use storage::{
    CredentialVault, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, StorageError,
};
pub use transcript::{Transcript, WELCOME_MESSAGE};
pub use typewriter::{RevealError, RevealHandle, RevealSink, Typewriter, TypewriterRenderer};
pub use widget::{Surface, Widget};
