use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;
use widget_client::WidgetApi;
use widget_core::WidgetConfig;

use crate::error::Result;
use crate::pipeline::SendOutcome;
use crate::storage::KeyValueStore;
use crate::widget::Widget;

/// Host-side registry: at most one mounted widget at a time.
#[derive(Default)]
pub struct WidgetHost {
    current: Mutex<Option<Widget>>,
}

impl WidgetHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a widget against the configured backend. A missing client id
    /// is rejected before anything is created.
    pub async fn init(&self, config: WidgetConfig) -> Result<Widget> {
        let widget = Widget::connect(config)?;
        Ok(self.register(widget).await)
    }

    /// Mount with an explicit API and store.
    pub async fn init_with(
        &self,
        config: WidgetConfig,
        api: Arc<dyn WidgetApi>,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Widget> {
        let widget = Widget::new(config, api, store)?;
        Ok(self.register(widget).await)
    }

    async fn register(&self, widget: Widget) -> Widget {
        let previous = self.current.lock().replace(widget.clone());
        if let Some(previous) = previous {
            info!(session_id = %previous.session_id(), "replacing mounted widget");
            previous.teardown();
        }
        widget.mount().await;
        widget
    }

    pub fn current(&self) -> Option<Widget> {
        self.current.lock().clone()
    }

    /// Send a predefined text through the mounted widget. `None` when
    /// nothing is mounted.
    pub async fn send_follow_up(&self, text: &str) -> Option<SendOutcome> {
        let widget = self.current()?;
        Some(widget.send_follow_up(text).await)
    }

    pub fn unmount(&self) {
        if let Some(widget) = self.current.lock().take() {
            widget.teardown();
        }
    }
}
