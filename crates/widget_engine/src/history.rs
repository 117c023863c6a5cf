use std::sync::Arc;

use tracing::{debug, warn};
use widget_client::{ApiError, HistoryResponse, WidgetApi};
use widget_state::{HistoryLoad, HISTORY_LOAD_FAILED_MESSAGE};

use crate::auth::AuthController;

/// Fetches the signed-in user's past sessions. Session detail needs no
/// further call: turns are embedded in each session.
pub struct HistoryLoader {
    api: Arc<dyn WidgetApi>,
    auth: Arc<AuthController>,
}

impl HistoryLoader {
    pub fn new(api: Arc<dyn WidgetApi>, auth: Arc<AuthController>) -> Self {
        Self { api, auth }
    }

    pub async fn load_summaries(&self) -> HistoryLoad {
        let Some(credential) = self.auth.credential() else {
            return HistoryLoad::Failed(HISTORY_LOAD_FAILED_MESSAGE.to_string());
        };

        match self.api.chat_history(&credential.token).await {
            Ok(response) => classify(response),
            Err(e) => {
                if let ApiError::Unauthorized(_) = e {
                    self.auth.revoke(&e).await;
                } else {
                    warn!(error = %e, "chat history request failed");
                }
                HistoryLoad::Failed(HISTORY_LOAD_FAILED_MESSAGE.to_string())
            }
        }
    }
}

fn classify(response: HistoryResponse) -> HistoryLoad {
    if !response.success {
        let message = response
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| HISTORY_LOAD_FAILED_MESSAGE.to_string());
        return HistoryLoad::Failed(message);
    }
    match response.history {
        Some(sessions) if !sessions.is_empty() => {
            debug!(sessions = sessions.len(), "history loaded");
            HistoryLoad::Loaded(sessions)
        }
        _ => HistoryLoad::Empty,
    }
}
