//! History view navigation and loading

mod common;

use common::*;
use serde_json::json;
use widget_client::ApiError;
use widget_engine::{EngineError, Surface};
use widget_state::{
    HistoryStatus, NavigationError, ViewKind, ViewState, HISTORY_LOAD_FAILED_MESSAGE,
    NO_HISTORY_MESSAGE,
};

fn two_sessions() -> serde_json::Value {
    json!({
        "success": true,
        "history": [
            {
                "createdAt": "2024-05-01T10:00:00Z",
                "messages": [
                    {"query": "Hi", "response": "Hello", "timestamp": "2024-05-01T10:00:01Z", "confidence": 0.93}
                ]
            },
            {
                "createdAt": "2024-05-02T09:30:00Z",
                "messages": [
                    {"query": "Price?", "response": "Ten", "timestamp": "2024-05-02T09:30:02Z", "confidence": "high"},
                    {"query": "Thanks", "response": "Anytime", "timestamp": "2024-05-02T09:30:09Z"}
                ]
            }
        ]
    })
}

#[tokio::test]
async fn test_from_chat_history_always_fetches() {
    let api = MockApi::new();
    let (widget, _store) = signed_in_widget(&api).await;
    api.on_chat_history(Ok(two_sessions()));

    let status = widget.show_history().await.unwrap();
    assert!(matches!(status, HistoryStatus::Loaded(ref s) if s.len() == 2));
    assert_eq!(api.history_calls(), 1);

    widget.show_chat().unwrap();
    assert_eq!(widget.view(), ViewState::Chat);
    widget.show_history().await.unwrap();
    assert_eq!(api.history_calls(), 2);
}

#[tokio::test]
async fn test_back_from_session_reuses_cache() {
    let api = MockApi::new();
    let (widget, _store) = signed_in_widget(&api).await;
    api.on_chat_history(Ok(two_sessions()));
    widget.show_history().await.unwrap();

    let session = widget.select_session(1).unwrap();
    assert_eq!(session.message_count(), 2);
    assert_eq!(session.messages[0].query, "Price?");
    assert!(matches!(widget.view(), ViewState::SessionDetail { .. }));
    assert_eq!(api.history_calls(), 1);

    let status = widget.back_to_history().await.unwrap();
    assert!(matches!(status, HistoryStatus::Loaded(ref s) if s.len() == 2));
    assert_eq!(widget.view(), ViewState::History);
    assert_eq!(api.history_calls(), 1);
}

#[tokio::test]
async fn test_empty_and_failed_history_render_differently() {
    let api = MockApi::new();
    let (widget, _store) = signed_in_widget(&api).await;

    api.on_chat_history(Ok(json!({"success": true, "history": []})));
    let empty = widget.show_history().await.unwrap();
    assert_eq!(empty, HistoryStatus::Empty);
    assert_eq!(empty.message(), Some(NO_HISTORY_MESSAGE));

    widget.show_chat().unwrap();
    api.on_chat_history(Err(transport_error()));
    let failed = widget.show_history().await.unwrap();
    assert_eq!(failed.message(), Some(HISTORY_LOAD_FAILED_MESSAGE));

    assert_ne!(empty.message(), failed.message());
}

#[tokio::test]
async fn test_no_direct_route_from_session_to_chat() {
    let api = MockApi::new();
    let (widget, _store) = signed_in_widget(&api).await;
    api.on_chat_history(Ok(two_sessions()));
    widget.show_history().await.unwrap();
    widget.select_session(0).unwrap();

    let err = widget.show_chat().unwrap_err();
    assert!(matches!(
        err,
        EngineError::Navigation(NavigationError::NoRoute {
            from: ViewKind::SessionDetail,
            to: ViewKind::Chat
        })
    ));
    assert!(matches!(widget.view(), ViewState::SessionDetail { .. }));
}

#[tokio::test]
async fn test_select_out_of_range_keeps_list() {
    let api = MockApi::new();
    let (widget, _store) = signed_in_widget(&api).await;
    api.on_chat_history(Ok(two_sessions()));
    widget.show_history().await.unwrap();

    assert!(matches!(
        widget.select_session(7),
        Err(EngineError::Navigation(NavigationError::SessionOutOfRange { index: 7, len: 2 }))
    ));
    assert_eq!(widget.view(), ViewState::History);
}

#[tokio::test]
async fn test_history_requires_sign_in() {
    let api = MockApi::new();
    let (widget, _store) = anonymous_widget(&api);

    assert!(matches!(
        widget.show_history().await,
        Err(EngineError::NotAuthenticated)
    ));
    assert_eq!(api.history_calls(), 0);
}

#[tokio::test]
async fn test_expired_token_on_history_returns_to_auth() {
    let api = MockApi::new();
    let (widget, store) = signed_in_widget(&api).await;
    widget.open();
    api.on_chat_history(Err(ApiError::Unauthorized(None)));

    widget.show_history().await.unwrap();

    assert!(widget.credential().is_none());
    assert!(store.snapshot().is_empty());
    assert_eq!(widget.surface(), Surface::Auth);
    assert_eq!(widget.view(), ViewState::Chat);
}

#[tokio::test]
async fn test_logout_resets_view() {
    let api = MockApi::new();
    let (widget, _store) = signed_in_widget(&api).await;
    api.on_chat_history(Ok(two_sessions()));
    widget.show_history().await.unwrap();
    widget.select_session(0).unwrap();

    widget.logout().await;

    assert_eq!(widget.view(), ViewState::Chat);
    assert_eq!(widget.history_status(), HistoryStatus::Idle);
}
