//! Shared test utilities: a scripted in-process backend

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use widget_client::{
    ApiError, ChatRequest, ChatResponse, HistoryResponse, SendOtpRequest, StatusResponse,
    VerifyOtpRequest, VerifyOtpResponse, VerifyTokenResponse, WidgetApi,
};
use widget_core::WidgetConfig;
use widget_engine::storage::{EMAIL_KEY, TOKEN_KEY};
use widget_engine::{KeyValueStore, MemoryKeyValueStore, Widget};

pub const EMAIL: &str = "demo@test.com";
pub const TOKEN: &str = "tok-1";

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    SendOtp(String),
    VerifyOtp(VerifyOtpRequest),
    ResendOtp(String),
    VerifyToken(String),
    Chat { token: String, request: ChatRequest },
    ChatHistory(String),
}

/// Queued responses, then a repeating fallback.
struct Script<T> {
    queue: VecDeque<Result<T, ApiError>>,
    fallback: Option<Result<T, ApiError>>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            fallback: None,
        }
    }
}

impl<T: Clone> Script<T> {
    fn next(&mut self) -> Result<T, ApiError> {
        self.queue
            .pop_front()
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| Err(ApiError::Transport("no response scripted".into())))
    }
}

#[derive(Default)]
pub struct MockApi {
    calls: Mutex<Vec<ApiCall>>,
    latency: Mutex<Duration>,
    send_otp: Mutex<Script<StatusResponse>>,
    verify_otp: Mutex<Script<VerifyOtpResponse>>,
    resend_otp: Mutex<Script<StatusResponse>>,
    verify_token: Mutex<Script<VerifyTokenResponse>>,
    chat: Mutex<Script<ChatResponse>>,
    chat_history: Mutex<Script<HistoryResponse>>,
}

impl MockApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every call sleeps this long (on the tokio clock) before answering.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().clone()
    }

    pub fn chat_calls(&self) -> Vec<ChatRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::Chat { request, .. } => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn history_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, ApiCall::ChatHistory(_)))
            .count()
    }

    pub fn on_send_otp(&self, result: Result<Value, ApiError>) {
        self.send_otp.lock().fallback = Some(result.map(decode));
    }

    pub fn on_verify_otp(&self, result: Result<Value, ApiError>) {
        self.verify_otp.lock().fallback = Some(result.map(decode));
    }

    pub fn on_resend_otp(&self, result: Result<Value, ApiError>) {
        self.resend_otp.lock().fallback = Some(result.map(decode));
    }

    pub fn on_verify_token(&self, result: Result<Value, ApiError>) {
        self.verify_token.lock().fallback = Some(result.map(decode));
    }

    pub fn on_chat(&self, result: Result<Value, ApiError>) {
        self.chat.lock().fallback = Some(result.map(decode));
    }

    pub fn push_chat(&self, result: Result<Value, ApiError>) {
        self.chat.lock().queue.push_back(result.map(decode));
    }

    pub fn on_chat_history(&self, result: Result<Value, ApiError>) {
        self.chat_history.lock().fallback = Some(result.map(decode));
    }

    async fn record(&self, call: ApiCall) {
        self.calls.lock().push(call);
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).expect("scripted response must decode")
}

#[async_trait]
impl WidgetApi for MockApi {
    async fn send_otp(&self, request: SendOtpRequest) -> Result<StatusResponse, ApiError> {
        self.record(ApiCall::SendOtp(request.email)).await;
        self.send_otp.lock().next()
    }

    async fn verify_otp(&self, request: VerifyOtpRequest) -> Result<VerifyOtpResponse, ApiError> {
        self.record(ApiCall::VerifyOtp(request)).await;
        self.verify_otp.lock().next()
    }

    async fn resend_otp(&self, request: SendOtpRequest) -> Result<StatusResponse, ApiError> {
        self.record(ApiCall::ResendOtp(request.email)).await;
        self.resend_otp.lock().next()
    }

    async fn verify_token(&self, token: &str) -> Result<VerifyTokenResponse, ApiError> {
        self.record(ApiCall::VerifyToken(token.to_string())).await;
        self.verify_token.lock().next()
    }

    async fn chat(&self, token: &str, request: ChatRequest) -> Result<ChatResponse, ApiError> {
        self.record(ApiCall::Chat {
            token: token.to_string(),
            request,
        })
        .await;
        self.chat.lock().next()
    }

    async fn chat_history(&self, token: &str) -> Result<HistoryResponse, ApiError> {
        self.record(ApiCall::ChatHistory(token.to_string())).await;
        self.chat_history.lock().next()
    }
}

pub fn transport_error() -> ApiError {
    ApiError::Transport("connection refused".into())
}

pub fn config() -> WidgetConfig {
    WidgetConfig::new("client-1")
}

pub fn anonymous_widget(api: &Arc<MockApi>) -> (Widget, Arc<MemoryKeyValueStore>) {
    anonymous_widget_with(api, config())
}

pub fn anonymous_widget_with(
    api: &Arc<MockApi>,
    config: WidgetConfig,
) -> (Widget, Arc<MemoryKeyValueStore>) {
    let store = Arc::new(MemoryKeyValueStore::new());
    let widget = Widget::new(config, api.clone(), store.clone()).expect("widget");
    (widget, store)
}

/// A widget restored from a stored, server-confirmed credential.
pub async fn signed_in_widget(api: &Arc<MockApi>) -> (Widget, Arc<MemoryKeyValueStore>) {
    signed_in_widget_with(api, config()).await
}

pub async fn signed_in_widget_with(
    api: &Arc<MockApi>,
    config: WidgetConfig,
) -> (Widget, Arc<MemoryKeyValueStore>) {
    let store = Arc::new(MemoryKeyValueStore::new());
    store.set(TOKEN_KEY, TOKEN).await.unwrap();
    store.set(EMAIL_KEY, EMAIL).await.unwrap();
    api.on_verify_token(Ok(serde_json::json!({"success": true, "user": {"email": EMAIL}})));

    let widget = Widget::new(config, api.clone(), store.clone()).expect("widget");
    assert!(widget.mount().await.is_authenticated());
    (widget, store)
}
