use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::info;
use reqwest::{Client, Method};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use widget_core::WidgetConfig;

use crate::api::models::{
    ChatRequest, ChatResponse, HistoryResponse, SendOtpRequest, StatusResponse, VerifyOtpRequest,
    VerifyOtpResponse, VerifyTokenResponse,
};
use crate::client_trait::WidgetApi;
use crate::error::ApiError;
use crate::utils::http_utils::{decode_json, execute_request};

const SEND_OTP_PATH: &str = "/api/auth/send-otp";
const VERIFY_OTP_PATH: &str = "/api/auth/verify-otp";
const RESEND_OTP_PATH: &str = "/api/auth/resend-otp";
const VERIFY_TOKEN_PATH: &str = "/api/auth/verify-token";
const CHAT_PATH: &str = "/api/chat";
const CHAT_HISTORY_PATH: &str = "/api/auth/chat-history";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP implementation of [`WidgetApi`] against the configured backend.
#[derive(Debug, Clone)]
pub struct WidgetApiClient {
    client: Arc<ClientWithMiddleware>,
    base_url: String,
}

impl WidgetApiClient {
    pub fn new(config: &WidgetConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to build HTTP client: {e}")))?;
        let retry_client = Self::build_retry_client(client, config.transport_retries);

        info!("Widget API client targeting {}", config.api_base());
        Ok(Self {
            client: Arc::new(retry_client),
            base_url: config.api_base().to_string(),
        })
    }

    fn build_retry_client(client: Client, max_retries: u32) -> ClientWithMiddleware {
        // Exponential backoff: 1s, 2s, 4s with jitter
        let retry_policy = ExponentialBackoff::builder()
            // Builder default min retry interval is 1s (base 2)
            .build_with_max_retries(max_retries);

        ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl WidgetApi for WidgetApiClient {
    async fn send_otp(&self, request: SendOtpRequest) -> Result<StatusResponse, ApiError> {
        let response = execute_request(
            &self.client,
            Method::POST,
            &self.url(SEND_OTP_PATH),
            None,
            Some(&request),
        )
        .await?;
        decode_json(response).await
    }

    async fn verify_otp(&self, request: VerifyOtpRequest) -> Result<VerifyOtpResponse, ApiError> {
        let response = execute_request(
            &self.client,
            Method::POST,
            &self.url(VERIFY_OTP_PATH),
            None,
            Some(&request),
        )
        .await?;
        decode_json(response).await
    }

    async fn resend_otp(&self, request: SendOtpRequest) -> Result<StatusResponse, ApiError> {
        let response = execute_request(
            &self.client,
            Method::POST,
            &self.url(RESEND_OTP_PATH),
            None,
            Some(&request),
        )
        .await?;
        decode_json(response).await
    }

    async fn verify_token(&self, token: &str) -> Result<VerifyTokenResponse, ApiError> {
        let response = execute_request::<()>(
            &self.client,
            Method::GET,
            &self.url(VERIFY_TOKEN_PATH),
            Some(token),
            None,
        )
        .await?;
        decode_json(response).await
    }

    async fn chat(&self, token: &str, request: ChatRequest) -> Result<ChatResponse, ApiError> {
        let response = execute_request(
            &self.client,
            Method::POST,
            &self.url(CHAT_PATH),
            Some(token),
            Some(&request),
        )
        .await?;
        decode_json(response).await
    }

    async fn chat_history(&self, token: &str) -> Result<HistoryResponse, ApiError> {
        let response = execute_request::<()>(
            &self.client,
            Method::GET,
            &self.url(CHAT_HISTORY_PATH),
            Some(token),
            None,
        )
        .await?;
        decode_json(response).await
    }
}
