use async_trait::async_trait;

use crate::api::models::{
    ChatRequest, ChatResponse, HistoryResponse, SendOtpRequest, StatusResponse, VerifyOtpRequest,
    VerifyOtpResponse, VerifyTokenResponse,
};
use crate::error::ApiError;

/// The six backend operations the widget uses.
#[async_trait]
pub trait WidgetApi: Send + Sync {
    async fn send_otp(&self, request: SendOtpRequest) -> Result<StatusResponse, ApiError>;

    async fn verify_otp(&self, request: VerifyOtpRequest) -> Result<VerifyOtpResponse, ApiError>;

    async fn resend_otp(&self, request: SendOtpRequest) -> Result<StatusResponse, ApiError>;

    async fn verify_token(&self, token: &str) -> Result<VerifyTokenResponse, ApiError>;

    async fn chat(&self, token: &str, request: ChatRequest) -> Result<ChatResponse, ApiError>;

    async fn chat_history(&self, token: &str) -> Result<HistoryResponse, ApiError>;
}
