pub mod api;
pub mod client_trait;
pub mod error;
pub mod utils;

pub use api::client::WidgetApiClient;
pub use api::models::{
    ChatRequest, ChatResponse, HistoryResponse, ResolvedReply, SendOtpRequest, StatusResponse,
    SuggestionItem, VerifyOtpRequest, VerifyOtpResponse, VerifyTokenResponse,
};
pub use client_trait::WidgetApi;
pub use error::ApiError;
