use std::error::Error;
use std::sync::Arc;

use log::{debug, error, info, warn};
use reqwest::{Method, Response, StatusCode, Url};
use reqwest_middleware::ClientWithMiddleware;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;

/// Executes one HTTP request with the widget's common headers.
/// Every request is JSON; authenticated ones carry the bearer token.
/// Transient-failure retries are handled by middleware at the client level.
pub async fn execute_request<T: Serialize + ?Sized>(
    client: &Arc<ClientWithMiddleware>,
    method: Method,
    url: &str,
    auth_token: Option<&str>,
    json_body: Option<&T>,
) -> Result<Response, ApiError> {
    let url_val = Url::parse(url).map_err(|e| ApiError::InvalidUrl(format!("{url}: {e}")))?;
    let mut request_builder = client
        .request(method.clone(), url_val.clone())
        .header("Content-Type", "application/json");

    if let Some(token) = auth_token {
        request_builder = request_builder.header("Authorization", format!("Bearer {}", token));
    }

    if let Some(body) = json_body {
        request_builder = request_builder.json(body);
    }

    info!("Sending {} request to {}", method.as_str(), url_val);
    let start_time = std::time::Instant::now();

    match request_builder.send().await {
        Ok(resp) => {
            info!(
                "Got response from {} after {:?} with status {}",
                url_val,
                start_time.elapsed(),
                resp.status()
            );
            Ok(resp)
        }
        Err(e) => {
            error!("Failed HTTP request to {}: {}", url_val, e);
            if let Some(source) = e.source() {
                error!("Error source: {:?}", source);
            }
            Err(ApiError::from(e))
        }
    }
}

/// Decodes a JSON body regardless of status. The backend reports failures
/// as `success: false` bodies; only 401 is treated as its own outcome.
pub async fn decode_json<R: DeserializeOwned>(response: Response) -> Result<R, ApiError> {
    let status = response.status();
    let url = response.url().clone();
    let body = response.text().await.map_err(|e| {
        error!("Failed to read body from {}: {}", url, e);
        ApiError::Transport(e.to_string())
    })?;

    if status == StatusCode::UNAUTHORIZED {
        warn!("{} answered 401", url);
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string));
        return Err(ApiError::Unauthorized(message));
    }

    serde_json::from_str(&body).map_err(|e| {
        debug!("Undecodable body from {} (status {}): {}", url, status, body);
        ApiError::Decode(e.to_string())
    })
}
