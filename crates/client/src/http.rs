use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::ApiError;

pub(crate) fn build_client(timeout: Option<Duration>) -> Result<reqwest::Client, ApiError> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(ApiError::Builder)
}

pub(crate) fn trim_base_url(base_url: String) -> String {
    base_url.trim_end_matches('/').to_string()
}

pub(crate) async fn send(
    endpoint: &str,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, ApiError> {
    let response = request.send().await.map_err(|source| ApiError::Transport {
        endpoint: endpoint.to_string(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        let detail = error_detail(response).await;
        return Err(ApiError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            detail,
        });
    }

    Ok(response)
}

pub(crate) async fn read_json<T: DeserializeOwned>(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<T, ApiError> {
    response.json::<T>().await.map_err(|source| ApiError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

/// FastAPI answers errors as `{"detail": ...}`; the job store uses `{"message": ...}`.
async fn error_detail(response: reqwest::Response) -> Option<String> {
    let body = response.text().await.ok()?;
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => {
            let detail = value.get("detail").or_else(|| value.get("message"))?;
            match detail.as_str() {
                Some(text) => Some(text.to_string()),
                None => Some(detail.to_string()),
            }
        }
        Err(_) => Some(body.to_string()),
    }
}
