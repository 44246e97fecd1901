//! Low level HTTP access to the upstream REST backend

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    config::UpstreamConfig,
    error::{AppError, AppResult},
};

#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
}

/// List payloads come either bare or wrapped in a page
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Page { results: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ListEnvelope<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            ListEnvelope::Page { results } => results,
            ListEnvelope::Bare(items) => items,
        }
    }
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET `path` and decode the JSON body
    pub async fn get<T: DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        let request = self.http.get(self.url(path)).query(query);
        let body = self.send(token, request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// POST a JSON body and decode the JSON response
    pub async fn post<B, T>(&self, token: &str, path: &str, body: &B) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.http.post(self.url(path)).json(body);
        let body = self.send(token, request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// POST a JSON body, ignoring whatever the upstream answers on success
    pub async fn post_unit<B>(&self, token: &str, path: &str, body: &B) -> AppResult<()>
    where
        B: Serialize + ?Sized,
    {
        let request = self.http.post(self.url(path)).json(body);
        self.send(token, request).await?;
        Ok(())
    }

    async fn send(&self, token: &str, request: RequestBuilder) -> AppResult<String> {
        if token.trim().is_empty() {
            return Err(AppError::Precondition(
                "No authentication token, please sign in again".to_string(),
            ));
        }

        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        let url = response.url().to_string();
        let body = response.text().await?;

        tracing::debug!("Upstream {} -> {}", url, status);

        if status.is_success() {
            Ok(body)
        } else {
            Err(error_for_status(status, &body))
        }
    }
}

/// Message carried by an upstream error body, if any
fn upstream_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["detail", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

/// Map a non-2xx upstream answer onto the error taxonomy
pub(crate) fn error_for_status(status: StatusCode, body: &str) -> AppError {
    let message = upstream_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Unexpected upstream status")
            .to_string()
    });

    match status {
        StatusCode::UNAUTHORIZED => AppError::Authentication(message),
        StatusCode::FORBIDDEN => AppError::Authorization(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::CONFLICT => AppError::StateConflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            if message.to_lowercase().contains("status") {
                AppError::StateConflict(message)
            } else {
                AppError::Validation(message)
            }
        }
        _ => AppError::Upstream(format!("{}: {}", status, message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_keeps_upstream_message() {
        let err = error_for_status(
            StatusCode::CONFLICT,
            r#"{"detail": "Borrowing is not pending"}"#,
        );
        match err {
            AppError::StateConflict(msg) => assert_eq!(msg, "Borrowing is not pending"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bad_request_about_status_is_conflict() {
        let err = error_for_status(
            StatusCode::BAD_REQUEST,
            r#"{"error": "Invalid status transition from approved"}"#,
        );
        assert!(matches!(err, AppError::StateConflict(_)));

        let err = error_for_status(StatusCode::BAD_REQUEST, r#"{"message": "reason is required"}"#);
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_server_error_without_json() {
        let err = error_for_status(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[test]
    fn test_list_envelope_shapes() {
        let page: ListEnvelope<i64> = serde_json::from_str(r#"{"count": 2, "results": [1, 2]}"#).unwrap();
        assert_eq!(page.into_vec(), vec![1, 2]);
        let bare: ListEnvelope<i64> = serde_json::from_str("[3]").unwrap();
        assert_eq!(bare.into_vec(), vec![3]);
    }

    #[tokio::test]
    async fn test_empty_token_never_reaches_network() {
        let client = UpstreamClient::new(&UpstreamConfig {
            base_url: "http://127.0.0.1:9/".to_string(),
            timeout_secs: 1,
        })
        .unwrap();
        let result: AppResult<serde_json::Value> = client.get("", "borrow/borrowings/1/", &[]).await;
        assert!(matches!(result, Err(AppError::Precondition(_))));
        assert_eq!(client.url("/borrow/x/"), "http://127.0.0.1:9/borrow/x/");
    }
}
