use std::error::Error as StdError;
use std::fmt;

use tracing::debug;

use crate::api::ModelsResponse;
use crate::utils::url::construct_api_url;

/// Errors returned while listing models from the Ollama endpoint.
#[derive(Debug)]
pub enum FetchModelsError {
    /// The request never produced a response (connection refused, bad host).
    Transport(reqwest::Error),

    /// The server answered with a non-success status.
    Status { status: u16, body: String },

    /// The body was not a valid tags listing.
    Decode(reqwest::Error),
}

impl fmt::Display for FetchModelsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchModelsError::Transport(err) => write!(f, "{err}"),
            FetchModelsError::Status { status, body } => {
                write!(f, "API request failed with status {status}: {body}")
            }
            FetchModelsError::Decode(err) => write!(f, "Invalid model listing: {err}"),
        }
    }
}

impl StdError for FetchModelsError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            FetchModelsError::Transport(err) | FetchModelsError::Decode(err) => Some(err),
            FetchModelsError::Status { .. } => None,
        }
    }
}

pub async fn fetch_models(
    client: &reqwest::Client,
    base_url: &str,
) -> Result<ModelsResponse, FetchModelsError> {
    let models_url = construct_api_url(base_url, "api/tags");
    debug!(url = %models_url, "listing models");

    let response = client
        .get(models_url)
        .header("Content-Type", "application/json")
        .send()
        .await
        .map_err(FetchModelsError::Transport)?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(FetchModelsError::Status { status, body });
    }

    response
        .json::<ModelsResponse>()
        .await
        .map_err(FetchModelsError::Decode)
}

/// Newest first by `modified_at`, then by identifier for a stable order.
pub fn sort_models(models: &mut [crate::api::ModelInfo]) {
    models.sort_by(|a, b| match (&a.modified_at, &b.modified_at) {
        (Some(a_modified), Some(b_modified)) => b_modified
            .cmp(a_modified)
            .then_with(|| a.id().cmp(b.id())),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.id().cmp(b.id()),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ModelInfo;
    use crate::utils::test_utils::{spawn_mock_server, MockResponse};

    fn model(name: &str, modified_at: Option<&str>) -> ModelInfo {
        ModelInfo {
            name: name.to_string(),
            model: Some(name.to_string()),
            modified_at: modified_at.map(str::to_string),
            size: None,
            details: None,
        }
    }

    #[test]
    fn sort_models_puts_recent_first() {
        let mut models = vec![
            model("zeta", None),
            model("alpha", Some("2024-01-01T00:00:00Z")),
            model("beta", Some("2024-06-01T00:00:00Z")),
            model("gamma", None),
        ];
        sort_models(&mut models);
        let ids: Vec<&str> = models.iter().map(|m| m.id()).collect();
        assert_eq!(ids, vec!["beta", "alpha", "gamma", "zeta"]);
    }

    #[tokio::test]
    async fn fetch_models_reads_tags_listing() {
        let server = spawn_mock_server(vec![MockResponse::json(
            200,
            r#"{"models":[{"name":"llama3:latest","model":"llama3:latest"}]}"#,
        )])
        .await;

        let client = reqwest::Client::new();
        let response = fetch_models(&client, &server.base_url)
            .await
            .expect("listing succeeds");
        assert_eq!(response.ids(), vec!["llama3:latest"]);

        let requests = server.requests().await;
        assert_eq!(requests.len(), 1);
        assert!(requests[0].request_line.starts_with("GET /api/tags"));
    }

    #[tokio::test]
    async fn fetch_models_reports_status_errors() {
        let server =
            spawn_mock_server(vec![MockResponse::json(500, r#"{"error":"boom"}"#)]).await;

        let client = reqwest::Client::new();
        let err = fetch_models(&client, &server.base_url)
            .await
            .expect_err("listing fails");
        match err {
            FetchModelsError::Status { status, body } => {
                assert_eq!(status, 500);
                assert!(body.contains("boom"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_models_reports_connection_errors() {
        let client = reqwest::Client::new();
        let err = fetch_models(&client, "http://127.0.0.1:1")
            .await
            .expect_err("nothing listens on port 1");
        assert!(matches!(err, FetchModelsError::Transport(_)));
    }
}
