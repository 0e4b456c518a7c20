use std::time::Duration;

use folio_content::{ContentNode, Fingerprint};
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value as JsonValue;

use super::{DocumentBackend, Fields};
use crate::error::RemoteError;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote record behind a JSON document endpoint
///
/// `GET {endpoint}/{collection}/{document}` returns the record (404 when it
/// does not exist) and `PATCH` with a JSON object merges top-level fields.
/// The live feed polls.
#[derive(Debug, Clone)]
pub struct HttpDocumentBackend {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    poll_interval: Duration,
}

impl HttpDocumentBackend {
    /// Backend for `{endpoint}/{collection}/{document}`
    pub fn new(endpoint: &str, collection: &str, document: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: format!(
                "{}/{collection}/{document}",
                endpoint.trim_end_matches('/')
            ),
            token: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Send `token` as a bearer credential
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Delay between polls of the live feed
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Use a preconfigured HTTP client
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Record URL
    pub fn url(&self) -> &str {
        &self.url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

async fn check(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RemoteError::PermissionDenied(
            if body.is_empty() { status.to_string() } else { body },
        )),
        _ => Err(RemoteError::Status {
            status: status.as_u16(),
            body,
        }),
    }
}

fn transport(err: reqwest::Error) -> RemoteError {
    RemoteError::Transport(err.to_string())
}

#[async_trait::async_trait]
impl DocumentBackend for HttpDocumentBackend {
    async fn merge(&self, fields: Fields) -> Result<(), RemoteError> {
        let response = self
            .authorize(self.client.patch(&self.url))
            .json(&fields)
            .send()
            .await
            .map_err(transport)?;
        check(response).await?;
        tracing::debug!(url = %self.url, "remote record merged");
        Ok(())
    }

    async fn fetch(&self) -> Result<Option<Fields>, RemoteError> {
        let response = self
            .authorize(self.client.get(&self.url))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(transport)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let value: JsonValue = check(response)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        match value {
            JsonValue::Object(fields) => Ok(Some(fields)),
            other => Err(RemoteError::Decode(format!(
                "record must be an object, found {}",
                ContentNode::from(other).kind()
            ))),
        }
    }

    fn watch(&self) -> BoxStream<'static, Result<Option<Fields>, RemoteError>> {
        struct Poll {
            backend: HttpDocumentBackend,
            polled: bool,
            // Outer None until the first delivery
            last: Option<Option<Fingerprint>>,
        }

        let state = Poll {
            backend: self.clone(),
            polled: false,
            last: None,
        };
        stream::unfold(state, |mut state| async move {
            loop {
                if state.polled {
                    tokio::time::sleep(state.backend.poll_interval).await;
                }
                state.polled = true;
                match state.backend.fetch().await {
                    Ok(fields) => {
                        let print = fields
                            .as_ref()
                            .map(|f| Fingerprint::of(&ContentNode::from(JsonValue::Object(f.clone()))));
                        if state.last == Some(print) {
                            continue;
                        }
                        state.last = Some(print);
                        return Some((Ok(fields), state));
                    }
                    Err(err) => return Some((Err(err), state)),
                }
            }
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_segments() {
        let backend = HttpDocumentBackend::new("http://localhost:8080/", "portfolio", "main");
        assert_eq!(backend.url(), "http://localhost:8080/portfolio/main");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let backend = HttpDocumentBackend::new("http://127.0.0.1:1", "portfolio", "main");
        let err = backend.fetch().await.unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)));
        assert!(err.is_retryable());
    }
}
