//! Blocking `reqwest` implementation of [`TraceSource`].

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use stepwise_core::trace::TraceDocument;

use crate::api::{AlgorithmInfo, AlgorithmSummary, TraceRequest};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::TraceSource;

/// Message used when an error body is JSON but carries no `error` field.
const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Talks to the backend over HTTP.
///
/// Requests carry no overall timeout; a hung backend leaves the caller
/// waiting until the connection drops.
#[derive(Debug, Clone)]
pub struct HttpTraceClient {
    client: Client,
    config: ClientConfig,
}

impl HttpTraceClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(None::<Duration>).build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.config.url(path);
        tracing::debug!(%url, "GET");
        decode(self.client.get(&url).send()?)
    }
}

/// Turn a response into `T` or the matching [`ClientError`].
fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .map(|b| b.error.unwrap_or_else(|| UNKNOWN_ERROR.to_owned()));
        return Err(ClientError::Status {
            status: status.as_u16(),
            message,
        });
    }
    serde_json::from_str(&body).map_err(|err| ClientError::Decode {
        status: status.as_u16(),
        message: err.to_string(),
    })
}

impl TraceSource for HttpTraceClient {
    fn fetch_trace(&self, request: &TraceRequest) -> Result<TraceDocument, ClientError> {
        let url = self.config.url(request.path());
        tracing::info!(%url, algorithm = ?request.algorithm(), "requesting trace");
        let doc: TraceDocument = decode(self.client.post(&url).json(request).send()?)?;
        tracing::info!(steps = doc.len(), title = doc.title(), "trace received");
        Ok(doc)
    }

    fn list_algorithms(&self) -> Result<Vec<AlgorithmSummary>, ClientError> {
        self.get("algorithms")
    }

    fn algorithm_info(&self, name: &str) -> Result<AlgorithmInfo, ClientError> {
        self.get(&format!("algorithms/{name}/info"))
    }
}
