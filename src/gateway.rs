//! Client for the prompt-enhancing gateway.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::endpoint;
use crate::constants::GATEWAY_SOURCE;
use crate::error::BridgeError;

#[derive(Serialize, Debug)]
struct GenerateImageRequest<'a> {
    prompt: &'a str,
    source: &'a str,
    session_id: &'a str,
}

/// What the gateway hands back for a submitted description.
#[derive(Clone, Debug, PartialEq)]
pub struct GatewayPromptRecord {
    /// Identifier used to fetch the enhanced prompt
    pub file: String,
    /// The full gateway response, echoed into the workflow result
    pub data: Value,
}

/// Talks to `{gateway}/api/generate/image` and `{gateway}/api/image/prompt/{file}`.
#[derive(Clone, Debug)]
pub struct GatewayClient {
    base_url: Url,
    client: reqwest::Client,
    timeout: Duration,
}

impl GatewayClient {
    /// New client for the gateway at `base_url`; `timeout` applies to each call.
    pub fn new(base_url: Url, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            base_url,
            client,
            timeout,
        }
    }

    /// Submits a description for enhancement.
    ///
    /// Transport errors and non-success statuses are [`BridgeError::Gateway`];
    /// a body that is not JSON, lacks `success: true`, or has no `file` is
    /// [`BridgeError::GatewayProcessing`].
    pub async fn submit(
        &self,
        text: &str,
        session_id: &str,
    ) -> Result<GatewayPromptRecord, BridgeError> {
        let url = endpoint(&self.base_url, &["api", "generate", "image"])?;
        let body = GenerateImageRequest {
            prompt: text,
            source: GATEWAY_SOURCE,
            session_id,
        };

        let resp = self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|err| BridgeError::Gateway(err.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BridgeError::Gateway(format!("status {status}")));
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|err| BridgeError::GatewayProcessing(err.to_string()))?;
        debug!("Gateway response: {data}");

        if data.get("success").and_then(Value::as_bool) != Some(true) {
            return Err(BridgeError::GatewayProcessing(
                "response did not report success".to_string(),
            ));
        }
        let file = data
            .get("file")
            .and_then(Value::as_str)
            .filter(|file| !file.is_empty())
            .ok_or_else(|| {
                BridgeError::GatewayProcessing("response has no prompt file".to_string())
            })?
            .to_string();

        Ok(GatewayPromptRecord { file, data })
    }

    /// Fetches the enhanced prompt text for a record. An empty body is an
    /// error; whitespace is passed through as-is.
    pub async fn fetch_prompt(&self, record: &GatewayPromptRecord) -> Result<String, BridgeError> {
        let url = endpoint(&self.base_url, &["api", "image", "prompt", &record.file])?;
        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| BridgeError::PromptRetrieval(err.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BridgeError::PromptRetrieval(format!("status {status}")));
        }

        let prompt = resp
            .text()
            .await
            .map_err(|err| BridgeError::PromptRetrieval(err.to_string()))?;
        if prompt.is_empty() {
            return Err(BridgeError::PromptRetrieval(
                "gateway returned an empty prompt".to_string(),
            ));
        }
        Ok(prompt)
    }
}
