//! Text -> gateway -> enhanced prompt -> image.

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::backends::{Backend, GenerationResult, backend_chain};
use crate::config::BridgeConfig;
use crate::constants::{NEXT_STEPS, PROMPT_PREVIEW_CHARS};
use crate::error::BridgeError;
use crate::gateway::GatewayClient;
use crate::storage::ImageStore;

/// A description to turn into an image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowRequest {
    text: String,
}

impl WorkflowRequest {
    /// Wraps the user's description.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The description as given.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Outcome of a workflow run, printed as JSON by the CLI.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WorkflowResult {
    /// An image was generated and saved
    Completed {
        /// always true
        success: bool,
        /// the user's description
        original_text: String,
        /// prompt returned by the gateway
        enhanced_prompt: String,
        /// the backend result that succeeded
        image_result: GenerationResult,
        /// raw gateway response
        gateway_data: Value,
    },
    /// The prompt was enhanced but no backend produced an image
    GenerationFailed {
        /// always false
        success: bool,
        /// summary
        message: String,
        /// prompt returned by the gateway, for manual use
        enhanced_prompt: String,
        /// raw gateway response
        gateway_data: Value,
        /// manual remediation hints
        next_steps: Vec<String>,
        /// one entry per backend attempt
        #[serde(skip_serializing_if = "Vec::is_empty")]
        errors: Vec<String>,
    },
    /// The gateway step failed; no backend was tried
    Aborted {
        /// what failed
        error: String,
    },
    /// The workflow could not start
    Failed {
        /// always false
        success: bool,
        /// what failed
        error: String,
    },
}

impl WorkflowResult {
    /// True only when an image was saved.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Result for a workflow that could not even be set up.
    pub fn failed(err: &BridgeError) -> Self {
        Self::Failed {
            success: false,
            error: err.to_string(),
        }
    }

    fn aborted(error: &str) -> Self {
        Self::Aborted {
            error: error.to_string(),
        }
    }
}

/// Session tag sent to the gateway, unique per process.
pub fn session_id() -> String {
    format!("workflow_{}", std::process::id())
}

/// Gateway plus the ordered backends plus the output directory.
#[derive(Debug)]
pub struct Workflow {
    client: reqwest::Client,
    gateway: GatewayClient,
    backends: Vec<Backend>,
    store: ImageStore,
}

impl Workflow {
    /// Builds the HTTP client and backend chain, and creates the image directory.
    pub fn new(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| BridgeError::Config(format!("Failed to build HTTP client: {err}")))?;
        let store = ImageStore::init(&config.image_dir)?;
        Ok(Self {
            gateway: GatewayClient::new(
                config.gateway_url.clone(),
                client.clone(),
                config.gateway_timeout,
            ),
            backends: backend_chain(config),
            client,
            store,
        })
    }

    /// Runs the whole workflow. Every failure is reported in the result.
    pub async fn run(&self, request: &WorkflowRequest) -> WorkflowResult {
        let text = request.text();
        info!("Starting workflow for: {text}");

        let record = match self.gateway.submit(text, &session_id()).await {
            Ok(record) => record,
            Err(err @ BridgeError::Gateway(_)) => {
                error!("{err}");
                return WorkflowResult::aborted("Gateway request failed");
            }
            Err(err) => {
                error!("{err}");
                return WorkflowResult::aborted("Gateway processing failed");
            }
        };

        let enhanced_prompt = match self.gateway.fetch_prompt(&record).await {
            Ok(prompt) => prompt,
            Err(err) => {
                error!("{err}");
                return WorkflowResult::aborted("Could not retrieve enhanced prompt");
            }
        };
        let preview: String = enhanced_prompt.chars().take(PROMPT_PREVIEW_CHARS).collect();
        info!("Enhanced prompt: {preview}...");

        let mut errors = Vec::new();
        for backend in &self.backends {
            let result = backend
                .generate(&self.client, &self.store, &enhanced_prompt)
                .await;
            if result.is_success() {
                return WorkflowResult::Completed {
                    success: true,
                    original_text: text.to_string(),
                    enhanced_prompt,
                    image_result: result,
                    gateway_data: record.data,
                };
            }
            if let Some(error) = result.error() {
                errors.push(format!("{}: {error}", backend.engine().label()));
            }
        }

        warn!("Image generation failed on every backend");
        WorkflowResult::GenerationFailed {
            success: false,
            message: "Image generation failed".to_string(),
            enhanced_prompt,
            gateway_data: record.data,
            next_steps: NEXT_STEPS.iter().map(|step| step.to_string()).collect(),
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn aborted_results_carry_only_the_error() {
        let result = WorkflowResult::aborted("Gateway request failed");
        assert_eq!(
            serde_json::to_value(&result).expect("serialize"),
            json!({"error": "Gateway request failed"})
        );
        assert!(!result.is_success());
    }

    #[test]
    fn generation_failure_lists_next_steps() {
        let result = WorkflowResult::GenerationFailed {
            success: false,
            message: "Image generation failed".to_string(),
            enhanced_prompt: "p".to_string(),
            gateway_data: json!({"success": true, "file": "p1"}),
            next_steps: NEXT_STEPS.iter().map(|step| step.to_string()).collect(),
            errors: Vec::new(),
        };
        let value = serde_json::to_value(&result).expect("serialize");
        assert_eq!(value["success"], false);
        assert_eq!(value["message"], "Image generation failed");
        assert_eq!(value["next_steps"].as_array().map(Vec::len), Some(3));
        assert!(value.get("errors").is_none());
    }

    #[test]
    fn session_id_is_tied_to_the_process() {
        assert_eq!(session_id(), format!("workflow_{}", std::process::id()));
    }

    #[test]
    fn new_creates_the_image_dir() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dir = tmp.path().join("nested").join("images");
        let config = BridgeConfig::with_image_dir(&dir).expect("config");
        let workflow = Workflow::new(&config).expect("workflow");
        assert!(dir.is_dir());
        let engines: Vec<_> = workflow.backends.iter().map(Backend::engine).collect();
        assert_eq!(engines, vec![crate::backends::Engine::StableDiffusion]);
    }
}
