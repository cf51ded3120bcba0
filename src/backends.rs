//! Image backends, tried in order until one produces an image.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{BridgeConfig, DiffusionSettings, endpoint};
use crate::constants::DALLE_IMAGE_SIZE;
use crate::error::BridgeError;
use crate::storage::{ImageStore, SavedImage};

/// Which provider produced an image. Serializes as its [`Engine::label`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Engine {
    /// Hosted OpenAI Images API
    Dalle,
    /// Local Stable Diffusion WebUI
    StableDiffusion,
}

impl Engine {
    /// Prefix used in output filenames.
    pub fn file_prefix(self) -> &'static str {
        match self {
            Self::Dalle => "dalle",
            Self::StableDiffusion => "sd",
        }
    }

    /// Human readable name, as serialized.
    pub fn label(self) -> &'static str {
        match self {
            Self::Dalle => "DALL-E",
            Self::StableDiffusion => "Stable Diffusion",
        }
    }
}

impl Serialize for Engine {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Outcome of one backend attempt.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GenerationResult {
    /// An image was saved
    Generated {
        /// always true
        success: bool,
        /// who made it
        engine: Engine,
        /// bare filename
        file: String,
        /// where it was written
        path: String,
        /// the prompt it was generated from
        prompt: String,
    },
    /// The backend failed
    Failed {
        /// always false
        success: bool,
        /// what went wrong
        error: String,
    },
}

impl GenerationResult {
    fn generated(engine: Engine, saved: SavedImage, prompt: &str) -> Self {
        Self::Generated {
            success: true,
            engine,
            file: saved.file,
            path: saved.path.display().to_string(),
            prompt: prompt.to_string(),
        }
    }

    fn failed(err: &BridgeError) -> Self {
        Self::Failed {
            success: false,
            error: err.to_string(),
        }
    }

    /// True when an image was saved.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Generated { .. })
    }

    /// Error message of a failed attempt.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Generated { .. } => None,
            Self::Failed { error, .. } => Some(error),
        }
    }
}

/// A configured image provider.
#[derive(Clone, Debug)]
pub enum Backend {
    /// Hosted API, only present when a credential is configured
    Dalle(DalleBackend),
    /// Local diffusion server, always present
    StableDiffusion(StableDiffusionBackend),
}

impl Backend {
    /// Which engine this backend drives.
    pub fn engine(&self) -> Engine {
        match self {
            Self::Dalle(_) => Engine::Dalle,
            Self::StableDiffusion(_) => Engine::StableDiffusion,
        }
    }

    /// Generates and saves one image. Never returns an error, failures
    /// come back as [`GenerationResult::Failed`].
    pub async fn generate(
        &self,
        client: &reqwest::Client,
        store: &ImageStore,
        prompt: &str,
    ) -> GenerationResult {
        let engine = self.engine();
        info!("Attempting {} generation...", engine.label());
        let saved = match self {
            Self::Dalle(backend) => backend.generate(client, store, prompt).await,
            Self::StableDiffusion(backend) => backend.generate(client, store, prompt).await,
        };
        match saved {
            Ok(saved) => {
                info!("{} image saved to {}", engine.label(), saved.path.display());
                GenerationResult::generated(engine, saved, prompt)
            }
            Err(err) => {
                warn!("{} generation failed: {}", engine.label(), err);
                GenerationResult::failed(&err)
            }
        }
    }
}

/// Ordered list of backends to try: hosted API first when a key is set,
/// then the local diffusion server.
pub fn backend_chain(config: &BridgeConfig) -> Vec<Backend> {
    let mut chain = Vec::with_capacity(2);
    if let Some(api_key) = config.api_key() {
        chain.push(Backend::Dalle(DalleBackend {
            base_url: config.openai_base_url.clone(),
            api_key: api_key.to_string(),
            model: config.dalle_model.clone(),
        }));
    } else {
        debug!("No OpenAI API key configured, skipping DALL-E");
    }
    chain.push(Backend::StableDiffusion(StableDiffusionBackend {
        base_url: config.sd_url.clone(),
        settings: config.diffusion.clone(),
        timeout: config.sd_timeout,
    }));
    chain
}

// -----------------------------
// Images API
// -----------------------------

/// Request body for POST /v1/images/generations
#[derive(Serialize, Debug)]
struct ImagesGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
    response_format: &'a str,
}

#[derive(Deserialize, Debug)]
struct ImagesGenerateResponse {
    data: Vec<ImageData>,
}

#[derive(Deserialize, Debug)]
struct ImageData {
    b64_json: Option<String>,
    url: Option<String>,
    revised_prompt: Option<String>,
}

/// Hosted text-to-image API.
#[derive(Clone, Debug)]
pub struct DalleBackend {
    base_url: Url,
    api_key: String,
    model: String,
}

impl DalleBackend {
    async fn generate(
        &self,
        client: &reqwest::Client,
        store: &ImageStore,
        prompt: &str,
    ) -> Result<SavedImage, BridgeError> {
        let url = endpoint(&self.base_url, &["v1", "images", "generations"])?;
        let req_body = ImagesGenerateRequest {
            model: &self.model,
            prompt,
            n: 1,
            size: DALLE_IMAGE_SIZE,
            response_format: "url",
        };

        let resp = client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&req_body)
            .send()
            .await?;
        let status = resp.status();
        let resp_bytes = resp.bytes().await?;
        if !status.is_success() {
            return Err(BridgeError::Generation(format!(
                "OpenAI Images API error {status}: {}",
                String::from_utf8_lossy(&resp_bytes)
            )));
        }

        let parsed: ImagesGenerateResponse = serde_json::from_slice(&resp_bytes).map_err(|err| {
            BridgeError::Generation(format!("Failed to parse /v1/images/generations JSON: {err}"))
        })?;
        let first = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| BridgeError::Generation("No image data returned".to_string()))?;

        if let Some(revised_prompt) = first.revised_prompt {
            debug!("Revised prompt from OpenAI: {revised_prompt}");
        }

        let bytes = if let Some(b64_json) = first.b64_json {
            general_purpose::STANDARD.decode(b64_json)?
        } else if let Some(url) = first.url {
            let resp = client.get(url).send().await?;
            let status = resp.status();
            let bytes = resp.bytes().await?;
            if !status.is_success() {
                return Err(BridgeError::Generation(format!(
                    "Image download error {status}"
                )));
            }
            bytes.to_vec()
        } else {
            return Err(BridgeError::Generation(
                "Image response missing b64_json and url fields".to_string(),
            ));
        };

        store.save_raw(Engine::Dalle, prompt, &bytes)
    }
}

// -----------------------------
// Stable Diffusion WebUI
// -----------------------------

#[derive(Serialize, Debug)]
struct Txt2ImgRequest<'a> {
    prompt: &'a str,
    steps: u32,
    width: u32,
    height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<&'a str>,
}

#[derive(Deserialize, Debug)]
struct Txt2ImgResponse {
    #[serde(default)]
    images: Vec<String>,
}

/// Local Stable Diffusion WebUI (`/sdapi/v1/txt2img`).
#[derive(Clone, Debug)]
pub struct StableDiffusionBackend {
    base_url: Url,
    settings: DiffusionSettings,
    timeout: Duration,
}

impl StableDiffusionBackend {
    async fn generate(
        &self,
        client: &reqwest::Client,
        store: &ImageStore,
        prompt: &str,
    ) -> Result<SavedImage, BridgeError> {
        let url = endpoint(&self.base_url, &["sdapi", "v1", "txt2img"])?;
        let req_body = Txt2ImgRequest {
            prompt,
            steps: self.settings.steps,
            width: self.settings.width,
            height: self.settings.height,
            negative_prompt: self.settings.negative_prompt.as_deref(),
        };

        let resp = client
            .post(url)
            .timeout(self.timeout)
            .json(&req_body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BridgeError::Generation(format!("SD API error: {status}")));
        }

        let parsed: Txt2ImgResponse = resp.json().await?;
        let image_data = parsed.images.into_iter().next().ok_or_else(|| {
            BridgeError::Generation("SD API returned no images".to_string())
        })?;
        let bytes = general_purpose::STANDARD.decode(image_data.trim())?;

        store.save_as_png(Engine::StableDiffusion, prompt, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_without_key_is_only_stable_diffusion() {
        let config = BridgeConfig::with_image_dir("images").expect("config");
        let chain = backend_chain(&config);
        let engines: Vec<Engine> = chain.iter().map(Backend::engine).collect();
        assert_eq!(engines, vec![Engine::StableDiffusion]);
    }

    #[test]
    fn chain_with_key_tries_dalle_first() {
        let mut config = BridgeConfig::with_image_dir("images").expect("config");
        config.openai_api_key = Some("sk-test".to_string());
        let engines: Vec<Engine> = backend_chain(&config).iter().map(Backend::engine).collect();
        assert_eq!(engines, vec![Engine::Dalle, Engine::StableDiffusion]);
    }

    #[test]
    fn generation_results_serialize_like_the_bridge_reports_them() {
        let ok = GenerationResult::Generated {
            success: true,
            engine: Engine::StableDiffusion,
            file: "sd_42.png".to_string(),
            path: "ai_workspace/images/sd_42.png".to_string(),
            prompt: "a red ball".to_string(),
        };
        let value = serde_json::to_value(&ok).expect("serialize");
        assert_eq!(value["engine"], "Stable Diffusion");
        assert_eq!(
            serde_json::to_value(Engine::Dalle).expect("serialize"),
            Engine::Dalle.label()
        );
        assert_eq!(value["success"], true);

        let failed = GenerationResult::Failed {
            success: false,
            error: "SD API error: 500 Internal Server Error".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&failed).expect("serialize"),
            serde_json::json!({"success": false, "error": "SD API error: 500 Internal Server Error"})
        );
        assert_eq!(failed.error(), Some("SD API error: 500 Internal Server Error"));
        assert!(!failed.is_success());
    }

    #[test]
    fn txt2img_body_omits_missing_negative_prompt() {
        let body = Txt2ImgRequest {
            prompt: "p",
            steps: 20,
            width: 512,
            height: 512,
            negative_prompt: None,
        };
        assert_eq!(
            serde_json::to_value(&body).expect("serialize"),
            serde_json::json!({"prompt": "p", "steps": 20, "width": 512, "height": 512})
        );
    }
}
