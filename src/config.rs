//! Config handling

use std::path::PathBuf;
use std::time::Duration;

use tracing::log::LevelFilter;
use url::Url;

use crate::cli::CliOptions;
use crate::constants::{
    DEFAULT_DALLE_MODEL, DEFAULT_GATEWAY_URL, DEFAULT_OPENAI_BASE_URL,
    DEFAULT_SD_HEIGHT, DEFAULT_SD_STEPS, DEFAULT_SD_URL, DEFAULT_SD_WIDTH, GATEWAY_TIMEOUT,
    SD_TIMEOUT,
};
use crate::error::BridgeError;

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("reqwest", LevelFilter::Info)
            .with_module_level("h2", LevelFilter::Info);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

/// Knobs for the local txt2img call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffusionSettings {
    /// Sampling steps
    pub steps: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Sent as `negative_prompt` when set
    pub negative_prompt: Option<String>,
}

impl Default for DiffusionSettings {
    fn default() -> Self {
        Self {
            steps: DEFAULT_SD_STEPS,
            width: DEFAULT_SD_WIDTH,
            height: DEFAULT_SD_HEIGHT,
            negative_prompt: None,
        }
    }
}

/// Everything a workflow run needs to know about its collaborators.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Prompt gateway base URL
    pub gateway_url: Url,
    /// Stable Diffusion WebUI base URL
    pub sd_url: Url,
    /// Images API base URL
    pub openai_base_url: Url,
    /// Hosted API credential; the hosted backend is skipped without it
    pub openai_api_key: Option<String>,
    /// Hosted image model
    pub dalle_model: String,
    /// Output directory for saved images
    pub image_dir: PathBuf,
    /// txt2img parameters
    pub diffusion: DiffusionSettings,
    /// Per-request timeout for both gateway calls
    pub gateway_timeout: Duration,
    /// Per-request timeout for the txt2img call
    pub sd_timeout: Duration,
}

impl BridgeConfig {
    /// Builds a config with the stock endpoints, writing images to `image_dir`.
    pub fn with_image_dir(image_dir: impl Into<PathBuf>) -> Result<Self, BridgeError> {
        Ok(Self {
            gateway_url: Url::parse(DEFAULT_GATEWAY_URL)?,
            sd_url: Url::parse(DEFAULT_SD_URL)?,
            openai_base_url: Url::parse(DEFAULT_OPENAI_BASE_URL)?,
            openai_api_key: None,
            dalle_model: DEFAULT_DALLE_MODEL.to_string(),
            image_dir: image_dir.into(),
            diffusion: DiffusionSettings::default(),
            gateway_timeout: GATEWAY_TIMEOUT,
            sd_timeout: SD_TIMEOUT,
        })
    }

    /// Returns the credential, treating an empty value as absent.
    pub fn api_key(&self) -> Option<&str> {
        self.openai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

impl TryFrom<&CliOptions> for BridgeConfig {
    type Error = BridgeError;

    fn try_from(cli: &CliOptions) -> Result<Self, Self::Error> {
        Ok(Self {
            gateway_url: parse_endpoint("gateway", &cli.gateway_url)?,
            sd_url: parse_endpoint("Stable Diffusion", &cli.sd_url)?,
            openai_base_url: parse_endpoint("OpenAI", &cli.openai_base_url)?,
            openai_api_key: cli.openai_api_key.clone(),
            dalle_model: cli.dalle_model.clone(),
            image_dir: cli.image_dir.clone(),
            diffusion: DiffusionSettings {
                steps: cli.steps,
                width: cli.width,
                height: cli.height,
                negative_prompt: cli.negative_prompt.clone(),
            },
            gateway_timeout: GATEWAY_TIMEOUT,
            sd_timeout: SD_TIMEOUT,
        })
    }
}

fn parse_endpoint(name: &str, value: &str) -> Result<Url, BridgeError> {
    let url = Url::parse(value)
        .map_err(|err| BridgeError::Config(format!("Invalid {name} URL {value:?}: {err}")))?;
    if url.cannot_be_a_base() {
        return Err(BridgeError::Config(format!(
            "Invalid {name} URL {value:?}: not a base URL"
        )));
    }
    Ok(url)
}

/// Appends path segments to a base URL, escaping each segment.
pub fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, BridgeError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| BridgeError::Config(format!("{base} cannot be used as a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
