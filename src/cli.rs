//! CLI parser
use clap::Parser;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_DALLE_MODEL, DEFAULT_GATEWAY_URL, DEFAULT_IMAGE_DIR, DEFAULT_OPENAI_BASE_URL,
    DEFAULT_SD_HEIGHT, DEFAULT_SD_STEPS, DEFAULT_SD_URL, DEFAULT_SD_WIDTH,
};

/// Printed when no description is given.
pub const USAGE: &str = "Usage: image_bridge \"your image description\"\nExample: image_bridge \"a beautiful sunset over mountains\"";

#[derive(Parser, Debug)]
#[command(name = "image_bridge")]
#[command(about = "Text -> gateway prompt enhancement -> DALL-E or Stable Diffusion image")]
/// CLI Options
pub struct CliOptions {
    /// Description of the image; all words are joined with spaces
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub text: Vec<String>,

    #[clap(long, help = "Enable debug logging", env = "IMAGE_BRIDGE_DEBUG")]
    /// Enable debug logging. Env: IMAGE_BRIDGE_DEBUG
    pub debug: bool,

    #[clap(long, default_value = DEFAULT_GATEWAY_URL, env = "IMAGE_BRIDGE_GATEWAY_URL")]
    /// Prompt gateway base URL.
    /// Env: IMAGE_BRIDGE_GATEWAY_URL
    pub gateway_url: String,

    #[clap(long, default_value = DEFAULT_SD_URL, env = "IMAGE_BRIDGE_SD_URL")]
    /// Stable Diffusion WebUI base URL.
    /// Env: IMAGE_BRIDGE_SD_URL
    pub sd_url: String,

    #[clap(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    /// OpenAI API key, DALL-E is only tried when this is set
    pub openai_api_key: Option<String>,

    #[clap(
        long,
        default_value = DEFAULT_OPENAI_BASE_URL,
        env = "IMAGE_BRIDGE_OPENAI_BASE_URL"
    )]
    /// Base URL for the Images API
    pub openai_base_url: String,

    #[clap(long, default_value = DEFAULT_DALLE_MODEL, env = "IMAGE_BRIDGE_DALLE_MODEL")]
    /// Hosted image model
    pub dalle_model: String,

    #[clap(long, default_value = DEFAULT_IMAGE_DIR, env = "IMAGE_BRIDGE_IMAGE_DIR")]
    /// Where generated images are written, created on startup
    pub image_dir: PathBuf,

    #[clap(long, default_value_t = DEFAULT_SD_STEPS, env = "IMAGE_BRIDGE_SD_STEPS")]
    /// Sampling steps for Stable Diffusion
    pub steps: u32,

    #[clap(long, default_value_t = DEFAULT_SD_WIDTH, env = "IMAGE_BRIDGE_SD_WIDTH")]
    /// Stable Diffusion image width
    pub width: u32,

    #[clap(long, default_value_t = DEFAULT_SD_HEIGHT, env = "IMAGE_BRIDGE_SD_HEIGHT")]
    /// Stable Diffusion image height
    pub height: u32,

    #[clap(long, env = "IMAGE_BRIDGE_SD_NEGATIVE_PROMPT")]
    /// Optional negative prompt for Stable Diffusion
    pub negative_prompt: Option<String>,
}

impl CliOptions {
    /// The description as one string, `None` when nothing was given.
    pub fn description(&self) -> Option<String> {
        let text = self.text.join(" ");
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
