//! Shared defaults for the bridge
//!

use std::time::Duration;

/// Where the prompt gateway listens by default
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:3003";

/// Default local Stable Diffusion WebUI address
pub const DEFAULT_SD_URL: &str = "http://127.0.0.1:7860";

/// Default base for the hosted image API
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Default hosted image model
pub const DEFAULT_DALLE_MODEL: &str = "dall-e-2";

/// Size requested from the hosted image API
pub const DALLE_IMAGE_SIZE: &str = "1024x1024";

/// The default place we put images
pub const DEFAULT_IMAGE_DIR: &str = "ai_workspace/images";

/// Diffusion sampling steps.
pub const DEFAULT_SD_STEPS: u32 = 20;
/// Diffusion output width in pixels.
pub const DEFAULT_SD_WIDTH: u32 = 512;
/// Diffusion output height in pixels.
pub const DEFAULT_SD_HEIGHT: u32 = 512;

/// Default timeout applied to both gateway calls.
pub const GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout applied to the txt2img call.
pub const SD_TIMEOUT: Duration = Duration::from_secs(30);

/// Value of the `source` field sent to the gateway
pub const GATEWAY_SOURCE: &str = "image_bridge";

/// Filenames are `<prefix>_<hash % FILENAME_BUCKETS>.png`
pub const FILENAME_BUCKETS: u64 = 10_000;

/// How much of the enhanced prompt ends up in the progress log
pub const PROMPT_PREVIEW_CHARS: usize = 100;

/// Manual follow-ups reported when every backend failed.
pub const NEXT_STEPS: [&str; 3] = [
    "1. Install Stable Diffusion WebUI",
    "2. Or set OPENAI_API_KEY for DALL-E",
    "3. Use the prompt manually with any image tool",
];
