//! Local image output directory.

use std::fs;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::io::Cursor;
use std::path::PathBuf;

use tracing::debug;

use crate::backends::Engine;
use crate::constants::FILENAME_BUCKETS;
use crate::error::BridgeError;

/// Directory that generated images are written into.
#[derive(Clone, Debug)]
pub struct ImageStore {
    dir: PathBuf,
}

/// An image written to disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedImage {
    /// Bare filename, eg `sd_1234.png`
    pub file: String,
    /// Full path of the written file
    pub path: PathBuf,
}

impl ImageStore {
    /// Creates the directory (and parents) if needed. Safe to call repeatedly.
    pub fn init(dir: impl Into<PathBuf>) -> Result<Self, BridgeError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|err| {
            BridgeError::Filesystem(format!("Failed to create {}: {err}", dir.display()))
        })?;
        debug!("Image directory ready at {}", dir.display());
        Ok(Self { dir })
    }

    /// Writes bytes exactly as received.
    pub fn save_raw(
        &self,
        engine: Engine,
        prompt: &str,
        bytes: &[u8],
    ) -> Result<SavedImage, BridgeError> {
        let saved = self.target(engine, prompt);
        fs::write(&saved.path, bytes).map_err(|err| {
            BridgeError::Filesystem(format!("Failed to write {}: {err}", saved.path.display()))
        })?;
        Ok(saved)
    }

    /// Decodes the bytes as an image and writes them re-encoded as PNG.
    pub fn save_as_png(
        &self,
        engine: Engine,
        prompt: &str,
        bytes: &[u8],
    ) -> Result<SavedImage, BridgeError> {
        let image = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .decode()?;
        let saved = self.target(engine, prompt);
        image.save_with_format(&saved.path, image::ImageFormat::Png)?;
        Ok(saved)
    }

    fn target(&self, engine: Engine, prompt: &str) -> SavedImage {
        let file = filename_for(engine, prompt);
        let path = self.dir.join(&file);
        SavedImage { file, path }
    }
}

/// `<engine prefix>_<bucket>.png`. Distinct prompts can share a bucket, and
/// then share a filename.
pub fn filename_for(engine: Engine, prompt: &str) -> String {
    format!("{}_{}.png", engine.file_prefix(), prompt_bucket(prompt))
}

/// Stable across runs: `DefaultHasher::new()` always uses the same keys.
pub fn prompt_bucket(prompt: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    prompt.hash(&mut hasher);
    hasher.finish() % FILENAME_BUCKETS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn tiny_png() -> Vec<u8> {
        let image = image::RgbImage::from_pixel(2, 2, image::Rgb([200, 10, 10]));
        let mut out = Cursor::new(Vec::new());
        image
            .write_to(&mut out, image::ImageFormat::Png)
            .expect("encode png");
        out.into_inner()
    }

    #[test]
    fn init_creates_nested_dir_and_is_idempotent() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dir = tmp.path().join("ai_workspace").join("images");
        ImageStore::init(&dir).expect("first init");
        let store = ImageStore::init(&dir).expect("second init");
        assert!(dir.is_dir());
        assert_eq!(store.dir, dir);
    }

    #[test]
    fn init_fails_when_path_is_a_file() {
        let tmp = tempfile::NamedTempFile::new().expect("tempfile");
        let err = ImageStore::init(tmp.path()).expect_err("should fail");
        assert!(matches!(err, BridgeError::Filesystem(_)));
    }

    #[test]
    fn filenames_are_deterministic_and_prefixed() {
        let sd = filename_for(Engine::StableDiffusion, "a red ball");
        assert_eq!(sd, filename_for(Engine::StableDiffusion, "a red ball"));
        assert!(sd.starts_with("sd_"));
        assert!(sd.ends_with(".png"));

        let dalle = filename_for(Engine::Dalle, "a red ball");
        assert_eq!(dalle.trim_start_matches("dalle_"), sd.trim_start_matches("sd_"));
        assert!(prompt_bucket("anything at all") < FILENAME_BUCKETS);
    }

    #[test]
    fn prompts_in_the_same_bucket_share_a_filename() {
        let mut seen: HashMap<u64, String> = HashMap::new();
        let mut collision = None;
        for n in 0..=FILENAME_BUCKETS {
            let prompt = format!("prompt number {n}");
            let bucket = prompt_bucket(&prompt);
            if let Some(previous) = seen.insert(bucket, prompt.clone()) {
                collision = Some((previous, prompt));
                break;
            }
        }
        // pigeonhole: 10001 prompts over 10000 buckets
        let (first, second) = collision.expect("a collision");
        assert_ne!(first, second);
        assert_eq!(
            filename_for(Engine::StableDiffusion, &first),
            filename_for(Engine::StableDiffusion, &second)
        );
    }

    #[test]
    fn save_as_png_reencodes_and_rejects_garbage() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = ImageStore::init(tmp.path()).expect("init");

        let saved = store
            .save_as_png(Engine::StableDiffusion, "red", &tiny_png())
            .expect("save png");
        assert_eq!(saved.path, tmp.path().join(&saved.file));
        let written = image::open(&saved.path).expect("reopen");
        assert_eq!(written.width(), 2);

        let err = store
            .save_as_png(Engine::StableDiffusion, "blue", b"definitely not an image")
            .expect_err("garbage");
        assert!(matches!(err, BridgeError::Generation(_)));
        assert!(!tmp.path().join(filename_for(Engine::StableDiffusion, "blue")).exists());
    }

    #[test]
    fn save_raw_writes_bytes_verbatim() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = ImageStore::init(tmp.path()).expect("init");
        let saved = store
            .save_raw(Engine::Dalle, "green", b"raw bytes")
            .expect("save raw");
        assert_eq!(fs::read(&saved.path).expect("read back"), b"raw bytes");
    }
}
