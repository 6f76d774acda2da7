//! Image acquisition and normalization.
//!
//! Turns two image references into two square buffers of the same size:
//!
//! 1. Both sources are loaded in parallel. A source that cannot be fetched
//!    or decoded is replaced by a deterministic [`placeholder`] so the
//!    comparison still produces a score.
//! 2. Any successfully decoded source whose smaller side is below the
//!    minimum size fails the comparison with
//!    [`SimilarityError::TooSmall`].
//! 3. Both buffers are resampled to `S x S`, where
//!    `S = min(max_size, max(min_width, min_height))` over the pair.
//!
//! All intermediate rasters are owned by the call.

mod placeholder;

pub use placeholder::{placeholder, PLACEHOLDER_END, PLACEHOLDER_START};

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::EngineConfig;
use crate::error::{Result, SimilarityError};
use crate::PixelBuffer;

/// An addressable image resource.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Local file.
    Path(PathBuf),
    /// Remote http(s) resource.
    Url(String),
    /// Encoded image bytes (PNG, JPEG, ...).
    Bytes(Vec<u8>),
    /// Already decoded pixels.
    Buffer(PixelBuffer),
}

impl ImageSource {
    /// Classify a string as a URL or a file path.
    pub fn parse(reference: &str) -> Self {
        let lower = reference.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            ImageSource::Url(reference.to_string())
        } else {
            ImageSource::Path(PathBuf::from(reference))
        }
    }

    /// Short human readable description for logs and reports.
    pub fn label(&self) -> String {
        match self {
            ImageSource::Path(path) => path.display().to_string(),
            ImageSource::Url(url) => url.clone(),
            ImageSource::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
            ImageSource::Buffer(buffer) => {
                format!("<{}x{} buffer>", buffer.width(), buffer.height())
            }
        }
    }

    /// Fetch and decode the source.
    ///
    /// `timeout` bounds remote fetches; local sources ignore it.
    pub fn load(&self, timeout: Duration) -> Result<PixelBuffer> {
        match self {
            ImageSource::Path(path) => {
                let image = image::open(path).map_err(|e| {
                    SimilarityError::Decode(format!("{}: {}", path.display(), e))
                })?;
                Ok(PixelBuffer::from_image(&image))
            }
            ImageSource::Url(url) => fetch(url, timeout),
            ImageSource::Bytes(bytes) => {
                let image = image::load_from_memory(bytes)?;
                Ok(PixelBuffer::from_image(&image))
            }
            ImageSource::Buffer(buffer) => Ok(buffer.clone()),
        }
    }
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl From<PixelBuffer> for ImageSource {
    fn from(buffer: PixelBuffer) -> Self {
        ImageSource::Buffer(buffer)
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

impl From<&str> for ImageSource {
    fn from(reference: &str) -> Self {
        ImageSource::parse(reference)
    }
}

#[cfg(feature = "fetch")]
fn fetch(url: &str, timeout: Duration) -> Result<PixelBuffer> {
    log::debug!("Fetching {} (timeout {:?})", url, timeout);

    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()?;
    let bytes = client.get(url).send()?.error_for_status()?.bytes()?;
    let image = image::load_from_memory(&bytes)?;
    Ok(PixelBuffer::from_image(&image))
}

#[cfg(not(feature = "fetch"))]
fn fetch(url: &str, _timeout: Duration) -> Result<PixelBuffer> {
    Err(SimilarityError::Decode(format!(
        "{}: remote sources need the `fetch` feature",
        url
    )))
}

/// Reject sources whose smaller side is below `minimum`.
pub fn check_min_size(buffer: &PixelBuffer, minimum: u32) -> Result<()> {
    if buffer.width().min(buffer.height()) < minimum {
        return Err(SimilarityError::TooSmall {
            width: buffer.width(),
            height: buffer.height(),
            minimum,
        });
    }
    Ok(())
}

/// Resample two buffers to a common `S x S` size.
///
/// `S = min(max_size, max(min_width, min_height))`, where `min_width` and
/// `min_height` are the smaller of the two widths and heights.
pub fn normalize_pair(
    a: &PixelBuffer,
    b: &PixelBuffer,
    max_size: u32,
) -> Result<(PixelBuffer, PixelBuffer)> {
    let min_width = a.width().min(b.width());
    let min_height = a.height().min(b.height());
    let size = min_width.max(min_height).min(max_size);

    log::debug!(
        "Normalizing {}x{} and {}x{} to {}x{}",
        a.width(),
        a.height(),
        b.width(),
        b.height(),
        size,
        size
    );

    Ok((a.resize(size, size)?, b.resize(size, size)?))
}

/// Load, validate and normalize a target/generated pair.
///
/// Decode failures never abort: the failing side becomes a placeholder
/// with the other side's dimensions, or `max_size` square when both fail.
pub fn acquire_pair(
    target: &ImageSource,
    generated: &ImageSource,
    config: &EngineConfig,
) -> Result<(PixelBuffer, PixelBuffer)> {
    let timeout = Duration::from_secs(config.fetch_timeout_secs);
    let (target_raw, generated_raw) =
        rayon::join(|| target.load(timeout), || generated.load(timeout));

    let target_buffer = loaded_or_none(target, target_raw, config.min_size)?;
    let generated_buffer = loaded_or_none(generated, generated_raw, config.min_size)?;

    let (target_buffer, generated_buffer) = match (target_buffer, generated_buffer) {
        (Some(t), Some(g)) => (t, g),
        (Some(t), None) => {
            let p = placeholder(t.width(), t.height())?;
            (t, p)
        }
        (None, Some(g)) => (placeholder(g.width(), g.height())?, g),
        (None, None) => (
            placeholder(config.max_size, config.max_size)?,
            placeholder(config.max_size, config.max_size)?,
        ),
    };

    normalize_pair(&target_buffer, &generated_buffer, config.max_size)
}

/// Size-check a decoded source, or log and drop a decode failure.
fn loaded_or_none(
    source: &ImageSource,
    loaded: Result<PixelBuffer>,
    min_size: u32,
) -> Result<Option<PixelBuffer>> {
    match loaded {
        Ok(buffer) => {
            check_min_size(&buffer, min_size)?;
            Ok(Some(buffer))
        }
        Err(e) => {
            log::warn!("Using placeholder for {}: {}", source.label(), e);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::solid(width, height, [10, 200, 30, 255]).unwrap()
    }

    #[test]
    fn test_parse_source() {
        assert!(matches!(
            ImageSource::parse("https://example.com/a.png"),
            ImageSource::Url(_)
        ));
        assert!(matches!(
            ImageSource::parse("HTTP://example.com/a.png"),
            ImageSource::Url(_)
        ));
        assert!(matches!(
            ImageSource::parse("images/a.png"),
            ImageSource::Path(_)
        ));
    }

    #[test]
    fn test_normalized_size_rule() {
        // min width 100, min height 60 -> max(100, 60) = 100
        let (a, b) = normalize_pair(&buffer(100, 80), &buffer(120, 60), 512).unwrap();
        assert_eq!(a.dimensions(), (100, 100));
        assert_eq!(b.dimensions(), (100, 100));
    }

    #[test]
    fn test_normalized_size_is_capped() {
        let (a, b) = normalize_pair(&buffer(1024, 900), &buffer(800, 2000), 512).unwrap();
        assert_eq!(a.dimensions(), (512, 512));
        assert_eq!(b.dimensions(), (512, 512));
    }

    #[test]
    fn test_min_size_boundary() {
        assert!(matches!(
            check_min_size(&buffer(15, 15), 16),
            Err(SimilarityError::TooSmall { .. })
        ));
        assert!(check_min_size(&buffer(16, 16), 16).is_ok());
        assert!(check_min_size(&buffer(300, 15), 16).is_err());
    }

    #[test]
    fn test_acquire_rejects_small_source() {
        let config = EngineConfig::default();
        let result = acquire_pair(
            &ImageSource::from(buffer(15, 15)),
            &ImageSource::from(buffer(64, 64)),
            &config,
        );
        assert!(matches!(result, Err(SimilarityError::TooSmall { .. })));
    }

    #[test]
    fn test_decode_failure_uses_placeholder() {
        let config = EngineConfig::default();
        let (target, generated) = acquire_pair(
            &ImageSource::from(buffer(48, 32)),
            &ImageSource::Bytes(b"not an image".to_vec()),
            &config,
        )
        .unwrap();

        assert_eq!(target.dimensions(), (48, 48));
        assert_eq!(generated.dimensions(), (48, 48));
        let expected = placeholder(48, 32).unwrap().resize(48, 48).unwrap();
        assert_eq!(generated, expected);
    }

    #[test]
    fn test_unreachable_url_is_decode_error() {
        let source = ImageSource::parse("http://127.0.0.1:9/x.png");
        assert!(matches!(
            source.load(Duration::from_secs(2)),
            Err(SimilarityError::Decode(_))
        ));
    }

    #[test]
    fn test_both_sources_failing_still_yields_buffers() {
        let config = EngineConfig::default();
        let (a, b) = acquire_pair(
            &ImageSource::Path(PathBuf::from("/definitely/not/here.png")),
            &ImageSource::Bytes(Vec::new()),
            &config,
        )
        .unwrap();
        assert_eq!(a.dimensions(), (512, 512));
        assert_eq!(a, b);
    }
}
