//! Candidate image discovery for batch ranking.

use std::path::{Path, PathBuf};

use crate::error::{Result, SimilarityError};

/// File extensions treated as candidate images (lowercase).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "bmp"];

/// Finds candidate images in a directory.
#[derive(Debug, Clone, Default)]
pub struct ImageDiscovery {
    /// Whether to scan subdirectories.
    recursive: bool,
}

impl ImageDiscovery {
    /// Create a non-recursive discovery.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable recursive scanning.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Discover image files under `dir`, sorted by path.
    pub fn discover(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(SimilarityError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Not a directory: {}", dir.display()),
            )));
        }

        let mut files = Vec::new();
        self.walk(dir, &mut files)?;

        // Sort by path for deterministic ordering
        files.sort();
        Ok(files)
    }

    fn walk(&self, dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                if self.recursive {
                    self.walk(&path, files)?;
                }
            } else if is_image_path(&path) {
                files.push(path);
            }
        }
        Ok(())
    }
}

/// Whether the path has a known image extension.
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
