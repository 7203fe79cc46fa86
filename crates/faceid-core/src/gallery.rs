//! Reference gallery: the directory of images a probe is compared against.

use std::path::{Path, PathBuf};
use thiserror::Error;

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("cannot read gallery directory {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Snapshot of the gallery directory's image files, sorted by file name.
#[derive(Debug, Clone)]
pub struct Gallery {
    images: Vec<PathBuf>,
}

impl Gallery {
    /// List the gallery directory. Subdirectories and files without an
    /// image extension are not members.
    pub fn open(dir: &Path) -> Result<Self, GalleryError> {
        let unreadable = |source| GalleryError::Unreadable {
            path: dir.display().to_string(),
            source,
        };

        let mut images = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(unreadable)? {
            let entry = entry.map_err(unreadable)?;
            let path = entry.path();
            if path.is_file() && is_image(&path) {
                images.push(path);
            } else {
                tracing::debug!(path = %path.display(), "skipping non-image gallery entry");
            }
        }
        images.sort();

        Ok(Self { images })
    }

    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}
