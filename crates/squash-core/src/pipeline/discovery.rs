//! File discovery for finding uploadable images on disk.
//!
//! Used by front ends that feed the pipeline from the file system; the
//! pipeline itself never touches the disk.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::classify::is_supported_extension;

/// Information about a discovered file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

/// Discovers image files with an allowed extension.
#[derive(Debug, Clone, Default)]
pub struct FileDiscovery;

impl FileDiscovery {
    pub fn new() -> Self {
        Self
    }

    /// Discover all allowed image files at a path.
    ///
    /// A file path is returned as-is when its extension is allowed. A
    /// directory is walked recursively; results are sorted by path.
    pub fn discover(&self, path: &Path) -> Vec<DiscoveredFile> {
        if path.is_file() {
            return std::fs::metadata(path)
                .ok()
                .filter(|_| Self::is_supported(path))
                .map(|meta| DiscoveredFile {
                    path: path.to_path_buf(),
                    size: meta.len(),
                })
                .into_iter()
                .collect();
        }

        let mut files: Vec<DiscoveredFile> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && Self::is_supported(e.path()))
            .filter_map(|e| {
                let size = e.metadata().ok()?.len();
                Some(DiscoveredFile {
                    path: e.into_path(),
                    size,
                })
            })
            .collect();

        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    /// Check if a path has an allowed extension.
    pub fn is_supported(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(is_supported_extension)
            .unwrap_or(false)
    }

    /// Get total size of all discovered files.
    pub fn total_size(files: &[DiscoveredFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}
