//! Source file discovery.
//!
//! Finds C/C++ translation units and headers under a path, in a stable order.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Maximum file size to analyze (10 MB).
///
/// Files larger than this are skipped to prevent memory exhaustion.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Extensions treated as C or C++ sources.
pub const SOURCE_EXTENSIONS: &[&str] = &[
    "c", "cc", "cpp", "cxx", "c++", "h", "hh", "hpp", "hxx", "h++",
];

/// Options for file discovery.
#[derive(Clone, Debug, Default)]
pub struct DiscoveryOptions {
    /// Whether to check file size limits.
    pub check_file_size: bool,
    /// Whether to re-check each entry's metadata before accepting it.
    pub security_checks: bool,
}

impl DiscoveryOptions {
    /// All checks enabled (used by the engine).
    pub fn secure() -> Self {
        Self {
            check_file_size: true,
            security_checks: true,
        }
    }

    /// No metadata checks, for trusted trees.
    pub fn fast() -> Self {
        Self {
            check_file_size: false,
            security_checks: false,
        }
    }
}

/// Whether `path` has a C/C++ source extension.
pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SOURCE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Discover all C/C++ files at the given path, sorted by path.
///
/// A file path is returned as-is. Directories are walked without following
/// symlinks, skipping hidden, build and vendored directories.
pub fn discover_sources(path: &Path, options: &DiscoveryOptions) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }

    let mut files = Vec::new();

    // Note: the root path itself may be a symlink (common for /tmp on macOS)
    for entry in WalkDir::new(path)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_excluded_dir(e))
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let file_path = entry.path();
        if !is_source_file(file_path) {
            continue;
        }

        if options.security_checks {
            match std::fs::symlink_metadata(file_path) {
                Ok(meta) if meta.is_file() => {
                    if options.check_file_size && meta.len() > MAX_FILE_SIZE {
                        tracing::warn!(
                            path = %file_path.display(),
                            size = meta.len(),
                            max = MAX_FILE_SIZE,
                            "skipping file: too large"
                        );
                        continue;
                    }
                    files.push(file_path.to_path_buf());
                }
                // Not a regular file (could be symlink), skip silently
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(path = %file_path.display(), error = %e, "cannot read metadata");
                    continue;
                }
            }
        } else {
            files.push(file_path.to_path_buf());
        }
    }

    files
}

/// Check if a directory entry should be excluded from traversal.
///
/// The root directory (depth 0) is never excluded, even if it starts with `.`.
pub fn is_excluded_dir(entry: &walkdir::DirEntry) -> bool {
    if !entry.file_type().is_dir() || entry.depth() == 0 {
        return false;
    }

    let name = entry.file_name().to_string_lossy();

    if name.starts_with('.') {
        return true;
    }

    matches!(
        name.as_ref(),
        "build" | "cmake-build-debug" | "cmake-build-release" | "node_modules" | "vendor"
            | "third_party" | "dist" | "out" | "target"
    )
}
