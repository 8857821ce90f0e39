//! Output-path resolution and the state sidecar path.

use std::path::{Path, PathBuf};

/// Where the caller wants the finished file to land.
#[derive(Debug, Clone)]
pub enum Destination {
    /// Save into this directory, named after the probed filename.
    Directory(PathBuf),
    /// Save at this exact path (its parent directory is created if missing).
    File(PathBuf),
    /// Use the configured default download directory.
    Default,
}

/// Resolves the final output path given the probed filename and the configured
/// default download directory.
pub fn resolve_final_path(
    destination: &Destination,
    filename: &str,
    default_download_dir: &Path,
) -> std::io::Result<PathBuf> {
    match destination {
        Destination::Directory(dir) => {
            std::fs::create_dir_all(dir)?;
            Ok(dir.join(filename))
        }
        Destination::File(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            Ok(path.clone())
        }
        Destination::Default => {
            std::fs::create_dir_all(default_download_dir)?;
            Ok(default_download_dir.join(filename))
        }
    }
}

/// Sidecar state file path: `<final_path>.state`.
pub fn state_path(final_path: &Path) -> PathBuf {
    let mut os = final_path.as_os_str().to_owned();
    os.push(".state");
    PathBuf::from(os)
}
