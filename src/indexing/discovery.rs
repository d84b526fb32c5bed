use crate::core::error::{Error, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// A source file found in the corpus directory
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub relative_path: String,
    pub modified_millis: u64,
}

/// Discover all text files in a directory, respecting .gitignore rules.
/// Files are returned sorted by relative path so runs are deterministic.
pub fn discover_files(root: &Path) -> Result<Vec<SourceFile>> {
    if !root.exists() {
        return Err(Error::Config(format!(
            "Directory does not exist: {}",
            root.display()
        )));
    }

    if !root.is_dir() {
        return Err(Error::Config(format!(
            "Path is not a directory: {}",
            root.display()
        )));
    }

    let mut files = Vec::new();

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_exclude(true)
        .build();

    for result in walker {
        match result {
            Ok(entry) => {
                let path = entry.path();

                if path.is_dir() {
                    continue;
                }

                if !is_text_file(path) {
                    continue;
                }

                let relative_path = path
                    .strip_prefix(root)
                    .map_err(|e| {
                        Error::Io(std::io::Error::new(
                            std::io::ErrorKind::Other,
                            format!("Failed to get relative path: {}", e),
                        ))
                    })?
                    .to_string_lossy()
                    .into_owned();

                let modified_millis = match file_modified_millis(path) {
                    Ok(millis) => millis,
                    Err(err) => {
                        tracing::warn!(path = %path.display(), "failed to read mtime: {err}");
                        continue;
                    }
                };

                files.push(SourceFile {
                    path: path.to_path_buf(),
                    relative_path,
                    modified_millis,
                });
            }
            Err(err) => {
                // Some files might be inaccessible; keep walking.
                tracing::warn!("failed to access file: {err}");
            }
        }
    }

    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    Ok(files)
}

/// Check if a file is a supported text document based on extension
pub fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            matches!(
                ext.to_lowercase().as_str(),
                "md" | "markdown" | "mdown" | "mkd" | "mkdn" | "txt" | "text"
            )
        })
        .unwrap_or(false)
}

/// Get file modification time as milliseconds since the Unix epoch
pub fn file_modified_millis(path: &Path) -> Result<u64> {
    let metadata = std::fs::metadata(path)?;
    let modified = metadata.modified()?;
    let duration = modified
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to get modification time: {}", e),
            ))
        })?;
    Ok(duration.as_millis() as u64)
}
