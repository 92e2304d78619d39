//! Output path policy

use std::path::{Component, Path, PathBuf};

use crate::error::{TemplaterError, TemplaterResult};

use super::SYSTEM_PATH_PREFIXES;

fn unsafe_path(path: &Path, reason: impl Into<String>) -> TemplaterError {
    TemplaterError::UnsafePath {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// True for `/home/<user>/.<hidden>` style locations
fn is_hidden_home_entry(abs: &Path) -> bool {
    let mut parts = abs.components().filter_map(|c| match c {
        Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
        _ => None,
    });
    matches!(
        (parts.next().as_deref(), parts.next(), parts.next()),
        (Some("home"), Some(_), Some(name)) if name.starts_with('.')
    )
}

/// Absolute form of `path` after the checks that need no allow-list
///
/// Rejects traversal segments, system directories and hidden entries
/// directly under a home directory. Symlinks are not resolved.
pub fn screen_output_path(path: &Path) -> TemplaterResult<PathBuf> {
    if path.components().any(|c| c == Component::ParentDir) {
        return Err(unsafe_path(path, "path traversal segment '..'"));
    }

    let abs = std::path::absolute(path)
        .map_err(|e| unsafe_path(path, format!("invalid path: {}", e)))?;

    if let Some(prefix) = SYSTEM_PATH_PREFIXES
        .iter()
        .find(|prefix| abs.starts_with(prefix))
    {
        return Err(unsafe_path(
            path,
            format!("system path '{}' is not writable by templates", prefix),
        ));
    }
    if is_hidden_home_entry(&abs) {
        return Err(unsafe_path(path, "hidden entry in a home directory"));
    }
    Ok(abs)
}

/// Ensure `path` is a safe destination inside one of `allowed_dirs`
///
/// On top of [`screen_output_path`], an allowed directory must be a
/// component-wise prefix of the path and must be stat-able as a directory.
pub fn validate_output_path(path: &Path, allowed_dirs: &[PathBuf]) -> TemplaterResult<()> {
    let abs = screen_output_path(path)?;

    for dir in allowed_dirs {
        let Ok(abs_dir) = std::path::absolute(dir) else {
            continue;
        };
        if abs.starts_with(&abs_dir) {
            return match std::fs::metadata(&abs_dir) {
                Ok(meta) if meta.is_dir() => Ok(()),
                Ok(_) => Err(unsafe_path(
                    path,
                    format!("allowed path '{}' is not a directory", abs_dir.display()),
                )),
                Err(e) => Err(unsafe_path(
                    path,
                    format!(
                        "allowed directory '{}' not accessible: {}",
                        abs_dir.display(),
                        e
                    ),
                )),
            };
        }
    }

    Err(unsafe_path(path, "not within allowed directories"))
}

/// Reduce a user-supplied relative path to plain named segments
///
/// Drops root, prefix, `.` and `..` components and strips control characters,
/// so the result can be joined under an output directory safely.
pub fn sanitize_path(path: &str) -> PathBuf {
    Path::new(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => {
                let cleaned: String = s
                    .to_string_lossy()
                    .chars()
                    .filter(|ch| !ch.is_control())
                    .collect();
                (!cleaned.is_empty() && cleaned != "..").then_some(cleaned)
            }
            _ => None,
        })
        .collect()
}
