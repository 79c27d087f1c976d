use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::ConfigError;

/// Per-operation tally printed when a command finishes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub applied: usize,
    pub skipped: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} applied, {} skipped", self.applied, self.skipped)
    }
}

/// Get the home directory
pub fn get_home_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = std::env::var("DOTFILES_HOME") {
        return Ok(PathBuf::from(path));
    }
    dirs::home_dir().ok_or(ConfigError::NoHome)
}

/// Expand a leading `~` and make the result absolute against `base`.
///
/// Absolutization is purely lexical: `.` and `..` are folded and no link is
/// followed, so a configured symlink destination keeps its own name.
pub fn resolve_path(raw: &str, base: &Path, home: &Path) -> PathBuf {
    let expanded = shellexpand::tilde_with_context(raw, || home.to_str());
    let path = Path::new(expanded.as_ref());
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Fold `.` and `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Check if a path is a symlink
pub fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// True when something (file, directory or link, even a dangling one) sits at `path`.
pub fn entry_exists(path: &Path) -> bool {
    path.exists() || is_symlink(path)
}

/// True for a real directory; a link to a directory does not count.
pub fn is_real_dir(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|m| m.file_type().is_dir())
        .unwrap_or(false)
}

/// Names of the entries directly inside `dir`, sorted.
pub fn list_dir_names(dir: &Path) -> std::io::Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<std::io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}
