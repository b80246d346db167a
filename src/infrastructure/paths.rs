//! Path resolution for on-disk frecency data.
//!
//! Resolves where the JSON file store and trace files live, and expands
//! `~` in user-supplied paths.

use std::path::PathBuf;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "FRECENT_DATA_DIR";

/// Returns the data directory for frecency storage.
///
/// Resolution order:
///
/// 1. `$FRECENT_DATA_DIR`
/// 2. `$XDG_DATA_HOME/frecent`
/// 3. `$HOME/.local/share/frecent`
/// 4. `./.frecent` when no home directory is known
#[must_use]
pub fn get_data_dir() -> PathBuf {
    resolve_data_dir(|name| std::env::var(name).ok())
}

fn resolve_data_dir<F>(env: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| env(name).filter(|v| !v.trim().is_empty());

    if let Some(dir) = non_empty(DATA_DIR_ENV) {
        return PathBuf::from(expand_tilde_with(&dir, non_empty("HOME").as_deref()));
    }
    if let Some(xdg) = non_empty("XDG_DATA_HOME") {
        return PathBuf::from(xdg).join("frecent");
    }
    non_empty("HOME").map_or_else(
        || PathBuf::from(".frecent"),
        |home| PathBuf::from(home).join(".local").join("share").join("frecent"),
    )
}

/// Expands a leading `~` to the user's home directory.
///
/// Paths without a leading `~`, or when `$HOME` is unset, are returned as-is.
///
/// # Examples
///
/// ```
/// use frecent::infrastructure::expand_tilde;
///
/// assert_eq!(expand_tilde("/absolute/path"), "/absolute/path");
/// ```
#[must_use]
pub fn expand_tilde(path: &str) -> String {
    expand_tilde_with(path, std::env::var("HOME").ok().as_deref())
}

fn expand_tilde_with(path: &str, home: Option<&str>) -> String {
    match home {
        Some(home) if path == "~" => home.to_string(),
        Some(home) if path.starts_with("~/") => path.replacen('~', home, 1),
        _ => path.to_string(),
    }
}
