//! Path helpers for config file lookup

use std::path::PathBuf;

/// Expand `~` and make relative paths absolute against the working directory
///
/// ```text
/// expand_path("~/.tabula/tabula.json") // -> /home/user/.tabula/tabula.json
/// expand_path("conf/tabula.json")      // -> /current/dir/conf/tabula.json
/// expand_path("/etc/tabula.json")      // -> unchanged
/// ```
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();

    let expanded = match path.strip_prefix('~') {
        Some("") => dirs::home_dir().unwrap_or_else(|| PathBuf::from(path)),
        Some(rest) if rest.starts_with('/') || rest.starts_with('\\') => dirs::home_dir()
            .map(|home| home.join(&rest[1..]))
            .unwrap_or_else(|| PathBuf::from(path)),
        // `~user` is not expanded
        _ => PathBuf::from(path),
    };

    if expanded.is_relative() {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    } else {
        expanded
    }
}
