//! File helpers for the CLI

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Path argument that reads standard input instead of a file
pub const STDIN_PATH: &str = "-";

/// Expand `~` and make relative paths absolute against the working directory
///
/// ```text
/// expand_path("~/.sieve")     // -> /home/user/.sieve
/// expand_path("filters/a.json") // -> /current/dir/filters/a.json
/// expand_path("/etc/sieve.json") // unchanged
/// ```
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();
    let cwd = || std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    if path.is_empty() {
        return cwd();
    }

    let expanded = match (path, dirs::home_dir()) {
        ("~", Some(home)) => home,
        (p, Some(home)) if p.starts_with("~/") => home.join(&p[2..]),
        (p, _) => PathBuf::from(p),
    };

    if expanded.is_relative() {
        cwd().join(expanded)
    } else {
        expanded
    }
}

/// Read a JSON input document; `-` reads standard input
pub fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == STDIN_PATH {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read standard input")?;
        return Ok(content);
    }

    let expanded = expand_path(&path.to_string_lossy());
    tracing::debug!(path = %expanded.display(), "Reading input file");
    std::fs::read_to_string(&expanded)
        .with_context(|| format!("Failed to read {}", expanded.display()))
}
