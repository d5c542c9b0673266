//! Finding the crawler executable.

use std::path::{Path, PathBuf};

pub const DEFAULT_CRAWLER_BIN: &str = "gocrawler";

pub fn which(bin: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(bin))
        .find(|cand| cand.is_file())
}

/// Resolve a configured crawler name or path.
///
/// Anything containing a path separator is taken as a path. A bare name is looked up on
/// `PATH`, then next to the running binary (the container layout ships both side by side).
/// Falls back to the name itself so the launch error names what was configured.
pub fn resolve(configured: &Path) -> PathBuf {
    if configured.components().count() > 1 || configured.is_absolute() {
        return configured.to_path_buf();
    }
    let name = configured.to_string_lossy();
    if let Some(found) = which(&name) {
        return found;
    }
    let beside_exe = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(configured)));
    match beside_exe {
        Some(p) if p.is_file() => p,
        _ => configured.to_path_buf(),
    }
}

pub fn is_available(resolved: &Path) -> bool {
    resolved.is_file()
}
