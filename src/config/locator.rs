//! Configuration file discovery.
//!
//! Probes a directory for `wrangler.jsonc`, `wrangler.json`, then
//! `wrangler.toml`, and walks project trees to find every worker in a
//! monorepo.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Config file base name
pub const CONFIG_BASE_NAME: &str = "wrangler";

/// Extensions in probe priority order
pub const CONFIG_EXTENSIONS: [&str; 3] = ["jsonc", "json", "toml"];

/// Maximum directory depth for [`discover_projects`]
pub const MAX_DISCOVERY_DEPTH: usize = 5;

/// Directory names never descended into during discovery.
pub const SKIPPED_DIRS: [&str; 7] = [
    "node_modules",
    "target",
    "dist",
    "build",
    "out",
    "vendor",
    "coverage",
];

/// A directory holding a configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredProject {
    pub dir: PathBuf,
    pub config: PathBuf,
}

/// Return the first config file in `dir`, as an absolute path.
pub fn find_config(dir: impl AsRef<Path>) -> Option<PathBuf> {
    let dir = absolutize(dir.as_ref());
    CONFIG_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{CONFIG_BASE_NAME}.{ext}")))
        .find(|candidate| candidate.is_file())
}

/// Probe `dir`, then its parent once.
pub fn find_config_up(dir: impl AsRef<Path>) -> Option<PathBuf> {
    let dir = absolutize(dir.as_ref());
    if let Some(found) = find_config(&dir) {
        return Some(found);
    }
    dir.parent().and_then(find_config)
}

/// Walk `root` for project directories.
///
/// A directory with a config file is a leaf: nothing beneath it is visited.
/// Unreadable directories are skipped. Results are sorted by directory.
pub fn discover_projects(root: impl AsRef<Path>) -> Vec<DiscoveredProject> {
    let mut found = Vec::new();
    walk(&absolutize(root.as_ref()), 0, &mut found);
    found.sort_by(|a, b| a.dir.cmp(&b.dir));
    debug!("Discovered {} projects", found.len());
    found
}

fn walk(dir: &Path, depth: usize, found: &mut Vec<DiscoveredProject>) {
    if let Some(config) = find_config(dir) {
        found.push(DiscoveredProject {
            dir: dir.to_path_buf(),
            config,
        });
        return;
    }
    if depth >= MAX_DISCOVERY_DEPTH {
        return;
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Skipping unreadable directory {}: {}", dir.display(), e);
            return;
        }
    };

    for entry in entries.flatten() {
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref()) {
            continue;
        }
        walk(&entry.path(), depth + 1, found);
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}
