//! Configuration file discovery.
//!
//! Discovers `.sift.toml` files by walking up the directory tree from a starting point,
//! then appending the global `~/.sift.toml` if present.

use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::parse::is_root_config;

/// The configuration filename.
pub const CONFIG_FILENAME: &str = ".sift.toml";

/// Discovers all configuration files relevant to the given directory.
///
/// Returns paths in precedence order: closest to `cwd` first, global (`~/.sift.toml`) last.
/// Discovery stops at the first file with `root = true`; the global file is then skipped.
pub fn discover_config_files(cwd: &Path) -> Vec<PathBuf> {
    let mut configs = Vec::new();
    for dir in cwd.ancestors() {
        let path = dir.join(CONFIG_FILENAME);
        if !path.is_file() {
            continue;
        }
        let is_root = is_root_config(&path);
        configs.push(path);
        if is_root {
            return configs;
        }
    }

    if let Some(global) = global_config_path()
        && global.is_file()
        && !configs.contains(&global)
    {
        configs.push(global);
    }
    configs
}

/// Returns the path to the global configuration file (`~/.sift.toml`).
///
/// Returns `None` if the home directory cannot be determined.
pub fn global_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(CONFIG_FILENAME))
}

/// Checks if a path is the global configuration file.
pub fn is_global_config(path: &Path) -> bool {
    global_config_path().is_some_and(|global| path == global)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    /// Writes `.sift.toml` with `content` under `rel` inside `root`, creating directories.
    fn write_config(root: &TempDir, rel: &str, content: &str) -> PathBuf {
        let dir = root.path().join(rel);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILENAME);
        fs::write(&path, content).unwrap();
        path
    }

    /// Creates `rel` inside `root`.
    fn make_dir(root: &TempDir, rel: &str) -> PathBuf {
        let dir = root.path().join(rel);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn local(configs: &[PathBuf]) -> Vec<&PathBuf> {
        configs.iter().filter(|p| !is_global_config(p)).collect()
    }

    #[test]
    fn nothing_found_without_configs() {
        let root = tempfile::tempdir().unwrap();
        let start = make_dir(&root, "search/api/views");
        assert!(local(&discover_config_files(&start)).is_empty());
    }

    #[test]
    fn closest_config_comes_first() {
        let root = tempfile::tempdir().unwrap();
        let outer = write_config(&root, "", "[query]\nlookup_sep = \";\"\n");
        let inner = write_config(&root, "search", "[boost]\nparam = \"weight\"\n");
        let start = make_dir(&root, "search/api");

        let configs = discover_config_files(&start);
        assert_eq!(local(&configs), vec![&inner, &outer]);
    }

    #[test]
    fn root_config_ends_the_walk() {
        let root = tempfile::tempdir().unwrap();
        write_config(&root, "", "");
        let project = write_config(&root, "search", "root = true\n");
        let start = make_dir(&root, "search/api");

        assert_eq!(discover_config_files(&start), vec![project]);
    }

    #[test]
    fn global_path_is_recognized() {
        if let Some(path) = global_config_path() {
            assert!(path.ends_with(CONFIG_FILENAME));
            assert!(is_global_config(&path));
        }
    }
}
