use relsync_core::paths::{user_config_path, CONFIG_FILE};
use std::path::{Path, PathBuf};

/// Resolve the config file.
///
/// Priority:
/// 1. `--config` flag / `RELSYNC_CONFIG` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `relsync.yaml`
/// 3. `~/.config/relsync/relsync.yaml`
///
/// The result may not exist; a missing file means an empty config.
pub fn resolve_config(explicit: Option<&Path>) -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve_config_from(explicit, &cwd, home::home_dir().as_deref())
}

fn resolve_config_from(explicit: Option<&Path>, cwd: &Path, home: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let mut dir = cwd.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            return candidate;
        }
        match dir.parent() {
            Some(p) => dir = p.to_path_buf(),
            None => break,
        }
    }

    match home {
        Some(home) => user_config_path(home),
        None => cwd.join(CONFIG_FILE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_config_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("other.yaml");
        assert_eq!(resolve_config_from(Some(&path), dir.path(), None), path);
    }

    #[test]
    fn finds_config_in_parent_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "repos: []\n").unwrap();
        let subdir = dir.path().join("src/deep");
        std::fs::create_dir_all(&subdir).unwrap();

        let result = resolve_config_from(None, &subdir, None);
        assert_eq!(result, dir.path().join(CONFIG_FILE));
    }

    #[test]
    fn falls_back_to_user_config() {
        let dir = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        let result = resolve_config_from(None, dir.path(), Some(home.path()));
        assert_eq!(result, home.path().join(".config/relsync/relsync.yaml"));
    }
}
