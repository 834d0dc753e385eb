use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// File and directory names
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = "relsync.yaml";
pub const USER_CONFIG_DIR: &str = ".config/relsync";
pub const STORE_FILE: &str = "versions.db";
pub const LINK_DIR: &str = "bin";
pub const NOTES_FILE: &str = "RELEASE_NOTES.md";

/// Leaf key holding the serialized record inside a version bucket.
pub const DATA_KEY: &str = "data";

// ---------------------------------------------------------------------------
// Filesystem layout
// ---------------------------------------------------------------------------

pub fn repo_dir(release_path: &Path, source: &str, org: &str, project: &str) -> PathBuf {
    release_path.join(source).join(org).join(project)
}

pub fn publish_dir(
    release_path: &Path,
    source: &str,
    org: &str,
    project: &str,
    tag: &str,
) -> PathBuf {
    repo_dir(release_path, source, org, project).join(tag)
}

pub fn default_store_path(release_path: &Path) -> PathBuf {
    release_path.join(STORE_FILE)
}

pub fn default_link_dir(release_path: &Path) -> PathBuf {
    release_path.join(LINK_DIR)
}

pub fn user_config_path(home: &Path) -> PathBuf {
    home.join(USER_CONFIG_DIR).join(CONFIG_FILE)
}

// ---------------------------------------------------------------------------
// Store keys
// ---------------------------------------------------------------------------

/// `source/org/project`: the bucket whose children are version buckets.
pub fn repo_key(source: &str, org: &str, project: &str) -> String {
    format!("{source}/{org}/{project}")
}

pub fn version_key(source: &str, org: &str, project: &str, version: &str) -> String {
    format!("{}/{version}", repo_key(source, org, project))
}

pub fn data_key(source: &str, org: &str, project: &str, version: &str) -> String {
    format!("{}/{DATA_KEY}", version_key(source, org, project, version))
}

/// Whether `name` can stand as one path component and one store key segment.
pub fn is_single_segment(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Expand a leading `~` against the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match home::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_keys_follow_bucket_hierarchy() {
        assert_eq!(
            data_key("github.com", "cli", "cli", "v2.0.0"),
            "github.com/cli/cli/v2.0.0/data"
        );
        assert_eq!(
            version_key("gitlab.com", "o", "p", "1.2.3"),
            "gitlab.com/o/p/1.2.3"
        );
    }

    #[test]
    fn publish_dir_is_keyed_by_identity_and_tag() {
        let p = publish_dir(Path::new("/r"), "github.com", "o", "p", "v1");
        assert_eq!(p, PathBuf::from("/r/github.com/o/p/v1"));
    }

    #[test]
    fn single_segment_rejects_separators_and_dot_names() {
        assert!(is_single_segment("v1.0.0"));
        assert!(is_single_segment("cli-v1.0.0"));
        assert!(!is_single_segment("cli/v1.0.0"));
        assert!(!is_single_segment("cli\\v1.0.0"));
        assert!(!is_single_segment(".."));
        assert!(!is_single_segment("."));
        assert!(!is_single_segment(""));
    }

    #[test]
    fn expand_home_leaves_plain_paths_alone() {
        assert_eq!(expand_home(Path::new("/opt/x")), PathBuf::from("/opt/x"));
    }
}
