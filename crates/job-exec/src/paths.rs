//! Translation between canonical remote paths (under `working_dir`) and
//! their mirror under the local mount (`shared_dir`).
//!
//! Everything here is lexical and never touches the filesystem.

use std::path::{Component, Path, PathBuf};

use protocol::config::ExecMethod;

use crate::profile::ServerProfile;

/// Mirror path for `remote_path`, or `None` when the profile has no mirror
/// (plain scp mode).
pub fn mounted_path(profile: &ServerProfile, remote_path: impl AsRef<Path>) -> Option<PathBuf> {
    let remote_path = remote_path.as_ref();
    match profile.method {
        ExecMethod::Ssh if profile.use_shared_dir => {
            let sub_dir = relative(&profile.working_dir, remote_path);
            Some(normalize(profile.shared_dir.join(sub_dir)))
        }
        ExecMethod::Local => Some(normalize(remote_path)),
        ExecMethod::Ssh => None,
    }
}

/// Canonical remote path for a mirror (or local) path.
pub fn original_path(profile: &ServerProfile, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if profile.use_shared_dir {
        let sub_dir = relative(&profile.shared_dir, path);
        normalize(profile.working_dir.join(sub_dir))
    } else {
        normalize(path)
    }
}

/// Whether `path` lies under `root`, compared component-wise.
pub fn is_within(path: impl AsRef<Path>, root: impl AsRef<Path>) -> bool {
    let root = root.as_ref();
    if root.as_os_str().is_empty() {
        return false;
    }
    normalize(path).starts_with(normalize(root))
}

/// Lexical normalisation: drops `.`, folds `..` into its parent and strips
/// trailing separators. An empty result becomes `.`.
pub fn normalize(path: impl AsRef<Path>) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// Path leading from `from` to `to`. Empty when both are the same.
pub fn relative(from: impl AsRef<Path>, to: impl AsRef<Path>) -> PathBuf {
    let from = normalize(from);
    let to = normalize(to);
    let from_parts: Vec<Component<'_>> = from.components().filter(is_significant).collect();
    let to_parts: Vec<Component<'_>> = to.components().filter(is_significant).collect();
    let common = from_parts
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count();
    let mut out = PathBuf::new();
    for _ in &from_parts[common..] {
        out.push("..");
    }
    for part in &to_parts[common..] {
        out.push(part.as_os_str());
    }
    out
}

fn is_significant(component: &Component<'_>) -> bool {
    !matches!(component, Component::CurDir)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_utils::{local_profile, scp_profile, shared_profile};

    #[test]
    fn normalize_folds_dots() {
        assert_eq!(normalize("/tmp/./a/../b/"), PathBuf::from("/tmp/b"));
        assert_eq!(normalize("/.."), PathBuf::from("/"));
        assert_eq!(normalize("a/../../b"), PathBuf::from("../b"));
        assert_eq!(normalize(""), PathBuf::from("."));
    }

    #[test]
    fn relative_walks_up_and_down() {
        assert_eq!(relative("/tmp", "/tmp/job/file"), PathBuf::from("job/file"));
        assert_eq!(relative("/tmp/a", "/tmp/b/c"), PathBuf::from("../b/c"));
        assert_eq!(relative("/tmp", "/tmp"), PathBuf::new());
    }

    #[test]
    fn shared_profile_maps_into_mount() {
        let profile = shared_profile();
        assert_eq!(
            mounted_path(&profile, "/tmp/job-1/input.dat"),
            Some(PathBuf::from("/localMount/job-1/input.dat"))
        );
        assert_eq!(
            original_path(&profile, "/localMount/job-1/input.dat"),
            PathBuf::from("/tmp/job-1/input.dat")
        );
        assert_eq!(mounted_path(&profile, "/tmp"), Some(PathBuf::from("/localMount")));
    }

    #[test]
    fn local_profile_only_normalizes() {
        let profile = local_profile();
        assert_eq!(
            mounted_path(&profile, "/data//job/./x"),
            Some(PathBuf::from("/data/job/x"))
        );
        assert_eq!(original_path(&profile, "/data/job/../y"), PathBuf::from("/data/y"));
    }

    #[test]
    fn scp_profile_has_no_mirror() {
        let profile = scp_profile();
        assert_eq!(mounted_path(&profile, "/tmp/job"), None);
        assert_eq!(original_path(&profile, "/tmp/job/"), PathBuf::from("/tmp/job"));
    }

    #[test]
    fn within_compares_components() {
        assert!(is_within("/localMount/job", "/localMount"));
        assert!(is_within("/localMount", "/localMount/"));
        assert!(!is_within("/localMount2/job", "/localMount"));
        assert!(!is_within("/anything", ""));
    }
}
