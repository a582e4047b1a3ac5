//! Remote path handling
//!
//! Destination paths arrive from the command line in whatever form the user
//! typed them, possibly with Windows separators. Every server we talk to
//! expects `/`-separated paths, so everything is normalized here before a
//! backend sees it.

use std::path::Path;

use crate::protocol::UploadError;

/// Replace every `\` with `/`
pub fn to_slash(path: &str) -> String {
    path.replace('\\', "/")
}

/// Lexically clean a `/`-separated path.
///
/// Repeated separators collapse, `.` elements vanish and `..` eats the
/// element before it. A `..` directly under the root is dropped; leading `..`
/// elements of a relative path are kept. An empty result becomes `.`.
pub fn clean(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for element in path.split('/') {
        match element {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Join a directory and a name with `/`, then clean the result
pub fn join(dir: &str, name: &str) -> String {
    match (dir.is_empty(), name.is_empty()) {
        (true, true) => String::new(),
        (true, false) => clean(name),
        (false, true) => clean(dir),
        (false, false) => clean(&format!("{}/{}", dir, name)),
    }
}

/// Every directory that must exist for `dir` to exist, shortest first.
///
/// `/a/b` yields `["/a", "/a/b"]`. The root and `.` yield nothing.
pub fn ancestors(dir: &str) -> Vec<String> {
    let cleaned = clean(dir);
    if cleaned == "." || cleaned == "/" {
        return Vec::new();
    }

    let rooted = cleaned.starts_with('/');
    let mut current = if rooted { String::from("/") } else { String::new() };
    let mut out = Vec::new();

    for element in cleaned.split('/').filter(|e| !e.is_empty()) {
        if !current.is_empty() && !current.ends_with('/') {
            current.push('/');
        }
        current.push_str(element);
        out.push(current.clone());
    }
    out
}

/// Where an upload lands on the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    /// Destination directory exactly as given, with `/` separators
    pub requested_dir: String,
    /// Cleaned destination directory
    pub dir: String,
    /// Base name of the local file
    pub file_name: String,
    /// `dir` joined with `file_name`
    pub full_path: String,
}

impl RemoteTarget {
    /// Build the remote target for uploading `local_path` into `dest`
    pub fn resolve(dest: &str, local_path: &Path) -> Result<Self, UploadError> {
        let file_name = local_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| UploadError::LocalIsDirectory(local_path.to_path_buf()))?;

        let requested_dir = to_slash(dest);
        let dir = if requested_dir.is_empty() {
            ".".to_string()
        } else {
            clean(&requested_dir)
        };
        let full_path = join(&requested_dir, &file_name);

        Ok(Self {
            requested_dir,
            dir,
            file_name,
            full_path,
        })
    }

    /// True when there is no directory to create or enter
    pub fn is_current_dir(&self) -> bool {
        self.dir == "."
    }
}

/// A destination split into an SMB share and a path inside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmbLocation {
    pub share: String,
    /// Path inside the share, `.` for the share root
    pub relative: String,
}

impl SmbLocation {
    /// Split `share/sub/dir` (leading separators ignored) into its parts
    pub fn split(dest: &str) -> Result<Self, UploadError> {
        let slashed = to_slash(dest);
        let trimmed = slashed.trim_start_matches('/');
        if trimmed.is_empty() {
            return Err(UploadError::InvalidDestination(dest.to_string()));
        }

        let (share, rest) = match trimmed.split_once('/') {
            Some((share, rest)) => (share, rest),
            None => (trimmed, ""),
        };

        let relative = clean(rest.trim_start_matches('/'));
        let relative = relative.trim_start_matches('/');
        let relative = if relative.is_empty() { "." } else { relative };

        Ok(Self {
            share: share.to_string(),
            relative: relative.to_string(),
        })
    }

    /// Path of `file_name` inside the share
    pub fn file_path(&self, file_name: &str) -> String {
        join(&self.relative, file_name)
    }

    pub fn is_share_root(&self) -> bool {
        self.relative == "."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_slash() {
        assert_eq!(to_slash(r"\ThreatHunting\daily"), "/ThreatHunting/daily");
        assert_eq!(to_slash("/already/fine"), "/already/fine");
    }

    #[test]
    fn test_clean() {
        assert_eq!(clean(""), ".");
        assert_eq!(clean("/"), "/");
        assert_eq!(clean("//a//b/"), "/a/b");
        assert_eq!(clean("a/./b/../c"), "a/c");
        assert_eq!(clean("/../a"), "/a");
        assert_eq!(clean("../../a"), "../../a");
        assert_eq!(clean("a/.."), ".");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/ThreatHunting", "myfile.txt"), "/ThreatHunting/myfile.txt");
        assert_eq!(join("/ThreatHunting/", "myfile.txt"), "/ThreatHunting/myfile.txt");
        assert_eq!(join("", "myfile.txt"), "myfile.txt");
        assert_eq!(join("/", "myfile.txt"), "/myfile.txt");
        assert_eq!(join(".", "myfile.txt"), "myfile.txt");
    }

    #[test]
    fn test_ancestors() {
        assert_eq!(ancestors("/a/b/c"), vec!["/a", "/a/b", "/a/b/c"]);
        assert_eq!(ancestors("a/b"), vec!["a", "a/b"]);
        assert!(ancestors("/").is_empty());
        assert!(ancestors(".").is_empty());
        assert!(ancestors("").is_empty());
    }

    #[test]
    fn test_resolve_target() {
        let target =
            RemoteTarget::resolve(r"\ThreatHunting\", Path::new("./data/myfile.txt")).unwrap();
        assert_eq!(target.requested_dir, "/ThreatHunting/");
        assert_eq!(target.dir, "/ThreatHunting");
        assert_eq!(target.file_name, "myfile.txt");
        assert_eq!(target.full_path, "/ThreatHunting/myfile.txt");
        assert!(!target.is_current_dir());
    }

    #[test]
    fn test_resolve_target_empty_dest() {
        let target = RemoteTarget::resolve("", Path::new("report.csv")).unwrap();
        assert!(target.is_current_dir());
        assert_eq!(target.full_path, "report.csv");
    }

    #[test]
    fn test_resolve_target_without_file_name() {
        assert!(matches!(
            RemoteTarget::resolve("/dest", Path::new("/")),
            Err(UploadError::LocalIsDirectory(_))
        ));
    }

    #[test]
    fn test_smb_split() {
        let loc = SmbLocation::split("/public/reports/2024").unwrap();
        assert_eq!(loc.share, "public");
        assert_eq!(loc.relative, "reports/2024");
        assert_eq!(loc.file_path("a.txt"), "reports/2024/a.txt");

        let loc = SmbLocation::split(r"\\public\").unwrap();
        assert_eq!(loc.share, "public");
        assert!(loc.is_share_root());
        assert_eq!(loc.file_path("a.txt"), "a.txt");
    }

    #[test]
    fn test_smb_split_empty() {
        for dest in ["", "/", r"\\", "//"] {
            let err = SmbLocation::split(dest).unwrap_err();
            assert!(err.to_string().starts_with("destination path is empty or invalid"));
        }
    }
}
