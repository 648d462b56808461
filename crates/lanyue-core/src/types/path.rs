//! Normalized virtual paths.
//!
//! A [`VirtualPath`] is always absolute. Its first segment names a mount
//! and the remaining segments form the path inside that mount's backend.
//! The root path `/` is the synthetic directory of all mounts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AppError;
use crate::result::AppResult;

/// An absolute, normalized path in the unified namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct VirtualPath {
    segments: Vec<String>,
}

impl VirtualPath {
    /// The synthetic root directory.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse and normalize an absolute path.
    ///
    /// Repeated separators and `.` segments are dropped. Any `..` segment,
    /// backslash or NUL byte is rejected so a path can never climb out of
    /// its mount.
    pub fn parse(raw: &str) -> AppResult<Self> {
        if !raw.starts_with('/') {
            return Err(AppError::validation(format!(
                "Path must be absolute: {raw}"
            )));
        }
        let mut path = Self::root();
        path.push_relative(raw)?;
        Ok(path)
    }

    fn push_relative(&mut self, raw: &str) -> AppResult<()> {
        if raw.contains('\\') || raw.contains('\0') {
            return Err(AppError::validation(format!("Invalid path: {raw}")));
        }
        for segment in raw.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    return Err(AppError::validation(format!(
                        "Path traversal is not allowed: {raw}"
                    )));
                }
                other => self.segments.push(other.to_string()),
            }
        }
        Ok(())
    }

    /// Append one or more relative segments.
    pub fn join(&self, relative: &str) -> AppResult<Self> {
        let mut joined = self.clone();
        joined.push_relative(relative)?;
        Ok(joined)
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Name of the mount this path routes to.
    pub fn mount_name(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    /// Whether this path is the root directory of its mount.
    pub fn is_mount_root(&self) -> bool {
        self.segments.len() == 1
    }

    /// Path inside the mount's backend, without a leading separator.
    /// Empty for the mount root.
    pub fn sub_path(&self) -> String {
        self.segments.get(1..).map(|s| s.join("/")).unwrap_or_default()
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether `self` equals `ancestor` or lies below it.
    pub fn starts_with(&self, ancestor: &VirtualPath) -> bool {
        self.segments.starts_with(&ancestor.segments)
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for VirtualPath {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for VirtualPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VirtualPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_separators_and_dots() {
        let path = VirtualPath::parse("//docs/./a//b.txt/").unwrap();
        assert_eq!(path.to_string(), "/docs/a/b.txt");
        assert_eq!(path.mount_name(), Some("docs"));
        assert_eq!(path.sub_path(), "a/b.txt");
        assert_eq!(path.file_name(), Some("b.txt"));
    }

    #[test]
    fn test_rejects_traversal() {
        assert!(VirtualPath::parse("/docs/../etc").is_err());
        assert!(VirtualPath::parse("/docs/a\\b").is_err());
        assert!(VirtualPath::parse("docs/a").is_err());
        let base = VirtualPath::parse("/docs").unwrap();
        assert!(base.join("x/../../y").is_err());
    }

    #[test]
    fn test_root_and_mount_root() {
        let root = VirtualPath::parse("/").unwrap();
        assert!(root.is_root());
        assert_eq!(root.to_string(), "/");
        assert_eq!(root.parent(), None);
        assert_eq!(root.sub_path(), "");

        let mount = VirtualPath::parse("/docs").unwrap();
        assert!(mount.is_mount_root());
        assert_eq!(mount.sub_path(), "");
        assert_eq!(mount.parent(), Some(root));
    }

    #[test]
    fn test_join_and_starts_with() {
        let base = VirtualPath::parse("/docs/a").unwrap();
        let child = base.join("b/c.txt").unwrap();
        assert_eq!(child.to_string(), "/docs/a/b/c.txt");
        assert!(child.starts_with(&base));
        assert!(!base.starts_with(&child));
    }

    #[test]
    fn test_serde_as_string() {
        let path: VirtualPath = serde_json::from_str("\"/docs//x\"").unwrap();
        assert_eq!(serde_json::to_string(&path).unwrap(), "\"/docs/x\"");
        assert!(serde_json::from_str::<VirtualPath>("\"/../x\"").is_err());
    }
}
