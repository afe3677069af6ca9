//! Archive paths
//!
//! Provides [`ArchivePath`], the logical `/`-separated location of a file
//! inside a document archive (for example `scripts/install.sh`).

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

/// Path of a file within an archive
///
/// Always relative, always names a file: a trailing `/` is rejected, as are
/// empty, `.` and `..` segments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArchivePath(Vec<String>);

impl ArchivePath {
    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Archive paths always have at least one segment
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// File name (last segment)
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.last().map_or("", String::as_str)
    }

    /// Parent directory segments
    #[inline]
    #[must_use]
    pub fn parent_segments(&self) -> &[String] {
        &self.0[..self.0.len().saturating_sub(1)]
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Relative filesystem path for this archive path
    #[must_use]
    pub fn to_relative_path(&self) -> PathBuf {
        self.0.iter().collect()
    }
}

impl Display for ArchivePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl FromStr for ArchivePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }
        if s.ends_with('/') {
            return Err(PathError::DirectoryPath(s.to_string()));
        }
        if s.starts_with('/') {
            return Err(PathError::Absolute(s.to_string()));
        }

        let mut segments = Vec::new();
        for segment in s.split('/') {
            match segment {
                "" => return Err(PathError::EmptySegment(s.to_string())),
                "." | ".." => return Err(PathError::InvalidSegment(segment.to_string())),
                _ if segment.contains('\\') || segment.contains('\0') => {
                    return Err(PathError::InvalidSegment(segment.to_string()))
                }
                _ => segments.push(segment.to_string()),
            }
        }
        Ok(Self(segments))
    }
}

impl TryFrom<String> for ArchivePath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ArchivePath> for String {
    fn from(value: ArchivePath) -> Self {
        value.to_string()
    }
}

/// Archive path errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty path string
    #[error("path is empty")]
    Empty,

    /// Path names a directory rather than a file
    #[error("path <{0}> is invalid (must be a file and not a directory)")]
    DirectoryPath(String),

    /// Path is absolute
    #[error("path <{0}> is invalid (must be relative to the archive root)")]
    Absolute(String),

    /// Two consecutive separators
    #[error("path <{0}> contains an empty segment")]
    EmptySegment(String),

    /// Segment that would escape the archive or is otherwise unusable
    #[error("invalid path segment: '{0}'")]
    InvalidSegment(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_nested_file() {
        let path: ArchivePath = "scripts/install.sh".parse().unwrap();
        assert_eq!(path.segments(), &["scripts", "install.sh"]);
        assert_eq!(path.file_name(), "install.sh");
        assert_eq!(path.parent_segments(), &["scripts"]);
        assert_eq!(path.to_string(), "scripts/install.sh");
    }

    #[test]
    fn rejects_directory_like_path() {
        let result: Result<ArchivePath, _> = "scripts/".parse();
        assert!(matches!(result, Err(PathError::DirectoryPath(_))));
    }

    #[test]
    fn rejects_escaping_segments() {
        assert!(matches!(
            "../etc/passwd".parse::<ArchivePath>(),
            Err(PathError::InvalidSegment(_))
        ));
        assert!(matches!(
            "/etc/passwd".parse::<ArchivePath>(),
            Err(PathError::Absolute(_))
        ));
        assert!(matches!(
            "a//b".parse::<ArchivePath>(),
            Err(PathError::EmptySegment(_))
        ));
        assert!(matches!("".parse::<ArchivePath>(), Err(PathError::Empty)));
    }

    #[test]
    fn relative_path_joins_segments() {
        let path: ArchivePath = "a/b/c.txt".parse().unwrap();
        assert_eq!(path.to_relative_path(), PathBuf::from("a").join("b").join("c.txt"));
    }

    #[test]
    fn serde_uses_string_form() {
        let path: ArchivePath = "a/b.txt".parse().unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"a/b.txt\"");
        assert!(serde_json::from_str::<ArchivePath>("\"a/\"").is_err());
    }

    proptest! {
        #[test]
        fn display_roundtrips(segments in proptest::collection::vec("[a-zA-Z0-9_-]{1,8}(\\.[a-z]{1,3})?", 1..5)) {
            let raw = segments.join("/");
            let path: ArchivePath = raw.parse().unwrap();
            prop_assert_eq!(path.to_string(), raw);
            prop_assert_eq!(path.len(), segments.len());
        }
    }
}
