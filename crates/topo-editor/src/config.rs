//! Editor configuration

use crate::error::{EditorError, EditorResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Identity recorded as the author of version-control commits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
}

impl Default for CommitIdentity {
    fn default() -> Self {
        Self {
            name: "topo-editor".to_string(),
            email: "topo-editor@localhost".to_string(),
        }
    }
}

/// Edition engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Directory holding one working tree (and repository) per document
    pub repository_root: PathBuf,
    /// Directory of the temporary artifact store
    pub artifact_dir: PathBuf,
    /// Idle time after which an edition context is evicted
    pub context_idle_timeout_ms: u64,
    /// Maximum number of cached edition contexts
    pub max_contexts: u64,
    /// Name of the canonical document file inside a working tree
    pub canonical_file_name: String,
    /// Fallback author for commits
    pub commit_identity: CommitIdentity,
    /// Upper bound for a history page
    pub max_history_page: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            repository_root: PathBuf::from("work/editor"),
            artifact_dir: PathBuf::from("work/tmp"),
            context_idle_timeout_ms: 60 * 60 * 1_000,
            max_contexts: 1_000,
            canonical_file_name: "topology.yml".to_string(),
            commit_identity: CommitIdentity::default(),
            max_history_page: 100,
        }
    }
}

impl EditorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With working tree root
    #[inline]
    #[must_use]
    pub fn with_repository_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.repository_root = root.into();
        self
    }

    /// With temporary artifact directory
    #[inline]
    #[must_use]
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    /// With context idle timeout
    #[inline]
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.context_idle_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With maximum number of cached contexts
    #[inline]
    #[must_use]
    pub fn with_max_contexts(mut self, max: u64) -> Self {
        self.max_contexts = max;
        self
    }

    /// With canonical document file name
    #[inline]
    #[must_use]
    pub fn with_canonical_file_name(mut self, name: impl Into<String>) -> Self {
        self.canonical_file_name = name.into();
        self
    }

    /// With commit identity
    #[inline]
    #[must_use]
    pub fn with_commit_identity(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.commit_identity = CommitIdentity {
            name: name.into(),
            email: email.into(),
        };
        self
    }

    /// Idle timeout as a duration
    #[inline]
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.context_idle_timeout_ms)
    }

    /// Parse configuration from TOML; missing keys keep their defaults
    ///
    /// # Errors
    /// Returns [`EditorError::Validation`] on malformed TOML
    pub fn from_toml_str(input: &str) -> EditorResult<Self> {
        toml::from_str(input).map_err(|e| EditorError::Validation(format!("invalid configuration: {e}")))
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> EditorResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EditorError::io(format!("reading {}", path.display()), e))?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = EditorConfig::default();
        assert_eq!(config.idle_timeout(), Duration::from_secs(3600));
        assert_eq!(config.canonical_file_name, "topology.yml");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EditorConfig::from_toml_str(
            "repository_root = \"/srv/topologies\"\nmax_contexts = 5\n\n[commit_identity]\nname = \"ops\"\nemail = \"ops@example.com\"\n",
        )
        .unwrap();
        assert_eq!(config.repository_root, PathBuf::from("/srv/topologies"));
        assert_eq!(config.max_contexts, 5);
        assert_eq!(config.commit_identity.name, "ops");
        assert_eq!(config.canonical_file_name, "topology.yml");
    }

    #[test]
    fn malformed_toml_is_a_validation_error() {
        let err = EditorConfig::from_toml_str("max_contexts = \"many\"").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }

    #[test]
    fn sub_second_idle_timeout_is_kept() {
        let config = EditorConfig::default().with_idle_timeout(Duration::from_millis(900));
        assert_eq!(config.idle_timeout(), Duration::from_millis(900));
        let config = EditorConfig::default().with_idle_timeout(Duration::from_millis(1_500));
        assert_eq!(config.idle_timeout(), Duration::from_millis(1_500));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.toml");
        std::fs::write(&path, "context_idle_timeout_ms = 10000\n").unwrap();
        let config = EditorConfig::load(&path).unwrap();
        assert_eq!(config.idle_timeout(), Duration::from_secs(10));
    }
}
