//! Git-backed working trees
//!
//! One repository per document under the configured root. Everything goes
//! through the `git` binary.

use crate::config::CommitIdentity;
use crate::error::{EditorError, EditorResult};
use crate::services::{HistoryEntry, VersionControl};
use crate::store::checked_file_stem;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use topo_model::DocumentId;

const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';

/// [`VersionControl`] over per-document git repositories
#[derive(Debug, Clone)]
pub struct GitWorkingTree {
    root: PathBuf,
    identity: CommitIdentity,
}

impl GitWorkingTree {
    /// Repositories live below `root`; commits use `identity`'s email
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, identity: CommitIdentity) -> Self {
        Self {
            root: root.into(),
            identity,
        }
    }

    /// Working directory of a document
    ///
    /// # Errors
    /// Returns `Validation` for ids that are not a plain file name
    pub fn working_dir(&self, id: &DocumentId) -> EditorResult<PathBuf> {
        Ok(self.root.join(checked_file_stem(id)?))
    }

    fn git(&self, dir: &Path, args: &[&str]) -> EditorResult<Output> {
        let output = Command::new("git")
            .arg("-C")
            .arg(dir)
            .arg("-c")
            .arg(format!("user.name={}", self.identity.name))
            .arg("-c")
            .arg(format!("user.email={}", self.identity.email))
            .args(args)
            .output()
            .map_err(|e| EditorError::Repository(format!("failed to run git {}: {e}", args[0])))?;
        Ok(output)
    }

    fn git_ok(&self, dir: &Path, args: &[&str]) -> EditorResult<Output> {
        let output = self.git(dir, args)?;
        if !output.status.success() {
            return Err(EditorError::Repository(format!(
                "git {} failed: {}",
                args[0],
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output)
    }
}

impl VersionControl for GitWorkingTree {
    fn init_working_tree(&self, id: &DocumentId) -> EditorResult<PathBuf> {
        let dir = self.working_dir(id)?;
        if !dir.join(".git").exists() {
            std::fs::create_dir_all(&dir)
                .map_err(|e| EditorError::io(format!("creating {}", dir.display()), e))?;
            self.git_ok(&dir, &["init", "--quiet"])?;
            tracing::info!(document = %id, dir = %dir.display(), "repository initialized");
        }
        Ok(dir)
    }

    fn commit(&self, id: &DocumentId, author: &str, message: &str) -> EditorResult<()> {
        let dir = self.working_dir(id)?;
        self.git_ok(&dir, &["add", "--all"])?;
        let author = format!("{author} <{}>", self.identity.email);
        self.git_ok(
            &dir,
            &["commit", "--quiet", "--allow-empty", "--author", &author, "-m", message],
        )?;
        tracing::info!(document = %id, "changes committed");
        Ok(())
    }

    fn history(&self, id: &DocumentId, from: usize, count: usize) -> EditorResult<Vec<HistoryEntry>> {
        let dir = self.working_dir(id)?;
        if !dir.join(".git").exists() || count == 0 {
            return Ok(Vec::new());
        }
        let skip = format!("--skip={from}");
        let max = format!("--max-count={count}");
        let format = format!("--format=%H{FIELD_SEP}%an{FIELD_SEP}%aI{FIELD_SEP}%B{RECORD_SEP}");
        let output = self.git(&dir, &["log", &skip, &max, &format])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // a fresh repository has no HEAD yet
            if stderr.contains("does not have any commits") {
                return Ok(Vec::new());
            }
            return Err(EditorError::Repository(format!("git log failed: {}", stderr.trim())));
        }
        parse_log(&String::from_utf8_lossy(&output.stdout))
    }
}

fn parse_log(raw: &str) -> EditorResult<Vec<HistoryEntry>> {
    raw.split(RECORD_SEP)
        .map(str::trim)
        .filter(|record| !record.is_empty())
        .map(|record| {
            let mut fields = record.splitn(4, FIELD_SEP);
            let mut next = || {
                fields
                    .next()
                    .ok_or_else(|| EditorError::Repository(format!("malformed log record: {record}")))
            };
            let commit_id = next()?.to_string();
            let author = next()?.to_string();
            let timestamp = DateTime::parse_from_rfc3339(next()?)
                .map_err(|e| EditorError::Repository(format!("bad commit date: {e}")))?
                .with_timezone(&Utc);
            let message = next()?.trim_end().to_string();
            Ok(HistoryEntry {
                commit_id,
                author,
                message,
                timestamp,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git_available() -> bool {
        Command::new("git").arg("--version").output().is_ok_and(|o| o.status.success())
    }

    #[test]
    fn parses_log_records() {
        let raw = format!(
            "abc{FIELD_SEP}alice{FIELD_SEP}2024-05-01T10:00:00+02:00{FIELD_SEP}alice: add element <A>\nalice: add element <B>\n{RECORD_SEP}\n"
        );
        let entries = parse_log(&raw).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].commit_id, "abc");
        assert_eq!(entries[0].message.lines().count(), 2);
        assert_eq!(entries[0].timestamp.to_rfc3339(), "2024-05-01T08:00:00+00:00");
    }

    #[test]
    fn commits_show_up_newest_first() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let vcs = GitWorkingTree::new(dir.path(), CommitIdentity::default());
        let id = DocumentId::new("doc-1");
        let wd = vcs.init_working_tree(&id).unwrap();
        assert!(vcs.history(&id, 0, 10).unwrap().is_empty());

        std::fs::write(wd.join("a.txt"), b"1").unwrap();
        vcs.commit(&id, "alice", "alice: first").unwrap();
        std::fs::write(wd.join("a.txt"), b"2").unwrap();
        vcs.commit(&id, "bob", "bob: second").unwrap();

        let history = vcs.history(&id, 0, 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].author, "bob");
        assert_eq!(history[1].message, "alice: first");
        assert_eq!(vcs.history(&id, 1, 10).unwrap().len(), 1);
    }
}
