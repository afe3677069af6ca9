//! Document stores
//!
//! [`MemoryDocumentStore`] keeps records in a concurrent map; it backs the
//! tests and embedders that own persistence themselves.
//! [`FsDocumentStore`] keeps one YAML file per document plus a JSON summary
//! used as the derived index; the command-line tool runs on it.

use crate::error::{EditorError, EditorResult};
use crate::services::DocumentStore;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind as IoKind;
use std::path::{Path, PathBuf};
use topo_model::{Document, DocumentId, Fingerprint};

/// Summary stored in the derived index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub archive: String,
    pub elements: Vec<String>,
    pub fingerprint: Fingerprint,
}

impl IndexEntry {
    /// Summarize a document
    ///
    /// # Errors
    /// Returns error if the document cannot be fingerprinted
    pub fn of(document: &Document) -> EditorResult<Self> {
        Ok(Self {
            archive: document.archive().to_string(),
            elements: document.elements.keys().cloned().collect(),
            fingerprint: document.fingerprint()?,
        })
    }
}

/// In-memory [`DocumentStore`]
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: DashMap<DocumentId, Document>,
    index: DashMap<DocumentId, IndexEntry>,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record directly
    pub fn insert(&self, document: Document) {
        self.documents.insert(document.id.clone(), document);
    }

    /// Indexed summary of a document, if indexed
    #[must_use]
    pub fn indexed(&self, id: &DocumentId) -> Option<IndexEntry> {
        self.index.get(id).map(|e| e.value().clone())
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get_or_fail(&self, id: &DocumentId) -> EditorResult<Document> {
        self.documents
            .get(id)
            .map(|d| d.value().clone())
            .ok_or_else(|| EditorError::NotFound(format!("document <{id}>")))
    }

    fn save(&self, document: &Document) -> EditorResult<()> {
        self.insert(document.clone());
        Ok(())
    }

    fn update_derived_index(&self, document: &Document) -> EditorResult<()> {
        self.index.insert(document.id.clone(), IndexEntry::of(document)?);
        Ok(())
    }
}

/// Filesystem [`DocumentStore`]: `<dir>/<id>.yml` and `<dir>/index/<id>.json`
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    dir: PathBuf,
}

impl FsDocumentStore {
    /// Open (creating if needed) a store rooted at `dir`
    ///
    /// # Errors
    /// Returns error if the directories cannot be created
    pub fn open(dir: impl Into<PathBuf>) -> EditorResult<Self> {
        let dir = dir.into();
        let index = dir.join("index");
        std::fs::create_dir_all(&index)
            .map_err(|e| EditorError::io(format!("creating store dir {}", index.display()), e))?;
        Ok(Self { dir })
    }

    fn record_path(&self, id: &DocumentId) -> EditorResult<PathBuf> {
        Ok(self.dir.join(format!("{}.yml", checked_file_stem(id)?)))
    }

    fn index_path(&self, id: &DocumentId) -> EditorResult<PathBuf> {
        Ok(self.dir.join("index").join(format!("{}.json", checked_file_stem(id)?)))
    }
}

/// Reject ids that cannot be used as a single file name
pub(crate) fn checked_file_stem(id: &DocumentId) -> EditorResult<&str> {
    let s = id.as_str();
    let valid = !s.is_empty()
        && s != "."
        && s != ".."
        && s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(s)
    } else {
        Err(EditorError::Validation(format!("invalid document id <{id}>")))
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> EditorResult<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes).map_err(|e| EditorError::io(format!("writing {}", tmp.display()), e))?;
    std::fs::rename(&tmp, path).map_err(|e| EditorError::io(format!("replacing {}", path.display()), e))
}

impl DocumentStore for FsDocumentStore {
    fn get_or_fail(&self, id: &DocumentId) -> EditorResult<Document> {
        let path = self.record_path(id)?;
        let text = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            IoKind::NotFound => EditorError::NotFound(format!("document <{id}>")),
            _ => EditorError::io(format!("reading {}", path.display()), e),
        })?;
        let mut document: Document = serde_yaml::from_str(&text)
            .map_err(|e| EditorError::Serialization(format!("{}: {e}", path.display())))?;
        document.id = id.clone();
        Ok(document)
    }

    fn save(&self, document: &Document) -> EditorResult<()> {
        let text = serde_yaml::to_string(document).map_err(|e| EditorError::Serialization(e.to_string()))?;
        write_atomically(&self.record_path(&document.id)?, text.as_bytes())
    }

    fn update_derived_index(&self, document: &Document) -> EditorResult<()> {
        let entry = IndexEntry::of(document)?;
        let json = serde_json::to_vec_pretty(&entry).map_err(|e| EditorError::Serialization(e.to_string()))?;
        write_atomically(&self.index_path(&document.id)?, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use topo_model::Element;

    fn doc() -> Document {
        let mut doc = Document::new("web-app", "web", "1.0.0-SNAPSHOT");
        doc.elements.insert("A".into(), Element::new("A", "Compute:1.0"));
        doc
    }

    #[test]
    fn memory_store_round_trip_and_missing() {
        let store = MemoryDocumentStore::new();
        assert_eq!(
            store.get_or_fail(&DocumentId::new("web-app")).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        store.save(&doc()).unwrap();
        store.update_derived_index(&doc()).unwrap();
        assert_eq!(store.get_or_fail(&DocumentId::new("web-app")).unwrap(), doc());
        assert_eq!(store.indexed(&DocumentId::new("web-app")).unwrap().elements, vec!["A"]);
    }

    #[test]
    fn fs_store_persists_records_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::open(dir.path()).unwrap();
        store.save(&doc()).unwrap();
        store.update_derived_index(&doc()).unwrap();

        let reopened = FsDocumentStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get_or_fail(&DocumentId::new("web-app")).unwrap(), doc());
        assert!(dir.path().join("index/web-app.json").is_file());
    }

    #[test]
    fn path_like_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::open(dir.path()).unwrap();
        let err = store.get_or_fail(&DocumentId::new("../etc")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
