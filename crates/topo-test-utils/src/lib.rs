//! Testing utilities for the topology editor workspace
//!
//! Recording collaborators, a small type catalog and a fully wired
//! [`TestEditor`].

#![allow(missing_docs)]

use chrono::Utc;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use topo_editor::{
    ConstraintValueService, EditorConfig, EditorError, EditorResult, EditorService, EditorServices,
    FileUpload, HistoryEntry, InMemoryTypeCatalog, LocalArtifactStore, MemoryDocumentStore, Operation,
    OperationPayload, Principal, RoleAuthorizer, Snapshot, VersionControl, WorkflowHook, YamlDocumentCodec,
    EDITOR_ROLE,
};
use topo_model::{
    Constraint, Dependency, Document, DocumentId, Element, PropertyDefinition, PropertyValue, TypeDescriptor,
    ValueType,
};

pub const DOC_ID: &str = "doc-1";
pub const COMPUTE: &str = "Compute:1.0";
pub const HOSTED_ON: &str = "HostedOn:1.0";
pub const DATABASE: &str = "Database:2.0";

/// A commit made through [`RecordingVersionControl`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub document: DocumentId,
    pub author: String,
    pub message: String,
}

/// Version control that keeps working trees in a temp dir and records
/// commits in memory
#[derive(Debug)]
pub struct RecordingVersionControl {
    root: TempDir,
    commits: Mutex<Vec<CommitRecord>>,
    fail_next_commit: AtomicBool,
}

impl RecordingVersionControl {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
            commits: Mutex::new(Vec::new()),
            fail_next_commit: AtomicBool::new(false),
        }
    }

    pub fn working_dir(&self, id: &DocumentId) -> PathBuf {
        self.root.path().join(id.as_str())
    }

    pub fn commits(&self) -> Vec<CommitRecord> {
        self.commits.lock().clone()
    }

    /// Make the next commit fail with a repository error
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

impl Default for RecordingVersionControl {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionControl for RecordingVersionControl {
    fn init_working_tree(&self, id: &DocumentId) -> EditorResult<PathBuf> {
        let dir = self.working_dir(id);
        std::fs::create_dir_all(&dir).map_err(|e| EditorError::io("creating working tree", e))?;
        Ok(dir)
    }

    fn commit(&self, id: &DocumentId, author: &str, message: &str) -> EditorResult<()> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(EditorError::Repository("injected commit failure".into()));
        }
        self.commits.lock().push(CommitRecord {
            document: id.clone(),
            author: author.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }

    fn history(&self, id: &DocumentId, from: usize, count: usize) -> EditorResult<Vec<HistoryEntry>> {
        let commits = self.commits.lock();
        Ok(commits
            .iter()
            .enumerate()
            .filter(|(_, c)| &c.document == id)
            .rev()
            .skip(from)
            .take(count)
            .map(|(n, c)| HistoryEntry {
                commit_id: format!("{n:040x}"),
                author: c.author.clone(),
                message: c.message.clone(),
                timestamp: Utc::now(),
            })
            .collect())
    }
}

/// Workflow event seen by [`RecordingWorkflow`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    Added(String),
    Removed(String),
}

#[derive(Debug, Default)]
pub struct RecordingWorkflow {
    events: Mutex<Vec<WorkflowEvent>>,
    delay: Mutex<Duration>,
}

impl RecordingWorkflow {
    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events.lock().clone()
    }

    /// Sleep for `delay` in every callback from now on
    pub fn slow_down(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    fn pause(&self) {
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

impl WorkflowHook for RecordingWorkflow {
    fn on_element_added(&self, _document: &DocumentId, element: &Element) {
        self.pause();
        self.events.lock().push(WorkflowEvent::Added(element.name.clone()));
    }

    fn on_element_removed(&self, _document: &DocumentId, element: &Element) {
        self.pause();
        self.events.lock().push(WorkflowEvent::Removed(element.name.clone()));
    }
}

pub fn base_types() -> Dependency {
    Dependency::new("base-types", "1.0")
}

pub fn db_types() -> Dependency {
    Dependency::new("db-types", "2.0")
}

/// Compute node: `cpus` in 1..=64, default 1; exposes `host`
pub fn compute_type() -> TypeDescriptor {
    TypeDescriptor::element(COMPUTE, base_types())
        .with_property(
            "cpus",
            PropertyDefinition::new(ValueType::Integer)
                .with_default(1_i64)
                .with_constraint(Constraint::InRange(1.0, 64.0)),
        )
        .with_property("label", PropertyDefinition::new(ValueType::String))
        .with_capability("host")
}

/// Relation to a `host` capability: `port` >= 1, default 8080
pub fn hosted_on_type() -> TypeDescriptor {
    TypeDescriptor::relation(HOSTED_ON, base_types()).with_property(
        "port",
        PropertyDefinition::new(ValueType::Integer)
            .with_default(8080_i64)
            .with_constraint(Constraint::GreaterOrEqual(1.0)),
    )
}

/// Database from a second archive: `engine` is `postgres` or `mysql`
pub fn database_type() -> TypeDescriptor {
    TypeDescriptor::element(DATABASE, db_types()).with_property(
        "engine",
        PropertyDefinition::new(ValueType::String)
            .with_default("postgres")
            .with_constraint(Constraint::ValidValues(vec!["postgres".into(), "mysql".into()])),
    )
}

pub fn catalog() -> InMemoryTypeCatalog {
    InMemoryTypeCatalog::with_types([compute_type(), hosted_on_type(), database_type()])
}

pub fn snapshot_document(id: &str) -> Document {
    Document::new(id, "web", "1.0.0-SNAPSHOT")
}

pub fn editor_principal() -> Principal {
    Principal::new("alice").with_role(EDITOR_ROLE)
}

pub fn add_element(name: &str, type_id: &str) -> OperationPayload {
    OperationPayload::AddElement {
        name: name.into(),
        type_id: type_id.into(),
    }
}

pub fn remove_element(name: &str) -> OperationPayload {
    OperationPayload::RemoveElement { name: name.into() }
}

pub fn hosted_on(element: &str, name: &str, target: &str) -> OperationPayload {
    OperationPayload::AddRelation {
        element: element.into(),
        name: name.into(),
        type_id: HOSTED_ON.into(),
        target: target.into(),
        capability: "host".into(),
    }
}

pub fn set_property(element: &str, property: &str, value: impl Into<PropertyValue>) -> OperationPayload {
    OperationPayload::UpdateElementProperty {
        element: element.into(),
        property: property.into(),
        value: value.into(),
    }
}

pub fn upload_file(path: &str, content: &str) -> OperationPayload {
    OperationPayload::UpdateFile {
        path: path.into(),
        upload: FileUpload::new(content),
    }
}

/// An [`EditorService`] over in-memory and temp-dir collaborators, with
/// [`DOC_ID`] stored as an empty snapshot document
pub struct TestEditor {
    pub editor: EditorService,
    pub store: Arc<MemoryDocumentStore>,
    pub catalog: Arc<InMemoryTypeCatalog>,
    pub version_control: Arc<RecordingVersionControl>,
    pub workflow: Arc<RecordingWorkflow>,
    pub artifacts: Arc<LocalArtifactStore>,
    pub principal: Principal,
    _artifact_dir: TempDir,
}

impl TestEditor {
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default())
    }

    pub fn with_config(config: EditorConfig) -> Self {
        let artifact_dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryDocumentStore::new());
        store.insert(snapshot_document(DOC_ID));
        let catalog = Arc::new(catalog());
        let version_control = Arc::new(RecordingVersionControl::new());
        let workflow = Arc::new(RecordingWorkflow::default());
        let artifacts = Arc::new(LocalArtifactStore::open(artifact_dir.path()).unwrap());

        let services = EditorServices {
            documents: store.clone(),
            codec: Arc::new(YamlDocumentCodec),
            authorizer: Arc::new(RoleAuthorizer::default()),
            values: Arc::new(ConstraintValueService),
            catalog: catalog.clone(),
            workflow: workflow.clone(),
            version_control: version_control.clone(),
            artifacts: artifacts.clone(),
        };
        Self {
            editor: EditorService::new(config, services).unwrap(),
            store,
            catalog,
            version_control,
            workflow,
            artifacts,
            principal: editor_principal(),
            _artifact_dir: artifact_dir,
        }
    }

    pub fn doc_id(&self) -> DocumentId {
        DocumentId::new(DOC_ID)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.editor.snapshot(&self.doc_id()).unwrap()
    }

    /// Execute `payload` on top of the current tip
    pub fn exec(&self, payload: OperationPayload) -> EditorResult<Snapshot> {
        let last = self.editor.snapshot(&self.doc_id())?.last_operation_id;
        self.editor
            .execute(&self.principal, &self.doc_id(), Operation::new(payload).after(last))
    }

    pub fn undo_redo(&self, index: isize) -> EditorResult<Snapshot> {
        let last = self.editor.snapshot(&self.doc_id())?.last_operation_id;
        self.editor
            .undo_redo(&self.principal, &self.doc_id(), index, last.as_ref())
    }

    pub fn save(&self) -> EditorResult<Snapshot> {
        let last = self.editor.snapshot(&self.doc_id())?.last_operation_id;
        self.editor.save(&self.principal, &self.doc_id(), last.as_ref())
    }

    /// Number of artifacts currently staged
    pub fn staged_artifact_count(&self) -> usize {
        std::fs::read_dir(self.artifacts.dir()).map_or(0, Iterator::count)
    }
}

impl Default for TestEditor {
    fn default() -> Self {
        Self::new()
    }
}
