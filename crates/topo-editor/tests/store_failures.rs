//! Save rollback when the document store fails part-way

use mockall::{mock, Sequence};
use parking_lot::Mutex;
use std::sync::Arc;
use topo_editor::{
    ConstraintValueService, DocumentStore, EditorConfig, EditorError, EditorResult, EditorService, EditorServices,
    ErrorKind, LocalArtifactStore, LoggingWorkflow, Operation, RoleAuthorizer, YamlDocumentCodec,
};
use topo_model::{Document, DocumentId};
use topo_test_utils::{add_element, catalog, editor_principal, snapshot_document, RecordingVersionControl, COMPUTE, DOC_ID};

mock! {
    Store {}

    impl DocumentStore for Store {
        fn get_or_fail(&self, id: &DocumentId) -> EditorResult<Document>;
        fn save(&self, document: &Document) -> EditorResult<()>;
        fn update_derived_index(&self, document: &Document) -> EditorResult<()>;
    }
}

#[test]
fn index_failure_restores_the_previous_record() {
    let saved = Arc::new(Mutex::new(Vec::<Document>::new()));
    let mut store = MockStore::new();
    store
        .expect_get_or_fail()
        .returning(|_| Ok(snapshot_document(DOC_ID)));
    let log = Arc::clone(&saved);
    store.expect_save().times(2).returning(move |doc| {
        log.lock().push(doc.clone());
        Ok(())
    });
    let mut seq = Sequence::new();
    store
        .expect_update_derived_index()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(EditorError::io("index", std::io::Error::other("disk full"))));
    store
        .expect_update_derived_index()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));

    let artifact_dir = tempfile::tempdir().unwrap();
    let version_control = Arc::new(RecordingVersionControl::new());
    let services = EditorServices {
        documents: Arc::new(store),
        codec: Arc::new(YamlDocumentCodec),
        authorizer: Arc::new(RoleAuthorizer::default()),
        values: Arc::new(ConstraintValueService),
        catalog: Arc::new(catalog()),
        workflow: Arc::new(LoggingWorkflow),
        version_control: version_control.clone(),
        artifacts: Arc::new(LocalArtifactStore::open(artifact_dir.path()).unwrap()),
    };
    let editor = EditorService::new(EditorConfig::default(), services).unwrap();
    let principal = editor_principal();
    let id = DocumentId::new(DOC_ID);

    let snapshot = editor
        .execute(&principal, &id, Operation::new(add_element("Server", COMPUTE)))
        .unwrap();
    let err = editor
        .save(&principal, &id, snapshot.last_operation_id.as_ref())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);

    let saved = saved.lock();
    assert_eq!(saved.len(), 2);
    assert!(saved[0].element("Server").is_some());
    assert!(saved[1].elements.is_empty());
    assert!(version_control.commits().is_empty());

    let after = editor.snapshot(&id).unwrap();
    assert_eq!(after.last_operation_index, 0);
    assert!(after.document.element("Server").is_some());
}
