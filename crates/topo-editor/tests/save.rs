//! Save pipeline, rollback, history and cross-document publication

use pretty_assertions::assert_eq;
use topo_editor::{
    DocumentCodec, DocumentStore, EditorConfig, ErrorKind, Operation, OperationPayload, TypeCatalog, YamlDocumentCodec,
};
use topo_model::{DocumentId, TypeId};
use topo_test_utils::{
    add_element, set_property, snapshot_document, upload_file, TestEditor, COMPUTE, DATABASE, HOSTED_ON,
};

#[test]
fn save_promotes_files_commits_and_drops_the_log() {
    let t = TestEditor::new();
    t.exec(add_element("Server", COMPUTE)).unwrap();
    t.exec(upload_file("config/app.conf", "port=80")).unwrap();

    let snapshot = t.save().unwrap();
    assert!(snapshot.operations.is_empty());
    assert_eq!(snapshot.last_operation_index, -1);
    assert_eq!(snapshot.last_saved_operation_index, -1);
    assert!(snapshot.tree.staged_files().is_empty());
    assert_eq!(t.staged_artifact_count(), 0);

    let dir = t.version_control.working_dir(&t.doc_id());
    assert_eq!(std::fs::read_to_string(dir.join("config/app.conf")).unwrap(), "port=80");
    let canonical = YamlDocumentCodec
        .parse(&std::fs::read(dir.join("topology.yml")).unwrap())
        .unwrap();
    assert!(canonical.element("Server").is_some());

    let record = t.store.get_or_fail(&t.doc_id()).unwrap();
    assert!(record.element("Server").is_some());
    let indexed = t.store.indexed(&t.doc_id()).unwrap();
    assert_eq!(indexed.elements, vec!["Server".to_string()]);
    assert_eq!(indexed.fingerprint, snapshot.fingerprint);

    let commits = t.version_control.commits();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].author, "alice");
    assert_eq!(
        commits[0].message,
        "alice: add element <Server> of type <Compute:1.0>\nalice: update file <config/app.conf>"
    );
}

#[test]
fn saving_without_unsaved_operations_does_nothing() {
    let t = TestEditor::new();
    let snapshot = t.save().unwrap();
    assert!(snapshot.operations.is_empty());
    assert!(t.version_control.commits().is_empty());
    assert!(t.store.indexed(&t.doc_id()).is_none());
}

#[test]
fn saving_at_an_undone_cursor_saves_the_prefix_and_drops_the_tail() {
    let t = TestEditor::new();
    t.exec(add_element("A", COMPUTE)).unwrap();
    t.exec(upload_file("tail.txt", "tail")).unwrap();
    t.undo_redo(0).unwrap();

    t.save().unwrap();
    assert_eq!(t.version_control.commits().len(), 1);
    assert_eq!(t.staged_artifact_count(), 0);
    let dir = t.version_control.working_dir(&t.doc_id());
    assert!(!dir.join("tail.txt").exists());
    assert!(t.snapshot().operations.is_empty());
}

#[test]
fn failed_commit_rolls_everything_back() {
    let t = TestEditor::new();
    let dir = t.version_control.working_dir(&t.doc_id());
    t.exec(add_element("Server", COMPUTE)).unwrap();
    t.exec(upload_file("config/app.conf", "port=80")).unwrap();
    let canonical_before = std::fs::read(dir.join("topology.yml")).unwrap();

    t.version_control.fail_next_commit();
    let err = t.save().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.is_retryable());

    assert_eq!(std::fs::read(dir.join("topology.yml")).unwrap(), canonical_before);
    assert!(!dir.join("config/app.conf").exists());
    let record = t.store.get_or_fail(&t.doc_id()).unwrap();
    assert!(record.elements.is_empty());
    assert!(t.store.indexed(&t.doc_id()).unwrap().elements.is_empty());

    let snapshot = t.snapshot();
    assert_eq!(snapshot.operations.len(), 2);
    assert_eq!(snapshot.last_operation_index, 1);
    assert_eq!(snapshot.last_saved_operation_index, -1);
    assert_eq!(snapshot.tree.staged_files().len(), 1);
    assert_eq!(t.staged_artifact_count(), 1);

    t.save().unwrap();
    assert_eq!(std::fs::read_to_string(dir.join("config/app.conf")).unwrap(), "port=80");
    assert_eq!(t.version_control.commits().len(), 1);
}

#[test]
fn history_pages_newest_first() {
    let mut config = EditorConfig::default();
    config.max_history_page = 2;
    let t = TestEditor::with_config(config);
    t.exec(add_element("A", COMPUTE)).unwrap();
    t.save().unwrap();
    t.exec(add_element("B", COMPUTE)).unwrap();
    t.save().unwrap();
    t.exec(set_property("B", "cpus", 2_i64)).unwrap();
    t.save().unwrap();

    let page = t.editor.history(&t.doc_id(), 0, 10).unwrap();
    assert_eq!(page.len(), 2);
    assert!(page[0].message.contains("update property <cpus>"));
    assert!(page[1].message.contains("add element <B>"));

    let older = t.editor.history(&t.doc_id(), 2, 1).unwrap();
    assert_eq!(older.len(), 1);
    assert!(older[0].message.contains("add element <A>"));
}

#[test]
fn substitution_type_is_published_and_protected_while_used() {
    let t = TestEditor::new();
    t.exec(add_element("Server", COMPUTE)).unwrap();
    t.exec(OperationPayload::SetSubstitution {
        type_id: COMPUTE.into(),
    })
    .unwrap();
    t.save().unwrap();

    let exposed = TypeId::new("web:1.0.0-SNAPSHOT");
    let descriptor = t.catalog.resolve(&exposed).unwrap();
    assert_eq!(descriptor.substitution_document, Some(t.doc_id()));
    assert!(descriptor.capabilities.contains("host"));

    // a document may not compose itself
    let err = t.exec(add_element("Self", exposed.as_str())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CyclicReference);
    let after = t.snapshot();
    assert!(after.document.element("Self").is_none());
    assert_eq!(after.document.elements.len(), 1);

    let mut shop = snapshot_document("shop");
    shop.archive_name = "shop".into();
    t.store.insert(shop);
    let shop_id = DocumentId::new("shop");
    let snapshot = t
        .editor
        .execute(&t.principal, &shop_id, Operation::new(add_element("Web", exposed.as_str())))
        .unwrap();
    t.editor
        .save(&t.principal, &shop_id, snapshot.last_operation_id.as_ref())
        .unwrap();
    assert!(t.catalog.composed_documents(&shop_id).contains(&t.doc_id()));

    let err = t.exec(OperationPayload::RemoveSubstitution).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReferencedObjectInUse);
}

#[test]
fn removing_an_unset_substitution_is_not_found() {
    let t = TestEditor::new();
    let err = t.exec(OperationPayload::RemoveSubstitution).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    t.exec(OperationPayload::SetSubstitution {
        type_id: COMPUTE.into(),
    })
    .unwrap();
    let snapshot = t.exec(OperationPayload::RemoveSubstitution).unwrap();
    assert!(snapshot.document.substitution.is_none());

    let err = t
        .exec(OperationPayload::SetSubstitution {
            type_id: HOSTED_ON.into(),
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(t.exec(add_element("Db", DATABASE)).is_ok());
}
