use super::{CommitScope, EditScope, OperationProcessor};
use crate::error::{EditorError, EditorResult};
use crate::operation::{FileUpload, Operation, OperationKind, OperationPayload};
use topo_model::{ArchivePath, ArtifactId};

/// Top-level entries of the working tree that uploads may not touch
const RESERVED_ROOTS: &[&str] = &[".git"];

fn parse_path(raw: &str) -> EditorResult<ArchivePath> {
    let path: ArchivePath = raw.parse()?;
    if path.segments().first().is_some_and(|s| RESERVED_ROOTS.contains(&s.as_str())) {
        return Err(EditorError::InvalidPath(format!("path <{raw}> is reserved")));
    }
    Ok(path)
}

/// Stage the upload (once), attach it to the tree node and, for the
/// canonical file, reload the document from it
///
/// A reloaded document must keep its archive name and version.
fn apply_upload(
    scope: &mut EditScope<'_>,
    path: &ArchivePath,
    upload: &mut FileUpload,
) -> EditorResult<()> {
    scope.workspace.tree.insert_file(path)?;

    let services = scope.services;
    let artifacts = services.artifacts.as_ref();
    let (staged, fresh) = match upload.staged() {
        Some(id) => (id.clone(), false),
        None => {
            let content = upload
                .take_content()
                .ok_or_else(|| EditorError::Validation(format!("no content uploaded for <{path}>")))?;
            let id = artifacts.store(&content)?;
            upload.set_staged(id.clone());
            (id, true)
        }
    };

    if path == scope.canonical_path {
        if let Err(e) = reload_document(scope, &staged) {
            if fresh {
                if let Err(cleanup) = artifacts.delete(&staged) {
                    tracing::warn!(artifact = %staged, error = %cleanup, "failed to delete rejected upload");
                }
            }
            return Err(e);
        }
    }

    scope.workspace.tree.set_staged(path, Some(staged));
    Ok(())
}

fn reload_document(scope: &mut EditScope<'_>, staged: &ArtifactId) -> EditorResult<()> {
    let bytes = scope.services.artifacts.get(staged)?;
    let mut parsed = scope.services.codec.parse(&bytes)?;
    let current = &scope.workspace.document;
    if parsed.archive_name != current.archive_name || parsed.archive_version != current.archive_version {
        return Err(EditorError::Validation(format!(
            "document archive must stay <{}> (uploaded <{}>)",
            current.archive(),
            parsed.archive()
        )));
    }
    parsed.id = current.id.clone();
    parsed.canonical_path = current.canonical_path.clone();
    tracing::debug!(document = %parsed.id, elements = parsed.elements.len(), "document reloaded from upload");
    scope.workspace.document = parsed;
    Ok(())
}

/// Write a staged upload into the working tree at save time
fn promote(scope: &mut CommitScope<'_>, path: ArchivePath, staged: &ArtifactId) -> EditorResult<()> {
    let bytes = scope.services.artifacts.get(staged)?;
    scope.journal.write(&path, &bytes)?;
    scope.journal.promote(path, staged.clone());
    Ok(())
}

/// Uploads a file at an archive path
#[derive(Debug, Default, Clone, Copy)]
pub struct UpdateFileProcessor;

impl OperationProcessor for UpdateFileProcessor {
    fn kind(&self) -> OperationKind {
        OperationKind::UpdateFile
    }

    fn process(&self, scope: &mut EditScope<'_>, operation: &mut Operation) -> EditorResult<()> {
        let OperationPayload::UpdateFile { path, upload } = &mut operation.payload else {
            return Err(EditorError::Internal("payload routed to update_file".into()));
        };
        let path = parse_path(path)?;
        apply_upload(scope, &path, upload)
    }

    fn before_commit(&self, scope: &mut CommitScope<'_>, operation: &Operation) -> EditorResult<()> {
        let (OperationPayload::UpdateFile { path, .. }, Some(staged)) =
            (&operation.payload, operation.staged_artifact())
        else {
            return Ok(());
        };
        promote(scope, parse_path(path)?, staged)
    }
}

/// Replaces the canonical document file, reloading the document from it
#[derive(Debug, Default, Clone, Copy)]
pub struct UpdateCanonicalDocumentProcessor;

impl OperationProcessor for UpdateCanonicalDocumentProcessor {
    fn kind(&self) -> OperationKind {
        OperationKind::UpdateCanonicalDocument
    }

    fn process(&self, scope: &mut EditScope<'_>, operation: &mut Operation) -> EditorResult<()> {
        let OperationPayload::UpdateCanonicalDocument { upload } = &mut operation.payload else {
            return Err(EditorError::Internal("payload routed to update_canonical_document".into()));
        };
        let path = scope.canonical_path.clone();
        apply_upload(scope, &path, upload)
    }

    fn before_commit(&self, scope: &mut CommitScope<'_>, operation: &Operation) -> EditorResult<()> {
        let Some(staged) = operation.staged_artifact() else {
            return Ok(());
        };
        let path = scope.canonical_path.clone();
        promote(scope, path, staged)
    }
}
