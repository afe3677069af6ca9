//! Scoped session and in-flight claim
//!
//! A [`Session`] binds one edition context to the running call and is passed
//! explicitly to everything that needs the current document. A [`Claim`]
//! marks the context as having an operation in flight; dropping it clears the
//! marker on every exit path.

use crate::cache::EditionContextCache;
use crate::context::EditionContext;
use crate::error::{EditorError, EditorResult};
use std::sync::Arc;
use topo_model::{DocumentId, OperationId};

/// A call bound to one edition context
#[derive(Debug)]
pub struct Session {
    context: Arc<EditionContext>,
}

impl Session {
    /// Bind the context of `id`, loading it if necessary
    ///
    /// # Errors
    /// Propagates context load failures
    pub fn init(cache: &EditionContextCache, id: &DocumentId) -> EditorResult<Self> {
        let context = cache.get_or_load(id)?;
        tracing::trace!(document = %id, "session bound");
        Ok(Self { context })
    }

    /// Bound context
    #[inline]
    #[must_use]
    pub fn context(&self) -> &EditionContext {
        &self.context
    }

    /// Release the binding
    pub fn destroy(self) {}

    /// Run the optimistic lock check and mark `operation` as in flight
    ///
    /// Fails when another call is already in flight on the context, or when
    /// `previous` is not the id of the operation at the cursor (absent iff
    /// the cursor is at the pristine state).
    ///
    /// # Errors
    /// [`EditorError::Concurrency`] in both cases; nothing is changed
    pub fn claim(&self, previous: Option<&OperationId>, operation: OperationId) -> EditorResult<Claim<'_>> {
        let context: &EditionContext = &self.context;
        let mut marker = context.marker();
        if let Some(in_flight) = marker.as_ref() {
            tracing::warn!(document = %context.id(), %in_flight, "rejected re-entrant call");
            return Err(EditorError::concurrency(format!(
                "operation <{in_flight}> is already in progress on document <{}>",
                context.id()
            )));
        }
        {
            let state = context.state();
            let tip = state.tip_id();
            if tip != previous {
                tracing::warn!(document = %context.id(), ?tip, ?previous, "rejected stale lineage");
                return Err(EditorError::concurrency(format!(
                    "expected last operation <{}> but the document is at <{}>",
                    previous.map_or("none", OperationId::as_str),
                    tip.map_or("none", OperationId::as_str),
                )));
            }
        }
        *marker = Some(operation.clone());
        Ok(Claim { context, operation })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        tracing::trace!(document = %self.context.id(), "session released");
    }
}

/// Marks an operation as in flight on a context until dropped
///
/// Drop the state guard before the claim: the marker is always locked first.
#[derive(Debug)]
pub struct Claim<'a> {
    context: &'a EditionContext,
    operation: OperationId,
}

impl Claim<'_> {
    /// Id of the claimed operation
    #[inline]
    #[must_use]
    pub fn operation(&self) -> &OperationId {
        &self.operation
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        let mut marker = self.context.marker();
        if marker.as_ref() == Some(&self.operation) {
            *marker = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topo_model::Document;

    fn session() -> Session {
        Session {
            context: Arc::new(EditionContext::detached(Document::new("d", "web", "1.0-SNAPSHOT"))),
        }
    }

    #[test]
    fn second_claim_while_in_flight_is_rejected() {
        let session = session();
        let claim = session.claim(None, OperationId::new("a")).unwrap();
        let err = session.claim(None, OperationId::new("b")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Concurrency);
        assert_eq!(session.context().current_operation(), Some(OperationId::new("a")));
        assert_eq!(claim.operation(), &OperationId::new("a"));
    }

    #[test]
    fn dropping_the_claim_clears_the_marker() {
        let session = session();
        drop(session.claim(None, OperationId::new("a")).unwrap());
        assert!(session.context().current_operation().is_none());
        assert!(session.claim(None, OperationId::new("b")).is_ok());
    }

    #[test]
    fn stale_previous_operation_is_rejected() {
        let session = session();
        let err = session.claim(Some(&OperationId::new("ghost")), OperationId::new("a")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Concurrency);
        assert!(session.context().current_operation().is_none());
    }
}
