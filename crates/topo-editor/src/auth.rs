//! Role-based edit authorization

use crate::error::{EditorError, EditorResult};
use crate::services::{Authorizer, Principal};
use std::collections::BTreeSet;
use topo_model::Document;

/// Role granting edit rights on every document
pub const ADMIN_ROLE: &str = "ADMIN";

/// Role granting edit rights on topology documents
pub const EDITOR_ROLE: &str = "TOPOLOGY_EDITOR";

/// Grants edition to principals holding one of the configured roles
#[derive(Debug, Clone)]
pub struct RoleAuthorizer {
    edit_roles: BTreeSet<String>,
    allow_all: bool,
}

impl Default for RoleAuthorizer {
    fn default() -> Self {
        Self::new([ADMIN_ROLE, EDITOR_ROLE])
    }
}

impl RoleAuthorizer {
    /// Authorizer accepting any of `roles`
    #[must_use]
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            edit_roles: roles.into_iter().map(Into::into).collect(),
            allow_all: false,
        }
    }

    /// Authorizer accepting every principal
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            edit_roles: BTreeSet::new(),
            allow_all: true,
        }
    }
}

impl Authorizer for RoleAuthorizer {
    fn check_edit_authorization(&self, principal: &Principal, document: &Document) -> EditorResult<()> {
        if self.allow_all || principal.roles.iter().any(|r| self.edit_roles.contains(r)) {
            return Ok(());
        }
        tracing::warn!(user = %principal.user_id, document = %document.id, "edit refused");
        Err(EditorError::AccessDenied(format!(
            "user <{}> may not edit document <{}>",
            principal.user_id, document.id
        )))
    }
}
