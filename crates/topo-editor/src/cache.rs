//! Time-expiring cache of edition contexts using moka
//!
//! A context is loaded at most once per key: concurrent callers missing on
//! the same document wait for the single in-flight load. Contexts idle for
//! longer than the configured timeout are evicted; eviction deletes the
//! staged artifacts of operations that were never saved.

use crate::config::EditorConfig;
use crate::context::EditionContext;
use crate::error::{EditorError, EditorResult};
use crate::services::EditorServices;
use moka::notification::RemovalCause;
use moka::sync::Cache;
use std::sync::Arc;
use topo_model::DocumentId;

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of cached contexts
    pub entry_count: u64,
}

/// Cache of [`EditionContext`]s keyed by document id
#[derive(Clone)]
pub struct EditionContextCache {
    inner: Cache<DocumentId, Arc<EditionContext>>,
    services: EditorServices,
    config: Arc<EditorConfig>,
}

impl std::fmt::Debug for EditionContextCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditionContextCache")
            .field("entry_count", &self.inner.entry_count())
            .finish_non_exhaustive()
    }
}

impl EditionContextCache {
    /// Create a cache sized and timed by `config`
    #[must_use]
    pub fn new(config: Arc<EditorConfig>, services: EditorServices) -> Self {
        let artifacts = Arc::clone(&services.artifacts);
        let inner = Cache::builder()
            .max_capacity(config.max_contexts)
            .time_to_idle(config.idle_timeout())
            .eviction_listener(move |id: Arc<DocumentId>, context: Arc<EditionContext>, cause| {
                if cause == RemovalCause::Replaced {
                    return;
                }
                tracing::debug!(document = %id, ?cause, "edition context evicted");
                context.cleanup(artifacts.as_ref());
            })
            .build();
        Self {
            inner,
            services,
            config,
        }
    }

    /// Cached context for `id`, loading it on a miss
    ///
    /// # Errors
    /// Propagates the load failure; nothing is cached in that case
    pub fn get_or_load(&self, id: &DocumentId) -> EditorResult<Arc<EditionContext>> {
        self.inner
            .try_get_with(id.clone(), || {
                EditionContext::load(id, &self.services, &self.config).map(Arc::new)
            })
            .map_err(EditorError::from_shared)
    }

    /// Cached context for `id` without loading
    #[must_use]
    pub fn get(&self, id: &DocumentId) -> Option<Arc<EditionContext>> {
        self.inner.get(id)
    }

    /// Evict the context of `id`, running the eviction cleanup
    pub fn invalidate(&self, id: &DocumentId) {
        self.inner.invalidate(id);
        self.inner.run_pending_tasks();
    }

    /// Process pending expirations now
    pub fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks();
    }

    /// Get cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.inner.entry_count(),
        }
    }
}
