//! Active dialect lookup
//!
//! The relational adapter asks its source for the backend on every compile
//! call, so switching dialects at runtime never leaves stale predicates.

use parking_lot::RwLock;

use super::Backend;

/// Provides the SQL backend in effect right now
pub trait DialectSource: Send + Sync {
    fn backend(&self) -> Backend;
}

impl DialectSource for Backend {
    fn backend(&self) -> Backend {
        *self
    }
}

/// Runtime-switchable dialect shared between the host and the adapter
#[derive(Debug, Default)]
pub struct ActiveDialect {
    backend: RwLock<Backend>,
}

impl ActiveDialect {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend: RwLock::new(backend),
        }
    }

    pub fn set(&self, backend: Backend) {
        let mut current = self.backend.write();
        if *current != backend {
            tracing::debug!(from = %*current, to = %backend, "Switching SQL dialect");
            *current = backend;
        }
    }
}

impl DialectSource for ActiveDialect {
    fn backend(&self) -> Backend {
        *self.backend.read()
    }
}
