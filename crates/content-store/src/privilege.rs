//! Elevated-privilege scopes for content mutations.
//!
//! An [`ElevatedScope`] is a capability: every mutating store call takes
//! one by reference, and a store only honours scopes it issued itself. A
//! caller that never elevated has nothing to pass, so privileges never
//! leak between concurrent callers. Scopes are released when dropped, on
//! early returns and panics alike.
//!
//! Mutating without a scope does not compile:
//!
//! ```compile_fail
//! use content_store::{ContentStore, InMemoryContentStore, Template};
//!
//! let store = InMemoryContentStore::new(["master"]);
//! store.add_item("master", "/sitecore", "page", &Template::new("Common/Folder"));
//! ```

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use content_types::ContentError;

static NEXT_GATE_ID: AtomicU64 = AtomicU64::new(1);

/// Issues scopes for one store and checks that presented scopes are its own.
#[derive(Debug, Clone)]
pub struct PrivilegeGate {
    id: u64,
    open_scopes: Arc<AtomicUsize>,
}

impl Default for PrivilegeGate {
    fn default() -> Self {
        Self {
            id: NEXT_GATE_ID.fetch_add(1, Ordering::Relaxed),
            open_scopes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl PrivilegeGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new scope; privileges last until it is dropped.
    pub fn elevate(&self) -> ElevatedScope {
        self.open_scopes.fetch_add(1, Ordering::SeqCst);
        ElevatedScope {
            gate_id: self.id,
            open_scopes: self.open_scopes.clone(),
        }
    }

    /// Number of scopes from this gate that are still alive.
    pub fn open_scopes(&self) -> usize {
        self.open_scopes.load(Ordering::SeqCst)
    }

    /// Fail with `AccessDenied` unless `scope` was issued by this gate.
    pub fn check(&self, scope: &ElevatedScope, operation: &str) -> Result<(), ContentError> {
        if scope.gate_id == self.id {
            Ok(())
        } else {
            Err(ContentError::AccessDenied(format!(
                "{operation} requires an elevated scope from this store"
            )))
        }
    }
}

/// RAII capability granting mutation rights on the issuing store while alive.
#[must_use = "privileges are released as soon as the scope is dropped"]
#[derive(Debug)]
pub struct ElevatedScope {
    gate_id: u64,
    open_scopes: Arc<AtomicUsize>,
}

impl Drop for ElevatedScope {
    fn drop(&mut self) {
        self.open_scopes.fetch_sub(1, Ordering::SeqCst);
    }
}
