//! Deferred handle to the shared webhook secret.
//!
//! Registrations and the gateway capture a [`SecretHandle`] when they are
//! built. The value itself is set once, after the secret resource has been
//! created, and every clone of the handle observes it.

use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use once_cell::sync::OnceCell;
use secrecy::SecretString;
use std::fmt;
use std::sync::Arc;

/// Shared, write-once reference to the webhook secret.
#[derive(Clone, Default)]
pub struct SecretHandle {
    cell: Arc<OnceCell<SecretString>>,
}

impl SecretHandle {
    /// Creates a handle whose value is not known yet.
    pub fn pending() -> Self {
        Self::default()
    }

    /// Creates a handle that is already resolved.
    pub fn resolved(value: SecretString) -> Self {
        let handle = Self::pending();
        // A fresh cell cannot already be set.
        let _ = handle.cell.set(value);
        handle
    }

    /// Sets the value. Fails if the handle was already resolved.
    pub fn resolve(&self, value: SecretString) -> GitHubResult<()> {
        self.cell.set(value).map_err(|_| {
            GitHubError::new(
                GitHubErrorKind::InvalidConfiguration,
                "Secret handle is already resolved",
            )
        })
    }

    /// Returns true once the value has been set.
    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Gets the value, failing if it has not materialized yet.
    pub fn get(&self) -> GitHubResult<&SecretString> {
        self.cell.get().ok_or_else(|| {
            GitHubError::new(
                GitHubErrorKind::SecretUnresolved,
                "Shared secret has not been generated yet",
            )
        })
    }

    /// Returns true if both handles point at the same cell.
    pub fn same_as(&self, other: &SecretHandle) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl fmt::Debug for SecretHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretHandle")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
