//! Reconciliation lifecycle for externally-owned resources.
//!
//! A [`Resource`] implementation lets an orchestrator keep a remote object in
//! line with its declared properties. `validate` and `diff` are pure and run
//! without touching the remote system; `create`, `update` and `delete` perform
//! the side effects and report failures to the caller without retrying.
//!
//! The orchestrator owns sequencing and the record of prior state: it passes
//! the recorded outputs back in as `current` and decides which of the
//! side-effecting operations to call from the `diff` result.

mod random;
mod webhook;

pub use random::*;
pub use webhook::*;

use crate::errors::GitHubResult;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt;

/// One violated constraint on a declared property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckFailure {
    /// Offending property.
    pub property: &'static str,
    /// Human-readable reason.
    pub reason: String,
}

impl CheckFailure {
    /// Creates a failure for a property.
    pub fn new(property: &'static str, reason: impl Into<String>) -> Self {
        Self {
            property,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.property, self.reason)
    }
}

/// Outcome of `validate`.
#[derive(Debug, Clone)]
pub struct CheckResult<I> {
    /// Accepted inputs; `None` whenever `failures` is non-empty.
    pub inputs: Option<I>,
    /// Every violated constraint.
    pub failures: Vec<CheckFailure>,
}

impl<I> CheckResult<I> {
    /// Builds a result from collected failures, keeping `inputs` only if none.
    pub fn from_parts(inputs: impl FnOnce() -> I, failures: Vec<CheckFailure>) -> Self {
        if failures.is_empty() {
            Self {
                inputs: Some(inputs()),
                failures,
            }
        } else {
            Self {
                inputs: None,
                failures,
            }
        }
    }

    /// Returns true if validation passed.
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns true if some failure names `property`.
    pub fn has_failure_for(&self, property: &str) -> bool {
        self.failures.iter().any(|f| f.property == property)
    }
}

/// Outcome of `diff`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// Every property whose value differs.
    pub changes: BTreeSet<&'static str>,
    /// The subset of `changes` that cannot be applied in place.
    pub replaces: BTreeSet<&'static str>,
}

impl DiffResult {
    /// Records a property change.
    pub fn record(&mut self, property: &'static str, replace: bool) {
        self.changes.insert(property);
        if replace {
            self.replaces.insert(property);
        }
    }

    /// Returns true if anything differs.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Returns true if the resource must be destroyed and recreated.
    pub fn requires_replace(&self) -> bool {
        !self.replaces.is_empty()
    }
}

/// Outcome of `create`.
#[derive(Debug, Clone)]
pub struct CreateResult<O> {
    /// Identifier assigned by the remote system.
    pub id: String,
    /// Recorded state, passed back as `current` later.
    pub outputs: O,
}

/// Lifecycle operations an externally-backed resource kind implements.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Properties as declared, before validation.
    type Args: Send + Sync;
    /// Validated, typed properties.
    type Inputs: Send + Sync;
    /// State recorded after a successful create or update.
    type Outputs: Send + Sync;

    /// Resource kind name, used in logs.
    fn kind(&self) -> &'static str;

    /// Checks the declared properties, collecting every violation.
    fn validate(&self, proposed: &Self::Args) -> CheckResult<Self::Inputs>;

    /// Compares recorded state against the proposed inputs.
    fn diff(&self, id: &str, current: &Self::Outputs, proposed: &Self::Inputs) -> DiffResult;

    /// Creates the remote counterpart. Only valid when none exists.
    async fn create(&self, proposed: &Self::Inputs) -> GitHubResult<CreateResult<Self::Outputs>>;

    /// Applies in-place changes. Never called for replace-triggering changes.
    async fn update(
        &self,
        id: &str,
        current: &Self::Outputs,
        proposed: &Self::Inputs,
    ) -> GitHubResult<Self::Outputs>;

    /// Removes the remote counterpart.
    async fn delete(&self, id: &str, current: &Self::Outputs) -> GitHubResult<()>;
}
