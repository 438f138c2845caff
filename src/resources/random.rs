//! Random secret generation modeled as a resource.

use super::{CheckFailure, CheckResult, CreateResult, DiffResult, Resource};
use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use crate::observability::TracingHooks;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::SecretString;

/// Default entropy for webhook secrets, in bytes.
pub const DEFAULT_SECRET_BYTES: usize = 32;

/// Largest accepted `byte_count`, 2^31-1.
pub const MAX_SECRET_BYTES: i64 = i32::MAX as i64;

/// Declared properties of a random secret.
#[derive(Debug, Clone, Default)]
pub struct RandomArgs {
    /// Number of random bytes.
    pub byte_count: Option<i64>,
}

impl RandomArgs {
    /// Declares a secret of `byte_count` bytes.
    pub fn new(byte_count: i64) -> Self {
        Self {
            byte_count: Some(byte_count),
        }
    }
}

/// Validated random secret properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomInputs {
    /// Number of random bytes.
    pub byte_count: usize,
}

/// Generated secret.
#[derive(Debug, Clone)]
pub struct RandomOutputs {
    /// Number of random bytes the value encodes.
    pub byte_count: usize,
    /// Base64 encoding of the random bytes.
    pub value: SecretString,
}

/// Resource that draws a secret from the OS random source.
///
/// Nothing leaves the process: `create` is the only operation with an
/// effect, `update` and `delete` do nothing.
#[derive(Debug, Default)]
pub struct RandomSecretResource;

impl RandomSecretResource {
    /// Creates the resource.
    pub fn new() -> Self {
        Self
    }

    fn generate(byte_count: usize) -> GitHubResult<String> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(byte_count).map_err(|e| {
            GitHubError::new(
                GitHubErrorKind::Unknown,
                format!("cannot allocate {} random bytes", byte_count),
            )
            .with_cause(e)
        })?;
        bytes.resize(byte_count, 0);
        OsRng.fill_bytes(&mut bytes);
        Ok(STANDARD.encode(bytes))
    }
}

#[async_trait]
impl Resource for RandomSecretResource {
    type Args = RandomArgs;
    type Inputs = RandomInputs;
    type Outputs = RandomOutputs;

    fn kind(&self) -> &'static str {
        "random:secret"
    }

    fn validate(&self, proposed: &RandomArgs) -> CheckResult<RandomInputs> {
        let mut failures = Vec::new();
        match proposed.byte_count {
            None => failures.push(CheckFailure::new("byte_count", "byte_count is required")),
            Some(n) if n <= 0 => failures.push(CheckFailure::new(
                "byte_count",
                format!("byte_count must be positive, got {}", n),
            )),
            Some(n) if n > MAX_SECRET_BYTES => failures.push(CheckFailure::new(
                "byte_count",
                format!("byte_count must be at most {}, got {}", MAX_SECRET_BYTES, n),
            )),
            Some(_) => {}
        }

        let byte_count = proposed.byte_count.unwrap_or_default() as usize;
        CheckResult::from_parts(|| RandomInputs { byte_count }, failures)
    }

    fn diff(&self, _id: &str, current: &RandomOutputs, proposed: &RandomInputs) -> DiffResult {
        let mut diff = DiffResult::default();
        if current.byte_count != proposed.byte_count {
            diff.record("byte_count", true);
        }
        diff
    }

    async fn create(&self, proposed: &RandomInputs) -> GitHubResult<CreateResult<RandomOutputs>> {
        let value = Self::generate(proposed.byte_count)?;
        TracingHooks::on_resource_operation(self.kind(), "create", "[REDACTED]");

        Ok(CreateResult {
            id: value.clone(),
            outputs: RandomOutputs {
                byte_count: proposed.byte_count,
                value: SecretString::new(value),
            },
        })
    }

    async fn update(
        &self,
        _id: &str,
        current: &RandomOutputs,
        _proposed: &RandomInputs,
    ) -> GitHubResult<RandomOutputs> {
        Ok(current.clone())
    }

    async fn delete(&self, _id: &str, _current: &RandomOutputs) -> GitHubResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use test_case::test_case;

    #[test_case(None ; "missing")]
    #[test_case(Some(0) ; "zero")]
    #[test_case(Some(-4) ; "negative")]
    #[test_case(Some(MAX_SECRET_BYTES + 1) ; "above limit")]
    #[test_case(Some(i64::MAX) ; "i64 max")]
    fn test_validate_rejects(byte_count: Option<i64>) {
        let result = RandomSecretResource::new().validate(&RandomArgs { byte_count });
        assert!(result.has_failure_for("byte_count"));
        assert!(result.inputs.is_none());
    }

    #[test]
    fn test_validate_accepts_limit() {
        let result = RandomSecretResource::new().validate(&RandomArgs::new(MAX_SECRET_BYTES));
        assert_eq!(result.inputs.map(|i| i.byte_count), Some(MAX_SECRET_BYTES as usize));
    }

    #[tokio::test]
    async fn test_create_encodes_requested_bytes() {
        let resource = RandomSecretResource::new();
        let inputs = resource.validate(&RandomArgs::new(20)).inputs.unwrap();

        let created = resource.create(&inputs).await.unwrap();
        let decoded = STANDARD
            .decode(created.outputs.value.expose_secret())
            .unwrap();

        assert_eq!(decoded.len(), 20);
        assert_eq!(&created.id, created.outputs.value.expose_secret());
    }

    #[tokio::test]
    async fn test_byte_count_change_is_replacement() {
        let resource = RandomSecretResource::new();
        let created = resource.create(&RandomInputs { byte_count: 16 }).await.unwrap();

        let same = resource.diff(&created.id, &created.outputs, &RandomInputs { byte_count: 16 });
        assert!(!same.has_changes());

        let bigger = resource.diff(&created.id, &created.outputs, &RandomInputs { byte_count: 32 });
        assert!(bigger.replaces.contains("byte_count"));
    }

    #[tokio::test]
    async fn test_update_and_delete_are_no_ops() {
        let resource = RandomSecretResource::new();
        let created = resource.create(&RandomInputs { byte_count: 8 }).await.unwrap();

        let updated = resource
            .update(&created.id, &created.outputs, &RandomInputs { byte_count: 8 })
            .await
            .unwrap();
        assert_eq!(
            updated.value.expose_secret(),
            created.outputs.value.expose_secret()
        );
        assert!(resource.delete(&created.id, &created.outputs).await.is_ok());
    }
}
