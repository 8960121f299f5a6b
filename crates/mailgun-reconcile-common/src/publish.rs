//! Connection-detail publishing seam.

use async_trait::async_trait;

use crate::error::ReconcileResult;
use crate::external::ConnectionDetails;
use crate::managed::SecretReference;

/// Persists connection details produced by a pass.
///
/// Publishing merges: keys absent from `details` keep their stored value.
/// This is what keeps a write-once secret alive across passes that only
/// observe.
#[async_trait]
pub trait ConnectionPublisher: Send + Sync {
    /// Merges `details` into the secret at `secret`.
    async fn publish(&self, secret: &SecretReference, details: &ConnectionDetails)
        -> ReconcileResult<()>;

    /// Removes the secret at `secret`. A missing secret is success.
    async fn unpublish(&self, secret: &SecretReference) -> ReconcileResult<()>;
}

/// Publisher for records that do not publish anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

#[async_trait]
impl ConnectionPublisher for NoopPublisher {
    async fn publish(&self, _: &SecretReference, _: &ConnectionDetails) -> ReconcileResult<()> {
        Ok(())
    }

    async fn unpublish(&self, _: &SecretReference) -> ReconcileResult<()> {
        Ok(())
    }
}
