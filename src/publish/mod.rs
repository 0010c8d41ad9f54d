//! History publication: amend the latest commit and force-update the remote.

pub mod executor;

use async_trait::async_trait;

use crate::error::PublishError;

pub use executor::{GitPublisher, PushTarget};

/// Rewrites the branch tip's message in place and force-updates the remote.
///
/// Destructive: the remote branch tip is overwritten. The orchestrator calls
/// this at most once per invocation, and never for dry runs or unchanged
/// messages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, message: &str, branch: &str) -> Result<(), PublishError>;
}

/// Publisher used for dry runs and local previews. Refuses to publish.
pub struct NoopPublisher;

#[async_trait]
impl Publisher for NoopPublisher {
    async fn publish(&self, _message: &str, _branch: &str) -> Result<(), PublishError> {
        Err(PublishError::GitFailed(
            "publishing is disabled for this invocation".to_string(),
        ))
    }
}
