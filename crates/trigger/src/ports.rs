//! Port traits implemented by infrastructure crates.

use async_trait::async_trait;
use serde_json::Value;

use crate::{DispatchError, TriggerRequest};

/// Sends one pipeline-trigger call.
///
/// Implementations make exactly one attempt per call and report failures as
/// [`DispatchError`]; retrying is the caller's concern.
#[async_trait]
pub trait PipelineTrigger: Send + Sync {
    /// Sends `request` and returns the provider's response body.
    ///
    /// Bodies that are not JSON are returned as [`Value::String`].
    async fn trigger(&self, request: &TriggerRequest) -> Result<Value, DispatchError>;
}
