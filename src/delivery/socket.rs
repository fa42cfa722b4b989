use crate::error::Result;
use crate::registry::ConnectionId;
use async_trait::async_trait;
use serde_json::Value;

/// A live connection that can receive events and answer them.
///
/// `emit` resolves once the peer acknowledges, with the peer's response
/// payload. A peer error, a timeout and a closed socket all surface as `Err`.
#[async_trait]
pub trait InstanceSocket: Send + Sync {
    fn id(&self) -> &ConnectionId;

    fn is_open(&self) -> bool;

    async fn emit(&self, event: &str, payload: Value) -> Result<Value>;
}
