use super::socket::InstanceSocket;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Emits `event` until it is acknowledged.
///
/// There is no retry limit: the payload is a snapshot that the next change
/// supersedes anyway. Returns `false` if the socket closed first.
pub async fn deliver(
    socket: Arc<dyn InstanceSocket>,
    event: &str,
    payload: Value,
    retry_delay: Duration,
) -> bool {
    let mut attempt: u64 = 0;

    loop {
        attempt += 1;

        match socket.emit(event, payload.clone()).await {
            Ok(_) => {
                tracing::debug!(
                    "Event {} acknowledged by {} (attempt {})",
                    event,
                    socket.id(),
                    attempt
                );
                return true;
            }
            Err(e) => {
                tracing::error!(
                    "Failed to deliver {} to {} (attempt {}): {}",
                    event,
                    socket.id(),
                    attempt,
                    e
                );
            }
        }

        if !socket.is_open() {
            return false;
        }
        tokio::time::sleep(retry_delay).await;
        if !socket.is_open() {
            tracing::debug!("Dropping {} for closed socket {}", event, socket.id());
            return false;
        }
    }
}

/// Fires an independent `deliver` per target without waiting on any of them.
pub fn broadcast(
    targets: Vec<Arc<dyn InstanceSocket>>,
    event: &'static str,
    payload: Value,
    retry_delay: Duration,
) -> Vec<JoinHandle<bool>> {
    tracing::debug!("Broadcasting {} to {} socket(s)", event, targets.len());

    targets
        .into_iter()
        .map(|socket| {
            let payload = payload.clone();
            tokio::spawn(async move { deliver(socket, event, payload, retry_delay).await })
        })
        .collect()
}
