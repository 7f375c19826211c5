//! Timeout wrapper shared by every store call the engine makes.

use std::future::Future;
use std::time::Duration;

use bridge_traits::error::Result as BridgeResult;
use tokio::time::timeout;
use tracing::warn;

use crate::error::{Result, SyncError};

/// Run `call` against `store`, failing with `StoreTimeout` after `limit`
pub(crate) async fn guarded<T, F>(
    store: &str,
    operation: &str,
    limit: Duration,
    call: F,
) -> Result<T>
where
    F: Future<Output = BridgeResult<T>>,
{
    match timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(SyncError::from_bridge(store, err)),
        Err(_) => {
            warn!(store, operation, timeout_ms = limit.as_millis() as u64, "Store call timed out");
            Err(SyncError::StoreTimeout {
                store: store.to_string(),
                operation: operation.to_string(),
                timeout_ms: limit.as_millis() as u64,
            })
        }
    }
}
