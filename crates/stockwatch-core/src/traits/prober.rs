//! Resource probing trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ProbeResult;

/// Fetches the current state of one resource.
///
/// Implementations are best-effort and may be slow; callers decide whether a
/// failure is fatal.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, resource: &str) -> Result<ProbeResult>;
}
