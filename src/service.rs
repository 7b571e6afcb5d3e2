use crate::model::Counter;
use crate::model::Increment;
use async_trait::async_trait;

/// The two operations the counter application exposes.
///
/// Implemented by the stores (which own the data) and by the HTTP client
/// (which forwards to a server backed by a store), so the view does not care
/// which one it is talking to.
#[async_trait]
pub trait CounterService: Send + Sync {
    /// Return the counter, creating it with a count of 0 if it does not
    /// exist yet.
    async fn get_counter(&self) -> anyhow::Result<Counter>;

    /// Add `increment` to the counter and return the updated row.  If there
    /// is no counter yet, one is created with `increment` as its count.
    async fn increment_counter(
        &self,
        increment: Increment,
    ) -> anyhow::Result<Counter>;
}
