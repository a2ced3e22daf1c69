//! Concurrent fleet provisioning with partial-failure aggregation.
//!
//! Bulk fleet startup must tolerate individual creation failures without
//! discarding the nodes that did succeed; failing the whole batch on one bad
//! creation would waste already-provisioned, billable resources. The
//! coordinator therefore fans out one task per requested node, joins on all
//! of them, and reports partial failure as an error that carries the
//! surviving nodes.

use std::sync::Arc;

use log::{info, warn};
use thiserror::Error;
use tokio::task::JoinSet;

use crate::provider::{Node, NodeProvider};

/// Errors raised while starting or retiring a fleet.
#[derive(Debug, Error)]
pub enum FleetError<E>
where
    E: std::error::Error + 'static,
{
    /// Raised before any provider call when the requested count is invalid.
    #[error("cannot create {count} nodes: count must be non-negative")]
    Validation {
        /// Count that failed validation.
        count: i32,
    },
    /// Raised when some creations failed. The surviving nodes ride inside
    /// the error: callers must read both together, since an error means
    /// fewer nodes than requested, not zero nodes.
    #[error("{failed}/{requested} nodes were not created")]
    Partial {
        /// Nodes that were successfully created, in request order.
        nodes: Vec<Node>,
        /// Number of creations that failed.
        failed: usize,
        /// Number of creations requested.
        requested: usize,
    },
    /// Raised when enumerating fleet nodes during teardown fails.
    #[error("failed to enumerate fleet nodes: {0}")]
    List(#[source] E),
    /// Raised when teardown could not delete every node it attempted.
    #[error("{failed}/{attempted} nodes were not deleted")]
    Teardown {
        /// Number of deletions that failed.
        failed: usize,
        /// Number of deletions attempted.
        attempted: usize,
    },
}

/// Coordinates bulk node provisioning against a provider.
///
/// The coordinator is an ordinary value constructed with its provider and
/// name prefix; there is no global registry. It never retries provider
/// calls and never rolls back nodes that succeeded: cleanup after a partial
/// failure is the caller's responsibility (see [`Fleet::retire_all`]).
#[derive(Debug)]
pub struct Fleet<P> {
    provider: Arc<P>,
    name_prefix: String,
}

impl<P> Fleet<P>
where
    P: NodeProvider + 'static,
{
    /// Creates a fleet coordinator with the given node name prefix.
    #[must_use]
    pub fn new(provider: Arc<P>, name_prefix: impl Into<String>) -> Self {
        Self {
            provider,
            name_prefix: name_prefix.into(),
        }
    }

    /// Returns the deterministic name for the node at `index`.
    #[must_use]
    pub fn node_name(&self, index: usize) -> String {
        format!("{}-{index:02}", self.name_prefix)
    }

    /// Provisions `count` nodes concurrently and joins on all of them.
    ///
    /// All creations run in parallel with no concurrency cap; the call
    /// returns only after every one has finished. The successful nodes are
    /// returned in request order regardless of completion order.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Validation`] for a negative count before any
    /// provider call, or [`FleetError::Partial`] carrying the surviving
    /// nodes when some creations failed.
    pub async fn start(&self, count: i32) -> Result<Vec<Node>, FleetError<P::Error>> {
        if count < 0 {
            return Err(FleetError::Validation { count });
        }
        let Ok(total) = usize::try_from(count) else {
            return Err(FleetError::Validation { count });
        };
        if total == 0 {
            info!("fleet start requested zero nodes");
            return Ok(Vec::new());
        }

        let mut tasks = JoinSet::new();
        for index in 0..total {
            let provider = Arc::clone(&self.provider);
            let name = self.node_name(index);
            tasks.spawn(async move {
                let result = provider.create(&name).await;
                (index, name, result)
            });
        }

        // Each task owns one pre-sized slot indexed by request position, so
        // completion order never shows through in the result.
        let mut slots: Vec<Option<Node>> = vec![None; total];
        let mut failed = 0usize;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, name, Ok(created))) => {
                    info!("created node {name}");
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(created);
                    }
                }
                Ok((_, name, Err(err))) => {
                    warn!("node {name} was not created: {err}");
                    failed = failed.saturating_add(1);
                }
                Err(join_err) => {
                    warn!("creation task did not complete: {join_err}");
                    failed = failed.saturating_add(1);
                }
            }
        }

        let nodes: Vec<Node> = slots.into_iter().flatten().collect();
        if failed > 0 {
            return Err(FleetError::Partial {
                nodes,
                failed,
                requested: total,
            });
        }
        Ok(nodes)
    }

    /// Deletes every node whose name carries the fleet prefix.
    ///
    /// Deletion errors do not stop the sweep; remaining nodes are still
    /// attempted and failures are surfaced at the end.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::List`] when the provider cannot enumerate
    /// nodes, or [`FleetError::Teardown`] when any deletion failed.
    pub async fn retire_all(&self) -> Result<usize, FleetError<P::Error>> {
        let names = self.provider.list().await.map_err(FleetError::List)?;
        let marker = format!("{}-", self.name_prefix);

        let mut deleted = 0usize;
        let mut failed = 0usize;
        let mut attempted = 0usize;
        for name in names.iter().filter(|candidate| candidate.starts_with(&marker)) {
            attempted = attempted.saturating_add(1);
            match self.provider.delete(name).await {
                Ok(()) => {
                    info!("deleted node {name}");
                    deleted = deleted.saturating_add(1);
                }
                Err(err) => {
                    warn!("node {name} was not deleted: {err}");
                    failed = failed.saturating_add(1);
                }
            }
        }

        if failed > 0 {
            return Err(FleetError::Teardown { failed, attempted });
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests;
