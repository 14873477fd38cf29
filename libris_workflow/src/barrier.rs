//! Join point for the concurrently dispatched handler branches.

use futures::future::join_all;
use tokio::task::{JoinError, JoinHandle};
use tracing::warn;

use crate::error::HandlerError;
use crate::handler::HandlerKind;
use crate::state::StateDelta;

/// Result of one dispatched branch, tagged with its slot.
#[derive(Debug)]
pub struct BranchOutcome {
    pub kind: HandlerKind,
    pub result: Result<StateDelta, HandlerError>,
}

impl BranchOutcome {
    #[must_use]
    pub const fn delta(&self) -> Option<&StateDelta> {
        match &self.result {
            Ok(delta) => Some(delta),
            Err(_) => None,
        }
    }
}

type Branch = (HandlerKind, JoinHandle<Result<StateDelta, HandlerError>>);

/// Handles of the branches spawned for one turn, in dispatch order.
///
/// Dropping this without calling [`wait`](Self::wait) aborts every branch
/// still running.
#[derive(Debug, Default)]
pub struct PendingBranches {
    branches: Vec<Branch>,
}

impl PendingBranches {
    pub(crate) const fn new(branches: Vec<Branch>) -> Self {
        Self { branches }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Block until every branch has completed or failed.
    ///
    /// Never short-circuits: a failing branch does not stop the others from
    /// being awaited. Outcomes come back in dispatch order regardless of
    /// completion order.
    pub async fn wait(mut self) -> Vec<BranchOutcome> {
        let branches = std::mem::take(&mut self.branches);
        let (kinds, handles): (Vec<_>, Vec<_>) = branches.into_iter().unzip();

        join_all(handles)
            .await
            .into_iter()
            .zip(kinds)
            .map(|(joined, kind)| BranchOutcome {
                kind,
                result: joined.unwrap_or_else(|e| Err(join_failure(kind, &e))),
            })
            .collect()
    }
}

impl Drop for PendingBranches {
    fn drop(&mut self) {
        for (kind, handle) in &self.branches {
            if !handle.is_finished() {
                warn!("Aborting unjoined handler branch: {kind}");
                handle.abort();
            }
        }
    }
}

fn join_failure(kind: HandlerKind, err: &JoinError) -> HandlerError {
    if err.is_cancelled() {
        return HandlerError::Cancelled;
    }
    warn!("Handler {kind} panicked");
    HandlerError::Panicked(err.to_string())
}
