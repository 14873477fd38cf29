use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span, warn};

use crate::barrier::PendingBranches;
use crate::error::HandlerError;
use crate::handler::HandlerKind;
use crate::registry::HandlerRegistry;
use crate::state::{StateDelta, TurnState};

/// Launches one task per planned handler.
///
/// All branches of a turn share the same `Arc<TurnState>` snapshot, so no
/// handler can observe another's output. Each branch is bounded by the
/// handler timeout and by the turn's cancellation token.
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    handler_timeout: Duration,
}

impl Dispatcher {
    #[must_use]
    pub const fn new(registry: Arc<HandlerRegistry>, handler_timeout: Duration) -> Self {
        Self {
            registry,
            handler_timeout,
        }
    }

    /// Spawn the handlers in `plan` and return their handles in plan order.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn dispatch(
        &self,
        plan: &[HandlerKind],
        snapshot: &Arc<TurnState>,
        cancel: &CancellationToken,
    ) -> PendingBranches {
        let branches = plan
            .iter()
            .map(|&kind| {
                let handler = self.registry.get(kind);
                let snapshot = Arc::clone(snapshot);
                let token = cancel.child_token();
                let timeout = self.handler_timeout;
                let span = info_span!("handler", kind = %kind);

                let task = async move {
                    debug!("Handler started");
                    let result = tokio::select! {
                        biased;
                        () = token.cancelled() => Err(HandlerError::Cancelled),
                        outcome = tokio::time::timeout(timeout, handler.run(&snapshot)) => {
                            outcome.unwrap_or(Err(HandlerError::TimedOut(timeout)))
                        }
                    };
                    finish(kind, result)
                };

                (kind, tokio::spawn(task.instrument(span)))
            })
            .collect();

        PendingBranches::new(branches)
    }
}

/// Enforce field ownership on a successful delta and log the outcome.
fn finish(
    kind: HandlerKind,
    result: Result<StateDelta, HandlerError>,
) -> Result<StateDelta, HandlerError> {
    match result {
        Ok(delta) => {
            let (delta, dropped) = delta.restricted_to(kind);
            if dropped > 0 {
                warn!("Handler {kind} returned {dropped} entries outside its fields; dropped");
            }
            debug!("Handler finished, empty={}", delta.is_empty());
            Ok(delta)
        }
        Err(e) => {
            warn!("Handler {kind} failed: {e}");
            Err(e)
        }
    }
}
