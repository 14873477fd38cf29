//! Deterministic fold of handler deltas into the turn state.

use tracing::debug;

use crate::barrier::BranchOutcome;
use crate::state::{StateDelta, TurnState};

/// Combines partial handler outputs into one turn result.
///
/// Every list is concatenated in the order the deltas are given, which the
/// engine fixes to dispatch order. Fields no delta touches pass through
/// unchanged. The fold is associative, so merging `[a, b, c]` equals merging
/// `[a.combine(b), c]` or merging `c` into the merge of `[a, b]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateMerger;

impl StateMerger {
    #[must_use]
    pub fn merge<'a>(
        base: &TurnState,
        deltas: impl IntoIterator<Item = &'a StateDelta>,
    ) -> TurnState {
        let mut merged = base.clone();
        for delta in deltas {
            merged
                .recommended_books
                .extend(delta.recommended_books.iter().cloned());
            merged.read_books.extend(delta.read_books.iter().cloned());
            merged.preferences.extend(delta.preferences.iter().cloned());
            merged.messages.extend(delta.messages.iter().cloned());
        }
        merged
    }

    /// Merge the successful branches, skipping failed ones.
    #[must_use]
    pub fn merge_outcomes(base: &TurnState, outcomes: &[BranchOutcome]) -> TurnState {
        let merged = Self::merge(base, outcomes.iter().filter_map(BranchOutcome::delta));
        debug!(
            "Merged {} of {} branch outcomes",
            outcomes.iter().filter(|o| o.result.is_ok()).count(),
            outcomes.len()
        );
        merged
    }
}
