//! Fan-Out Scheduler (§4.3, C4): parallel dispatch + sequential merge.
//!
//! Grounded in the teacher's `reasoning::executor::DefaultActionExecutor`:
//! one `FuturesUnordered` batch, no cross-task mutation, the parent merges
//! results after every task resolves. Narrowed to expert slots instead of
//! tool calls — there is no circuit breaker here, since a single expert
//! erroring is isolated by design (§4.3), not retried.

use crate::expert::{invoke_runner, ExpertGroupState, ExpertRunner};
use crate::mdt::state::MDTState;
use futures::stream::{FuturesUnordered, StreamExt};

/// Concurrently invoke `runner` for every non-terminal slot in `state`,
/// then merge the results back by key (§4.3 Contract).
pub async fn fan_out(state: &mut MDTState, runner: &dyn ExpertRunner) {
    let pending: Vec<ExpertGroupState> = state
        .expert_pool
        .values()
        .filter(|slot| !slot.is_terminal())
        .cloned()
        .collect();

    if pending.is_empty() {
        return;
    }

    let mut futures = FuturesUnordered::new();
    for slot in pending {
        futures.push(invoke_runner(runner, slot));
    }

    let mut updated = Vec::new();
    while let Some(result) = futures.next().await {
        if result.has_error {
            state
                .journal
                .record(format!("expert group {} failed this round", result.group_id));
        } else {
            state
                .journal
                .record(format!("expert group {} completed", result.group_id));
        }
        updated.push(result);
    }

    state.merge_slots(updated);
}
