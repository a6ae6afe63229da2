//! Weighted scenario selection.
//!
//! Each iteration draws one uniform random value in [0,1) and maps it
//! to a behavior through an ordered list of (cumulative upper bound,
//! behavior) pairs. The cut points are hardcoded per script so the
//! traffic mix stays comparable across runs; randomness is otherwise
//! uncontrolled, which is fine for load generation.

use std::time::Duration;

use goose::prelude::*;
use log::debug;
use rand::Rng;

use crate::lifecycle;
use crate::scenarios::{self, ScriptProfile};

/// One named user behavior. Every variant maps to a scenario function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Behavior {
    Browse,
    BrowseWithTags,
    AuthenticatedSession,
    FullWorkflow,
    PaginationSweep,
    ExtensiveBrowse,
    BulkOperations,
    MixedLoad,
    Burst,
    Fanout,
}

/// Ordered cumulative partition of [0,1). The last bound is 1.0.
pub type DispatchTable = [(f64, Behavior)];

/// Steady load: read-heavy, authenticated sessions that never write.
pub static LOAD_MIX: &DispatchTable = &[
    (0.4, Behavior::Browse),
    (0.7, Behavior::BrowseWithTags),
    (1.0, Behavior::AuthenticatedSession),
];

/// Stress ramps: 40% of the traffic exercises the full
/// register/login/create workflow.
pub static STRESS_MIX: &DispatchTable = &[
    (0.3, Behavior::Browse),
    (0.6, Behavior::AuthenticatedSession),
    (1.0, Behavior::FullWorkflow),
];

/// Spike: rapid-fire bursts and batched fan-out, with a sliver of
/// ordinary browsing for contrast.
pub static SPIKE_MIX: &DispatchTable = &[
    (0.5, Behavior::Burst),
    (0.8, Behavior::Fanout),
    (1.0, Behavior::Browse),
];

/// Volume: deliberate pagination stress, bounded deep scans, and
/// read-dominant bulk operations.
pub static VOLUME_MIX: &DispatchTable = &[
    (0.4, Behavior::PaginationSweep),
    (0.75, Behavior::ExtensiveBrowse),
    (1.0, Behavior::BulkOperations),
];

static SOAK_WARMUP_MIX: &DispatchTable =
    &[(0.7, Behavior::Browse), (1.0, Behavior::MixedLoad)];

static SOAK_STEADY_MIX: &DispatchTable = &[
    (0.4, Behavior::Browse),
    (0.7, Behavior::AuthenticatedSession),
    (1.0, Behavior::MixedLoad),
];

static SOAK_RAMPDOWN_MIX: &DispatchTable = &[(1.0, Behavior::Browse)];

/// End of the soak warmup phase.
pub const SOAK_WARMUP: Duration = Duration::from_secs(5 * 60);
/// End of the soak steady phase; everything after is ramp-down.
pub const SOAK_STEADY_END: Duration = Duration::from_secs(35 * 60);

/// The soak run's behavior mix depends on wall-clock time since the
/// run started, not on iteration count: the first five minutes favor
/// simple browsing, the steady phase mixes in authenticated sessions,
/// and the ramp-down collapses to browsing only.
pub fn soak_table(elapsed: Duration) -> &'static DispatchTable {
    if elapsed < SOAK_WARMUP {
        SOAK_WARMUP_MIX
    } else if elapsed < SOAK_STEADY_END {
        SOAK_STEADY_MIX
    } else {
        SOAK_RAMPDOWN_MIX
    }
}

/// Map one uniform draw to a behavior: the first bound exceeding the
/// draw wins, evaluated in order.
pub fn pick(table: &DispatchTable, draw: f64) -> Behavior {
    for (bound, behavior) in table {
        if draw < *bound {
            return *behavior;
        }
    }
    // Unreachable for draws in [0,1) with a well-formed table.
    table.last().map(|(_, behavior)| *behavior).unwrap_or(Behavior::Browse)
}

/// Per-virtual-user state, owned by the user's session so concurrent
/// users never race on a shared counter.
struct VuState {
    iterations: usize,
}

fn bump_iterations(user: &mut GooseUser) -> usize {
    let next = user
        .get_session_data::<VuState>()
        .map(|state| state.iterations + 1)
        .unwrap_or(1);
    user.set_session_data(VuState { iterations: next });
    next
}

/// One virtual-user iteration: draw, dispatch, run.
pub async fn run_iteration(
    user: &mut GooseUser,
    table: &DispatchTable,
    script: &ScriptProfile,
) -> TransactionResult {
    let draw = rand::thread_rng().gen::<f64>();
    let behavior = pick(table, draw);
    let iterations = bump_iterations(user);
    if iterations % 100 == 0 {
        debug!(
            "virtual user at iteration {}, dispatching {:?}",
            iterations, behavior
        );
    }
    scenarios::run(user, behavior, script).await
}

/// Soak variant of [`run_iteration`]: the table is chosen per
/// iteration from elapsed run time.
pub async fn run_soak_iteration(
    user: &mut GooseUser,
    script: &ScriptProfile,
) -> TransactionResult {
    let table = soak_table(lifecycle::run_elapsed());
    run_iteration(user, table, script).await
}
