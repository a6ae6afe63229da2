//! Spike test: a sudden burst far above baseline, then recovery.
//!
//! Holds a 10-user baseline, jumps to 300 users in 20 seconds, holds
//! the spike for a minute, and drops back. Responses are judged under
//! the relaxed spike classification: a 429 means the target is
//! shedding load it cannot absorb, which is acceptable; a 5xx or no
//! response at all means it fell over, which is not.
//!
//! Run with:
//!     cargo run --release --bin spike -- --host http://localhost:3000

use goose::prelude::*;

use conduit_loadtest::dispatch::{self, SPIKE_MIX};
use conduit_loadtest::lifecycle::{self, RunProfile};
use conduit_loadtest::scenarios::{Pacing, ScriptProfile};
use conduit_loadtest::thresholds::{self, Expectation, Threshold};

static PROFILE: RunProfile = RunProfile {
    name: "spike",
    description: "10-user baseline, 300-user spike for one minute, recovery:\n\
                  50% rapid-fire bursts, 30% batched fan-out, 20% browse\n\
                  429 responses count as acceptable degradation",
    interpretation: "watch the recovery window after the spike: latency should\n\
                     return to baseline within a minute; 5xx responses or\n\
                     timeouts during the spike mean the target failed rather\n\
                     than shed load",
    provision_users: 0,
    provision_articles: 0,
};

static SCRIPT: ScriptProfile = ScriptProfile {
    pacing: Pacing {
        min_ms: 0,
        max_ms: 200,
    },
    create_probability: 0.0,
};

static THRESHOLDS: &[Threshold] = &[
    Threshold {
        name: "p95 under 3s through the spike",
        expectation: Expectation::P95BelowMs(3_000),
    },
    Threshold {
        // 429s are reclassified as successes, so this counts real
        // failures only.
        name: "hard failures under 10%",
        expectation: Expectation::FailRateBelow(0.10),
    },
];

async fn setup(user: &mut GooseUser) -> TransactionResult {
    lifecycle::setup(user, &PROFILE).await
}

async fn teardown(user: &mut GooseUser) -> TransactionResult {
    lifecycle::teardown(user, &PROFILE).await
}

async fn user_iteration(user: &mut GooseUser) -> TransactionResult {
    dispatch::run_iteration(user, SPIKE_MIX, &SCRIPT).await
}

#[tokio::main]
async fn main() -> Result<(), GooseError> {
    let metrics = GooseAttack::initialize()?
        .register_scenario(
            scenario!("SpikeTraffic")
                .register_transaction(transaction!(user_iteration).set_name("spike iteration")),
        )
        .test_start(transaction!(setup))
        .test_stop(transaction!(teardown))
        .set_default(GooseDefault::Host, "http://localhost:3000")?
        .set_default(
            GooseDefault::TestPlan,
            "10,30s;10,1m;300,20s;300,1m;10,30s;10,1m;0,10s",
        )?
        .execute()
        .await?;

    if !thresholds::evaluate(&metrics, THRESHOLDS) {
        std::process::exit(1);
    }
    Ok(())
}
