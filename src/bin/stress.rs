//! Stress test: stepped ramps well past the expected capacity.
//!
//! Climbs through 50, 100 and 200 virtual users with a hold at each
//! step. 40% of the traffic runs the full registration workflow, so
//! the write path is under pressure too.
//!
//! Run with:
//!     cargo run --release --bin stress -- --host http://localhost:3000

use goose::prelude::*;

use conduit_loadtest::dispatch::{self, STRESS_MIX};
use conduit_loadtest::lifecycle::{self, RunProfile};
use conduit_loadtest::scenarios::{Pacing, ScriptProfile};
use conduit_loadtest::thresholds::{self, Expectation, Threshold};

static PROFILE: RunProfile = RunProfile {
    name: "stress",
    description: "stepped ramps to 50, 100 and 200 virtual users:\n\
                  30% browse, 30% authenticated session (10% of which write),\n\
                  40% full register/login/create workflow",
    interpretation: "the interesting number is where p95 starts climbing:\n\
                     that step is the effective capacity of the target;\n\
                     failures during the 200-user step are expected, failures\n\
                     during the 50-user step are not",
    provision_users: 3,
    provision_articles: 2,
};

static SCRIPT: ScriptProfile = ScriptProfile {
    pacing: Pacing {
        min_ms: 500,
        max_ms: 2_000,
    },
    create_probability: 0.1,
};

static THRESHOLDS: &[Threshold] = &[
    Threshold {
        name: "p95 under 2s even while ramping",
        expectation: Expectation::P95BelowMs(2_000),
    },
    Threshold {
        name: "failures under 5%",
        expectation: Expectation::FailRateBelow(0.05),
    },
];

async fn setup(user: &mut GooseUser) -> TransactionResult {
    lifecycle::setup(user, &PROFILE).await
}

async fn teardown(user: &mut GooseUser) -> TransactionResult {
    lifecycle::teardown(user, &PROFILE).await
}

async fn user_iteration(user: &mut GooseUser) -> TransactionResult {
    dispatch::run_iteration(user, STRESS_MIX, &SCRIPT).await
}

#[tokio::main]
async fn main() -> Result<(), GooseError> {
    let metrics = GooseAttack::initialize()?
        .register_scenario(
            scenario!("StressTraffic")
                .register_transaction(transaction!(user_iteration).set_name("stress iteration")),
        )
        .test_start(transaction!(setup))
        .test_stop(transaction!(teardown))
        .set_default(GooseDefault::Host, "http://localhost:3000")?
        .set_default(
            GooseDefault::TestPlan,
            "50,2m;50,3m;100,2m;100,3m;200,2m;200,3m;0,1m",
        )?
        .execute()
        .await?;

    if !thresholds::evaluate(&metrics, THRESHOLDS) {
        std::process::exit(1);
    }
    Ok(())
}
