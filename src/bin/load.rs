//! Steady-load test: a modest, constant level of mixed read traffic.
//!
//! Ramps to 20 virtual users over a minute, holds for five minutes,
//! then ramps down. Authenticated sessions in this shape never create
//! content, so repeated runs do not pollute the shared target data.
//!
//! Run against a local target with:
//!     cargo run --release --bin load -- --host http://localhost:3000

use goose::prelude::*;

use conduit_loadtest::dispatch::{self, LOAD_MIX};
use conduit_loadtest::lifecycle::{self, RunProfile};
use conduit_loadtest::scenarios::{Pacing, ScriptProfile};
use conduit_loadtest::thresholds::{self, Expectation, Threshold};

static PROFILE: RunProfile = RunProfile {
    name: "steady load",
    description: "constant mixed read traffic at 20 virtual users:\n\
                  40% browse, 30% browse with tags, 30% authenticated session\n\
                  (sessions never create content in this shape)",
    interpretation: "healthy: p95 under 500ms and failures under 1%\n\
                     rising p95 at this level means the target cannot sustain\n\
                     even nominal traffic; investigate before running stress",
    provision_users: 3,
    provision_articles: 2,
};

static SCRIPT: ScriptProfile = ScriptProfile {
    pacing: Pacing {
        min_ms: 1_000,
        max_ms: 5_000,
    },
    create_probability: 0.0,
};

static THRESHOLDS: &[Threshold] = &[
    Threshold {
        name: "p95 under 500ms",
        expectation: Expectation::P95BelowMs(500),
    },
    Threshold {
        name: "failures under 1%",
        expectation: Expectation::FailRateBelow(0.01),
    },
];

async fn setup(user: &mut GooseUser) -> TransactionResult {
    lifecycle::setup(user, &PROFILE).await
}

async fn teardown(user: &mut GooseUser) -> TransactionResult {
    lifecycle::teardown(user, &PROFILE).await
}

async fn user_iteration(user: &mut GooseUser) -> TransactionResult {
    dispatch::run_iteration(user, LOAD_MIX, &SCRIPT).await
}

#[tokio::main]
async fn main() -> Result<(), GooseError> {
    let metrics = GooseAttack::initialize()?
        .register_scenario(
            scenario!("MixedTraffic")
                .register_transaction(transaction!(user_iteration).set_name("steady iteration")),
        )
        .test_start(transaction!(setup))
        .test_stop(transaction!(teardown))
        .set_default(GooseDefault::Host, "http://localhost:3000")?
        .set_default(GooseDefault::TestPlan, "20,1m;20,5m;0,30s")?
        .execute()
        .await?;

    if !thresholds::evaluate(&metrics, THRESHOLDS) {
        std::process::exit(1);
    }
    Ok(())
}
