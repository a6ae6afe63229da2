//! Soak test: a long steady run to expose slow degradation.
//!
//! Twenty-five virtual users for roughly forty minutes. Unlike the
//! other shapes, the behavior mix here is a function of wall-clock
//! time since the run started: the first five minutes favor simple
//! browsing while the target warms up, the steady phase mixes in
//! authenticated sessions, and after minute 35 the mix collapses to
//! browsing only for the ramp-down.
//!
//! Run with:
//!     cargo run --release --bin soak -- --host http://localhost:3000

use goose::prelude::*;

use conduit_loadtest::dispatch;
use conduit_loadtest::lifecycle::{self, RunProfile};
use conduit_loadtest::scenarios::{Pacing, ScriptProfile};
use conduit_loadtest::thresholds::{self, Expectation, Threshold};

static PROFILE: RunProfile = RunProfile {
    name: "soak",
    description: "25 virtual users for ~40 minutes, time-phased mix:\n\
                  minutes 0-5: 70% browse / 30% mixed load\n\
                  minutes 5-35: 40% browse / 30% authenticated / 30% mixed\n\
                  minutes 35+: browse only (ramp-down)",
    interpretation: "soak failures show up as drift, not spikes: compare p95\n\
                     between the first and last ten minutes of the steady\n\
                     phase; creeping latency or a growing failure rate at a\n\
                     constant user count suggests a leak or resource creep",
    provision_users: 3,
    provision_articles: 2,
};

static SCRIPT: ScriptProfile = ScriptProfile {
    pacing: Pacing {
        min_ms: 2_000,
        max_ms: 6_000,
    },
    create_probability: 0.0,
};

static THRESHOLDS: &[Threshold] = &[
    Threshold {
        name: "p95 under 800ms across the whole run",
        expectation: Expectation::P95BelowMs(800),
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
    dispatch::run_soak_iteration(user, &SCRIPT).await
}

#[tokio::main]
async fn main() -> Result<(), GooseError> {
    let metrics = GooseAttack::initialize()?
        .register_scenario(
            scenario!("SoakTraffic")
                .register_transaction(transaction!(user_iteration).set_name("soak iteration")),
        )
        .test_start(transaction!(setup))
        .test_stop(transaction!(teardown))
        .set_default(GooseDefault::Host, "http://localhost:3000")?
        .set_default(GooseDefault::TestPlan, "25,5m;25,30m;0,5m")?
        .execute()
        .await?;

    if !thresholds::evaluate(&metrics, THRESHOLDS) {
        std::process::exit(1);
    }
    Ok(())
}
