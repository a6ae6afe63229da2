//! Volume test: pagination and bulk-read pressure.
//!
//! Thirty virtual users for ten minutes, with the mix skewed toward
//! deliberately deep pagination: random sweeps over high offsets,
//! bounded multi-page scans, and read-dominant bulk operations against
//! a provisioned user's own articles.
//!
//! Run with:
//!     cargo run --release --bin volume -- --host http://localhost:3000

use goose::prelude::*;

use conduit_loadtest::dispatch::{self, VOLUME_MIX};
use conduit_loadtest::lifecycle::{self, RunProfile};
use conduit_loadtest::scenarios::{Pacing, ScriptProfile};
use conduit_loadtest::thresholds::{self, Expectation, Threshold};

static PROFILE: RunProfile = RunProfile {
    name: "volume",
    description: "30 virtual users for 10 minutes, pagination-heavy:\n\
                  40% random limit/offset sweeps (offsets up to 1000),\n\
                  35% bounded multi-page scans, 25% bulk own-article reads",
    interpretation: "compare latency at offset 0 against offset 500+ in the\n\
                     per-request tables: a widening gap means list queries\n\
                     degrade with depth (missing index, offset pagination)",
    provision_users: 3,
    provision_articles: 5,
};

static SCRIPT: ScriptProfile = ScriptProfile {
    pacing: Pacing {
        min_ms: 300,
        max_ms: 1_500,
    },
    create_probability: 0.0,
};

static THRESHOLDS: &[Threshold] = &[
    Threshold {
        name: "p95 under 1s despite deep offsets",
        expectation: Expectation::P95BelowMs(1_000),
    },
    Threshold {
        name: "failures under 2%",
        expectation: Expectation::FailRateBelow(0.02),
    },
];

async fn setup(user: &mut GooseUser) -> TransactionResult {
    lifecycle::setup(user, &PROFILE).await
}

async fn teardown(user: &mut GooseUser) -> TransactionResult {
    lifecycle::teardown(user, &PROFILE).await
}

async fn user_iteration(user: &mut GooseUser) -> TransactionResult {
    dispatch::run_iteration(user, VOLUME_MIX, &SCRIPT).await
}

#[tokio::main]
async fn main() -> Result<(), GooseError> {
    let metrics = GooseAttack::initialize()?
        .register_scenario(
            scenario!("VolumeTraffic")
                .register_transaction(transaction!(user_iteration).set_name("volume iteration")),
        )
        .test_start(transaction!(setup))
        .test_stop(transaction!(teardown))
        .set_default(GooseDefault::Host, "http://localhost:3000")?
        .set_default(GooseDefault::TestPlan, "30,1m;30,10m;0,30s")?
        .execute()
        .await?;

    if !thresholds::evaluate(&metrics, THRESHOLDS) {
        std::process::exit(1);
    }
    Ok(())
}
