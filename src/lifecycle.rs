//! Run lifecycle: setup provisioning and teardown reporting.
//!
//! Setup runs once before the timed portion of the run. It emits a
//! human-readable description of what is about to happen, then
//! sequentially provisions a small fixed number of authenticated users
//! (and optionally a few seed articles) with short pauses so the target
//! is not overwhelmed before the test even starts. Provisioning
//! failures are warnings: the run proceeds with degraded capability,
//! never aborts.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use goose::prelude::*;
use lazy_static::lazy_static;
use log::{info, warn};
use tokio::time::sleep;

use crate::api;
use crate::users::{self, ArticleDraft, ProvisionedUser, UserCredential};

/// Pause between sequential provisioning calls.
const PROVISION_PAUSE: Duration = Duration::from_millis(200);

/// Optional cloud-reporting project identifier; absence changes
/// nothing about local execution.
pub const PROJECT_ID_VAR: &str = "LOADTEST_PROJECT_ID";

/// Static description of one traffic shape, wired into its binary.
pub struct RunProfile {
    pub name: &'static str,
    /// Emitted at setup: what this run does and what it targets.
    pub description: &'static str,
    /// Emitted at teardown: how to read the results. Pure reporting.
    pub interpretation: &'static str,
    pub provision_users: usize,
    pub provision_articles: usize,
}

lazy_static! {
    // Captured once at setup; the soak dispatcher derives its phase
    // from this, not from iteration counts.
    static ref RUN_STARTED: RwLock<Option<Instant>> = RwLock::new(None);
}

fn mark_run_started() {
    let mut started = RUN_STARTED.write().expect("run clock lock poisoned");
    if started.is_none() {
        *started = Some(Instant::now());
    }
}

/// Wall-clock time since setup ran; zero before that.
pub fn run_elapsed() -> Duration {
    RUN_STARTED
        .read()
        .expect("run clock lock poisoned")
        .map(|started| started.elapsed())
        .unwrap_or_default()
}

/// The `test_start` body shared by every binary.
pub async fn setup(user: &mut GooseUser, run: &RunProfile) -> TransactionResult {
    mark_run_started();

    info!("starting {} run", run.name);
    for line in run.description.lines() {
        info!("  {}", line.trim());
    }
    if let Ok(project) = std::env::var(PROJECT_ID_VAR) {
        info!("cloud reporting project: {}", project);
    }

    let mut provisioned: Vec<ProvisionedUser> = Vec::with_capacity(run.provision_users);
    for _ in 0..run.provision_users {
        let credential = UserCredential::generate();
        let registered = api::register(user, &credential).await?;
        if registered.status != 200 {
            warn!(
                "setup: could not provision {} (status {})",
                credential.username, registered.status
            );
            sleep(PROVISION_PAUSE).await;
            continue;
        }
        sleep(PROVISION_PAUSE).await;

        match api::login(user, &credential.email, &credential.password).await? {
            Some(session) => provisioned.push(ProvisionedUser {
                credential,
                session,
            }),
            None => warn!(
                "setup: provisioned {} but could not log in",
                credential.username
            ),
        }
        sleep(PROVISION_PAUSE).await;
    }

    // Seed a few articles so early browse pages return content.
    if let Some(owner) = provisioned.first() {
        for _ in 0..run.provision_articles {
            let draft = ArticleDraft::generate();
            let _ = api::create_article(user, &owner.session.token, &draft).await?;
            sleep(PROVISION_PAUSE).await;
        }
    }

    if provisioned.is_empty() && run.provision_users > 0 {
        warn!("setup: no users provisioned; authenticated behaviors degrade to anonymous browsing");
    } else {
        info!("setup: provisioned {} users", provisioned.len());
    }
    users::store_provisioned(provisioned);

    Ok(())
}

/// The `test_stop` body shared by every binary: summarize what was
/// tested. No computation, no effect on correctness.
pub async fn teardown(_user: &mut GooseUser, run: &RunProfile) -> TransactionResult {
    info!("{} run complete", run.name);
    info!("provisioned users this run: {}", users::provisioned_count());
    info!("how to read the results:");
    for line in run.interpretation.lines() {
        info!("  {}", line.trim());
    }
    Ok(())
}
