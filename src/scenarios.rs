//! One function per named user behavior.
//!
//! Each scenario composes a short sequence of API calls with think-time
//! pauses drawn from the script's pacing. All of them soft-fail: a bad
//! response is recorded by the helper that made it and the scenario
//! carries on (or, where a later step depends on the failed one,
//! returns early without failing the run).

use std::time::Duration;

use goose::prelude::*;
use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use tokio::time::sleep;

use crate::api;
use crate::client::{self, BatchSpec, Outcome};
use crate::dispatch::Behavior;
use crate::users::{self, ArticleDraft, UserCredential};

/// Think-time range in milliseconds; tighter for spike and stress
/// shapes, looser for load and soak.
#[derive(Clone, Copy, Debug)]
pub struct Pacing {
    pub min_ms: u64,
    pub max_ms: u64,
}

/// Per-binary knobs threaded through the scenario functions.
#[derive(Clone, Copy, Debug)]
pub struct ScriptProfile {
    pub pacing: Pacing,
    /// Probability that an authenticated session creates an article.
    /// Steady load passes 0.0: not every scenario that could create
    /// data does create data.
    pub create_probability: f64,
}

/// Default page size for ordinary browsing.
pub const BROWSE_PAGE_SIZE: usize = 10;
/// Chance that a browsing user continues to a second page.
pub const SECOND_PAGE_PROBABILITY: f64 = 0.3;

/// Candidate page sizes for the volume pagination sweep.
pub const SWEEP_LIMITS: [usize; 3] = [10, 20, 50];
/// Candidate offsets for the volume pagination sweep; the high offsets
/// are the point of the exercise.
pub const SWEEP_OFFSETS: [usize; 6] = [0, 50, 100, 200, 500, 1000];

/// Fixed page size for the extensive-browse scan.
pub const EXTENSIVE_PAGE_SIZE: usize = 20;
pub const EXTENSIVE_MIN_PAGES: usize = 3;
pub const EXTENSIVE_MAX_PAGES: usize = 10;

/// Offsets swept by the bulk-operations scenario.
pub const BULK_OFFSETS: [usize; 5] = [0, 20, 40, 60, 80];
/// Bulk operations are read-dominant; writes are rare by design.
pub const BULK_CREATE_PROBABILITY: f64 = 0.1;

async fn think(pacing: &Pacing) {
    if pacing.max_ms == 0 {
        return;
    }
    let pause = rand::thread_rng().gen_range(pacing.min_ms..=pacing.max_ms);
    sleep(Duration::from_millis(pause)).await;
}

/// Dispatch a selected behavior to its scenario function.
pub async fn run(
    user: &mut GooseUser,
    behavior: Behavior,
    script: &ScriptProfile,
) -> TransactionResult {
    match behavior {
        Behavior::Browse => browse(user, script).await,
        Behavior::BrowseWithTags => browse_with_tags(user, script).await,
        Behavior::AuthenticatedSession => authenticated_session(user, script).await,
        Behavior::FullWorkflow => full_workflow(user, script).await,
        Behavior::PaginationSweep => pagination_sweep(user, script).await,
        Behavior::ExtensiveBrowse => extensive_browse(user, script).await,
        Behavior::BulkOperations => bulk_operations(user, script).await,
        Behavior::MixedLoad => mixed_load(user, script).await,
        Behavior::Burst => burst(user, script).await,
        Behavior::Fanout => fanout(user, script).await,
    }
}

/// Fetch the first article page; with fixed probability continue to a
/// second page at the incremented offset.
pub async fn browse(user: &mut GooseUser, script: &ScriptProfile) -> TransactionResult {
    api::fetch_articles(user, BROWSE_PAGE_SIZE, 0, None).await?;
    think(&script.pacing).await;
    if rand::thread_rng().gen::<f64>() < SECOND_PAGE_PROBABILITY {
        api::fetch_articles(user, BROWSE_PAGE_SIZE, BROWSE_PAGE_SIZE, None).await?;
    }
    Ok(())
}

/// Fetch the tag list, pause, then browse.
pub async fn browse_with_tags(user: &mut GooseUser, script: &ScriptProfile) -> TransactionResult {
    api::fetch_tags(user).await?;
    think(&script.pacing).await;
    browse(user, script).await
}

/// Browse, then fetch the own profile with a provisioned token. When no
/// provisioned user is available the session degrades to anonymous
/// browsing. With `create_probability` the session also publishes one
/// article.
pub async fn authenticated_session(
    user: &mut GooseUser,
    script: &ScriptProfile,
) -> TransactionResult {
    browse(user, script).await?;
    think(&script.pacing).await;

    let provisioned = match users::pick_provisioned() {
        Some(provisioned) => provisioned,
        None => {
            debug!("no provisioned users; session stays anonymous");
            return Ok(());
        }
    };
    api::fetch_profile(user, &provisioned.session.token).await?;

    if rand::thread_rng().gen::<f64>() < script.create_probability {
        think(&script.pacing).await;
        let draft = ArticleDraft::generate();
        api::create_article(user, &provisioned.session.token, &draft).await?;
    }
    Ok(())
}

/// The full register -> login -> act chain with a fresh identity.
///
/// If registration or login fails the rest of the workflow is dropped
/// for this iteration only; the half-provisioned account is left behind
/// on the target, accepted pollution for a load generator.
pub async fn full_workflow(user: &mut GooseUser, script: &ScriptProfile) -> TransactionResult {
    let credential = UserCredential::generate();

    let registered = api::register(user, &credential).await?;
    if registered.status != 200 {
        warn!(
            "workflow: registration refused for {} (status {}), dropping iteration",
            credential.username, registered.status
        );
        return Ok(());
    }
    think(&script.pacing).await;

    let session = match api::login(user, &credential.email, &credential.password).await? {
        Some(session) => session,
        None => {
            warn!(
                "workflow: authentication unavailable for {}, dropping iteration",
                credential.username
            );
            return Ok(());
        }
    };

    api::fetch_profile(user, &session.token).await?;
    think(&script.pacing).await;
    api::fetch_articles(user, BROWSE_PAGE_SIZE, 0, Some(&session.token)).await?;
    think(&script.pacing).await;

    let draft = ArticleDraft::generate();
    if let Some(slug) = api::create_article(user, &session.token, &draft).await? {
        api::favorite_article(user, &session.token, &slug).await?;
    }
    Ok(())
}

/// Draw one (limit, offset) pair from the fixed candidate sets.
pub fn sweep_request(rng: &mut impl Rng) -> (usize, usize) {
    let limit = SWEEP_LIMITS.choose(rng).copied().unwrap_or(SWEEP_LIMITS[0]);
    let offset = SWEEP_OFFSETS
        .choose(rng)
        .copied()
        .unwrap_or(SWEEP_OFFSETS[0]);
    (limit, offset)
}

/// One fetch at a random page size and offset, including deliberately
/// deep offsets; the high-offset stress pattern of the volume shape.
pub async fn pagination_sweep(user: &mut GooseUser, _script: &ScriptProfile) -> TransactionResult {
    let (limit, offset) = sweep_request(&mut rand::thread_rng());
    api::fetch_articles(user, limit, offset, None).await?;
    Ok(())
}

/// Strictly increasing offsets for a bounded page walk.
pub fn browse_plan(rng: &mut impl Rng) -> Vec<usize> {
    let pages = rng.gen_range(EXTENSIVE_MIN_PAGES..=EXTENSIVE_MAX_PAGES);
    (0..pages).map(|page| page * EXTENSIVE_PAGE_SIZE).collect()
}

/// Walk 3 to 10 pages in strictly increasing offset order, stopping at
/// the first non-200 response. A bounded scan, never an unbounded loop.
pub async fn extensive_browse(user: &mut GooseUser, script: &ScriptProfile) -> TransactionResult {
    let plan = browse_plan(&mut rand::thread_rng());
    for offset in plan {
        let response = api::fetch_articles(user, EXTENSIVE_PAGE_SIZE, offset, None).await?;
        if response.status != 200 {
            debug!("extensive browse stopped at offset {} (status {})", offset, response.status);
            break;
        }
        think(&script.pacing).await;
    }
    Ok(())
}

/// Profile fetch, then a sweep of the user's own articles with early
/// exit on the first failure, then a rare write.
pub async fn bulk_operations(user: &mut GooseUser, script: &ScriptProfile) -> TransactionResult {
    let provisioned = match users::pick_provisioned() {
        Some(provisioned) => provisioned,
        None => {
            // Degraded: the same read pressure without authentication.
            for offset in BULK_OFFSETS {
                let response =
                    api::fetch_articles(user, EXTENSIVE_PAGE_SIZE, offset, None).await?;
                if response.status != 200 {
                    break;
                }
            }
            return Ok(());
        }
    };

    api::fetch_profile(user, &provisioned.session.token).await?;
    think(&script.pacing).await;

    for offset in BULK_OFFSETS {
        let response = api::fetch_own_articles(
            user,
            &provisioned.session.token,
            &provisioned.credential.username,
            EXTENSIVE_PAGE_SIZE,
            offset,
        )
        .await?;
        if response.status != 200 {
            break;
        }
    }

    if rand::thread_rng().gen::<f64>() < BULK_CREATE_PROBABILITY {
        let draft = ArticleDraft::generate();
        api::create_article(user, &provisioned.session.token, &draft).await?;
    }
    Ok(())
}

/// Soak filler: tags, a browse, and one deeper page.
pub async fn mixed_load(user: &mut GooseUser, script: &ScriptProfile) -> TransactionResult {
    api::fetch_tags(user).await?;
    think(&script.pacing).await;
    browse(user, script).await?;
    think(&script.pacing).await;
    let offset = rand::thread_rng().gen_range(0..=10) * EXTENSIVE_PAGE_SIZE;
    api::fetch_articles(user, EXTENSIVE_PAGE_SIZE, offset, None).await?;
    Ok(())
}

/// Fixed rapid-fire sequence with zero inter-request pauses, judged
/// under the relaxed spike classification.
const BURST_SEQUENCE: &[(&str, &str)] = &[
    ("/api/articles?limit=10&offset=0", "burst articles"),
    ("/api/tags", "burst tags"),
    ("/api/articles?limit=10&offset=10", "burst articles"),
    ("/api/articles?limit=10&offset=20", "burst articles"),
    ("/api/tags", "burst tags"),
];

pub async fn burst(user: &mut GooseUser, _script: &ScriptProfile) -> TransactionResult {
    for (path, name) in BURST_SEQUENCE {
        let mut response =
            client::send(user, GooseMethod::Get, path, name, None, None).await?;
        client::check_spike(user, &mut response, name);
    }
    Ok(())
}

/// Batched multi-URL fan-out issued concurrently, with a local
/// majority-success check over the ordered replies.
pub async fn fanout(user: &mut GooseUser, _script: &ScriptProfile) -> TransactionResult {
    let specs = [
        BatchSpec::get("/api/articles?limit=10&offset=0"),
        BatchSpec::get("/api/articles?limit=10&offset=10"),
        BatchSpec::get("/api/tags"),
        BatchSpec::get("/api/articles?limit=20&offset=40"),
    ];
    let replies = client::batch(user, &specs).await?;

    let acceptable = replies
        .iter()
        .filter(|reply| client::classify(reply.status) != Outcome::Failure)
        .count();
    if acceptable * 2 <= replies.len() {
        warn!(
            "spike fanout: only {}/{} batched requests acceptable",
            acceptable,
            replies.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_draws_stay_inside_the_candidate_sets() {
        let mut rng = rand::thread_rng();
        for _ in 0..1_000 {
            let (limit, offset) = sweep_request(&mut rng);
            assert!(SWEEP_LIMITS.contains(&limit));
            assert!(SWEEP_OFFSETS.contains(&offset));
        }
    }

    #[test]
    fn browse_plans_are_bounded_and_strictly_increasing() {
        let mut rng = rand::thread_rng();
        for _ in 0..1_000 {
            let plan = browse_plan(&mut rng);
            assert!(plan.len() >= EXTENSIVE_MIN_PAGES);
            assert!(plan.len() <= EXTENSIVE_MAX_PAGES);
            assert_eq!(plan[0], 0);
            for window in plan.windows(2) {
                assert!(window[1] > window[0]);
                assert_eq!(window[1] - window[0], EXTENSIVE_PAGE_SIZE);
            }
        }
    }

    #[test]
    fn early_exit_never_walks_past_the_first_failure() {
        // Simulate the scan's stopping rule over synthetic statuses.
        let statuses = [200, 200, 500, 200, 200, 200];
        let plan: Vec<usize> = (0..statuses.len()).map(|p| p * EXTENSIVE_PAGE_SIZE).collect();
        let mut issued = 0;
        for (offset, status) in plan.iter().zip(statuses.iter()) {
            issued += 1;
            let _ = offset;
            if *status != 200 {
                break;
            }
        }
        assert_eq!(issued, 3);
        assert!(issued <= EXTENSIVE_MAX_PAGES);
    }
}
