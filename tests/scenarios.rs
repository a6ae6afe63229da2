//! Scenario behavior against mocked responses: graceful degradation,
//! bounded scans, and spike classification.

use std::sync::Mutex;

use httpmock::prelude::*;
use serde_json::json;
use serial_test::serial;

use goose::prelude::*;

use conduit_loadtest::client::{self, BatchSpec};
use conduit_loadtest::lifecycle::{self, RunProfile};
use conduit_loadtest::scenarios::{self, Pacing, ScriptProfile};
use conduit_loadtest::users;

mod common;

const NO_PAUSE: ScriptProfile = ScriptProfile {
    pacing: Pacing {
        min_ms: 0,
        max_ms: 0,
    },
    create_probability: 0.0,
};

async fn workflow(user: &mut GooseUser) -> TransactionResult {
    scenarios::full_workflow(user, &NO_PAUSE).await
}

async fn extensive(user: &mut GooseUser) -> TransactionResult {
    scenarios::extensive_browse(user, &NO_PAUSE).await
}

async fn burst(user: &mut GooseUser) -> TransactionResult {
    scenarios::burst(user, &NO_PAUSE).await
}

async fn authenticated(user: &mut GooseUser) -> TransactionResult {
    scenarios::authenticated_session(user, &NO_PAUSE).await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn refused_login_skips_dependent_steps() {
    let server = MockServer::start();

    let register = server.mock(|when, then| {
        when.method(POST).path("/api/users");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"user": {"username": "u", "email": "u@x", "token": "t"}}));
    });
    let login = server.mock(|when, then| {
        when.method(POST).path("/api/users/login");
        then.status(401)
            .header("content-type", "application/json")
            .json_body(json!({"errors": {"body": ["unauthorized"]}}));
    });
    let create = server.mock(|when, then| {
        when.method(POST).path("/api/articles");
        then.status(200).json_body(json!({"article": {"slug": "x"}}));
    });

    let configuration = common::build_configuration(&server, vec!["--iterations", "2"]);
    let goose_attack = GooseAttack::initialize_with_config(configuration)
        .expect("failed to initialize")
        .register_scenario(
            scenario!("Workflow").register_transaction(transaction!(workflow)),
        );
    let _metrics = common::run_load_test(goose_attack).await;

    // Authentication was unavailable; the workflow degraded instead of
    // propagating an error, and nothing authenticated ran.
    assert_eq!(register.hits(), 2);
    assert_eq!(login.hits(), 2);
    assert_eq!(create.hits(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn extensive_browse_stops_at_the_first_failing_page() {
    let server = MockServer::start();

    let first_page = server.mock(|when, then| {
        when.method(GET).path("/api/articles").query_param("offset", "0");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"articles": [], "articlesCount": 0}));
    });
    let failing_page = server.mock(|when, then| {
        when.method(GET)
            .path("/api/articles")
            .query_param("offset", "20");
        then.status(500).body("internal error");
    });
    // Sentinel: the page after the failure must never be requested.
    let beyond_failure = server.mock(|when, then| {
        when.method(GET)
            .path("/api/articles")
            .query_param("offset", "40");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"articles": [], "articlesCount": 0}));
    });

    let configuration = common::build_configuration(&server, vec!["--iterations", "3"]);
    let goose_attack = GooseAttack::initialize_with_config(configuration)
        .expect("failed to initialize")
        .register_scenario(
            scenario!("ExtensiveBrowse").register_transaction(transaction!(extensive)),
        );
    let _metrics = common::run_load_test(goose_attack).await;

    assert_eq!(first_page.hits(), 3);
    assert_eq!(failing_page.hits(), 3);
    assert_eq!(beyond_failure.hits(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn burst_counts_rate_limiting_as_acceptable() {
    let server = MockServer::start();

    let articles = server.mock(|when, then| {
        when.method(GET).path("/api/articles");
        then.status(429)
            .header("content-type", "application/json")
            .json_body(json!({"errors": {"body": ["rate limited"]}}));
    });
    let tags = server.mock(|when, then| {
        when.method(GET).path("/api/tags");
        then.status(429).body("slow down");
    });

    let configuration = common::build_configuration(&server, vec!["--iterations", "2"]);
    let goose_attack = GooseAttack::initialize_with_config(configuration)
        .expect("failed to initialize")
        .register_scenario(scenario!("Burst").register_transaction(transaction!(burst)));
    let metrics = common::run_load_test(goose_attack).await;

    // The burst sequence is 3 article fetches and 2 tag fetches.
    assert_eq!(articles.hits(), 6);
    assert_eq!(tags.hits(), 4);

    // Every 429 was reclassified as acceptable degradation, so the
    // aggregate metrics show no failed requests.
    let mut success = 0;
    let mut fail = 0;
    for aggregate in metrics.requests.values() {
        success += aggregate.success_count;
        fail += aggregate.fail_count;
    }
    assert_eq!(fail, 0, "429s must not count as failures under spike rules");
    assert_eq!(success, 10);
}

// Captures what one batched fan-out observed so the test body can
// assert on it after the run.
static BATCH_REPLIES: Mutex<Vec<(u16, String)>> = Mutex::new(Vec::new());

async fn ordered_batch(user: &mut GooseUser) -> TransactionResult {
    let specs = [
        BatchSpec::get("/first"),
        BatchSpec::get("/second"),
        // Fully-qualified URL nothing listens on; the reply must still
        // arrive, as status 0, in its submitted position.
        BatchSpec::get("http://127.0.0.1:1/unreachable"),
        BatchSpec::get("/third"),
    ];
    let replies = client::batch(user, &specs).await?;

    let mut captured = BATCH_REPLIES.lock().expect("replies lock poisoned");
    *captured = replies
        .iter()
        .map(|reply| (reply.status, reply.body.clone()))
        .collect();
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn batched_replies_come_back_in_submission_order() {
    let server = MockServer::start();

    // Distinguishable bodies so reordering would be visible.
    server.mock(|when, then| {
        when.method(GET).path("/first");
        then.status(200).body("alpha");
    });
    server.mock(|when, then| {
        when.method(GET).path("/second");
        then.status(503).body("beta");
    });
    server.mock(|when, then| {
        when.method(GET).path("/third");
        then.status(200).body("gamma");
    });

    let configuration = common::build_configuration(&server, vec!["--iterations", "1"]);
    let goose_attack = GooseAttack::initialize_with_config(configuration)
        .expect("failed to initialize")
        .register_scenario(
            scenario!("OrderedBatch").register_transaction(transaction!(ordered_batch)),
        );
    let _metrics = common::run_load_test(goose_attack).await;

    let replies = BATCH_REPLIES.lock().expect("replies lock poisoned");
    assert_eq!(
        *replies,
        vec![
            (200, "alpha".to_string()),
            (503, "beta".to_string()),
            (0, String::new()),
            (200, "gamma".to_string()),
        ],
        "replies must line up with the submitted specs"
    );
}

async fn fanout_once(user: &mut GooseUser) -> TransactionResult {
    scenarios::fanout(user, &NO_PAUSE).await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn fanout_issues_every_batched_request() {
    let server = MockServer::start();

    let first_page = server.mock(|when, then| {
        when.method(GET).path("/api/articles").query_param("offset", "0");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"articles": [], "articlesCount": 0}));
    });
    let second_page = server.mock(|when, then| {
        when.method(GET)
            .path("/api/articles")
            .query_param("offset", "10");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"articles": [], "articlesCount": 0}));
    });
    let tags = server.mock(|when, then| {
        when.method(GET).path("/api/tags");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"tags": []}));
    });
    let deep_page = server.mock(|when, then| {
        when.method(GET)
            .path("/api/articles")
            .query_param("offset", "40");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"articles": [], "articlesCount": 0}));
    });

    let configuration = common::build_configuration(&server, vec!["--iterations", "1"]);
    let goose_attack = GooseAttack::initialize_with_config(configuration)
        .expect("failed to initialize")
        .register_scenario(
            scenario!("Fanout").register_transaction(transaction!(fanout_once)),
        );
    let _metrics = common::run_load_test(goose_attack).await;

    // All four requests of the fan-out went out, none was dropped.
    assert_eq!(first_page.hits(), 1);
    assert_eq!(second_page.hits(), 1);
    assert_eq!(tags.hits(), 1);
    assert_eq!(deep_page.hits(), 1);
}

async fn single_article_page(user: &mut GooseUser) -> TransactionResult {
    conduit_loadtest::api::fetch_articles(user, 1, 0, None).await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn oversized_article_pages_fail_the_limit_check() {
    let server = MockServer::start();

    // The target ignores limit=1 and returns two articles.
    let articles = server.mock(|when, then| {
        when.method(GET).path("/api/articles").query_param("limit", "1");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "articles": [{"slug": "one"}, {"slug": "two"}],
                "articlesCount": 2,
            }));
    });

    let configuration = common::build_configuration(&server, vec!["--iterations", "1"]);
    let goose_attack = GooseAttack::initialize_with_config(configuration)
        .expect("failed to initialize")
        .register_scenario(
            scenario!("SinglePage").register_transaction(transaction!(single_article_page)),
        );
    let metrics = common::run_load_test(goose_attack).await;

    assert_eq!(articles.hits(), 1);

    // A 200 with more articles than requested is a failed check, not a
    // success.
    let mut fail = 0;
    for aggregate in metrics.requests.values() {
        fail += aggregate.fail_count;
    }
    assert!(fail >= 1, "limit violation must be recorded as a failure");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn setup_provisions_users_and_sessions_use_them() {
    let server = MockServer::start();
    let mocks = common::mock_conduit_api(&server);

    static PROFILE: RunProfile = RunProfile {
        name: "provisioning test",
        description: "integration fixture",
        interpretation: "not a real run",
        provision_users: 2,
        provision_articles: 1,
    };

    async fn setup(user: &mut GooseUser) -> TransactionResult {
        lifecycle::setup(user, &PROFILE).await
    }
    async fn teardown(user: &mut GooseUser) -> TransactionResult {
        lifecycle::teardown(user, &PROFILE).await
    }

    let configuration = common::build_configuration(&server, vec!["--iterations", "2"]);
    let goose_attack = GooseAttack::initialize_with_config(configuration)
        .expect("failed to initialize")
        .register_scenario(
            scenario!("AuthenticatedSession")
                .register_transaction(transaction!(authenticated)),
        )
        .test_start(transaction!(setup))
        .test_stop(transaction!(teardown));
    let _metrics = common::run_load_test(goose_attack).await;

    // Setup provisioned two users sequentially and seeded one article.
    assert_eq!(mocks.register.hits(), 2);
    assert_eq!(mocks.login.hits(), 2);
    assert_eq!(mocks.create.hits(), 1);

    // Both iterations found a provisioned session to use.
    assert_eq!(mocks.profile.hits(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn sessions_degrade_to_anonymous_without_provisioned_users() {
    let server = MockServer::start();
    let mocks = common::mock_conduit_api(&server);

    users::store_provisioned(Vec::new());

    let configuration = common::build_configuration(&server, vec!["--iterations", "2"]);
    let goose_attack = GooseAttack::initialize_with_config(configuration)
        .expect("failed to initialize")
        .register_scenario(
            scenario!("AuthenticatedSession")
                .register_transaction(transaction!(authenticated)),
        );
    let _metrics = common::run_load_test(goose_attack).await;

    // Browsing happened, nothing authenticated did.
    assert!(mocks.articles.hits() >= 2);
    assert_eq!(mocks.profile.hits(), 0);
    assert_eq!(mocks.create.hits(), 0);
}
