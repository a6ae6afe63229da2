//! Shared helpers for the integration tests: a mocked Conduit API
//! surface and a goose configuration builder.
//!
//! Not all helpers are used by every test file.
#![allow(dead_code)]

use gumdrop::Options;
use httpmock::prelude::*;
use serde_json::json;

use goose::metrics::GooseMetrics;
use goose::config::GooseConfiguration;
use goose::GooseAttack;

/// Token and slug returned by the happy-path mocks.
pub const MOCK_TOKEN: &str = "mock-token";
pub const MOCK_SLUG: &str = "mock-slug";

/// The following options are configured by default if not customized:
///  --host <mock-server>
///  --users 1
///  --hatch-rate 1
///  --run-time 1 (unless --iterations is given)
pub fn build_configuration(server: &MockServer, custom: Vec<&str>) -> GooseConfiguration {
    let mut configuration: Vec<&str> = vec![];
    let server_url = server.base_url();

    configuration.extend_from_slice(&custom);

    if !configuration.contains(&"--host") {
        configuration.extend_from_slice(&["--host", &server_url]);
    }
    if !configuration.contains(&"--users") {
        configuration.extend_from_slice(&["--users", "1"]);
    }
    if !configuration.contains(&"--hatch-rate") {
        configuration.extend_from_slice(&["--hatch-rate", "1"]);
    }
    // Iteration-bound tests end on their own; everything else needs a
    // short run time so the attack terminates.
    if !configuration.contains(&"--run-time") && !configuration.contains(&"--iterations") {
        configuration.extend_from_slice(&["--run-time", "1"]);
    }

    GooseConfiguration::parse_args_default(&configuration)
        .expect("failed to parse options and generate a configuration")
}

/// Execute a load test and return its metrics.
pub async fn run_load_test(goose_attack: GooseAttack) -> GooseMetrics {
    goose_attack
        .execute()
        .await
        .expect("load test failed to run")
}

/// Happy-path mocks for the full Conduit API surface used by the
/// scenarios, in registration order.
pub struct ConduitMocks<'a> {
    pub register: httpmock::Mock<'a>,
    pub login: httpmock::Mock<'a>,
    pub profile: httpmock::Mock<'a>,
    pub articles: httpmock::Mock<'a>,
    pub tags: httpmock::Mock<'a>,
    pub create: httpmock::Mock<'a>,
    pub favorite: httpmock::Mock<'a>,
}

pub fn mock_conduit_api(server: &MockServer) -> ConduitMocks {
    let register = server.mock(|when, then| {
        when.method(POST).path("/api/users");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "user": {
                    "username": "provisioned",
                    "email": "provisioned@loadtest.invalid",
                    "token": MOCK_TOKEN,
                    "bio": "",
                    "image": "",
                }
            }));
    });
    let login = server.mock(|when, then| {
        when.method(POST).path("/api/users/login");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "user": {
                    "username": "provisioned",
                    "email": "provisioned@loadtest.invalid",
                    "token": MOCK_TOKEN,
                    "bio": "",
                    "image": "",
                }
            }));
    });
    let profile = server.mock(|when, then| {
        when.method(GET).path("/api/user");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "user": {
                    "username": "provisioned",
                    "email": "provisioned@loadtest.invalid",
                    "token": MOCK_TOKEN,
                }
            }));
    });
    let articles = server.mock(|when, then| {
        when.method(GET).path("/api/articles");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "articles": [
                    {"slug": "seeded-article", "title": "Seeded", "tagList": ["loadtest"]}
                ],
                "articlesCount": 1,
            }));
    });
    let tags = server.mock(|when, then| {
        when.method(GET).path("/api/tags");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"tags": ["loadtest", "synthetic"]}));
    });
    let create = server.mock(|when, then| {
        when.method(POST).path("/api/articles");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"article": {"slug": MOCK_SLUG, "title": "Created"}}));
    });
    let favorite = server.mock(|when, then| {
        when.method(POST)
            .path(format!("/api/articles/{}/favorite", MOCK_SLUG));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"article": {"slug": MOCK_SLUG, "favorited": true}}));
    });

    ConduitMocks {
        register,
        login,
        profile,
        articles,
        tags,
        create,
        favorite,
    }
}
