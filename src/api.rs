//! Typed helpers for the fixed API surface, with their standard checks
//! attached.
//!
//! Every helper returns its normalized response (or a parsed session)
//! whether or not the checks passed; callers inspect `status` when a
//! later step depends on the outcome. An assertion failure is recorded
//! for the metrics report and execution continues.

use goose::goose::TransactionError;
use goose::prelude::*;
use serde::Deserialize;
use serde_json::json;

use crate::client::{self, ApiResponse};
use crate::users::{ArticleDraft, Session, UserCredential};

pub const USERS_PATH: &str = "/api/users";
pub const LOGIN_PATH: &str = "/api/users/login";
pub const PROFILE_PATH: &str = "/api/user";
pub const ARTICLES_PATH: &str = "/api/articles";
pub const TAGS_PATH: &str = "/api/tags";

#[derive(Deserialize)]
struct UserEnvelope {
    user: UserBody,
}

#[derive(Deserialize, Default)]
struct UserBody {
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    token: String,
}

/// Register a new account. Succeeds when the target answers 200 with a
/// user object carrying a token; the response is returned either way.
pub async fn register(
    user: &mut GooseUser,
    credential: &UserCredential,
) -> Result<ApiResponse, Box<TransactionError>> {
    let payload = json!({
        "user": {
            "username": credential.username,
            "email": credential.email,
            "password": credential.password,
        }
    });
    let mut response = client::send(
        user,
        GooseMethod::Post,
        USERS_PATH,
        "register",
        Some(&payload),
        None,
    )
    .await?;

    let token_present = parse_session(&response)
        .map(|session| !session.token.is_empty())
        .unwrap_or(false);
    let pass = response.status == 200 && token_present;
    client::check(user, &mut response, "register: user with token", pass);
    Ok(response)
}

/// Log in with an email and password.
///
/// Returns `Some(Session)` only for a 200 with a parseable body holding
/// a non-empty token. Any failure - bad status, unparseable body,
/// missing token - yields `None`: authentication is unavailable and the
/// caller falls back to unauthenticated behavior.
pub async fn login(
    user: &mut GooseUser,
    email: &str,
    password: &str,
) -> Result<Option<Session>, Box<TransactionError>> {
    let payload = json!({
        "user": {
            "email": email,
            "password": password,
        }
    });
    let mut response = client::send(
        user,
        GooseMethod::Post,
        LOGIN_PATH,
        "login",
        Some(&payload),
        None,
    )
    .await?;

    let session = if response.status == 200 {
        parse_session(&response)
    } else {
        None
    };
    client::check(user, &mut response, "login: session token", session.is_some());
    Ok(session)
}

fn parse_session(response: &ApiResponse) -> Option<Session> {
    let envelope: UserEnvelope = serde_json::from_str(&response.body).ok()?;
    if envelope.user.token.is_empty() {
        return None;
    }
    Some(Session {
        username: envelope.user.username,
        email: envelope.user.email,
        token: envelope.user.token,
    })
}

/// Fetch a page of the global article feed. Checks that the target
/// answered 200, that the body holds an `articles` array, and that the
/// requested page size was respected.
pub async fn fetch_articles(
    user: &mut GooseUser,
    limit: usize,
    offset: usize,
    token: Option<&str>,
) -> Result<ApiResponse, Box<TransactionError>> {
    let path = format!("{}?limit={}&offset={}", ARTICLES_PATH, limit, offset);
    let mut response =
        client::send(user, GooseMethod::Get, &path, "articles", None, token).await?;

    let within_limit = response
        .json()
        .and_then(|body| body["articles"].as_array().map(|articles| articles.len()))
        .map(|count| count <= limit)
        .unwrap_or(false);
    let pass = response.status == 200 && within_limit;
    client::check(user, &mut response, "articles: list within limit", pass);
    Ok(response)
}

/// Fetch one user's own articles, used by the bulk-read scenario.
pub async fn fetch_own_articles(
    user: &mut GooseUser,
    token: &str,
    author: &str,
    limit: usize,
    offset: usize,
) -> Result<ApiResponse, Box<TransactionError>> {
    let path = format!(
        "{}?author={}&limit={}&offset={}",
        ARTICLES_PATH, author, limit, offset
    );
    let mut response =
        client::send(user, GooseMethod::Get, &path, "own articles", None, Some(token)).await?;

    let has_articles = response
        .json()
        .map(|body| body["articles"].is_array())
        .unwrap_or(false);
    let pass = response.status == 200 && has_articles;
    client::check(user, &mut response, "own articles: list present", pass);
    Ok(response)
}

/// Fetch the tag list.
pub async fn fetch_tags(user: &mut GooseUser) -> Result<ApiResponse, Box<TransactionError>> {
    let mut response = client::send(user, GooseMethod::Get, TAGS_PATH, "tags", None, None).await?;

    let has_tags = response
        .json()
        .map(|body| body["tags"].is_array())
        .unwrap_or(false);
    let pass = response.status == 200 && has_tags;
    client::check(user, &mut response, "tags: list present", pass);
    Ok(response)
}

/// Fetch the current user's profile with a bearer-style token header.
pub async fn fetch_profile(
    user: &mut GooseUser,
    token: &str,
) -> Result<ApiResponse, Box<TransactionError>> {
    let mut response = client::send(
        user,
        GooseMethod::Get,
        PROFILE_PATH,
        "profile",
        None,
        Some(token),
    )
    .await?;

    let pass = response.status == 200;
    client::check(user, &mut response, "profile: status 200", pass);
    Ok(response)
}

/// Create an article. Returns the slug when the target accepted the
/// draft (200 or 201 with a non-empty `article.slug`), so the caller
/// can favorite it in turn.
pub async fn create_article(
    user: &mut GooseUser,
    token: &str,
    draft: &ArticleDraft,
) -> Result<Option<String>, Box<TransactionError>> {
    let payload = json!({ "article": draft });
    let mut response = client::send(
        user,
        GooseMethod::Post,
        ARTICLES_PATH,
        "create article",
        Some(&payload),
        Some(token),
    )
    .await?;

    let slug = response
        .json()
        .and_then(|body| body["article"]["slug"].as_str().map(str::to_string))
        .filter(|slug| !slug.is_empty());
    let accepted = matches!(response.status, 200 | 201);
    let pass = accepted && slug.is_some();
    client::check(user, &mut response, "create article: slug returned", pass);
    Ok(if pass { slug } else { None })
}

/// Favorite an article by slug.
pub async fn favorite_article(
    user: &mut GooseUser,
    token: &str,
    slug: &str,
) -> Result<ApiResponse, Box<TransactionError>> {
    let path = format!("{}/{}/favorite", ARTICLES_PATH, slug);
    let mut response = client::send(
        user,
        GooseMethod::Post,
        &path,
        "favorite article",
        None,
        Some(token),
    )
    .await?;

    let pass = matches!(response.status, 200 | 201);
    client::check(user, &mut response, "favorite: accepted", pass);
    Ok(response)
}
