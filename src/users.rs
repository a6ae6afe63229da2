//! Generated credentials, article drafts, and the provisioned-user pool.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::Utc;
use lazy_static::lazy_static;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

/// Process-wide sequence folded into generated names so credentials
/// created within the same millisecond still differ.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A throwaway account identity, unique within a run.
///
/// Uniqueness is practical, not cryptographic: a millisecond timestamp,
/// a monotonic sequence number, and a random suffix.
#[derive(Clone, Debug)]
pub struct UserCredential {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl UserCredential {
    pub fn generate() -> Self {
        let stamp = Utc::now().timestamp_millis();
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
        let username = format!("vu{}s{}r{:04}", stamp, sequence, suffix);
        let email = format!("{}@loadtest.invalid", username);
        let password = format!("pw-{}-{:04}", sequence, suffix);
        UserCredential {
            username,
            email,
            password,
        }
    }
}

/// An authenticated identity obtained from a successful login. The
/// token is opaque and lives only as long as the iteration or setup
/// phase that obtained it.
#[derive(Clone, Debug)]
pub struct Session {
    pub username: String,
    pub email: String,
    pub token: String,
}

const TITLE_WORDS: &[&str] = &[
    "measuring", "latency", "throughput", "backpressure", "saturation", "headroom", "capacity",
    "ramp", "burst", "baseline",
];

const BODY_WORDS: &[&str] = &[
    "synthetic", "traffic", "profile", "steady", "state", "tail", "percentile", "queueing",
    "drain", "recovery", "load", "generator",
];

/// Synthetic article content submitted by write-path scenarios. The
/// returned slug is used immediately (to favorite the article) and then
/// dropped; nothing is cleaned up server-side.
#[derive(Clone, Debug, Serialize)]
pub struct ArticleDraft {
    pub title: String,
    pub description: String,
    pub body: String,
    #[serde(rename = "tagList")]
    pub tag_list: Vec<String>,
}

impl ArticleDraft {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let pick = |words: &[&str], count: usize, rng: &mut rand::rngs::ThreadRng| {
            words
                .choose_multiple(rng, count)
                .copied()
                .collect::<Vec<_>>()
                .join(" ")
        };
        ArticleDraft {
            title: format!("{} {}", pick(TITLE_WORDS, 3, &mut rng), sequence),
            description: pick(TITLE_WORDS, 5, &mut rng),
            body: pick(BODY_WORDS, 10, &mut rng),
            tag_list: vec!["loadtest".to_string(), "synthetic".to_string()],
        }
    }
}

/// A credential plus the session obtained for it during setup.
#[derive(Clone, Debug)]
pub struct ProvisionedUser {
    pub credential: UserCredential,
    pub session: Session,
}

lazy_static! {
    // Written once by the setup transaction, read-only afterwards. No
    // iteration mutates a shared credential.
    static ref PROVISIONED: RwLock<Vec<ProvisionedUser>> = RwLock::new(Vec::new());
}

/// Replace the provisioned-user pool. Called once from setup.
pub fn store_provisioned(users: Vec<ProvisionedUser>) {
    let mut pool = PROVISIONED.write().expect("provisioned pool lock poisoned");
    *pool = users;
}

/// Pick one provisioned user at random, or `None` when provisioning
/// failed or was not requested. Callers degrade to anonymous behavior.
pub fn pick_provisioned() -> Option<ProvisionedUser> {
    let pool = PROVISIONED.read().expect("provisioned pool lock poisoned");
    pool.choose(&mut rand::thread_rng()).cloned()
}

pub fn provisioned_count() -> usize {
    PROVISIONED
        .read()
        .expect("provisioned pool lock poisoned")
        .len()
}
