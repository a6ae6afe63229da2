//! # conduit-loadtest
//!
//! A suite of [Goose](https://book.goose.rs/) load tests for a
//! Conduit-style demo REST API: user registration and login, article
//! listing and creation, and tag listing.
//!
//! Each binary under `src/bin/` drives one traffic shape against the
//! same API surface:
//!  - `load`: steady traffic at a modest user count
//!  - `stress`: stepped ramps to find the breaking point
//!  - `spike`: a sudden burst far above baseline
//!  - `volume`: pagination and bulk-read pressure
//!  - `soak`: a long steady run to expose slow degradation
//!
//! The binaries share this library: a thin client adapter that
//! normalizes every response ([`client`]), typed helpers for each API
//! operation with their standard checks attached ([`api`]), the user
//! behaviors themselves ([`scenarios`]), a weighted dispatcher that
//! selects a behavior per iteration ([`dispatch`]), run setup and
//! teardown ([`lifecycle`]), and post-run threshold evaluation
//! ([`thresholds`]).
//!
//! Nothing in scenario code is fatal to a run. A failed request or a
//! malformed response body is recorded against the request's metrics
//! and the virtual user moves on; aggregate pass/fail rates surface
//! problems at the end of the run.

pub mod api;
pub mod client;
pub mod dispatch;
pub mod lifecycle;
pub mod scenarios;
pub mod thresholds;
pub mod users;
