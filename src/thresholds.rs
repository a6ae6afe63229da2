//! Post-run pass/fail evaluation over the runtime's aggregate metrics.
//!
//! The runtime reports per-request aggregates; each binary declares a
//! small set of named thresholds and evaluates them after `execute()`
//! returns. A breached threshold is logged and the process exits
//! non-zero, so CI can gate on the run the way the scripts' original
//! threshold blocks did.

use std::collections::BTreeMap;

use goose::metrics::GooseMetrics;
use log::{info, warn};

pub enum Expectation {
    /// 95th-percentile response time across all requests, milliseconds.
    P95BelowMs(usize),
    /// Failed-request fraction across all requests, 0.0 to 1.0.
    FailRateBelow(f64),
}

pub struct Threshold {
    pub name: &'static str,
    pub expectation: Expectation,
}

/// Evaluate every threshold, logging each verdict. Returns true only
/// when all thresholds held.
pub fn evaluate(metrics: &GooseMetrics, thresholds: &[Threshold]) -> bool {
    let mut all_met = true;
    for threshold in thresholds {
        let met = match threshold.expectation {
            Expectation::P95BelowMs(limit) => {
                let p95 = aggregate_percentile(metrics, 0.95);
                if p95 > limit {
                    warn!(
                        "threshold breached: {} (p95 {}ms > {}ms)",
                        threshold.name, p95, limit
                    );
                } else {
                    info!("threshold met: {} (p95 {}ms)", threshold.name, p95);
                }
                p95 <= limit
            }
            Expectation::FailRateBelow(limit) => {
                let rate = fail_rate(metrics);
                if rate > limit {
                    warn!(
                        "threshold breached: {} (fail rate {:.3} > {:.3})",
                        threshold.name, rate, limit
                    );
                } else {
                    info!(
                        "threshold met: {} (fail rate {:.3})",
                        threshold.name, rate
                    );
                }
                rate <= limit
            }
        };
        all_met = all_met && met;
    }
    all_met
}

/// Merge every request's response-time histogram and take a percentile.
fn aggregate_percentile(metrics: &GooseMetrics, fraction: f64) -> usize {
    let mut combined: BTreeMap<usize, usize> = BTreeMap::new();
    let mut total = 0;
    for aggregate in metrics.requests.values() {
        for (time, count) in &aggregate.raw_data.times {
            *combined.entry(*time).or_insert(0) += count;
        }
        total += aggregate.raw_data.counter;
    }
    percentile(&combined, total, fraction)
}

/// Walk a response-time histogram to the requested percentile. The
/// histogram keys are milliseconds (rounded by the runtime for large
/// values), values are observation counts.
pub fn percentile(times: &BTreeMap<usize, usize>, total: usize, fraction: f64) -> usize {
    if total == 0 {
        return 0;
    }
    let rank = ((total as f64) * fraction).ceil() as usize;
    let mut seen = 0;
    for (time, count) in times {
        seen += count;
        if seen >= rank {
            return *time;
        }
    }
    times.keys().next_back().copied().unwrap_or(0)
}

fn fail_rate(metrics: &GooseMetrics) -> f64 {
    let mut success = 0;
    let mut fail = 0;
    for aggregate in metrics.requests.values() {
        success += aggregate.success_count;
        fail += aggregate.fail_count;
    }
    let total = success + fail;
    if total == 0 {
        return 0.0;
    }
    fail as f64 / total as f64
}
