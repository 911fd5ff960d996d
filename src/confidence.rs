//! Confidence aggregation.
//!
//! Per-metric scores are folded into one confidence with a weighted mean, then
//! the clamp-up rule is applied: a single near-exact metric (an exact alias hit,
//! an exact acronym) is strong independent evidence and floors the aggregate at
//! its own score no matter how the other metrics did.

use crate::config::{MetricWeights, ResolverConfig};
use crate::similarity::{Metric, MetricScores};

/// Combines scores under explicit weights and clamp threshold.
///
/// The acronym metric only joins the weighted mean when it is itself at or
/// above `clamp_threshold`; short acronyms produce too many weak partial hits
/// to be trusted otherwise.
#[must_use]
pub fn aggregate_with(scores: &MetricScores, weights: &MetricWeights, clamp_threshold: f64) -> f64 {
    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    for (metric, score) in scores.iter() {
        if metric == Metric::Acronym && score < clamp_threshold {
            continue;
        }
        let weight = weights.get(metric);
        if weight > 0.0 {
            weighted += weight * score;
            total_weight += weight;
        }
    }

    let mut confidence = if total_weight > 0.0 { weighted / total_weight } else { 0.0 };

    if let Some((_, best)) = scores.best() {
        if best >= clamp_threshold {
            confidence = confidence.max(best);
        }
    }

    if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Combines scores under a resolver configuration.
#[must_use]
pub fn aggregate(scores: &MetricScores, config: &ResolverConfig) -> f64 {
    aggregate_with(scores, &config.metric_weights, config.clamp_threshold)
}
