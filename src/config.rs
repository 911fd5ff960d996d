//! Resolver configuration.
//!
//! Configuration is an explicit, immutable value passed into every resolution
//! call. Nothing here is read from ambient state, so a batch resolved twice with
//! the same config and snapshot produces the same results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::similarity::Metric;

/// Metric name to weight. Metrics missing from the map weigh zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricWeights(BTreeMap<String, f64>);

impl Default for MetricWeights {
    fn default() -> Self {
        Self::empty()
            .with(Metric::TokenSet, 0.35)
            .with(Metric::EditDistance, 0.35)
            .with(Metric::AliasString, 0.20)
            .with(Metric::Acronym, 0.10)
    }
}

impl MetricWeights {
    /// A map with no weights at all.
    #[must_use]
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Sets one weight, builder style.
    #[must_use]
    pub fn with(mut self, metric: Metric, weight: f64) -> Self {
        self.set(metric, weight);
        self
    }

    /// Sets one weight.
    pub fn set(&mut self, metric: Metric, weight: f64) {
        self.0.insert(metric.as_str().to_string(), weight);
    }

    /// Weight of a metric, zero when absent.
    #[must_use]
    pub fn get(&self, metric: Metric) -> f64 {
        self.0.get(metric.as_str()).copied().unwrap_or(0.0)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, weight) in &self.0 {
            if Metric::from_name(name).is_none() {
                return Err(ConfigError::UnknownMetric { name: name.clone() });
            }
            if !weight.is_finite() || *weight < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    metric: name.clone(),
                    value: *weight,
                });
            }
        }
        // The acronym metric only participates when near-exact, so it cannot
        // carry the weighted average on its own.
        let carrying = [Metric::TokenSet, Metric::EditDistance, Metric::AliasString];
        if carrying.iter().all(|m| self.get(*m) <= 0.0) {
            return Err(ConfigError::NoPositiveWeight);
        }
        Ok(())
    }
}

/// Options recognized by the resolver.
///
/// # Examples
///
/// ```
/// use entity_mapper::ResolverConfig;
///
/// let config = ResolverConfig::from_toml_str("match_threshold = 0.9\ntie_margin = 0.1").unwrap();
/// assert_eq!(config.match_threshold, 0.9);
/// assert_eq!(config.max_candidates, 50);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Minimum aggregate confidence to accept a match.
    pub match_threshold: f64,

    /// Minimum separation between the top two candidates to avoid Ambiguous.
    pub tie_margin: f64,

    /// Upper bound on candidates scored per query.
    pub max_candidates: usize,

    /// Relative weight of each metric in the aggregate.
    pub metric_weights: MetricWeights,

    /// Longest alias chain followed before the directory is considered malformed.
    pub max_alias_chain_depth: usize,

    /// Any metric at or above this floors the aggregate at its own score.
    pub clamp_threshold: f64,

    /// Minimum match against a link's previous name for the link to apply.
    pub name_change_threshold: f64,

    /// Multiplier applied to the first-hop match when a chain is followed.
    pub name_change_discount: f64,

    /// Ranked candidates kept on each result for audit.
    pub max_reported_candidates: usize,

    /// Worker threads used by batch resolution.
    pub batch_workers: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.85,
            tie_margin: 0.05,
            max_candidates: 50,
            metric_weights: MetricWeights::default(),
            max_alias_chain_depth: 10,
            clamp_threshold: 0.97,
            name_change_threshold: 0.90,
            name_change_discount: 0.95,
            max_reported_candidates: 5,
            batch_workers: 4,
        }
    }
}

fn unit_interval(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            expected: "[0, 1]",
        })
    }
}

fn at_least(field: &'static str, value: usize, min: usize) -> Result<(), ConfigError> {
    if value >= min {
        Ok(())
    } else {
        Err(ConfigError::TooSmall { field, value, min })
    }
}

impl ResolverConfig {
    /// Parses a TOML document and validates it. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML and any validation
    /// error from [`validate`](Self::validate).
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every option is in range.
    ///
    /// # Errors
    ///
    /// Returns the first offending option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        unit_interval("match_threshold", self.match_threshold)?;
        unit_interval("tie_margin", self.tie_margin)?;
        unit_interval("name_change_threshold", self.name_change_threshold)?;
        unit_interval("name_change_discount", self.name_change_discount)?;
        if !(self.clamp_threshold.is_finite() && self.clamp_threshold > 0.0 && self.clamp_threshold <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "clamp_threshold",
                value: self.clamp_threshold,
                expected: "(0, 1]",
            });
        }
        at_least("max_candidates", self.max_candidates, 1)?;
        at_least("max_alias_chain_depth", self.max_alias_chain_depth, 1)?;
        // Ambiguous results must be able to carry both tied candidates.
        at_least("max_reported_candidates", self.max_reported_candidates, 2)?;
        at_least("batch_workers", self.batch_workers, 1)?;
        self.metric_weights.validate()
    }
}
