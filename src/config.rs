/*
 * This module contains the `MetricsConfig` struct, which implements the default trait, and its
 * builder. The config gathers every knob the metric functions accept, so that
 * `compute_metrics_conf` and the individual metric functions can share a single argument.
*/
use crate::correlation::UndefinedCorrelationStrat;
use crate::metrics::DivByZeroStrat;
use std::fmt::Display;

/// Sentinel tokens replaced by `O` before the BIO repair of `postprocessed_seq_f1`.
pub const DEFAULT_SENTINEL_TOKENS: [&str; 2] = ["X", "[PAD]"];

#[derive(Clone, Debug, PartialEq, Eq)]
/// Config struct used to simplify the inputs of parameters to the metric functions. It implements
/// the default trait.
pub struct MetricsConfig {
    pub(crate) zero_division: DivByZeroStrat,
    pub(crate) undefined_correlation: UndefinedCorrelationStrat,
    pub(crate) positive_label: i64,
    pub(crate) suffix: bool,
    pub(crate) sentinel_tokens: Vec<String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            zero_division: DivByZeroStrat::ReplaceBy0,
            undefined_correlation: UndefinedCorrelationStrat::ReturnNan,
            positive_label: 1,
            suffix: false,
            sentinel_tokens: DEFAULT_SENTINEL_TOKENS.map(String::from).to_vec(),
        }
    }
}

impl MetricsConfig {
    pub fn zero_division(&self) -> DivByZeroStrat {
        self.zero_division
    }
    pub fn undefined_correlation(&self) -> UndefinedCorrelationStrat {
        self.undefined_correlation
    }
    pub fn positive_label(&self) -> i64 {
        self.positive_label
    }
    pub fn suffix(&self) -> bool {
        self.suffix
    }
    pub fn sentinel_tokens(&self) -> &[String] {
        &self.sentinel_tokens
    }
}

impl Display for MetricsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let string = format!("Strategy when encountering a division by zero: {:?}\n Strategy when a correlation is undefined: {:?}\n Positive label of binary F1: {}\n Prefix located at the end of the tokens: {}\n Sentinel tokens: {:?}", self.zero_division, self.undefined_correlation, self.positive_label, self.suffix, self.sentinel_tokens);
        write!(f, "{}", string)
    }
}

impl From<MetricsConfigBuilder> for MetricsConfig {
    fn from(value: MetricsConfigBuilder) -> Self {
        Self {
            zero_division: value.zero_division,
            undefined_correlation: value.undefined_correlation,
            positive_label: value.positive_label,
            suffix: value.suffix,
            sentinel_tokens: value.sentinel_tokens,
        }
    }
}

/// This builder can be used to build and customize a `MetricsConfig` structure.
#[derive(Clone, Debug)]
pub struct MetricsConfigBuilder {
    zero_division: DivByZeroStrat,
    undefined_correlation: UndefinedCorrelationStrat,
    positive_label: i64,
    suffix: bool,
    sentinel_tokens: Vec<String>,
}

impl Default for MetricsConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsConfigBuilder {
    pub fn division_by_zero<Z: Into<DivByZeroStrat>>(mut self, division_by_zero: Z) -> Self {
        self.zero_division = division_by_zero.into();
        self
    }
    pub fn undefined_correlation(mut self, strategy: UndefinedCorrelationStrat) -> Self {
        self.undefined_correlation = strategy;
        self
    }
    pub fn positive_label(mut self, positive_label: i64) -> Self {
        self.positive_label = positive_label;
        self
    }
    pub fn suffix(mut self, suffix: bool) -> Self {
        self.suffix = suffix;
        self
    }
    pub fn sentinel_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sentinel_tokens = tokens.into_iter().map(Into::into).collect();
        self
    }
    pub fn new() -> Self {
        let config = MetricsConfig::default();
        Self {
            zero_division: config.zero_division,
            undefined_correlation: config.undefined_correlation,
            positive_label: config.positive_label,
            suffix: config.suffix,
            sentinel_tokens: config.sentinel_tokens,
        }
    }
    pub fn build(self) -> MetricsConfig {
        MetricsConfig::from(self)
    }
}
