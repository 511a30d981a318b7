/**
This modules gives a few tools to prettyprint the output of a metric computation and to consume
it as a map.
*/
use serde::{Deserialize, Serialize};
use std::collections::{btree_map, BTreeMap, HashMap};
use std::fmt::Display;

/// Value of a single named metric. Most metrics are scalars; the span F1 of `squad` reports the
/// precision, recall and F1 triple.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum MetricValue {
    Scalar(f64),
    Triple(f64, f64, f64),
}

impl MetricValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(value) => Some(*value),
            Self::Triple(..) => None,
        }
    }
    pub fn as_triple(&self) -> Option<(f64, f64, f64)> {
        match self {
            Self::Triple(p, r, f) => Some((*p, *r, *f)),
            Self::Scalar(_) => None,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<(f64, f64, f64)> for MetricValue {
    fn from(value: (f64, f64, f64)) -> Self {
        Self::Triple(value.0, value.1, value.2)
    }
}

impl Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scalar(value) => write!(f, "{}", value),
            Self::Triple(p, r, f1) => write!(f, "({}, {}, {})", p, r, f1),
        }
    }
}

/// The reporter holds the named results of a metric computation. It can be used to display the
/// results (i.e. prettyprint them) as if they were collected into a dataframe, serialized as a
/// JSON object or consumed to obtain a `HashMap`. It is returned by `compute_metrics`.
///
/// # Example
///
/// ```rust
/// use evalkit::{compute_metrics, Predictions};
///
/// let preds = Predictions::from(vec![1, 1, 0, 0, 0, 0, 0, 0]);
/// let labels = Predictions::from(vec![1, 0, 1, 0, 0, 0, 0, 0]);
/// let reporter = compute_metrics("acc_f1", &preds, &labels).unwrap();
///
/// let expected_report = "Metric, Value
/// acc, 0.75
/// acc_and_f1, 0.625
/// f1, 0.5\n";
///
/// assert_eq!(expected_report, reporter.to_string());
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct Reporter {
    pub(crate) metrics: BTreeMap<String, MetricValue>,
}

impl Reporter {
    pub(crate) fn insert<V: Into<MetricValue>>(&mut self, name: &str, value: V) -> Option<MetricValue> {
        self.metrics.insert(String::from(name), value.into())
    }
    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.metrics.get(name)
    }
    /// Shortcut returning the value of a scalar metric.
    pub fn scalar(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(MetricValue::as_scalar)
    }
    pub fn len(&self) -> usize {
        self.metrics.len()
    }
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
    /// Iterates over the metrics, sorted by name.
    pub fn iter(&self) -> btree_map::Iter<'_, String, MetricValue> {
        self.metrics.iter()
    }
}

impl<'a, V: Into<MetricValue>> FromIterator<(&'a str, V)> for Reporter {
    fn from_iter<I: IntoIterator<Item = (&'a str, V)>>(iter: I) -> Self {
        let mut reporter = Reporter::default();
        for (name, value) in iter {
            reporter.insert(name, value);
        }
        reporter
    }
}

impl IntoIterator for Reporter {
    type Item = (String, MetricValue);
    type IntoIter = btree_map::IntoIter<String, MetricValue>;
    fn into_iter(self) -> Self::IntoIter {
        self.metrics.into_iter()
    }
}

/// By converting the reporter into a `HashMap`, you lose the ordering of the metrics. If you mean
/// to consume the data without prettyprinting it, this is not a problem.
impl From<Reporter> for HashMap<String, MetricValue> {
    fn from(value: Reporter) -> Self {
        value.metrics.into_iter().collect()
    }
}

/// The Reporter struct acts as a dataframe when displayed.
impl Display for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Metric, Value")?;
        for (name, value) in self.metrics.iter() {
            writeln!(f, "{}, {}", name, value)?
        }
        Ok(())
    }
}
