use crate::config::MetricsConfig;
use crate::input::{Predictions, ScoreArrays};
/**
This module computes the Pearson and Spearman correlations of real-valued predictions. Both are
undefined for fewer than two points or for a constant input; what happens then is decided by
`UndefinedCorrelationStrat`.
*/
use crate::metrics::{check_consistent_length, ComputationError, Metric, ParsingStrategyError};
use crate::reporter::Reporter;
use core::fmt;
use ndarray::prelude::*;
use ndarray_stats::CorrelationExt;
use std::{cmp::Ordering, error::Error, fmt::Display, str::FromStr};
use tracing::warn;

/// Enum of the strategies available when a correlation is undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UndefinedCorrelationStrat {
    /// Reports the correlation as NaN.
    #[default]
    ReturnNan,
    /// Fails the computation with an `UndefinedCorrelation` error.
    ReturnError,
}

impl FromStr for UndefinedCorrelationStrat {
    type Err = ParsingStrategyError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "returnnan" | "nan" => Ok(Self::ReturnNan),
            "returnerror" | "error" => Ok(Self::ReturnError),
            _ => Err(ParsingStrategyError {
                strategy: "UndefinedCorrelationStrat",
                input: String::from(s),
            }),
        }
    }
}

/// Reason why a correlation can't be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndefinedCorrelationError {
    /// At least two points are needed.
    TooFewPoints(usize),
    /// One of the inputs is constant.
    ZeroVariance,
}

impl Display for UndefinedCorrelationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewPoints(n) => write!(
                f,
                "The correlation is undefined for {} point(s), at least 2 are needed",
                n
            ),
            Self::ZeroVariance => write!(f, "The correlation is undefined for a constant input"),
        }
    }
}
impl Error for UndefinedCorrelationError {}

/// Pearson correlation, Spearman rank correlation and their mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PearsonSpearman {
    pub pearson: f64,
    pub spearmanr: f64,
    pub corr: f64,
}

impl From<PearsonSpearman> for Reporter {
    fn from(value: PearsonSpearman) -> Self {
        Reporter::from_iter([
            ("pearson", value.pearson),
            ("spearmanr", value.spearmanr),
            ("corr", value.corr),
        ])
    }
}

/// Computes the Pearson and Spearman correlations between the predictions and the labels, along
/// with their arithmetic mean.
///
/// * `preds`: Predicted scores
/// * `labels`: True scores
/// * `config`: `undefined_correlation` decides between NaN and an error for degenerate inputs
pub fn pearson_and_spearman(
    preds: &Predictions,
    labels: &Predictions,
    config: &MetricsConfig,
) -> Result<PearsonSpearman, ComputationError> {
    let arrays = ScoreArrays::try_new(preds, labels, Metric::PearSpear)?;
    let strategy = config.undefined_correlation;
    let pearson_corr = handle_undefined(
        pearson(arrays.preds.view(), arrays.labels.view()),
        strategy,
        "pearson",
    )?;
    let spearman_corr = handle_undefined(
        spearman(arrays.preds.view(), arrays.labels.view()),
        strategy,
        "spearman",
    )?;
    Ok(PearsonSpearman {
        pearson: pearson_corr,
        spearmanr: spearman_corr,
        corr: (pearson_corr + spearman_corr) / 2.0,
    })
}

fn handle_undefined(
    result: Result<f64, ComputationError>,
    strategy: UndefinedCorrelationStrat,
    correlation: &str,
) -> Result<f64, ComputationError> {
    match (result, strategy) {
        (Err(ComputationError::UndefinedCorrelation(err)), UndefinedCorrelationStrat::ReturnNan) => {
            warn!(%err, "{} correlation is undefined, returning NaN", correlation);
            Ok(f64::NAN)
        }
        (result, _) => result,
    }
}

/// Pearson product-moment correlation coefficient, clamped to `[-1, 1]`.
pub fn pearson(x: ArrayView1<f64>, y: ArrayView1<f64>) -> Result<f64, ComputationError> {
    check_consistent_length(x.len(), y.len())?;
    let n = x.len();
    if n < 2 {
        return Err(UndefinedCorrelationError::TooFewPoints(n).into());
    }
    if is_constant(x) || is_constant(y) {
        return Err(UndefinedCorrelationError::ZeroVariance.into());
    }
    // One variable per row, one observation per column
    let stacked = Array2::from_shape_fn((2, n), |(i, j)| if i == 0 { x[j] } else { y[j] });
    let correlation = stacked
        .pearson_correlation()
        .map_err(|_| ComputationError::EmptyInput(String::from("scores")))?;
    Ok(correlation[[0, 1]].clamp(-1.0, 1.0))
}

/// Spearman rank correlation coefficient: the Pearson correlation of the ranks, ties getting the
/// average of the ranks they span.
pub fn spearman(x: ArrayView1<f64>, y: ArrayView1<f64>) -> Result<f64, ComputationError> {
    check_consistent_length(x.len(), y.len())?;
    let x_ranks = average_ranks(x);
    let y_ranks = average_ranks(y);
    pearson(x_ranks.view(), y_ranks.view())
}

fn is_constant(values: ArrayView1<f64>) -> bool {
    values.iter().all(|v| *v == values[0])
}

/// 1-based ranks of `values`. Tied values share the mean of their ranks.
pub(crate) fn average_ranks(values: ArrayView1<f64>) -> Array1<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|a, b| values[*a].partial_cmp(&values[*b]).unwrap_or(Ordering::Equal));
    let mut ranks = Array1::zeros(values.len());
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start..end hold the ranks start + 1..=end
        let rank = (start + 1 + end) as f64 / 2.0;
        for position in &order[start..end] {
            ranks[*position] = rank;
        }
        start = end;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricsConfigBuilder;
    use ndarray::array;
    use quickcheck::{QuickCheck, TestResult};
    use rstest::rstest;

    fn close(actual: f64, expected: f64) -> bool {
        (actual - expected).abs() < 1e-9
    }

    #[rstest]
    #[case(array![1., 2., 3., 4.], array![2., 4., 6., 8.], 1.0)]
    #[case(array![1., 2., 3., 4.], array![8., 6., 4., 2.], -1.0)]
    #[case(array![1., 2., 3.], array![1., 3., 2.], 0.5)]
    fn test_pearson(#[case] x: Array1<f64>, #[case] y: Array1<f64>, #[case] expected: f64) {
        let actual = pearson(x.view(), y.view()).unwrap();
        assert!(close(actual, expected), "{} != {}", actual, expected);
    }

    #[test]
    fn test_pearson_undefined() {
        let x = array![1.0];
        let y = array![2.0];
        assert_eq!(
            pearson(x.view(), y.view()),
            Err(ComputationError::UndefinedCorrelation(
                UndefinedCorrelationError::TooFewPoints(1)
            ))
        );
        let x = array![1.0, 1.0, 1.0];
        let y = array![2.0, 3.0, 1.0];
        assert_eq!(
            pearson(x.view(), y.view()),
            Err(ComputationError::UndefinedCorrelation(
                UndefinedCorrelationError::ZeroVariance
            ))
        );
    }

    #[rstest]
    #[case(array![10., 20., 20., 30.], array![1., 2.5, 2.5, 4.])]
    #[case(array![3., 1., 2.], array![3., 1., 2.])]
    #[case(array![5., 5., 5.], array![2., 2., 2.])]
    fn test_average_ranks(#[case] values: Array1<f64>, #[case] expected: Array1<f64>) {
        assert_eq!(average_ranks(values.view()), expected);
    }

    #[test]
    fn test_spearman_is_monotonic_invariant() {
        let x = array![1., 2., 3., 4., 5.];
        let y = array![1., 8., 27., 64., 125.];
        assert!(close(spearman(x.view(), y.view()).unwrap(), 1.0));
        let pearson_corr = pearson(x.view(), y.view()).unwrap();
        assert!(pearson_corr < 1.0);
    }

    #[test]
    fn test_correlations_are_bounded() {
        fn bounded(values: Vec<(i16, i16)>) -> TestResult {
            let x: Array1<f64> = values.iter().map(|(a, _)| f64::from(*a)).collect();
            let y: Array1<f64> = values.iter().map(|(_, b)| f64::from(*b)).collect();
            match (pearson(x.view(), y.view()), spearman(x.view(), y.view())) {
                (Ok(p), Ok(s)) => {
                    TestResult::from_bool((-1.0..=1.0).contains(&p) && (-1.0..=1.0).contains(&s))
                }
                _ => TestResult::discard(),
            }
        }
        QuickCheck::new()
            .tests(500)
            .quickcheck(bounded as fn(Vec<(i16, i16)>) -> TestResult)
    }

    #[test]
    fn test_pearson_and_spearman() {
        let preds = Predictions::from(vec![1., 2., 3.]);
        let labels = Predictions::from(vec![1., 3., 2.]);
        let actual = pearson_and_spearman(&preds, &labels, &MetricsConfig::default()).unwrap();
        assert!(close(actual.pearson, 0.5));
        assert!(close(actual.spearmanr, 0.5));
        assert!(close(actual.corr, 0.5));
    }

    #[test]
    fn test_pearson_and_spearman_constant_input() {
        let preds = Predictions::from(vec![1., 1., 1.]);
        let labels = Predictions::from(vec![1., 3., 2.]);
        let actual = pearson_and_spearman(&preds, &labels, &MetricsConfig::default()).unwrap();
        assert!(actual.pearson.is_nan());
        assert!(actual.spearmanr.is_nan());
        assert!(actual.corr.is_nan());

        let config = MetricsConfigBuilder::default()
            .undefined_correlation(UndefinedCorrelationStrat::ReturnError)
            .build();
        assert_eq!(
            pearson_and_spearman(&preds, &labels, &config),
            Err(ComputationError::UndefinedCorrelation(
                UndefinedCorrelationError::ZeroVariance
            ))
        );
    }

    #[rstest]
    #[case("nan", UndefinedCorrelationStrat::ReturnNan)]
    #[case("ReturnNan", UndefinedCorrelationStrat::ReturnNan)]
    #[case("error", UndefinedCorrelationStrat::ReturnError)]
    fn test_parse_undefined_correlation_strat(
        #[case] input: &str,
        #[case] expected: UndefinedCorrelationStrat,
    ) {
        assert_eq!(UndefinedCorrelationStrat::from_str(input), Ok(expected));
    }

    #[test]
    fn test_parse_undefined_correlation_strat_fails() {
        assert!(UndefinedCorrelationStrat::from_str("zero").is_err());
    }
}
