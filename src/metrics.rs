use crate::classification::{acc_and_f1, f1_macro, mcc, simple_accuracy};
use crate::config::MetricsConfig;
use crate::correlation::{pearson_and_spearman, UndefinedCorrelationError};
use crate::entity::InvalidTagError;
/**
This module maps a metric name to its scoring function and holds the machinery shared by every
metric: the error types, the length checks and the division helpers used to compute precision,
recall and f-score.
*/
use crate::input::Predictions;
use crate::reporter::Reporter;
use crate::sequence::{postprocessed_seq_f1, seq_f1};
use crate::span::squad;
use core::fmt;
use enum_iterator::{all, Sequence};
use ndarray::{prelude::*, Zip};
use std::{error::Error, fmt::Display, str::FromStr};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// How do we handle cases with a division by zero? Do we replace the result by 1, return an
/// error, or replace the division result with 0? The statistical routines this crate mirrors
/// replace the result by 0 (and warn), which is the default here. `ReturnError` stops the
/// computation; it can be useful if you believe there should be no 0 in the denominator.
pub enum DivByZeroStrat {
    /// The result of a division by `0` is `1`
    ReplaceBy1,
    /// Returns an error
    ReturnError,
    /// The result of a division by `0` is `0`
    #[default]
    ReplaceBy0,
}

/// Error returned when a string can't be parsed into one of the strategy enums of this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsingStrategyError {
    pub(crate) strategy: &'static str,
    pub(crate) input: String,
}

impl Display for ParsingStrategyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not parse `{}` into a `{}`", self.input, self.strategy)
    }
}
impl Error for ParsingStrategyError {}

impl FromStr for DivByZeroStrat {
    type Err = ParsingStrategyError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_ref() {
            "replaceby1" | "replacebyone" => Ok(DivByZeroStrat::ReplaceBy1),
            "replaceby0" | "replacebyzero" => Ok(DivByZeroStrat::ReplaceBy0),
            "returnerror" | "error" => Ok(DivByZeroStrat::ReturnError),
            _ => Err(ParsingStrategyError {
                strategy: "DivByZeroStrat",
                input: String::from(s),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DivisionByZeroError;

impl Display for DivisionByZeroError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Encountered division by zero")
    }
}

impl Error for DivisionByZeroError {}

#[derive(Debug, PartialEq, Clone, Copy)]
/// Error type to represent when two lists or arrays are not of the same length (when they
/// should be).
pub struct InconsistentLengthError(pub(crate) usize, pub(crate) usize);

impl Display for InconsistentLengthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Inconsistent length between two lists. The first is length {}, the second is length {}",
            self.0, self.1
        )
    }
}
impl Error for InconsistentLengthError {}

/// Error returned when a metric name is not part of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMetricError(pub(crate) String);

impl Display for UnknownMetricError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let known: Vec<&str> = Metric::all().map(Metric::name).collect();
        write!(
            f,
            "Unknown metric `{}`. Known metrics are: {}",
            self.0,
            known.join(", ")
        )
    }
}
impl Error for UnknownMetricError {}

#[derive(Debug, Clone, PartialEq)]
/// Enum error encompassing every type of failure that could happen when computing a metric.
pub enum ComputationError {
    InconsistentLength(InconsistentLengthError),
    UnknownMetric(UnknownMetricError),
    InvalidTag(InvalidTagError),
    UndefinedCorrelation(UndefinedCorrelationError),
    DivisionByZero(DivisionByZeroError),
    EmptyInput(String),
    /// The predictions or labels are not in a representation the metric can consume.
    UnsupportedInput {
        metric: Metric,
        found: &'static str,
    },
    /// Binary F1 received more than two distinct classes.
    NotBinary(usize),
    /// Binary F1 received two classes, none of them being the positive label.
    MissingPositiveLabel(i64),
}

impl Display for ComputationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InconsistentLength(length_err) => std::fmt::Display::fmt(length_err, f),
            Self::UnknownMetric(metric_err) => std::fmt::Display::fmt(metric_err, f),
            Self::InvalidTag(tag_err) => std::fmt::Display::fmt(tag_err, f),
            Self::UndefinedCorrelation(corr_err) => std::fmt::Display::fmt(corr_err, f),
            Self::DivisionByZero(div_err) => std::fmt::Display::fmt(div_err, f),
            Self::EmptyInput(which) => write!(f, "Received an empty input {}", which),
            Self::UnsupportedInput { metric, found } => {
                write!(f, "The metric `{}` can't be computed on {}", metric, found)
            }
            Self::NotBinary(n) => write!(
                f,
                "Binary F1 expects at most 2 classes, found {}. Use `f1_macro` instead",
                n
            ),
            Self::MissingPositiveLabel(label) => write!(
                f,
                "The positive label {} is not one of the two classes found in the input",
                label
            ),
        }
    }
}
impl Error for ComputationError {}

impl From<InconsistentLengthError> for ComputationError {
    fn from(value: InconsistentLengthError) -> Self {
        Self::InconsistentLength(value)
    }
}
impl From<UnknownMetricError> for ComputationError {
    fn from(value: UnknownMetricError) -> Self {
        Self::UnknownMetric(value)
    }
}
impl From<InvalidTagError> for ComputationError {
    fn from(value: InvalidTagError) -> Self {
        Self::InvalidTag(value)
    }
}
impl From<UndefinedCorrelationError> for ComputationError {
    fn from(value: UndefinedCorrelationError) -> Self {
        Self::UndefinedCorrelation(value)
    }
}
impl From<DivisionByZeroError> for ComputationError {
    fn from(value: DivisionByZeroError) -> Self {
        Self::DivisionByZero(value)
    }
}

/// Signature shared by every entry of the metric registry.
type Scorer = fn(&Predictions, &Predictions, &MetricsConfig) -> Result<Reporter, ComputationError>;

/// The closed set of metrics this crate can compute. A `Metric` can be parsed from its name
/// (`"mcc"`, `"acc"`, `"acc_f1"`, `"pear_spear"`, `"seq_f1"`, `"postprocessed_seq_f1"`,
/// `"f1_macro"` and `"squad"`) and each variant resolves to exactly one scoring function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Sequence)]
pub enum Metric {
    /// Matthews correlation coefficient
    Mcc,
    /// Accuracy
    Acc,
    /// Accuracy, binary F1 and their mean
    AccF1,
    /// Pearson and Spearman correlations and their mean
    PearSpear,
    /// Entity-level F1 of tagged sequences
    SeqF1,
    /// Entity-level F1 after cleaning the predicted sequences
    PostprocessedSeqF1,
    /// Macro-averaged F1
    F1Macro,
    /// Exact match and span-overlap F1 of extractive question answering
    Squad,
}

impl Metric {
    /// Iterates over every metric of the registry.
    pub fn all() -> impl Iterator<Item = Metric> {
        all::<Metric>()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Mcc => "mcc",
            Self::Acc => "acc",
            Self::AccF1 => "acc_f1",
            Self::PearSpear => "pear_spear",
            Self::SeqF1 => "seq_f1",
            Self::PostprocessedSeqF1 => "postprocessed_seq_f1",
            Self::F1Macro => "f1_macro",
            Self::Squad => "squad",
        }
    }

    fn scorer(self) -> Scorer {
        match self {
            Self::Mcc => score_mcc,
            Self::Acc => score_acc,
            Self::AccF1 => score_acc_f1,
            Self::PearSpear => score_pear_spear,
            Self::SeqF1 => score_seq_f1,
            Self::PostprocessedSeqF1 => score_postprocessed_seq_f1,
            Self::F1Macro => score_f1_macro,
            Self::Squad => score_squad,
        }
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Metric {
    type Err = UnknownMetricError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::all()
            .find(|m| m.name() == s)
            .ok_or_else(|| UnknownMetricError(String::from(s)))
    }
}

fn score_mcc(
    preds: &Predictions,
    labels: &Predictions,
    _config: &MetricsConfig,
) -> Result<Reporter, ComputationError> {
    Ok(Reporter::from_iter([("mcc", mcc(preds, labels)?)]))
}

fn score_acc(
    preds: &Predictions,
    labels: &Predictions,
    _config: &MetricsConfig,
) -> Result<Reporter, ComputationError> {
    Ok(Reporter::from_iter([("acc", simple_accuracy(preds, labels)?)]))
}

fn score_acc_f1(
    preds: &Predictions,
    labels: &Predictions,
    config: &MetricsConfig,
) -> Result<Reporter, ComputationError> {
    Ok(acc_and_f1(preds, labels, config)?.into())
}

fn score_pear_spear(
    preds: &Predictions,
    labels: &Predictions,
    config: &MetricsConfig,
) -> Result<Reporter, ComputationError> {
    Ok(pearson_and_spearman(preds, labels, config)?.into())
}

fn score_seq_f1(
    preds: &Predictions,
    labels: &Predictions,
    config: &MetricsConfig,
) -> Result<Reporter, ComputationError> {
    let y_pred = preds.as_tags(Metric::SeqF1)?;
    let y_true = labels.as_tags(Metric::SeqF1)?;
    Ok(Reporter::from_iter([(
        "seq_f1",
        seq_f1(y_true, y_pred, config)?,
    )]))
}

fn score_postprocessed_seq_f1(
    preds: &Predictions,
    labels: &Predictions,
    config: &MetricsConfig,
) -> Result<Reporter, ComputationError> {
    let y_pred = preds.as_tags(Metric::PostprocessedSeqF1)?;
    let y_true = labels.as_tags(Metric::PostprocessedSeqF1)?;
    Ok(Reporter::from_iter([(
        "f1_seq_p",
        postprocessed_seq_f1(y_true, y_pred, config)?,
    )]))
}

fn score_f1_macro(
    preds: &Predictions,
    labels: &Predictions,
    config: &MetricsConfig,
) -> Result<Reporter, ComputationError> {
    Ok(Reporter::from_iter([(
        "f1_macro",
        f1_macro(preds, labels, config)?,
    )]))
}

fn score_squad(
    preds: &Predictions,
    labels: &Predictions,
    _config: &MetricsConfig,
) -> Result<Reporter, ComputationError> {
    let pred_spans = preds.as_spans(Metric::Squad)?;
    let label_spans = labels.as_spans(Metric::Squad)?;
    Ok(squad(pred_spans, label_spans)?.into())
}

pub(crate) fn check_consistent_length(
    preds_len: usize,
    labels_len: usize,
) -> Result<(), InconsistentLengthError> {
    if preds_len != labels_len {
        return Err(InconsistentLengthError(preds_len, labels_len));
    }
    Ok(())
}

/// Checks that both lists contain the same number of sequences and that every pair of sequences
/// has the same length.
pub(crate) fn check_consistent_sequence_lengths<T, P>(
    y_true: &[Vec<T>],
    y_pred: &[Vec<P>],
) -> Result<(), InconsistentLengthError> {
    check_consistent_length(y_true.len(), y_pred.len())?;
    for (t, p) in y_true.iter().zip(y_pred) {
        if t.len() != p.len() {
            return Err(InconsistentLengthError(t.len(), p.len()));
        }
    }
    Ok(())
}

/// Main entrypoint of the crate. Checks that `preds` and `labels` have the same length, looks up
/// `metric` in the registry and runs the matching scoring function with the default
/// configuration.
///
/// * `metric`: Name of the metric, such as `"acc"` or `"seq_f1"`
/// * `preds`: Predictions of the model
/// * `labels`: Gold labels
pub fn compute_metrics(
    metric: &str,
    preds: &Predictions,
    labels: &Predictions,
) -> Result<Reporter, ComputationError> {
    check_consistent_length(preds.len(), labels.len())?;
    let metric = Metric::from_str(metric)?;
    compute_metrics_inner(metric, preds, labels, &MetricsConfig::default())
}

pub(crate) fn compute_metrics_inner(
    metric: Metric,
    preds: &Predictions,
    labels: &Predictions,
    config: &MetricsConfig,
) -> Result<Reporter, ComputationError> {
    check_consistent_length(preds.len(), labels.len())?;
    debug!(%metric, examples = preds.len(), "computing metric");
    metric.scorer()(preds, labels, config)
}

/// Divides `numerator` by `denominator`. The positions where the denominator is zero are resolved
/// with `zero_division`. `quantity` names what is being computed (e.g. `"precision"`) in the
/// warning emitted when a value gets replaced.
pub(crate) fn prf_divide(
    numerator: &Array1<f64>,
    denominator: &Array1<f64>,
    zero_division: DivByZeroStrat,
    quantity: &str,
) -> Result<Array1<f64>, DivisionByZeroError> {
    let (result, zero_mask) = prf_divide_results_and_mask(numerator, denominator);
    let zeros = zero_mask.iter().filter(|m| **m == 0.0).count();
    if zeros == 0 {
        return Ok(result);
    }
    match zero_division {
        DivByZeroStrat::ReturnError => Err(DivisionByZeroError),
        DivByZeroStrat::ReplaceBy1 => {
            warn!(
                zeros,
                "{} is ill-defined for labels with no samples, setting it to 1", quantity
            );
            Ok(Zip::from(&result)
                .and(&zero_mask)
                .map_collect(|r, m| if *m == 0.0 { 1.0 } else { *r }))
        }
        DivByZeroStrat::ReplaceBy0 => {
            warn!(
                zeros,
                "{} is ill-defined for labels with no samples, setting it to 0", quantity
            );
            Ok(result * &zero_mask)
        }
    }
}

/// Computes the division and a mask holding `0` where the denominator is zero and `1` elsewhere.
///
/// * `numerator`: Numerator of the division
/// * `denominator`: Denominator of the division
fn prf_divide_results_and_mask(
    numerator: &Array1<f64>,
    denominator: &Array1<f64>,
) -> (Array1<f64>, Array1<f64>) {
    let zero_at_mask = denominator.mapv(|d| if d == 0.0 { 0.0 } else { 1.0 });
    let safe_denominator = replace(denominator.clone(), 0.0, 1.0);
    (numerator / &safe_denominator, zero_at_mask)
}

/// Harmonic mean of `precision` and `recall`, elementwise. Positions where both are zero get a
/// f-score of zero.
pub(crate) fn f_score(precision: &Array1<f64>, recall: &Array1<f64>) -> Array1<f64> {
    let denom_non_zero = replace(precision + recall, 0.0, 1.0);
    2.0 * precision * recall / denom_non_zero
}

/// Helper function to replace values from an array.
fn replace<D: Dimension>(mut array: Array<f64, D>, replaced: f64, new_value: f64) -> Array<f64, D> {
    array.mapv_inplace(|v| if v == replaced { new_value } else { v });
    array
}
