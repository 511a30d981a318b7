/*!
This library computes the evaluation metrics of NLP models: text classification, regression,
sequence labeling and extractive question answering. Every metric is a pure function of the
predictions and the labels; nothing is cached between calls.

# METRICS
The metrics are selected by name:
* `mcc`: Matthews correlation coefficient of class predictions.
* `acc`: Accuracy of class predictions.
* `acc_f1`: Accuracy, F1 of the positive class and their mean.
* `f1_macro`: F1 averaged uniformly over every class.
* `pear_spear`: Pearson and Spearman correlations of real-valued predictions, and their mean.
* `seq_f1`: Entity-level F1 of BIO-tagged sentences.
* `postprocessed_seq_f1`: Same as `seq_f1`, after mapping padding tokens to `O` and repairing the
    ill-formed BIO sequences of the predictions.
* `squad`: Exact match and token-overlap F1 of predicted answer spans.

# Terminology
* A class is anything a classifier predicts. Classes can be given as integers or as strings; the
    strings of both operands share a single vocabulary.
* A token is a string made of a prefix and a type, such as `B-PER`. The prefix indicates where we
    are in the current chunk and the type is the named entity (`PER`, `LOC`, `MISC`, etc.)
* A chunk, or entity, is a list of at least one token associated with a named entity, such as
    `["B-PER", "I-PER", "I-PER"]`. Entities are extracted leniently: any prefix is accepted and
    chunk boundaries are inferred from the prefix and type transitions.
* A span is the half-open range `[start, end)` of token indices holding an answer.
*/

mod classification;
mod config;
mod correlation;
mod datastructure;
mod entity;
mod input;
mod metrics;
mod reporter;
mod sequence;
mod span;

// The public api starts here
pub use metrics::{
    compute_metrics, ComputationError, DivByZeroStrat, DivisionByZeroError,
    InconsistentLengthError, Metric, ParsingStrategyError, UnknownMetricError,
};

pub use input::{ClassArrays, Predictions, ScoreArrays};

pub use classification::{acc_and_f1, f1_macro, mcc, simple_accuracy, AccAndF1};

pub use correlation::{
    pearson, pearson_and_spearman, spearman, PearsonSpearman, UndefinedCorrelationError,
    UndefinedCorrelationStrat,
};

pub use entity::{correct_bio_encodings, BioState, BioTransition, InvalidTagError};

pub use sequence::{postprocessed_seq_f1, seq_f1, seq_scores, SeqScores};

pub use span::{squad, squad_em, squad_f1, SpanArrays, SpanScores, SquadScores};

pub use reporter::{MetricValue, Reporter};

pub use config::{MetricsConfig, MetricsConfigBuilder, DEFAULT_SENTINEL_TOKENS};

/// Computes a single metric with a custom configuration. It behaves like `compute_metrics`, but
/// takes an already parsed `Metric` and a `MetricsConfig` instead of the defaults.
///
/// * `metric`: Metric to compute
/// * `preds`: Predictions of the model
/// * `labels`: Gold labels
/// * `config`: Parameters used by the metric
///
/// #Example
/// ```rust
/// use evalkit::{compute_metrics_conf, DivByZeroStrat, Metric, MetricsConfigBuilder, Predictions};
///
/// let labels = Predictions::from(vec![vec!["B-PER", "I-PER", "O"], vec!["B-LOC", "O"]]);
/// let preds = Predictions::from(vec![vec!["X", "I-PER", "[PAD]"], vec!["B-LOC", "O"]]);
/// let config = MetricsConfigBuilder::default()
///     .division_by_zero(DivByZeroStrat::ReturnError)
///     .build();
///
/// let reporter = compute_metrics_conf(Metric::PostprocessedSeqF1, &preds, &labels, &config).unwrap();
/// // Precision 1, recall 0.5
/// let expected_report = "Metric, Value
/// f1_seq_p, 0.6666666666666666\n";
///
/// assert_eq!(expected_report, reporter.to_string());
/// ```
pub fn compute_metrics_conf(
    metric: Metric,
    preds: &Predictions,
    labels: &Predictions,
    config: &MetricsConfig,
) -> Result<Reporter, ComputationError> {
    metrics::compute_metrics_inner(metric, preds, labels, config)
}
