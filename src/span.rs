/**
This module computes the metrics of extractive question answering: the exact match and the
token-overlap F1 of predicted answer spans. Spans come as batches of start and end index tensors,
interleaved: `[starts_0, ends_0, starts_1, ends_1, ...]`.
*/
use crate::metrics::{check_consistent_length, ComputationError};
use crate::reporter::Reporter;
use itertools::multizip;
use ndarray::{prelude::*, Zip};

/// Start and end indices of every example, reconstructed from interleaved batches.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanArrays {
    pub starts: Array1<i64>,
    pub ends: Array1<i64>,
}

impl SpanArrays {
    /// Concatenates the even-indexed tensors into the starts and the odd-indexed tensors into the
    /// ends.
    pub fn from_interleaved(tensors: &[Array1<i64>]) -> Result<Self, ComputationError> {
        let starts: Array1<i64> = tensors
            .iter()
            .step_by(2)
            .flat_map(|t| t.iter().copied())
            .collect();
        let ends: Array1<i64> = tensors
            .iter()
            .skip(1)
            .step_by(2)
            .flat_map(|t| t.iter().copied())
            .collect();
        check_consistent_length(starts.len(), ends.len())?;
        Ok(Self { starts, ends })
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }
}

/// Reconstructs both sides and checks that they hold the same, non-zero, number of examples.
fn paired_spans(
    preds: &[Array1<i64>],
    labels: &[Array1<i64>],
) -> Result<(SpanArrays, SpanArrays), ComputationError> {
    let preds = SpanArrays::from_interleaved(preds)?;
    let labels = SpanArrays::from_interleaved(labels)?;
    check_consistent_length(preds.len(), labels.len())?;
    if labels.is_empty() {
        return Err(ComputationError::EmptyInput(String::from("spans")));
    }
    Ok((preds, labels))
}

/// Fraction of examples whose predicted start and end both equal the true ones.
pub fn squad_em(preds: &[Array1<i64>], labels: &[Array1<i64>]) -> Result<f64, ComputationError> {
    let (preds, labels) = paired_spans(preds, labels)?;
    let correct = Zip::from(&preds.starts)
        .and(&preds.ends)
        .and(&labels.starts)
        .and(&labels.ends)
        .fold(0usize, |acc, ps, pe, ls, le| {
            acc + usize::from(ps == ls && pe == le)
        });
    Ok(correct as f64 / labels.len() as f64)
}

/// Mean precision, recall and F1 of the predicted spans.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpanScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl From<SpanScores> for (f64, f64, f64) {
    fn from(value: SpanScores) -> Self {
        (value.precision, value.recall, value.f1)
    }
}

/// Token-overlap scores of the half-open ranges `[start, end)`, averaged over the examples.
///
/// An example whose start and end sum to zero or less on either side is a no-answer: its
/// precision, recall and F1 are all `1` if the predicted end equals the true end, `0` otherwise.
pub fn squad_f1(
    preds: &[Array1<i64>],
    labels: &[Array1<i64>],
) -> Result<SpanScores, ComputationError> {
    let (preds, labels) = paired_spans(preds, labels)?;
    let mut sums = SpanScores {
        precision: 0.0,
        recall: 0.0,
        f1: 0.0,
    };
    for (ps, pe, ls, le) in multizip((
        preds.starts.iter(),
        preds.ends.iter(),
        labels.starts.iter(),
        labels.ends.iter(),
    )) {
        let scores = example_scores((*ps, *pe), (*ls, *le));
        sums.precision += scores.precision;
        sums.recall += scores.recall;
        sums.f1 += scores.f1;
    }
    let n = labels.len() as f64;
    Ok(SpanScores {
        precision: sums.precision / n,
        recall: sums.recall / n,
        f1: sums.f1 / n,
    })
}

fn example_scores(pred: (i64, i64), label: (i64, i64)) -> SpanScores {
    // Widened so that sums and lengths of extreme indices can't overflow
    let (pred_start, pred_end) = (i128::from(pred.0), i128::from(pred.1));
    let (label_start, label_end) = (i128::from(label.0), i128::from(label.1));
    if pred_start + pred_end <= 0 || label_start + label_end <= 0 {
        let agree = if pred_end == label_end { 1.0 } else { 0.0 };
        return SpanScores {
            precision: agree,
            recall: agree,
            f1: agree,
        };
    }
    let overlap = (pred_end.min(label_end) - pred_start.max(label_start)).max(0);
    if overlap == 0 {
        return SpanScores {
            precision: 0.0,
            recall: 0.0,
            f1: 0.0,
        };
    }
    let precision = overlap as f64 / (pred_end - pred_start) as f64;
    let recall = overlap as f64 / (label_end - label_start) as f64;
    SpanScores {
        precision,
        recall,
        f1: 2.0 * precision * recall / (precision + recall),
    }
}

/// Exact match and span scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SquadScores {
    pub em: f64,
    pub f1: SpanScores,
}

impl From<SquadScores> for Reporter {
    fn from(value: SquadScores) -> Self {
        let mut reporter = Reporter::default();
        reporter.insert("EM", value.em);
        reporter.insert("f1", <(f64, f64, f64)>::from(value.f1));
        reporter
    }
}

/// Computes `squad_em` and `squad_f1`.
pub fn squad(
    preds: &[Array1<i64>],
    labels: &[Array1<i64>],
) -> Result<SquadScores, ComputationError> {
    Ok(SquadScores {
        em: squad_em(preds, labels)?,
        f1: squad_f1(preds, labels)?,
    })
}
