/*!
Inputs accepted by the metrics. Predictions and labels come in many shapes (class ids, string
labels, real-valued scores, tagged sentences, span tensors). Instead of comparing whatever we get
and recovering from a representation mismatch afterwards, every family of metrics normalizes both
operands once, upfront, into the canonical arrays it works on.
*/
use crate::metrics::{check_consistent_length, ComputationError, Metric};
use ahash::{random_state::RandomState, HashMap as AHashMap};
use ndarray::Array1;
use num::{Float, NumCast};
use std::borrow::Cow;
use std::collections::BTreeSet;

/// Predictions or labels, as handed over by the inference pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Predictions {
    /// Class ids
    Classes(Array1<i64>),
    /// Class labels given as strings, such as `"positive"` or `"3"`
    Labels(Vec<String>),
    /// Real-valued predictions, such as similarity scores
    Scores(Array1<f64>),
    /// Token labels, one vector per sentence, such as `["B-PER", "I-PER", "O"]`
    Tags(Vec<Vec<String>>),
    /// Span tensors, interleaved: even indices hold start indices, odd indices hold end indices
    Spans(Vec<Array1<i64>>),
}

impl Predictions {
    /// Number of top-level elements: examples, sentences or tensors.
    pub fn len(&self) -> usize {
        match self {
            Self::Classes(a) => a.len(),
            Self::Labels(v) => v.len(),
            Self::Scores(a) => a.len(),
            Self::Tags(v) => v.len(),
            Self::Spans(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds class ids out of any primitive number. Returns `None` if a value can't be
    /// represented as an `i64`.
    pub fn classes<T: NumCast + Copy>(values: &[T]) -> Option<Self> {
        cast_vec(values).map(Self::Classes)
    }

    /// Builds scores out of any primitive number.
    pub fn scores<T: NumCast + Copy>(values: &[T]) -> Option<Self> {
        cast_vec(values).map(Self::Scores)
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Classes(_) => "class ids",
            Self::Labels(_) => "string labels",
            Self::Scores(_) => "scores",
            Self::Tags(_) => "tagged sentences",
            Self::Spans(_) => "span tensors",
        }
    }

    /// Whether the operand holds real values that class ids can't represent.
    pub(crate) fn has_fractional_scores(&self) -> bool {
        matches!(self, Self::Scores(a) if a.iter().any(|v| v.fract() != 0.0))
    }

    pub(crate) fn as_tags(&self, metric: Metric) -> Result<&[Vec<String>], ComputationError> {
        match self {
            Self::Tags(v) => Ok(v),
            other => Err(ComputationError::UnsupportedInput {
                metric,
                found: other.kind(),
            }),
        }
    }

    pub(crate) fn as_spans(&self, metric: Metric) -> Result<&[Array1<i64>], ComputationError> {
        match self {
            Self::Spans(v) => Ok(v),
            other => Err(ComputationError::UnsupportedInput {
                metric,
                found: other.kind(),
            }),
        }
    }
}

/// Casts every value, returning `None` as soon as one of them can't be represented.
fn cast_vec<T: NumCast + Copy, U: NumCast>(values: &[T]) -> Option<Array1<U>> {
    values.iter().map(|v| U::from(*v)).collect()
}

/// Casts floats to class ids. Only integral values are accepted.
fn integral<F: Float>(values: impl IntoIterator<Item = F>) -> Option<Array1<i64>> {
    values
        .into_iter()
        .map(|v| {
            if v.fract() == F::zero() {
                <i64 as NumCast>::from(v)
            } else {
                None
            }
        })
        .collect()
}

impl From<Array1<i64>> for Predictions {
    fn from(value: Array1<i64>) -> Self {
        Self::Classes(value)
    }
}
impl From<Vec<i64>> for Predictions {
    fn from(value: Vec<i64>) -> Self {
        Self::Classes(Array1::from(value))
    }
}
impl From<Array1<f64>> for Predictions {
    fn from(value: Array1<f64>) -> Self {
        Self::Scores(value)
    }
}
impl From<Vec<f64>> for Predictions {
    fn from(value: Vec<f64>) -> Self {
        Self::Scores(Array1::from(value))
    }
}
impl From<Vec<String>> for Predictions {
    fn from(value: Vec<String>) -> Self {
        Self::Labels(value)
    }
}
impl From<Vec<&str>> for Predictions {
    fn from(value: Vec<&str>) -> Self {
        Self::Labels(value.into_iter().map(String::from).collect())
    }
}
impl From<Vec<Vec<String>>> for Predictions {
    fn from(value: Vec<Vec<String>>) -> Self {
        Self::Tags(value)
    }
}
impl From<Vec<Vec<&str>>> for Predictions {
    fn from(value: Vec<Vec<&str>>) -> Self {
        Self::Tags(
            value
                .into_iter()
                .map(|v| v.into_iter().map(String::from).collect())
                .collect(),
        )
    }
}
impl From<Vec<Array1<i64>>> for Predictions {
    fn from(value: Vec<Array1<i64>>) -> Self {
        Self::Spans(value)
    }
}

/// Intermediate representation of one operand of a classification metric.
enum ClassRepr<'a> {
    Numeric(Array1<i64>),
    Text(Vec<Cow<'a, str>>),
}

impl<'a> ClassRepr<'a> {
    fn try_new(value: &'a Predictions, metric: Metric) -> Result<Self, ComputationError> {
        match value {
            Predictions::Classes(a) => Ok(Self::Numeric(a.clone())),
            Predictions::Scores(a) => integral(a.iter().copied())
                .map(Self::Numeric)
                .ok_or(ComputationError::UnsupportedInput {
                    metric,
                    found: "non-integral scores",
                }),
            Predictions::Labels(v) => {
                let parsed: Option<Array1<i64>> = v.iter().map(|s| s.trim().parse().ok()).collect();
                Ok(match parsed {
                    Some(numeric) => Self::Numeric(numeric),
                    None => Self::Text(v.iter().map(|s| Cow::from(s.as_str())).collect()),
                })
            }
            other => Err(ComputationError::UnsupportedInput {
                metric,
                found: other.kind(),
            }),
        }
    }

    fn into_text(self) -> Vec<Cow<'a, str>> {
        match self {
            Self::Numeric(a) => a.iter().map(|v| Cow::from(v.to_string())).collect(),
            Self::Text(v) => v,
        }
    }
}

/// Canonical representation consumed by the classification metrics: two class id arrays of the
/// same length.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassArrays {
    pub preds: Array1<i64>,
    pub labels: Array1<i64>,
}

impl ClassArrays {
    /// Normalizes both operands to class ids. Numeric inputs (and string labels that all parse as
    /// integers) are kept as is. Otherwise both sides are rendered as strings and encoded through
    /// one shared, sorted vocabulary, so equal labels always get equal ids.
    pub fn try_new(
        preds: &Predictions,
        labels: &Predictions,
        metric: Metric,
    ) -> Result<Self, ComputationError> {
        check_consistent_length(preds.len(), labels.len())?;
        let preds_repr = ClassRepr::try_new(preds, metric)?;
        let labels_repr = ClassRepr::try_new(labels, metric)?;
        match (preds_repr, labels_repr) {
            (ClassRepr::Numeric(preds), ClassRepr::Numeric(labels)) => Ok(Self { preds, labels }),
            (preds_repr, labels_repr) => {
                let preds_text = preds_repr.into_text();
                let labels_text = labels_repr.into_text();
                let vocabulary: BTreeSet<&str> = preds_text
                    .iter()
                    .chain(labels_text.iter())
                    .map(|s| &**s)
                    .collect();
                let mut ids: AHashMap<&str, i64> =
                    AHashMap::with_capacity_and_hasher(vocabulary.len(), RandomState::new());
                for (id, label) in vocabulary.into_iter().enumerate() {
                    ids.insert(label, id as i64);
                }
                let encode = |text: &[Cow<'_, str>]| -> Array1<i64> {
                    text.iter().map(|s| ids[&**s]).collect()
                };
                Ok(Self {
                    preds: encode(&preds_text),
                    labels: encode(&labels_text),
                })
            }
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Sorted union of the classes found in the predictions and the labels.
    pub fn classes(&self) -> Vec<i64> {
        let classes: BTreeSet<i64> = self.preds.iter().chain(self.labels.iter()).copied().collect();
        classes.into_iter().collect()
    }
}

/// Canonical representation consumed by the accuracy. Class ids are used whenever both operands
/// can be expressed as classes; as soon as one of them holds fractional scores, both sides are
/// compared as reals instead.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AccuracyArrays {
    Classes(ClassArrays),
    Reals(ScoreArrays),
}

impl AccuracyArrays {
    pub(crate) fn try_new(
        preds: &Predictions,
        labels: &Predictions,
        metric: Metric,
    ) -> Result<Self, ComputationError> {
        if !preds.has_fractional_scores() && !labels.has_fractional_scores() {
            return Ok(Self::Classes(ClassArrays::try_new(preds, labels, metric)?));
        }
        check_consistent_length(preds.len(), labels.len())?;
        Ok(Self::Reals(ScoreArrays {
            preds: real_array(preds, metric)?,
            labels: real_array(labels, metric)?,
        }))
    }
}

/// Reals for an elementwise comparison. A string label that is not a number can't equal any real,
/// so it becomes NaN.
fn real_array(value: &Predictions, metric: Metric) -> Result<Array1<f64>, ComputationError> {
    match value {
        Predictions::Labels(v) => Ok(v
            .iter()
            .map(|s| s.trim().parse::<f64>().unwrap_or(f64::NAN))
            .collect()),
        other => score_array(other, metric),
    }
}

/// Canonical representation consumed by the correlation metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreArrays {
    pub preds: Array1<f64>,
    pub labels: Array1<f64>,
}

impl ScoreArrays {
    pub fn try_new(
        preds: &Predictions,
        labels: &Predictions,
        metric: Metric,
    ) -> Result<Self, ComputationError> {
        check_consistent_length(preds.len(), labels.len())?;
        Ok(Self {
            preds: score_array(preds, metric)?,
            labels: score_array(labels, metric)?,
        })
    }
}

fn score_array(value: &Predictions, metric: Metric) -> Result<Array1<f64>, ComputationError> {
    match value {
        Predictions::Scores(a) => Ok(a.clone()),
        Predictions::Classes(a) => Ok(a.mapv(|v| v as f64)),
        Predictions::Labels(v) => v
            .iter()
            .map(|s| s.trim().parse::<f64>().ok())
            .collect::<Option<Array1<f64>>>()
            .ok_or(ComputationError::UnsupportedInput {
                metric,
                found: "non-numeric labels",
            }),
        other => Err(ComputationError::UnsupportedInput {
            metric,
            found: other.kind(),
        }),
    }
}
