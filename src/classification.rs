/**
This module computes the metrics of single-label classification: accuracy, binary F1, macro F1 and
the Matthews correlation coefficient. Every function normalizes its inputs into `ClassArrays`
before comparing anything.
*/
use crate::config::MetricsConfig;
use crate::input::{AccuracyArrays, ClassArrays, Predictions};
use crate::metrics::{f_score, prf_divide, ComputationError, DivByZeroStrat, Metric};
use crate::reporter::Reporter;
use ahash::{random_state::RandomState, HashMap as AHashMap};
use itertools::multizip;
use ndarray::{array, prelude::*, Zip};

/// Fraction of positions where the prediction equals the label.
///
/// * `preds`: Predicted classes, or real values
/// * `labels`: True classes, or real values
pub fn simple_accuracy(preds: &Predictions, labels: &Predictions) -> Result<f64, ComputationError> {
    match AccuracyArrays::try_new(preds, labels, Metric::Acc)? {
        AccuracyArrays::Classes(arrays) => accuracy(&arrays),
        AccuracyArrays::Reals(arrays) if arrays.labels.is_empty() => {
            Err(ComputationError::EmptyInput(String::from("labels")))
        }
        AccuracyArrays::Reals(arrays) => Ok(fraction_equal(&arrays.preds, &arrays.labels)),
    }
}

pub(crate) fn accuracy(arrays: &ClassArrays) -> Result<f64, ComputationError> {
    if arrays.is_empty() {
        return Err(ComputationError::EmptyInput(String::from("labels")));
    }
    Ok(fraction_equal(&arrays.preds, &arrays.labels))
}

/// Fraction of positions where both arrays agree. Both arrays are non-empty and of the same length.
fn fraction_equal<A: PartialEq>(preds: &Array1<A>, labels: &Array1<A>) -> f64 {
    let correct = Zip::from(preds)
        .and(labels)
        .fold(0usize, |acc, p, l| acc + usize::from(p == l));
    correct as f64 / labels.len() as f64
}

/// Accuracy, binary F1 and their arithmetic mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccAndF1 {
    pub acc: f64,
    pub f1: f64,
    pub acc_and_f1: f64,
}

impl From<AccAndF1> for Reporter {
    fn from(value: AccAndF1) -> Self {
        Reporter::from_iter([
            ("acc", value.acc),
            ("f1", value.f1),
            ("acc_and_f1", value.acc_and_f1),
        ])
    }
}

/// Computes the accuracy, the F1 of the positive class (`config.positive_label`) and their mean.
/// The input must contain at most two classes.
pub fn acc_and_f1(
    preds: &Predictions,
    labels: &Predictions,
    config: &MetricsConfig,
) -> Result<AccAndF1, ComputationError> {
    let arrays = ClassArrays::try_new(preds, labels, Metric::AccF1)?;
    let acc = accuracy(&arrays)?;
    let f1 = binary_f1(&arrays, config.positive_label, config.zero_division)?;
    Ok(AccAndF1 {
        acc,
        f1,
        acc_and_f1: (acc + f1) / 2.0,
    })
}

fn binary_f1(
    arrays: &ClassArrays,
    positive_label: i64,
    zero_division: DivByZeroStrat,
) -> Result<f64, ComputationError> {
    let classes = arrays.classes();
    if classes.len() > 2 {
        return Err(ComputationError::NotBinary(classes.len()));
    }
    if classes.len() == 2 && !classes.contains(&positive_label) {
        return Err(ComputationError::MissingPositiveLabel(positive_label));
    }
    let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
    for (pred, label) in multizip((arrays.preds.iter(), arrays.labels.iter())) {
        match (*pred == positive_label, *label == positive_label) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, true) => fn_ += 1,
            (false, false) => {}
        }
    }
    let tp_sum = array![tp as f64];
    let precision = prf_divide(
        &tp_sum,
        &array![(tp + fp) as f64],
        zero_division,
        "precision",
    )?;
    let recall = prf_divide(&tp_sum, &array![(tp + fn_) as f64], zero_division, "recall")?;
    Ok(f_score(&precision, &recall)[0])
}

/// F1 averaged uniformly over the classes found in the predictions and the labels, whatever their
/// frequency.
pub fn f1_macro(
    preds: &Predictions,
    labels: &Predictions,
    config: &MetricsConfig,
) -> Result<f64, ComputationError> {
    let arrays = ClassArrays::try_new(preds, labels, Metric::F1Macro)?;
    if arrays.is_empty() {
        return Err(ComputationError::EmptyInput(String::from("labels")));
    }
    let confusion = ConfusionMatrix::new(&arrays);
    let tp_sum = confusion.true_positives();
    let precision = prf_divide(
        &tp_sum,
        &confusion.pred_sum(),
        config.zero_division,
        "precision",
    )?;
    let recall = prf_divide(
        &tp_sum,
        &confusion.true_sum(),
        config.zero_division,
        "recall",
    )?;
    f_score(&precision, &recall)
        .mean()
        .ok_or_else(|| ComputationError::EmptyInput(String::from("classes")))
}

/// Matthews correlation coefficient over every class of the input. Returns `0.0` when the
/// coefficient is undefined (i.e. when the predictions or the labels hold a single class).
pub fn mcc(preds: &Predictions, labels: &Predictions) -> Result<f64, ComputationError> {
    let arrays = ClassArrays::try_new(preds, labels, Metric::Mcc)?;
    if arrays.is_empty() {
        return Err(ComputationError::EmptyInput(String::from("labels")));
    }
    let confusion = ConfusionMatrix::new(&arrays);
    let t_sum = confusion.true_sum();
    let p_sum = confusion.pred_sum();
    let n_correct = confusion.true_positives().sum();
    let n_samples = p_sum.sum();
    let cov_ytyp = n_correct * n_samples - t_sum.dot(&p_sum);
    let cov_ypyp = n_samples.powi(2) - p_sum.dot(&p_sum);
    let cov_ytyt = n_samples.powi(2) - t_sum.dot(&t_sum);
    if cov_ypyp * cov_ytyt == 0.0 {
        return Ok(0.0);
    }
    Ok(cov_ytyp / (cov_ytyt * cov_ypyp).sqrt())
}

/// Counts of (true class, predicted class) pairs. Rows are true classes and columns predicted
/// classes, both in the order of `ClassArrays::classes`.
#[derive(Debug, Clone, PartialEq)]
struct ConfusionMatrix {
    counts: Array2<f64>,
}

impl ConfusionMatrix {
    fn new(arrays: &ClassArrays) -> Self {
        let classes = arrays.classes();
        let mut index: AHashMap<i64, usize> =
            AHashMap::with_capacity_and_hasher(classes.len(), RandomState::new());
        for (i, class) in classes.iter().enumerate() {
            index.insert(*class, i);
        }
        let mut counts = Array2::zeros((classes.len(), classes.len()));
        for (label, pred) in multizip((arrays.labels.iter(), arrays.preds.iter())) {
            counts[[index[label], index[pred]]] += 1.0;
        }
        Self { counts }
    }

    fn true_positives(&self) -> Array1<f64> {
        self.counts.diag().to_owned()
    }

    /// Number of predictions per class
    fn pred_sum(&self) -> Array1<f64> {
        self.counts.sum_axis(Axis(0))
    }

    /// Number of labels per class
    fn true_sum(&self) -> Array1<f64> {
        self.counts.sum_axis(Axis(1))
    }
}
