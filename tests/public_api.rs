use evalkit::{
    compute_metrics, compute_metrics_conf, ComputationError, DivByZeroStrat, Metric, MetricValue,
    MetricsConfigBuilder, Predictions, Reporter, UndefinedCorrelationStrat,
};
use ndarray::array;
use std::collections::HashMap;

pub trait CloseEnough {
    fn are_close(&self, other: &Self, eps: f64) -> bool;
}

impl CloseEnough for MetricValue {
    fn are_close(&self, other: &Self, eps: f64) -> bool {
        match (self, other) {
            (MetricValue::Scalar(a), MetricValue::Scalar(b)) => f64::abs(a - b) < eps,
            (MetricValue::Triple(a0, a1, a2), MetricValue::Triple(b0, b1, b2)) => {
                f64::abs(a0 - b0) < eps && f64::abs(a1 - b1) < eps && f64::abs(a2 - b2) < eps
            }
            _ => false,
        }
    }
}

fn assert_report(reporter: Reporter, expected: Vec<(&str, MetricValue)>) {
    let actual: HashMap<String, MetricValue> = reporter.into();
    assert_eq!(actual.len(), expected.len());
    for (name, expected_value) in expected {
        let actual_value = actual.get(name).unwrap();
        dbg!(name, actual_value, expected_value);
        assert!(actual_value.are_close(&expected_value, 1e-9));
    }
}

#[test]
fn mcc_binary() {
    let preds = Predictions::from(vec![1, 1, 0, 0, 1, 0]);
    let labels = Predictions::from(vec![1, 0, 0, 0, 1, 1]);
    let reporter = compute_metrics("mcc", &preds, &labels).unwrap();
    assert_report(reporter, vec![("mcc", MetricValue::Scalar(1.0 / 3.0))]);
}

#[test]
fn accuracy_on_mixed_representations() {
    let preds = Predictions::from(vec![1, 0, 1, 1]);
    let labels = Predictions::from(vec!["1", "0", "0", "1"]);
    let reporter = compute_metrics("acc", &preds, &labels).unwrap();
    assert_report(reporter, vec![("acc", MetricValue::Scalar(0.75))]);
}

#[test]
fn accuracy_on_real_values() {
    let preds = Predictions::from(vec![0.5, 1.5, 2.25]);
    let reporter = compute_metrics("acc", &preds, &preds).unwrap();
    assert_report(reporter, vec![("acc", MetricValue::Scalar(1.0))]);
    let labels = Predictions::from(vec![0.25, 1.5, 2.0]);
    let reporter = compute_metrics("acc", &preds, &labels).unwrap();
    assert_report(reporter, vec![("acc", MetricValue::Scalar(1.0 / 3.0))]);
}

#[test]
fn acc_f1_on_string_labels() {
    let preds = Predictions::from(vec!["positive", "positive", "negative", "negative"]);
    let labels = Predictions::from(vec!["positive", "negative", "negative", "positive"]);
    let reporter = compute_metrics("acc_f1", &preds, &labels).unwrap();
    assert_report(
        reporter,
        vec![
            ("acc", MetricValue::Scalar(0.5)),
            ("f1", MetricValue::Scalar(0.5)),
            ("acc_and_f1", MetricValue::Scalar(0.5)),
        ],
    );
}

#[test]
fn f1_macro_three_classes() {
    let preds = Predictions::from(vec![0, 1, 2, 2, 1, 0]);
    let labels = Predictions::from(vec![0, 1, 2, 1, 1, 2]);
    let reporter = compute_metrics("f1_macro", &preds, &labels).unwrap();
    let expected = (2.0 / 3.0 + 0.8 + 0.5) / 3.0;
    assert_report(reporter, vec![("f1_macro", MetricValue::Scalar(expected))]);
}

#[test]
fn pearson_and_spearman_identical_increasing() {
    let values = Predictions::from(vec![0.1, 0.4, 0.5, 2.0, 7.5]);
    let reporter = compute_metrics("pear_spear", &values, &values).unwrap();
    assert_report(
        reporter,
        vec![
            ("pearson", MetricValue::Scalar(1.0)),
            ("spearmanr", MetricValue::Scalar(1.0)),
            ("corr", MetricValue::Scalar(1.0)),
        ],
    );
}

#[test]
fn pearson_and_spearman_with_ties() {
    let preds = Predictions::from(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    let labels = Predictions::from(vec![5.0, 6.0, 7.0, 8.0, 7.0]);
    let reporter = compute_metrics("pear_spear", &preds, &labels).unwrap();
    let pearson = 6.0 / f64::sqrt(52.0);
    let spearman = 8.0 / f64::sqrt(95.0);
    assert_report(
        reporter,
        vec![
            ("pearson", MetricValue::Scalar(pearson)),
            ("spearmanr", MetricValue::Scalar(spearman)),
            ("corr", MetricValue::Scalar((pearson + spearman) / 2.0)),
        ],
    );
}

#[test]
fn pearson_and_spearman_undefined() {
    let preds = Predictions::from(vec![3.0, 3.0, 3.0]);
    let labels = Predictions::from(vec![1.0, 2.0, 3.0]);
    let reporter = compute_metrics("pear_spear", &preds, &labels).unwrap();
    assert!(reporter.scalar("pearson").unwrap().is_nan());

    let config = MetricsConfigBuilder::default()
        .undefined_correlation(UndefinedCorrelationStrat::ReturnError)
        .build();
    let actual = compute_metrics_conf(Metric::PearSpear, &preds, &labels, &config);
    assert!(matches!(
        actual,
        Err(ComputationError::UndefinedCorrelation(_))
    ));
}

#[test]
fn seq_f1_entity_level() {
    let labels = Predictions::from(vec![
        vec!["O", "O", "O", "B-MISC", "I-MISC", "I-MISC", "O"],
        vec!["B-PER", "I-PER", "O"],
    ]);
    let preds = Predictions::from(vec![
        vec!["O", "O", "B-MISC", "I-MISC", "I-MISC", "I-MISC", "O"],
        vec!["B-PER", "I-PER", "O"],
    ]);
    let reporter = compute_metrics("seq_f1", &preds, &labels).unwrap();
    assert_report(reporter, vec![("seq_f1", MetricValue::Scalar(0.5))]);
}

#[test]
fn postprocessed_seq_f1_cleans_predictions() {
    let labels = Predictions::from(vec![vec!["O", "B-PER", "I-PER", "O"]]);
    let preds = Predictions::from(vec![vec!["X", "B-PER", "I-PER", "[PAD]"]]);
    let reporter = compute_metrics("postprocessed_seq_f1", &preds, &labels).unwrap();
    assert_report(reporter, vec![("f1_seq_p", MetricValue::Scalar(1.0))]);

    let preds = Predictions::from(vec![vec!["I-PER", "B-PER", "I-PER", "I-LOC"]]);
    let reporter = compute_metrics("postprocessed_seq_f1", &preds, &labels).unwrap();
    assert_report(reporter, vec![("f1_seq_p", MetricValue::Scalar(1.0))]);
    // Without the repair, the orphaned tags become entities of their own
    let reporter = compute_metrics("seq_f1", &preds, &labels).unwrap();
    assert_report(reporter, vec![("seq_f1", MetricValue::Scalar(0.5))]);
}

#[test]
fn postprocessed_seq_f1_invalid_tag() {
    let labels = Predictions::from(vec![vec!["O", "B-PER"]]);
    let preds = Predictions::from(vec![vec!["E-PER", "B-PER"]]);
    let actual = compute_metrics("postprocessed_seq_f1", &preds, &labels);
    assert!(matches!(actual, Err(ComputationError::InvalidTag(_))));
}

#[test]
fn squad_keeps_the_tuple_shape() {
    let preds = Predictions::from(vec![array![2, 0, 4], array![5, 0, 6]]);
    let labels = Predictions::from(vec![array![3, 0, 1], array![5, 0, 3]]);
    let reporter = compute_metrics("squad", &preds, &labels).unwrap();
    let json = serde_json::to_value(&reporter).unwrap();
    assert!(json["EM"].is_number());
    assert_eq!(json["f1"].as_array().map(Vec::len), Some(3));
    assert_report(
        reporter,
        vec![
            ("EM", MetricValue::Scalar(1.0 / 3.0)),
            ("f1", MetricValue::Triple(5.0 / 9.0, 2.0 / 3.0, 0.6)),
        ],
    );
}

#[test]
fn unknown_metric_is_rejected() {
    let preds = Predictions::from(vec![1, 0]);
    let actual = compute_metrics("bleu", &preds, &preds).unwrap_err();
    assert!(matches!(actual, ComputationError::UnknownMetric(_)));
    assert!(actual.to_string().contains("postprocessed_seq_f1"));
}

#[test]
fn inconsistent_length_is_rejected() {
    let preds = Predictions::from(vec![1, 0, 1]);
    let labels = Predictions::from(vec!["1", "0"]);
    let actual = compute_metrics("acc", &preds, &labels);
    assert!(matches!(
        actual,
        Err(ComputationError::InconsistentLength(_))
    ));
}

#[test]
fn zero_division_strategy_is_configurable() {
    let preds = Predictions::from(vec![0, 0, 0]);
    let labels = Predictions::from(vec![0, 0, 0]);
    let config = MetricsConfigBuilder::default()
        .division_by_zero(DivByZeroStrat::ReturnError)
        .build();
    let actual = compute_metrics_conf(Metric::AccF1, &preds, &labels, &config);
    assert!(matches!(actual, Err(ComputationError::DivisionByZero(_))));
    let reporter = compute_metrics("acc_f1", &preds, &labels).unwrap();
    assert_eq!(reporter.scalar("f1"), Some(0.0));
}

#[test]
fn every_metric_parses_from_its_name() {
    for metric in Metric::all() {
        assert_eq!(metric.name().parse::<Metric>(), Ok(metric));
    }
}
