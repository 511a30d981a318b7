/**
This module computes the entity-level F1 of tagged sentences. Entities are extracted leniently from
both the true and the predicted sentences and an entity counts as correct only if its type, start
and end all match.
*/
use crate::config::MetricsConfig;
use crate::datastructure::FlatSequences;
use crate::entity::{correct_bio_encodings, get_entities_lenient, normalize_sentinels};
use crate::metrics::{check_consistent_sequence_lengths, f_score, prf_divide, ComputationError};
use ndarray::array;
use tracing::debug;

/// Micro-averaged entity-level scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeqScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of true entities
    pub support: usize,
}

/// Computes the micro-averaged precision, recall and F1 of the entities found in `y_pred` against
/// the ones found in `y_true`.
///
/// * `y_true`: True tagged sentences
/// * `y_pred`: Predicted tagged sentences
/// * `config`: `suffix` locates the prefix of the tags, `zero_division` handles the absence of
///   true or predicted entities
pub fn seq_scores<T: AsRef<str>, P: AsRef<str>>(
    y_true: &[Vec<T>],
    y_pred: &[Vec<P>],
    config: &MetricsConfig,
) -> Result<SeqScores, ComputationError> {
    check_consistent_sequence_lengths(y_true, y_pred)?;
    let true_sequences: FlatSequences<&str> = y_true
        .iter()
        .map(|sentence| sentence.iter().map(AsRef::as_ref))
        .collect();
    let pred_sequences: FlatSequences<&str> = y_pred
        .iter()
        .map(|sentence| sentence.iter().map(AsRef::as_ref))
        .collect();
    let true_entities = get_entities_lenient(&true_sequences, config.suffix)?.unique();
    let pred_entities = get_entities_lenient(&pred_sequences, config.suffix)?.unique();
    let tp = true_entities.intersection(&pred_entities).count();
    debug!(
        true_entities = true_entities.len(),
        pred_entities = pred_entities.len(),
        tp,
        "matched entities"
    );
    let tp_sum = array![tp as f64];
    let precision = prf_divide(
        &tp_sum,
        &array![pred_entities.len() as f64],
        config.zero_division,
        "precision",
    )?;
    let recall = prf_divide(
        &tp_sum,
        &array![true_entities.len() as f64],
        config.zero_division,
        "recall",
    )?;
    let f1 = f_score(&precision, &recall);
    Ok(SeqScores {
        precision: precision[0],
        recall: recall[0],
        f1: f1[0],
        support: true_entities.len(),
    })
}

/// Entity-level F1 of `y_pred` against `y_true`.
pub fn seq_f1<T: AsRef<str>, P: AsRef<str>>(
    y_true: &[Vec<T>],
    y_pred: &[Vec<P>],
    config: &MetricsConfig,
) -> Result<f64, ComputationError> {
    Ok(seq_scores(y_true, y_pred, config)?.f1)
}

/// Entity-level F1 of cleaned predictions. The sentinel tokens of `config` are mapped to `O` and
/// the invalid `I-` tags are demoted with `correct_bio_encodings` before scoring. `y_pred` itself
/// is left untouched.
pub fn postprocessed_seq_f1<T: AsRef<str>, P: AsRef<str>>(
    y_true: &[Vec<T>],
    y_pred: &[Vec<P>],
    config: &MetricsConfig,
) -> Result<f64, ComputationError> {
    check_consistent_sequence_lengths(y_true, y_pred)?;
    let normalized = normalize_sentinels(y_pred, &config.sentinel_tokens);
    let repaired = correct_bio_encodings(normalized)?;
    seq_f1(y_true, &repaired, config)
}
