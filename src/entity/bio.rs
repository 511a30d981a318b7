/**
Repair of ill-formed BIO sequences. Each sentence is scanned left to right by a two-state
automaton: an `I-` tag survives only as the continuation of an entity of the same class, otherwise
it is demoted to `O`.
*/
use crate::datastructure::FlatSequences;
use crate::entity::InvalidTagError;
use tracing::{debug, trace};

/// State of the BIO automaton.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum BioState {
    /// Outside of any entity
    #[default]
    Inactive,
    /// Inside an entity of the given class
    Active(String),
}

/// What happens to the tag consumed by `BioState::step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BioTransition {
    /// The tag is valid and is kept as is.
    Keep,
    /// The tag is an orphaned or mismatched continuation and must be replaced by `O`.
    Demote,
}

impl BioState {
    /// Consumes `tag` and moves to the next state:
    /// * `B-C` activates the class `C`, whatever the current state;
    /// * `O` deactivates;
    /// * `I-C` is kept while `C` is active, otherwise it is demoted and the automaton deactivates.
    ///
    /// Any other tag is invalid.
    pub fn step(&mut self, tag: &str) -> Result<BioTransition, InvalidTagError> {
        if let Some(class) = tag.strip_prefix("B-") {
            *self = Self::Active(String::from(class));
            Ok(BioTransition::Keep)
        } else if tag == "O" {
            *self = Self::Inactive;
            Ok(BioTransition::Keep)
        } else if let Some(class) = tag.strip_prefix("I-") {
            match self {
                Self::Active(active) if active == class => Ok(BioTransition::Keep),
                _ => {
                    *self = Self::Inactive;
                    Ok(BioTransition::Demote)
                }
            }
        } else {
            Err(InvalidTagError::new(tag))
        }
    }
}

/// Replaces the invalid `I-` tags of every sentence by `O`. The automaton starts inactive at the
/// beginning of each sentence. Running it on its own output changes nothing.
///
/// * `predictions`: Tagged sentences. Every tag must be `O`, `B-<class>` or `I-<class>`.
pub fn correct_bio_encodings(
    predictions: Vec<Vec<String>>,
) -> Result<Vec<Vec<String>>, InvalidTagError> {
    let mut sequences = FlatSequences::new(predictions);
    let mut demoted = 0usize;
    for (sentence_index, sentence) in sequences.iter_vec_mut().enumerate() {
        let mut state = BioState::default();
        for (position, tag) in sentence.iter_mut().enumerate() {
            let transition = state
                .step(tag)
                .map_err(|e| e.at(sentence_index, position))?;
            if transition == BioTransition::Demote {
                trace!(
                    sentence = sentence_index,
                    position,
                    tag = tag.as_str(),
                    "demoting tag to O"
                );
                *tag = String::from("O");
                demoted += 1;
            }
        }
    }
    debug!(demoted, tokens = sequences.len(), "corrected BIO encodings");
    Ok(sequences.into())
}

/// Maps every sentinel token (e.g. `"X"` or `"[PAD]"`) to `O`, leaving the input untouched.
pub(crate) fn normalize_sentinels<S: AsRef<str>>(
    sentences: &[Vec<S>],
    sentinels: &[String],
) -> Vec<Vec<String>> {
    sentences
        .iter()
        .map(|sentence| {
            sentence
                .iter()
                .map(|token| {
                    let token = token.as_ref();
                    if sentinels.iter().any(|s| s == token) {
                        String::from("O")
                    } else {
                        String::from(token)
                    }
                })
                .collect()
        })
        .collect()
}
