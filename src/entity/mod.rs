use crate::datastructure::FlatSequences;
use ahash::AHashSet;
use std::{error::Error, fmt::Display, ops::Deref};
use tracing::debug;

mod bio;

// Re-exporting
pub use bio::{correct_bio_encodings, BioState, BioTransition};
pub(crate) use bio::normalize_sentinels;

/// Prefix of a token, such as the `B` of `B-PER`. Every character other than the ones of the
/// IOBES family is kept as is.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Prefix {
    I,
    O,
    B,
    E,
    S,
    Other(char),
}

impl From<char> for Prefix {
    fn from(value: char) -> Self {
        match value {
            'I' => Self::I,
            'O' => Self::O,
            'B' => Self::B,
            'E' => Self::E,
            'S' => Self::S,
            other => Self::Other(other),
        }
    }
}

impl Prefix {
    /// `O` and `.` never belong to a chunk.
    fn is_outside(&self) -> bool {
        matches!(self, Self::O | Self::Other('.'))
    }
}

/// A token split into its prefix and its type (e.g. `B-PER` into `B` and `PER`).
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InnerToken<'a> {
    pub(crate) prefix: Prefix,
    pub(crate) tag: &'a str,
}

impl<'a> InnerToken<'a> {
    /// Token appended after every sentence.
    const OUTSIDE: InnerToken<'static> = InnerToken {
        prefix: Prefix::O,
        tag: "_",
    };

    /// Leniently parses a token. The prefix is the first character (or the last one if `suffix`
    /// is `true`) and the type is what follows the first `-` delimiter (what precedes the last
    /// one if `suffix` is `true`), `_` if nothing does. Returns `None` for an empty token.
    pub(crate) fn try_new(token: &'a str, suffix: bool) -> Option<Self> {
        let (prefix, tag) = if suffix {
            let prefix = token.chars().next_back()?;
            let rest = &token[..token.len() - prefix.len_utf8()];
            (prefix, rest.rsplit_once('-').map_or(rest, |(tag, _)| tag))
        } else {
            let prefix = token.chars().next()?;
            let rest = &token[prefix.len_utf8()..];
            (prefix, rest.split_once('-').map_or(rest, |(_, tag)| tag))
        };
        Some(Self {
            prefix: Prefix::from(prefix),
            tag: if tag.is_empty() { "_" } else { tag },
        })
    }
}

/// An entity represent a named objet in named entity recognition (NER). It contains a start and an
/// end (i.e. the index of its first and last tokens, both included) and a tag, which the
/// associated entity (such as `LOC`, `NAME`, `PER`, etc.)
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Entity<'a> {
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) tag: &'a str,
}

impl<'a> Entity<'a> {
    pub(crate) fn new(start: usize, end: usize, tag: &'a str) -> Self {
        Entity { start, end, tag }
    }
}

impl<'a> Display for Entity<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.tag, self.start, self.end)
    }
}

#[derive(Debug, PartialEq, Clone, Default)]
/// Entities found in a list of sentences, in order of appearance. Positions are indices into the
/// concatenation of the sentences, each sentence being followed by an outside token.
pub(crate) struct Entities<'a>(Vec<Entity<'a>>);

impl<'a> Deref for Entities<'a> {
    type Target = Vec<Entity<'a>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'a> Entities<'a> {
    /// Collects the entities into a set, dropping duplicates.
    pub(crate) fn unique(&self) -> AHashSet<Entity<'a>> {
        self.0.iter().copied().collect()
    }
}

/// Error returned when a tag can't be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTagError {
    pub(crate) tag: String,
    /// Sentence and position of the tag, when known
    pub(crate) position: Option<(usize, usize)>,
}

impl InvalidTagError {
    pub(crate) fn new<S: Into<String>>(tag: S) -> Self {
        Self {
            tag: tag.into(),
            position: None,
        }
    }
    pub(crate) fn at(mut self, sentence: usize, position: usize) -> Self {
        self.position = Some((sentence, position));
        self
    }
}

impl Display for InvalidTagError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.position {
            Some((sentence, position)) => write!(
                f,
                "Invalid tag `{}` in sentence {} at position {}",
                self.tag, sentence, position
            ),
            None => write!(f, "Invalid tag `{}`", self.tag),
        }
    }
}
impl Error for InvalidTagError {}

/// Leniently retrieves the entities from a list of sentences. An outside token is appended after
/// every sentence, so that no chunk spans two sentences.
pub(crate) fn get_entities_lenient<'a>(
    sequences: &FlatSequences<&'a str>,
    suffix: bool,
) -> Result<Entities<'a>, InvalidTagError> {
    let mut chunker = LenientChunker::default();
    let mut entities = Vec::new();
    let mut unknown_prefixes = 0usize;
    for (sentence_index, sentence) in sequences.iter_vec().enumerate() {
        for (position, token) in sentence.iter().enumerate() {
            let inner_token = InnerToken::try_new(*token, suffix)
                .ok_or_else(|| InvalidTagError::new(*token).at(sentence_index, position))?;
            if matches!(inner_token.prefix, Prefix::Other(_)) {
                unknown_prefixes += 1;
            }
            entities.extend(chunker.push(inner_token));
        }
        entities.extend(chunker.push(InnerToken::OUTSIDE));
    }
    if unknown_prefixes > 0 {
        debug!(unknown_prefixes, "chunked tokens with a prefix outside of IOBES");
    }
    Ok(Entities(entities))
}

/// Chunking state carried from one token to the next.
struct LenientChunker<'a> {
    /// The prefix of the previous token (e.g. 'I')
    prev_prefix: Prefix,
    /// The type of the previous token (e.g. `"PER"`)
    prev_type: &'a str,
    begin_offset: usize,
    index: usize,
}

impl<'a> Default for LenientChunker<'a> {
    fn default() -> Self {
        Self {
            prev_prefix: Prefix::O,
            prev_type: "",
            begin_offset: 0,
            index: 0,
        }
    }
}

impl<'a> LenientChunker<'a> {
    /// Consumes the next token. Returns the chunk ending right before it, if any.
    fn push(&mut self, token: InnerToken<'a>) -> Option<Entity<'a>> {
        let mut ended = None;
        if self.end_of_chunk(&token) {
            ended = Some(Entity::new(self.begin_offset, self.index - 1, self.prev_type));
        }
        if self.start_of_chunk(&token) {
            self.begin_offset = self.index;
        }
        self.prev_prefix = token.prefix;
        self.prev_type = token.tag;
        self.index += 1;
        ended
    }

    /// Checks if a chunk ended between the previous and current token.
    fn end_of_chunk(&self, current: &InnerToken<'a>) -> bool {
        match (self.prev_prefix, current.prefix) {
            (Prefix::E, _) | (Prefix::S, _) => true,
            (Prefix::B, Prefix::B) | (Prefix::B, Prefix::S) | (Prefix::B, Prefix::O) => true,
            (Prefix::I, Prefix::B) | (Prefix::I, Prefix::S) | (Prefix::I, Prefix::O) => true,
            (prev_prefix, _) => !prev_prefix.is_outside() && self.prev_type != current.tag,
        }
    }

    /// Checks if a chunk started between the previous and current token.
    fn start_of_chunk(&self, current: &InnerToken<'a>) -> bool {
        match (self.prev_prefix, current.prefix) {
            (_, Prefix::B) | (_, Prefix::S) => true,
            (Prefix::E, Prefix::E) | (Prefix::E, Prefix::I) => true,
            (Prefix::S, Prefix::E) | (Prefix::S, Prefix::I) => true,
            (Prefix::O, Prefix::E) | (Prefix::O, Prefix::I) => true,
            (_, current_prefix) => !current_prefix.is_outside() && self.prev_type != current.tag,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {

    use super::*;
    use enum_iterator::{all, Sequence};
    use quickcheck::{self, TestResult};
    use rstest::rstest;

    impl<'a> Entity<'a> {
        pub fn as_tuple(&self) -> (usize, usize, &'a str) {
            (self.start, self.end, self.tag)
        }
    }

    fn entities_of(sentences: Vec<Vec<&str>>, suffix: bool) -> Vec<(usize, usize, &str)> {
        let sequences = FlatSequences::new(sentences);
        get_entities_lenient(&sequences, suffix)
            .unwrap()
            .iter()
            .map(|e| e.as_tuple())
            .collect()
    }

    #[rstest]
    #[case("B-PER", false, Prefix::B, "PER")]
    #[case("O", false, Prefix::O, "_")]
    #[case("I-PER-X", false, Prefix::I, "PER-X")]
    #[case("BPER", false, Prefix::B, "PER")]
    #[case("X", false, Prefix::Other('X'), "_")]
    #[case("PER-B", true, Prefix::B, "PER")]
    #[case("PER-X-I", true, Prefix::I, "PER-X")]
    #[case("O", true, Prefix::O, "_")]
    fn test_inner_token(
        #[case] token: &str,
        #[case] suffix: bool,
        #[case] prefix: Prefix,
        #[case] tag: &str,
    ) {
        let actual = InnerToken::try_new(token, suffix).unwrap();
        assert_eq!(actual, InnerToken { prefix, tag });
    }

    #[test]
    fn test_inner_token_empty() {
        assert_eq!(InnerToken::try_new("", false), None);
        assert_eq!(InnerToken::try_new("", true), None);
    }

    #[test]
    fn test_get_entities_lenient() {
        let actual = entities_of(vec![vec!["B-PER", "I-PER", "O", "B-LOC"]], false);
        assert_eq!(actual, vec![(0, 1, "PER"), (3, 3, "LOC")])
    }

    #[test]
    fn test_get_entities() {
        let seq = vec![vec![
            "O", "O", "O", "B-MISC", "I-MISC", "I-MISC", "O", "B-PER", "I-PER",
        ]];
        let expected: Vec<(usize, usize, &str)> = vec![(3, 5, "MISC"), (7, 8, "PER")];
        assert_eq!(expected, entities_of(seq, false))
    }

    #[test]
    fn test_get_entities_with_suffix() {
        let seq = vec![vec![
            "O", "O", "O", "MISC-B", "MISC-I", "MISC-I", "O", "PER-B", "PER-I",
        ]];
        let expected: Vec<(usize, usize, &str)> = vec![(3, 5, "MISC"), (7, 8, "PER")];
        assert_eq!(expected, entities_of(seq, true))
    }

    #[rstest]
    #[case(vec!["B-PER", "B-LOC"], vec![(0, 0, "PER"), (1, 1, "LOC")])]
    #[case(vec!["I-PER", "I-LOC"], vec![(0, 0, "PER"), (1, 1, "LOC")])]
    #[case(vec!["I-PER", "I-PER", "B-PER"], vec![(0, 1, "PER"), (2, 2, "PER")])]
    #[case(vec!["B-PER", "E-PER", "I-PER"], vec![(0, 1, "PER"), (2, 2, "PER")])]
    #[case(vec!["S-PER", "S-PER"], vec![(0, 0, "PER"), (1, 1, "PER")])]
    #[case(vec!["B-PER", "I-LOC", "O"], vec![(0, 0, "PER"), (1, 1, "LOC")])]
    fn test_chunk_boundaries(
        #[case] sentence: Vec<&str>,
        #[case] expected: Vec<(usize, usize, &str)>,
    ) {
        assert_eq!(entities_of(vec![sentence], false), expected)
    }

    #[test]
    fn test_entities_do_not_span_sentences() {
        let actual = entities_of(vec![vec!["O", "B-PER"], vec!["I-PER", "O"]], false);
        // Flattened: O B-PER O I-PER O O
        assert_eq!(actual, vec![(1, 1, "PER"), (3, 3, "PER")])
    }

    #[test]
    fn test_get_entities_invalid_token() {
        let sequences = FlatSequences::new(vec![vec!["O"], vec!["B-PER", ""]]);
        let actual = get_entities_lenient(&sequences, false);
        assert_eq!(actual, Err(InvalidTagError::new("").at(1, 1)));
    }

    #[test]
    fn test_unique_entities() {
        let entities = Entities(vec![
            Entity::new(0, 1, "PER"),
            Entity::new(0, 1, "PER"),
            Entity::new(3, 3, "LOC"),
        ]);
        let expected: AHashSet<Entity> =
            AHashSet::from_iter([Entity::new(0, 1, "PER"), Entity::new(3, 3, "LOC")]);
        assert_eq!(entities.unique(), expected);
    }

    #[test]
    fn test_invalid_tag_display() {
        assert_eq!(InvalidTagError::new("Z-PER").to_string(), "Invalid tag `Z-PER`");
        assert_eq!(
            InvalidTagError::new("Z-PER").at(2, 4).to_string(),
            "Invalid tag `Z-PER` in sentence 2 at position 4"
        );
    }

    #[derive(Debug, PartialEq, Hash, Clone, Copy, Sequence, Eq)]
    pub(crate) enum TokensToTest {
        BPER,
        BGEO,
        BLOC,
        O,
    }
    impl From<TokensToTest> for &str {
        fn from(value: TokensToTest) -> Self {
            match value {
                TokensToTest::BPER => "B-PER",
                TokensToTest::BLOC => "B-LOC",
                TokensToTest::BGEO => "B-GEO",
                TokensToTest::O => "O",
            }
        }
    }
    impl quickcheck::Arbitrary for TokensToTest {
        fn arbitrary(g: &mut quickcheck::Gen) -> Self {
            let choice_slice: Vec<TokensToTest> = all::<TokensToTest>().collect();
            *g.choose(choice_slice.as_ref()).unwrap()
        }
    }

    #[test]
    fn test_propertie_single_token_entities() {
        fn propertie_begin_and_outside_only(tokens: Vec<Vec<TokensToTest>>) -> TestResult {
            let sentences: Vec<Vec<&str>> = tokens
                .iter()
                .map(|v| v.iter().map(|t| <&str>::from(*t)).collect())
                .collect();
            let expected = sentences.iter().flatten().filter(|t| **t != "O").count();
            let sequences = FlatSequences::new(sentences);
            let entities = get_entities_lenient(&sequences, false).unwrap();
            if entities.len() != expected {
                return TestResult::failed();
            }
            for entity in entities.iter() {
                if entity.end != entity.start {
                    return TestResult::failed();
                };
            }
            TestResult::passed()
        }
        let mut qc = quickcheck::QuickCheck::new().tests(2000);
        qc.quickcheck(
            propertie_begin_and_outside_only as fn(Vec<Vec<TokensToTest>>) -> TestResult,
        )
    }
}
