use std::mem;

/// Sentences flattened into a single buffer to reduce cache misses. `indices` holds the offset of
/// every sentence boundary: sentence `i` spans `tokens[indices[i]..indices[i + 1]]`. Empty
/// sentences are kept and yield empty slices.
#[derive(Debug, Eq, PartialEq, Hash, Clone)]
pub(crate) struct FlatSequences<T> {
    pub(crate) tokens: Box<[T]>,
    pub(crate) indices: Box<[usize]>,
}

impl<T> Default for FlatSequences<T> {
    fn default() -> Self {
        Self {
            tokens: Box::new([]),
            indices: Box::new([0]),
        }
    }
}

impl<T> FlatSequences<T> {
    pub(crate) fn new(vecs: Vec<Vec<T>>) -> Self {
        Self::from(vecs)
    }

    /// Total number of tokens.
    pub(crate) fn len(&self) -> usize {
        self.tokens.len()
    }

    pub(crate) fn iter_vec(&self) -> VecsIter<'_, T> {
        VecsIter {
            tokens: &self.tokens,
            bounds: self.indices.windows(2),
        }
    }

    pub(crate) fn iter_vec_mut(&mut self) -> VecsIterMut<'_, T> {
        VecsIterMut {
            rest: &mut self.tokens,
            offset: 0,
            bounds: self.indices.windows(2),
        }
    }
}

impl<T> From<Vec<Vec<T>>> for FlatSequences<T> {
    #[inline(always)]
    fn from(value: Vec<Vec<T>>) -> Self {
        value.into_iter().collect()
    }
}

impl<T, S: IntoIterator<Item = T>> FromIterator<S> for FlatSequences<T> {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut flattened = Vec::new();
        let mut indices = vec![0];
        for sentence in iter {
            flattened.extend(sentence);
            indices.push(flattened.len());
        }
        Self {
            tokens: flattened.into_boxed_slice(),
            indices: indices.into_boxed_slice(),
        }
    }
}

impl<T> From<FlatSequences<T>> for Vec<Vec<T>> {
    fn from(value: FlatSequences<T>) -> Self {
        let mut tokens = value.tokens.into_vec().into_iter();
        value
            .indices
            .windows(2)
            .map(|bounds| tokens.by_ref().take(bounds[1] - bounds[0]).collect())
            .collect()
    }
}

pub(crate) struct VecsIter<'a, T> {
    tokens: &'a [T],
    bounds: std::slice::Windows<'a, usize>,
}

impl<'a, T> Iterator for VecsIter<'a, T> {
    type Item = &'a [T];
    fn next(&mut self) -> Option<Self::Item> {
        let bounds = self.bounds.next()?;
        self.tokens.get(bounds[0]..bounds[1])
    }
}

pub(crate) struct VecsIterMut<'a, T> {
    rest: &'a mut [T],
    offset: usize,
    bounds: std::slice::Windows<'a, usize>,
}

impl<'a, T> Iterator for VecsIterMut<'a, T> {
    type Item = &'a mut [T];
    fn next(&mut self) -> Option<Self::Item> {
        let bounds = self.bounds.next()?;
        let rest = mem::take(&mut self.rest);
        let (sentence, rest) = rest.split_at_mut(bounds[1] - self.offset);
        self.rest = rest;
        self.offset = bounds[1];
        Some(sentence)
    }
}
