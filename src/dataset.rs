use crate::{query::Row, value::Value};

/// Lazily yields `len` rows whose `field` holds the stringified sequence `0..len`.
#[derive(Debug, Clone)]
pub struct SequenceDataset {
    field: String,
    next: usize,
    len: usize,
}

impl SequenceDataset {
    #[must_use]
    pub fn new(field: impl Into<String>, len: usize) -> Self {
        Self {
            field: field.into(),
            next: 0,
            len,
        }
    }
}

impl Iterator for SequenceDataset {
    type Item = Row;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }

        let row = Row::from([(self.field.clone(), Value::Text(self.next.to_string()))]);
        self.next += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.len - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for SequenceDataset {}
