//! Filter evaluation ahead of listener invocation.

use std::borrow::Cow;

use crate::core::{EventIdAware, RecordFilter, ResponseStatus, ResponseStatusConverter};

/// A batch after filtering: `SKIPPED` statuses for the discarded records and
/// the records that still go to the listener, in their original order.
#[derive(Debug)]
pub struct FilteredBatch<'a, T: Clone> {
    /// One `SKIPPED` status per discarded record.
    pub skipped: Vec<ResponseStatus>,
    /// Records that survived the filter.
    pub records: Cow<'a, [T]>,
}

/// Applies an endpoint's optional [`RecordFilter`].
///
/// Without a filter nothing is discarded and batches are passed through
/// without copying.
pub struct FilterEvaluator<'f, T> {
    filter: Option<&'f dyn RecordFilter<T>>,
    converter: ResponseStatusConverter,
}

impl<'f, T: EventIdAware> FilterEvaluator<'f, T> {
    /// Evaluator for the given (optional) filter.
    #[must_use]
    pub const fn new(filter: Option<&'f dyn RecordFilter<T>>) -> Self {
        Self {
            filter,
            converter: ResponseStatusConverter,
        }
    }

    /// Whether `record` should be discarded.
    #[must_use]
    pub fn should_discard(&self, record: &T) -> bool {
        self.filter.is_some_and(|filter| filter.discard(record))
    }

    /// `SKIPPED` status for `record` if the filter discards it.
    #[must_use]
    pub fn filter_record(&self, record: &T) -> Option<ResponseStatus> {
        self.should_discard(record)
            .then(|| self.converter.skip(record))
    }

    /// Split a batch into discarded records (as `SKIPPED` statuses) and the
    /// remaining records. The filter is consulted exactly once per record.
    #[must_use]
    pub fn filter_batch<'a>(&self, records: &'a [T]) -> FilteredBatch<'a, T> {
        if self.filter.is_none() {
            return FilteredBatch {
                skipped: Vec::new(),
                records: Cow::Borrowed(records),
            };
        }

        let mut skipped = Vec::new();
        let mut kept = Vec::with_capacity(records.len());
        for record in records {
            if self.should_discard(record) {
                skipped.push(self.converter.skip(record));
            } else {
                kept.push(record.clone());
            }
        }

        let records = if skipped.is_empty() {
            Cow::Borrowed(records)
        } else {
            Cow::Owned(kept)
        };
        FilteredBatch { skipped, records }
    }
}
