//! Conversion of records into acknowledgements.

use crate::core::{EventIdAware, ResponseStatus};

/// Maps records (and optional failure messages) into [`ResponseStatus`] values.
///
/// Pure and stateless; list forms preserve input order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseStatusConverter;

impl ResponseStatusConverter {
    /// `OK` status for a processed record.
    #[must_use]
    pub fn convert<T: EventIdAware>(&self, record: &T) -> ResponseStatus {
        ResponseStatus::ok(record.id())
    }

    /// `ERROR` status carrying `message`.
    pub fn convert_with_error<T: EventIdAware>(
        &self,
        record: &T,
        message: impl Into<String>,
    ) -> ResponseStatus {
        ResponseStatus::error(record.id(), message)
    }

    /// `SKIPPED` status for a record the filter discarded.
    #[must_use]
    pub fn skip<T: EventIdAware>(&self, record: &T) -> ResponseStatus {
        ResponseStatus::skipped(record.id())
    }

    /// `OK` statuses for every record.
    #[must_use]
    pub fn convert_list<T: EventIdAware>(&self, records: &[T]) -> Vec<ResponseStatus> {
        records.iter().map(|record| self.convert(record)).collect()
    }

    /// `ERROR` statuses for every record, all sharing `message`.
    #[must_use]
    pub fn convert_list_with_error<T: EventIdAware>(
        &self,
        records: &[T],
        message: &str,
    ) -> Vec<ResponseStatus> {
        records
            .iter()
            .map(|record| self.convert_with_error(record, message))
            .collect()
    }
}
