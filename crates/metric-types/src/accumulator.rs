//! Downstream sink for decoded metrics.

use chrono::{DateTime, Utc};

use crate::metric::{Fields, Tags};

/// Boxed error handed to [`Accumulator::add_error`].
pub type IngestError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Receives metrics decoded by a running input, plus the non-fatal errors
/// encountered while producing them.
///
/// Implementations are called from the consumer's background task and must
/// not block for long; buffering and flushing are the implementation's
/// concern.
pub trait Accumulator: Send + Sync {
    /// Accept one metric observation.
    fn add_fields(&self, name: &str, fields: Fields, tags: Tags, timestamp: DateTime<Utc>);

    /// Accept an ingestion error (parse failure, broker error, close failure).
    fn add_error(&self, error: IngestError);
}
