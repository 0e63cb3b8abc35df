use futures::future::BoxFuture;

use crate::errors::BackendError;
use crate::ride::{RideFilter, RidePatch, RideRecord};

pub mod memory;
mod postgres;

pub use self::postgres::PgRideStore;

/// The persistence collaborator holding ride records.
///
/// Two implementations exist: [`PgRideStore`] for production and
/// [`memory::MemoryRideStore`] as a process-lifetime fallback when no
/// database is configured. The implementation is chosen once at
/// startup and injected through the environment.
pub trait RideStore: Send + Sync {
    /// Inserts the record and returns it with its assigned identifier.
    fn insert(&self, ride: RideRecord) -> BoxFuture<Result<RideRecord, BackendError>>;

    /// Returns every record matching the filter, in the requested
    /// order. An empty filter returns all records.
    fn find(&self, filter: RideFilter) -> BoxFuture<Result<Vec<RideRecord>, BackendError>>;

    /// Merges the patch into the record with the given identifier.
    /// Returns `false` when nothing matched, including identifiers the
    /// store cannot interpret; a missing record is a no-op, not an
    /// error.
    fn update(&self, id: &str, patch: RidePatch) -> BoxFuture<Result<bool, BackendError>>;
}
