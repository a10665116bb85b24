use std::sync::Arc;

use tracing::debug;

use super::domain::{Cohort, ScheduleTag};
use super::repository::{EnrollmentStore, StoreError};

pub const DEFAULT_SECONDARY_CAPACITY: usize = 3000;

/// Answers whether the secondary cohort has reached its enrollment limit.
///
/// The count is read from the store on every call; concurrent consents may overshoot the
/// limit slightly, which is tolerated.
pub struct CapacityCounter<S> {
    store: Arc<S>,
    limit: usize,
}

impl<S> CapacityCounter<S>
where
    S: EnrollmentStore,
{
    pub fn new(store: Arc<S>, limit: usize) -> Self {
        Self { store, limit }
    }

    pub fn is_secondary_cohort_full(&self) -> Result<bool, StoreError> {
        let schedule = ScheduleTag::Enrollment {
            cohort: Cohort::Secondary,
        }
        .schedule_name();
        let enrolled = self.store.count_active(&schedule)?;
        debug!(enrolled, limit = self.limit, "secondary cohort occupancy");
        Ok(enrolled >= self.limit)
    }
}
