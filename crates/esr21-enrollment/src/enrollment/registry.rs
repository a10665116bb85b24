use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::domain::{
    EnrollmentRecord, EnrollmentStatus, Placement, PlacementResult, ScheduleName, ScheduleTag,
    SubjectIdentifier,
};
use super::repository::EnrollmentStore;
use super::schedule::ScheduleDefinitionProvider;
use super::service::EnrollmentError;

/// Resolves schedule names and applies idempotent put-on-schedule semantics.
pub struct ScheduleRegistry<P, S> {
    provider: Arc<P>,
    store: Arc<S>,
}

impl<P, S> ScheduleRegistry<P, S>
where
    P: ScheduleDefinitionProvider,
    S: EnrollmentStore,
{
    pub fn new(provider: Arc<P>, store: Arc<S>) -> Self {
        Self { provider, store }
    }

    pub fn place_tag(
        &self,
        tag: ScheduleTag,
        subject: &SubjectIdentifier,
        event_datetime: DateTime<Utc>,
    ) -> Result<Placement, EnrollmentError> {
        self.place_on_schedule(&tag.schedule_name(), subject, event_datetime)
    }

    /// Placement for a re-delivered event: refresh the active enrollment, create one the
    /// participant never had, but leave a schedule they were taken off closed.
    pub fn replay_tag(
        &self,
        tag: ScheduleTag,
        subject: &SubjectIdentifier,
        event_datetime: DateTime<Utc>,
    ) -> Result<Placement, EnrollmentError> {
        let schedule_name = tag.schedule_name();
        if self.store.find_active(subject, &schedule_name)?.is_none() {
            let closed = self
                .store
                .enrollments_for(subject)?
                .into_iter()
                .filter(|record| record.schedule_name == schedule_name && !record.is_active())
                .max_by_key(|record| record.enrollment_datetime);
            if let Some(record) = closed {
                debug!(%subject, schedule = %schedule_name, "schedule closed, not reopened");
                return Ok(Placement {
                    result: PlacementResult::Closed,
                    record,
                });
            }
        }

        self.place_on_schedule(&schedule_name, subject, event_datetime)
    }

    /// Open an enrollment on `schedule_name`, or refresh the active one if it exists.
    pub fn place_on_schedule(
        &self,
        schedule_name: &ScheduleName,
        subject: &SubjectIdentifier,
        event_datetime: DateTime<Utc>,
    ) -> Result<Placement, EnrollmentError> {
        let definition = self
            .provider
            .lookup(schedule_name)
            .ok_or_else(|| EnrollmentError::UnknownSchedule(schedule_name.clone()))?;

        if let Some(mut record) = self.store.find_active(subject, schedule_name)? {
            record.next_visit = definition.next_visit(record.enrollment_datetime, event_datetime);
            record.refreshed_at = Some(event_datetime);
            self.store.update(record.clone())?;
            debug!(%subject, schedule = %schedule_name, "refreshed schedule");
            return Ok(Placement {
                result: PlacementResult::Refreshed,
                record,
            });
        }

        let record = EnrollmentRecord {
            subject_identifier: subject.clone(),
            schedule_name: definition.name.clone(),
            tag: definition.tag,
            enrollment_datetime: event_datetime,
            status: EnrollmentStatus::Active,
            next_visit: definition.next_visit(event_datetime, event_datetime),
            refreshed_at: None,
        };
        let stored = self.store.create(record)?;
        info!(%subject, schedule = %schedule_name, "put on schedule");

        Ok(Placement {
            result: PlacementResult::Created,
            record: stored,
        })
    }
}
