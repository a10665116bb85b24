use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::capacity::CapacityCounter;
use super::domain::{
    ConsentOutcome, ConsentRecorded, EnrollmentRecord, IllnessOutcome, IllnessReported,
    ScheduleName, SubjectIdentifier, SubjectStatusView,
};
use super::engine::EnrollmentDecisionEngine;
use super::illness::IllnessEpisodeTracker;
use super::registry::ScheduleRegistry;
use super::repository::{EnrollmentStore, StoreError};
use super::schedule::ScheduleDefinitionProvider;
use super::settings::EnrollmentConfig;

/// Service composing the decision engine and illness tracker over one provider and store.
///
/// The data-capture layer calls the `on_*` methods directly after persisting its own form.
pub struct EnrollmentService<P, S> {
    store: Arc<S>,
    engine: EnrollmentDecisionEngine<P, S>,
    tracker: IllnessEpisodeTracker<P, S>,
}

impl<P, S> EnrollmentService<P, S>
where
    P: ScheduleDefinitionProvider + 'static,
    S: EnrollmentStore + 'static,
{
    pub fn new(provider: Arc<P>, store: Arc<S>, config: EnrollmentConfig) -> Self {
        let registry = Arc::new(ScheduleRegistry::new(provider, store.clone()));
        let capacity = CapacityCounter::new(store.clone(), config.secondary_capacity);
        let engine = EnrollmentDecisionEngine::new(registry.clone(), capacity, store.clone());
        let tracker = IllnessEpisodeTracker::new(registry, store.clone(), config.illness_numbering);

        Self {
            store,
            engine,
            tracker,
        }
    }

    /// Decide the participant's cohort (once) and place them on its schedules.
    pub fn on_consent_recorded(
        &self,
        event: &ConsentRecorded,
    ) -> Result<ConsentOutcome, EnrollmentError> {
        self.engine.on_consent_recorded(event)
    }

    /// Open or refresh the participant's current illness episode.
    pub fn on_illness_reported(
        &self,
        event: &IllnessReported,
    ) -> Result<IllnessOutcome, EnrollmentError> {
        self.tracker.on_illness_reported(event)
    }

    /// Forward an off-schedule record from the collaborator that resolves episodes.
    pub fn take_off_schedule(
        &self,
        subject: &SubjectIdentifier,
        schedule: &ScheduleName,
        offschedule_datetime: DateTime<Utc>,
    ) -> Result<EnrollmentRecord, EnrollmentError> {
        let record = self
            .store
            .record_off_schedule(subject, schedule, offschedule_datetime)?;
        info!(%subject, %schedule, "taken off schedule");
        Ok(record)
    }

    pub fn subject_status(
        &self,
        subject: &SubjectIdentifier,
    ) -> Result<SubjectStatusView, EnrollmentError> {
        let cohort = self.engine.assigned_cohort(subject)?;
        let mut enrollments = self.store.enrollments_for(subject)?;
        enrollments.sort_by(|a, b| a.enrollment_datetime.cmp(&b.enrollment_datetime));

        Ok(SubjectStatusView {
            subject_identifier: subject.clone(),
            cohort,
            enrollments: enrollments.iter().map(EnrollmentRecord::view).collect(),
        })
    }
}

/// Error raised by the enrollment core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnrollmentError {
    #[error("schedule {0} is not registered")]
    UnknownSchedule(ScheduleName),
    #[error("subject {0} has not been enrolled")]
    NotEnrolled(SubjectIdentifier),
    #[error(transparent)]
    Store(#[from] StoreError),
}
