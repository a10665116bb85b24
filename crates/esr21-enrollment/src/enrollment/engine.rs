use std::sync::Arc;

use tracing::{info, warn};

use super::capacity::CapacityCounter;
use super::domain::{
    Cohort, ConsentOutcome, ConsentRecorded, ScheduleKind, ScheduleTag, SubjectIdentifier,
};
use super::registry::ScheduleRegistry;
use super::repository::EnrollmentStore;
use super::schedule::ScheduleDefinitionProvider;
use super::service::EnrollmentError;

/// Chooses a cohort for newly consented participants and places them on its schedules.
pub struct EnrollmentDecisionEngine<P, S> {
    registry: Arc<ScheduleRegistry<P, S>>,
    capacity: CapacityCounter<S>,
    store: Arc<S>,
}

impl<P, S> EnrollmentDecisionEngine<P, S>
where
    P: ScheduleDefinitionProvider,
    S: EnrollmentStore,
{
    pub fn new(
        registry: Arc<ScheduleRegistry<P, S>>,
        capacity: CapacityCounter<S>,
        store: Arc<S>,
    ) -> Self {
        Self {
            registry,
            capacity,
            store,
        }
    }

    pub fn on_consent_recorded(
        &self,
        event: &ConsentRecorded,
    ) -> Result<ConsentOutcome, EnrollmentError> {
        let subject = &event.subject_identifier;

        let (cohort, redelivered) = match self.assigned_cohort(subject)? {
            Some(cohort) => (cohort, true),
            None => {
                let cohort = if self.capacity.is_secondary_cohort_full()? {
                    Cohort::Primary
                } else {
                    Cohort::Secondary
                };
                info!(%subject, cohort = cohort.label(), "assigned cohort");
                (cohort, false)
            }
        };

        let place = |tag: ScheduleTag| {
            if redelivered {
                self.registry.replay_tag(tag, subject, event.consent_datetime)
            } else {
                self.registry.place_tag(tag, subject, event.consent_datetime)
            }
        };

        let enrollment = place(ScheduleTag::Enrollment { cohort })?;

        let follow_up = place(ScheduleTag::FollowUp { cohort })
            .map_err(|err| {
                warn!(
                    %subject,
                    enrollment_schedule = %enrollment.record.schedule_name,
                    error = %err,
                    "follow-up placement failed after enrollment schedule was placed"
                );
                err
            })?;

        Ok(ConsentOutcome {
            subject_identifier: subject.clone(),
            cohort,
            redelivered,
            enrollment: enrollment.result,
            follow_up: follow_up.result,
        })
    }

    /// Cohort recorded on the participant's first enrollment-schedule placement.
    pub fn assigned_cohort(
        &self,
        subject: &SubjectIdentifier,
    ) -> Result<Option<Cohort>, EnrollmentError> {
        let enrollments = self.store.enrollments_for(subject)?;
        Ok(enrollments
            .iter()
            .filter(|record| record.kind() == ScheduleKind::Enrollment)
            .min_by_key(|record| record.enrollment_datetime)
            .and_then(|record| record.tag.cohort()))
    }
}
