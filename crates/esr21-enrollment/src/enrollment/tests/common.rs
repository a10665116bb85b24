use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::enrollment::domain::{
    Cohort, ConsentRecorded, EnrollmentRecord, EnrollmentStatus, IllnessReported, ScheduleName,
    ScheduleTag, SubjectIdentifier,
};
use crate::enrollment::illness::IllnessNumbering;
use crate::enrollment::memory::InMemoryEnrollmentStore;
use crate::enrollment::repository::{EnrollmentStore, IllnessScope, StoreError};
use crate::enrollment::schedule::ScheduleCatalog;
use crate::enrollment::service::EnrollmentService;
use crate::enrollment::settings::EnrollmentConfig;

pub(super) type MemoryService = EnrollmentService<ScheduleCatalog, InMemoryEnrollmentStore>;

pub(super) fn consent_day() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 2, 15, 10, 0, 0)
        .single()
        .expect("valid consent timestamp")
}

pub(super) fn days_after_consent(days: i64) -> DateTime<Utc> {
    consent_day() + Duration::days(days)
}

pub(super) fn subject(id: &str) -> SubjectIdentifier {
    SubjectIdentifier(id.to_string())
}

pub(super) fn consent(id: &str) -> ConsentRecorded {
    ConsentRecorded {
        subject_identifier: subject(id),
        consent_datetime: consent_day(),
    }
}

pub(super) fn illness(id: &str, days: i64, symptomatic: bool) -> IllnessReported {
    IllnessReported {
        subject_identifier: subject(id),
        report_datetime: days_after_consent(days),
        symptomatic,
    }
}

pub(super) fn enrollment_config(secondary_capacity: usize) -> EnrollmentConfig {
    EnrollmentConfig {
        secondary_capacity,
        illness_numbering: IllnessNumbering::PerParticipant,
        illness_schedules: 5,
    }
}

pub(super) fn build_service(
    config: EnrollmentConfig,
) -> (MemoryService, Arc<InMemoryEnrollmentStore>) {
    let store = Arc::new(InMemoryEnrollmentStore::default());
    let catalog = Arc::new(ScheduleCatalog::standard(config.illness_schedules));
    let service = EnrollmentService::new(catalog, store.clone(), config);
    (service, store)
}

/// Fill the secondary enrollment schedule with `count` active placeholder enrollments.
pub(super) fn seed_secondary(store: &InMemoryEnrollmentStore, count: usize) {
    let tag = ScheduleTag::Enrollment {
        cohort: Cohort::Secondary,
    };
    for index in 0..count {
        store
            .create(EnrollmentRecord {
                subject_identifier: subject(&format!("seed-{index:05}")),
                schedule_name: tag.schedule_name(),
                tag,
                enrollment_datetime: consent_day() - Duration::days(1),
                status: EnrollmentStatus::Active,
                next_visit: None,
                refreshed_at: None,
            })
            .expect("seed insert succeeds");
    }
}

pub(super) fn active_on(store: &InMemoryEnrollmentStore, schedule: &str) -> usize {
    store
        .count_active(&ScheduleName::from(schedule))
        .expect("count succeeds")
}

pub(super) struct UnavailableStore;

impl EnrollmentStore for UnavailableStore {
    fn find_active(
        &self,
        _subject: &SubjectIdentifier,
        _schedule: &ScheduleName,
    ) -> Result<Option<EnrollmentRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn create(&self, _record: EnrollmentRecord) -> Result<EnrollmentRecord, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: EnrollmentRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn count_active(&self, _schedule: &ScheduleName) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn latest_illness_enrollment(
        &self,
        _scope: IllnessScope<'_>,
    ) -> Result<Option<EnrollmentRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn count_illness_enrollments(&self, _scope: IllnessScope<'_>) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn is_closed(
        &self,
        _scope: IllnessScope<'_>,
        _schedule: &ScheduleName,
    ) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn enrollments_for(
        &self,
        _subject: &SubjectIdentifier,
    ) -> Result<Vec<EnrollmentRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn record_off_schedule(
        &self,
        _subject: &SubjectIdentifier,
        _schedule: &ScheduleName,
        _offschedule_datetime: DateTime<Utc>,
    ) -> Result<EnrollmentRecord, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

/// Store whose lookups never see existing enrollments, simulating a lost read race.
#[derive(Default)]
pub(super) struct BlindReadStore {
    pub(super) inner: InMemoryEnrollmentStore,
}

impl EnrollmentStore for BlindReadStore {
    fn find_active(
        &self,
        _subject: &SubjectIdentifier,
        _schedule: &ScheduleName,
    ) -> Result<Option<EnrollmentRecord>, StoreError> {
        Ok(None)
    }

    fn create(&self, record: EnrollmentRecord) -> Result<EnrollmentRecord, StoreError> {
        self.inner.create(record)
    }

    fn update(&self, record: EnrollmentRecord) -> Result<(), StoreError> {
        self.inner.update(record)
    }

    fn count_active(&self, schedule: &ScheduleName) -> Result<usize, StoreError> {
        self.inner.count_active(schedule)
    }

    fn latest_illness_enrollment(
        &self,
        scope: IllnessScope<'_>,
    ) -> Result<Option<EnrollmentRecord>, StoreError> {
        self.inner.latest_illness_enrollment(scope)
    }

    fn count_illness_enrollments(&self, scope: IllnessScope<'_>) -> Result<usize, StoreError> {
        self.inner.count_illness_enrollments(scope)
    }

    fn is_closed(
        &self,
        scope: IllnessScope<'_>,
        schedule: &ScheduleName,
    ) -> Result<bool, StoreError> {
        self.inner.is_closed(scope, schedule)
    }

    fn enrollments_for(
        &self,
        _subject: &SubjectIdentifier,
    ) -> Result<Vec<EnrollmentRecord>, StoreError> {
        Ok(Vec::new())
    }

    fn record_off_schedule(
        &self,
        subject: &SubjectIdentifier,
        schedule: &ScheduleName,
        offschedule_datetime: DateTime<Utc>,
    ) -> Result<EnrollmentRecord, StoreError> {
        self.inner
            .record_off_schedule(subject, schedule, offschedule_datetime)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
