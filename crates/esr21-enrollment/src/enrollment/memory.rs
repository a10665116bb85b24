use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{
    EnrollmentRecord, EnrollmentStatus, ScheduleKind, ScheduleName, SubjectIdentifier,
};
use super::repository::{EnrollmentStore, IllnessScope, StoreError};

#[derive(Debug, Default)]
struct StoreState {
    enrollments: Vec<EnrollmentRecord>,
    off_schedule: HashSet<(SubjectIdentifier, ScheduleName)>,
}

/// Process-local store backing the API service and the test suites.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEnrollmentStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryEnrollmentStore {
    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("enrollment store lock poisoned".to_string()))
    }

    /// Every stored enrollment, in insertion order.
    pub fn snapshot(&self) -> Result<Vec<EnrollmentRecord>, StoreError> {
        Ok(self.lock()?.enrollments.clone())
    }
}

impl EnrollmentStore for InMemoryEnrollmentStore {
    fn find_active(
        &self,
        subject: &SubjectIdentifier,
        schedule: &ScheduleName,
    ) -> Result<Option<EnrollmentRecord>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .enrollments
            .iter()
            .find(|record| {
                record.is_active()
                    && &record.subject_identifier == subject
                    && &record.schedule_name == schedule
            })
            .cloned())
    }

    fn create(&self, record: EnrollmentRecord) -> Result<EnrollmentRecord, StoreError> {
        let mut guard = self.lock()?;
        let duplicate = record.is_active()
            && guard.enrollments.iter().any(|existing| {
                existing.is_active()
                    && existing.subject_identifier == record.subject_identifier
                    && existing.schedule_name == record.schedule_name
            });
        if duplicate {
            return Err(StoreError::DuplicateActive {
                subject: record.subject_identifier,
                schedule: record.schedule_name,
            });
        }
        guard.enrollments.push(record.clone());
        Ok(record)
    }

    fn update(&self, record: EnrollmentRecord) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let existing = guard
            .enrollments
            .iter_mut()
            .find(|existing| {
                existing.is_active()
                    && existing.subject_identifier == record.subject_identifier
                    && existing.schedule_name == record.schedule_name
            })
            .ok_or(StoreError::NotFound)?;
        *existing = record;
        Ok(())
    }

    fn count_active(&self, schedule: &ScheduleName) -> Result<usize, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .enrollments
            .iter()
            .filter(|record| record.is_active() && &record.schedule_name == schedule)
            .count())
    }

    fn latest_illness_enrollment(
        &self,
        scope: IllnessScope<'_>,
    ) -> Result<Option<EnrollmentRecord>, StoreError> {
        let guard = self.lock()?;
        // Later insertions win ties on enrollment_datetime.
        Ok(guard
            .enrollments
            .iter()
            .enumerate()
            .filter(|(_, record)| {
                record.kind() == ScheduleKind::Illness && scope.includes(&record.subject_identifier)
            })
            .max_by_key(|(position, record)| (record.enrollment_datetime, *position))
            .map(|(_, record)| record.clone()))
    }

    fn count_illness_enrollments(&self, scope: IllnessScope<'_>) -> Result<usize, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .enrollments
            .iter()
            .filter(|record| {
                record.kind() == ScheduleKind::Illness && scope.includes(&record.subject_identifier)
            })
            .count())
    }

    fn is_closed(
        &self,
        scope: IllnessScope<'_>,
        schedule: &ScheduleName,
    ) -> Result<bool, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .off_schedule
            .iter()
            .any(|(subject, closed)| closed == schedule && scope.includes(subject)))
    }

    fn enrollments_for(
        &self,
        subject: &SubjectIdentifier,
    ) -> Result<Vec<EnrollmentRecord>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .enrollments
            .iter()
            .filter(|record| &record.subject_identifier == subject)
            .cloned()
            .collect())
    }

    fn record_off_schedule(
        &self,
        subject: &SubjectIdentifier,
        schedule: &ScheduleName,
        offschedule_datetime: DateTime<Utc>,
    ) -> Result<EnrollmentRecord, StoreError> {
        let mut guard = self.lock()?;
        let record = guard
            .enrollments
            .iter_mut()
            .find(|record| {
                record.is_active()
                    && &record.subject_identifier == subject
                    && &record.schedule_name == schedule
            })
            .ok_or(StoreError::NotFound)?;
        record.status = EnrollmentStatus::Closed;
        record.refreshed_at = Some(offschedule_datetime);
        record.next_visit = None;
        let closed = record.clone();
        guard
            .off_schedule
            .insert((subject.clone(), schedule.clone()));
        Ok(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrollment::domain::{Cohort, ScheduleTag};
    use chrono::{Duration, TimeZone};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 4, day, 8, 30, 0)
            .single()
            .expect("valid timestamp")
    }

    fn record(subject: &str, tag: ScheduleTag, enrolled: DateTime<Utc>) -> EnrollmentRecord {
        EnrollmentRecord {
            subject_identifier: SubjectIdentifier(subject.to_string()),
            schedule_name: tag.schedule_name(),
            tag,
            enrollment_datetime: enrolled,
            status: EnrollmentStatus::Active,
            next_visit: None,
            refreshed_at: None,
        }
    }

    #[test]
    fn create_rejects_second_active_enrollment_for_pair() {
        let store = InMemoryEnrollmentStore::default();
        let tag = ScheduleTag::Enrollment {
            cohort: Cohort::Secondary,
        };
        store
            .create(record("S-001", tag, at(1)))
            .expect("first insert succeeds");

        match store.create(record("S-001", tag, at(2))) {
            Err(StoreError::DuplicateActive { subject, schedule }) => {
                assert_eq!(subject.0, "S-001");
                assert_eq!(schedule.as_str(), "secondary_enrol_schedule");
            }
            other => panic!("expected duplicate active error, got {other:?}"),
        }
        assert_eq!(
            store
                .count_active(&tag.schedule_name())
                .expect("count succeeds"),
            1
        );
    }

    #[test]
    fn closed_enrollment_allows_reopening_the_same_schedule() {
        let store = InMemoryEnrollmentStore::default();
        let tag = ScheduleTag::Illness { episode: 1 };
        let subject = SubjectIdentifier("S-002".to_string());
        store
            .create(record("S-002", tag, at(3)))
            .expect("insert succeeds");
        store
            .record_off_schedule(&subject, &tag.schedule_name(), at(3) + Duration::days(20))
            .expect("off schedule succeeds");

        store
            .create(record("S-002", tag, at(28)))
            .expect("closed enrollment does not block a new one");
        assert_eq!(store.enrollments_for(&subject).expect("fetch").len(), 2);
    }

    #[test]
    fn latest_illness_enrollment_respects_scope() {
        let store = InMemoryEnrollmentStore::default();
        let first = SubjectIdentifier("S-010".to_string());
        store
            .create(record("S-010", ScheduleTag::Illness { episode: 1 }, at(5)))
            .expect("insert");
        store
            .create(record("S-011", ScheduleTag::Illness { episode: 2 }, at(9)))
            .expect("insert");

        let global = store
            .latest_illness_enrollment(IllnessScope::Global)
            .expect("query")
            .expect("latest present");
        assert_eq!(global.subject_identifier.0, "S-011");

        let scoped = store
            .latest_illness_enrollment(IllnessScope::Participant(&first))
            .expect("query")
            .expect("latest present");
        assert_eq!(scoped.schedule_name.as_str(), "illness_1_schedule");
        assert_eq!(
            store
                .count_illness_enrollments(IllnessScope::Participant(&first))
                .expect("count"),
            1
        );
    }

    #[test]
    fn record_off_schedule_requires_active_enrollment() {
        let store = InMemoryEnrollmentStore::default();
        let subject = SubjectIdentifier("S-404".to_string());
        assert_eq!(
            store.record_off_schedule(&subject, &ScheduleName::from("illness_1_schedule"), at(1)),
            Err(StoreError::NotFound)
        );
    }
}
