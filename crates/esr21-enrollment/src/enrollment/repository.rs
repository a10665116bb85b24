use chrono::{DateTime, Utc};

use super::domain::{EnrollmentRecord, ScheduleName, SubjectIdentifier};

/// Scope used when deriving the next illness episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IllnessScope<'a> {
    /// Every participant's illness enrollments share one sequence.
    Global,
    /// Only the given participant's illness enrollments are considered.
    Participant(&'a SubjectIdentifier),
}

impl IllnessScope<'_> {
    pub fn includes(&self, subject: &SubjectIdentifier) -> bool {
        match self {
            IllnessScope::Global => true,
            IllnessScope::Participant(scoped) => *scoped == subject,
        }
    }
}

/// Storage abstraction so the engine and tracker can be exercised in isolation.
///
/// `create` doubles as the uniqueness guard: implementations must reject a second active
/// enrollment for the same (participant, schedule) pair with [`StoreError::DuplicateActive`].
pub trait EnrollmentStore: Send + Sync {
    fn find_active(
        &self,
        subject: &SubjectIdentifier,
        schedule: &ScheduleName,
    ) -> Result<Option<EnrollmentRecord>, StoreError>;

    fn create(&self, record: EnrollmentRecord) -> Result<EnrollmentRecord, StoreError>;

    fn update(&self, record: EnrollmentRecord) -> Result<(), StoreError>;

    fn count_active(&self, schedule: &ScheduleName) -> Result<usize, StoreError>;

    /// Most recently opened illness enrollment, ordered by `enrollment_datetime`.
    fn latest_illness_enrollment(
        &self,
        scope: IllnessScope<'_>,
    ) -> Result<Option<EnrollmentRecord>, StoreError>;

    /// Illness enrollments ever opened in scope, closed ones included.
    fn count_illness_enrollments(&self, scope: IllnessScope<'_>) -> Result<usize, StoreError>;

    /// Whether an off-schedule record exists for `schedule` within scope.
    fn is_closed(&self, scope: IllnessScope<'_>, schedule: &ScheduleName)
        -> Result<bool, StoreError>;

    fn enrollments_for(
        &self,
        subject: &SubjectIdentifier,
    ) -> Result<Vec<EnrollmentRecord>, StoreError>;

    /// Off-schedule hook used by the external collaborator that resolves episodes.
    fn record_off_schedule(
        &self,
        subject: &SubjectIdentifier,
        schedule: &ScheduleName,
        offschedule_datetime: DateTime<Utc>,
    ) -> Result<EnrollmentRecord, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{subject} already has an active enrollment on {schedule}")]
    DuplicateActive {
        subject: SubjectIdentifier,
        schedule: ScheduleName,
    },
    #[error("enrollment not found")]
    NotFound,
    #[error("enrollment store unavailable: {0}")]
    Unavailable(String),
}
