use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Externally assigned subject identifier for a consented participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectIdentifier(pub String);

impl fmt::Display for SubjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Registered schedule name, e.g. `primary_enrol_schedule`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScheduleName(pub String);

impl ScheduleName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScheduleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for ScheduleName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Participant sub-population, each following its own schedule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cohort {
    Primary,
    Secondary,
}

impl Cohort {
    pub const fn ordered() -> [Self; 2] {
        [Self::Primary, Self::Secondary]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Primary => "Primary",
            Self::Secondary => "Secondary",
        }
    }

    const fn prefix(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    Enrollment,
    FollowUp,
    Illness,
}

impl ScheduleKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Enrollment => "Enrollment",
            Self::FollowUp => "Follow-up",
            Self::Illness => "Illness",
        }
    }
}

/// Typed key for every schedule the study registers.
///
/// Schedule names are never formatted by hand outside of [`ScheduleTag::schedule_name`];
/// the engine and tracker pick a tag and let this resolve the registered name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleTag {
    Enrollment { cohort: Cohort },
    FollowUp { cohort: Cohort },
    Illness { episode: u32 },
}

impl ScheduleTag {
    pub fn schedule_name(self) -> ScheduleName {
        let name = match self {
            Self::Enrollment { cohort } => format!("{}_enrol_schedule", cohort.prefix()),
            Self::FollowUp { cohort } => format!("{}_fu_schedule", cohort.prefix()),
            Self::Illness { episode } => format!("illness_{episode}_schedule"),
        };
        ScheduleName(name)
    }

    pub const fn kind(self) -> ScheduleKind {
        match self {
            Self::Enrollment { .. } => ScheduleKind::Enrollment,
            Self::FollowUp { .. } => ScheduleKind::FollowUp,
            Self::Illness { .. } => ScheduleKind::Illness,
        }
    }

    pub const fn cohort(self) -> Option<Cohort> {
        match self {
            Self::Enrollment { cohort } | Self::FollowUp { cohort } => Some(cohort),
            Self::Illness { .. } => None,
        }
    }

    pub const fn illness_episode(self) -> Option<u32> {
        match self {
            Self::Illness { episode } => Some(episode),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Active,
    Closed,
}

impl EnrollmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Closed => "Closed",
        }
    }
}

/// Binding of one participant to one schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub subject_identifier: SubjectIdentifier,
    pub schedule_name: ScheduleName,
    pub tag: ScheduleTag,
    pub enrollment_datetime: DateTime<Utc>,
    pub status: EnrollmentStatus,
    pub next_visit: Option<DueVisit>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl EnrollmentRecord {
    pub fn is_active(&self) -> bool {
        self.status == EnrollmentStatus::Active
    }

    pub fn kind(&self) -> ScheduleKind {
        self.tag.kind()
    }

    pub fn view(&self) -> EnrollmentView {
        EnrollmentView {
            schedule_name: self.schedule_name.clone(),
            kind: self.kind().label(),
            status: self.status.label(),
            enrollment_datetime: self.enrollment_datetime,
            next_visit: self.next_visit.clone(),
        }
    }
}

/// Next expected visit derived from the schedule's visit definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueVisit {
    pub code: String,
    pub title: String,
    pub due: DateTime<Utc>,
}

/// Whether a placement opened a new enrollment, refreshed an existing one, or found the
/// schedule already closed for the participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementResult {
    Created,
    Refreshed,
    /// Re-delivered event for a schedule the participant was taken off; left closed.
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub result: PlacementResult,
    pub record: EnrollmentRecord,
}

/// Inbound event emitted after the consent form has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecorded {
    pub subject_identifier: SubjectIdentifier,
    pub consent_datetime: DateTime<Utc>,
}

/// Inbound event emitted after a symptomatic-infection form has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IllnessReported {
    pub subject_identifier: SubjectIdentifier,
    pub report_datetime: DateTime<Utc>,
    pub symptomatic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsentOutcome {
    pub subject_identifier: SubjectIdentifier,
    pub cohort: Cohort,
    pub redelivered: bool,
    pub enrollment: PlacementResult,
    pub follow_up: PlacementResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IllnessOutcome {
    NotAffirmative,
    Placed {
        schedule_name: ScheduleName,
        episode: u32,
        result: PlacementResult,
    },
}

/// Sanitized enrollment representation for API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrollmentView {
    pub schedule_name: ScheduleName,
    pub kind: &'static str,
    pub status: &'static str,
    pub enrollment_datetime: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_visit: Option<DueVisit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectStatusView {
    pub subject_identifier: SubjectIdentifier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cohort: Option<Cohort>,
    pub enrollments: Vec<EnrollmentView>,
}
