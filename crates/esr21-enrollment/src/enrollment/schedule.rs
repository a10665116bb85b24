use chrono::{DateTime, Duration, Utc};

use super::domain::{Cohort, DueVisit, ScheduleKind, ScheduleName, ScheduleTag};

/// Lookup of registered schedule definitions.
pub trait ScheduleDefinitionProvider: Send + Sync {
    fn lookup(&self, name: &ScheduleName) -> Option<ScheduleDefinition>;
}

/// Expected visit within a schedule, offset from the enrollment timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitDefinition {
    pub code: &'static str,
    pub title: &'static str,
    pub offset_days: i64,
}

impl VisitDefinition {
    fn due(&self, enrollment_datetime: DateTime<Utc>) -> DateTime<Utc> {
        enrollment_datetime + Duration::days(self.offset_days)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleDefinition {
    pub name: ScheduleName,
    pub tag: ScheduleTag,
    pub visits: Vec<VisitDefinition>,
}

impl ScheduleDefinition {
    pub fn new(tag: ScheduleTag, visits: Vec<VisitDefinition>) -> Self {
        Self {
            name: tag.schedule_name(),
            tag,
            visits,
        }
    }

    pub fn kind(&self) -> ScheduleKind {
        self.tag.kind()
    }

    /// First visit due at or after `as_of`, or `None` once the schedule has run out.
    pub fn next_visit(
        &self,
        enrollment_datetime: DateTime<Utc>,
        as_of: DateTime<Utc>,
    ) -> Option<DueVisit> {
        self.visits
            .iter()
            .map(|visit| (visit, visit.due(enrollment_datetime)))
            .filter(|(_, due)| *due >= as_of)
            .min_by_key(|(_, due)| *due)
            .map(|(visit, due)| DueVisit {
                code: visit.code.to_string(),
                title: visit.title.to_string(),
                due,
            })
    }
}

/// Standard set of ESR21 schedules: enrollment and follow-up per cohort plus numbered
/// illness schedules.
#[derive(Debug, Clone)]
pub struct ScheduleCatalog {
    schedules: Vec<ScheduleDefinition>,
}

impl ScheduleCatalog {
    /// The visit codes, titles and day offsets used here are illustrative defaults; a
    /// deployment with the protocol's real visit plan supplies its own provider.
    pub fn standard(illness_schedules: u32) -> Self {
        let mut schedules = Vec::new();
        for cohort in Cohort::ordered() {
            schedules.push(ScheduleDefinition::new(
                ScheduleTag::Enrollment { cohort },
                enrollment_visits(),
            ));
            schedules.push(ScheduleDefinition::new(
                ScheduleTag::FollowUp { cohort },
                follow_up_visits(),
            ));
        }
        for episode in 1..=illness_schedules {
            schedules.push(ScheduleDefinition::new(
                ScheduleTag::Illness { episode },
                illness_visits(),
            ));
        }
        Self { schedules }
    }

    #[cfg(test)]
    pub(crate) fn from_definitions(schedules: Vec<ScheduleDefinition>) -> Self {
        Self { schedules }
    }

    #[cfg(test)]
    fn schedules_of_kind(&self, kind: ScheduleKind) -> Vec<&ScheduleDefinition> {
        self.schedules
            .iter()
            .filter(|schedule| schedule.kind() == kind)
            .collect()
    }
}

impl ScheduleDefinitionProvider for ScheduleCatalog {
    fn lookup(&self, name: &ScheduleName) -> Option<ScheduleDefinition> {
        self.schedules
            .iter()
            .find(|schedule| &schedule.name == name)
            .cloned()
    }
}

fn enrollment_visits() -> Vec<VisitDefinition> {
    vec![
        VisitDefinition {
            code: "1000",
            title: "Day 1 enrollment and first dose",
            offset_days: 0,
        },
        VisitDefinition {
            code: "1070",
            title: "Day 29 second dose",
            offset_days: 28,
        },
    ]
}

fn follow_up_visits() -> Vec<VisitDefinition> {
    vec![
        VisitDefinition {
            code: "1170",
            title: "Day 57 follow-up",
            offset_days: 56,
        },
        VisitDefinition {
            code: "1177",
            title: "Day 180 follow-up",
            offset_days: 179,
        },
        VisitDefinition {
            code: "1178",
            title: "Day 365 end of study",
            offset_days: 364,
        },
    ]
}

fn illness_visits() -> Vec<VisitDefinition> {
    vec![
        VisitDefinition {
            code: "1000i",
            title: "Illness onset assessment",
            offset_days: 0,
        },
        VisitDefinition {
            code: "1007i",
            title: "Illness day 7 review",
            offset_days: 7,
        },
        VisitDefinition {
            code: "1028i",
            title: "Illness day 28 resolution check",
            offset_days: 28,
        },
    ]
}
