//! Consent-driven cohort assignment and visit-schedule placement for the ESR21 study.
//!
//! The data-capture layer persists its own forms and then calls
//! [`EnrollmentService::on_consent_recorded`] or [`EnrollmentService::on_illness_reported`].
//! Schedule definitions come from a [`ScheduleDefinitionProvider`] and enrollments are kept
//! in an [`EnrollmentStore`]; both are injected so the decisions can be tested in isolation.

pub mod capacity;
pub mod domain;
pub mod engine;
pub mod illness;
pub mod memory;
pub mod registry;
pub mod repository;
pub mod router;
pub mod schedule;
pub mod service;
mod settings;

#[cfg(test)]
mod tests;

pub use capacity::{CapacityCounter, DEFAULT_SECONDARY_CAPACITY};
pub use domain::{
    Cohort, ConsentOutcome, ConsentRecorded, DueVisit, EnrollmentRecord, EnrollmentStatus,
    EnrollmentView, IllnessOutcome, IllnessReported, Placement, PlacementResult, ScheduleKind,
    ScheduleName, ScheduleTag, SubjectIdentifier, SubjectStatusView,
};
pub use engine::EnrollmentDecisionEngine;
pub use illness::{IllnessEpisodeTracker, IllnessNumbering};
pub use memory::InMemoryEnrollmentStore;
pub use registry::ScheduleRegistry;
pub use repository::{EnrollmentStore, IllnessScope, StoreError};
pub use router::{enrollment_router, OffScheduleRequest};
pub use schedule::{
    ScheduleCatalog, ScheduleDefinition, ScheduleDefinitionProvider, VisitDefinition,
};
pub use service::{EnrollmentError, EnrollmentService};
pub use settings::{EnrollmentConfig, DEFAULT_ILLNESS_SCHEDULES};
