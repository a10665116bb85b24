use crate::infra::{in_memory_service, parse_date, parse_numbering, start_of_day};
use chrono::{Duration, NaiveDate, Utc};
use clap::Args;
use esr21_enrollment::config::AppConfig;
use esr21_enrollment::enrollment::{
    ConsentRecorded, EnrollmentError, IllnessNumbering, IllnessOutcome, IllnessReported,
    InMemoryEnrollmentStore, ScheduleName, SubjectIdentifier,
};
use esr21_enrollment::error::AppError;
use std::collections::BTreeMap;

#[derive(Args, Debug)]
pub(crate) struct SimulateArgs {
    /// Number of participants to consent
    #[arg(long, default_value_t = 10)]
    pub(crate) participants: usize,
    /// Override the secondary cohort capacity
    #[arg(long)]
    pub(crate) secondary_capacity: Option<usize>,
    /// Number of consented participants who report an illness
    #[arg(long, default_value_t = 3)]
    pub(crate) illness_reports: usize,
    /// Illness episode numbering (per_participant or global)
    #[arg(long, value_parser = parse_numbering)]
    pub(crate) numbering: Option<IllnessNumbering>,
    /// First consent date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: Option<NaiveDate>,
}

pub(crate) fn run_simulation(args: SimulateArgs) -> Result<(), AppError> {
    let SimulateArgs {
        participants,
        secondary_capacity,
        illness_reports,
        numbering,
        start,
    } = args;

    let mut config = AppConfig::load()?.enrollment;
    if let Some(capacity) = secondary_capacity {
        config.secondary_capacity = capacity;
    }
    if let Some(numbering) = numbering {
        config.illness_numbering = numbering;
    }

    let start = start.map_or_else(Utc::now, start_of_day);
    let (service, store) = in_memory_service(config.clone());

    println!(
        "ESR21 enrollment simulation (secondary capacity {}, {:?} illness numbering)",
        config.secondary_capacity, config.illness_numbering
    );

    let subjects: Vec<SubjectIdentifier> = (1..=participants)
        .map(|index| SubjectIdentifier(format!("150-0409{index:05}")))
        .collect();

    println!("\nConsents");
    for (offset, subject) in (0_i64..).zip(&subjects) {
        let outcome = service.on_consent_recorded(&ConsentRecorded {
            subject_identifier: subject.clone(),
            consent_datetime: start + Duration::hours(offset),
        })?;
        println!(
            "  {:<16} {:<10} enrol={:?} fu={:?}",
            subject,
            outcome.cohort.label(),
            outcome.enrollment,
            outcome.follow_up
        );
    }

    println!("\nIllness reports");
    for (offset, subject) in (0_i64..).zip(subjects.iter().take(illness_reports)) {
        let onset = start + Duration::days(30 + offset);
        let report = |days: i64| IllnessReported {
            subject_identifier: subject.clone(),
            report_datetime: onset + Duration::days(days),
            symptomatic: true,
        };

        let opened = service.on_illness_reported(&report(0))?;
        print_illness(&opened, subject);

        let follow_up = service.on_illness_reported(&report(2))?;
        print_illness(&follow_up, subject);
        if let IllnessOutcome::Placed { schedule_name, .. } = follow_up {
            service.take_off_schedule(subject, &schedule_name, onset + Duration::days(21))?;
            println!("  {subject:<16} {schedule_name} resolved");
        }

        let recurrence = service.on_illness_reported(&report(60))?;
        print_illness(&recurrence, subject);
    }

    println!("\nActive enrollments by schedule");
    for (schedule, count) in active_by_schedule(&store)? {
        println!("  {schedule:<26} {count}");
    }

    Ok(())
}

fn print_illness(outcome: &IllnessOutcome, subject: &SubjectIdentifier) {
    match outcome {
        IllnessOutcome::Placed {
            schedule_name,
            result,
            ..
        } => println!("  {subject:<16} {schedule_name} {result:?}"),
        IllnessOutcome::NotAffirmative => println!("  {subject:<16} no illness reported"),
    }
}

fn active_by_schedule(
    store: &InMemoryEnrollmentStore,
) -> Result<BTreeMap<ScheduleName, usize>, AppError> {
    let mut counts = BTreeMap::new();
    let records = store.snapshot().map_err(EnrollmentError::from)?;
    for record in records.iter().filter(|record| record.is_active()) {
        *counts.entry(record.schedule_name.clone()).or_insert(0) += 1;
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use esr21_enrollment::enrollment::{
        EnrollmentRecord, EnrollmentStatus, EnrollmentStore, ScheduleTag,
    };

    #[test]
    fn active_by_schedule_skips_closed_enrollments() {
        let store = InMemoryEnrollmentStore::default();
        let tag = ScheduleTag::Illness { episode: 1 };
        let subject = SubjectIdentifier("150-040900001".to_string());
        let record = EnrollmentRecord {
            subject_identifier: subject.clone(),
            schedule_name: tag.schedule_name(),
            tag,
            enrollment_datetime: Utc::now(),
            status: EnrollmentStatus::Active,
            next_visit: None,
            refreshed_at: None,
        };
        store.create(record).expect("insert");
        store
            .record_off_schedule(&subject, &tag.schedule_name(), Utc::now())
            .expect("off schedule");

        let counts = active_by_schedule(&store).expect("counts");
        assert!(counts.is_empty());
    }
}
