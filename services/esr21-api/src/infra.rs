use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use esr21_enrollment::enrollment::{
    EnrollmentConfig, EnrollmentService, IllnessNumbering, InMemoryEnrollmentStore,
    ScheduleCatalog,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type MemoryEnrollmentService =
    EnrollmentService<ScheduleCatalog, InMemoryEnrollmentStore>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn in_memory_service(
    config: EnrollmentConfig,
) -> (MemoryEnrollmentService, Arc<InMemoryEnrollmentStore>) {
    let store = Arc::new(InMemoryEnrollmentStore::default());
    let catalog = Arc::new(ScheduleCatalog::standard(config.illness_schedules));
    let service = EnrollmentService::new(catalog, store.clone(), config);
    (service, store)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_numbering(raw: &str) -> Result<IllnessNumbering, String> {
    IllnessNumbering::parse(raw)
        .ok_or_else(|| format!("'{raw}' is not one of per_participant, global"))
}

pub(crate) fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
