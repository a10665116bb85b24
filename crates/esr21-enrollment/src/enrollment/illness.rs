use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::domain::{IllnessOutcome, IllnessReported, ScheduleKind, ScheduleTag};
use super::registry::ScheduleRegistry;
use super::repository::{EnrollmentStore, IllnessScope};
use super::schedule::ScheduleDefinitionProvider;
use super::service::EnrollmentError;

/// Which illness enrollments feed the episode sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IllnessNumbering {
    #[default]
    PerParticipant,
    Global,
}

impl IllnessNumbering {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "per_participant" | "participant" => Some(Self::PerParticipant),
            "global" | "shared" => Some(Self::Global),
            _ => None,
        }
    }
}

/// Opens sequentially numbered illness schedules for enrolled participants.
pub struct IllnessEpisodeTracker<P, S> {
    registry: Arc<ScheduleRegistry<P, S>>,
    store: Arc<S>,
    numbering: IllnessNumbering,
}

impl<P, S> IllnessEpisodeTracker<P, S>
where
    P: ScheduleDefinitionProvider,
    S: EnrollmentStore,
{
    pub fn new(
        registry: Arc<ScheduleRegistry<P, S>>,
        store: Arc<S>,
        numbering: IllnessNumbering,
    ) -> Self {
        Self {
            registry,
            store,
            numbering,
        }
    }

    pub fn on_illness_reported(
        &self,
        event: &IllnessReported,
    ) -> Result<IllnessOutcome, EnrollmentError> {
        if !event.symptomatic {
            return Ok(IllnessOutcome::NotAffirmative);
        }

        let subject = &event.subject_identifier;
        let enrollments = self.store.enrollments_for(subject)?;
        if !enrollments
            .iter()
            .any(|record| record.kind() == ScheduleKind::Enrollment)
        {
            return Err(EnrollmentError::NotEnrolled(subject.clone()));
        }

        // An unresolved episode is always refreshed, whatever the numbering says.
        let open_episode = enrollments
            .iter()
            .filter(|record| record.is_active())
            .find_map(|record| record.tag.illness_episode());
        let episode = match open_episode {
            Some(episode) => episode,
            None => {
                let scope = match self.numbering {
                    IllnessNumbering::PerParticipant => IllnessScope::Participant(subject),
                    IllnessNumbering::Global => IllnessScope::Global,
                };
                self.next_episode(scope)?
            }
        };
        debug!(%subject, episode, numbering = ?self.numbering, "resolved illness episode");

        let placement = self.registry.place_tag(
            ScheduleTag::Illness { episode },
            subject,
            event.report_datetime,
        )?;
        info!(
            %subject,
            schedule = %placement.record.schedule_name,
            result = ?placement.result,
            "illness episode placement"
        );

        Ok(IllnessOutcome::Placed {
            schedule_name: placement.record.schedule_name,
            episode,
            result: placement.result,
        })
    }

    fn next_episode(&self, scope: IllnessScope<'_>) -> Result<u32, EnrollmentError> {
        let Some(latest) = self.store.latest_illness_enrollment(scope)? else {
            return Ok(1);
        };

        if self.store.is_closed(scope, &latest.schedule_name)? {
            let opened = self.store.count_illness_enrollments(scope)?;
            let opened = u32::try_from(opened).unwrap_or(u32::MAX);
            return Ok(opened.saturating_add(1));
        }

        Ok(latest.tag.illness_episode().unwrap_or(1))
    }
}
