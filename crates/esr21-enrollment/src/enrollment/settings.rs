use serde::{Deserialize, Serialize};

use super::capacity::DEFAULT_SECONDARY_CAPACITY;
use super::illness::IllnessNumbering;

pub const DEFAULT_ILLNESS_SCHEDULES: u32 = 10;

/// Study-level knobs for cohort capacity and illness episode numbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentConfig {
    pub secondary_capacity: usize,
    pub illness_numbering: IllnessNumbering,
    pub illness_schedules: u32,
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            secondary_capacity: DEFAULT_SECONDARY_CAPACITY,
            illness_numbering: IllnessNumbering::default(),
            illness_schedules: DEFAULT_ILLNESS_SCHEDULES,
        }
    }
}
