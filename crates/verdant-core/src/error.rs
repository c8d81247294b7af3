use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerdantError {
    #[error("actuator not found: {0}")]
    ActuatorNotFound(i64),

    #[error("schedule not found: {0}")]
    ScheduleNotFound(i64),

    #[error("command not found: {0}")]
    CommandNotFound(i64),

    #[error("invalid schedule window: start {start} must be before end {end}")]
    InvalidWindow { start: NaiveTime, end: NaiveTime },

    #[error("schedule overlaps an existing window for actuator {actuator_id} on {date}")]
    ScheduleOverlap { actuator_id: i64, date: NaiveDate },

    #[error("invalid switch state '{0}': expected 'on' or 'off'")]
    InvalidSwitchState(String),

    #[error("invalid actuator kind: {0}")]
    InvalidActuatorKind(String),

    #[error("store connection poisoned by a panicked thread")]
    StorePoisoned,

    #[error(transparent)]
    Db(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, VerdantError>;
