use crate::types::{Issuer, SwitchState};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// One entry in the append-only command log.
///
/// The most recently issued command for an actuator is its authoritative
/// state marker; rows are never edited except for the in-place expiry
/// extension performed by the reconciler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub id: i64,
    pub actuator_id: i64,
    pub state: SwitchState,
    /// Optional power level (e.g. pump throttle percent).
    pub level: Option<u8>,
    pub issued_by: Issuer,
    pub issued_at: NaiveDateTime,
    pub expires_at: Option<NaiveDateTime>,
}

impl Command {
    /// True when the command carries an expiry that has already passed.
    ///
    /// A command with no expiry never expires.
    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        matches!(self.expires_at, Some(exp) if exp <= now)
    }
}

// ---------------------------------------------------------------------------
// NewCommand
// ---------------------------------------------------------------------------

/// A command about to be appended to the log.
#[derive(Debug, Clone)]
pub struct NewCommand {
    pub actuator_id: i64,
    pub state: SwitchState,
    pub level: Option<u8>,
    pub issued_by: Issuer,
    pub issued_at: NaiveDateTime,
    pub expires_at: Option<NaiveDateTime>,
}

impl NewCommand {
    /// An ON command attributed to the reconciliation loop, expiring at the
    /// end of the schedule window that demanded it.
    pub fn system_on(actuator_id: i64, issued_at: NaiveDateTime, expires_at: NaiveDateTime) -> Self {
        Self {
            actuator_id,
            state: SwitchState::On,
            level: None,
            issued_by: Issuer::System,
            issued_at,
            expires_at: Some(expires_at),
        }
    }

    /// An OFF command attributed to the reconciliation loop. Never expires.
    pub fn system_off(actuator_id: i64, issued_at: NaiveDateTime) -> Self {
        Self {
            actuator_id,
            state: SwitchState::Off,
            level: None,
            issued_by: Issuer::System,
            issued_at,
            expires_at: None,
        }
    }
}
