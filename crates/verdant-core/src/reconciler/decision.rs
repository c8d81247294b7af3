//! The per-actuator reconciliation decision.
//!
//! `decide` is a pure function over wall-clock time, the active schedule,
//! and the latest command, so every branch of the control policy is
//! testable without a store or a timer. Applying the returned decision and
//! re-running it must yield [`Decision::Keep`] (the loop is idempotent
//! between ticks).

use chrono::NaiveDateTime;

use crate::command::Command;
use crate::schedule::Schedule;
use crate::types::SwitchState;

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// What the loop must do for one actuator at one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Append a system ON command expiring when the active window ends.
    TurnOn { expires_at: NaiveDateTime },
    /// Extend the expiry of the existing ON command in place; the active
    /// window outlasts what was already issued.
    ExtendTo {
        command_id: i64,
        expires_at: NaiveDateTime,
    },
    /// Append a system OFF command (no expiry).
    TurnOff,
    /// The authoritative command already matches the desired state.
    Keep,
}

/// Decide the action for one actuator.
///
/// `active` is the schedule selected by
/// [`crate::schedule::active_schedule`]; `last` is the most recently issued
/// command, if any.
pub fn decide(now: NaiveDateTime, active: Option<&Schedule>, last: Option<&Command>) -> Decision {
    match active {
        Some(schedule) => decide_with_active_window(now, schedule, last),
        None => decide_without_window(now, last),
    }
}

/// An active window demands the actuator be ON until the window ends.
fn decide_with_active_window(
    now: NaiveDateTime,
    schedule: &Schedule,
    last: Option<&Command>,
) -> Decision {
    let expires_at = schedule.expires_at();

    let Some(last) = last else {
        return Decision::TurnOn { expires_at };
    };

    match last.state {
        SwitchState::On => match last.expires_at {
            // Already issued for exactly this window.
            Some(exp) if exp == expires_at => Decision::Keep,
            Some(exp) if exp > now => {
                if exp < expires_at {
                    // A shorter ON is running; the window boundary wins.
                    Decision::ExtendTo {
                        command_id: last.id,
                        expires_at,
                    }
                } else {
                    Decision::Keep
                }
            }
            // The previous ON has lapsed mid-window; restart it.
            Some(_) => Decision::TurnOn { expires_at },
            // An indefinite ON already covers any window.
            None => Decision::Keep,
        },
        SwitchState::Off => {
            // A human switching OFF at or after the window opened is a
            // deliberate override; the loop must not fight it.
            if !last.issued_by.is_system() && last.issued_at >= schedule.starts_at() {
                Decision::Keep
            } else {
                Decision::TurnOn { expires_at }
            }
        }
    }
}

/// No window is active: system-issued ON commands are shut off, manual
/// ones only once they expire.
fn decide_without_window(now: NaiveDateTime, last: Option<&Command>) -> Decision {
    match last {
        Some(cmd) if cmd.state == SwitchState::On => {
            if cmd.issued_by.is_system() || cmd.is_expired(now) {
                Decision::TurnOff
            } else {
                Decision::Keep
            }
        }
        _ => Decision::Keep,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
