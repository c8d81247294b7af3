use serde::{Deserialize, Serialize};
use std::fmt;

/// Issuer id recorded on commands generated by the reconciliation loop.
///
/// Kept distinct from any human user id so the loop can tell its own
/// commands apart from manual overrides.
pub const SYSTEM_ISSUER: &str = "system_cron";

// ---------------------------------------------------------------------------
// SwitchState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchState {
    On,
    Off,
}

impl SwitchState {
    pub fn as_str(self) -> &'static str {
        match self {
            SwitchState::On => "on",
            SwitchState::Off => "off",
        }
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SwitchState {
    type Err = crate::error::VerdantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(SwitchState::On),
            "off" => Ok(SwitchState::Off),
            _ => Err(crate::error::VerdantError::InvalidSwitchState(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ActuatorKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuatorKind {
    Pump,
    Fan,
    Light,
    Heater,
    Valve,
    Other,
}

impl ActuatorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActuatorKind::Pump => "pump",
            ActuatorKind::Fan => "fan",
            ActuatorKind::Light => "light",
            ActuatorKind::Heater => "heater",
            ActuatorKind::Valve => "valve",
            ActuatorKind::Other => "other",
        }
    }
}

impl fmt::Display for ActuatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActuatorKind {
    type Err = crate::error::VerdantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pump" => Ok(ActuatorKind::Pump),
            "fan" => Ok(ActuatorKind::Fan),
            "light" => Ok(ActuatorKind::Light),
            "heater" => Ok(ActuatorKind::Heater),
            "valve" => Ok(ActuatorKind::Valve),
            "other" => Ok(ActuatorKind::Other),
            _ => Err(crate::error::VerdantError::InvalidActuatorKind(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Issuer
// ---------------------------------------------------------------------------

/// Who issued a command: the reconciliation loop itself, or a human user.
///
/// Stored as a single string column; the [`SYSTEM_ISSUER`] sentinel marks
/// loop-generated commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Issuer {
    System,
    User(String),
}

impl Issuer {
    pub fn is_system(&self) -> bool {
        matches!(self, Issuer::System)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Issuer::System => SYSTEM_ISSUER,
            Issuer::User(id) => id,
        }
    }
}

impl From<String> for Issuer {
    fn from(s: String) -> Self {
        if s == SYSTEM_ISSUER {
            Issuer::System
        } else {
            Issuer::User(s)
        }
    }
}

impl From<Issuer> for String {
    fn from(issuer: Issuer) -> Self {
        issuer.as_str().to_string()
    }
}

impl fmt::Display for Issuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
