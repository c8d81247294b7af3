use crate::types::{ActuatorKind, SwitchState};
use serde::{Deserialize, Serialize};

/// A controllable device with a cached on/off status.
///
/// `status` is a denormalized projection of the latest command and is
/// written in the same transaction as command inserts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actuator {
    pub id: i64,
    pub name: String,
    pub kind: ActuatorKind,
    pub status: SwitchState,
}
