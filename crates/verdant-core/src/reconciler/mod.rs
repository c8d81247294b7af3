//! The actuator reconciliation loop.
//!
//! Every tick, each actuator is driven toward the state its schedules and
//! command history demand: [`decide`] computes the action from a snapshot
//! of the store, and [`Reconciler::tick`] applies it. One actuator's
//! failure never stops the rest of the pass, and a failed pass never stops
//! the next tick.

pub mod decision;

pub use decision::{decide, Decision};

use chrono::{Local, NaiveDateTime};
use serde::Serialize;

use crate::command::NewCommand;
use crate::error::Result;
use crate::schedule::active_schedule;
use crate::store::Store;

// ---------------------------------------------------------------------------
// TickSummary
// ---------------------------------------------------------------------------

/// Counts of what one pass over all actuators did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    pub turned_on: u32,
    pub extended: u32,
    pub turned_off: u32,
    pub unchanged: u32,
    pub failed: u32,
}

impl TickSummary {
    /// True when the pass issued no writes.
    pub fn is_quiet(&self) -> bool {
        self.turned_on == 0 && self.extended == 0 && self.turned_off == 0
    }
}

enum Outcome {
    TurnedOn,
    Extended,
    TurnedOff,
    Unchanged,
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

pub struct Reconciler<S: Store> {
    store: S,
}

impl<S: Store> Reconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one pass over all actuators at wall-clock time `now`.
    ///
    /// Per-actuator errors are logged and counted, not propagated; a
    /// failure to even list the actuators yields an all-zero summary and
    /// leaves the next tick armed.
    pub fn tick(&self, now: NaiveDateTime) -> TickSummary {
        let mut summary = TickSummary::default();

        let ids = match self.store.actuator_ids() {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, "tick aborted: cannot list actuators");
                return summary;
            }
        };

        for actuator_id in ids {
            match self.reconcile_one(actuator_id, now) {
                Ok(Outcome::TurnedOn) => summary.turned_on += 1,
                Ok(Outcome::Extended) => summary.extended += 1,
                Ok(Outcome::TurnedOff) => summary.turned_off += 1,
                Ok(Outcome::Unchanged) => summary.unchanged += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(actuator_id, error = %e, "reconciliation failed");
                }
            }
        }
        summary
    }

    fn reconcile_one(&self, actuator_id: i64, now: NaiveDateTime) -> Result<Outcome> {
        let schedules = self.store.schedules_for_day(actuator_id, now.date())?;
        let last = self.store.latest_command(actuator_id)?;
        let active = active_schedule(&schedules, now);
        let seen = last.as_ref().map(|c| c.id);

        match decide(now, active, last.as_ref()) {
            Decision::TurnOn { expires_at } => {
                let cmd = NewCommand::system_on(actuator_id, now, expires_at);
                match self.store.insert_command_if_latest(&cmd, seen)? {
                    Some(_) => {
                        tracing::info!(actuator_id, %expires_at, "actuator on");
                        Ok(Outcome::TurnedOn)
                    }
                    None => {
                        tracing::warn!(actuator_id, "on skipped: command log advanced mid-tick");
                        Ok(Outcome::Unchanged)
                    }
                }
            }
            Decision::ExtendTo {
                command_id,
                expires_at,
            } => {
                self.store.update_command_expiry(command_id, expires_at)?;
                tracing::info!(actuator_id, command_id, %expires_at, "on extended");
                Ok(Outcome::Extended)
            }
            Decision::TurnOff => {
                let cmd = NewCommand::system_off(actuator_id, now);
                match self.store.insert_command_if_latest(&cmd, seen)? {
                    Some(_) => {
                        tracing::info!(actuator_id, "actuator off");
                        Ok(Outcome::TurnedOff)
                    }
                    None => {
                        tracing::warn!(actuator_id, "off skipped: command log advanced mid-tick");
                        Ok(Outcome::Unchanged)
                    }
                }
            }
            Decision::Keep => Ok(Outcome::Unchanged),
        }
    }

    /// Tick forever at `interval`, starting immediately.
    ///
    /// A pass that overruns the interval makes the timer skip the missed
    /// ticks instead of bursting, so passes never overlap.
    pub async fn run(&self, interval: std::time::Duration) {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            timer.tick().await;
            let summary = self.tick(Local::now().naive_local());
            if summary.is_quiet() {
                tracing::debug!(?summary, "tick complete");
            } else {
                tracing::info!(?summary, "tick complete");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::store::{NewSchedule, SqliteStore};
    use crate::types::{ActuatorKind, Issuer, SwitchState};
    use chrono::{NaiveDate, NaiveTime};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 25).unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, s).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn fixture() -> (Reconciler<SqliteStore>, i64) {
        let store = SqliteStore::open_in_memory().unwrap();
        let pump = store.insert_actuator("west-bed pump", ActuatorKind::Pump).unwrap();
        let reconciler = Reconciler::new(store);
        (reconciler, pump.id)
    }

    fn add_window(store: &SqliteStore, actuator_id: i64, start: NaiveTime, end: NaiveTime) {
        store
            .insert_schedule(&NewSchedule {
                actuator_id,
                date: day(),
                start_time: start,
                end_time: end,
                issued_by: "user42".into(),
            })
            .unwrap();
    }

    #[test]
    fn scheduled_window_turns_actuator_on_then_off() {
        let (reconciler, pump) = fixture();
        add_window(reconciler.store(), pump, t(8, 0), t(9, 0));

        // Tick inside the window: system ON until 09:00, status cached.
        let summary = reconciler.tick(at(8, 0, 30));
        assert_eq!(summary.turned_on, 1);
        let cmd = reconciler.store().latest_command(pump).unwrap().unwrap();
        assert_eq!(cmd.state, SwitchState::On);
        assert_eq!(cmd.issued_by, Issuer::System);
        assert_eq!(cmd.expires_at, Some(at(9, 0, 0)));
        assert_eq!(
            reconciler.store().list_actuators().unwrap()[0].status,
            SwitchState::On
        );

        // Tick after the window lapsed: system OFF, status cached.
        let summary = reconciler.tick(at(9, 1, 0));
        assert_eq!(summary.turned_off, 1);
        let cmd = reconciler.store().latest_command(pump).unwrap().unwrap();
        assert_eq!(cmd.state, SwitchState::Off);
        assert_eq!(cmd.issued_by, Issuer::System);
        assert_eq!(cmd.expires_at, None);
        assert_eq!(
            reconciler.store().list_actuators().unwrap()[0].status,
            SwitchState::Off
        );
    }

    #[test]
    fn second_tick_without_time_passing_writes_nothing() {
        let (reconciler, pump) = fixture();
        add_window(reconciler.store(), pump, t(8, 0), t(9, 0));

        reconciler.tick(at(8, 0, 30));
        let commands_before = reconciler.store().list_commands(pump).unwrap().len();

        let summary = reconciler.tick(at(8, 0, 30));
        assert!(summary.is_quiet(), "second tick must be a no-op: {summary:?}");
        assert_eq!(
            reconciler.store().list_commands(pump).unwrap().len(),
            commands_before
        );
    }

    #[test]
    fn window_extends_a_shorter_manual_on_in_place() {
        let (reconciler, pump) = fixture();
        add_window(reconciler.store(), pump, t(8, 0), t(9, 0));
        reconciler
            .store()
            .insert_command(&NewCommand {
                actuator_id: pump,
                state: SwitchState::On,
                level: None,
                issued_by: Issuer::User("user42".into()),
                issued_at: at(7, 50, 0),
                expires_at: Some(at(8, 20, 0)),
            })
            .unwrap();

        let summary = reconciler.tick(at(8, 0, 30));
        assert_eq!(summary.extended, 1);
        let commands = reconciler.store().list_commands(pump).unwrap();
        assert_eq!(commands.len(), 1, "extension must not append");
        assert_eq!(commands[0].expires_at, Some(at(9, 0, 0)));
    }

    #[test]
    fn manual_off_during_window_is_left_alone() {
        let (reconciler, pump) = fixture();
        add_window(reconciler.store(), pump, t(8, 0), t(9, 0));
        reconciler.tick(at(8, 0, 30));
        reconciler
            .store()
            .insert_command(&NewCommand {
                actuator_id: pump,
                state: SwitchState::Off,
                level: None,
                issued_by: Issuer::User("user42".into()),
                issued_at: at(8, 10, 0),
                expires_at: None,
            })
            .unwrap();

        let summary = reconciler.tick(at(8, 11, 0));
        assert!(summary.is_quiet());
        let latest = reconciler.store().latest_command(pump).unwrap().unwrap();
        assert_eq!(latest.state, SwitchState::Off);
        assert_eq!(latest.issued_by, Issuer::User("user42".into()));
    }

    #[test]
    fn unscheduled_manual_on_survives_ticks_until_expiry() {
        let (reconciler, pump) = fixture();
        reconciler
            .store()
            .insert_command(&NewCommand {
                actuator_id: pump,
                state: SwitchState::On,
                level: Some(60),
                issued_by: Issuer::User("user42".into()),
                issued_at: at(10, 0, 0),
                expires_at: Some(at(10, 30, 0)),
            })
            .unwrap();

        assert!(reconciler.tick(at(10, 5, 0)).is_quiet());

        // Once expired the loop terminates it.
        let summary = reconciler.tick(at(10, 31, 0));
        assert_eq!(summary.turned_off, 1);
        assert_eq!(
            reconciler.store().list_actuators().unwrap()[0].status,
            SwitchState::Off
        );
    }

    #[test]
    fn one_failing_actuator_does_not_stop_the_pass() {
        struct FailingFor {
            inner: SqliteStore,
            broken: i64,
        }

        impl Store for FailingFor {
            fn actuator_ids(&self) -> Result<Vec<i64>> {
                self.inner.actuator_ids()
            }
            fn schedules_for_day(
                &self,
                actuator_id: i64,
                date: NaiveDate,
            ) -> Result<Vec<crate::schedule::Schedule>> {
                if actuator_id == self.broken {
                    return Err(crate::VerdantError::ActuatorNotFound(actuator_id));
                }
                self.inner.schedules_for_day(actuator_id, date)
            }
            fn latest_command(&self, actuator_id: i64) -> Result<Option<Command>> {
                self.inner.latest_command(actuator_id)
            }
            fn insert_command_if_latest(
                &self,
                cmd: &NewCommand,
                seen: Option<i64>,
            ) -> Result<Option<i64>> {
                self.inner.insert_command_if_latest(cmd, seen)
            }
            fn update_command_expiry(
                &self,
                command_id: i64,
                expires_at: NaiveDateTime,
            ) -> Result<()> {
                self.inner.update_command_expiry(command_id, expires_at)
            }
            fn set_actuator_status(&self, actuator_id: i64, status: SwitchState) -> Result<()> {
                self.inner.set_actuator_status(actuator_id, status)
            }
        }

        let store = SqliteStore::open_in_memory().unwrap();
        let broken = store.insert_actuator("dead fan", ActuatorKind::Fan).unwrap();
        let pump = store.insert_actuator("west-bed pump", ActuatorKind::Pump).unwrap();
        add_window(&store, pump.id, t(8, 0), t(9, 0));

        let reconciler = Reconciler::new(FailingFor {
            inner: store,
            broken: broken.id,
        });
        let summary = reconciler.tick(at(8, 0, 30));

        assert_eq!(summary.failed, 1);
        // The healthy actuator was still reconciled.
        assert_eq!(summary.turned_on, 1);
    }

    #[test]
    fn unlistable_actuators_yield_an_empty_summary() {
        struct Unlistable;

        impl Store for Unlistable {
            fn actuator_ids(&self) -> Result<Vec<i64>> {
                Err(crate::VerdantError::StorePoisoned)
            }
            fn schedules_for_day(
                &self,
                _actuator_id: i64,
                _date: NaiveDate,
            ) -> Result<Vec<crate::schedule::Schedule>> {
                unreachable!("tick must stop before per-actuator reads")
            }
            fn latest_command(&self, _actuator_id: i64) -> Result<Option<Command>> {
                unreachable!("tick must stop before per-actuator reads")
            }
            fn insert_command_if_latest(
                &self,
                _cmd: &NewCommand,
                _seen: Option<i64>,
            ) -> Result<Option<i64>> {
                unreachable!("tick must stop before per-actuator writes")
            }
            fn update_command_expiry(
                &self,
                _command_id: i64,
                _expires_at: NaiveDateTime,
            ) -> Result<()> {
                unreachable!("tick must stop before per-actuator writes")
            }
            fn set_actuator_status(&self, _actuator_id: i64, _status: SwitchState) -> Result<()> {
                unreachable!("tick must stop before per-actuator writes")
            }
        }

        // The error is swallowed and logged so the caller's timer stays
        // armed; the pass itself reports nothing done.
        let reconciler = Reconciler::new(Unlistable);
        let summary = reconciler.tick(at(8, 0, 30));
        assert_eq!(summary, TickSummary::default());
    }

    #[test]
    fn stale_snapshot_is_not_written_over_a_newer_command() {
        // Simulate a manual command racing the tick: the decision snapshot
        // is taken, then the log advances before apply.
        let (reconciler, pump) = fixture();
        add_window(reconciler.store(), pump, t(8, 0), t(9, 0));

        let stale_seen = None;
        let manual = NewCommand {
            actuator_id: pump,
            state: SwitchState::Off,
            level: None,
            issued_by: Issuer::User("user42".into()),
            issued_at: at(8, 0, 10),
            expires_at: None,
        };
        reconciler.store().insert_command(&manual).unwrap();

        let cmd = NewCommand::system_on(pump, at(8, 0, 30), at(9, 0, 0));
        let inserted = reconciler
            .store()
            .insert_command_if_latest(&cmd, stale_seen)
            .unwrap();
        assert!(inserted.is_none());

        // The next full tick observes the manual OFF and respects it.
        let summary = reconciler.tick(at(8, 1, 0));
        assert!(summary.is_quiet());
    }
}
