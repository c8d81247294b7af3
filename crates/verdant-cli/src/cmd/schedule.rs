use crate::output::{print_json, print_table};
use anyhow::Result;
use chrono::{NaiveDate, NaiveTime};
use clap::Subcommand;
use verdant_core::config::Config;
use verdant_core::store::{NewSchedule, SqliteStore};

// ---------------------------------------------------------------------------
// Subcommand definition
// ---------------------------------------------------------------------------

#[derive(Subcommand, Debug)]
pub enum ScheduleSubcommand {
    /// Create a schedule window (the actuator is forced on during it)
    Add {
        /// Actuator id
        #[arg(long)]
        actuator: i64,
        /// Calendar date, YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
        /// Window start, HH:MM:SS
        #[arg(long)]
        start: NaiveTime,
        /// Window end, HH:MM:SS (must be after start, same day)
        #[arg(long)]
        end: NaiveTime,
        /// Id of the user creating the window
        #[arg(long)]
        user: String,
    },
    /// List schedule windows
    List {
        /// Filter by actuator id
        #[arg(long)]
        actuator: Option<i64>,
        /// Filter by date, YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Delete a schedule window
    Delete { id: i64 },
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn run(config: &Config, subcommand: ScheduleSubcommand, json: bool) -> Result<()> {
    let store = SqliteStore::open(&config.database)?;
    match subcommand {
        ScheduleSubcommand::Add {
            actuator,
            date,
            start,
            end,
            user,
        } => {
            let schedule = store.insert_schedule(&NewSchedule {
                actuator_id: actuator,
                date,
                start_time: start,
                end_time: end,
                issued_by: user,
            })?;
            if json {
                print_json(&schedule)?;
            } else {
                println!(
                    "Scheduled actuator {} on {} from {} to {} (id {})",
                    schedule.actuator_id,
                    schedule.date,
                    schedule.start_time,
                    schedule.end_time,
                    schedule.id
                );
            }
            Ok(())
        }
        ScheduleSubcommand::List { actuator, date } => {
            let schedules = store.list_schedules(actuator, date)?;
            if json {
                return print_json(&schedules);
            }
            if schedules.is_empty() {
                println!("No schedules.");
                return Ok(());
            }
            let headers = &["ID", "ACTUATOR", "DATE", "START", "END", "USER"];
            let rows = schedules
                .iter()
                .map(|s| {
                    vec![
                        s.id.to_string(),
                        s.actuator_id.to_string(),
                        s.date.to_string(),
                        s.start_time.to_string(),
                        s.end_time.to_string(),
                        s.issued_by.clone(),
                    ]
                })
                .collect();
            print_table(headers, rows);
            Ok(())
        }
        ScheduleSubcommand::Delete { id } => {
            store.delete_schedule(id)?;
            println!("Deleted schedule {id}");
            Ok(())
        }
    }
}
