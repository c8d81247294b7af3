use crate::output::{print_json, print_table};
use anyhow::Result;
use clap::Subcommand;
use verdant_core::config::Config;
use verdant_core::store::SqliteStore;
use verdant_core::types::ActuatorKind;

// ---------------------------------------------------------------------------
// Subcommand definition
// ---------------------------------------------------------------------------

#[derive(Subcommand, Debug)]
pub enum ActuatorSubcommand {
    /// Register a new actuator
    Add {
        /// Human-readable name (e.g. "west-bed pump")
        name: String,
        /// Device kind: pump, fan, light, heater, valve, or other
        #[arg(long)]
        kind: ActuatorKind,
    },
    /// List actuators with their cached status
    List,
    /// Remove an actuator and its schedules and command history
    Remove { id: i64 },
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn run(config: &Config, subcommand: ActuatorSubcommand, json: bool) -> Result<()> {
    let store = SqliteStore::open(&config.database)?;
    match subcommand {
        ActuatorSubcommand::Add { name, kind } => {
            let actuator = store.insert_actuator(&name, kind)?;
            if json {
                print_json(&actuator)?;
            } else {
                println!("Added {} '{}' (id {})", actuator.kind, actuator.name, actuator.id);
            }
            Ok(())
        }
        ActuatorSubcommand::List => {
            let actuators = store.list_actuators()?;
            if json {
                return print_json(&actuators);
            }
            if actuators.is_empty() {
                println!("No actuators registered.");
                return Ok(());
            }
            let headers = &["ID", "NAME", "KIND", "STATUS"];
            let rows = actuators
                .iter()
                .map(|a| {
                    vec![
                        a.id.to_string(),
                        a.name.clone(),
                        a.kind.to_string(),
                        a.status.to_string(),
                    ]
                })
                .collect();
            print_table(headers, rows);
            Ok(())
        }
        ActuatorSubcommand::Remove { id } => {
            store.remove_actuator(id)?;
            println!("Removed actuator {id}");
            Ok(())
        }
    }
}
