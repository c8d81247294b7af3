use crate::output::{print_json, print_table};
use anyhow::Result;
use chrono::{Duration, Local, NaiveDateTime};
use clap::Subcommand;
use verdant_core::command::NewCommand;
use verdant_core::config::Config;
use verdant_core::store::SqliteStore;
use verdant_core::types::{Issuer, SwitchState};

// ---------------------------------------------------------------------------
// Subcommand definition
// ---------------------------------------------------------------------------

#[derive(Subcommand, Debug)]
pub enum CommandSubcommand {
    /// Issue a manual on/off command
    Issue {
        /// Actuator id
        #[arg(long)]
        actuator: i64,
        /// Desired state: on or off
        state: SwitchState,
        /// Optional power level (0-100)
        #[arg(long)]
        level: Option<u8>,
        /// Auto-expire an ON command after this many minutes
        #[arg(long, conflicts_with = "expires_at")]
        duration_minutes: Option<i64>,
        /// Explicit expiry, YYYY-MM-DDTHH:MM:SS
        #[arg(long)]
        expires_at: Option<NaiveDateTime>,
        /// Id of the issuing user
        #[arg(long)]
        user: String,
    },
    /// Show the command history for an actuator, newest first
    List {
        /// Actuator id
        #[arg(long)]
        actuator: i64,
    },
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn run(config: &Config, subcommand: CommandSubcommand, json: bool) -> Result<()> {
    let store = SqliteStore::open(&config.database)?;
    match subcommand {
        CommandSubcommand::Issue {
            actuator,
            state,
            level,
            duration_minutes,
            expires_at,
            user,
        } => {
            let now = Local::now().naive_local();
            // Explicit expiry wins; otherwise an ON with a duration expires
            // that many minutes from now. OFF commands never expire.
            let expires_at = match (expires_at, duration_minutes) {
                (Some(exp), _) => Some(exp),
                (None, Some(mins)) if state == SwitchState::On => Some(now + Duration::minutes(mins)),
                _ => None,
            };

            let command = store.insert_command(&NewCommand {
                actuator_id: actuator,
                state,
                level,
                issued_by: Issuer::User(user),
                issued_at: now,
                expires_at,
            })?;
            if json {
                print_json(&command)?;
            } else {
                match command.expires_at {
                    Some(exp) => println!(
                        "Actuator {} commanded {} until {} (command {})",
                        command.actuator_id, command.state, exp, command.id
                    ),
                    None => println!(
                        "Actuator {} commanded {} (command {})",
                        command.actuator_id, command.state, command.id
                    ),
                }
            }
            Ok(())
        }
        CommandSubcommand::List { actuator } => {
            let commands = store.list_commands(actuator)?;
            if json {
                return print_json(&commands);
            }
            if commands.is_empty() {
                println!("No commands for actuator {actuator}.");
                return Ok(());
            }
            let headers = &["ID", "STATE", "LEVEL", "ISSUED BY", "ISSUED AT", "EXPIRES AT"];
            let rows = commands
                .iter()
                .map(|c| {
                    vec![
                        c.id.to_string(),
                        c.state.to_string(),
                        c.level.map(|l| l.to_string()).unwrap_or_else(|| "-".into()),
                        c.issued_by.to_string(),
                        c.issued_at.to_string(),
                        c.expires_at
                            .map(|e| e.to_string())
                            .unwrap_or_else(|| "-".into()),
                    ]
                })
                .collect();
            print_table(headers, rows);
            Ok(())
        }
    }
}
