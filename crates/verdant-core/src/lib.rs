pub mod actuator;
pub mod command;
pub mod config;
pub mod error;
pub mod reconciler;
pub mod schedule;
pub mod store;
pub mod types;

pub use error::{Result, VerdantError};
