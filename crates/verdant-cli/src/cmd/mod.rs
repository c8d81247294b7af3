pub mod actuator;
pub mod command;
pub mod run;
pub mod schedule;
