pub mod commands;
pub mod systemctl;

pub use commands::{command_available, run_as_user, run_checked, run_command};
