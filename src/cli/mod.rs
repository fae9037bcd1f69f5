pub mod commands;
pub mod error;
pub mod output;

pub use commands::{run, Cli, Commands, LeadCommands, StageCommands};
pub use error::*;
pub use output::*;
