pub mod display;
pub mod commands;

pub use display::{format_duration, print_outcome, ResultsView};
pub use commands::{help_text, parse_command, Command, OptionToggle};
