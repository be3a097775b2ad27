//! GN integration
//!
//! - `args`: reading and writing `args.gn` assignments
//! - `command`: GN command lines and how they are echoed

pub mod args;
pub mod command;

pub use args::{escape_gn_string, render_args, ArgsExtras, GnArgs, GnArgsError, GnValue};
pub use command::{format_command, GnTool};
