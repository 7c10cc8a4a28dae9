pub mod cli;
pub mod common;
pub mod config;
pub mod manifest;

pub use cli::{
    build_cli_command, CableCommands, Cli, Commands, DropCommands, MpptCommands, ProjectCommands,
    StringCommands,
};
pub use common::OutputFormat;
