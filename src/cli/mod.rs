//! Command-line interface definitions and helpers.
//!
//! This module contains all CLI argument parsing, enums, and subcommand handlers.

mod args;
mod commands;
mod enums;

pub use args::{Args, Command, ConfigAction, FieldArgs, LibraryAction, VideoArgs};
pub use commands::{
    build_fields, format_size, handle_config_action, load_config, read_prompt_file, run_compose,
    run_direct, run_generate, run_library, run_presets, setup_ctrlc_handler,
};
pub use enums::{AspectArg, PresetArg, ResolutionArg};
