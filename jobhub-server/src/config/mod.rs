//! Configuration lookup, parsing and validation.
//!
//! Sources options from the command line and an optional TOML file, merges
//! them over compiled-in defaults, and validates the result into
//! [`AppSettings`].

mod cli;
mod file;
mod settings;

pub use self::settings::{signal_number, AppSettings};
