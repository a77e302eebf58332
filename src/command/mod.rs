// src/command/mod.rs

//! Command-line construction.
//!
//! - [`quote`] holds shell quoting and SQL normalisation helpers.
//! - [`line`] defines the immutable `CommandLine` with credential redaction.
//! - [`builder`] maps operation parameters and settings onto each wrapped
//!   program's flag grammar.

pub mod builder;
pub mod line;
pub mod quote;

pub use builder::{CommandBuilder, QueryStyle};
pub use line::{Arg, CommandLine, REDACTED};
