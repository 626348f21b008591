//! CLI subcommands.

pub mod migrate;
pub mod open;
pub mod records;
