//! CLI subcommand implementations.

pub mod check;
pub mod receive;
pub mod stream;
