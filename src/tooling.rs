//! CLI Tooling
//!
//! Command-line surface for the hook binary. Each subcommand reads the
//! inbound document from stdin and produces the outbound decision document.

pub mod cli;
