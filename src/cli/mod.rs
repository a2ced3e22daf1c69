//! Command-line interface definitions for the `flotilla` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `flotilla` binary.
#[derive(Debug, Parser)]
#[command(
    name = "flotilla",
    about = "Provision fleets of compute nodes and follow their logs",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Provision a fleet of nodes concurrently.
    #[command(name = "up", about = "Provision a fleet of nodes concurrently")]
    Up(UpCommand),
    /// Follow a node's system log over SSH.
    #[command(name = "tail", about = "Follow a node's system log over SSH")]
    Tail(TailCommand),
    /// Delete every node carrying the fleet prefix.
    #[command(name = "down", about = "Delete every node carrying the fleet prefix")]
    Down,
}

/// Arguments for the `flotilla up` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct UpCommand {
    /// Number of nodes to provision.
    ///
    /// All creations run concurrently; a partial failure still reports the
    /// nodes that were created before exiting non-zero.
    #[arg(value_name = "COUNT", default_value_t = 1, allow_negative_numbers = true)]
    pub(crate) count: i32,
}

/// Arguments for the `flotilla tail` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct TailCommand {
    /// Address of the node's API endpoint, e.g. `https://35.1.2.3:8443`.
    #[arg(value_name = "ADDRESS")]
    pub(crate) address: String,
    /// Display name for the node being tailed.
    #[arg(long, value_name = "NAME", default_value = "node")]
    pub(crate) name: String,
}
