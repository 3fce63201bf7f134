use std::path::PathBuf;

use alloy_core::primitives::Address;
use clap::{Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "saltcake")]
#[command(
    author,
    version,
    about = "Deterministic, idempotent deployment of CREATE2 artifacts"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "SALTCAKE_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Deploy every configured artifact that is not on chain yet.
    Deploy(DeployArgs),
    /// Print the deterministic address of every configured artifact.
    Plan(PlanArgs),
}

#[derive(Debug, Clone, Args)]
pub struct DeployArgs {
    /// Path to a Saltcake.toml file, or a directory containing one.
    #[arg(long, alias = "conf", env = "SALTCAKE_CONFIG", default_value = ".")]
    pub config: PathBuf,

    /// Send deployment transactions.
    ///
    /// Without it the run is a dry run: artifacts missing on chain are reported
    /// as `Creating` but nothing is sent.
    #[arg(long, env = "SALTCAKE_BROADCAST")]
    pub broadcast: bool,

    /// JSON-RPC endpoint, overriding the configuration file.
    #[arg(long, alias = "rpc", env = "SALTCAKE_RPC_URL")]
    pub rpc_url: Option<Url>,

    /// Sender account, overriding the configuration file.
    #[arg(long, env = "SALTCAKE_SENDER")]
    pub sender: Option<Address>,
}

#[derive(Debug, Clone, Args)]
pub struct PlanArgs {
    /// Path to a Saltcake.toml file, or a directory containing one.
    #[arg(long, alias = "conf", env = "SALTCAKE_CONFIG", default_value = ".")]
    pub config: PathBuf,
}
