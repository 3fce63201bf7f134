//! saltcake deploys a set of artifacts to deterministic CREATE2 addresses, skipping
//! every artifact that is already on chain.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::{Table, presets::UTF8_FULL};

use cli::{Cli, Command, DeployArgs, PlanArgs};
use saltcake_deploy::{
    Artifact, DeployConfig, DeployScript, MemoryOracle, Orchestrator, RpcOracle, run,
};

/// Deploy script registering the artifacts listed in the configuration file.
struct ConfigScript {
    config: DeployConfig,
    artifacts: Vec<Artifact>,
}

impl DeployScript<RpcOracle> for ConfigScript {
    fn load_parameters(&mut self) -> Result<()> {
        self.artifacts = self.config.load_artifacts()?;
        Ok(())
    }

    fn register(&mut self, orchestrator: &mut Orchestrator<RpcOracle>) -> Result<()> {
        for artifact in self.artifacts.drain(..) {
            orchestrator.register_artifact(artifact)?;
        }
        Ok(())
    }

    fn after_deploy(&mut self, orchestrator: &Orchestrator<RpcOracle>) -> Result<()> {
        if !orchestrator.has_any_change() {
            tracing::info!("Every artifact was already deployed");
        }
        Ok(())
    }
}

async fn deploy(args: DeployArgs) -> Result<()> {
    let mut config = DeployConfig::load_from_file(&args.config)?;

    if let Some(rpc_url) = args.rpc_url {
        config.rpc_url = Some(rpc_url);
    }
    if let Some(sender) = args.sender {
        config.sender = Some(sender);
    }
    let broadcast = args.broadcast || config.broadcast;

    let oracle = RpcOracle::new(config.rpc_oracle_config()?)?;
    let mut orchestrator = Orchestrator::new(oracle);
    let mut script = ConfigScript {
        config,
        artifacts: Vec::new(),
    };

    run(&mut script, &mut orchestrator, broadcast).await
}

fn plan(args: PlanArgs) -> Result<()> {
    let config = DeployConfig::load_from_file(&args.config)?;

    let mut orchestrator =
        Orchestrator::with_output(MemoryOracle::new(config.factory), std::io::sink());
    for artifact in config.load_artifacts()? {
        orchestrator
            .register_artifact(artifact)
            .context("Failed to register artifact")?;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Name", "Salt", "Address", "Initcode hash"]);
    for deployment in orchestrator.iter() {
        table.add_row(vec![
            deployment.name.clone(),
            deployment.salt.to_string(),
            deployment.address.to_string(),
            deployment.fingerprint.to_string(),
        ]);
    }

    println!("{table}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    match cli.command {
        Command::Deploy(args) => deploy(args).await,
        Command::Plan(args) => plan(args),
    }
}
