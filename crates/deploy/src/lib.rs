//! saltcake-deploy - Deterministic, idempotent artifact deployment.
//!
//! Artifacts are registered under a unique name together with a salt, their init
//! code and constructor arguments. Each one gets a CREATE2-style address derived
//! from its content before anything is deployed. A deploy pass then walks the
//! registry in registration order, skips every artifact whose address is already
//! occupied (`Found`) and deploys the rest (`Created`), so re-running a pass is
//! always safe.

mod config;
mod deployment;
mod error;
mod lifecycle;
mod orchestrator;
pub mod oracle;
mod registry;
pub mod report;
mod rpc;

pub use config::{ArtifactConfig, DeployConfig, SALTCAKE_CONF_FILENAME, load_bytecode};
pub use deployment::{Artifact, Deployment, DeploymentStatus, fingerprint};
pub use error::{DeployError, Result};
pub use lifecycle::{Checks, DeployScript, run};
pub use oracle::{
    AddressResolver, DEFAULT_FACTORY, DeploymentOracle, MemoryOracle, RpcOracle, RpcOracleConfig,
    create2_address,
};
pub use orchestrator::{DeploySummary, Orchestrator};
pub use registry::Registry;
