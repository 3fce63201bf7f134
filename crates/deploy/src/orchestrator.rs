//! Registration and idempotent deployment of artifacts.

use std::io::{Stdout, Write};

use alloy_core::primitives::{Address, B256, Bytes};
use derive_more::Deref;

use crate::{
    deployment::{Artifact, Deployment, DeploymentStatus},
    error::{DeployError, Result},
    oracle::{AddressResolver, DeploymentOracle},
    registry::Registry,
    report::{ReportState, Reporter},
};

/// Outcome counts of a deploy pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeploySummary {
    pub found: usize,
    pub created: usize,
}

impl DeploySummary {
    pub fn total(&self) -> usize {
        self.found + self.created
    }

    fn record(&mut self, status: DeploymentStatus) {
        match status {
            DeploymentStatus::Found => self.found += 1,
            DeploymentStatus::Created => self.created += 1,
            DeploymentStatus::Unresolved => {}
        }
    }
}

/// Drives registration and deployment against a [`DeploymentOracle`].
///
/// Artifacts are processed strictly one after another, in registration order.
/// Registry queries (`names`, `lookup`, `len`, ...) are available through `Deref`.
#[derive(Debug, Deref)]
pub struct Orchestrator<O, W = Stdout> {
    #[deref]
    registry: Registry,
    resolver: AddressResolver<O>,
    reporter: Reporter<W>,
}

impl<O: DeploymentOracle> Orchestrator<O> {
    /// Orchestrator reporting to stdout.
    pub fn new(oracle: O) -> Self {
        Self::with_output(oracle, std::io::stdout())
    }
}

impl<O: DeploymentOracle, W: Write> Orchestrator<O, W> {
    pub fn with_output(oracle: O, out: W) -> Self {
        Self {
            registry: Registry::new(),
            resolver: AddressResolver::new(oracle),
            reporter: Reporter::new(out),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn oracle(&self) -> &O {
        self.resolver.oracle()
    }

    /// The report sink.
    pub fn output(&self) -> &W {
        self.reporter.get_ref()
    }

    pub fn into_output(self) -> W {
        self.reporter.into_inner()
    }

    /// Register an artifact and return its deterministic address.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        salt: B256,
        init_code: impl Into<Bytes>,
        constructor_args: impl Into<Bytes>,
    ) -> Result<Address> {
        let artifact = Artifact::new(name, init_code)
            .salt(salt)
            .constructor_args(constructor_args);
        self.register_artifact(artifact)
    }

    /// Register with a zero salt and no constructor arguments.
    pub fn register_code(
        &mut self,
        name: impl Into<String>,
        init_code: impl Into<Bytes>,
    ) -> Result<Address> {
        self.register_artifact(Artifact::new(name, init_code))
    }

    /// Register with no constructor arguments.
    pub fn register_salted(
        &mut self,
        name: impl Into<String>,
        salt: B256,
        init_code: impl Into<Bytes>,
    ) -> Result<Address> {
        self.register_artifact(Artifact::new(name, init_code).salt(salt))
    }

    /// Register with a zero salt.
    pub fn register_with_args(
        &mut self,
        name: impl Into<String>,
        init_code: impl Into<Bytes>,
        constructor_args: impl Into<Bytes>,
    ) -> Result<Address> {
        self.register_artifact(Artifact::new(name, init_code).constructor_args(constructor_args))
    }

    /// Register a fully specified artifact.
    ///
    /// Nothing is recorded if the name is taken or the oracle cannot derive the address.
    pub fn register_artifact(&mut self, artifact: Artifact) -> Result<Address> {
        self.registry.ensure_available(&artifact.name)?;

        let address = self
            .resolver
            .resolve_address(artifact.salt, &artifact.payload())?;
        let deployment = self.registry.insert(artifact, address)?;

        tracing::debug!(
            name = %deployment.name,
            %address,
            fingerprint = %deployment.fingerprint,
            "Registered artifact"
        );

        Ok(address)
    }

    /// Deploy every registered artifact, in registration order.
    ///
    /// Writes the header, one row per artifact and a closing blank line. Stops at
    /// the first oracle failure; already settled entries keep their status.
    pub async fn deploy_all(&mut self, broadcast: bool) -> Result<DeploySummary> {
        let width = self.registry.longest_name_width();
        self.reporter.header(width)?;

        let mut summary = DeploySummary::default();
        for name in self.registry.names().to_vec() {
            let status = self.deploy_single(&name, broadcast).await?;
            summary.record(status);
        }

        self.reporter.separator()?;

        tracing::info!(
            found = summary.found,
            created = summary.created,
            total = summary.total(),
            broadcast,
            "Deployment pass complete"
        );

        Ok(summary)
    }

    /// Deploy a single artifact, with its own header row.
    pub async fn deploy_by_name(&mut self, name: &str, broadcast: bool) -> Result<DeploymentStatus> {
        self.registry.get(name)?;
        self.reporter.header(self.registry.longest_name_width())?;
        self.deploy_single(name, broadcast).await
    }

    /// Settle one artifact and write its report row.
    ///
    /// An occupied address is `Found`. Otherwise the artifact is `Created`, and
    /// deployed through the oracle when `broadcast` is set. An entry settled by an
    /// earlier pass keeps its status and issues no deploy call, except a dry run
    /// entry on a broadcast pass, which is settled again for real.
    pub async fn deploy_single(&mut self, name: &str, broadcast: bool) -> Result<DeploymentStatus> {
        let deployment = self.registry.get(name)?.clone();
        let occupied = self.resolver.is_occupied(deployment.address).await?;

        let open = if broadcast {
            deployment.awaits_broadcast()
        } else {
            !deployment.status.is_resolved()
        };

        let (status, address, dry_run) = if !open {
            (deployment.status, deployment.address, deployment.dry_run)
        } else if occupied {
            (DeploymentStatus::Found, deployment.address, false)
        } else if broadcast {
            let actual = self
                .resolver
                .deploy(deployment.salt, deployment.payload(), deployment.value)
                .await?;
            if actual != deployment.address {
                return Err(DeployError::AddressMismatch {
                    name: deployment.name,
                    expected: deployment.address,
                    actual,
                });
            }
            (DeploymentStatus::Created, actual, false)
        } else {
            (DeploymentStatus::Created, deployment.address, true)
        };

        let width = self.registry.longest_name_width();
        let settled = self.registry.settle(name, status, address, dry_run)?;

        tracing::info!(
            name = %settled.name,
            address = %settled.address,
            status = %settled.status,
            dry_run = settled.dry_run,
            broadcast,
            "Artifact settled"
        );

        self.reporter
            .row(ReportState::from(settled.status), settled, width)?;

        Ok(settled.status)
    }

    /// Whether any artifact was created by this orchestrator.
    pub fn has_any_change(&self) -> bool {
        self.registry.iter().any(Deployment::is_created)
    }

    pub fn has_change(&self, name: &str) -> Result<bool> {
        Ok(self.registry.get(name)?.is_created())
    }

    pub fn get_address(&self, name: &str) -> Result<Address> {
        Ok(self.registry.get(name)?.address)
    }

    /// A copy of the deployment registered under `name`.
    pub fn get_deployment(&self, name: &str) -> Result<Deployment> {
        self.registry.lookup(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::MemoryOracle;
    use alloy_core::primitives::U256;

    fn orchestrator() -> Orchestrator<MemoryOracle, Vec<u8>> {
        Orchestrator::with_output(MemoryOracle::default(), Vec::new())
    }

    fn report(orchestrator: &Orchestrator<MemoryOracle, Vec<u8>>) -> String {
        String::from_utf8(orchestrator.output().clone()).unwrap()
    }

    #[test]
    fn test_register_returns_resolved_address() {
        let mut orchestrator = orchestrator();
        let address = orchestrator.register_code("Token", vec![0x60u8, 0x00]).unwrap();

        let expected = orchestrator
            .oracle()
            .compute_deterministic_address(B256::ZERO, &[0x60, 0x00])
            .unwrap();
        assert_eq!(address, expected);
        assert_eq!(orchestrator.get_address("Token").unwrap(), expected);
        assert_eq!(
            orchestrator.get_deployment("Token").unwrap().status,
            DeploymentStatus::Unresolved
        );
    }

    #[test]
    fn test_overloads_default_salt_and_args() {
        let mut orchestrator = orchestrator();
        let code = vec![0x60u8, 0x00];

        let a = orchestrator.register_code("A", code.clone()).unwrap();
        let b = orchestrator
            .register("B", B256::ZERO, code.clone(), Bytes::new())
            .unwrap();
        let c = orchestrator
            .register_with_args("C", code.clone(), Bytes::new())
            .unwrap();
        let d = orchestrator
            .register_salted("D", B256::with_last_byte(9), code)
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_constructor_args_change_address() {
        let mut orchestrator = orchestrator();
        let bare = orchestrator.register_code("Bare", vec![0x60u8, 0x00]).unwrap();
        let with_args = orchestrator
            .register_with_args("WithArgs", vec![0x60u8, 0x00], vec![0x01u8])
            .unwrap();

        assert_ne!(bare, with_args);
    }

    #[tokio::test]
    async fn test_deploy_by_name_settles_only_that_artifact() {
        let mut orchestrator = orchestrator();
        orchestrator.register_code("A", vec![0x01u8]).unwrap();
        orchestrator.register_code("B", vec![0x02u8]).unwrap();

        let status = orchestrator.deploy_by_name("B", true).await.unwrap();

        assert_eq!(status, DeploymentStatus::Created);
        assert!(orchestrator.has_change("B").unwrap());
        assert!(!orchestrator.has_change("A").unwrap());
        assert_eq!(
            orchestrator.get_deployment("A").unwrap().status,
            DeploymentStatus::Unresolved
        );

        let out = report(&orchestrator);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("State    Name"));
        assert!(lines[1].starts_with("Creating B    0x"));
    }

    #[tokio::test]
    async fn test_deploy_by_name_unknown() {
        let mut orchestrator = orchestrator();
        let err = orchestrator.deploy_by_name("Ghost", true).await.unwrap_err();

        assert!(matches!(err, DeployError::NotFound { .. }));
        assert!(report(&orchestrator).is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_issues_no_deploys() {
        let mut orchestrator = orchestrator();
        orchestrator.register_code("Token", vec![0x60u8, 0x00]).unwrap();

        let summary = orchestrator.deploy_all(false).await.unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(orchestrator.oracle().deploy_count(), 0);
        assert!(orchestrator.has_any_change());
        assert!(report(&orchestrator).contains("Creating Token "));
    }

    #[tokio::test]
    async fn test_broadcast_after_dry_run_deploys() {
        let mut orchestrator = orchestrator();
        let address = orchestrator.register_code("Token", vec![0x60u8, 0x00]).unwrap();

        orchestrator.deploy_all(false).await.unwrap();
        assert!(orchestrator.get_deployment("Token").unwrap().dry_run);
        assert_eq!(orchestrator.oracle().deploy_count(), 0);

        let summary = orchestrator.deploy_all(true).await.unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(orchestrator.oracle().deploy_count(), 1);
        assert!(orchestrator.oracle().code_at(address).is_some());

        let token = orchestrator.get_deployment("Token").unwrap();
        assert_eq!(token.status, DeploymentStatus::Created);
        assert!(!token.dry_run);

        // A third pass finds nothing left to do.
        orchestrator.deploy_all(true).await.unwrap();
        assert_eq!(orchestrator.oracle().deploy_count(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_entry_found_on_broadcast() {
        let mut orchestrator = orchestrator();
        let address = orchestrator.register_code("Token", vec![0x60u8, 0x00]).unwrap();

        orchestrator.deploy_all(false).await.unwrap();
        // Someone else deploys it between the two passes.
        orchestrator.oracle().seed(address, vec![0x00u8]);
        orchestrator.deploy_all(true).await.unwrap();

        assert_eq!(
            orchestrator.get_deployment("Token").unwrap().status,
            DeploymentStatus::Found
        );
        assert_eq!(orchestrator.oracle().deploy_count(), 0);
        assert!(!orchestrator.has_any_change());
    }

    #[tokio::test]
    async fn test_settled_entry_is_not_redeployed() {
        let mut orchestrator = orchestrator();
        orchestrator.register_code("Token", vec![0x60u8, 0x00]).unwrap();

        orchestrator.deploy_all(true).await.unwrap();
        let status = orchestrator.deploy_single("Token", true).await.unwrap();

        assert_eq!(status, DeploymentStatus::Created);
        assert_eq!(orchestrator.oracle().deploy_count(), 1);
    }

    #[tokio::test]
    async fn test_value_is_forwarded() {
        let mut orchestrator = orchestrator();
        orchestrator
            .register_artifact(
                Artifact::new("Funded", vec![0x60u8, 0x00]).value(U256::from(5)),
            )
            .unwrap();
        orchestrator.register_code("Unfunded", vec![0x60u8, 0x01]).unwrap();

        orchestrator.deploy_all(true).await.unwrap();

        let calls = orchestrator.oracle().deployments();
        assert_eq!(calls[0].value, Some(U256::from(5)));
        assert_eq!(calls[1].value, None);
    }

    #[tokio::test]
    async fn test_empty_registry_reports_header_only() {
        let mut orchestrator = orchestrator();
        let summary = orchestrator.deploy_all(true).await.unwrap();

        assert_eq!(summary.total(), 0);
        assert!(!orchestrator.has_any_change());
        assert_eq!(
            report(&orchestrator),
            format!("{}\n\n", crate::report::format_header(0))
        );
    }
}
