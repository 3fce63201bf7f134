//! Deploy script lifecycle.
//!
//! A deploy script customizes a run through hooks invoked in a fixed order:
//! `load_parameters`, `register`, `before_deploy`, `deploy`, `after_deploy`.
//! Every hook has a default; only `deploy` does something by default, running
//! [`Orchestrator::deploy_all`].
//!
//! # Example
//!
//! ```no_run
//! use saltcake_deploy::{DeployScript, MemoryOracle, Orchestrator, run};
//!
//! struct TokenScript;
//!
//! impl DeployScript<MemoryOracle> for TokenScript {
//!     fn register(&mut self, orchestrator: &mut Orchestrator<MemoryOracle>) -> anyhow::Result<()> {
//!         orchestrator.register_code("Token", vec![0x60u8, 0x00])?;
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut orchestrator = Orchestrator::new(MemoryOracle::default());
//! run(&mut TokenScript, &mut orchestrator, true).await?;
//! # Ok(())
//! # }
//! ```

use std::{
    future::Future,
    io::{Stdout, Write},
};

use anyhow::Context;

use crate::{
    deployment::DeploymentStatus,
    error::DeployError,
    oracle::DeploymentOracle,
    orchestrator::Orchestrator,
};

/// Hooks of a deploy run. See the module docs for the order they run in.
pub trait DeployScript<O: DeploymentOracle, W: Write = Stdout> {
    /// Load whatever the script needs before registering artifacts.
    fn load_parameters(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Register the artifacts to deploy.
    fn register(&mut self, _orchestrator: &mut Orchestrator<O, W>) -> anyhow::Result<()> {
        Ok(())
    }

    fn before_deploy(&mut self, _orchestrator: &mut Orchestrator<O, W>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Deploy the registered artifacts.
    fn deploy(
        &mut self,
        orchestrator: &mut Orchestrator<O, W>,
        broadcast: bool,
    ) -> impl Future<Output = anyhow::Result<()>> {
        async move {
            orchestrator.deploy_all(broadcast).await?;
            Ok(())
        }
    }

    fn after_deploy(&mut self, _orchestrator: &Orchestrator<O, W>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Run every hook of `script` in order, stopping at the first failure.
///
/// Core failures keep their type: callers can `downcast_ref::<DeployError>()`.
pub async fn run<S, O, W>(
    script: &mut S,
    orchestrator: &mut Orchestrator<O, W>,
    broadcast: bool,
) -> anyhow::Result<()>
where
    S: DeployScript<O, W>,
    O: DeploymentOracle,
    W: Write,
{
    script
        .load_parameters()
        .context("Failed to load deploy parameters")?;
    script
        .register(orchestrator)
        .context("Failed to register artifacts")?;

    tracing::info!(artifacts = orchestrator.len(), broadcast, "Starting deployment...");

    script
        .before_deploy(orchestrator)
        .context("Before-deploy hook failed")?;
    script
        .deploy(orchestrator, broadcast)
        .await
        .context("Deployment failed")?;
    script
        .after_deploy(orchestrator)
        .context("After-deploy hook failed")?;

    Ok(())
}

/// Assertion helper for scripts and test drivers.
///
/// A failed check is returned as [`DeployError::AssertionFailure`] and is also
/// recorded, so a driver can tell the run failed even if the error was swallowed.
#[derive(Debug, Default, Clone)]
pub struct Checks {
    failures: Vec<String>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, condition: bool, message: impl Into<String>) -> Result<(), DeployError> {
        if condition {
            return Ok(());
        }

        let message = message.into();
        tracing::error!(%message, "Check failed");
        self.failures.push(message.clone());
        Err(DeployError::AssertionFailure { message })
    }

    /// Check that `name` settled with `expected`.
    pub fn check_status<O, W>(
        &mut self,
        orchestrator: &Orchestrator<O, W>,
        name: &str,
        expected: DeploymentStatus,
    ) -> Result<(), DeployError>
    where
        O: DeploymentOracle,
        W: Write,
    {
        let actual = orchestrator.get_deployment(name)?.status;
        self.check(
            actual == expected,
            format!("`{name}` is {actual}, expected {expected}"),
        )
    }

    pub fn failed(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::MemoryOracle;

    type TestOrchestrator = Orchestrator<MemoryOracle, Vec<u8>>;

    #[derive(Default)]
    struct RecordingScript {
        calls: Vec<&'static str>,
        checks: Checks,
        fail_register: bool,
    }

    impl DeployScript<MemoryOracle, Vec<u8>> for RecordingScript {
        fn load_parameters(&mut self) -> anyhow::Result<()> {
            self.calls.push("load_parameters");
            Ok(())
        }

        fn register(&mut self, orchestrator: &mut TestOrchestrator) -> anyhow::Result<()> {
            self.calls.push("register");
            orchestrator.register_code("Token", vec![0x60u8, 0x00])?;
            if self.fail_register {
                orchestrator.register_code("Token", vec![0x60u8, 0x01])?;
            }
            Ok(())
        }

        fn before_deploy(&mut self, _orchestrator: &mut TestOrchestrator) -> anyhow::Result<()> {
            self.calls.push("before_deploy");
            Ok(())
        }

        async fn deploy(
            &mut self,
            orchestrator: &mut TestOrchestrator,
            broadcast: bool,
        ) -> anyhow::Result<()> {
            self.calls.push("deploy");
            orchestrator.deploy_all(broadcast).await?;
            Ok(())
        }

        fn after_deploy(&mut self, orchestrator: &TestOrchestrator) -> anyhow::Result<()> {
            self.calls.push("after_deploy");
            self.checks
                .check_status(orchestrator, "Token", DeploymentStatus::Created)?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_hooks_run_in_order() {
        let mut script = RecordingScript::default();
        let mut orchestrator = Orchestrator::with_output(MemoryOracle::default(), Vec::new());

        run(&mut script, &mut orchestrator, true).await.unwrap();

        assert_eq!(
            script.calls,
            ["load_parameters", "register", "before_deploy", "deploy", "after_deploy"]
        );
        assert!(!script.checks.failed());
    }

    #[tokio::test]
    async fn test_failure_stops_the_run() {
        let mut script = RecordingScript {
            fail_register: true,
            ..Default::default()
        };
        let mut orchestrator = Orchestrator::with_output(MemoryOracle::default(), Vec::new());

        let err = run(&mut script, &mut orchestrator, true).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DeployError>(),
            Some(DeployError::DuplicateName { .. })
        ));
        assert_eq!(script.calls, ["load_parameters", "register"]);
        assert_eq!(orchestrator.oracle().deploy_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_check_marks_failure() {
        let mut script = RecordingScript::default();
        let mut orchestrator = Orchestrator::with_output(MemoryOracle::default(), Vec::new());
        let token = orchestrator
            .oracle()
            .compute_deterministic_address(Default::default(), &[0x60, 0x00])
            .unwrap();
        // Already deployed, so the script's `Created` check fails.
        orchestrator.oracle().seed(token, vec![0x00u8]);

        let err = run(&mut script, &mut orchestrator, true).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DeployError>(),
            Some(DeployError::AssertionFailure { .. })
        ));
        assert!(script.checks.failed());
        assert_eq!(script.checks.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_default_hooks_deploy_everything() {
        struct Defaults;
        impl DeployScript<MemoryOracle, Vec<u8>> for Defaults {}

        let mut orchestrator = Orchestrator::with_output(MemoryOracle::default(), Vec::new());
        orchestrator.register_code("A", vec![0x01u8]).unwrap();

        run(&mut Defaults, &mut orchestrator, true).await.unwrap();

        assert!(orchestrator.has_change("A").unwrap());
    }
}
