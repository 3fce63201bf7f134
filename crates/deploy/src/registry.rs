//! Insertion-ordered registry of deployments.

use std::collections::HashMap;

use alloy_core::primitives::Address;
use unicode_width::UnicodeWidthStr;

use crate::{
    deployment::{Artifact, Deployment, DeploymentStatus},
    error::{DeployError, Result},
};

/// Registered deployments, keyed by name, iterated in registration order.
///
/// The registry is append-only: entries are never removed, and only the
/// orchestrator settles their status.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    names: Vec<String>,
    deployments: HashMap<String, Deployment>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new deployment for `artifact` at the already resolved `address`.
    ///
    /// Fails without touching the registry if the name is taken.
    pub(crate) fn insert(&mut self, artifact: Artifact, address: Address) -> Result<&Deployment> {
        self.ensure_available(&artifact.name)?;

        let name = artifact.name.clone();
        self.names.push(name.clone());
        let deployment = self
            .deployments
            .entry(name)
            .or_insert_with(|| Deployment::new(artifact, address));

        Ok(deployment)
    }

    /// Fails with [`DeployError::DuplicateName`] if `name` is already registered.
    pub fn ensure_available(&self, name: &str) -> Result<()> {
        if self.deployments.contains_key(name) {
            return Err(DeployError::DuplicateName {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// A copy of the deployment registered under `name`.
    pub fn lookup(&self, name: &str) -> Result<Deployment> {
        self.get(name).cloned()
    }

    pub(crate) fn get(&self, name: &str) -> Result<&Deployment> {
        self.deployments
            .get(name)
            .ok_or_else(|| DeployError::NotFound {
                name: name.to_string(),
            })
    }

    /// Settle the status of `name`, re-confirming its address.
    ///
    /// A resolved entry keeps its status: transitions only leave `Unresolved`,
    /// or a `Created` entry that only a dry run settled.
    pub(crate) fn settle(
        &mut self,
        name: &str,
        status: DeploymentStatus,
        address: Address,
        dry_run: bool,
    ) -> Result<&Deployment> {
        let deployment = self
            .deployments
            .get_mut(name)
            .ok_or_else(|| DeployError::NotFound {
                name: name.to_string(),
            })?;

        if deployment.awaits_broadcast() {
            deployment.status = status;
            deployment.address = address;
            deployment.dry_run = dry_run;
        }

        Ok(deployment)
    }

    /// Names in registration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.deployments.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Deployments in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Deployment> {
        self.names.iter().filter_map(|name| self.deployments.get(name))
    }

    /// Display width of the longest registered name, in terminal columns.
    pub fn longest_name_width(&self) -> usize {
        self.names
            .iter()
            .map(|name| name.width())
            .max()
            .unwrap_or(0)
    }
}
