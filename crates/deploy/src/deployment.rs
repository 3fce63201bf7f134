//! Deployment records and their status.

use alloy_core::primitives::{Address, B256, Bytes, U256, keccak256};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Deployment status of a registered artifact.
///
/// The only valid transitions are `Unresolved -> Found` and `Unresolved -> Created`.
/// A `Created` entry settled by a dry run is still open to the next broadcast pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    /// Registered, no deploy pass has looked at it yet.
    #[default]
    Unresolved,
    /// Something already occupied the deterministic address.
    Found,
    /// The artifact was deployed (or would be, on a dry run) by this orchestrator.
    Created,
}

impl DeploymentStatus {
    /// Whether a deploy pass has already settled this entry.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }
}

/// A deployable artifact, as handed to the registry.
///
/// Salt defaults to zero, constructor arguments to empty and value to zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub salt: B256,
    pub init_code: Bytes,
    pub constructor_args: Bytes,
    pub value: U256,
}

impl Artifact {
    pub fn new(name: impl Into<String>, init_code: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            salt: B256::ZERO,
            init_code: init_code.into(),
            constructor_args: Bytes::new(),
            value: U256::ZERO,
        }
    }

    pub fn salt(mut self, salt: B256) -> Self {
        self.salt = salt;
        self
    }

    pub fn constructor_args(mut self, args: impl Into<Bytes>) -> Self {
        self.constructor_args = args.into();
        self
    }

    /// Native currency forwarded with the deployment.
    pub fn value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// The full payload the address is derived from: `init_code ‖ constructor_args`.
    pub fn payload(&self) -> Bytes {
        concat_payload(&self.init_code, &self.constructor_args)
    }
}

/// One registered artifact.
///
/// `fingerprint` and `address` are content-addressed and fixed at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub name: String,
    pub salt: B256,
    pub init_code: Bytes,
    pub constructor_args: Bytes,
    pub value: U256,
    /// keccak-256 of `init_code ‖ constructor_args`.
    pub fingerprint: B256,
    /// Deterministic target address.
    pub address: Address,
    pub status: DeploymentStatus,
    /// Settled by a dry run: nothing was sent for it yet.
    #[serde(default)]
    pub dry_run: bool,
}

impl Deployment {
    pub(crate) fn new(artifact: Artifact, address: Address) -> Self {
        let fingerprint = fingerprint(&artifact.init_code, &artifact.constructor_args);
        Self {
            name: artifact.name,
            salt: artifact.salt,
            init_code: artifact.init_code,
            constructor_args: artifact.constructor_args,
            value: artifact.value,
            fingerprint,
            address,
            status: DeploymentStatus::Unresolved,
            dry_run: false,
        }
    }

    pub fn payload(&self) -> Bytes {
        concat_payload(&self.init_code, &self.constructor_args)
    }

    pub fn is_created(&self) -> bool {
        self.status == DeploymentStatus::Created
    }

    /// Whether a broadcast pass may still settle this entry.
    ///
    /// True while unresolved, or while `Created` only on paper by a dry run.
    pub fn awaits_broadcast(&self) -> bool {
        !self.status.is_resolved() || (self.is_created() && self.dry_run)
    }
}

/// Content identity of an artifact: keccak-256 over `init_code ‖ constructor_args`.
pub fn fingerprint(init_code: &[u8], constructor_args: &[u8]) -> B256 {
    keccak256(concat_payload(init_code, constructor_args))
}

fn concat_payload(init_code: &[u8], constructor_args: &[u8]) -> Bytes {
    let mut payload = Vec::with_capacity(init_code.len() + constructor_args.len());
    payload.extend_from_slice(init_code);
    payload.extend_from_slice(constructor_args);
    payload.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_core::primitives::{address, b256};

    #[test]
    fn test_fingerprint_covers_constructor_args() {
        let code = [0x60u8, 0x80, 0x60, 0x40];
        let bare = fingerprint(&code, &[]);
        let with_args = fingerprint(&code, &[0x01]);

        assert_ne!(bare, with_args);
        assert_eq!(bare, keccak256(code));
    }

    #[test]
    fn test_fingerprint_is_split_agnostic() {
        // Only the concatenation matters, not where the init code ends.
        assert_eq!(fingerprint(&[1u8, 2, 3], &[4]), fingerprint(&[1u8, 2], &[3, 4]));
    }

    #[test]
    fn test_artifact_defaults() {
        let artifact = Artifact::new("Token", vec![0xfeu8]);

        assert_eq!(artifact.salt, B256::ZERO);
        assert!(artifact.constructor_args.is_empty());
        assert_eq!(artifact.value, U256::ZERO);
        assert_eq!(artifact.payload(), Bytes::from(vec![0xfeu8]));
    }

    #[test]
    fn test_new_deployment_is_unresolved() {
        let salt = b256!("0000000000000000000000000000000000000000000000000000000000000001");
        let target = address!("00000000000000000000000000000000000000aa");
        let artifact = Artifact::new("Vault", vec![0x60u8, 0x00])
            .salt(salt)
            .constructor_args(vec![0xabu8]);

        let deployment = Deployment::new(artifact, target);

        assert_eq!(deployment.status, DeploymentStatus::Unresolved);
        assert!(!deployment.status.is_resolved());
        assert!(deployment.awaits_broadcast());
        assert_eq!(deployment.address, target);
        assert_eq!(deployment.salt, salt);
        assert_eq!(deployment.payload(), Bytes::from(vec![0x60u8, 0x00, 0xab]));
        assert_eq!(deployment.fingerprint, keccak256([0x60u8, 0x00, 0xab]));
    }

    #[test]
    fn test_dry_run_entry_awaits_broadcast() {
        let mut deployment = Deployment::new(Artifact::new("Token", vec![0x01u8]), Address::ZERO);

        deployment.status = DeploymentStatus::Created;
        deployment.dry_run = true;
        assert!(deployment.awaits_broadcast());

        deployment.dry_run = false;
        assert!(!deployment.awaits_broadcast());

        deployment.status = DeploymentStatus::Found;
        assert!(!deployment.awaits_broadcast());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(DeploymentStatus::Unresolved.to_string(), "Unresolved");
        assert_eq!(DeploymentStatus::Found.to_string(), "Found");
        assert_eq!(DeploymentStatus::Created.to_string(), "Created");
    }
}
