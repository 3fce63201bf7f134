//! Deployment oracle abstraction.
//!
//! The oracle is the external service that derives deterministic addresses,
//! reports whether an address is occupied, and performs deployments. The
//! orchestrator only talks to it through [`AddressResolver`].

mod memory;
mod rpc;

use std::{future::Future, sync::Arc};

use alloy_core::primitives::{Address, B256, Bytes, U256, address};

use crate::error::{DeployError, Result};

pub use memory::{MemoryDeploy, MemoryOracle};
pub use rpc::{DEFAULT_RECEIPT_TIMEOUT, RpcOracle, RpcOracleConfig};

/// The deterministic deployment proxy present at the same address on most EVM chains.
pub const DEFAULT_FACTORY: Address = address!("4e59b44847b379578588920ca78fbf26c0b4956c");

/// CREATE2 address of `payload` deployed by `factory` with `salt`.
pub fn create2_address(factory: Address, salt: B256, payload: &[u8]) -> Address {
    factory.create2_from_code(salt, payload)
}

/// External service computing addresses, reporting occupancy and deploying artifacts.
///
/// `compute_deterministic_address` must be a pure function of its inputs.
pub trait DeploymentOracle: Send + Sync {
    /// The address `payload` lands at when deployed with `salt`.
    fn compute_deterministic_address(&self, salt: B256, payload: &[u8]) -> anyhow::Result<Address>;

    /// Whether an artifact already exists at `address`.
    fn has_been_deployed(
        &self,
        address: Address,
    ) -> impl Future<Output = anyhow::Result<bool>> + Send;

    /// Deploy `payload` with `salt`, returning the resulting address.
    ///
    /// Fails if the target address is already occupied.
    fn deploy(
        &self,
        salt: B256,
        payload: Bytes,
        value: Option<U256>,
    ) -> impl Future<Output = anyhow::Result<Address>> + Send;
}

impl<O: DeploymentOracle> DeploymentOracle for Arc<O> {
    fn compute_deterministic_address(&self, salt: B256, payload: &[u8]) -> anyhow::Result<Address> {
        (**self).compute_deterministic_address(salt, payload)
    }

    fn has_been_deployed(
        &self,
        address: Address,
    ) -> impl Future<Output = anyhow::Result<bool>> + Send {
        (**self).has_been_deployed(address)
    }

    fn deploy(
        &self,
        salt: B256,
        payload: Bytes,
        value: Option<U256>,
    ) -> impl Future<Output = anyhow::Result<Address>> + Send {
        (**self).deploy(salt, payload, value)
    }
}

/// Thin wrapper turning oracle failures into [`DeployError::OracleFault`].
#[derive(Debug, Clone)]
pub struct AddressResolver<O> {
    oracle: O,
}

impl<O: DeploymentOracle> AddressResolver<O> {
    pub fn new(oracle: O) -> Self {
        Self { oracle }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn resolve_address(&self, salt: B256, payload: &[u8]) -> Result<Address> {
        self.oracle
            .compute_deterministic_address(salt, payload)
            .map_err(|e| DeployError::oracle("computing the deterministic address", e))
    }

    pub async fn is_occupied(&self, address: Address) -> Result<bool> {
        self.oracle
            .has_been_deployed(address)
            .await
            .map_err(|e| DeployError::oracle(format!("checking occupancy of {address}"), e))
    }

    /// Deploy through the oracle. A zero `value` is sent as no value at all.
    pub async fn deploy(&self, salt: B256, payload: Bytes, value: U256) -> Result<Address> {
        let value = (!value.is_zero()).then_some(value);
        self.oracle
            .deploy(salt, payload, value)
            .await
            .map_err(|e| DeployError::oracle("deploying", e))
    }
}
