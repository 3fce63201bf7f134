//! In-process oracle backed by a map of deployed code.

use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard},
};

use alloy_core::primitives::{Address, B256, Bytes, U256};

use super::{DEFAULT_FACTORY, DeploymentOracle, create2_address};

/// Oracle that simulates a CREATE2 factory in memory.
///
/// Deployed payloads are stored as the code at their address. Used for dry runs
/// and tests; it can be pre-seeded with existing code and told to fail on
/// specific addresses.
#[derive(Debug)]
pub struct MemoryOracle {
    factory: Address,
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    code: HashMap<Address, Bytes>,
    deployments: Vec<MemoryDeploy>,
    faults: HashSet<Address>,
    misroute: bool,
}

/// A deploy call received by a [`MemoryOracle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryDeploy {
    pub address: Address,
    pub salt: B256,
    pub value: Option<U256>,
}

impl Default for MemoryOracle {
    fn default() -> Self {
        Self::new(DEFAULT_FACTORY)
    }
}

impl MemoryOracle {
    pub fn new(factory: Address) -> Self {
        Self {
            factory,
            state: Mutex::new(MemoryState::default()),
        }
    }

    pub fn factory(&self) -> Address {
        self.factory
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a test panicked mid-call; the map is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Place `code` at `address` as if something had deployed it already.
    pub fn seed(&self, address: Address, code: impl Into<Bytes>) {
        self.state().code.insert(address, code.into());
    }

    pub fn code_at(&self, address: Address) -> Option<Bytes> {
        self.state().code.get(&address).cloned()
    }

    /// Deploy calls received so far, in order.
    pub fn deployments(&self) -> Vec<MemoryDeploy> {
        self.state().deployments.clone()
    }

    pub fn deploy_count(&self) -> usize {
        self.state().deployments.len()
    }

    /// Make every call touching `address` fail.
    pub fn inject_fault(&self, address: Address) {
        self.state().faults.insert(address);
    }

    /// Make deploys land one byte off the computed address.
    pub fn misroute_deploys(&self) {
        self.state().misroute = true;
    }
}

impl DeploymentOracle for MemoryOracle {
    fn compute_deterministic_address(&self, salt: B256, payload: &[u8]) -> anyhow::Result<Address> {
        Ok(create2_address(self.factory, salt, payload))
    }

    async fn has_been_deployed(&self, address: Address) -> anyhow::Result<bool> {
        let state = self.state();
        if state.faults.contains(&address) {
            anyhow::bail!("Injected fault for {address}");
        }
        Ok(state.code.contains_key(&address))
    }

    async fn deploy(
        &self,
        salt: B256,
        payload: Bytes,
        value: Option<U256>,
    ) -> anyhow::Result<Address> {
        let computed = create2_address(self.factory, salt, &payload);
        let mut state = self.state();

        if state.faults.contains(&computed) {
            anyhow::bail!("Injected fault for {computed}");
        }
        if state.code.contains_key(&computed) {
            anyhow::bail!("Address {computed} is already occupied");
        }

        let address = if state.misroute {
            let mut bytes = computed.0;
            bytes[19] ^= 0x01;
            Address::from(bytes)
        } else {
            computed
        };

        state.code.insert(address, payload);
        state.deployments.push(MemoryDeploy {
            address,
            salt,
            value,
        });

        tracing::debug!(%address, %salt, "Deployed artifact in memory");

        Ok(address)
    }
}
