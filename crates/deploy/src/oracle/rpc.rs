//! Oracle backed by an Ethereum JSON-RPC node and a CREATE2 factory contract.

use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes, U256};
use anyhow::Context;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{DEFAULT_FACTORY, DeploymentOracle, create2_address};
use crate::rpc;

/// Default time to wait for a deployment transaction to be mined.
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Connection settings for [`RpcOracle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcOracleConfig {
    /// JSON-RPC endpoint of the target chain.
    pub url: Url,
    /// CREATE2 factory taking `salt ‖ init_code` as calldata.
    pub factory: Address,
    /// Account the node signs deployment transactions with.
    pub sender: Address,
    /// How long to wait for a deployment receipt.
    pub receipt_timeout: Duration,
}

impl RpcOracleConfig {
    pub fn new(url: Url, sender: Address) -> Self {
        Self {
            url,
            factory: DEFAULT_FACTORY,
            sender,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        }
    }
}

/// Minimal view of a transaction receipt.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionReceipt {
    status: Option<String>,
    block_number: Option<String>,
}

impl TransactionReceipt {
    fn succeeded(&self) -> bool {
        self.status.as_deref() != Some("0x0")
    }
}

/// Deployment oracle talking to a node over JSON-RPC.
///
/// Addresses are derived locally from the factory address, occupancy is
/// `eth_getCode`, and deployments are `eth_sendTransaction` calls to the factory
/// from an account the node manages.
#[derive(Debug, Clone)]
pub struct RpcOracle {
    client: reqwest::Client,
    config: RpcOracleConfig,
}

impl RpcOracle {
    pub fn new(config: RpcOracleConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: rpc::create_client()?,
            config,
        })
    }

    pub fn config(&self) -> &RpcOracleConfig {
        &self.config
    }

    async fn code_at(&self, address: Address) -> anyhow::Result<Bytes> {
        rpc::json_rpc_call(
            &self.client,
            self.config.url.as_str(),
            "eth_getCode",
            vec![json!(address), json!("latest")],
        )
        .await
        .with_context(|| format!("Failed to fetch code at {address}"))
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> anyhow::Result<TransactionReceipt> {
        rpc::poll_until(
            "deployment receipt",
            self.config.receipt_timeout,
            move || async move {
                let receipt: Option<TransactionReceipt> = rpc::json_rpc_call(
                    &self.client,
                    self.config.url.as_str(),
                    "eth_getTransactionReceipt",
                    vec![json!(tx_hash)],
                )
                .await?;

                // Some nodes return pending receipts without a block number.
                Ok(receipt.filter(|r| r.block_number.is_some()))
            },
        )
        .await
    }
}

/// Calldata understood by the deterministic deployment proxy: `salt ‖ payload`.
fn factory_calldata(salt: B256, payload: &[u8]) -> String {
    format!("0x{}{}", hex::encode(salt), hex::encode(payload))
}

impl DeploymentOracle for RpcOracle {
    fn compute_deterministic_address(&self, salt: B256, payload: &[u8]) -> anyhow::Result<Address> {
        Ok(create2_address(self.config.factory, salt, payload))
    }

    async fn has_been_deployed(&self, address: Address) -> anyhow::Result<bool> {
        Ok(!self.code_at(address).await?.is_empty())
    }

    async fn deploy(
        &self,
        salt: B256,
        payload: Bytes,
        value: Option<U256>,
    ) -> anyhow::Result<Address> {
        let address = create2_address(self.config.factory, salt, &payload);

        if self.has_been_deployed(address).await? {
            anyhow::bail!("Address {address} is already occupied");
        }

        let mut tx = json!({
            "from": self.config.sender,
            "to": self.config.factory,
            "data": factory_calldata(salt, &payload),
        });
        if let Some(value) = value {
            tx["value"] = json!(format!("{value:#x}"));
        }

        let tx_hash: B256 = rpc::json_rpc_call(
            &self.client,
            self.config.url.as_str(),
            "eth_sendTransaction",
            vec![tx],
        )
        .await
        .context("Failed to send deployment transaction")?;

        tracing::info!(%tx_hash, %address, "Deployment transaction sent");

        let receipt = self
            .wait_for_receipt(tx_hash)
            .await
            .with_context(|| format!("Deployment transaction {tx_hash} was not mined"))?;

        if !receipt.succeeded() {
            anyhow::bail!("Deployment transaction {tx_hash} reverted");
        }

        if !self.has_been_deployed(address).await? {
            anyhow::bail!("Deployment transaction {tx_hash} left no code at {address}");
        }

        Ok(address)
    }
}
