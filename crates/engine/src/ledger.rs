// EDP - EVM Deployment Pipeline
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Ledger node access.
//!
//! [`LedgerClient`] is the narrow surface the pipeline needs from an EVM node:
//! account enumeration, transaction submission and receipt waiting.
//! [`AlloyLedger`] implements it over JSON-RPC.

use std::{str::FromStr, time::Duration};

use alloy_network::EthereumWallet;
use alloy_primitives::{Address, TxHash};
use alloy_provider::{
    fillers::{ChainIdFiller, GasFiller, NonceFiller, SimpleNonceManager},
    DynProvider, Provider, ProviderBuilder,
};
use alloy_rpc_types::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::LedgerError;

/// Interval between two receipt polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// The part of a transaction receipt the pipeline looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Hash of the mined transaction
    pub transaction_hash: TxHash,
    /// Created contract, for contract creation transactions
    pub contract_address: Option<Address>,
    /// Execution status; `false` means the transaction reverted
    pub success: bool,
}

/// An EVM node the pipeline can send transactions to.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Accounts that can sign transactions, in the node's order.
    async fn accounts(&self) -> Result<Vec<Address>, LedgerError>;

    /// Sign (locally or on the node) and broadcast `tx`. Returns once the node
    /// accepted it, without waiting for it to be mined.
    async fn submit(&self, tx: TransactionRequest) -> Result<TxHash, LedgerError>;

    /// Wait until `hash` is mined or `timeout` elapses.
    async fn wait_for_receipt(&self, hash: TxHash, timeout: Duration)
        -> Result<Receipt, LedgerError>;
}

/// JSON-RPC ledger client backed by an alloy provider.
pub struct AlloyLedger {
    provider: DynProvider,
    /// Address of the local signer, if transactions are signed locally
    signer: Option<Address>,
    poll_interval: Duration,
}

impl std::fmt::Debug for AlloyLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloyLedger")
            .field("signer", &self.signer)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl AlloyLedger {
    /// Create a client for the node at `rpc_url`.
    ///
    /// With `private_key`, transactions are signed locally and the signer is the
    /// only available account. Without it, the node signs with its own unlocked
    /// accounts. No request is made until the first call.
    pub fn connect(rpc_url: &str, private_key: Option<&str>) -> Result<Self, LedgerError> {
        let url = rpc_url
            .parse()
            .map_err(|e| LedgerError::Transport(format!("invalid RPC URL `{rpc_url}`: {e}")))?;

        // Nonces come from the node on every send, so a call rejected during gas
        // estimation leaves no gap for the next one
        let builder = ProviderBuilder::new()
            .disable_recommended_fillers()
            .filler(NonceFiller::new(SimpleNonceManager::default()))
            .filler(GasFiller)
            .filler(ChainIdFiller::default());

        let (provider, signer) = match private_key {
            Some(key) => {
                let signer = PrivateKeySigner::from_str(key.trim())
                    .map_err(|e| LedgerError::InvalidSigner(e.to_string()))?;
                let address = signer.address();
                let provider =
                    builder.wallet(EthereumWallet::from(signer)).connect_http(url).erased();
                (provider, Some(address))
            }
            None => (builder.connect_http(url).erased(), None),
        };

        info!(rpc_url, local_signer = ?signer, "created ledger client");
        Ok(Self { provider, signer, poll_interval: DEFAULT_POLL_INTERVAL })
    }

    /// Set how often receipts are polled.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Address of the local signer, if any.
    pub fn signer(&self) -> Option<Address> {
        self.signer
    }

    async fn poll_receipt(&self, hash: TxHash) -> Result<Receipt, LedgerError> {
        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(hash)
                .await
                .map_err(|e| LedgerError::Transport(format!("failed to get receipt: {e}")))?;

            if let Some(receipt) = receipt {
                return Ok(Receipt {
                    transaction_hash: receipt.transaction_hash,
                    contract_address: receipt.contract_address,
                    success: receipt.status(),
                });
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl LedgerClient for AlloyLedger {
    async fn accounts(&self) -> Result<Vec<Address>, LedgerError> {
        if let Some(signer) = self.signer {
            return Ok(vec![signer]);
        }

        self.provider
            .get_accounts()
            .await
            .map_err(|e| LedgerError::Transport(format!("failed to list accounts: {e}")))
    }

    async fn submit(&self, tx: TransactionRequest) -> Result<TxHash, LedgerError> {
        let pending = self.provider.send_transaction(tx).await.map_err(|e| {
            // A JSON-RPC error response means the node saw and refused it
            if e.is_error_resp() {
                LedgerError::Rejected(e.to_string())
            } else {
                LedgerError::Transport(e.to_string())
            }
        })?;

        let hash = *pending.tx_hash();
        debug!(%hash, "transaction accepted by node");
        Ok(hash)
    }

    async fn wait_for_receipt(
        &self,
        hash: TxHash,
        timeout: Duration,
    ) -> Result<Receipt, LedgerError> {
        tokio::time::timeout(timeout, self.poll_receipt(hash))
            .await
            .map_err(|_| LedgerError::Timeout { hash, timeout })?
    }
}
