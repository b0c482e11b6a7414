use anyhow::Context;
use solana_client::nonblocking::rpc_client::RpcClient as NonblockingRpcClient;
use solana_commitment_config::CommitmentConfig;
use solana_sdk::{account::Account, hash::Hash, pubkey::Pubkey};

/// Max keys per `getMultipleAccounts` request.
const ACCOUNTS_BATCH: usize = 100;

#[derive(Clone, Debug, Default)]
pub struct RpcConfig {
    pub endpoint: String,
}

/// Thin wrapper over the nonblocking RPC client. Only the bootstrap
/// path and the ALT fetcher touch RPC; the hot path never does.
pub struct RpcClient {
    inner: NonblockingRpcClient,
}

impl RpcClient {
    #[must_use]
    pub fn new(config: RpcConfig) -> Self {
        Self {
            inner: NonblockingRpcClient::new_with_commitment(
                config.endpoint,
                CommitmentConfig::confirmed(),
            ),
        }
    }

    /// Batched `getMultipleAccounts`; output order matches input order.
    pub async fn get_accounts(&self, keys: &[Pubkey]) -> anyhow::Result<Vec<Option<Account>>> {
        let mut out = Vec::with_capacity(keys.len());

        for chunk in keys.chunks(ACCOUNTS_BATCH) {
            let accounts = self
                .inner
                .get_multiple_accounts(chunk)
                .await
                .context("getMultipleAccounts failed")?;
            out.extend(accounts);
        }

        Ok(out)
    }

    pub async fn get_latest_blockhash(&self) -> anyhow::Result<Hash> {
        self.inner
            .get_latest_blockhash()
            .await
            .context("getLatestBlockhash failed")
    }

    pub async fn get_slot(&self) -> anyhow::Result<u64> {
        self.inner.get_slot().await.context("getSlot failed")
    }
}
