use std::{collections::HashMap, time::Duration};

use anyhow::{Context, bail};
use backon::{ExponentialBuilder, Retryable};
use futures_util::{SinkExt, TryFutureExt};
use rayon::{iter::ParallelIterator, prelude::*};
use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::Signature};
use tokio::{
    sync::watch,
    time::timeout,
};
use tokio_util::sync::CancellationToken;
use tracing::error;
use yellowstone_grpc_client::{ClientTlsConfig, GeyserGrpcClient, Interceptor};
use yellowstone_grpc_proto::{
    prelude::{
        CommitmentLevel, SubscribeRequest, SubscribeRequestFilterAccounts,
        SubscribeRequestFilterTransactions, SubscribeUpdate, SubscribeUpdateAccount,
        SubscribeUpdateBlockMeta, SubscribeUpdateSlot, SubscribeUpdateTransaction,
        subscribe_update::UpdateOneof,
    },
    tonic::{
        Status,
        codegen::tokio_stream::{Stream, StreamExt},
    },
};

use crate::libs::solana_client::{
    callback::BatchEventCallbackWrapper,
    dex::model::{
        AccountUpdate, BlockMetaEvent, Event, SlotEvent, TokenBalance, TxMeta, TxUpdate,
        UpdateSource,
    },
    message::{AltLookup, CompiledIx, DecodedMessage, MessageHeader, MessageVersion},
};

/// Configuration for the Yellowstone stream driver.
#[derive(Clone, Default)]
pub struct GrpcConfig {
    /// The gRPC endpoint URL.
    pub endpoint: String,
    /// Optional API token for authenticated endpoints.
    pub x_token: Option<String>,
    /// Max gRPC messages accumulated into a single processing burst.
    pub batch_size: usize,
    /// Microsecond-grade wait for extra messages after the first one
    /// in a burst.
    pub batch_fill_timeout: Duration,
    /// Program owners whose accounts to subscribe to.
    pub program_ids: Vec<String>,
    pub options: Option<SubscribeOptions>,
}

#[derive(Clone)]
pub struct SubscribeOptions {
    /// Connect timeout, seconds.
    pub connect_timeout: u64,
    pub include_failed: bool,
    pub include_vote: bool,
    pub commitment: Option<CommitmentLevel>,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            connect_timeout: 30,
            include_failed: false,
            include_vote: false,
            // Processed: transactions arrive pre-confirmation, which is
            // what makes them usable as backrun victims.
            commitment: Some(CommitmentLevel::Processed),
        }
    }
}

/// Yellowstone Geyser stream driver. Emits raw account writes and
/// parsed transactions; all decoding and state mutation happens on the
/// critical worker behind the callback.
pub struct GrpcClient {
    config: GrpcConfig,
    callback: Option<BatchEventCallbackWrapper>,
}

impl GrpcClient {
    #[must_use]
    pub fn new(config: GrpcConfig) -> Self {
        Self {
            config,
            callback: None,
        }
    }

    /// Sets the handler for parsed event batches.
    #[must_use]
    pub fn with_callback<Callback>(mut self, callback: Callback) -> Self
    where
        Callback: FnMut(Vec<Event>) -> anyhow::Result<()> + Send + 'static,
    {
        self.callback = Some(BatchEventCallbackWrapper::new(callback));
        self
    }

    /// Subscribes and pumps events until cancellation. `vault_rx`
    /// carries the evolving set of vault addresses to watch; a change
    /// re-sends the subscribe request on the live stream.
    pub async fn subscribe(
        &mut self,
        token: CancellationToken,
        vault_rx: watch::Receiver<Vec<String>>,
    ) -> anyhow::Result<()> {
        if self.config.program_ids.is_empty() {
            bail!("Program IDs cannot be empty");
        }

        let ctx = SubscriptionCtx {
            config: self.config.clone(),
            options: self.config.options.clone().unwrap_or_default(),
            callback: self.callback.clone(),
        };

        let operation = || {
            let token = token.clone();
            let ctx = ctx.clone();
            let vault_rx = vault_rx.clone();

            async move {
                let mut client = timeout(
                    Duration::from_secs(ctx.options.connect_timeout),
                    Self::connect(ctx.config.clone()),
                )
                .await
                .context("Connect timeout")?
                .context("Failed to connect to gRPC")?;

                let (mut subscribe_tx, stream) = timeout(
                    Duration::from_secs(ctx.options.connect_timeout),
                    client.subscribe(),
                )
                .await
                .context("Subscribe timeout")?
                .context("Failed to subscribe")?;

                let request = Self::build_subscribe_request(
                    ctx.config.program_ids.clone(),
                    vault_rx.borrow().clone(),
                    &ctx.options,
                );

                subscribe_tx
                    .send(request)
                    .await
                    .map_err(|e| anyhow::anyhow!("Send error: {e}"))?;

                Self::handle_events(stream, subscribe_tx, vault_rx.clone(), token.clone(), &ctx)
                    .await?;

                Ok(())
            }
            .inspect_err(|e: &anyhow::Error| {
                error!(
                    error = %e,
                    "Subscription attempt failed, checking retry conditions..."
                );
            })
        };

        operation
            .retry(ExponentialBuilder::default())
            .when(|_: &anyhow::Error| !token.is_cancelled())
            .await
    }

    async fn connect(
        config: GrpcConfig,
    ) -> anyhow::Result<GeyserGrpcClient<impl Interceptor + Clone>> {
        let mut builder = GeyserGrpcClient::build_from_shared(config.endpoint.clone())?;

        let tls_config = ClientTlsConfig::new();
        builder = builder.tls_config(tls_config)?;

        if let Some(token) = &config.x_token {
            builder = builder.x_token(Some(token))?
        };

        builder.connect().await.map_err(Into::into)
    }

    fn build_subscribe_request(
        program_ids: Vec<String>,
        vault_addresses: Vec<String>,
        options: &SubscribeOptions,
    ) -> SubscribeRequest {
        let mut accounts = HashMap::from([(
            "pool_sub".to_owned(),
            SubscribeRequestFilterAccounts {
                owner: program_ids.clone(),
                ..Default::default()
            },
        )]);

        if !vault_addresses.is_empty() {
            accounts.insert(
                "vault_sub".to_owned(),
                SubscribeRequestFilterAccounts {
                    account: vault_addresses,
                    ..Default::default()
                },
            );
        }

        let transactions = HashMap::from([(
            "tx_sub".to_owned(),
            SubscribeRequestFilterTransactions {
                failed: Some(options.include_failed),
                vote: Some(options.include_vote),
                account_include: program_ids,
                ..Default::default()
            },
        )]);

        SubscribeRequest {
            accounts,
            transactions,
            commitment: options
                .commitment
                .map(|c| c as i32)
                .or(Some(CommitmentLevel::Processed as i32)),
            ..Default::default()
        }
    }

    /// Event loop: burst-batched parallel parsing, plus live
    /// re-subscription when the vault watch set changes.
    async fn handle_events<S, Tx>(
        mut stream: S,
        mut subscribe_tx: Tx,
        mut vault_rx: watch::Receiver<Vec<String>>,
        token: CancellationToken,
        ctx: &SubscriptionCtx,
    ) -> anyhow::Result<()>
    where
        S: Stream<Item = Result<SubscribeUpdate, Status>> + Unpin + Send + 'static,
        Tx: futures_util::Sink<SubscribeRequest> + Unpin,
        <Tx as futures_util::Sink<SubscribeRequest>>::Error: std::fmt::Display,
    {
        let tx_source = match ctx.options.commitment {
            Some(CommitmentLevel::Processed) | None => UpdateSource::Pending,
            _ => UpdateSource::Grpc,
        };

        while !token.is_cancelled() {
            let mut batch = Vec::with_capacity(ctx.config.batch_size);

            tokio::select! {
                msg = stream.next() => match msg {
                    Some(msg) => batch.push(msg),
                    None => bail!("Stream closed by the remote host"),
                },
                changed = vault_rx.changed() => {
                    if changed.is_ok() {
                        let request = Self::build_subscribe_request(
                            ctx.config.program_ids.clone(),
                            vault_rx.borrow_and_update().clone(),
                            &ctx.options,
                        );
                        subscribe_tx
                            .send(request)
                            .await
                            .map_err(|e| anyhow::anyhow!("Resubscribe error: {e}"))?;
                    }
                    continue;
                }
            }

            // Fill the batch with already buffered messages.
            while batch.len() < ctx.config.batch_size {
                match timeout(ctx.config.batch_fill_timeout, stream.next()).await {
                    Ok(Some(msg)) => batch.push(msg),
                    _ => break,
                }
            }

            let events: Vec<Event> = batch
                .into_par_iter()
                .filter_map(|res| res.ok())
                .filter_map(|update| parse_update(update.update_oneof.as_ref()?, tx_source))
                .collect();

            if !events.is_empty()
                && let Some(cb) = &ctx.callback
                && let Err(e) = cb.call(events).await
            {
                error!(error = %e, "Batch processing error");
            }
        }

        Ok(())
    }
}

#[derive(Clone)]
struct SubscriptionCtx {
    config: GrpcConfig,
    options: SubscribeOptions,
    callback: Option<BatchEventCallbackWrapper>,
}

fn parse_update(event: &UpdateOneof, tx_source: UpdateSource) -> Option<Event> {
    match event {
        UpdateOneof::BlockMeta(meta) => parse_block_meta(meta),
        UpdateOneof::Slot(slot) => parse_slot(slot),
        UpdateOneof::Transaction(tx) => parse_tx(tx, tx_source),
        UpdateOneof::Account(acc) => parse_account(acc),
        _ => None,
    }
}

fn parse_block_meta(meta: &SubscribeUpdateBlockMeta) -> Option<Event> {
    Some(Event::BlockMeta(BlockMetaEvent {
        slot: meta.slot,
        blockhash: meta.blockhash.clone(),
        block_time: meta.block_time.as_ref().map(|ts| ts.timestamp as u64),
    }))
}

fn parse_slot(slot: &SubscribeUpdateSlot) -> Option<Event> {
    Some(Event::Slot(SlotEvent {
        slot: slot.slot,
        parent: slot.parent,
        status: slot.status,
    }))
}

/// Converts a proto transaction into a pre-resolved [`DecodedMessage`]:
/// Geyser ships the loaded ALT addresses in meta, so the binding
/// `static ++ writable ++ readonly` order is rebuilt here directly.
fn parse_tx(tx: &SubscribeUpdateTransaction, source: UpdateSource) -> Option<Event> {
    let info = tx.transaction.as_ref()?;
    let message = info.transaction.as_ref()?.message.as_ref()?;
    let signature = Signature::try_from(info.signature.as_slice()).ok()?;

    let static_keys: Vec<Pubkey> = message
        .account_keys
        .iter()
        .filter_map(|k| to_pubkey(k))
        .collect();
    if static_keys.len() != message.account_keys.len() {
        return None;
    }

    let meta = info.meta.as_ref();
    let loaded_writable: Vec<Pubkey> = meta
        .map(|m| m.loaded_writable_addresses.iter().filter_map(|k| to_pubkey(k)).collect())
        .unwrap_or_default();
    let loaded_readonly: Vec<Pubkey> = meta
        .map(|m| m.loaded_readonly_addresses.iter().filter_map(|k| to_pubkey(k)).collect())
        .unwrap_or_default();

    let mut account_keys = static_keys.clone();
    account_keys.extend_from_slice(&loaded_writable);
    account_keys.extend_from_slice(&loaded_readonly);

    let header = message.header.as_ref().map(|h| MessageHeader {
        num_required_signatures: h.num_required_signatures as u8,
        num_readonly_signed: h.num_readonly_signed_accounts as u8,
        num_readonly_unsigned: h.num_readonly_unsigned_accounts as u8,
    });

    let instructions: Vec<CompiledIx> = message
        .instructions
        .iter()
        .map(|ix| CompiledIx {
            program_id_index: ix.program_id_index as u8,
            account_indexes: ix.accounts.clone(),
            data: ix.data.clone(),
        })
        .collect();

    let lookups: Vec<AltLookup> = message
        .address_table_lookups
        .iter()
        .filter_map(|lookup| {
            Some(AltLookup {
                table: to_pubkey(&lookup.account_key)?,
                writable_indexes: lookup.writable_indexes.clone(),
                readonly_indexes: lookup.readonly_indexes.clone(),
            })
        })
        .collect();

    let blockhash: [u8; 32] = message.recent_blockhash.as_slice().try_into().ok()?;

    let decoded = DecodedMessage {
        version: if message.versioned {
            MessageVersion::V0
        } else {
            MessageVersion::Legacy
        },
        header: header.unwrap_or_default(),
        static_keys,
        recent_blockhash: Hash::new_from_array(blockhash),
        instructions,
        lookups,
        account_keys,
        alt_misses: Vec::new(),
        resolved: true,
    };

    let tx_meta = meta.map(|m| TxMeta {
        loaded_writable,
        loaded_readonly,
        pre_token_balances: parse_token_balances(&m.pre_token_balances),
        post_token_balances: parse_token_balances(&m.post_token_balances),
    });

    Some(Event::Tx(Box::new(TxUpdate {
        signature,
        slot: tx.slot,
        source,
        message: crate::libs::solana_client::dex::model::MessagePayload::Parsed(decoded),
        meta: tx_meta,
    })))
}

fn parse_token_balances(
    balances: &[yellowstone_grpc_proto::prelude::TokenBalance],
) -> Vec<TokenBalance> {
    balances
        .iter()
        .filter_map(|b| {
            Some(TokenBalance {
                account_index: b.account_index as u8,
                mint: b.mint.parse().ok()?,
                amount: b.ui_token_amount.as_ref()?.amount.parse().ok()?,
            })
        })
        .collect()
}

/// Raw passthrough: ownership/discriminator dispatch happens on the
/// critical worker so cache commits stay single-threaded.
fn parse_account(acc: &SubscribeUpdateAccount) -> Option<Event> {
    let account_info = acc.account.as_ref()?;

    let event = AccountUpdate {
        pubkey: to_pubkey(&account_info.pubkey)?,
        owner: to_pubkey(&account_info.owner)?,
        slot: acc.slot,
        write_version: account_info.write_version,
        data: account_info.data.clone(),
        source: if acc.is_startup {
            UpdateSource::Bootstrap
        } else {
            UpdateSource::Grpc
        },
        txn_signature: account_info
            .txn_signature
            .as_ref()
            .and_then(|s| Signature::try_from(s.as_slice()).ok()),
    };

    Some(Event::Account(Box::new(event)))
}

fn to_pubkey(bytes: &[u8]) -> Option<Pubkey> {
    let arr: [u8; 32] = bytes.try_into().ok()?;
    Some(Pubkey::from(arr))
}
