//! Outgoing transaction batches. A batch takes the highest fee transfers of one
//! token out of the pool, it leaves the store when executed on Ethereum or when a
//! later batch of the same token executes first.

use crate::context::Context;
use crate::events::GravityEvent;
use crate::keeper::{auto_increment_id, get_json, prefix_json, set_json, Keeper};
use crate::keys::*;
use clarity::Address as EthAddress;
use deep_space::Address as CosmosAddress;
use ethereum_gravity::message_signatures::EthereumSigned;
use gravity_utils::error::{invariant_violation, GravityError};
use gravity_utils::types::{BatchConfirm, OutgoingTxBatch};

/// The most transfers a single batch may hold
pub const OUTGOING_TX_BATCH_SIZE: usize = 100;

impl Keeper {
    /// Builds a batch of up to `max_elements` transfers of `token_contract`, it
    /// must collect at least the fees of the latest unexecuted batch for that token
    pub fn build_outgoing_tx_batch(
        &self,
        ctx: &mut Context<'_>,
        token_contract: &EthAddress,
        max_elements: usize,
    ) -> Result<OutgoingTxBatch, GravityError> {
        if max_elements == 0 {
            return Err(GravityError::InvalidArgument(
                "max elements must be greater than zero".to_string(),
            ));
        }
        if let Some(last) = self.get_last_outgoing_batch_by_token_type(ctx, token_contract) {
            let current_fees = self.get_batch_fee_by_token_type(ctx, token_contract, max_elements);
            let last_fees = last.total_fee();
            if last_fees.amount > current_fees.amount {
                return Err(GravityError::NotMoreProfitable(format!(
                    "batch {} collects {} but a new batch would collect {}",
                    last.nonce, last_fees.amount, current_fees.amount
                )));
            }
        }

        let selected: Vec<_> = self
            .get_unbatched_txs_by_contract(ctx, token_contract)
            .into_iter()
            .take(max_elements)
            .collect();
        if selected.is_empty() {
            return Err(GravityError::InvalidArgument(format!(
                "no transactions of {} in the pool",
                token_contract
            )));
        }
        for tx in selected.iter() {
            self.remove_unbatched_tx(ctx, token_contract, tx.erc20_fee.amount, tx.id)?;
        }

        let nonce = auto_increment_id(ctx.store_mut(), LAST_BATCH_NONCE_KEY);
        let batch = OutgoingTxBatch {
            nonce,
            batch_timeout: self.get_batch_timeout_height(ctx),
            transactions: selected,
            token_contract: *token_contract,
            block_created: ctx.block_height(),
        };
        self.store_batch(ctx, &batch);

        let params = self.get_params(ctx);
        let checkpoint = batch.get_checkpoint(&params.gravity_id);
        self.set_past_eth_signature_checkpoint(ctx, &checkpoint);
        ctx.emit(GravityEvent::OutgoingBatch {
            bridge_contract: params.bridge_ethereum_address,
            bridge_chain_id: params.bridge_chain_id,
            batch_nonce: nonce,
            token_contract: *token_contract,
            batch_timeout: batch.batch_timeout,
        });
        info!(
            "Created batch {} of {} with {} transactions",
            nonce,
            token_contract,
            batch.transactions.len()
        );
        Ok(batch)
    }

    /// Projects the current Ethereum height from the last observed one and adds the
    /// target timeout to it. Zero until any Ethereum height has been observed.
    pub fn get_batch_timeout_height(&self, ctx: &Context<'_>) -> u64 {
        let params = self.get_params(ctx);
        let heights = self.get_last_observed_eth_height(ctx);
        if heights.ethereum_block_height == 0 {
            return 0;
        }
        // milliseconds since the last Ethereum height was observed
        let projected_millis = ctx
            .block_height()
            .saturating_sub(heights.cosmos_block_height)
            .saturating_mul(params.average_block_time);
        let projected_current_ethereum_height =
            projected_millis / params.average_ethereum_block_time + heights.ethereum_block_height;
        let blocks_to_add = params.target_batch_timeout / params.average_ethereum_block_time;
        projected_current_ethereum_height + blocks_to_add
    }

    /// Called when a batch executes on Ethereum, every older batch of the token can
    /// no longer execute and is cancelled
    pub fn outgoing_tx_batch_executed(&self, ctx: &mut Context<'_>, token_contract: &EthAddress, nonce: u64) {
        let batch = match self.get_outgoing_tx_batch(ctx, token_contract, nonce) {
            Some(batch) => batch,
            None => {
                info!(
                    "Executed batch {} of {} is not in the store, already cleaned up",
                    nonce, token_contract
                );
                return;
            }
        };
        for older in self.get_outgoing_tx_batches_by_token(ctx, token_contract) {
            if older.nonce < batch.nonce {
                if let Err(e) = self.cancel_outgoing_tx_batch(ctx, token_contract, older.nonce) {
                    invariant_violation(&format!(
                        "failed to cancel batch {} of {}: {}",
                        older.nonce, token_contract, e
                    ));
                }
            }
        }
        self.delete_batch(ctx, &batch);
        info!("Batch {} of {} executed", nonce, token_contract);
    }

    /// Returns every transfer of a batch to the pool and deletes it
    pub fn cancel_outgoing_tx_batch(
        &self,
        ctx: &mut Context<'_>,
        token_contract: &EthAddress,
        nonce: u64,
    ) -> Result<(), GravityError> {
        let batch = match self.get_outgoing_tx_batch(ctx, token_contract, nonce) {
            Some(batch) => batch,
            None => {
                return Err(GravityError::NotFound(format!(
                    "no batch {} of {}",
                    nonce, token_contract
                )))
            }
        };
        for tx in batch.transactions.iter() {
            if let Err(e) = self.add_unbatched_tx(ctx, tx) {
                invariant_violation(&format!(
                    "batched tx {} is also in the pool: {}",
                    tx.id, e
                ));
            }
        }
        self.delete_batch(ctx, &batch);

        let params = self.get_params(ctx);
        ctx.emit(GravityEvent::OutgoingBatchCanceled {
            bridge_contract: params.bridge_ethereum_address,
            bridge_chain_id: params.bridge_chain_id,
            batch_nonce: nonce,
            token_contract: *token_contract,
        });
        Ok(())
    }

    fn store_batch(&self, ctx: &mut Context<'_>, batch: &OutgoingTxBatch) {
        let store = ctx.store_mut();
        set_json(store, &outgoing_batch_key(&batch.token_contract, batch.nonce), batch);
        set_json(
            store,
            &outgoing_batch_by_block_key(batch.block_created, &batch.token_contract, batch.nonce),
            &(batch.token_contract, batch.nonce),
        );
    }

    /// removes a batch along with its index entry and confirms
    fn delete_batch(&self, ctx: &mut Context<'_>, batch: &OutgoingTxBatch) {
        let store = ctx.store_mut();
        store.delete(&outgoing_batch_key(&batch.token_contract, batch.nonce));
        store.delete(&outgoing_batch_by_block_key(
            batch.block_created,
            &batch.token_contract,
            batch.nonce,
        ));
        for (key, _) in store.prefix_entries(&batch_confirm_batch_prefix(&batch.token_contract, batch.nonce)) {
            store.delete(&key);
        }
    }

    pub fn get_outgoing_tx_batch(
        &self,
        ctx: &Context<'_>,
        token_contract: &EthAddress,
        nonce: u64,
    ) -> Option<OutgoingTxBatch> {
        get_json(ctx.store(), &outgoing_batch_key(token_contract, nonce))
    }

    /// batches of one token, lowest nonce first
    pub fn get_outgoing_tx_batches_by_token(
        &self,
        ctx: &Context<'_>,
        token_contract: &EthAddress,
    ) -> Vec<OutgoingTxBatch> {
        prefix_json(ctx.store(), &outgoing_batch_token_prefix(token_contract))
    }

    pub fn get_outgoing_tx_batches(&self, ctx: &Context<'_>) -> Vec<OutgoingTxBatch> {
        prefix_json(ctx.store(), OUTGOING_BATCH_PREFIX)
    }

    /// batches in the order they were created
    pub fn get_outgoing_tx_batches_by_block(&self, ctx: &Context<'_>) -> Vec<OutgoingTxBatch> {
        let index: Vec<(EthAddress, u64)> = prefix_json(ctx.store(), OUTGOING_BATCH_BY_BLOCK_PREFIX);
        index
            .into_iter()
            .map(|(token, nonce)| match self.get_outgoing_tx_batch(ctx, &token, nonce) {
                Some(batch) => batch,
                None => invariant_violation(&format!(
                    "batch index entry {} {} without a batch",
                    token, nonce
                )),
            })
            .collect()
    }

    /// the batch of a token with the highest nonce
    pub fn get_last_outgoing_batch_by_token_type(
        &self,
        ctx: &Context<'_>,
        token_contract: &EthAddress,
    ) -> Option<OutgoingTxBatch> {
        self.get_outgoing_tx_batches_by_token(ctx, token_contract).pop()
    }

    /// Stores a confirm and returns its key
    pub fn set_batch_confirm(&self, ctx: &mut Context<'_>, confirm: &BatchConfirm) -> Vec<u8> {
        let key = batch_confirm_key(&confirm.token_contract, confirm.nonce, &confirm.orchestrator);
        set_json(ctx.store_mut(), &key, confirm);
        key
    }

    pub fn get_batch_confirm(
        &self,
        ctx: &Context<'_>,
        token_contract: &EthAddress,
        nonce: u64,
        orchestrator: &CosmosAddress,
    ) -> Option<BatchConfirm> {
        get_json(ctx.store(), &batch_confirm_key(token_contract, nonce, orchestrator))
    }

    pub fn get_batch_confirms(
        &self,
        ctx: &Context<'_>,
        token_contract: &EthAddress,
        nonce: u64,
    ) -> Vec<BatchConfirm> {
        prefix_json(ctx.store(), &batch_confirm_batch_prefix(token_contract, nonce))
    }

    pub fn set_past_eth_signature_checkpoint(&self, ctx: &mut Context<'_>, checkpoint: &[u8]) {
        ctx.store_mut().set(&past_checkpoint_key(checkpoint), Vec::new());
    }

    /// true if this checkpoint was ever issued for signing
    pub fn get_past_eth_signature_checkpoint(&self, ctx: &Context<'_>, checkpoint: &[u8]) -> bool {
        ctx.store().has(&past_checkpoint_key(checkpoint))
    }
}
