//! The pool of unbatched outgoing transfers. Within a token the pool is ordered by
//! fee and then id, batch building takes from the top.

use crate::context::Context;
use crate::events::GravityEvent;
use crate::keeper::{auto_increment_id, prefix_json, set_json, Keeper, MODULE_NAME};
use crate::keys::*;
use clarity::Address as EthAddress;
use deep_space::{Address as CosmosAddress, Coin};
use gravity_utils::error::{invariant_violation, GravityError};
use gravity_utils::types::{Erc20Token, OutgoingTransferTx};
use num256::Uint256;
use num_traits::CheckedAdd;

/// The fees that would be collected by a batch of a token built right now
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BatchFees {
    pub token: EthAddress,
    pub total_fees: Uint256,
    pub tx_count: u64,
}

impl Keeper {
    /// Takes amount plus fee from `sender` and places a transfer to `destination` in
    /// the pool. Vouchers of Ethereum originated tokens are burned right away, they are
    /// reissued on cancel. Returns the new transfer id.
    pub fn add_to_outgoing_pool(
        &self,
        ctx: &mut Context<'_>,
        sender: &CosmosAddress,
        destination: EthAddress,
        amount: &Coin,
        fee: &Coin,
    ) -> Result<u64, GravityError> {
        if amount.denom != fee.denom {
            return Err(GravityError::InvalidArgument(format!(
                "amount denom {} and fee denom {} differ",
                amount.denom, fee.denom
            )));
        }
        if amount.amount == Uint256::from(0u8) {
            return Err(GravityError::InvalidArgument(
                "can not send zero tokens".to_string(),
            ));
        }
        let (is_cosmos_originated, token_contract) =
            self.denom_to_erc20_lookup(ctx, &amount.denom)?;

        let total = match amount.amount.checked_add(&fee.amount) {
            Some(total) => Coin {
                denom: amount.denom.clone(),
                amount: total,
            },
            None => {
                return Err(GravityError::InvalidArgument(
                    "amount + fee overflows".to_string(),
                ))
            }
        };
        self.bank
            .send_coins_from_account_to_module(ctx, sender, MODULE_NAME, &total)?;
        if !is_cosmos_originated {
            self.bank.burn_coins(ctx, MODULE_NAME, &total)?;
        }

        let id = auto_increment_id(ctx.store_mut(), LAST_TX_POOL_ID_KEY);
        let tx = OutgoingTransferTx {
            id,
            sender: sender.clone(),
            destination,
            erc20_token: Erc20Token::new(amount.amount, token_contract),
            erc20_fee: Erc20Token::new(fee.amount, token_contract),
        };
        if let Err(e) = self.add_unbatched_tx(ctx, &tx) {
            invariant_violation(&format!("fresh pool id {} already in use: {}", id, e));
        }

        let params = self.get_params(ctx);
        ctx.emit(GravityEvent::BridgeWithdrawalReceived {
            bridge_contract: params.bridge_ethereum_address,
            bridge_chain_id: params.bridge_chain_id,
            outgoing_tx_id: id,
        });
        debug!(
            "Added tx {} of {} {} to the pool with fee {}",
            id, amount.amount, amount.denom, fee.amount
        );
        Ok(id)
    }

    /// Removes a transfer the sender still owns from the pool and returns amount
    /// plus fee to them. Transfers that are already batched can not be cancelled.
    pub fn remove_from_outgoing_pool_and_refund(
        &self,
        ctx: &mut Context<'_>,
        tx_id: u64,
        sender: &CosmosAddress,
    ) -> Result<(), GravityError> {
        let tx = match self.get_unbatched_tx_by_id(ctx, tx_id) {
            Some(tx) => tx,
            None => {
                return Err(GravityError::NotFound(format!(
                    "tx {} is not in the pool, it may be in a batch",
                    tx_id
                )))
            }
        };
        if tx.sender != *sender {
            return Err(GravityError::Unauthorized(format!(
                "{} did not send tx {}",
                sender, tx_id
            )));
        }
        let token_contract = tx.token_contract();
        self.remove_unbatched_tx(ctx, &token_contract, tx.erc20_fee.amount, tx_id)?;

        let (is_cosmos_originated, denom) = self.erc20_to_denom_lookup(ctx, &token_contract);
        let refund = Coin {
            denom,
            amount: tx.total(),
        };
        if !is_cosmos_originated {
            self.bank.mint_coins(ctx, MODULE_NAME, &refund)?;
        }
        self.bank
            .send_coins_from_module_to_account(ctx, MODULE_NAME, sender, &refund)?;

        let params = self.get_params(ctx);
        ctx.emit(GravityEvent::BridgeWithdrawCanceled {
            bridge_contract: params.bridge_ethereum_address,
            bridge_chain_id: params.bridge_chain_id,
            sender: sender.clone(),
            tx_id,
        });
        Ok(())
    }

    /// errors if a transfer with the same token, fee and id is already pooled
    pub(crate) fn add_unbatched_tx(
        &self,
        ctx: &mut Context<'_>,
        tx: &OutgoingTransferTx,
    ) -> Result<(), GravityError> {
        let key = outgoing_tx_pool_key(&tx.token_contract(), tx.erc20_fee.amount, tx.id);
        if ctx.store().has(&key) {
            return Err(GravityError::Duplicate(format!("tx {} is already in the pool", tx.id)));
        }
        set_json(ctx.store_mut(), &key, tx);
        Ok(())
    }

    pub(crate) fn remove_unbatched_tx(
        &self,
        ctx: &mut Context<'_>,
        token_contract: &EthAddress,
        fee: Uint256,
        tx_id: u64,
    ) -> Result<(), GravityError> {
        let key = outgoing_tx_pool_key(token_contract, fee, tx_id);
        if !ctx.store().has(&key) {
            return Err(GravityError::NotFound(format!("tx {} is not in the pool", tx_id)));
        }
        ctx.store_mut().delete(&key);
        Ok(())
    }

    pub fn get_unbatched_tx_by_id(&self, ctx: &Context<'_>, tx_id: u64) -> Option<OutgoingTransferTx> {
        self.get_unbatched_txs(ctx).into_iter().find(|tx| tx.id == tx_id)
    }

    /// the pool for one token, highest fee first, ties broken by highest id
    pub fn get_unbatched_txs_by_contract(
        &self,
        ctx: &Context<'_>,
        token_contract: &EthAddress,
    ) -> Vec<OutgoingTransferTx> {
        let mut txs: Vec<OutgoingTransferTx> =
            prefix_json(ctx.store(), &outgoing_tx_pool_token_prefix(token_contract));
        txs.reverse();
        txs
    }

    /// every pooled transfer, grouped by token
    pub fn get_unbatched_txs(&self, ctx: &Context<'_>) -> Vec<OutgoingTransferTx> {
        prefix_json(ctx.store(), OUTGOING_TX_POOL_PREFIX)
    }

    pub fn get_unbatched_txs_by_sender(
        &self,
        ctx: &Context<'_>,
        sender: &CosmosAddress,
    ) -> Vec<OutgoingTransferTx> {
        self.get_unbatched_txs(ctx)
            .into_iter()
            .filter(|tx| tx.sender == *sender)
            .collect()
    }

    /// The fee total of the batch that would be built for a token right now
    pub fn get_batch_fee_by_token_type(
        &self,
        ctx: &Context<'_>,
        token_contract: &EthAddress,
        max_elements: usize,
    ) -> Erc20Token {
        let mut total: Uint256 = 0u8.into();
        for tx in self
            .get_unbatched_txs_by_contract(ctx, token_contract)
            .iter()
            .take(max_elements)
        {
            total += tx.erc20_fee.amount;
        }
        Erc20Token::new(total, *token_contract)
    }

    /// the potential batch fees of every token in the pool, highest total first
    pub fn get_all_batch_fees(&self, ctx: &Context<'_>, max_elements: usize) -> Vec<BatchFees> {
        let mut tokens: Vec<EthAddress> = self
            .get_unbatched_txs(ctx)
            .iter()
            .map(|tx| tx.token_contract())
            .collect();
        tokens.dedup();
        let mut fees: Vec<BatchFees> = tokens
            .into_iter()
            .map(|token| {
                let txs = self.get_unbatched_txs_by_contract(ctx, &token);
                let tx_count = txs.len().min(max_elements) as u64;
                BatchFees {
                    token,
                    total_fees: self.get_batch_fee_by_token_type(ctx, &token, max_elements).amount,
                    tx_count,
                }
            })
            .collect();
        fees.sort_by(|a, b| b.total_fees.cmp(&a.total_fees));
        fees
    }
}
