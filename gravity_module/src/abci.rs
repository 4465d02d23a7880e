//! Work done at the end of every block, in order: slashing, the attestation tally,
//! timeouts, valset creation and valset pruning.

use crate::context::Context;
use crate::keeper::Keeper;
use gravity_utils::types::{GravityParams, SIGNIFICANT_POWER_DIFF};

impl Keeper {
    pub fn end_blocker(&self, ctx: &mut Context<'_>) {
        let params = self.get_params(ctx);
        self.slashing(ctx, &params);
        self.attestation_tally(ctx);
        self.cleanup_timed_out_batches(ctx);
        self.cleanup_timed_out_logic_calls(ctx);
        self.create_valsets(ctx);
        self.prune_valsets(ctx, &params);
    }

    /// Batches whose timeout is below the last observed Ethereum height can never
    /// execute, their transactions go back to the pool
    fn cleanup_timed_out_batches(&self, ctx: &mut Context<'_>) {
        let ethereum_height = self.get_last_observed_eth_height(ctx).ethereum_block_height;
        for batch in self.get_outgoing_tx_batches(ctx) {
            if batch.batch_timeout < ethereum_height {
                info!(
                    "Batch {} of {} timed out at {}",
                    batch.nonce, batch.token_contract, batch.batch_timeout
                );
                if let Err(e) = self.cancel_outgoing_tx_batch(ctx, &batch.token_contract, batch.nonce) {
                    error!("Failed to cancel timed out batch {}: {}", batch.nonce, e);
                }
            }
        }
    }

    fn cleanup_timed_out_logic_calls(&self, ctx: &mut Context<'_>) {
        let ethereum_height = self.get_last_observed_eth_height(ctx).ethereum_block_height;
        for call in self.get_outgoing_logic_calls(ctx) {
            if call.timeout < ethereum_height {
                if let Err(e) =
                    self.cancel_outgoing_logic_call(ctx, &call.invalidation_id, call.invalidation_nonce)
                {
                    error!("Failed to cancel timed out logic call: {}", e);
                }
            }
        }
    }

    /// A new valset is needed when there is none yet, when a validator started
    /// unbonding this block or when power has shifted significantly
    fn create_valsets(&self, ctx: &mut Context<'_>) {
        let latest = self.get_latest_valset(ctx);
        let unbonding_now = self.get_last_unbonding_block_height(ctx) == ctx.block_height();
        let significant_change = match &latest {
            Some(latest) => match self.get_current_valset(ctx) {
                Ok(current) => current.power_diff(latest) > SIGNIFICANT_POWER_DIFF,
                Err(_) => false,
            },
            None => false,
        };
        if latest.is_none() || unbonding_now || significant_change {
            if let Err(e) = self.set_valset_request(ctx) {
                warn!("Could not create a valset: {}", e);
            }
        }
    }

    /// Valsets older than the last observed one can no longer be submitted, once
    /// the signing window has passed they are removed along with their confirms
    fn prune_valsets(&self, ctx: &mut Context<'_>, params: &GravityParams) {
        let last_observed = match self.get_last_observed_valset(ctx) {
            Some(v) => v,
            None => return,
        };
        if ctx.block_height() < params.signed_valsets_window {
            return;
        }
        let earliest_to_prune = ctx.block_height() - params.signed_valsets_window;
        for valset in self.get_valsets(ctx) {
            if valset.nonce < last_observed.nonce && valset.height < earliest_to_prune {
                trace!("Pruning valset {}", valset.nonce);
                self.delete_valset(ctx, valset.nonce);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erc20_mapping::gravity_denom;
    use crate::test_utils::{cosmos_address, deposit_claim, eth_address, TestEnv};
    use deep_space::Coin;

    #[test]
    fn test_valset_creation_triggers() {
        let mut env = TestEnv::new(3);
        let keeper = &env.keeper;
        {
            let mut ctx = Context::new(&mut env.store, 1);
            keeper.end_blocker(&mut ctx);
            assert_eq!(keeper.get_latest_valset_nonce(&ctx), 1);
        }
        {
            // nothing changed
            let mut ctx = Context::new(&mut env.store, 2);
            keeper.end_blocker(&mut ctx);
            assert_eq!(keeper.get_latest_valset_nonce(&ctx), 1);
        }
        {
            // a shift well above five percent
            env.staking.set_power(&env.validators[0].operator, 20);
            let mut ctx = Context::new(&mut env.store, 3);
            keeper.end_blocker(&mut ctx);
            assert_eq!(keeper.get_latest_valset_nonce(&ctx), 2);
        }
        {
            let mut ctx = Context::new(&mut env.store, 4);
            keeper.after_validator_begin_unbonding(&mut ctx, &env.validators[2].operator);
            keeper.end_blocker(&mut ctx);
            assert_eq!(keeper.get_latest_valset_nonce(&ctx), 3);
        }
    }

    #[test]
    fn test_timed_out_batch_returns_to_pool() {
        let mut env = TestEnv::new(3);
        let token = eth_address(60);
        let denom = gravity_denom(&token);
        let sender = cosmos_address(61);
        env.bank.fund_account(&mut env.store, &sender, &denom, 100);
        let keeper = &env.keeper;
        let mut ctx = Context::new(&mut env.store, 5);
        let coin = |amount: u64| Coin {
            denom: denom.clone(),
            amount: amount.into(),
        };
        keeper
            .add_to_outgoing_pool(&mut ctx, &sender, eth_address(62), &coin(50), &coin(2))
            .unwrap();
        // nothing observed yet, so the batch times out as soon as anything is
        let batch = keeper.build_outgoing_tx_batch(&mut ctx, &token, 10).unwrap();
        assert_eq!(batch.batch_timeout, 0);
        assert!(keeper.get_unbatched_txs(&ctx).is_empty());

        for v in env.validators.iter().take(2) {
            let claim = deposit_claim(1, &v.orchestrator, token, 5, &cosmos_address(70).to_string());
            keeper.submit_claim(&mut ctx, &claim).unwrap();
        }
        assert_eq!(keeper.get_last_observed_eth_height(&ctx).ethereum_block_height, 501);

        keeper.end_blocker(&mut ctx);
        assert!(keeper.get_outgoing_tx_batches(&ctx).is_empty());
        assert_eq!(keeper.get_unbatched_txs(&ctx).len(), 1);
    }
}
