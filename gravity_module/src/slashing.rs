//! Punishes validators that do not sign what the bridge asks of them. Every kind of
//! signed object has a cursor, objects at or below it have already been evaluated.

use crate::context::Context;
use crate::events::GravityEvent;
use crate::expected_keepers::Validator;
use crate::keeper::{get_u64, set_u64, Keeper};
use crate::keys::*;
use clarity::Address as EthAddress;
use gravity_utils::types::{Confirm, GravityParams, OutgoingLogicCall, OutgoingTxBatch, Valset};

impl Keeper {
    /// Valsets above the slashing cursor whose signing window has passed,
    /// lowest nonce first
    pub fn get_unslashed_valsets(&self, ctx: &Context<'_>, signed_valsets_window: u64) -> Vec<Valset> {
        let last_slashed = self.get_last_slashed_valset_nonce(ctx);
        let height = ctx.block_height();
        self.get_valsets(ctx)
            .into_iter()
            .filter(|vs| vs.nonce > last_slashed && vs.height.saturating_add(signed_valsets_window) <= height)
            .collect()
    }

    /// Batches created after the slashing cursor and below `max_height`, in
    /// creation order
    pub fn get_unslashed_batches(&self, ctx: &Context<'_>, max_height: u64) -> Vec<OutgoingTxBatch> {
        let last_slashed = self.get_last_slashed_batch_block(ctx);
        self.get_outgoing_tx_batches_by_block(ctx)
            .into_iter()
            .filter(|b| b.block_created > last_slashed && b.block_created < max_height)
            .collect()
    }

    /// Logic calls created after the slashing cursor and below `max_height`, in
    /// creation order
    pub fn get_unslashed_logic_calls(&self, ctx: &Context<'_>, max_height: u64) -> Vec<OutgoingLogicCall> {
        let last_slashed = self.get_last_slashed_logic_call_block(ctx);
        let mut calls: Vec<OutgoingLogicCall> = self
            .get_outgoing_logic_calls(ctx)
            .into_iter()
            .filter(|c| c.block_created > last_slashed && c.block_created < max_height)
            .collect();
        calls.sort_by_key(|c| c.block_created);
        calls
    }

    /// Runs every slashing pass, called at the end of each block
    pub fn slashing(&self, ctx: &mut Context<'_>, params: &GravityParams) {
        self.valset_slashing(ctx, params);
        self.batch_slashing(ctx, params);
        self.logic_call_slashing(ctx, params);
    }

    fn valset_slashing(&self, ctx: &mut Context<'_>, params: &GravityParams) {
        for valset in self.get_unslashed_valsets(ctx, params.signed_valsets_window) {
            let signers: Vec<EthAddress> = self
                .get_valset_confirms(ctx, valset.nonce)
                .into_iter()
                .map(|c| c.get_eth_address())
                .collect();

            let mut validators = self.staking.bonded_validators_by_power(ctx);
            // validators that left recently still owe signatures for the valsets
            // created while they were bonded
            for validator in self.staking.unbonding_validators(ctx) {
                if valset.height < validator.unbonding_height
                    && validator.unbonding_height.saturating_add(params.unbond_slashing_valsets_window)
                        > ctx.block_height()
                {
                    validators.push(validator);
                }
            }
            for validator in validators {
                if validator.start_height < valset.height && !self.has_signed(ctx, &validator, &signers) {
                    self.slash_and_jail(
                        ctx,
                        &validator,
                        params.slash_fraction_valset,
                        "valset",
                        valset.nonce,
                    );
                }
            }
            set_u64(ctx.store_mut(), LAST_SLASHED_VALSET_NONCE_KEY, valset.nonce);
        }
    }

    fn batch_slashing(&self, ctx: &mut Context<'_>, params: &GravityParams) {
        // nothing is old enough until the window has passed once
        if ctx.block_height() <= params.signed_batches_window {
            return;
        }
        let max_height = ctx.block_height() - params.signed_batches_window;
        for batch in self.get_unslashed_batches(ctx, max_height) {
            let signers: Vec<EthAddress> = self
                .get_batch_confirms(ctx, &batch.token_contract, batch.nonce)
                .into_iter()
                .map(|c| c.get_eth_address())
                .collect();
            for validator in self.staking.bonded_validators_by_power(ctx) {
                if validator.start_height < batch.block_created && !self.has_signed(ctx, &validator, &signers) {
                    self.slash_and_jail(
                        ctx,
                        &validator,
                        params.slash_fraction_batch,
                        "batch",
                        batch.nonce,
                    );
                }
            }
            set_u64(ctx.store_mut(), LAST_SLASHED_BATCH_BLOCK_KEY, batch.block_created);
        }
    }

    fn logic_call_slashing(&self, ctx: &mut Context<'_>, params: &GravityParams) {
        if ctx.block_height() <= params.signed_logic_calls_window {
            return;
        }
        let max_height = ctx.block_height() - params.signed_logic_calls_window;
        for call in self.get_unslashed_logic_calls(ctx, max_height) {
            let signers: Vec<EthAddress> = self
                .get_logic_call_confirms(ctx, &call.invalidation_id, call.invalidation_nonce)
                .into_iter()
                .map(|c| c.get_eth_address())
                .collect();
            for validator in self.staking.bonded_validators_by_power(ctx) {
                if validator.start_height < call.block_created && !self.has_signed(ctx, &validator, &signers) {
                    self.slash_and_jail(
                        ctx,
                        &validator,
                        params.slash_fraction_logic_call,
                        "logic call",
                        call.invalidation_nonce,
                    );
                }
            }
            set_u64(ctx.store_mut(), LAST_SLASHED_LOGIC_CALL_BLOCK_KEY, call.block_created);
        }
    }

    /// a validator without an Ethereum key can not have signed anything
    fn has_signed(&self, ctx: &Context<'_>, validator: &Validator, signers: &[EthAddress]) -> bool {
        match self.get_eth_address_by_validator(ctx, &validator.operator) {
            Some(eth_address) => signers.contains(&eth_address),
            None => false,
        }
    }

    fn slash_and_jail(
        &self,
        ctx: &mut Context<'_>,
        validator: &Validator,
        fraction_basis_points: u64,
        subject: &str,
        nonce: u64,
    ) {
        warn!(
            "Slashing {} for not signing {} {}",
            validator.operator, subject, nonce
        );
        let height = ctx.block_height();
        self.staking.slash(
            ctx,
            &validator.operator,
            height,
            validator.consensus_power,
            fraction_basis_points,
        );
        if !validator.jailed {
            self.staking.jail(ctx, &validator.operator);
        }
        ctx.emit(GravityEvent::SignatureSlashing {
            subject: subject.to_string(),
            validator: validator.operator.clone(),
            nonce,
        });
    }

    pub fn get_last_slashed_valset_nonce(&self, ctx: &Context<'_>) -> u64 {
        get_u64(ctx.store(), LAST_SLASHED_VALSET_NONCE_KEY).unwrap_or(0)
    }

    pub fn get_last_slashed_batch_block(&self, ctx: &Context<'_>) -> u64 {
        get_u64(ctx.store(), LAST_SLASHED_BATCH_BLOCK_KEY).unwrap_or(0)
    }

    pub fn get_last_slashed_logic_call_block(&self, ctx: &Context<'_>) -> u64 {
        get_u64(ctx.store(), LAST_SLASHED_LOGIC_CALL_BLOCK_KEY).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erc20_mapping::gravity_denom;
    use crate::msg_server::{MsgConfirmBatch, MsgValsetConfirm};
    use crate::test_utils::{cosmos_address, eth_address, sign, TestEnv};
    use deep_space::{Address as CosmosAddress, Coin};
    use ethereum_gravity::message_signatures::EthereumSigned;

    fn short_windows(env: &mut TestEnv) {
        let keeper = &env.keeper;
        let mut ctx = Context::new(&mut env.store, 0);
        let mut params = keeper.get_params(&ctx);
        params.signed_valsets_window = 10;
        params.signed_batches_window = 10;
        params.signed_logic_calls_window = 10;
        params.unbond_slashing_valsets_window = 10;
        keeper.set_params(&mut ctx, &params).unwrap();
    }

    #[test]
    fn test_unslashed_valsets_window_and_cursor() {
        let mut env = TestEnv::new(2);
        let keeper = &env.keeper;
        {
            let mut ctx = Context::new(&mut env.store, 5);
            keeper.set_valset_request(&mut ctx).unwrap();
        }
        {
            let mut ctx = Context::new(&mut env.store, 8);
            keeper.set_valset_request(&mut ctx).unwrap();
        }
        {
            let ctx = Context::new(&mut env.store, 14);
            assert!(keeper.get_unslashed_valsets(&ctx, 10).is_empty());
        }
        {
            let ctx = Context::new(&mut env.store, 18);
            let nonces: Vec<u64> = keeper.get_unslashed_valsets(&ctx, 10).iter().map(|v| v.nonce).collect();
            assert_eq!(nonces, vec![1, 2]);
        }
        {
            // evaluated valsets are never returned again
            let mut ctx = Context::new(&mut env.store, 18);
            let params = keeper.get_params(&ctx);
            keeper.slashing(&mut ctx, &GravityParams {
                signed_valsets_window: 10,
                ..params
            });
            assert_eq!(keeper.get_last_slashed_valset_nonce(&ctx), 2);
            assert!(keeper.get_unslashed_valsets(&ctx, 10).is_empty());
        }
    }

    #[test]
    fn test_valset_slashing_spares_signers_and_late_joiners() {
        let mut env = TestEnv::new(3);
        short_windows(&mut env);
        env.staking.set_start_height(&env.validators[2].operator, 50);
        let keeper = &env.keeper;
        {
            let mut ctx = Context::new(&mut env.store, 5);
            let valset = keeper.set_valset_request(&mut ctx).unwrap();
            let gravity_id = keeper.get_gravity_id(&ctx);
            let signer = &env.validators[0];
            keeper
                .valset_confirm(
                    &mut ctx,
                    &MsgValsetConfirm {
                        nonce: valset.nonce,
                        orchestrator: signer.orchestrator.clone(),
                        eth_address: signer.eth_address,
                        signature: sign(&signer.eth_key, &valset.get_signing_message(&gravity_id)),
                    },
                )
                .unwrap();
        }
        let mut ctx = Context::new(&mut env.store, 15);
        let params = keeper.get_params(&ctx);
        keeper.slashing(&mut ctx, &params);

        let slashes = env.staking.slashes();
        assert_eq!(slashes.len(), 1);
        assert_eq!(slashes[0].operator, env.validators[1].operator);
        assert_eq!(slashes[0].fraction_basis_points, params.slash_fraction_valset);
        assert!(env.staking.is_jailed(&env.validators[1].operator));
        assert!(!env.staking.is_jailed(&env.validators[0].operator));
        assert!(!env.staking.is_jailed(&env.validators[2].operator));

        // a second pass does not punish twice
        keeper.slashing(&mut ctx, &params);
        assert_eq!(env.staking.slashes().len(), 1);
    }

    #[test]
    fn test_unbonding_validators_owe_valset_signatures() {
        let mut env = TestEnv::new(2);
        short_windows(&mut env);
        let keeper = &env.keeper;
        {
            let mut ctx = Context::new(&mut env.store, 5);
            keeper.set_valset_request(&mut ctx).unwrap();
        }
        env.staking.begin_unbonding(&env.validators[1].operator, 8);
        let mut ctx = Context::new(&mut env.store, 15);
        let params = keeper.get_params(&ctx);
        keeper.slashing(&mut ctx, &params);
        let slashed: Vec<CosmosAddress> = env.staking.slashes().into_iter().map(|s| s.operator).collect();
        assert!(slashed.contains(&env.validators[1].operator));
        assert_eq!(slashed.len(), 2);
    }

    #[test]
    fn test_batch_slashing() {
        let mut env = TestEnv::new(2);
        short_windows(&mut env);
        let token = eth_address(10);
        let denom = gravity_denom(&token);
        let sender = cosmos_address(11);
        env.bank.fund_account(&mut env.store, &sender, &denom, 1000);
        let keeper = &env.keeper;
        {
            let mut ctx = Context::new(&mut env.store, 3);
            let coin = |amount: u64| Coin {
                denom: denom.clone(),
                amount: amount.into(),
            };
            keeper
                .add_to_outgoing_pool(&mut ctx, &sender, eth_address(12), &coin(100), &coin(1))
                .unwrap();
            let batch = keeper.build_outgoing_tx_batch(&mut ctx, &token, 10).unwrap();
            let gravity_id = keeper.get_gravity_id(&ctx);
            let signer = &env.validators[1];
            keeper
                .confirm_batch(
                    &mut ctx,
                    &MsgConfirmBatch {
                        nonce: batch.nonce,
                        token_contract: token,
                        eth_signer: signer.eth_address,
                        orchestrator: signer.orchestrator.clone(),
                        signature: sign(&signer.eth_key, &batch.get_signing_message(&gravity_id)),
                    },
                )
                .unwrap();
        }
        {
            // inside the window nothing happens
            let mut ctx = Context::new(&mut env.store, 13);
            let params = keeper.get_params(&ctx);
            keeper.batch_slashing(&mut ctx, &params);
            assert!(env.staking.slashes().is_empty());
        }
        let mut ctx = Context::new(&mut env.store, 14);
        let params = keeper.get_params(&ctx);
        keeper.batch_slashing(&mut ctx, &params);
        let slashes = env.staking.slashes();
        assert_eq!(slashes.len(), 1);
        assert_eq!(slashes[0].operator, env.validators[0].operator);
        assert_eq!(keeper.get_last_slashed_batch_block(&ctx), 3);
    }
}
