//! Validator set snapshots. The Ethereum contract only knows the bridge validators
//! through these, each member's power is normalized so the set sums to u32::MAX.

use crate::context::Context;
use crate::events::GravityEvent;
use crate::keeper::{get_json, get_u64, prefix_json, set_json, set_u64, Keeper};
use crate::keys::*;
use clarity::Address as EthAddress;
use deep_space::Address as CosmosAddress;
use ethereum_gravity::message_signatures::EthereumSigned;
use gravity_utils::error::{invariant_violation, GravityError};
use gravity_utils::num_conversion::downcast_uint256;
use gravity_utils::types::{Valset, ValsetConfirm, ValsetMember, TOTAL_GRAVITY_POWER};
use num256::Uint256;

impl Keeper {
    /// Projects the bonded validator set into a valset with the next nonce,
    /// nothing is stored. Validators without an Ethereum address are left out of
    /// both the member list and the total power.
    pub fn get_current_valset(&self, ctx: &Context<'_>) -> Result<Valset, GravityError> {
        let mut bridge_validators = Vec::new();
        let mut total_power: Uint256 = 0u8.into();
        for validator in self.staking.bonded_validators_by_power(ctx) {
            if let Some(eth_address) = self.get_eth_address_by_validator(ctx, &validator.operator) {
                total_power += Uint256::from(validator.consensus_power);
                bridge_validators.push((validator.consensus_power, eth_address));
            }
        }
        if total_power == Uint256::from(0u8) {
            return Err(GravityError::InvalidBridgeStateError(
                "no bonded validator has an Ethereum address".to_string(),
            ));
        }

        let mut members = Vec::with_capacity(bridge_validators.len());
        for (power, eth_address) in bridge_validators {
            let normalized = Uint256::from(power) * Uint256::from(TOTAL_GRAVITY_POWER) / total_power;
            let power = match downcast_uint256(normalized) {
                Some(p) => p,
                None => invariant_violation("normalized power does not fit in 64 bits"),
            };
            members.push(ValsetMember { power, eth_address });
        }
        members.sort();
        members.reverse();

        let (reward_amount, reward_token) = self.get_valset_reward(ctx);
        Ok(Valset {
            nonce: self.get_latest_valset_nonce(ctx) + 1,
            height: ctx.block_height(),
            members,
            reward_amount,
            reward_token,
        })
    }

    /// The configured relayer reward as an ERC20 amount. A reward that can not be
    /// resolved is skipped for this valset rather than halting valset creation.
    fn get_valset_reward(&self, ctx: &Context<'_>) -> (Uint256, Option<EthAddress>) {
        let reward = match self.get_params(ctx).valset_reward {
            Some(reward) => reward,
            None => return (0u8.into(), None),
        };
        match self.denom_to_erc20_lookup(ctx, &reward.denom) {
            Ok((_, token)) => (reward.amount, Some(token)),
            Err(e) => {
                error!("Invalid valset reward {}, skipping reward: {}", reward.denom, e);
                (0u8.into(), None)
            }
        }
    }

    /// Builds the current valset and stores it as the next official valset
    pub fn set_valset_request(&self, ctx: &mut Context<'_>) -> Result<Valset, GravityError> {
        let valset = self.get_current_valset(ctx)?;
        self.store_valset(ctx, &valset);

        let params = self.get_params(ctx);
        ctx.emit(GravityEvent::MultisigUpdateRequest {
            bridge_contract: params.bridge_ethereum_address,
            bridge_chain_id: params.bridge_chain_id,
            valset_nonce: valset.nonce,
            event_nonce: self.get_last_observed_event_nonce(ctx),
        });
        info!(
            "Created valset {} with {} members",
            valset.nonce,
            valset.members.len()
        );
        Ok(valset)
    }

    /// Stores a valset, advances the latest nonce and records its checkpoint
    pub fn store_valset(&self, ctx: &mut Context<'_>, valset: &Valset) {
        if self.get_valset(ctx, valset.nonce).is_some() {
            invariant_violation(&format!("valset nonce {} reused", valset.nonce));
        }
        set_json(ctx.store_mut(), &valset_key(valset.nonce), valset);
        set_u64(ctx.store_mut(), LATEST_VALSET_NONCE_KEY, valset.nonce);
        let checkpoint = valset.get_checkpoint(&self.get_gravity_id(ctx));
        self.set_past_eth_signature_checkpoint(ctx, &checkpoint);
    }

    pub fn get_valset(&self, ctx: &Context<'_>, nonce: u64) -> Option<Valset> {
        get_json(ctx.store(), &valset_key(nonce))
    }

    /// stored valsets, lowest nonce first
    pub fn get_valsets(&self, ctx: &Context<'_>) -> Vec<Valset> {
        prefix_json(ctx.store(), VALSET_PREFIX)
    }

    pub fn get_latest_valset_nonce(&self, ctx: &Context<'_>) -> u64 {
        get_u64(ctx.store(), LATEST_VALSET_NONCE_KEY).unwrap_or(0)
    }

    pub fn get_latest_valset(&self, ctx: &Context<'_>) -> Option<Valset> {
        self.get_valset(ctx, self.get_latest_valset_nonce(ctx))
    }

    /// Deletes a valset and its confirms, the checkpoint stays recorded
    pub fn delete_valset(&self, ctx: &mut Context<'_>, nonce: u64) {
        let store = ctx.store_mut();
        store.delete(&valset_key(nonce));
        for (key, _) in store.prefix_entries(&valset_confirm_nonce_prefix(nonce)) {
            store.delete(&key);
        }
    }

    /// the last valset the Ethereum contract reported switching to
    pub fn get_last_observed_valset(&self, ctx: &Context<'_>) -> Option<Valset> {
        get_json(ctx.store(), LAST_OBSERVED_VALSET_KEY)
    }

    pub(crate) fn set_last_observed_valset(&self, ctx: &mut Context<'_>, valset: &Valset) {
        set_json(ctx.store_mut(), LAST_OBSERVED_VALSET_KEY, valset);
    }

    pub fn get_last_unbonding_block_height(&self, ctx: &Context<'_>) -> u64 {
        get_u64(ctx.store(), LAST_UNBONDING_BLOCK_HEIGHT_KEY).unwrap_or(0)
    }

    /// Staking hook, a validator leaving means a new valset is needed right away
    pub fn after_validator_begin_unbonding(&self, ctx: &mut Context<'_>, validator: &CosmosAddress) {
        debug!("Validator {} began unbonding", validator);
        let height = ctx.block_height();
        set_u64(ctx.store_mut(), LAST_UNBONDING_BLOCK_HEIGHT_KEY, height);
    }

    pub fn set_valset_confirm(&self, ctx: &mut Context<'_>, confirm: &ValsetConfirm) -> Vec<u8> {
        let key = valset_confirm_key(confirm.nonce, &confirm.orchestrator);
        set_json(ctx.store_mut(), &key, confirm);
        key
    }

    pub fn get_valset_confirm(
        &self,
        ctx: &Context<'_>,
        nonce: u64,
        orchestrator: &CosmosAddress,
    ) -> Option<ValsetConfirm> {
        get_json(ctx.store(), &valset_confirm_key(nonce, orchestrator))
    }

    pub fn get_valset_confirms(&self, ctx: &Context<'_>, nonce: u64) -> Vec<ValsetConfirm> {
        prefix_json(ctx.store(), &valset_confirm_nonce_prefix(nonce))
    }
}
