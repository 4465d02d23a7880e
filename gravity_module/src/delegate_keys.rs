//! Bidirectional index between validator operators, their orchestrator keys and
//! their Ethereum keys. Pure storage, authorization happens in the message server.

use crate::context::Context;
use crate::keeper::{get_json, prefix_json, set_json, Keeper};
use crate::keys::*;
use clarity::Address as EthAddress;
use deep_space::Address as CosmosAddress;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DelegateKeys {
    pub validator: CosmosAddress,
    pub orchestrator: CosmosAddress,
    pub eth_address: EthAddress,
}

impl Keeper {
    /// Binds `orchestrator` to `validator`, replacing any previous orchestrator
    /// of that validator in both directions
    pub fn set_orchestrator_validator(
        &self,
        ctx: &mut Context<'_>,
        validator: &CosmosAddress,
        orchestrator: &CosmosAddress,
    ) {
        if let Some(previous) = self.get_orchestrator_by_validator(ctx, validator) {
            ctx.store_mut()
                .delete(&validator_by_orchestrator_key(&previous));
        }
        let store = ctx.store_mut();
        set_json(store, &validator_by_orchestrator_key(orchestrator), validator);
        set_json(store, &orchestrator_by_validator_key(validator), orchestrator);
    }

    /// the validator operator an orchestrator key acts for
    pub fn get_orchestrator_validator(
        &self,
        ctx: &Context<'_>,
        orchestrator: &CosmosAddress,
    ) -> Option<CosmosAddress> {
        get_json(ctx.store(), &validator_by_orchestrator_key(orchestrator))
    }

    pub fn get_orchestrator_by_validator(
        &self,
        ctx: &Context<'_>,
        validator: &CosmosAddress,
    ) -> Option<CosmosAddress> {
        get_json(ctx.store(), &orchestrator_by_validator_key(validator))
    }

    /// Binds `eth_address` to `validator`, replacing any previous Ethereum
    /// address of that validator in both directions
    pub fn set_eth_address_for_validator(
        &self,
        ctx: &mut Context<'_>,
        validator: &CosmosAddress,
        eth_address: &EthAddress,
    ) {
        if let Some(previous) = self.get_eth_address_by_validator(ctx, validator) {
            ctx.store_mut()
                .delete(&validator_by_eth_address_key(&previous));
        }
        let store = ctx.store_mut();
        set_json(store, &eth_address_by_validator_key(validator), eth_address);
        set_json(store, &validator_by_eth_address_key(eth_address), validator);
    }

    pub fn get_eth_address_by_validator(
        &self,
        ctx: &Context<'_>,
        validator: &CosmosAddress,
    ) -> Option<EthAddress> {
        get_json(ctx.store(), &eth_address_by_validator_key(validator))
    }

    pub fn get_validator_by_eth_address(
        &self,
        ctx: &Context<'_>,
        eth_address: &EthAddress,
    ) -> Option<CosmosAddress> {
        get_json(ctx.store(), &validator_by_eth_address_key(eth_address))
    }

    /// All complete delegate key sets, ordered by validator address bytes
    pub fn get_delegate_keys(&self, ctx: &Context<'_>) -> Vec<DelegateKeys> {
        let mut validators: Vec<CosmosAddress> =
            prefix_json(ctx.store(), VALIDATOR_BY_ETH_ADDRESS_PREFIX);
        validators.sort_by(|a, b| a.get_bytes().cmp(b.get_bytes()));
        let mut out = Vec::new();
        for validator in validators {
            let orchestrator = self.get_orchestrator_by_validator(ctx, &validator);
            let eth_address = self.get_eth_address_by_validator(ctx, &validator);
            if let (Some(orchestrator), Some(eth_address)) = (orchestrator, eth_address) {
                out.push(DelegateKeys {
                    validator,
                    orchestrator,
                    eth_address,
                });
            }
        }
        out
    }
}
