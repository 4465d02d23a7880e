//! The effects an observed attestation has on Cosmos state. Every handler runs in a
//! write set of its own, returning an error rolls back the effects of that single
//! claim while the attestation stays observed.

use crate::attestation::Attestation;
use crate::context::Context;
use crate::events::GravityEvent;
use crate::keeper::{Keeper, MODULE_NAME};
use deep_space::{Address as CosmosAddress, Coin};
use gravity_utils::error::GravityError;
use gravity_utils::types::{
    Erc20DeployedClaim, EthereumClaim, SendToCosmosClaim, Valset, ValsetUpdatedClaim,
};
use num256::Uint256;

/// Applies an observed claim, implement this to replace the default effects
pub trait ClaimHandler {
    fn apply_claim(
        &self,
        ctx: &mut Context<'_>,
        attestation: &Attestation,
        claim: &EthereumClaim,
    ) -> Result<(), GravityError>;
}

/// The default effects of each claim kind
pub struct AttestationHandler<'a> {
    keeper: &'a Keeper,
}

impl<'a> AttestationHandler<'a> {
    pub fn new(keeper: &'a Keeper) -> AttestationHandler<'a> {
        AttestationHandler { keeper }
    }

    fn handle_send_to_cosmos(
        &self,
        ctx: &mut Context<'_>,
        claim: &SendToCosmosClaim,
    ) -> Result<(), GravityError> {
        let keeper = self.keeper;
        let params = keeper.get_params(ctx);
        let (is_cosmos_originated, denom) = keeper.erc20_to_denom_lookup(ctx, &claim.token_contract);
        let coin = Coin {
            denom,
            amount: claim.amount.clone(),
        };

        if !is_cosmos_originated {
            // vouchers are minted on the way in, a supply that would overflow means
            // the token contract is misbehaving and we refuse the whole deposit
            let supply = keeper.bank.get_supply(ctx, &coin.denom);
            let max = Uint256::from_be_bytes(&[0xff; 32]);
            if supply > max - claim.amount.clone() {
                return Err(GravityError::InvalidArgument(format!(
                    "deposit of {} {} would overflow the supply",
                    claim.amount, coin.denom
                )));
            }
            keeper.bank.mint_coins(ctx, MODULE_NAME, &coin)?;
        }

        let receiver: Option<CosmosAddress> = claim.cosmos_receiver.parse().ok();
        let mut delivered = false;
        if params.is_blacklisted(&claim.ethereum_sender) {
            warn!(
                "Deposit from blacklisted address {}, sending to community pool",
                claim.ethereum_sender
            );
        } else if let Some(receiver) = receiver {
            match keeper
                .bank
                .send_coins_from_module_to_account(ctx, MODULE_NAME, &receiver, &coin)
            {
                Ok(()) => delivered = true,
                Err(e) => warn!("Failed to deliver deposit to {}: {}", receiver, e),
            }
        } else {
            warn!(
                "Invalid deposit receiver {}, sending to community pool",
                claim.cosmos_receiver
            );
        }

        if delivered {
            ctx.emit(GravityEvent::SendToCosmos {
                amount: claim.amount.clone(),
                token_contract: claim.token_contract,
                event_nonce: claim.event_nonce,
            });
        } else {
            keeper
                .distribution
                .fund_community_pool_from_module(ctx, MODULE_NAME, &coin)?;
            ctx.emit(GravityEvent::InvalidSendToCosmosReceiver {
                amount: claim.amount.clone(),
                token_contract: claim.token_contract,
                ethereum_sender: claim.ethereum_sender,
                event_nonce: claim.event_nonce,
            });
        }
        Ok(())
    }

    /// Binds a Cosmos denom to the ERC20 deployed for it, provided the token
    /// matches the denom's metadata exactly
    fn handle_erc20_deployed(
        &self,
        ctx: &mut Context<'_>,
        claim: &Erc20DeployedClaim,
    ) -> Result<(), GravityError> {
        let keeper = self.keeper;
        if let Some(existing) = keeper.get_cosmos_originated_erc20(ctx, &claim.cosmos_denom) {
            return Err(GravityError::Duplicate(format!(
                "ERC20 {} already exists for denom {}",
                existing, claim.cosmos_denom
            )));
        }
        if let Some(existing) = keeper.get_cosmos_originated_denom(ctx, &claim.token_contract) {
            return Err(GravityError::Duplicate(format!(
                "ERC20 {} is already the representation of {}",
                claim.token_contract, existing
            )));
        }

        let metadata = match keeper.bank.get_denom_metadata(ctx, &claim.cosmos_denom) {
            Some(m) if !m.base.is_empty() => m,
            _ => {
                return Err(GravityError::NotFound(format!(
                    "no denom metadata for {}",
                    claim.cosmos_denom
                )))
            }
        };
        if claim.name != metadata.name {
            return Err(GravityError::InvalidArgument(format!(
                "ERC20 name {} does not match denom name {}",
                claim.name, metadata.name
            )));
        }
        if claim.symbol != metadata.symbol {
            return Err(GravityError::InvalidArgument(format!(
                "ERC20 symbol {} does not match denom symbol {}",
                claim.symbol, metadata.symbol
            )));
        }
        // the display unit determines the number of decimals
        let decimals = metadata
            .denom_units
            .iter()
            .find(|unit| unit.denom == metadata.display)
            .map(|unit| unit.exponent as u64);
        if decimals != Some(claim.decimals) {
            return Err(GravityError::InvalidArgument(format!(
                "ERC20 decimals {} do not match denom decimals {:?}",
                claim.decimals, decimals
            )));
        }

        keeper.set_cosmos_originated_denom_to_erc20(ctx, &claim.cosmos_denom, &claim.token_contract);
        info!(
            "Registered {} as the representation of {}",
            claim.token_contract, claim.cosmos_denom
        );
        Ok(())
    }

    fn handle_valset_updated(
        &self,
        ctx: &mut Context<'_>,
        claim: &ValsetUpdatedClaim,
    ) -> Result<(), GravityError> {
        let keeper = self.keeper;
        keeper.set_last_observed_valset(
            ctx,
            &Valset {
                nonce: claim.valset_nonce,
                height: 0,
                members: claim.members.clone(),
                reward_amount: claim.reward_amount.clone(),
                reward_token: claim.reward_token,
            },
        );

        if claim.reward_amount == Uint256::from(0u8) {
            return Ok(());
        }
        let reward_token = match claim.reward_token {
            Some(token) if token != clarity::constants::zero_address() => token,
            _ => return Ok(()),
        };
        // the reward was paid out on Ethereum from tokens locked in the bridge, the
        // matching Cosmos side amount has to be reissued to keep supply in sync
        let (is_cosmos_originated, denom) = keeper.erc20_to_denom_lookup(ctx, &reward_token);
        // an error here would also roll back the observed valset above
        if !is_cosmos_originated {
            error!(
                "Ethereum originated token {} can not be a valset reward, valset {} has no reward reissued",
                reward_token, claim.valset_nonce
            );
            return Ok(());
        }
        keeper
            .bank
            .mint_coins(
                ctx,
                MODULE_NAME,
                &Coin {
                    denom,
                    amount: claim.reward_amount.clone(),
                },
            )
            .map_err(|e| {
                GravityError::ClaimHandlerError(format!(
                    "unable to reissue reward for valset {}: {}",
                    claim.valset_nonce, e
                ))
            })
    }
}

impl ClaimHandler for AttestationHandler<'_> {
    fn apply_claim(
        &self,
        ctx: &mut Context<'_>,
        _attestation: &Attestation,
        claim: &EthereumClaim,
    ) -> Result<(), GravityError> {
        match claim {
            EthereumClaim::SendToCosmos(c) => self.handle_send_to_cosmos(ctx, c),
            EthereumClaim::BatchSendToEth(c) => {
                self.keeper
                    .outgoing_tx_batch_executed(ctx, &c.token_contract, c.batch_nonce);
                Ok(())
            }
            EthereumClaim::Erc20Deployed(c) => self.handle_erc20_deployed(ctx, c),
            EthereumClaim::LogicCallExecuted(c) => {
                self.keeper
                    .outgoing_logic_call_executed(ctx, &c.invalidation_id, c.invalidation_nonce);
                Ok(())
            }
            EthereumClaim::ValsetUpdated(c) => self.handle_valset_updated(ctx, c),
        }
    }
}
