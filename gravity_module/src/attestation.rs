//! Aggregates validator votes on Ethereum events and applies each agreed upon event
//! exactly once, in event nonce order.

use crate::attestation_handler::{AttestationHandler, ClaimHandler};
use crate::context::Context;
use crate::events::GravityEvent;
use crate::keeper::{get_json, get_u64, prefix_json, set_json, set_u64, Keeper};
use crate::keys::*;
use deep_space::Address as CosmosAddress;
use gravity_utils::error::{invariant_violation, GravityError};
use gravity_utils::types::EthereumClaim;

/// Percentage of the total bonded power that has to vote for a claim
pub const ATTESTATION_VOTES_POWER_THRESHOLD: u64 = 66;

/// All votes for one (event nonce, claim hash) pair
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Attestation {
    pub observed: bool,
    /// validator operators that voted, each at most once
    pub votes: Vec<CosmosAddress>,
    /// Cosmos height the first vote was received at
    pub height: u64,
    /// the claim as submitted by the first voter
    pub claim: EthereumClaim,
}

/// The last Ethereum height an observed event happened at, along with the
/// Cosmos height it was observed at
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LastObservedEthereumHeight {
    pub cosmos_block_height: u64,
    pub ethereum_block_height: u64,
}

/// ceil(total * 66 / 100)
pub fn required_power(total_power: u64) -> u64 {
    let scaled = total_power as u128 * ATTESTATION_VOTES_POWER_THRESHOLD as u128;
    ((scaled + 99) / 100) as u64
}

impl Keeper {
    /// Records the claimer's vote and evaluates the attestation if it is the next
    /// one waiting to be observed. The claim must come from a registered orchestrator.
    pub fn submit_claim(
        &self,
        ctx: &mut Context<'_>,
        claim: &EthereumClaim,
    ) -> Result<Attestation, GravityError> {
        let mut att = self.attest(ctx, claim)?;
        let claim_hash = claim.claim_hash();
        ctx.emit(GravityEvent::Claim {
            claim_type: claim.get_type(),
            attestation_id: attestation_key(claim.get_event_nonce(), &claim_hash),
            claim_hash,
        });
        if self.get_params(ctx).bridge_active
            && claim.get_event_nonce() == self.get_last_observed_event_nonce(ctx) + 1
        {
            self.try_attestation(ctx, &mut att);
        }
        Ok(att)
    }

    /// Adds a vote without evaluating it
    pub fn attest(
        &self,
        ctx: &mut Context<'_>,
        claim: &EthereumClaim,
    ) -> Result<Attestation, GravityError> {
        let validator = match self.get_orchestrator_validator(ctx, claim.get_claimer()) {
            Some(v) => v,
            None => invariant_violation(&format!(
                "claim from {} which has no validator, should be checked by now",
                claim.get_claimer()
            )),
        };

        // A validator must submit every event in order, this lets an honest validator
        // retry safely and keeps one validator from voting twice for the same nonce
        let last_event_nonce = self.get_last_event_nonce_by_validator(ctx, &validator);
        if claim.get_event_nonce() != last_event_nonce + 1 {
            return Err(GravityError::NonContiguousEventNonce {
                expected: last_event_nonce + 1,
                actual: claim.get_event_nonce(),
            });
        }

        let event_nonce = claim.get_event_nonce();
        let claim_hash = claim.claim_hash();
        let mut att = self
            .get_attestation(ctx, event_nonce, &claim_hash)
            .unwrap_or_else(|| Attestation {
                observed: false,
                votes: Vec::new(),
                height: ctx.block_height(),
                claim: claim.clone(),
            });
        if !att.votes.contains(&validator) {
            att.votes.push(validator.clone());
        }
        self.set_attestation(ctx, event_nonce, &claim_hash, &att);
        self.set_last_event_nonce_by_validator(ctx, &validator, event_nonce);
        Ok(att)
    }

    /// Sums the current power of the voters and observes the attestation once it
    /// passes the threshold. Must only be called for the next unobserved nonce.
    pub fn try_attestation(&self, ctx: &mut Context<'_>, att: &mut Attestation) {
        if att.observed {
            invariant_violation("attempting to process observed attestation");
        }
        let total_power = self.staking.last_total_power(ctx);
        if total_power == 0 {
            return;
        }
        let required = required_power(total_power);
        let mut attestation_power = 0u64;
        for voter in att.votes.iter() {
            if let Some(validator) = self.staking.validator(ctx, voter) {
                if validator.is_bonded() {
                    attestation_power += validator.consensus_power;
                }
            }
        }
        if attestation_power < required {
            trace!(
                "Attestation for nonce {} has {}/{} power",
                att.claim.get_event_nonce(),
                attestation_power,
                required
            );
            return;
        }

        let claim = att.claim.clone();
        let event_nonce = claim.get_event_nonce();
        let last_event_nonce = self.get_last_observed_event_nonce(ctx);
        if event_nonce != last_event_nonce + 1 {
            invariant_violation("attempting to apply events to state out of order");
        }
        self.set_last_observed_event_nonce(ctx, event_nonce);
        self.set_last_observed_eth_height(
            ctx,
            LastObservedEthereumHeight {
                cosmos_block_height: ctx.block_height(),
                ethereum_block_height: claim.get_eth_block_height(),
            },
        );
        att.observed = true;
        let claim_hash = claim.claim_hash();
        self.set_attestation(ctx, event_nonce, &claim_hash, att);

        self.process_attestation(ctx, att, &claim);

        let params = self.get_params(ctx);
        info!(
            "Observed {} with event nonce {}",
            claim.get_type(),
            event_nonce
        );
        ctx.emit(GravityEvent::Observation {
            attestation_type: claim.get_type(),
            bridge_contract: params.bridge_ethereum_address,
            bridge_chain_id: params.bridge_chain_id,
            attestation_id: attestation_key(event_nonce, &claim_hash),
            nonce: event_nonce,
        });
    }

    /// Applies the claim's effects in a staged write set, a failing handler only
    /// loses its own writes, the observation itself stands
    fn process_attestation(&self, ctx: &mut Context<'_>, att: &Attestation, claim: &EthereumClaim) {
        let res = ctx.with_write_set(|staged| match self.custom_claim_handler() {
            Some(handler) => handler.apply_claim(staged, att, claim),
            None => AttestationHandler::new(self).apply_claim(staged, att, claim),
        });
        if let Err(e) = res {
            error!(
                "attestation failed cause {} claim type {} id {:?} nonce {}",
                e,
                claim.get_type(),
                attestation_key(claim.get_event_nonce(), &claim.claim_hash()),
                claim.get_event_nonce()
            );
        }
    }

    /// Walks unobserved attestations in nonce order, evaluating only the one after
    /// the last observed nonce, until no further attestation passes
    pub fn attestation_tally(&self, ctx: &mut Context<'_>) {
        if !self.get_params(ctx).bridge_active {
            return;
        }
        loop {
            let next_nonce = self.get_last_observed_event_nonce(ctx) + 1;
            let attestations = self.get_attestations_by_nonce(ctx, next_nonce);
            if attestations.is_empty() {
                return;
            }
            for mut att in attestations {
                // once one attestation at this nonce is observed the rest are skipped
                if self.get_last_observed_event_nonce(ctx) + 1 == next_nonce {
                    self.try_attestation(ctx, &mut att);
                }
            }
            if self.get_last_observed_event_nonce(ctx) < next_nonce {
                return;
            }
        }
    }

    pub fn get_attestation(
        &self,
        ctx: &Context<'_>,
        event_nonce: u64,
        claim_hash: &[u8],
    ) -> Option<Attestation> {
        get_json(ctx.store(), &attestation_key(event_nonce, claim_hash))
    }

    fn set_attestation(
        &self,
        ctx: &mut Context<'_>,
        event_nonce: u64,
        claim_hash: &[u8],
        att: &Attestation,
    ) {
        set_json(ctx.store_mut(), &attestation_key(event_nonce, claim_hash), att);
    }

    /// every attestation at a nonce, there is more than one if validators disagree
    pub fn get_attestations_by_nonce(&self, ctx: &Context<'_>, event_nonce: u64) -> Vec<Attestation> {
        prefix_json(ctx.store(), &attestation_nonce_prefix(event_nonce))
    }

    /// all attestations, ascending by event nonce
    pub fn get_attestations(&self, ctx: &Context<'_>) -> Vec<Attestation> {
        prefix_json(ctx.store(), ATTESTATION_PREFIX)
    }

    pub fn get_last_observed_event_nonce(&self, ctx: &Context<'_>) -> u64 {
        get_u64(ctx.store(), LAST_OBSERVED_EVENT_NONCE_KEY).unwrap_or(0)
    }

    fn set_last_observed_event_nonce(&self, ctx: &mut Context<'_>, nonce: u64) {
        set_u64(ctx.store_mut(), LAST_OBSERVED_EVENT_NONCE_KEY, nonce);
    }

    pub fn get_last_observed_eth_height(&self, ctx: &Context<'_>) -> LastObservedEthereumHeight {
        get_json(ctx.store(), LAST_OBSERVED_ETHEREUM_HEIGHT_KEY).unwrap_or_default()
    }

    fn set_last_observed_eth_height(&self, ctx: &mut Context<'_>, height: LastObservedEthereumHeight) {
        set_json(ctx.store_mut(), LAST_OBSERVED_ETHEREUM_HEIGHT_KEY, &height);
    }

    /// The last event nonce a validator voted on. A validator that never voted starts
    /// just behind the last observed nonce so it does not have to replay history.
    pub fn get_last_event_nonce_by_validator(&self, ctx: &Context<'_>, validator: &CosmosAddress) -> u64 {
        match get_u64(ctx.store(), &last_event_nonce_by_validator_key(validator)) {
            Some(nonce) => nonce,
            None => self.get_last_observed_event_nonce(ctx).saturating_sub(1),
        }
    }

    fn set_last_event_nonce_by_validator(
        &self,
        ctx: &mut Context<'_>,
        validator: &CosmosAddress,
        nonce: u64,
    ) {
        set_u64(ctx.store_mut(), &last_event_nonce_by_validator_key(validator), nonce);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erc20_mapping::gravity_denom;
    use crate::test_utils::{cosmos_address, deposit_claim, eth_address, TestEnv};
    use num256::Uint256;

    #[test]
    fn test_required_power() {
        assert_eq!(required_power(0), 0);
        assert_eq!(required_power(3), 2);
        assert_eq!(required_power(10), 7);
        assert_eq!(required_power(100), 66);
        assert_eq!(required_power(u64::MAX), (u64::MAX as u128 * 66 / 100 + 1) as u64);
    }

    #[test]
    fn test_event_nonce_must_be_contiguous() {
        let mut env = TestEnv::new(3);
        let keeper = &env.keeper;
        let mut ctx = Context::new(&mut env.store, 10);
        let orch = env.validators[0].orchestrator.clone();
        let token = eth_address(30);
        let receiver = cosmos_address(31).to_string();

        match keeper.submit_claim(&mut ctx, &deposit_claim(2, &orch, token, 5, &receiver)) {
            Err(GravityError::NonContiguousEventNonce { expected: 1, actual: 2 }) => {}
            other => panic!("expected non contiguous nonce, got {:?}", other),
        }
        assert!(keeper.get_attestations(&ctx).is_empty());
        assert_eq!(keeper.get_last_event_nonce_by_validator(&ctx, &env.validators[0].operator), 0);

        keeper
            .submit_claim(&mut ctx, &deposit_claim(1, &orch, token, 5, &receiver))
            .unwrap();
        assert_eq!(keeper.get_last_event_nonce_by_validator(&ctx, &env.validators[0].operator), 1);
        // a retry of the same nonce is refused rather than counted twice
        assert!(keeper
            .submit_claim(&mut ctx, &deposit_claim(1, &orch, token, 5, &receiver))
            .is_err());
        let att = keeper.get_attestations_by_nonce(&ctx, 1);
        assert_eq!(att.len(), 1);
        assert_eq!(att[0].votes, vec![env.validators[0].operator.clone()]);
    }

    #[test]
    fn test_observed_once_at_threshold() {
        let mut env = TestEnv::new(3);
        let keeper = &env.keeper;
        let mut ctx = Context::new(&mut env.store, 10);
        let token = eth_address(30);
        let receiver = cosmos_address(31);
        let denom = gravity_denom(&token);

        let first = keeper
            .submit_claim(
                &mut ctx,
                &deposit_claim(1, &env.validators[0].orchestrator, token, 5, &receiver.to_string()),
            )
            .unwrap();
        assert!(!first.observed);
        assert_eq!(keeper.get_last_observed_event_nonce(&ctx), 0);

        // 20 of 30 power reaches ceil(30 * 0.66)
        let second = keeper
            .submit_claim(
                &mut ctx,
                &deposit_claim(1, &env.validators[1].orchestrator, token, 5, &receiver.to_string()),
            )
            .unwrap();
        assert!(second.observed);
        assert_eq!(keeper.get_last_observed_event_nonce(&ctx), 1);
        assert_eq!(
            keeper.get_last_observed_eth_height(&ctx),
            LastObservedEthereumHeight {
                cosmos_block_height: 10,
                ethereum_block_height: 501,
            }
        );
        assert_eq!(env.bank.balance(&ctx, &receiver, &denom), Uint256::from(5u8));

        // a late vote is recorded but the claim is not applied again
        let third = keeper
            .submit_claim(
                &mut ctx,
                &deposit_claim(1, &env.validators[2].orchestrator, token, 5, &receiver.to_string()),
            )
            .unwrap();
        assert!(third.observed);
        assert_eq!(third.votes.len(), 3);
        assert_eq!(env.bank.balance(&ctx, &receiver, &denom), Uint256::from(5u8));
        let observations = ctx
            .events()
            .iter()
            .filter(|e| matches!(e, GravityEvent::Observation { .. }))
            .count();
        assert_eq!(observations, 1);
    }

    #[test]
    fn test_conflicting_claims() {
        let mut env = TestEnv::new(3);
        let keeper = &env.keeper;
        let mut ctx = Context::new(&mut env.store, 10);
        let token = eth_address(30);
        let receiver = cosmos_address(31).to_string();

        keeper
            .submit_claim(&mut ctx, &deposit_claim(1, &env.validators[0].orchestrator, token, 999, &receiver))
            .unwrap();
        for v in env.validators[1..].iter() {
            keeper
                .submit_claim(&mut ctx, &deposit_claim(1, &v.orchestrator, token, 5, &receiver))
                .unwrap();
        }
        let attestations = keeper.get_attestations_by_nonce(&ctx, 1);
        assert_eq!(attestations.len(), 2);
        assert_eq!(attestations.iter().filter(|a| a.observed).count(), 1);
        keeper.attestation_tally(&mut ctx);
        assert_eq!(keeper.get_last_observed_event_nonce(&ctx), 1);
        assert_eq!(
            keeper.get_attestations_by_nonce(&ctx, 1).iter().filter(|a| a.observed).count(),
            1
        );
    }

    #[test]
    fn test_tally_observes_in_order_after_power_change() {
        let mut env = TestEnv::new(3);
        let keeper = &env.keeper;
        let mut ctx = Context::new(&mut env.store, 10);
        let token = eth_address(30);
        let receiver = cosmos_address(31).to_string();
        let orch = env.validators[0].orchestrator.clone();

        keeper
            .submit_claim(&mut ctx, &deposit_claim(1, &orch, token, 5, &receiver))
            .unwrap();
        keeper
            .submit_claim(&mut ctx, &deposit_claim(2, &orch, token, 6, &receiver))
            .unwrap();
        keeper.attestation_tally(&mut ctx);
        assert_eq!(keeper.get_last_observed_event_nonce(&ctx), 0);

        env.staking.set_power(&env.validators[0].operator, 50);
        keeper.attestation_tally(&mut ctx);
        assert_eq!(keeper.get_last_observed_event_nonce(&ctx), 2);
        let nonces: Vec<u64> = ctx
            .events()
            .iter()
            .filter_map(|e| match e {
                GravityEvent::Observation { nonce, .. } => Some(*nonce),
                _ => None,
            })
            .collect();
        assert_eq!(nonces, vec![1, 2]);
    }

    #[test]
    fn test_halted_bridge_does_not_observe() {
        let mut env = TestEnv::new(3);
        let keeper = &env.keeper;
        let mut ctx = Context::new(&mut env.store, 10);
        let mut params = keeper.get_params(&ctx);
        params.bridge_active = false;
        keeper.set_params(&mut ctx, &params).unwrap();
        let token = eth_address(30);
        let receiver = cosmos_address(31).to_string();

        for v in env.validators.iter() {
            keeper
                .submit_claim(&mut ctx, &deposit_claim(1, &v.orchestrator, token, 5, &receiver))
                .unwrap();
        }
        keeper.attestation_tally(&mut ctx);
        assert_eq!(keeper.get_last_observed_event_nonce(&ctx), 0);

        params.bridge_active = true;
        keeper.set_params(&mut ctx, &params).unwrap();
        keeper.attestation_tally(&mut ctx);
        assert_eq!(keeper.get_last_observed_event_nonce(&ctx), 1);
    }

    #[test]
    fn test_new_validator_starts_behind_last_observed() {
        let mut env = TestEnv::new(2);
        let token = eth_address(30);
        let receiver = cosmos_address(31).to_string();
        {
            let keeper = &env.keeper;
            let mut ctx = Context::new(&mut env.store, 10);
            for nonce in 1..=3 {
                for v in env.validators.iter() {
                    keeper
                        .submit_claim(&mut ctx, &deposit_claim(nonce, &v.orchestrator, token, 5, &receiver))
                        .unwrap();
                }
            }
            assert_eq!(keeper.get_last_observed_event_nonce(&ctx), 3);
        }
        let index = env.register_validator(40, 10);
        let operator = env.validators[index].operator.clone();
        let orch = env.validators[index].orchestrator.clone();
        let keeper = &env.keeper;
        let mut ctx = Context::new(&mut env.store, 11);
        assert_eq!(keeper.get_last_event_nonce_by_validator(&ctx, &operator), 2);
        assert!(keeper
            .submit_claim(&mut ctx, &deposit_claim(1, &orch, token, 5, &receiver))
            .is_err());
        keeper
            .submit_claim(&mut ctx, &deposit_claim(3, &orch, token, 5, &receiver))
            .unwrap();
        keeper
            .submit_claim(&mut ctx, &deposit_claim(4, &orch, token, 5, &receiver))
            .unwrap();
    }

    #[test]
    #[should_panic]
    fn test_unregistered_claimer_is_fatal() {
        let mut env = TestEnv::new(1);
        let keeper = &env.keeper;
        let mut ctx = Context::new(&mut env.store, 10);
        let claim = deposit_claim(1, &cosmos_address(45), eth_address(30), 5, "nobody");
        let _ = keeper.submit_claim(&mut ctx, &claim);
    }
}
