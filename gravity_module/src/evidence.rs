//! Evidence that a validator signed something the bridge never produced. Signing a
//! checkpoint that was issued is always allowed, even after the object is gone, so
//! only checkpoints outside the past checkpoint set can be evidence.

use crate::context::Context;
use crate::events::GravityEvent;
use crate::keeper::Keeper;
use crate::keys::bad_signature_evidence_key;
use deep_space::Address as CosmosAddress;
use ethereum_gravity::message_signatures::EthereumSigned;
use ethereum_gravity::signatures::{signature_from_bytes, signature_to_eth_address};
use gravity_utils::error::GravityError;
use gravity_utils::types::{OutgoingLogicCall, OutgoingTxBatch, Valset};
use sha3::{Digest, Keccak256};

/// The object an accused signature is claimed to be over
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum BadSignatureEvidence {
    Valset(Valset),
    Batch(OutgoingTxBatch),
    LogicCall(OutgoingLogicCall),
}

impl BadSignatureEvidence {
    pub fn get_checkpoint(&self, gravity_id: &str) -> Vec<u8> {
        match self {
            BadSignatureEvidence::Valset(v) => v.get_checkpoint(gravity_id),
            BadSignatureEvidence::Batch(b) => b.get_checkpoint(gravity_id),
            BadSignatureEvidence::LogicCall(l) => l.get_checkpoint(gravity_id),
        }
    }
}

impl Keeper {
    /// Slashes and jails the validator whose Ethereum key produced `signature` over
    /// a checkpoint that was never issued. Returns the punished validator.
    pub fn check_bad_signature_evidence(
        &self,
        ctx: &mut Context<'_>,
        subject: &BadSignatureEvidence,
        signature: &[u8],
    ) -> Result<CosmosAddress, GravityError> {
        let params = self.get_params(ctx);
        let checkpoint = subject.get_checkpoint(&params.gravity_id);
        if self.get_past_eth_signature_checkpoint(ctx, &checkpoint) {
            return Err(GravityError::CheckpointExists);
        }

        let sig = signature_from_bytes(signature)?;
        let eth_address = signature_to_eth_address(&checkpoint, &sig)?;
        let operator = match self.get_validator_by_eth_address(ctx, &eth_address) {
            Some(operator) => operator,
            None => {
                return Err(GravityError::NotFound(format!(
                    "no validator has Ethereum address {}",
                    eth_address
                )))
            }
        };
        let validator = match self.staking.validator(ctx, &operator) {
            Some(validator) => validator,
            None => {
                return Err(GravityError::NotFound(format!(
                    "validator {} does not exist",
                    operator
                )))
            }
        };

        let mut evidence = checkpoint.clone();
        evidence.extend_from_slice(signature);
        let evidence_key = bad_signature_evidence_key(&Keccak256::digest(&evidence));
        if ctx.store().has(&evidence_key) {
            return Err(GravityError::Duplicate(
                "this evidence was already submitted".to_string(),
            ));
        }
        ctx.store_mut().set(&evidence_key, Vec::new());

        warn!(
            "Slashing {} for signing a checkpoint that was never issued",
            operator
        );
        let height = ctx.block_height();
        self.staking.slash(
            ctx,
            &operator,
            height,
            validator.consensus_power,
            params.slash_fraction_bad_eth_signature,
        );
        if !validator.jailed {
            self.staking.jail(ctx, &operator);
        }
        ctx.emit(GravityEvent::BadSignatureEvidence {
            subject_checkpoint: checkpoint,
            validator: operator.clone(),
        });
        Ok(operator)
    }
}
