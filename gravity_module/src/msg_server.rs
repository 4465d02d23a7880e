//! The inbound message surface. Each message is authorized here and then executed in
//! a write set, a message that errors leaves no trace in the store.

use crate::attestation::Attestation;
use crate::batch::OUTGOING_TX_BATCH_SIZE;
use crate::context::Context;
use crate::events::GravityEvent;
use crate::evidence::BadSignatureEvidence;
use crate::keeper::{Keeper, FEE_COLLECTOR_NAME};
use clarity::Address as EthAddress;
use clarity::Signature as EthSignature;
use deep_space::{Address as CosmosAddress, Coin};
use ethereum_gravity::message_signatures::EthereumSigned;
use ethereum_gravity::signatures::{signature_from_bytes, verify_signature};
use gravity_utils::error::GravityError;
use gravity_utils::num_conversion::basis_points_fee;
use gravity_utils::types::{
    BatchConfirm, EthereumClaim, LogicCallConfirm, OutgoingTxBatch, ValsetConfirm,
};
use num256::Uint256;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MsgSetOrchestratorAddress {
    pub validator: CosmosAddress,
    pub orchestrator: CosmosAddress,
    pub eth_address: EthAddress,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MsgValsetConfirm {
    pub nonce: u64,
    pub orchestrator: CosmosAddress,
    pub eth_address: EthAddress,
    pub signature: Vec<u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MsgConfirmBatch {
    pub nonce: u64,
    pub token_contract: EthAddress,
    pub eth_signer: EthAddress,
    pub orchestrator: CosmosAddress,
    pub signature: Vec<u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MsgConfirmLogicCall {
    pub invalidation_id: Vec<u8>,
    pub invalidation_nonce: u64,
    pub eth_signer: EthAddress,
    pub orchestrator: CosmosAddress,
    pub signature: Vec<u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MsgSendToEth {
    pub sender: CosmosAddress,
    pub eth_dest: EthAddress,
    pub amount: Coin,
    pub bridge_fee: Coin,
    pub chain_fee: Coin,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MsgCancelSendToEth {
    pub transaction_id: u64,
    pub sender: CosmosAddress,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MsgRequestBatch {
    pub sender: CosmosAddress,
    pub denom: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MsgSubmitBadSignatureEvidence {
    pub subject: BadSignatureEvidence,
    pub signature: Vec<u8>,
    pub sender: CosmosAddress,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MsgSubmitEthereumClaim {
    pub signer: CosmosAddress,
    pub claim: EthereumClaim,
}

impl Keeper {
    /// Registers a validator's orchestrator and Ethereum keys, neither key may
    /// already belong to another validator
    pub fn set_orchestrator_address(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgSetOrchestratorAddress,
    ) -> Result<(), GravityError> {
        ctx.with_write_set(|ctx| {
            if self.staking.validator(ctx, &msg.validator).is_none() {
                return Err(GravityError::NotFound(format!(
                    "validator {} does not exist",
                    msg.validator
                )));
            }
            if let Some(owner) = self.get_orchestrator_validator(ctx, &msg.orchestrator) {
                if owner != msg.validator {
                    return Err(GravityError::Duplicate(format!(
                        "orchestrator {} is already registered to {}",
                        msg.orchestrator, owner
                    )));
                }
            }
            if let Some(owner) = self.get_validator_by_eth_address(ctx, &msg.eth_address) {
                if owner != msg.validator {
                    return Err(GravityError::Duplicate(format!(
                        "Ethereum address {} is already registered to {}",
                        msg.eth_address, owner
                    )));
                }
            }
            self.set_orchestrator_validator(ctx, &msg.validator, &msg.orchestrator);
            self.set_eth_address_for_validator(ctx, &msg.validator, &msg.eth_address);
            ctx.emit(GravityEvent::SetOrchestratorAddress {
                validator: msg.validator.clone(),
                orchestrator: msg.orchestrator.clone(),
                eth_address: msg.eth_address,
            });
            Ok(())
        })
    }

    /// Checks the orchestrator acts for a validator whose registered Ethereum key is
    /// `eth_address` and that `signature` is that key's signature over `checkpoint`
    fn confirm_handler_common(
        &self,
        ctx: &Context<'_>,
        orchestrator: &CosmosAddress,
        eth_address: EthAddress,
        signature: &[u8],
        checkpoint: &[u8],
    ) -> Result<EthSignature, GravityError> {
        let validator = match self.get_orchestrator_validator(ctx, orchestrator) {
            Some(v) => v,
            None => {
                return Err(GravityError::Unauthorized(format!(
                    "{} is not a registered orchestrator",
                    orchestrator
                )))
            }
        };
        if self.staking.validator(ctx, &validator).is_none() {
            return Err(GravityError::NotFound(format!("validator {} does not exist", validator)));
        }
        match self.get_eth_address_by_validator(ctx, &validator) {
            Some(registered) if registered == eth_address => {}
            _ => {
                return Err(GravityError::Unauthorized(format!(
                    "{} is not the Ethereum address of {}",
                    eth_address, validator
                )))
            }
        }
        let sig = signature_from_bytes(signature)?;
        verify_signature(checkpoint, &sig, eth_address)?;
        Ok(sig)
    }

    pub fn valset_confirm(&self, ctx: &mut Context<'_>, msg: &MsgValsetConfirm) -> Result<(), GravityError> {
        ctx.with_write_set(|ctx| {
            let valset = match self.get_valset(ctx, msg.nonce) {
                Some(v) => v,
                None => return Err(GravityError::NotFound(format!("no valset {}", msg.nonce))),
            };
            let checkpoint = valset.get_checkpoint(&self.get_gravity_id(ctx));
            let sig = self.confirm_handler_common(
                ctx,
                &msg.orchestrator,
                msg.eth_address,
                &msg.signature,
                &checkpoint,
            )?;
            if self.get_valset_confirm(ctx, msg.nonce, &msg.orchestrator).is_some() {
                return Err(GravityError::Duplicate(format!(
                    "valset {} already confirmed by {}",
                    msg.nonce, msg.orchestrator
                )));
            }
            let key = self.set_valset_confirm(
                ctx,
                &ValsetConfirm {
                    nonce: msg.nonce,
                    orchestrator: msg.orchestrator.clone(),
                    eth_address: msg.eth_address,
                    eth_signature: sig,
                },
            );
            ctx.emit(GravityEvent::ConfirmKey { key });
            Ok(())
        })
    }

    pub fn confirm_batch(&self, ctx: &mut Context<'_>, msg: &MsgConfirmBatch) -> Result<(), GravityError> {
        ctx.with_write_set(|ctx| {
            let batch: OutgoingTxBatch = match self.get_outgoing_tx_batch(ctx, &msg.token_contract, msg.nonce) {
                Some(b) => b,
                None => {
                    return Err(GravityError::NotFound(format!(
                        "no batch {} of {}",
                        msg.nonce, msg.token_contract
                    )))
                }
            };
            let checkpoint = batch.get_checkpoint(&self.get_gravity_id(ctx));
            let sig = self.confirm_handler_common(
                ctx,
                &msg.orchestrator,
                msg.eth_signer,
                &msg.signature,
                &checkpoint,
            )?;
            if self
                .get_batch_confirm(ctx, &msg.token_contract, msg.nonce, &msg.orchestrator)
                .is_some()
            {
                return Err(GravityError::Duplicate(format!(
                    "batch {} already confirmed by {}",
                    msg.nonce, msg.orchestrator
                )));
            }
            let key = self.set_batch_confirm(
                ctx,
                &BatchConfirm {
                    nonce: msg.nonce,
                    token_contract: msg.token_contract,
                    orchestrator: msg.orchestrator.clone(),
                    ethereum_signer: msg.eth_signer,
                    eth_signature: sig,
                },
            );
            ctx.emit(GravityEvent::ConfirmKey { key });
            Ok(())
        })
    }

    pub fn confirm_logic_call(&self, ctx: &mut Context<'_>, msg: &MsgConfirmLogicCall) -> Result<(), GravityError> {
        ctx.with_write_set(|ctx| {
            let call = match self.get_outgoing_logic_call(ctx, &msg.invalidation_id, msg.invalidation_nonce) {
                Some(c) => c,
                None => {
                    return Err(GravityError::NotFound(format!(
                        "no logic call {:?} nonce {}",
                        msg.invalidation_id, msg.invalidation_nonce
                    )))
                }
            };
            let checkpoint = call.get_checkpoint(&self.get_gravity_id(ctx));
            let sig = self.confirm_handler_common(
                ctx,
                &msg.orchestrator,
                msg.eth_signer,
                &msg.signature,
                &checkpoint,
            )?;
            if self
                .get_logic_call_confirm(ctx, &msg.invalidation_id, msg.invalidation_nonce, &msg.orchestrator)
                .is_some()
            {
                return Err(GravityError::Duplicate(format!(
                    "logic call already confirmed by {}",
                    msg.orchestrator
                )));
            }
            let key = self.set_logic_call_confirm(
                ctx,
                &LogicCallConfirm {
                    invalidation_id: msg.invalidation_id.clone(),
                    invalidation_nonce: msg.invalidation_nonce,
                    ethereum_signer: msg.eth_signer,
                    orchestrator: msg.orchestrator.clone(),
                    eth_signature: sig,
                },
            );
            ctx.emit(GravityEvent::ConfirmKey { key });
            Ok(())
        })
    }

    /// Pays the chain fee and pools the transfer, returns the transfer id
    pub fn send_to_eth(&self, ctx: &mut Context<'_>, msg: &MsgSendToEth) -> Result<u64, GravityError> {
        ctx.with_write_set(|ctx| {
            let params = self.get_params(ctx);
            if params.is_blacklisted(&msg.eth_dest) {
                return Err(GravityError::Unauthorized(format!(
                    "destination {} is blacklisted",
                    msg.eth_dest
                )));
            }
            if msg.chain_fee.denom != msg.amount.denom {
                return Err(GravityError::InvalidArgument(format!(
                    "chain fee denom {} is not {}",
                    msg.chain_fee.denom, msg.amount.denom
                )));
            }
            let min_chain_fee = match basis_points_fee(msg.amount.amount, params.min_chain_fee_basis_points) {
                Some(fee) => fee,
                None => {
                    return Err(GravityError::InvalidArgument(format!(
                        "chain fee for {} overflows",
                        msg.amount.amount
                    )))
                }
            };
            if msg.chain_fee.amount < min_chain_fee {
                return Err(GravityError::InsufficientFunds(format!(
                    "chain fee {} is below the minimum {}",
                    msg.chain_fee.amount, min_chain_fee
                )));
            }
            if msg.chain_fee.amount > Uint256::from(0u8) {
                self.bank.send_coins_from_account_to_module(
                    ctx,
                    &msg.sender,
                    FEE_COLLECTOR_NAME,
                    &msg.chain_fee,
                )?;
            }
            self.add_to_outgoing_pool(ctx, &msg.sender, msg.eth_dest, &msg.amount, &msg.bridge_fee)
        })
    }

    pub fn cancel_send_to_eth(&self, ctx: &mut Context<'_>, msg: &MsgCancelSendToEth) -> Result<(), GravityError> {
        ctx.with_write_set(|ctx| self.remove_from_outgoing_pool_and_refund(ctx, msg.transaction_id, &msg.sender))
    }

    /// Anyone may request a batch, the profitability rule keeps this from churning
    pub fn request_batch(&self, ctx: &mut Context<'_>, msg: &MsgRequestBatch) -> Result<OutgoingTxBatch, GravityError> {
        ctx.with_write_set(|ctx| {
            if !self.get_params(ctx).bridge_active {
                return Err(GravityError::BridgeHalted);
            }
            let (_, token_contract) = self.denom_to_erc20_lookup(ctx, &msg.denom)?;
            self.build_outgoing_tx_batch(ctx, &token_contract, OUTGOING_TX_BATCH_SIZE)
        })
    }

    pub fn submit_bad_signature_evidence(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgSubmitBadSignatureEvidence,
    ) -> Result<CosmosAddress, GravityError> {
        ctx.with_write_set(|ctx| self.check_bad_signature_evidence(ctx, &msg.subject, &msg.signature))
    }

    /// Accepts a claim from the orchestrator that signed it, the orchestrator must
    /// act for an existing validator
    pub fn submit_ethereum_claim(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgSubmitEthereumClaim,
    ) -> Result<Attestation, GravityError> {
        ctx.with_write_set(|ctx| {
            msg.claim.validate_basic()?;
            if msg.claim.get_claimer() != &msg.signer {
                return Err(GravityError::Unauthorized(format!(
                    "claim names {} but was signed by {}",
                    msg.claim.get_claimer(),
                    msg.signer
                )));
            }
            let validator = match self.get_orchestrator_validator(ctx, &msg.signer) {
                Some(v) => v,
                None => {
                    return Err(GravityError::Unauthorized(format!(
                        "{} is not a registered orchestrator",
                        msg.signer
                    )))
                }
            };
            if self.staking.validator(ctx, &validator).is_none() {
                return Err(GravityError::NotFound(format!("validator {} does not exist", validator)));
            }
            self.submit_claim(ctx, &msg.claim)
        })
    }
}
