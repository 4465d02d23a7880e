//! Arbitrary logic calls on Ethereum, issued by other modules. A call is identified
//! by its invalidation id and nonce, the Ethereum contract refuses any call whose
//! nonce is not above the last executed nonce of the same id.

use crate::context::Context;
use crate::events::GravityEvent;
use crate::keeper::{get_json, prefix_json, set_json, Keeper};
use crate::keys::*;
use deep_space::Address as CosmosAddress;
use ethereum_gravity::message_signatures::EthereumSigned;
use gravity_utils::error::GravityError;
use gravity_utils::types::{LogicCallConfirm, OutgoingLogicCall};

/// longest invalidation id the contract accepts, it is a bytes32 there
pub const MAX_INVALIDATION_ID_LEN: usize = 32;

impl Keeper {
    /// Stores a new logic call for signing, the call's block_created is set to the
    /// current height
    pub fn set_outgoing_logic_call(
        &self,
        ctx: &mut Context<'_>,
        mut call: OutgoingLogicCall,
    ) -> Result<(), GravityError> {
        if call.invalidation_id.is_empty() || call.invalidation_id.len() > MAX_INVALIDATION_ID_LEN {
            return Err(GravityError::InvalidArgument(format!(
                "invalidation id must be 1 to {} bytes",
                MAX_INVALIDATION_ID_LEN
            )));
        }
        if self
            .get_outgoing_logic_call(ctx, &call.invalidation_id, call.invalidation_nonce)
            .is_some()
        {
            return Err(GravityError::Duplicate(format!(
                "logic call {:?} nonce {} already exists",
                call.invalidation_id, call.invalidation_nonce
            )));
        }
        call.block_created = ctx.block_height();
        set_json(
            ctx.store_mut(),
            &logic_call_key(&call.invalidation_id, call.invalidation_nonce),
            &call,
        );
        let checkpoint = call.get_checkpoint(&self.get_gravity_id(ctx));
        self.set_past_eth_signature_checkpoint(ctx, &checkpoint);
        ctx.emit(GravityEvent::OutgoingLogicCall {
            invalidation_id: call.invalidation_id.clone(),
            invalidation_nonce: call.invalidation_nonce,
        });
        Ok(())
    }

    pub fn get_outgoing_logic_call(
        &self,
        ctx: &Context<'_>,
        invalidation_id: &[u8],
        invalidation_nonce: u64,
    ) -> Option<OutgoingLogicCall> {
        get_json(ctx.store(), &logic_call_key(invalidation_id, invalidation_nonce))
    }

    pub fn get_outgoing_logic_calls(&self, ctx: &Context<'_>) -> Vec<OutgoingLogicCall> {
        prefix_json(ctx.store(), LOGIC_CALL_PREFIX)
    }

    fn delete_outgoing_logic_call(&self, ctx: &mut Context<'_>, invalidation_id: &[u8], invalidation_nonce: u64) {
        let store = ctx.store_mut();
        store.delete(&logic_call_key(invalidation_id, invalidation_nonce));
        for (key, _) in store.prefix_entries(&logic_call_confirm_call_prefix(invalidation_id, invalidation_nonce)) {
            store.delete(&key);
        }
    }

    pub fn cancel_outgoing_logic_call(
        &self,
        ctx: &mut Context<'_>,
        invalidation_id: &[u8],
        invalidation_nonce: u64,
    ) -> Result<(), GravityError> {
        if self
            .get_outgoing_logic_call(ctx, invalidation_id, invalidation_nonce)
            .is_none()
        {
            return Err(GravityError::NotFound(format!(
                "no logic call {:?} nonce {}",
                invalidation_id, invalidation_nonce
            )));
        }
        self.delete_outgoing_logic_call(ctx, invalidation_id, invalidation_nonce);
        ctx.emit(GravityEvent::OutgoingLogicCallCanceled {
            invalidation_id: invalidation_id.to_vec(),
            invalidation_nonce,
        });
        Ok(())
    }

    /// Called when a logic call executes on Ethereum
    pub fn outgoing_logic_call_executed(
        &self,
        ctx: &mut Context<'_>,
        invalidation_id: &[u8],
        invalidation_nonce: u64,
    ) {
        if self
            .get_outgoing_logic_call(ctx, invalidation_id, invalidation_nonce)
            .is_none()
        {
            info!(
                "Executed logic call {:?} nonce {} is not in the store",
                invalidation_id, invalidation_nonce
            );
            return;
        }
        self.delete_outgoing_logic_call(ctx, invalidation_id, invalidation_nonce);
    }

    pub fn set_logic_call_confirm(&self, ctx: &mut Context<'_>, confirm: &LogicCallConfirm) -> Vec<u8> {
        let key = logic_call_confirm_key(
            &confirm.invalidation_id,
            confirm.invalidation_nonce,
            &confirm.orchestrator,
        );
        set_json(ctx.store_mut(), &key, confirm);
        key
    }

    pub fn get_logic_call_confirm(
        &self,
        ctx: &Context<'_>,
        invalidation_id: &[u8],
        invalidation_nonce: u64,
        orchestrator: &CosmosAddress,
    ) -> Option<LogicCallConfirm> {
        get_json(
            ctx.store(),
            &logic_call_confirm_key(invalidation_id, invalidation_nonce, orchestrator),
        )
    }

    pub fn get_logic_call_confirms(
        &self,
        ctx: &Context<'_>,
        invalidation_id: &[u8],
        invalidation_nonce: u64,
    ) -> Vec<LogicCallConfirm> {
        prefix_json(
            ctx.store(),
            &logic_call_confirm_call_prefix(invalidation_id, invalidation_nonce),
        )
    }
}
