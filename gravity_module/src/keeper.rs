use crate::attestation_handler::ClaimHandler;
use crate::context::Context;
use crate::expected_keepers::{BankKeeper, DistributionKeeper, StakingKeeper};
use crate::keys::PARAMS_KEY;
use crate::store::KvStore;
use gravity_utils::error::{invariant_violation, GravityError};
use gravity_utils::types::GravityParams;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Name of the module account bridged funds are held in
pub const MODULE_NAME: &str = "gravity";
/// Module account chain fees are paid to
pub const FEE_COLLECTOR_NAME: &str = "fee_collector";

/// The Gravity module. Holds no state of its own, everything lives in the store
/// of the Context each method is given.
pub struct Keeper {
    pub(crate) staking: Box<dyn StakingKeeper>,
    pub(crate) bank: Box<dyn BankKeeper>,
    pub(crate) distribution: Box<dyn DistributionKeeper>,
    claim_handler: Option<Box<dyn ClaimHandler>>,
}

impl Keeper {
    pub fn new(
        staking: Box<dyn StakingKeeper>,
        bank: Box<dyn BankKeeper>,
        distribution: Box<dyn DistributionKeeper>,
    ) -> Keeper {
        Keeper {
            staking,
            bank,
            distribution,
            claim_handler: None,
        }
    }

    /// Replaces the default claim handler, the effects applied when an
    /// attestation is observed
    pub fn with_claim_handler(mut self, handler: Box<dyn ClaimHandler>) -> Keeper {
        self.claim_handler = Some(handler);
        self
    }

    pub(crate) fn custom_claim_handler(&self) -> Option<&dyn ClaimHandler> {
        self.claim_handler.as_deref()
    }

    pub fn get_params(&self, ctx: &Context<'_>) -> GravityParams {
        get_json(ctx.store(), PARAMS_KEY).unwrap_or_default()
    }

    pub fn set_params(&self, ctx: &mut Context<'_>, params: &GravityParams) -> Result<(), GravityError> {
        params.validate()?;
        set_json(ctx.store_mut(), PARAMS_KEY, params);
        Ok(())
    }

    pub fn get_gravity_id(&self, ctx: &Context<'_>) -> String {
        self.get_params(ctx).gravity_id
    }
}

/// Reads a JSON value, a value that does not decode means the store is corrupt
pub(crate) fn get_json<T: DeserializeOwned>(store: &dyn KvStore, key: &[u8]) -> Option<T> {
    let bytes = store.get(key)?;
    match serde_json::from_slice(&bytes) {
        Ok(v) => Some(v),
        Err(e) => invariant_violation(&format!("undecodable store value {:?}: {}", key, e)),
    }
}

pub(crate) fn set_json<T: Serialize>(store: &mut dyn KvStore, key: &[u8], value: &T) {
    match serde_json::to_vec(value) {
        Ok(bytes) => store.set(key, bytes),
        Err(e) => invariant_violation(&format!("unencodable store value {:?}: {}", key, e)),
    }
}

/// every JSON value under a prefix in key order
pub(crate) fn prefix_json<T: DeserializeOwned>(store: &dyn KvStore, prefix: &[u8]) -> Vec<T> {
    store
        .prefix_entries(prefix)
        .into_iter()
        .map(|(key, bytes)| match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(e) => invariant_violation(&format!("undecodable store value {:?}: {}", key, e)),
        })
        .collect()
}

pub(crate) fn get_u64(store: &dyn KvStore, key: &[u8]) -> Option<u64> {
    let bytes = store.get(key)?;
    if bytes.len() != 8 {
        invariant_violation(&format!("stored integer {:?} is not 8 bytes", key));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes);
    Some(u64::from_be_bytes(buf))
}

pub(crate) fn set_u64(store: &mut dyn KvStore, key: &[u8], value: u64) {
    store.set(key, value.to_be_bytes().to_vec());
}

/// Increments the counter at `key` and returns the new value, the first id is 1
pub(crate) fn auto_increment_id(store: &mut dyn KvStore, key: &[u8]) -> u64 {
    let next = get_u64(store, key).unwrap_or(0) + 1;
    set_u64(store, key, next);
    next
}
