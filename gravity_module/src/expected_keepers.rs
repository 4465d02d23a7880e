//! Interfaces of the host chain modules the Gravity module depends on. Each method
//! takes the Context it runs in so writes made through it are staged with the rest
//! of the operation.

use crate::context::Context;
use deep_space::{Address as CosmosAddress, Coin};
use gravity_utils::error::GravityError;
use num256::Uint256;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondStatus {
    Bonded,
    Unbonding,
    Unbonded,
}

/// The parts of a staking validator the bridge reads
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Validator {
    pub operator: CosmosAddress,
    pub consensus_power: u64,
    pub status: BondStatus,
    pub jailed: bool,
    /// height signing info starts at, validators are only punished for objects
    /// created after they started signing
    pub start_height: u64,
    pub unbonding_height: u64,
}

impl Validator {
    pub fn is_bonded(&self) -> bool {
        self.status == BondStatus::Bonded
    }

    pub fn is_unbonding(&self) -> bool {
        self.status == BondStatus::Unbonding
    }
}

pub trait StakingKeeper {
    /// bonded validators sorted by power, greatest first
    fn bonded_validators_by_power(&self, ctx: &Context<'_>) -> Vec<Validator>;
    fn unbonding_validators(&self, ctx: &Context<'_>) -> Vec<Validator>;
    fn validator(&self, ctx: &Context<'_>, operator: &CosmosAddress) -> Option<Validator>;
    /// total power of the bonded set as of the last block
    fn last_total_power(&self, ctx: &Context<'_>) -> u64;
    fn slash(
        &self,
        ctx: &mut Context<'_>,
        operator: &CosmosAddress,
        infraction_height: u64,
        power: u64,
        fraction_basis_points: u64,
    );
    fn jail(&self, ctx: &mut Context<'_>, operator: &CosmosAddress);
}

/// Metadata a bank keeps for a denom, one unit exponent per display denomination
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct DenomMetadata {
    pub base: String,
    pub display: String,
    pub name: String,
    pub symbol: String,
    pub denom_units: Vec<DenomUnit>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct DenomUnit {
    pub denom: String,
    pub exponent: u32,
}

pub trait BankKeeper {
    fn mint_coins(&self, ctx: &mut Context<'_>, module: &str, coin: &Coin)
        -> Result<(), GravityError>;
    fn burn_coins(&self, ctx: &mut Context<'_>, module: &str, coin: &Coin)
        -> Result<(), GravityError>;
    fn send_coins_from_account_to_module(
        &self,
        ctx: &mut Context<'_>,
        sender: &CosmosAddress,
        module: &str,
        coin: &Coin,
    ) -> Result<(), GravityError>;
    fn send_coins_from_module_to_account(
        &self,
        ctx: &mut Context<'_>,
        module: &str,
        recipient: &CosmosAddress,
        coin: &Coin,
    ) -> Result<(), GravityError>;
    fn get_supply(&self, ctx: &Context<'_>, denom: &str) -> Uint256;
    fn get_denom_metadata(&self, ctx: &Context<'_>, denom: &str) -> Option<DenomMetadata>;
}

pub trait DistributionKeeper {
    fn fund_community_pool_from_module(
        &self,
        ctx: &mut Context<'_>,
        module: &str,
        coin: &Coin,
    ) -> Result<(), GravityError>;
}
