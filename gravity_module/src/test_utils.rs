//! In memory stand ins for the staking, bank and distribution modules plus
//! deterministic key fixtures. Bank balances live in the store under a "bank/"
//! prefix so they are staged and rolled back along with the module's own writes.

use crate::attestation_handler::ClaimHandler;
use crate::context::Context;
use crate::expected_keepers::{
    BankKeeper, BondStatus, DenomMetadata, DistributionKeeper, StakingKeeper, Validator,
};
use crate::keeper::Keeper;
use crate::store::{KvStore, MemStore};
use clarity::Address as EthAddress;
use clarity::PrivateKey as EthPrivateKey;
use clarity::Signature as EthSignature;
use deep_space::{Address as CosmosAddress, Coin, CosmosPrivateKey, PrivateKey};
use gravity_utils::error::GravityError;
use gravity_utils::types::{EthereumClaim, GravityParams, SendToCosmosClaim};
use num256::Uint256;
use std::cell::RefCell;
use std::rc::Rc;

pub const TEST_GRAVITY_ID: &str = "testgravityid";

pub fn cosmos_address(seed: u8) -> CosmosAddress {
    CosmosPrivateKey::from_secret(&[seed; 32])
        .to_address("gravity")
        .unwrap()
}

pub fn eth_key(seed: u8) -> EthPrivateKey {
    EthPrivateKey::from_bytes([seed; 32]).unwrap()
}

pub fn eth_address(seed: u8) -> EthAddress {
    eth_key(seed).to_address()
}

/// r || s || v, the form confirms and evidence are submitted in
pub fn signature_bytes(sig: &EthSignature) -> Vec<u8> {
    sig.to_bytes().to_vec()
}

pub fn sign(key: &EthPrivateKey, message: &[u8]) -> Vec<u8> {
    signature_bytes(&key.sign_ethereum_msg(message))
}

/// a deposit of `amount` of `token` as reported by `orchestrator`
pub fn deposit_claim(
    event_nonce: u64,
    orchestrator: &CosmosAddress,
    token: EthAddress,
    amount: u64,
    receiver: &str,
) -> EthereumClaim {
    EthereumClaim::SendToCosmos(SendToCosmosClaim {
        event_nonce,
        eth_block_height: 500 + event_nonce,
        token_contract: token,
        amount: amount.into(),
        ethereum_sender: eth_address(240),
        cosmos_receiver: receiver.to_string(),
        orchestrator: orchestrator.clone(),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slash {
    pub operator: CosmosAddress,
    pub infraction_height: u64,
    pub power: u64,
    pub fraction_basis_points: u64,
}

#[derive(Default)]
struct StakingState {
    validators: Vec<Validator>,
    slashes: Vec<Slash>,
}

#[derive(Clone, Default)]
pub struct MockStaking {
    state: Rc<RefCell<StakingState>>,
}

impl MockStaking {
    pub fn add_validator(&self, operator: CosmosAddress, power: u64) {
        self.state.borrow_mut().validators.push(Validator {
            operator,
            consensus_power: power,
            status: BondStatus::Bonded,
            jailed: false,
            start_height: 0,
            unbonding_height: 0,
        });
    }

    fn update(&self, operator: &CosmosAddress, f: impl FnOnce(&mut Validator)) {
        let mut state = self.state.borrow_mut();
        let validator = state
            .validators
            .iter_mut()
            .find(|v| v.operator == *operator)
            .expect("unknown validator");
        f(validator)
    }

    pub fn set_power(&self, operator: &CosmosAddress, power: u64) {
        self.update(operator, |v| v.consensus_power = power)
    }

    pub fn set_start_height(&self, operator: &CosmosAddress, height: u64) {
        self.update(operator, |v| v.start_height = height)
    }

    pub fn begin_unbonding(&self, operator: &CosmosAddress, height: u64) {
        self.update(operator, |v| {
            v.status = BondStatus::Unbonding;
            v.unbonding_height = height;
        })
    }

    pub fn slashes(&self) -> Vec<Slash> {
        self.state.borrow().slashes.clone()
    }

    pub fn is_jailed(&self, operator: &CosmosAddress) -> bool {
        self.state
            .borrow()
            .validators
            .iter()
            .any(|v| v.operator == *operator && v.jailed)
    }
}

impl StakingKeeper for MockStaking {
    fn bonded_validators_by_power(&self, _ctx: &Context<'_>) -> Vec<Validator> {
        let mut bonded: Vec<Validator> = self
            .state
            .borrow()
            .validators
            .iter()
            .filter(|v| v.is_bonded())
            .cloned()
            .collect();
        bonded.sort_by(|a, b| b.consensus_power.cmp(&a.consensus_power));
        bonded
    }

    fn unbonding_validators(&self, _ctx: &Context<'_>) -> Vec<Validator> {
        self.state
            .borrow()
            .validators
            .iter()
            .filter(|v| v.is_unbonding())
            .cloned()
            .collect()
    }

    fn validator(&self, _ctx: &Context<'_>, operator: &CosmosAddress) -> Option<Validator> {
        self.state
            .borrow()
            .validators
            .iter()
            .find(|v| v.operator == *operator)
            .cloned()
    }

    fn last_total_power(&self, ctx: &Context<'_>) -> u64 {
        self.bonded_validators_by_power(ctx)
            .iter()
            .map(|v| v.consensus_power)
            .sum()
    }

    fn slash(
        &self,
        _ctx: &mut Context<'_>,
        operator: &CosmosAddress,
        infraction_height: u64,
        power: u64,
        fraction_basis_points: u64,
    ) {
        self.state.borrow_mut().slashes.push(Slash {
            operator: operator.clone(),
            infraction_height,
            power,
            fraction_basis_points,
        });
    }

    fn jail(&self, _ctx: &mut Context<'_>, operator: &CosmosAddress) {
        self.update(operator, |v| v.jailed = true)
    }
}

#[derive(Default)]
struct BankState {
    metadata: Vec<DenomMetadata>,
    blocked: Vec<CosmosAddress>,
}

/// Implements both the bank and distribution interfaces
#[derive(Clone, Default)]
pub struct MockBank {
    state: Rc<RefCell<BankState>>,
}

fn account_key(address: &CosmosAddress, denom: &str) -> Vec<u8> {
    format!("bank/account/{}/{}", address, denom).into_bytes()
}

fn module_key(module: &str, denom: &str) -> Vec<u8> {
    format!("bank/module/{}/{}", module, denom).into_bytes()
}

fn supply_key(denom: &str) -> Vec<u8> {
    format!("bank/supply/{}", denom).into_bytes()
}

fn community_pool_key(denom: &str) -> Vec<u8> {
    format!("bank/community_pool/{}", denom).into_bytes()
}

fn read(store: &dyn KvStore, key: &[u8]) -> Uint256 {
    match store.get(key) {
        Some(bytes) => serde_json::from_slice(&bytes).unwrap(),
        None => 0u8.into(),
    }
}

fn write(store: &mut dyn KvStore, key: &[u8], value: Uint256) {
    store.set(key, serde_json::to_vec(&value).unwrap());
}

fn credit(store: &mut dyn KvStore, key: &[u8], amount: Uint256) {
    let balance = read(store, key);
    write(store, key, balance + amount);
}

fn debit(store: &mut dyn KvStore, key: &[u8], amount: Uint256) -> Result<(), GravityError> {
    let balance = read(store, key);
    if balance < amount {
        return Err(GravityError::InsufficientFunds(format!(
            "{} < {}",
            balance, amount
        )));
    }
    write(store, key, balance - amount);
    Ok(())
}

impl MockBank {
    /// mints `amount` straight into an account
    pub fn fund_account(&self, store: &mut dyn KvStore, address: &CosmosAddress, denom: &str, amount: u64) {
        credit(store, &account_key(address, denom), amount.into());
        credit(store, &supply_key(denom), amount.into());
    }

    pub fn balance(&self, ctx: &Context<'_>, address: &CosmosAddress, denom: &str) -> Uint256 {
        read(ctx.store(), &account_key(address, denom))
    }

    pub fn module_balance(&self, ctx: &Context<'_>, module: &str, denom: &str) -> Uint256 {
        read(ctx.store(), &module_key(module, denom))
    }

    pub fn community_pool(&self, ctx: &Context<'_>, denom: &str) -> Uint256 {
        read(ctx.store(), &community_pool_key(denom))
    }

    pub fn set_denom_metadata(&self, metadata: DenomMetadata) {
        self.state.borrow_mut().metadata.push(metadata);
    }

    /// sends from the module to this address will fail
    pub fn block_recipient(&self, address: CosmosAddress) {
        self.state.borrow_mut().blocked.push(address);
    }
}

impl BankKeeper for MockBank {
    fn mint_coins(&self, ctx: &mut Context<'_>, module: &str, coin: &Coin) -> Result<(), GravityError> {
        let store = ctx.store_mut();
        credit(store, &module_key(module, &coin.denom), coin.amount);
        credit(store, &supply_key(&coin.denom), coin.amount);
        Ok(())
    }

    fn burn_coins(&self, ctx: &mut Context<'_>, module: &str, coin: &Coin) -> Result<(), GravityError> {
        let store = ctx.store_mut();
        debit(store, &module_key(module, &coin.denom), coin.amount)?;
        debit(store, &supply_key(&coin.denom), coin.amount)
    }

    fn send_coins_from_account_to_module(
        &self,
        ctx: &mut Context<'_>,
        sender: &CosmosAddress,
        module: &str,
        coin: &Coin,
    ) -> Result<(), GravityError> {
        let store = ctx.store_mut();
        debit(store, &account_key(sender, &coin.denom), coin.amount)?;
        credit(store, &module_key(module, &coin.denom), coin.amount);
        Ok(())
    }

    fn send_coins_from_module_to_account(
        &self,
        ctx: &mut Context<'_>,
        module: &str,
        recipient: &CosmosAddress,
        coin: &Coin,
    ) -> Result<(), GravityError> {
        if self.state.borrow().blocked.contains(recipient) {
            return Err(GravityError::Unauthorized(format!(
                "{} may not receive funds",
                recipient
            )));
        }
        let store = ctx.store_mut();
        debit(store, &module_key(module, &coin.denom), coin.amount)?;
        credit(store, &account_key(recipient, &coin.denom), coin.amount);
        Ok(())
    }

    fn get_supply(&self, ctx: &Context<'_>, denom: &str) -> Uint256 {
        read(ctx.store(), &supply_key(denom))
    }

    fn get_denom_metadata(&self, _ctx: &Context<'_>, denom: &str) -> Option<DenomMetadata> {
        self.state
            .borrow()
            .metadata
            .iter()
            .find(|m| m.base == denom)
            .cloned()
    }
}

impl DistributionKeeper for MockBank {
    fn fund_community_pool_from_module(
        &self,
        ctx: &mut Context<'_>,
        module: &str,
        coin: &Coin,
    ) -> Result<(), GravityError> {
        let store = ctx.store_mut();
        debit(store, &module_key(module, &coin.denom), coin.amount)?;
        credit(store, &community_pool_key(&coin.denom), coin.amount);
        Ok(())
    }
}

/// A bonded validator with all of its bridge keys registered
pub struct TestValidator {
    pub operator: CosmosAddress,
    pub orchestrator: CosmosAddress,
    pub eth_key: EthPrivateKey,
    pub eth_address: EthAddress,
}

pub struct TestEnv {
    pub keeper: Keeper,
    pub store: MemStore,
    pub staking: MockStaking,
    pub bank: MockBank,
    pub validators: Vec<TestValidator>,
}

impl TestEnv {
    /// `count` validators of power 10 each, with delegate keys set
    pub fn new(count: u8) -> TestEnv {
        let _ = env_logger::builder().is_test(true).try_init();
        let staking = MockStaking::default();
        let bank = MockBank::default();
        let keeper = Keeper::new(
            Box::new(staking.clone()),
            Box::new(bank.clone()),
            Box::new(bank.clone()),
        );
        let mut store = MemStore::new();
        let mut validators = Vec::new();
        {
            let mut ctx = Context::new(&mut store, 0);
            let params = GravityParams {
                gravity_id: TEST_GRAVITY_ID.to_string(),
                bridge_ethereum_address: eth_address(250),
                bridge_chain_id: 1,
                ..Default::default()
            };
            keeper.set_params(&mut ctx, &params).unwrap();
            for i in 1..=count {
                let validator = TestValidator {
                    operator: cosmos_address(i),
                    orchestrator: cosmos_address(i + 100),
                    eth_key: eth_key(i),
                    eth_address: eth_address(i),
                };
                staking.add_validator(validator.operator.clone(), 10);
                keeper.set_orchestrator_validator(&mut ctx, &validator.operator, &validator.orchestrator);
                keeper.set_eth_address_for_validator(&mut ctx, &validator.operator, &validator.eth_address);
                validators.push(validator);
            }
        }
        TestEnv {
            keeper,
            store,
            staking,
            bank,
            validators,
        }
    }

    pub fn with_claim_handler(mut self, handler: Box<dyn ClaimHandler>) -> TestEnv {
        self.keeper = self.keeper.with_claim_handler(handler);
        self
    }

    /// adds a bonded validator with delegate keys derived from `seed`
    pub fn register_validator(&mut self, seed: u8, power: u64) -> usize {
        let validator = TestValidator {
            operator: cosmos_address(seed),
            orchestrator: cosmos_address(seed.wrapping_add(100)),
            eth_key: eth_key(seed),
            eth_address: eth_address(seed),
        };
        self.staking.add_validator(validator.operator.clone(), power);
        let mut ctx = Context::new(&mut self.store, 0);
        self.keeper
            .set_orchestrator_validator(&mut ctx, &validator.operator, &validator.orchestrator);
        self.keeper
            .set_eth_address_for_validator(&mut ctx, &validator.operator, &validator.eth_address);
        self.validators.push(validator);
        self.validators.len() - 1
    }
}
