//! Mapping between Cosmos denoms and ERC20 contracts. Ethereum originated tokens
//! are represented by a "gravity0x..." voucher denom, Cosmos originated tokens by
//! an ERC20 deployed through the bridge and recorded here once observed.

use crate::context::Context;
use crate::keeper::{get_json, set_json, Keeper};
use crate::keys::{denom_to_erc20_key, erc20_to_denom_key};
use clarity::Address as EthAddress;
use gravity_utils::error::GravityError;

pub const GRAVITY_DENOM_PREFIX: &str = "gravity";

/// the voucher denom of an Ethereum originated token
pub fn gravity_denom(token_contract: &EthAddress) -> String {
    format!("{}{}", GRAVITY_DENOM_PREFIX, token_contract)
}

/// Parses a voucher denom back to its token contract, only the exact form produced
/// by gravity_denom is accepted
pub fn gravity_denom_to_erc20(denom: &str) -> Result<EthAddress, GravityError> {
    let address = match denom.strip_prefix(GRAVITY_DENOM_PREFIX) {
        Some(address) => address,
        None => {
            return Err(GravityError::InvalidArgument(format!(
                "{} is not a gravity voucher denom",
                denom
            )))
        }
    };
    let token: EthAddress = address.parse().map_err(|_| {
        GravityError::InvalidArgument(format!("{} does not contain an Ethereum address", denom))
    })?;
    if gravity_denom(&token) != denom {
        return Err(GravityError::InvalidArgument(format!(
            "{} is not in canonical form {}",
            denom,
            gravity_denom(&token)
        )));
    }
    Ok(token)
}

impl Keeper {
    /// Resolves a denom to (is cosmos originated, token contract)
    pub fn denom_to_erc20_lookup(
        &self,
        ctx: &Context<'_>,
        denom: &str,
    ) -> Result<(bool, EthAddress), GravityError> {
        match gravity_denom_to_erc20(denom) {
            Ok(token) => Ok((false, token)),
            Err(e) => match self.get_cosmos_originated_erc20(ctx, denom) {
                Some(token) => Ok((true, token)),
                None => Err(GravityError::NotFound(format!(
                    "{} and not in the cosmos originated ERC20 index",
                    e
                ))),
            },
        }
    }

    /// Resolves a token contract to (is cosmos originated, denom), a token that is
    /// not a deployed representation is Ethereum originated
    pub fn erc20_to_denom_lookup(&self, ctx: &Context<'_>, token_contract: &EthAddress) -> (bool, String) {
        match self.get_cosmos_originated_denom(ctx, token_contract) {
            Some(denom) => (true, denom),
            None => (false, gravity_denom(token_contract)),
        }
    }

    pub fn get_cosmos_originated_erc20(&self, ctx: &Context<'_>, denom: &str) -> Option<EthAddress> {
        get_json(ctx.store(), &denom_to_erc20_key(denom))
    }

    pub fn get_cosmos_originated_denom(&self, ctx: &Context<'_>, token_contract: &EthAddress) -> Option<String> {
        get_json(ctx.store(), &erc20_to_denom_key(token_contract))
    }

    pub(crate) fn set_cosmos_originated_denom_to_erc20(
        &self,
        ctx: &mut Context<'_>,
        denom: &str,
        token_contract: &EthAddress,
    ) {
        let store = ctx.store_mut();
        set_json(store, &denom_to_erc20_key(denom), token_contract);
        set_json(store, &erc20_to_denom_key(token_contract), &denom.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{eth_address, TestEnv};

    #[test]
    fn test_gravity_denom_parsing() {
        let token = eth_address(50);
        let denom = gravity_denom(&token);
        assert!(denom.starts_with("gravity0x"));
        assert_eq!(gravity_denom_to_erc20(&denom).unwrap(), token);

        assert!(gravity_denom_to_erc20("stake").is_err());
        assert!(gravity_denom_to_erc20("gravity").is_err());
        assert!(gravity_denom_to_erc20("gravity0x1234").is_err());
        // only the canonical rendering identifies a voucher
        let lowercase = denom.to_lowercase();
        if lowercase != denom {
            assert!(gravity_denom_to_erc20(&lowercase).is_err());
        }
    }

    #[test]
    fn test_lookups() {
        let mut env = TestEnv::new(1);
        let keeper = &env.keeper;
        let mut ctx = Context::new(&mut env.store, 1);
        let eth_token = eth_address(51);
        let cosmos_token = eth_address(52);

        assert_eq!(
            keeper.denom_to_erc20_lookup(&ctx, &gravity_denom(&eth_token)).unwrap(),
            (false, eth_token)
        );
        assert!(keeper.denom_to_erc20_lookup(&ctx, "ufoo").is_err());

        keeper.set_cosmos_originated_denom_to_erc20(&mut ctx, "ufoo", &cosmos_token);
        assert_eq!(
            keeper.denom_to_erc20_lookup(&ctx, "ufoo").unwrap(),
            (true, cosmos_token)
        );
        assert_eq!(
            keeper.erc20_to_denom_lookup(&ctx, &cosmos_token),
            (true, "ufoo".to_string())
        );
        assert_eq!(
            keeper.erc20_to_denom_lookup(&ctx, &eth_token),
            (false, gravity_denom(&eth_token))
        );
    }
}
