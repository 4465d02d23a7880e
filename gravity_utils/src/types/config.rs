//! contains the Gravity module parameters, the governance controlled configuration
//! every bridge operation reads

use crate::error::GravityError;
use clarity::constants::zero_address;
use clarity::Address as EthAddress;
use clarity::Uint256;
use deep_space::Coin;
use std::fs;
use std::path::Path;

/// Module parameters, stored in the module store and loadable from a TOML file
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct GravityParams {
    /// Salt mixed into every checkpoint, at most 32 bytes
    #[serde(default = "default_gravity_id")]
    pub gravity_id: String,
    #[serde(default = "zero_address")]
    pub bridge_ethereum_address: EthAddress,
    #[serde(default = "default_bridge_chain_id")]
    pub bridge_chain_id: u64,
    /// blocks a validator has to sign a valset before being slashed
    #[serde(default = "default_signed_window")]
    pub signed_valsets_window: u64,
    #[serde(default = "default_signed_window")]
    pub signed_batches_window: u64,
    #[serde(default = "default_signed_window")]
    pub signed_logic_calls_window: u64,
    /// how long a batch stays valid on Ethereum, in milliseconds
    #[serde(default = "default_target_batch_timeout")]
    pub target_batch_timeout: u64,
    /// in milliseconds
    #[serde(default = "default_average_block_time")]
    pub average_block_time: u64,
    /// in milliseconds
    #[serde(default = "default_average_ethereum_block_time")]
    pub average_ethereum_block_time: u64,
    /// slash fractions are expressed in basis points
    #[serde(default = "default_slash_fraction")]
    pub slash_fraction_valset: u64,
    #[serde(default = "default_slash_fraction")]
    pub slash_fraction_batch: u64,
    #[serde(default = "default_slash_fraction")]
    pub slash_fraction_logic_call: u64,
    #[serde(default = "default_slash_fraction")]
    pub slash_fraction_bad_eth_signature: u64,
    /// unbonding validators are still slashed for valsets created within this
    /// many blocks of their unbonding height
    #[serde(default = "default_signed_window")]
    pub unbond_slashing_valsets_window: u64,
    /// paid to whoever relays a valset update, None for no reward
    #[serde(default)]
    pub valset_reward: Option<Coin>,
    /// when false no attestations are processed and no batches are built
    #[serde(default = "default_bridge_active")]
    pub bridge_active: bool,
    /// Ethereum addresses that may not send or receive through the bridge
    #[serde(default)]
    pub ethereum_blacklist: Vec<EthAddress>,
    #[serde(default)]
    pub min_chain_fee_basis_points: u64,
}

fn default_gravity_id() -> String {
    "defaultgravityid".to_string()
}

fn default_bridge_chain_id() -> u64 {
    0
}

fn default_signed_window() -> u64 {
    10_000
}

fn default_target_batch_timeout() -> u64 {
    // 12 hours
    43_200_000
}

fn default_average_block_time() -> u64 {
    5_000
}

fn default_average_ethereum_block_time() -> u64 {
    15_000
}

fn default_slash_fraction() -> u64 {
    10
}

fn default_bridge_active() -> bool {
    true
}

impl Default for GravityParams {
    fn default() -> Self {
        GravityParams {
            gravity_id: default_gravity_id(),
            bridge_ethereum_address: zero_address(),
            bridge_chain_id: default_bridge_chain_id(),
            signed_valsets_window: default_signed_window(),
            signed_batches_window: default_signed_window(),
            signed_logic_calls_window: default_signed_window(),
            target_batch_timeout: default_target_batch_timeout(),
            average_block_time: default_average_block_time(),
            average_ethereum_block_time: default_average_ethereum_block_time(),
            slash_fraction_valset: default_slash_fraction(),
            slash_fraction_batch: default_slash_fraction(),
            slash_fraction_logic_call: default_slash_fraction(),
            slash_fraction_bad_eth_signature: default_slash_fraction(),
            unbond_slashing_valsets_window: default_signed_window(),
            valset_reward: None,
            bridge_active: default_bridge_active(),
            ethereum_blacklist: Vec::new(),
            min_chain_fee_basis_points: 0,
        }
    }
}

const MAX_BASIS_POINTS: u64 = 10_000;

impl GravityParams {
    /// Reads params from a TOML file, any field not present takes its default
    pub fn load<P: AsRef<Path>>(path: P) -> Result<GravityParams, GravityError> {
        let contents = fs::read_to_string(path)?;
        GravityParams::from_toml_str(&contents)
    }

    pub fn from_toml_str(input: &str) -> Result<GravityParams, GravityError> {
        let params: GravityParams = toml::from_str(input)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), GravityError> {
        if self.gravity_id.is_empty() {
            return Err(GravityError::InvalidParams("empty gravity id".to_string()));
        }
        if self.gravity_id.len() > 32 {
            return Err(GravityError::InvalidParams(format!(
                "gravity id {} is longer than 32 bytes",
                self.gravity_id
            )));
        }
        if self.signed_valsets_window == 0
            || self.signed_batches_window == 0
            || self.signed_logic_calls_window == 0
        {
            return Err(GravityError::InvalidParams(
                "signed windows must be non zero".to_string(),
            ));
        }
        if self.average_block_time == 0 || self.average_ethereum_block_time == 0 {
            return Err(GravityError::InvalidParams(
                "block times must be non zero".to_string(),
            ));
        }
        if self.target_batch_timeout < self.average_ethereum_block_time {
            return Err(GravityError::InvalidParams(
                "batch timeout must be at least one Ethereum block".to_string(),
            ));
        }
        for (name, value) in [
            ("slash_fraction_valset", self.slash_fraction_valset),
            ("slash_fraction_batch", self.slash_fraction_batch),
            ("slash_fraction_logic_call", self.slash_fraction_logic_call),
            (
                "slash_fraction_bad_eth_signature",
                self.slash_fraction_bad_eth_signature,
            ),
            ("min_chain_fee_basis_points", self.min_chain_fee_basis_points),
        ]
        .iter()
        {
            if *value > MAX_BASIS_POINTS {
                return Err(GravityError::InvalidParams(format!(
                    "{} of {} is over {} basis points",
                    name, value, MAX_BASIS_POINTS
                )));
            }
        }
        if let Some(reward) = &self.valset_reward {
            if reward.denom.is_empty() || reward.amount == Uint256::from(0u8) {
                return Err(GravityError::InvalidParams(
                    "valset reward must have a denom and a non zero amount".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn is_blacklisted(&self, address: &EthAddress) -> bool {
        self.ethereum_blacklist.contains(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(GravityParams::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let params = GravityParams::from_toml_str(
            "gravity_id = \"testgravity\"\nsigned_batches_window = 20\nbridge_active = false\n",
        )
        .unwrap();
        assert_eq!(params.gravity_id, "testgravity");
        assert_eq!(params.signed_batches_window, 20);
        assert!(!params.bridge_active);
        assert_eq!(params.signed_valsets_window, 10_000);
        assert_eq!(params.average_ethereum_block_time, 15_000);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join("gravity_params_load_test.toml");
        fs::write(&path, "gravity_id = \"fromfile\"\nbridge_chain_id = 5\n").unwrap();
        let params = GravityParams::load(&path).unwrap();
        assert_eq!(params.gravity_id, "fromfile");
        assert_eq!(params.bridge_chain_id, 5);
        fs::remove_file(&path).unwrap();

        assert!(matches!(
            GravityParams::load(&path),
            Err(GravityError::IoError(_))
        ));
    }

    #[test]
    fn test_invalid_params() {
        let mut params = GravityParams {
            gravity_id: "a".repeat(33),
            ..Default::default()
        };
        assert!(params.validate().is_err());
        params.gravity_id = "a".repeat(32);
        assert!(params.validate().is_ok());
        params.slash_fraction_batch = 10_001;
        assert!(params.validate().is_err());
        assert!(GravityParams::from_toml_str("average_block_time = 0").is_err());
    }
}
