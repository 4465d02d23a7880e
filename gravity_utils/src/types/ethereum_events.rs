//! The claims Orchestrators submit to the Gravity module after observing an event emitted
//! by the Gravity contract on Ethereum. Every claim kind is a plain struct implementing
//! [ClaimVariant], the [EthereumClaim] enum wraps them and routes every accessor through
//! a single match in `EthereumClaim::variant`, so adding a claim kind is one struct, one
//! impl and one match arm.

use super::ValsetMember;
use crate::error::GravityError;
use clarity::Address as EthAddress;
use deep_space::utils::bytes_to_hex_str;
use deep_space::Address as CosmosAddress;
use num256::Uint256;
use sha3::{Digest, Keccak256};
use std::fmt;

/// Used to limit the length of variable length user provided inputs like
/// ERC20 names and deposit destination strings
const ONE_MEGABYTE: usize = 1000usize.pow(2);

/// Joins fields as `<len>:<field>` so no field value can shift a boundary
fn join_fields(fields: &[&dyn fmt::Display]) -> String {
    fields
        .iter()
        .map(|field| {
            let field = field.to_string();
            format!("{}:{}", field.len(), field)
        })
        .collect()
}

/// The discriminant of an [EthereumClaim], the string form is what events and
/// attestation records carry
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimType {
    SendToCosmos,
    BatchSendToEth,
    Erc20Deployed,
    LogicCallExecuted,
    ValsetUpdated,
}

impl ClaimType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimType::SendToCosmos => "CLAIM_TYPE_SEND_TO_COSMOS",
            ClaimType::BatchSendToEth => "CLAIM_TYPE_BATCH_SEND_TO_ETH",
            ClaimType::Erc20Deployed => "CLAIM_TYPE_ERC20_DEPLOYED",
            ClaimType::LogicCallExecuted => "CLAIM_TYPE_LOGIC_CALL_EXECUTED",
            ClaimType::ValsetUpdated => "CLAIM_TYPE_VALSET_UPDATED",
        }
    }
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The per kind behavior every claim provides
pub trait ClaimVariant {
    fn claim_type(&self) -> ClaimType;
    fn get_event_nonce(&self) -> u64;
    fn get_eth_block_height(&self) -> u64;
    /// The orchestrator that submitted this claim
    fn get_claimer(&self) -> &CosmosAddress;
    /// Canonical string of every field that describes the Ethereum event, the
    /// claimer is excluded so all honest validators produce the same value
    fn hash_fields(&self) -> String;
    /// Kind specific well formedness checks
    fn validate(&self) -> Result<(), GravityError>;
}

/// Someone deposited tokens into the Gravity contract to be sent to a Cosmos address
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SendToCosmosClaim {
    pub event_nonce: u64,
    pub eth_block_height: u64,
    pub token_contract: EthAddress,
    pub amount: Uint256,
    pub ethereum_sender: EthAddress,
    /// raw destination from the Ethereum contract, may be provided by an attacker
    /// and is only parsed when the claim is applied
    pub cosmos_receiver: String,
    pub orchestrator: CosmosAddress,
}

impl ClaimVariant for SendToCosmosClaim {
    fn claim_type(&self) -> ClaimType {
        ClaimType::SendToCosmos
    }
    fn get_event_nonce(&self) -> u64 {
        self.event_nonce
    }
    fn get_eth_block_height(&self) -> u64 {
        self.eth_block_height
    }
    fn get_claimer(&self) -> &CosmosAddress {
        &self.orchestrator
    }
    fn hash_fields(&self) -> String {
        join_fields(&[
            &self.event_nonce,
            &self.eth_block_height,
            &self.token_contract,
            &self.amount,
            &self.ethereum_sender,
            &self.cosmos_receiver,
        ])
    }
    fn validate(&self) -> Result<(), GravityError> {
        if self.cosmos_receiver.len() > ONE_MEGABYTE {
            return Err(GravityError::InvalidArgument(
                "Cosmos receiver too long".to_string(),
            ));
        }
        Ok(())
    }
}

/// A batch of outgoing transfers was executed on Ethereum
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BatchSendToEthClaim {
    pub event_nonce: u64,
    pub eth_block_height: u64,
    pub batch_nonce: u64,
    pub token_contract: EthAddress,
    pub orchestrator: CosmosAddress,
}

impl ClaimVariant for BatchSendToEthClaim {
    fn claim_type(&self) -> ClaimType {
        ClaimType::BatchSendToEth
    }
    fn get_event_nonce(&self) -> u64 {
        self.event_nonce
    }
    fn get_eth_block_height(&self) -> u64 {
        self.eth_block_height
    }
    fn get_claimer(&self) -> &CosmosAddress {
        &self.orchestrator
    }
    fn hash_fields(&self) -> String {
        join_fields(&[
            &self.event_nonce,
            &self.eth_block_height,
            &self.batch_nonce,
            &self.token_contract,
        ])
    }
    fn validate(&self) -> Result<(), GravityError> {
        if self.batch_nonce == 0 {
            return Err(GravityError::InvalidArgument(
                "Batch nonce can not be zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// The Gravity contract deployed an ERC20 representing a Cosmos denom
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Erc20DeployedClaim {
    pub event_nonce: u64,
    pub eth_block_height: u64,
    pub cosmos_denom: String,
    pub token_contract: EthAddress,
    pub name: String,
    pub symbol: String,
    pub decimals: u64,
    pub orchestrator: CosmosAddress,
}

impl ClaimVariant for Erc20DeployedClaim {
    fn claim_type(&self) -> ClaimType {
        ClaimType::Erc20Deployed
    }
    fn get_event_nonce(&self) -> u64 {
        self.event_nonce
    }
    fn get_eth_block_height(&self) -> u64 {
        self.eth_block_height
    }
    fn get_claimer(&self) -> &CosmosAddress {
        &self.orchestrator
    }
    fn hash_fields(&self) -> String {
        join_fields(&[
            &self.event_nonce,
            &self.eth_block_height,
            &self.cosmos_denom,
            &self.token_contract,
            &self.name,
            &self.symbol,
            &self.decimals,
        ])
    }
    fn validate(&self) -> Result<(), GravityError> {
        if self.cosmos_denom.is_empty() {
            return Err(GravityError::InvalidArgument(
                "Empty cosmos denom".to_string(),
            ));
        }
        if self.cosmos_denom.len() + self.name.len() + self.symbol.len() > ONE_MEGABYTE {
            return Err(GravityError::InvalidArgument(
                "ERC20 metadata too long".to_string(),
            ));
        }
        if self.decimals > u8::MAX as u64 {
            return Err(GravityError::InvalidArgument(format!(
                "Invalid ERC20 decimals {}",
                self.decimals
            )));
        }
        Ok(())
    }
}

/// An outgoing logic call was executed on Ethereum
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LogicCallExecutedClaim {
    pub event_nonce: u64,
    pub eth_block_height: u64,
    pub invalidation_id: Vec<u8>,
    pub invalidation_nonce: u64,
    pub orchestrator: CosmosAddress,
}

impl ClaimVariant for LogicCallExecutedClaim {
    fn claim_type(&self) -> ClaimType {
        ClaimType::LogicCallExecuted
    }
    fn get_event_nonce(&self) -> u64 {
        self.event_nonce
    }
    fn get_eth_block_height(&self) -> u64 {
        self.eth_block_height
    }
    fn get_claimer(&self) -> &CosmosAddress {
        &self.orchestrator
    }
    fn hash_fields(&self) -> String {
        join_fields(&[
            &self.event_nonce,
            &self.eth_block_height,
            &bytes_to_hex_str(&self.invalidation_id),
            &self.invalidation_nonce,
        ])
    }
    fn validate(&self) -> Result<(), GravityError> {
        if self.invalidation_id.is_empty() || self.invalidation_id.len() > 32 {
            return Err(GravityError::InvalidArgument(
                "Invalidation id must be between 1 and 32 bytes".to_string(),
            ));
        }
        Ok(())
    }
}

/// The validator set on the Gravity contract was updated
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ValsetUpdatedClaim {
    pub event_nonce: u64,
    pub valset_nonce: u64,
    pub eth_block_height: u64,
    pub members: Vec<ValsetMember>,
    pub reward_amount: Uint256,
    pub reward_token: Option<EthAddress>,
    pub orchestrator: CosmosAddress,
}

impl ClaimVariant for ValsetUpdatedClaim {
    fn claim_type(&self) -> ClaimType {
        ClaimType::ValsetUpdated
    }
    fn get_event_nonce(&self) -> u64 {
        self.event_nonce
    }
    fn get_eth_block_height(&self) -> u64 {
        self.eth_block_height
    }
    fn get_claimer(&self) -> &CosmosAddress {
        &self.orchestrator
    }
    fn hash_fields(&self) -> String {
        let reward_token = match self.reward_token {
            Some(token) => token.to_string(),
            None => "none".to_string(),
        };
        join_fields(&[
            &self.event_nonce,
            &self.valset_nonce,
            &self.eth_block_height,
            &ValsetMember::display_vec(&self.members),
            &self.reward_amount,
            &reward_token,
        ])
    }
    fn validate(&self) -> Result<(), GravityError> {
        if self.members.is_empty() {
            return Err(GravityError::InvalidArgument(
                "Valset update with no members".to_string(),
            ));
        }
        Ok(())
    }
}

/// Any claim an Orchestrator may submit about the Ethereum chain
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum EthereumClaim {
    SendToCosmos(SendToCosmosClaim),
    BatchSendToEth(BatchSendToEthClaim),
    Erc20Deployed(Erc20DeployedClaim),
    LogicCallExecuted(LogicCallExecutedClaim),
    ValsetUpdated(ValsetUpdatedClaim),
}

impl EthereumClaim {
    fn variant(&self) -> &dyn ClaimVariant {
        match self {
            EthereumClaim::SendToCosmos(c) => c,
            EthereumClaim::BatchSendToEth(c) => c,
            EthereumClaim::Erc20Deployed(c) => c,
            EthereumClaim::LogicCallExecuted(c) => c,
            EthereumClaim::ValsetUpdated(c) => c,
        }
    }

    pub fn get_type(&self) -> ClaimType {
        self.variant().claim_type()
    }

    pub fn get_event_nonce(&self) -> u64 {
        self.variant().get_event_nonce()
    }

    pub fn get_eth_block_height(&self) -> u64 {
        self.variant().get_eth_block_height()
    }

    pub fn get_claimer(&self) -> &CosmosAddress {
        self.variant().get_claimer()
    }

    /// Keccak256 of the canonical event fields, identical for every validator
    /// describing the same Ethereum event
    pub fn claim_hash(&self) -> Vec<u8> {
        let fields = join_fields(&[&self.get_type(), &self.variant().hash_fields()]);
        Keccak256::digest(fields.as_bytes()).to_vec()
    }

    /// Stateless checks performed before a claim reaches the attestation engine
    pub fn validate_basic(&self) -> Result<(), GravityError> {
        if self.get_event_nonce() == 0 {
            return Err(GravityError::InvalidArgument(
                "Event nonce can not be zero".to_string(),
            ));
        }
        self.variant().validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deep_space::{CosmosPrivateKey, PrivateKey};

    fn orchestrator(seed: u8) -> CosmosAddress {
        CosmosPrivateKey::from_secret(&[seed; 32])
            .to_address("gravity")
            .unwrap()
    }

    fn deposit(orch: CosmosAddress) -> EthereumClaim {
        EthereumClaim::SendToCosmos(SendToCosmosClaim {
            event_nonce: 2,
            eth_block_height: 100,
            token_contract: "0x1bb537Aa56fFc7D608793BAFFC6c9C7De3c4F270"
                .parse()
                .unwrap(),
            amount: 100u8.into(),
            ethereum_sender: "0x906313229CFB30959b39A5946099e4526625CBD4"
                .parse()
                .unwrap(),
            cosmos_receiver: "gravity1194za6yvg7djz3c6vqlcxzxwcjkaz9rdqs2eg9p".to_string(),
            orchestrator: orch,
        })
    }

    #[test]
    fn test_claim_hash_excludes_claimer() {
        let a = deposit(orchestrator(1));
        let b = deposit(orchestrator(2));
        assert_ne!(a.get_claimer(), b.get_claimer());
        assert_eq!(a.claim_hash(), b.claim_hash());
        assert_eq!(a.claim_hash().len(), 32);
        assert_eq!(a.get_type(), ClaimType::SendToCosmos);
    }

    #[test]
    fn test_claim_hash_covers_event_fields() {
        let a = deposit(orchestrator(1));
        let mut b = a.clone();
        if let EthereumClaim::SendToCosmos(ref mut inner) = b {
            inner.amount = 101u8.into();
        }
        assert_ne!(a.claim_hash(), b.claim_hash());
    }

    #[test]
    fn test_claim_hash_keeps_field_boundaries() {
        let deployed = |denom: &str, name: &str| {
            EthereumClaim::Erc20Deployed(Erc20DeployedClaim {
                event_nonce: 3,
                eth_block_height: 100,
                cosmos_denom: denom.to_string(),
                token_contract: "0x1bb537Aa56fFc7D608793BAFFC6c9C7De3c4F270"
                    .parse()
                    .unwrap(),
                name: name.to_string(),
                symbol: "FOO".to_string(),
                decimals: 6,
                orchestrator: orchestrator(1),
            })
        };
        let a = deployed("ibc/foo", "bar");
        let b = deployed("ibc", "foo/bar");
        assert_ne!(a.claim_hash(), b.claim_hash());
        assert_eq!(a.claim_hash(), deployed("ibc/foo", "bar").claim_hash());
    }

    #[test]
    fn test_validate_basic() {
        let orch = orchestrator(1);
        assert!(deposit(orch.clone()).validate_basic().is_ok());

        let zero_nonce = EthereumClaim::BatchSendToEth(BatchSendToEthClaim {
            event_nonce: 0,
            eth_block_height: 1,
            batch_nonce: 1,
            token_contract: "0x1bb537Aa56fFc7D608793BAFFC6c9C7De3c4F270"
                .parse()
                .unwrap(),
            orchestrator: orch.clone(),
        });
        assert!(zero_nonce.validate_basic().is_err());

        let long_id = EthereumClaim::LogicCallExecuted(LogicCallExecutedClaim {
            event_nonce: 1,
            eth_block_height: 1,
            invalidation_id: vec![1u8; 33],
            invalidation_nonce: 1,
            orchestrator: orch,
        });
        assert!(long_id.validate_basic().is_err());
    }
}
