use super::*;
use clarity::Signature as EthSignature;
use clarity::{abi::AbiToken as Token, Address as EthAddress};
use deep_space::Address as CosmosAddress;

/// An arbitrary call to a logic contract on Ethereum, funded with transfers from
/// the bridge and scoped by an invalidation id and nonce
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct OutgoingLogicCall {
    /// funds sent to the Logic contract for it's use
    pub transfers: Vec<Erc20Token>,
    /// individual token payments made on Ethereum to the relayer
    pub fees: Vec<Erc20Token>,
    pub logic_contract_address: EthAddress,
    pub payload: Vec<u8>,
    pub timeout: u64,
    pub invalidation_id: Vec<u8>,
    pub invalidation_nonce: u64,
    /// the Cosmos block height at which this call was created
    pub block_created: u64,
}

impl OutgoingLogicCall {
    /// Splits transfers and fees into the parallel amount/contract arrays
    /// the Ethereum contract takes
    pub fn get_checkpoint_values(&self) -> (Token, Token, Token, Token) {
        let mut transfer_amounts = Vec::new();
        let mut transfer_token_contracts = Vec::new();
        let mut fee_amounts = Vec::new();
        let mut fee_token_contracts = Vec::new();
        for item in self.transfers.iter() {
            transfer_amounts.push(Token::Uint(item.amount));
            transfer_token_contracts.push(item.token_contract_address);
        }
        for item in self.fees.iter() {
            fee_amounts.push(Token::Uint(item.amount));
            fee_token_contracts.push(item.token_contract_address);
        }
        (
            Token::Dynamic(transfer_amounts),
            transfer_token_contracts.into(),
            Token::Dynamic(fee_amounts),
            fee_token_contracts.into(),
        )
    }
}

/// A validator's signature over a logic call checkpoint
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogicCallConfirm {
    pub invalidation_id: Vec<u8>,
    pub invalidation_nonce: u64,
    pub ethereum_signer: EthAddress,
    pub orchestrator: CosmosAddress,
    pub eth_signature: EthSignature,
}

impl Confirm for LogicCallConfirm {
    fn get_eth_address(&self) -> EthAddress {
        self.ethereum_signer
    }
    fn get_signature(&self) -> EthSignature {
        self.eth_signature.clone()
    }
}
