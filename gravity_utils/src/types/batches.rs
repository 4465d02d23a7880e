use super::*;
use clarity::Signature as EthSignature;
use clarity::Uint256;
use clarity::{abi::AbiToken as Token, Address as EthAddress};
use deep_space::Address as CosmosAddress;

/// This represents an individual transaction being bridged over to Ethereum,
/// while it sits in the pool it is indexed by token, fee and id
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OutgoingTransferTx {
    /// This transactions Cosmos pool id
    pub id: u64,
    /// The senders Cosmos address
    pub sender: CosmosAddress,
    pub destination: EthAddress,
    /// The amount being bridged, must be of the same
    /// ERC20 type as erc20_fee
    pub erc20_token: Erc20Token,
    /// The fee that is being paid, must be of the same
    /// ERC20 type as erc20_token
    pub erc20_fee: Erc20Token,
}

impl OutgoingTransferTx {
    /// The token contract shared by the amount and the fee
    pub fn token_contract(&self) -> EthAddress {
        self.erc20_token.token_contract_address
    }

    /// amount plus fee, what the sender paid into the module
    pub fn total(&self) -> Uint256 {
        self.erc20_token.amount + self.erc20_fee.amount
    }
}

/// A set of transfers of a single token that may be brought over the bridge
/// to Ethereum as a single operation paid for by a relayer
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OutgoingTxBatch {
    /// This batches nonce, unique across all tokens
    pub nonce: u64,
    /// this batches timeout value in terms of Ethereum block height
    pub batch_timeout: u64,
    /// transactions contained in this batch
    pub transactions: Vec<OutgoingTransferTx>,
    /// the ERC20 token contract shared by all transactions
    /// and fees in this batch
    pub token_contract: EthAddress,
    /// the Cosmos block height at which this batch was created
    pub block_created: u64,
}

impl OutgoingTxBatch {
    /// the total of the erc20_fee values in transactions
    pub fn total_fee(&self) -> Erc20Token {
        let mut amount: Uint256 = 0u8.into();
        for tx in self.transactions.iter() {
            amount += tx.erc20_fee.amount;
        }
        Erc20Token::new(amount, self.token_contract)
    }

    /// extracts the amounts, destinations and fees as submitted to the Ethereum contract
    /// and used for signatures
    pub fn get_checkpoint_values(&self) -> (Token, Token, Token) {
        let mut amounts = Vec::new();
        let mut destinations = Vec::new();
        let mut fees = Vec::new();
        for item in self.transactions.iter() {
            amounts.push(Token::Uint(item.erc20_token.amount));
            fees.push(Token::Uint(item.erc20_fee.amount));
            destinations.push(item.destination)
        }
        (
            Token::Dynamic(amounts),
            destinations.into(),
            Token::Dynamic(fees),
        )
    }
}

/// A validator's signature over a batch checkpoint, submitted by its orchestrator
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BatchConfirm {
    pub nonce: u64,
    pub token_contract: EthAddress,
    pub orchestrator: CosmosAddress,
    pub ethereum_signer: EthAddress,
    pub eth_signature: EthSignature,
}

impl Confirm for BatchConfirm {
    fn get_eth_address(&self) -> EthAddress {
        self.ethereum_signer
    }
    fn get_signature(&self) -> EthSignature {
        self.eth_signature.clone()
    }
}
