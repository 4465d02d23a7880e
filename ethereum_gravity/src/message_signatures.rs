use clarity::abi::{encode_tokens, AbiToken as Token};
use clarity::constants::zero_address;
use gravity_utils::types::{OutgoingLogicCall, OutgoingTxBatch, Valset};
use sha3::{Digest, Keccak256};

// The encodings below are the argument block of the matching Gravity.sol call,
// equal to the ABI encoded call with its 4 byte selector stripped. This is exactly
// what the contract hashes when it checks signatures.

/// takes the required input data and produces the required signature to confirm a validator
/// set update on the Gravity Ethereum contract. This value will then be signed before being
/// submitted to Cosmos, verified, and then relayed to Ethereum
pub fn encode_valset_confirm(gravity_id: &str, valset: &Valset) -> Vec<u8> {
    let (eth_addresses, powers) = valset.to_arrays();
    // the zero address represents 'no reward'
    let reward_token = valset.reward_token.unwrap_or_else(zero_address);
    encode_tokens(&[
        Token::FixedString(gravity_id.to_string()),
        Token::FixedString("checkpoint".to_string()),
        valset.nonce.into(),
        eth_addresses.into(),
        powers.into(),
        valset.reward_amount.into(),
        reward_token.into(),
    ])
}

pub fn encode_valset_confirm_hashed(gravity_id: &str, valset: &Valset) -> Vec<u8> {
    let digest = Keccak256::digest(&encode_valset_confirm(gravity_id, valset));
    digest.to_vec()
}

/// the checkpoint of a transaction batch, token contract and timeout included so a
/// batch can not be replayed for a different token or after it has expired
pub fn encode_tx_batch_confirm(gravity_id: &str, batch: &OutgoingTxBatch) -> Vec<u8> {
    let (amounts, destinations, fees) = batch.get_checkpoint_values();
    encode_tokens(&[
        Token::FixedString(gravity_id.to_string()),
        Token::FixedString("transactionBatch".to_string()),
        amounts,
        destinations,
        fees,
        batch.nonce.into(),
        batch.token_contract.into(),
        batch.batch_timeout.into(),
    ])
}

pub fn encode_logic_call_confirm(gravity_id: &str, call: &OutgoingLogicCall) -> Vec<u8> {
    let (transfer_amounts, transfer_token_contracts, fee_amounts, fee_token_contracts) =
        call.get_checkpoint_values();
    encode_tokens(&[
        Token::FixedString(gravity_id.to_string()), // Gravity Instance ID
        Token::FixedString("logicCall".to_string()), //Function Name
        transfer_amounts,                           //Array of Transfer amounts
        transfer_token_contracts,                   //ERC-20 contract for transfers
        fee_amounts,                                // Array of Fees
        fee_token_contracts,                        // ERC-20 contract for fee payments
        call.logic_contract_address.into(),         // Address of a logic contract
        Token::UnboundedBytes(call.payload.clone()), // Encoded arguments to logic contract
        call.timeout.into(),                        // Timeout on batch
        Token::Bytes(call.invalidation_id.clone()), // Scope of logic batch
        call.invalidation_nonce.into(),             // Nonce of logic batch. See 2-d nonce scheme.
    ])
}

/// Anything the validator set signs for execution on Ethereum
pub trait EthereumSigned {
    /// the message validators sign with sign_ethereum_msg
    fn get_signing_message(&self, gravity_id: &str) -> Vec<u8>;

    /// the keccak256 hash of the signing message, what signatures are recovered against
    fn get_checkpoint(&self, gravity_id: &str) -> Vec<u8> {
        Keccak256::digest(&self.get_signing_message(gravity_id)).to_vec()
    }
}

impl EthereumSigned for Valset {
    fn get_signing_message(&self, gravity_id: &str) -> Vec<u8> {
        encode_valset_confirm(gravity_id, self)
    }
}

impl EthereumSigned for OutgoingTxBatch {
    fn get_signing_message(&self, gravity_id: &str) -> Vec<u8> {
        encode_tx_batch_confirm(gravity_id, self)
    }
}

impl EthereumSigned for OutgoingLogicCall {
    fn get_signing_message(&self, gravity_id: &str) -> Vec<u8> {
        encode_logic_call_confirm(gravity_id, self)
    }
}
