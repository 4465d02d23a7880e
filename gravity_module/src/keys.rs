//! Store key layout. Integers are big endian so byte order matches numeric order,
//! amounts inside keys are fixed 32 byte big endian.

use clarity::Address as EthAddress;
use deep_space::Address as CosmosAddress;
use gravity_utils::num_conversion::uint256_to_key_bytes;
use num256::Uint256;

/// orchestrator -> validator operator
pub const VALIDATOR_BY_ORCHESTRATOR_PREFIX: &[u8] = &[0x01];
/// validator operator -> orchestrator
pub const ORCHESTRATOR_BY_VALIDATOR_PREFIX: &[u8] = &[0x02];
/// validator operator -> ethereum address
pub const ETH_ADDRESS_BY_VALIDATOR_PREFIX: &[u8] = &[0x03];
/// ethereum address -> validator operator
pub const VALIDATOR_BY_ETH_ADDRESS_PREFIX: &[u8] = &[0x04];
pub const ATTESTATION_PREFIX: &[u8] = &[0x05];
pub const LAST_EVENT_NONCE_BY_VALIDATOR_PREFIX: &[u8] = &[0x06];
pub const LAST_OBSERVED_EVENT_NONCE_KEY: &[u8] = &[0x07];
pub const LAST_OBSERVED_ETHEREUM_HEIGHT_KEY: &[u8] = &[0x08];
pub const VALSET_PREFIX: &[u8] = &[0x09];
pub const VALSET_CONFIRM_PREFIX: &[u8] = &[0x0a];
pub const LATEST_VALSET_NONCE_KEY: &[u8] = &[0x0b];
pub const LAST_OBSERVED_VALSET_KEY: &[u8] = &[0x0c];
pub const OUTGOING_TX_POOL_PREFIX: &[u8] = &[0x0d];
pub const LAST_TX_POOL_ID_KEY: &[u8] = &[0x0e];
pub const OUTGOING_BATCH_PREFIX: &[u8] = &[0x0f];
pub const OUTGOING_BATCH_BY_BLOCK_PREFIX: &[u8] = &[0x10];
pub const LAST_BATCH_NONCE_KEY: &[u8] = &[0x11];
pub const BATCH_CONFIRM_PREFIX: &[u8] = &[0x12];
pub const LOGIC_CALL_PREFIX: &[u8] = &[0x13];
pub const LOGIC_CALL_CONFIRM_PREFIX: &[u8] = &[0x14];
pub const PAST_CHECKPOINT_PREFIX: &[u8] = &[0x15];
pub const LAST_SLASHED_VALSET_NONCE_KEY: &[u8] = &[0x16];
pub const LAST_SLASHED_BATCH_BLOCK_KEY: &[u8] = &[0x17];
pub const LAST_SLASHED_LOGIC_CALL_BLOCK_KEY: &[u8] = &[0x18];
pub const LAST_UNBONDING_BLOCK_HEIGHT_KEY: &[u8] = &[0x19];
pub const DENOM_TO_ERC20_PREFIX: &[u8] = &[0x1a];
pub const ERC20_TO_DENOM_PREFIX: &[u8] = &[0x1b];
pub const PARAMS_KEY: &[u8] = &[0x1c];
/// keccak(checkpoint || signature) of evidence that already led to a slash
pub const BAD_SIGNATURE_EVIDENCE_PREFIX: &[u8] = &[0x1d];

fn join(parts: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for part in parts {
        out.extend_from_slice(part);
    }
    out
}

pub fn validator_by_orchestrator_key(orchestrator: &CosmosAddress) -> Vec<u8> {
    join(&[VALIDATOR_BY_ORCHESTRATOR_PREFIX, orchestrator.get_bytes()])
}

pub fn orchestrator_by_validator_key(validator: &CosmosAddress) -> Vec<u8> {
    join(&[ORCHESTRATOR_BY_VALIDATOR_PREFIX, validator.get_bytes()])
}

pub fn eth_address_by_validator_key(validator: &CosmosAddress) -> Vec<u8> {
    join(&[ETH_ADDRESS_BY_VALIDATOR_PREFIX, validator.get_bytes()])
}

pub fn validator_by_eth_address_key(eth_address: &EthAddress) -> Vec<u8> {
    join(&[VALIDATOR_BY_ETH_ADDRESS_PREFIX, eth_address.as_bytes()])
}

pub fn attestation_nonce_prefix(event_nonce: u64) -> Vec<u8> {
    join(&[ATTESTATION_PREFIX, &event_nonce.to_be_bytes()])
}

/// also used as the attestation id in events
pub fn attestation_key(event_nonce: u64, claim_hash: &[u8]) -> Vec<u8> {
    join(&[ATTESTATION_PREFIX, &event_nonce.to_be_bytes(), claim_hash])
}

pub fn last_event_nonce_by_validator_key(validator: &CosmosAddress) -> Vec<u8> {
    join(&[LAST_EVENT_NONCE_BY_VALIDATOR_PREFIX, validator.get_bytes()])
}

pub fn valset_key(nonce: u64) -> Vec<u8> {
    join(&[VALSET_PREFIX, &nonce.to_be_bytes()])
}

pub fn valset_confirm_nonce_prefix(nonce: u64) -> Vec<u8> {
    join(&[VALSET_CONFIRM_PREFIX, &nonce.to_be_bytes()])
}

pub fn valset_confirm_key(nonce: u64, orchestrator: &CosmosAddress) -> Vec<u8> {
    join(&[
        VALSET_CONFIRM_PREFIX,
        &nonce.to_be_bytes(),
        orchestrator.get_bytes(),
    ])
}

pub fn outgoing_tx_pool_token_prefix(token_contract: &EthAddress) -> Vec<u8> {
    join(&[OUTGOING_TX_POOL_PREFIX, token_contract.as_bytes()])
}

pub fn outgoing_tx_pool_key(token_contract: &EthAddress, fee: Uint256, id: u64) -> Vec<u8> {
    join(&[
        OUTGOING_TX_POOL_PREFIX,
        token_contract.as_bytes(),
        &uint256_to_key_bytes(fee),
        &id.to_be_bytes(),
    ])
}

pub fn outgoing_batch_token_prefix(token_contract: &EthAddress) -> Vec<u8> {
    join(&[OUTGOING_BATCH_PREFIX, token_contract.as_bytes()])
}

pub fn outgoing_batch_key(token_contract: &EthAddress, nonce: u64) -> Vec<u8> {
    join(&[
        OUTGOING_BATCH_PREFIX,
        token_contract.as_bytes(),
        &nonce.to_be_bytes(),
    ])
}

/// secondary index, lets the slashing cursor walk batches in creation order
pub fn outgoing_batch_by_block_key(
    block_created: u64,
    token_contract: &EthAddress,
    nonce: u64,
) -> Vec<u8> {
    join(&[
        OUTGOING_BATCH_BY_BLOCK_PREFIX,
        &block_created.to_be_bytes(),
        token_contract.as_bytes(),
        &nonce.to_be_bytes(),
    ])
}

pub fn batch_confirm_batch_prefix(token_contract: &EthAddress, nonce: u64) -> Vec<u8> {
    join(&[
        BATCH_CONFIRM_PREFIX,
        token_contract.as_bytes(),
        &nonce.to_be_bytes(),
    ])
}

pub fn batch_confirm_key(
    token_contract: &EthAddress,
    nonce: u64,
    orchestrator: &CosmosAddress,
) -> Vec<u8> {
    join(&[
        BATCH_CONFIRM_PREFIX,
        token_contract.as_bytes(),
        &nonce.to_be_bytes(),
        orchestrator.get_bytes(),
    ])
}

/// The invalidation id is caller chosen and variable length, its length goes in
/// front of it so no id can be a byte prefix of another id's keys
fn invalidation_id_segment(invalidation_id: &[u8]) -> Vec<u8> {
    join(&[&(invalidation_id.len() as u32).to_be_bytes(), invalidation_id])
}

pub fn logic_call_key(invalidation_id: &[u8], invalidation_nonce: u64) -> Vec<u8> {
    join(&[
        LOGIC_CALL_PREFIX,
        &invalidation_id_segment(invalidation_id),
        &invalidation_nonce.to_be_bytes(),
    ])
}

pub fn logic_call_confirm_call_prefix(invalidation_id: &[u8], invalidation_nonce: u64) -> Vec<u8> {
    join(&[
        LOGIC_CALL_CONFIRM_PREFIX,
        &invalidation_id_segment(invalidation_id),
        &invalidation_nonce.to_be_bytes(),
    ])
}

pub fn logic_call_confirm_key(
    invalidation_id: &[u8],
    invalidation_nonce: u64,
    orchestrator: &CosmosAddress,
) -> Vec<u8> {
    join(&[
        LOGIC_CALL_CONFIRM_PREFIX,
        &invalidation_id_segment(invalidation_id),
        &invalidation_nonce.to_be_bytes(),
        orchestrator.get_bytes(),
    ])
}

pub fn past_checkpoint_key(checkpoint: &[u8]) -> Vec<u8> {
    join(&[PAST_CHECKPOINT_PREFIX, checkpoint])
}

pub fn denom_to_erc20_key(denom: &str) -> Vec<u8> {
    join(&[DENOM_TO_ERC20_PREFIX, denom.as_bytes()])
}

pub fn erc20_to_denom_key(token_contract: &EthAddress) -> Vec<u8> {
    join(&[ERC20_TO_DENOM_PREFIX, token_contract.as_bytes()])
}

pub fn bad_signature_evidence_key(evidence_hash: &[u8]) -> Vec<u8> {
    join(&[BAD_SIGNATURE_EVIDENCE_PREFIX, evidence_hash])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_key_orders_by_fee_then_id() {
        let token: EthAddress = "0x038B86d9d8FAFdd0a02ebd1A476432877b0107C8"
            .parse()
            .unwrap();
        let low_fee_high_id = outgoing_tx_pool_key(&token, 2u8.into(), 500);
        let high_fee_low_id = outgoing_tx_pool_key(&token, 3u8.into(), 1);
        let same_fee_higher_id = outgoing_tx_pool_key(&token, 3u8.into(), 2);
        assert!(low_fee_high_id < high_fee_low_id);
        assert!(high_fee_low_id < same_fee_higher_id);
        assert!(high_fee_low_id.starts_with(&outgoing_tx_pool_token_prefix(&token)));
        assert_eq!(high_fee_low_id.len(), 1 + 20 + 32 + 8);
    }

    #[test]
    fn test_attestation_keys_group_by_nonce() {
        let a = attestation_key(2, &[9u8; 32]);
        let b = attestation_key(10, &[0u8; 32]);
        assert!(a < b);
        assert!(a.starts_with(&attestation_nonce_prefix(2)));
        assert!(!b.starts_with(&attestation_nonce_prefix(2)));
    }

    #[test]
    fn test_invalidation_ids_never_share_a_prefix() {
        let short = logic_call_confirm_call_prefix(b"ab", 1);
        // "ab" followed by bytes that could spell the short id's nonce
        let mut long_id = b"ab".to_vec();
        long_id.extend_from_slice(&1u64.to_be_bytes());
        let long = logic_call_confirm_call_prefix(&long_id, 1);
        assert!(!long.starts_with(&short));
        assert!(!logic_call_key(&long_id, 1).starts_with(&logic_call_key(b"ab", 1)));
    }
}
