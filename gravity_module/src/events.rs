//! Typed events emitted for downstream relayers and indexers

use clarity::Address as EthAddress;
use deep_space::Address as CosmosAddress;
use gravity_utils::types::ClaimType;
use num256::Uint256;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum GravityEvent {
    /// an attestation reached the voting power threshold
    Observation {
        attestation_type: ClaimType,
        bridge_contract: EthAddress,
        bridge_chain_id: u64,
        attestation_id: Vec<u8>,
        nonce: u64,
    },
    /// a single validator's vote was recorded
    Claim {
        claim_type: ClaimType,
        claim_hash: Vec<u8>,
        attestation_id: Vec<u8>,
    },
    OutgoingBatch {
        bridge_contract: EthAddress,
        bridge_chain_id: u64,
        batch_nonce: u64,
        token_contract: EthAddress,
        batch_timeout: u64,
    },
    OutgoingBatchCanceled {
        bridge_contract: EthAddress,
        bridge_chain_id: u64,
        batch_nonce: u64,
        token_contract: EthAddress,
    },
    /// a new valset was stored and needs signatures
    MultisigUpdateRequest {
        bridge_contract: EthAddress,
        bridge_chain_id: u64,
        valset_nonce: u64,
        event_nonce: u64,
    },
    OutgoingLogicCall {
        invalidation_id: Vec<u8>,
        invalidation_nonce: u64,
    },
    OutgoingLogicCallCanceled {
        invalidation_id: Vec<u8>,
        invalidation_nonce: u64,
    },
    BridgeWithdrawalReceived {
        bridge_contract: EthAddress,
        bridge_chain_id: u64,
        outgoing_tx_id: u64,
    },
    BridgeWithdrawCanceled {
        bridge_contract: EthAddress,
        bridge_chain_id: u64,
        sender: CosmosAddress,
        tx_id: u64,
    },
    SetOrchestratorAddress {
        validator: CosmosAddress,
        orchestrator: CosmosAddress,
        eth_address: EthAddress,
    },
    /// store key of a newly stored confirm
    ConfirmKey { key: Vec<u8> },
    SendToCosmos {
        amount: Uint256,
        token_contract: EthAddress,
        event_nonce: u64,
    },
    InvalidSendToCosmosReceiver {
        amount: Uint256,
        token_contract: EthAddress,
        ethereum_sender: EthAddress,
        event_nonce: u64,
    },
    SignatureSlashing {
        subject: String,
        validator: CosmosAddress,
        nonce: u64,
    },
    BadSignatureEvidence {
        subject_checkpoint: Vec<u8>,
        validator: CosmosAddress,
    },
}
