use clarity::private_key::ETHEREUM_SALT;
use clarity::Address as EthAddress;
use clarity::Signature as EthSignature;
use gravity_utils::error::GravityError;
use num256::Uint256;
use sha3::{Digest, Keccak256};

/// Parses a 65 byte r || s || v signature as submitted by Orchestrators, the
/// recovery id is accepted either as 0/1 or in the legacy 27/28 form
pub fn signature_from_bytes(input: &[u8]) -> Result<EthSignature, GravityError> {
    if input.len() != 65 {
        return Err(GravityError::InvalidSignature(format!(
            "signature must be 65 bytes, got {}",
            input.len()
        )));
    }
    let v = match input[64] {
        0 | 1 => input[64] == 1,
        27 | 28 => input[64] == 28,
        other => {
            return Err(GravityError::InvalidSignature(format!(
                "invalid recovery id {}",
                other
            )))
        }
    };
    let sig = EthSignature::new(
        v,
        Uint256::from_be_bytes(&input[0..32]),
        Uint256::from_be_bytes(&input[32..64]),
    );
    if !sig.is_valid() {
        return Err(GravityError::InvalidSignature(
            "signature values out of range".to_string(),
        ));
    }
    Ok(sig)
}

/// Recovers the Ethereum address that produced `signature` over a checkpoint hash,
/// the Ethereum signed message prefix is applied during recovery
pub fn signature_to_eth_address(
    checkpoint: &[u8],
    signature: &EthSignature,
) -> Result<EthAddress, GravityError> {
    let digest = Keccak256::digest([ETHEREUM_SALT.as_bytes(), checkpoint].concat());
    Ok(signature.recover(&digest)?)
}

/// Errors unless `signature` over `checkpoint` was produced by `claimed`
pub fn verify_signature(
    checkpoint: &[u8],
    signature: &EthSignature,
    claimed: EthAddress,
) -> Result<(), GravityError> {
    let signer = signature_to_eth_address(checkpoint, signature)?;
    if signer != claimed {
        trace!("Signature recovered to {} expected {}", signer, claimed);
        return Err(GravityError::InvalidSignature(format!(
            "signature is from {} not {}",
            signer, claimed
        )));
    }
    Ok(())
}
