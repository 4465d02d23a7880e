//! The error type shared by every bridge crate

use clarity::Error as ClarityError;
use deep_space::error::AddressError as CosmosAddressError;
use std::fmt::{self, Debug};
use std::io::Error as IoError;

/// The recoverable error kind for every bridge operation. Returning one of these
/// means the operation made no state change that survives the call.
#[derive(Debug)]
pub enum GravityError {
    ClarityError(ClarityError),
    CosmosAddressError(CosmosAddressError),
    IoError(IoError),
    SerializationError(String),
    InvalidParams(String),
    InvalidArgument(String),
    NotFound(String),
    Duplicate(String),
    NonContiguousEventNonce { expected: u64, actual: u64 },
    NotMoreProfitable(String),
    Unauthorized(String),
    InvalidSignature(String),
    CheckpointExists,
    BridgeHalted,
    InsufficientFunds(String),
    ClaimHandlerError(String),
    InvalidBridgeStateError(String),
}

impl fmt::Display for GravityError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GravityError::ClarityError(val) => write!(f, "ClarityError {}", val),
            GravityError::CosmosAddressError(val) => write!(f, "Cosmos address error {}", val),
            GravityError::IoError(val) => write!(f, "IO error {}", val),
            GravityError::SerializationError(val) => write!(f, "Serialization error {}", val),
            GravityError::InvalidParams(val) => write!(f, "Invalid params {}", val),
            GravityError::InvalidArgument(val) => write!(f, "Invalid argument {}", val),
            GravityError::NotFound(val) => write!(f, "Not found {}", val),
            GravityError::Duplicate(val) => write!(f, "Duplicate {}", val),
            GravityError::NonContiguousEventNonce { expected, actual } => write!(
                f,
                "Non contiguous event nonce, expected {} got {}",
                expected, actual
            ),
            GravityError::NotMoreProfitable(val) => {
                write!(f, "New batch would not be more profitable {}", val)
            }
            GravityError::Unauthorized(val) => write!(f, "Unauthorized {}", val),
            GravityError::InvalidSignature(val) => write!(f, "Invalid signature {}", val),
            GravityError::CheckpointExists => write!(f, "Checkpoint exists, cannot slash"),
            GravityError::BridgeHalted => write!(f, "The bridge is currently halted"),
            GravityError::InsufficientFunds(val) => write!(f, "Insufficient funds {}", val),
            GravityError::ClaimHandlerError(val) => write!(f, "Claim handler failed {}", val),
            GravityError::InvalidBridgeStateError(val) => {
                write!(f, "Invalid bridge state! {}", val)
            }
        }
    }
}

impl std::error::Error for GravityError {}

impl From<ClarityError> for GravityError {
    fn from(error: ClarityError) -> Self {
        GravityError::ClarityError(error)
    }
}

impl From<CosmosAddressError> for GravityError {
    fn from(error: CosmosAddressError) -> Self {
        GravityError::CosmosAddressError(error)
    }
}

impl From<IoError> for GravityError {
    fn from(error: IoError) -> Self {
        GravityError::IoError(error)
    }
}

impl From<serde_json::Error> for GravityError {
    fn from(error: serde_json::Error) -> Self {
        GravityError::SerializationError(error.to_string())
    }
}

impl From<toml::de::Error> for GravityError {
    fn from(error: toml::de::Error) -> Self {
        GravityError::InvalidParams(error.to_string())
    }
}

/// Halts the current transaction. Reserved for states that can only be reached
/// through a programming error, never for bad user input.
pub fn invariant_violation(msg: &str) -> ! {
    error!("Bridge invariant violated: {}", msg);
    panic!("Bridge invariant violated: {}", msg)
}
