//! Everything the Gravity module needs to agree with the Gravity Ethereum contract
//! byte for byte, the checkpoint encodings validators sign and the recovery of
//! Ethereum signers from those signatures

#[macro_use]
extern crate log;

pub mod message_signatures;
pub mod signatures;
