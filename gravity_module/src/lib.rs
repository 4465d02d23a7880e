//! The consensus side of the Gravity bridge: turns validator claims about Ethereum
//! into exactly once state transitions and builds the batches, logic calls and
//! validator sets that validators sign for the Ethereum contract.

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

pub mod abci;
pub mod attestation;
pub mod attestation_handler;
pub mod batch;
pub mod context;
pub mod delegate_keys;
pub mod erc20_mapping;
pub mod events;
pub mod evidence;
pub mod expected_keepers;
pub mod keeper;
pub mod keys;
pub mod logic_call;
pub mod msg_server;
pub mod pool;
pub mod slashing;
pub mod store;
pub mod valset;

#[cfg(test)]
mod test_utils;

pub use context::Context;
pub use keeper::Keeper;
