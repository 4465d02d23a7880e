//! This crate is for common functions and types for the Gravity bridge module
//! crates, things like the shared data model, parameters and error types

#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate log;

pub mod error;
pub mod num_conversion;
pub mod types;
