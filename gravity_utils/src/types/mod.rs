pub use batches::*;
pub use config::*;
pub use erc20::*;
pub use ethereum_events::*;
pub use logic_call::*;
pub use valsets::*;

mod batches;
mod config;
mod erc20;
mod ethereum_events;
mod logic_call;
mod valsets;
