//! Shared types for the coffee message ledger: ABI schema, amount codec, address parsing.

pub mod abi;
pub mod address;
pub mod amount;

pub use abi::{IMessageStore, Message};
pub use address::{checksummed, parse_address, AddressError};
pub use amount::{from_base_unit, to_base_unit, AmountError, DECIMALS, WEI_PER_ETHER};

pub use alloy_primitives::{Address, B256, U256};
