//! Recipient address parsing.

use std::str::FromStr;

use alloy_primitives::Address;

/// Errors while parsing a user-entered address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressError {
    MissingPrefix,
    BadLength,
    NotHex,
    /// Mixed-case input whose EIP-55 checksum does not match.
    BadChecksum,
}

/// Parse a `0x`-prefixed 20-byte hex address.
///
/// All-lowercase and all-uppercase input is accepted as is; mixed-case input must be a valid
/// EIP-55 checksum.
pub fn parse_address(input: &str) -> Result<Address, AddressError> {
    let s = input.trim();
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or(AddressError::MissingPrefix)?;
    if hex.len() != 40 {
        return Err(AddressError::BadLength);
    }
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AddressError::NotHex);
    }

    let has_lower = hex.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = hex.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        return Address::parse_checksummed(format!("0x{hex}"), None)
            .map_err(|_| AddressError::BadChecksum);
    }

    Address::from_str(hex).map_err(|_| AddressError::NotHex)
}

/// EIP-55 rendering used for identities everywhere in the UI.
pub fn checksummed(address: &Address) -> String {
    address.to_checksum(None)
}
