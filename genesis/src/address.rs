//! Account address parsing and checksum casing.
//!
//! The checksum scheme carries no extra bytes: the address is rendered as
//! lowercase hex, that ASCII text is keccak-256 hashed, and every alphabetic
//! hex digit whose corresponding digest nibble is >= 8 is upper-cased. A
//! reader can verify the address from casing alone.

use {
    alloy::primitives::{Address, keccak256},
    thiserror::Error,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("Malformed address, expected 20 hex-encoded bytes: {0}")]
    Malformed(String),
}

/// Parses a 20-byte address from hex text.
///
/// The `0x` prefix is optional and letter casing is ignored; casing is only
/// meaningful on output, where [`to_checksum`] assigns it.
pub fn parse(input: &str) -> Result<Address, AddressError> {
    let digits = input.strip_prefix("0x").unwrap_or(input);
    let bytes =
        hex::decode(digits).map_err(|_| AddressError::Malformed(input.to_string()))?;
    let bytes: [u8; 20] = bytes
        .try_into()
        .map_err(|_| AddressError::Malformed(input.to_string()))?;
    Ok(Address::new(bytes))
}

/// Renders an address with checksum casing.
pub fn to_checksum(address: &Address) -> String {
    let lower = hex::encode(address.as_slice());
    let digest = keccak256(lower.as_bytes());

    let mut out = String::with_capacity(2 + lower.len());
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            digest[i / 2] >> 4
        } else {
            digest[i / 2] & 0x0f
        };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use {super::*, test_case::test_case};

    // Published EIP-55 test vectors.
    #[test_case("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed")]
    #[test_case("0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359")]
    #[test_case("0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB")]
    #[test_case("0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb")]
    fn test_checksum_matches_reference_vectors(expected: &str) {
        let address = parse(expected).unwrap();
        let actual = to_checksum(&address);

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_checksum_is_idempotent_and_case_insensitive_on_input() {
        let mixed = "0x5AAEB6053F3E94C9b9a09f33669435E7Ef1BeAed";
        let first = to_checksum(&parse(mixed).unwrap());
        let second = to_checksum(&parse(&first).unwrap());

        assert_eq!(first, second);
        assert_eq!(first, "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
    }

    #[test]
    fn test_parse_accepts_bare_hex_without_prefix() {
        let with_prefix = parse("0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359").unwrap();
        let without_prefix = parse("fb6916095ca1df60bb79ce92ce3ea74c37c5d359").unwrap();

        assert_eq!(with_prefix, without_prefix);
    }

    #[test_case(""; "empty input")]
    #[test_case("0x1234"; "too short")]
    #[test_case("0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359aa"; "too long")]
    #[test_case("0xzz6916095ca1df60bb79ce92ce3ea74c37c5d359"; "non hex digits")]
    fn test_parse_rejects_malformed_input(input: &str) {
        let actual = parse(input);

        assert_eq!(actual, Err(AddressError::Malformed(input.to_string())));
    }
}
