//! Length-prefixed recursive binary encoding.
//!
//! Two primitive kinds exist: byte-strings and ordered lists of items.
//! Unsigned integers ride on byte-strings via their minimal big-endian
//! representation (zero is the empty byte-string). The decoder is strict:
//! only the canonical encoding of a value is accepted, so
//! `decode(encode(x)) == x` and `encode(decode(b)) == b` both hold.

use {alloy::primitives::U256, thiserror::Error};

const SHORT_STRING_BASE: u8 = 0x80;
const SHORT_LIST_BASE: u8 = 0xc0;
/// Payloads up to this many bytes use the single-byte length prefix.
const SHORT_PAYLOAD_MAX: usize = 55;

/// A value of the canonical encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Bytes(Vec<u8>),
    List(Vec<Item>),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Truncated input: {needed} bytes declared, {available} remain")]
    Truncated { needed: usize, available: usize },
    #[error("Prefix byte 0x{0:02x} does not classify a canonical item here")]
    InvalidPrefix(u8),
    #[error("{remaining} trailing bytes after the top-level item")]
    Trailing { remaining: usize },
}

impl Item {
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    pub fn list(items: impl Into<Vec<Item>>) -> Self {
        Self::List(items.into())
    }

    /// A byte-string item holding the minimal big-endian form of `value`.
    pub fn uint(value: impl Into<U256>) -> Self {
        Self::Bytes(value.into().to_be_bytes_trimmed_vec())
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Bytes(bytes) => {
                if bytes.len() == 1 && bytes[0] < SHORT_STRING_BASE {
                    return bytes.clone();
                }
                let mut out = length_prefix(bytes.len(), SHORT_STRING_BASE);
                out.extend_from_slice(bytes);
                out
            }
            Self::List(items) => {
                let payload: Vec<u8> = items.iter().flat_map(Self::encode).collect();
                let mut out = length_prefix(payload.len(), SHORT_LIST_BASE);
                out.extend_from_slice(&payload);
                out
            }
        }
    }

    /// Decodes one item covering the entire input.
    pub fn decode(input: &[u8]) -> Result<Self, CodecError> {
        let (item, rest) = decode_one(input)?;
        if !rest.is_empty() {
            return Err(CodecError::Trailing {
                remaining: rest.len(),
            });
        }
        Ok(item)
    }
}

fn length_prefix(len: usize, base: u8) -> Vec<u8> {
    if len <= SHORT_PAYLOAD_MAX {
        return vec![base + len as u8];
    }
    let length_bytes = minimal_be(len as u64);
    let mut out = Vec::with_capacity(1 + length_bytes.len());
    out.push(base + SHORT_PAYLOAD_MAX as u8 + length_bytes.len() as u8);
    out.extend_from_slice(&length_bytes);
    out
}

fn minimal_be(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    bytes[skip..].to_vec()
}

fn decode_one(input: &[u8]) -> Result<(Item, &[u8]), CodecError> {
    let (&prefix, rest) = input.split_first().ok_or(CodecError::Truncated {
        needed: 1,
        available: 0,
    })?;
    match prefix {
        0x00..=0x7f => Ok((Item::Bytes(vec![prefix]), rest)),
        0x80..=0xb7 => {
            let len = (prefix - SHORT_STRING_BASE) as usize;
            let (bytes, rest) = take(rest, len)?;
            // A lone byte below 0x80 must encode as itself.
            if len == 1 && bytes[0] < SHORT_STRING_BASE {
                return Err(CodecError::InvalidPrefix(prefix));
            }
            Ok((Item::Bytes(bytes.to_vec()), rest))
        }
        0xb8..=0xbf => {
            let (len, rest) = long_length(rest, prefix, (prefix - 0xb7) as usize)?;
            let (bytes, rest) = take(rest, len)?;
            Ok((Item::Bytes(bytes.to_vec()), rest))
        }
        0xc0..=0xf7 => {
            let len = (prefix - SHORT_LIST_BASE) as usize;
            let (payload, rest) = take(rest, len)?;
            Ok((Item::List(decode_items(payload)?), rest))
        }
        0xf8..=0xff => {
            let (len, rest) = long_length(rest, prefix, (prefix - 0xf7) as usize)?;
            let (payload, rest) = take(rest, len)?;
            Ok((Item::List(decode_items(payload)?), rest))
        }
    }
}

/// Reads a long-form length and rejects non-canonical ones: a leading zero
/// byte or a value that fits the short form cannot appear in output of
/// [`Item::encode`].
fn long_length(input: &[u8], prefix: u8, len_of_len: usize) -> Result<(usize, &[u8]), CodecError> {
    let (length_bytes, rest) = take(input, len_of_len)?;
    if length_bytes[0] == 0 {
        return Err(CodecError::InvalidPrefix(prefix));
    }
    let mut len = 0u64;
    for &byte in length_bytes {
        len = len << 8 | byte as u64;
    }
    let len = usize::try_from(len).map_err(|_| CodecError::Truncated {
        needed: usize::MAX,
        available: rest.len(),
    })?;
    if len <= SHORT_PAYLOAD_MAX {
        return Err(CodecError::InvalidPrefix(prefix));
    }
    Ok((len, rest))
}

fn take(input: &[u8], len: usize) -> Result<(&[u8], &[u8]), CodecError> {
    if input.len() < len {
        return Err(CodecError::Truncated {
            needed: len,
            available: input.len(),
        });
    }
    Ok(input.split_at(len))
}

fn decode_items(mut payload: &[u8]) -> Result<Vec<Item>, CodecError> {
    let mut items = Vec::new();
    while !payload.is_empty() {
        let (item, rest) = decode_one(payload)?;
        items.push(item);
        payload = rest;
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use {super::*, test_case::test_case};

    #[test_case(Item::bytes(*b"dog"), vec![0x83, b'd', b'o', b'g']; "short string")]
    #[test_case(Item::bytes([]), vec![0x80]; "empty string")]
    #[test_case(Item::bytes([0x0f]), vec![0x0f]; "single low byte is itself")]
    #[test_case(Item::bytes([0x80]), vec![0x81, 0x80]; "single high byte is prefixed")]
    #[test_case(Item::list([]), vec![0xc0]; "empty list")]
    #[test_case(
        Item::list([Item::bytes(*b"cat"), Item::bytes(*b"dog")]),
        vec![0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g'];
        "two element list"
    )]
    #[test_case(Item::uint(0u64), vec![0x80]; "uint zero is empty string")]
    #[test_case(Item::uint(15u64), vec![0x0f]; "small uint")]
    #[test_case(Item::uint(1024u64), vec![0x82, 0x04, 0x00]; "two byte uint")]
    fn test_encode_produces_reference_bytes(item: Item, expected: Vec<u8>) {
        let actual = item.encode();

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_long_string_uses_two_tier_prefix() {
        let item = Item::bytes(vec![b'a'; 56]);
        let encoded = item.encode();

        assert_eq!(encoded[0], 0xb8);
        assert_eq!(encoded[1], 56);
        assert_eq!(encoded.len(), 2 + 56);
    }

    #[test]
    fn test_boundary_string_of_55_bytes_stays_short_form() {
        let item = Item::bytes(vec![b'a'; 55]);
        let encoded = item.encode();

        assert_eq!(encoded[0], 0x80 + 55);
        assert_eq!(encoded.len(), 1 + 55);
    }

    #[test_case(Item::bytes([]); "empty string")]
    #[test_case(Item::bytes([0x7f]); "low single byte")]
    #[test_case(Item::bytes([0x80]); "high single byte")]
    #[test_case(Item::bytes(vec![0xab; 55]); "short form boundary")]
    #[test_case(Item::bytes(vec![0xab; 56]); "long form boundary")]
    #[test_case(Item::bytes(vec![0xab; 300]); "two byte length")]
    #[test_case(Item::list([]); "empty list")]
    #[test_case(Item::list([Item::uint(0u64), Item::list([Item::bytes(*b"cat")])]); "nested list")]
    #[test_case(Item::list(vec![Item::bytes(vec![0xcd; 20]); 10]); "long list")]
    #[test_case(Item::uint(U256::MAX); "maximal uint")]
    fn test_round_trip(item: Item) {
        let encoded = item.encode();
        let decoded = Item::decode(&encoded).unwrap();

        assert_eq!(decoded, item);
    }

    #[test]
    fn test_decode_reports_truncated_declared_length() {
        // Declares 3 bytes but carries 2.
        let actual = Item::decode(&[0x83, b'd', b'o']);

        assert_eq!(
            actual,
            Err(CodecError::Truncated {
                needed: 3,
                available: 2
            })
        );
    }

    #[test]
    fn test_decode_reports_truncated_empty_input() {
        let actual = Item::decode(&[]);

        assert_eq!(
            actual,
            Err(CodecError::Truncated {
                needed: 1,
                available: 0
            })
        );
    }

    #[test_case(vec![0x81, 0x05]; "needlessly prefixed low byte")]
    #[test_case(vec![0xb8, 0x03, 1, 2, 3]; "long form for short payload")]
    #[test_case(vec![0xb9, 0x00, 0x38, 1, 2, 3]; "leading zero in long length")]
    fn test_decode_rejects_non_canonical_prefix(input: Vec<u8>) {
        let actual = Item::decode(&input);

        assert_eq!(actual, Err(CodecError::InvalidPrefix(input[0])));
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let actual = Item::decode(&[0xc0, 0x00]);

        assert_eq!(actual, Err(CodecError::Trailing { remaining: 1 }));
    }

    #[test]
    fn test_decode_rejects_truncated_nested_item() {
        // List payload claims an inner string longer than the payload.
        let actual = Item::decode(&[0xc2, 0x83, b'd']);

        assert!(matches!(actual, Err(CodecError::Truncated { .. })));
    }
}
