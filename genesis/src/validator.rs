//! The initial validator set and its two consensus-critical encodings.
//!
//! Both encodings are sequence-sensitive: validators appear exactly in the
//! order of the source list. Reordering the list changes the effective
//! validator set on chain, so no sorting or deduplication happens here.

use {
    crate::{
        address::{self, AddressError},
        codec::Item,
    },
    alloy::primitives::{Address, U256},
    serde::Deserialize,
    thiserror::Error,
};

/// Zero bytes reserved ahead of the validator addresses in extra-data.
pub const EXTRA_VANITY_LEN: usize = 32;
/// Zero bytes reserved behind them for the seal, filled in by the signing
/// validator once the chain runs.
pub const EXTRA_SEAL_LEN: usize = 65;

/// Message tag of a validator-set update understood by the staking contract.
const UPDATE_MESSAGE_TYPE: u64 = 0x00;

/// One entry of the static validator list.
///
/// Immutable once constructed; the amounts are whole-token denominated and
/// validated at deserialization time so that later pipeline stages never see
/// malformed input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawValidator")]
pub struct ValidatorRecord {
    /// Account that signs blocks and receives the genesis balance.
    pub signer: Address,
    /// Address embedded in the header extra-data.
    pub consensus_address: Address,
    /// Genesis balance in whole tokens.
    pub balance: U256,
    /// Stake bonded in the staking contract, in whole tokens.
    pub stake: U256,
    /// Pledged storage capacity in bytes, where the chain tracks it.
    pub storage_capacity: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawValidator {
    address: String,
    consensus_address: String,
    balance: String,
    stake: String,
    #[serde(default)]
    storage_capacity: Option<u64>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidatorError {
    #[error("{0}")]
    Address(#[from] AddressError),
    #[error("Amount must be a base-10 unsigned integer: {0}")]
    MalformedAmount(String),
}

impl TryFrom<RawValidator> for ValidatorRecord {
    type Error = ValidatorError;

    fn try_from(raw: RawValidator) -> Result<Self, Self::Error> {
        Ok(Self {
            signer: address::parse(&raw.address)?,
            consensus_address: address::parse(&raw.consensus_address)?,
            balance: parse_amount(&raw.balance)?,
            stake: parse_amount(&raw.stake)?,
            storage_capacity: raw.storage_capacity,
        })
    }
}

fn parse_amount(input: &str) -> Result<U256, ValidatorError> {
    // Plain digit runs only; the underlying parser would also accept
    // underscores and exponents, which have no place in a validator list.
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidatorError::MalformedAmount(input.to_string()));
    }
    U256::from_str_radix(input, 10).map_err(|_| ValidatorError::MalformedAmount(input.to_string()))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidatorSetError {
    #[error("Validator set is empty, a genesis needs at least one validator")]
    Empty,
}

/// Builds the header extra-data blob for the initial validator set.
///
/// Layout: `32 zero bytes ++ 20 bytes per validator ++ 65 zero bytes`,
/// total `32 + 20*N + 65`. The consensus engine parses validators straight
/// out of these positions.
pub fn header_extra_data(validators: &[ValidatorRecord]) -> Result<Vec<u8>, ValidatorSetError> {
    if validators.is_empty() {
        return Err(ValidatorSetError::Empty);
    }

    let address_bytes = Address::len_bytes() * validators.len();
    let mut extra = Vec::with_capacity(EXTRA_VANITY_LEN + address_bytes + EXTRA_SEAL_LEN);
    extra.resize(EXTRA_VANITY_LEN, 0);
    for validator in validators {
        extra.extend_from_slice(validator.consensus_address.as_slice());
    }
    extra.resize(extra.len() + EXTRA_SEAL_LEN, 0);
    Ok(extra)
}

/// Builds the validator-update payload embedded in the staking contract.
///
/// The payload is the canonical encoding of
/// `[messageType, [[signer, stake], ...]]`, rendered as hex without the
/// `0x` prefix because it lands verbatim inside generated contract source.
pub fn update_payload(validators: &[ValidatorRecord]) -> Result<String, ValidatorSetError> {
    if validators.is_empty() {
        return Err(ValidatorSetError::Empty);
    }

    let entries = validators
        .iter()
        .map(|validator| {
            Item::list([
                Item::bytes(validator.signer.as_slice().to_vec()),
                Item::uint(validator.stake),
            ])
        })
        .collect::<Vec<_>>();
    let package = Item::list([Item::uint(UPDATE_MESSAGE_TYPE), Item::list(entries)]);
    Ok(hex::encode(package.encode()))
}
