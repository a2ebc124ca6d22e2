//! # Consensus-critical genesis encodings
//!
//! Everything in this crate must be bit-exact: the header extra-data, the
//! validator-update payload and the balance renderings produced here are
//! consumed verbatim by the consensus engine and by deployed contracts.
//! Identical inputs always produce identical bytes; nothing here reads the
//! clock, the environment, or iterates unordered collections.

pub use {
    address::{AddressError, parse as parse_address, to_checksum},
    codec::{CodecError, Item},
    supply::{SupplyAllocation, SupplyError, allocate},
    validator::{ValidatorError, ValidatorRecord, ValidatorSetError, header_extra_data, update_payload},
};

pub mod address;
pub mod codec;
pub mod supply;
pub mod validator;
