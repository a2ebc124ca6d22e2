//! Genesis token supply allocation.
//!
//! All arithmetic is integer-only over [`U256`]; floating point would drift
//! on supplies this large. The allocation is total: every base unit of the
//! supply ends up either on a validator account or in the reserve.

use {
    crate::validator::ValidatorRecord,
    alloy::primitives::{Address, U256},
    thiserror::Error,
};

/// Base units per whole token (10^18).
pub const BASE_UNITS_PER_TOKEN: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Whole-token genesis supply of the chain.
pub const TOTAL_SUPPLY_TOKENS: u64 = 10_000_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SupplyError {
    #[error(
        "Validator balances ({aggregate} base units) exceed the total supply ({total} base units)"
    )]
    Exceeded { aggregate: U256, total: U256 },
    #[error("Balance of validator {signer} overflows base-unit arithmetic")]
    AmountOverflow { signer: Address },
    #[error("Total supply of {total_tokens} tokens overflows base-unit arithmetic")]
    TotalOverflow { total_tokens: U256 },
}

/// One validator's share of the supply, in base units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorBalance {
    pub signer: Address,
    pub base_units: U256,
}

/// The computed split of the total supply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplyAllocation {
    /// Per-validator base-unit balances, in validator-list order.
    pub validators: Vec<ValidatorBalance>,
    /// Sum of all validator balances.
    pub aggregate: U256,
    /// Base units left for the reserve contract.
    pub reserve: U256,
}

impl SupplyAllocation {
    /// Total supply this allocation conserves, in base units.
    pub fn total(&self) -> U256 {
        self.aggregate + self.reserve
    }
}

/// Splits `total_supply_tokens` across the validators, leaving the residue
/// on the reserve.
///
/// Fails rather than clamps when the validator balances overshoot the
/// supply: a clamped run would mint a negative reserve on chain.
pub fn allocate(
    total_supply_tokens: U256,
    validators: &[ValidatorRecord],
) -> Result<SupplyAllocation, SupplyError> {
    let total = total_supply_tokens
        .checked_mul(BASE_UNITS_PER_TOKEN)
        .ok_or(SupplyError::TotalOverflow {
            total_tokens: total_supply_tokens,
        })?;

    let mut balances = Vec::with_capacity(validators.len());
    let mut aggregate = U256::ZERO;
    for validator in validators {
        let base_units = validator
            .balance
            .checked_mul(BASE_UNITS_PER_TOKEN)
            .ok_or(SupplyError::AmountOverflow {
                signer: validator.signer,
            })?;
        aggregate = aggregate
            .checked_add(base_units)
            .ok_or(SupplyError::AmountOverflow {
                signer: validator.signer,
            })?;
        balances.push(ValidatorBalance {
            signer: validator.signer,
            base_units,
        });
    }

    if aggregate > total {
        return Err(SupplyError::Exceeded { aggregate, total });
    }

    Ok(SupplyAllocation {
        validators: balances,
        aggregate,
        reserve: total - aggregate,
    })
}

/// Minimal-width hex rendering with a `0x` prefix, as the templates expect.
pub fn to_hex(amount: U256) -> String {
    format!("{amount:#x}")
}
