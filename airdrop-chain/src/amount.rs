//! Decimal reward amounts to integer base units

use rust_decimal::Decimal;
use web3::types::U256;

use crate::error::{ChainError, ChainResult};

/// Largest decimals value whose power of ten fits in a `U256`
pub const MAX_TOKEN_DECIMALS: u32 = 77;

/// Convert a whole-unit amount into base units (wei for 18 decimals)
///
/// Exact: amounts with more fractional digits than `decimals` are refused
/// rather than rounded.
pub fn to_base_units(amount: Decimal, decimals: u32) -> ChainResult<U256> {
    if decimals > MAX_TOKEN_DECIMALS {
        return Err(ChainError::InvalidAmount(format!(
            "{} decimals exceeds the maximum of {}",
            decimals, MAX_TOKEN_DECIMALS
        )));
    }
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ChainError::InvalidAmount(format!(
            "negative amount {}",
            amount
        )));
    }

    let normalized = amount.normalize();
    let scale = normalized.scale();
    if scale > decimals {
        return Err(ChainError::InvalidAmount(format!(
            "{} has more than {} fractional digits",
            amount, decimals
        )));
    }

    U256::from(normalized.mantissa().unsigned_abs())
        .checked_mul(U256::exp10((decimals - scale) as usize))
        .ok_or_else(|| ChainError::InvalidAmount(format!("{} overflows", amount)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_default_reward_in_wei() {
        let wei = to_base_units(Decimal::from_str("0.002").unwrap(), 18).unwrap();
        assert_eq!(wei, U256::from(2_000_000_000_000_000u64));
    }

    #[test]
    fn test_trailing_zeros_and_integers() {
        assert_eq!(
            to_base_units(Decimal::from_str("1.500").unwrap(), 6).unwrap(),
            U256::from(1_500_000u64)
        );
        assert_eq!(
            to_base_units(Decimal::from(3), 0).unwrap(),
            U256::from(3u64)
        );
        assert_eq!(to_base_units(Decimal::ZERO, 18).unwrap(), U256::zero());
    }

    #[test]
    fn test_rejects_excess_precision_and_negatives() {
        assert!(to_base_units(Decimal::from_str("0.0000001").unwrap(), 6).is_err());
        assert!(to_base_units(Decimal::from_str("-1").unwrap(), 18).is_err());
    }

    #[test]
    fn test_decimals_bound() {
        let max = to_base_units(Decimal::ONE, MAX_TOKEN_DECIMALS).unwrap();
        assert_eq!(max, U256::exp10(MAX_TOKEN_DECIMALS as usize));

        let err = to_base_units(Decimal::ONE, MAX_TOKEN_DECIMALS + 1).unwrap_err();
        assert!(matches!(err, ChainError::InvalidAmount(_)));
    }
}
