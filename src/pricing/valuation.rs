// Reserve valuation in stable-quote units
//
// Reserves arrive as raw 18-decimal integers. They are carried as Decimal
// (96-bit mantissa); anything beyond ~7.9e28 whole units saturates.

use crate::config::{PricePrecision, TOKEN_DECIMALS};
use alloy::primitives::U256;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// Raw 18-decimal amount to whole units
pub fn wei_to_units(raw: U256) -> Decimal {
    let scale = U256::from(10u64).pow(U256::from(TOKEN_DECIMALS));
    let whole = raw / scale;
    let fraction = raw % scale;

    let whole = match u128::try_from(whole).ok().and_then(Decimal::from_u128) {
        Some(d) => d,
        None => return Decimal::MAX,
    };
    // fraction < 1e18 always fits
    let fraction = Decimal::from_i128_with_scale(fraction.to::<u128>() as i128, TOKEN_DECIMALS as u32);

    whole.checked_add(fraction).unwrap_or(Decimal::MAX)
}

/// Value a wrapped-native reserve in stable-quote units.
pub fn native_reserve_value(reserve: U256, price: Decimal, precision: PricePrecision) -> Decimal {
    let price = match precision {
        PricePrecision::FixedPoint => price,
        PricePrecision::Integer => price.trunc(),
    };
    wei_to_units(reserve)
        .checked_mul(price)
        .unwrap_or(Decimal::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ether(units: u64) -> U256 {
        U256::from(units) * U256::from(10u64).pow(U256::from(18u64))
    }

    #[test]
    fn test_wei_to_units() {
        assert_eq!(wei_to_units(U256::ZERO), Decimal::ZERO);
        assert_eq!(wei_to_units(ether(5000)), dec!(5000));
        assert_eq!(wei_to_units(U256::from(1u64)), dec!(0.000000000000000001));
        assert_eq!(
            wei_to_units(ether(2) + U256::from(500_000_000_000_000_000u64)),
            dec!(2.5)
        );
    }

    #[test]
    fn test_wei_to_units_saturates() {
        assert_eq!(wei_to_units(U256::MAX), Decimal::MAX);
    }

    #[test]
    fn test_fixed_point_keeps_fraction() {
        // 10 native at 612.99 = 6129.9
        assert_eq!(
            native_reserve_value(ether(10), dec!(612.99), PricePrecision::FixedPoint),
            dec!(6129.9)
        );
    }

    #[test]
    fn test_integer_precision_truncates_price_first() {
        // Truncation happens before the multiply: 612 * 10, not trunc(6129.9)
        assert_eq!(
            native_reserve_value(ether(10), dec!(612.99), PricePrecision::Integer),
            dec!(6120)
        );
    }

    #[test]
    fn test_boundary_decided_by_precision() {
        // 8.169 native at 612.4 = 5002.6956 in fixed point, 4999.428 truncated:
        // the same pool flips sides of a 5000-stable reserve.
        let reserve = U256::from(8_169_000_000_000_000_000u64);
        assert!(native_reserve_value(reserve, dec!(612.4), PricePrecision::FixedPoint) > dec!(5000));
        assert!(native_reserve_value(reserve, dec!(612.4), PricePrecision::Integer) < dec!(5000));
    }
}
