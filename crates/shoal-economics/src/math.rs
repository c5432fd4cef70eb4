// crates/shoal-economics/src/math.rs
//
// Full-precision `x * y / d` for u128 amounts.
//
// Products of two wei amounts overflow u128 easily (10^21 * 10^21), so the
// intermediate is computed in 256 bits and only the quotient must fit back
// into u128.

use ethnum::U256;

use shoal_core::error::ShoalError;

/// `floor(x * y / denominator)`.
pub fn mul_div_down(x: u128, y: u128, denominator: u128) -> Result<u128, ShoalError> {
    if denominator == 0 {
        return Err(ShoalError::Validation("division by zero".to_string()));
    }
    let product = U256::from(x) * U256::from(y);
    narrow(product / U256::from(denominator))
}

/// `ceil(x * y / denominator)`.
pub fn mul_div_up(x: u128, y: u128, denominator: u128) -> Result<u128, ShoalError> {
    if denominator == 0 {
        return Err(ShoalError::Validation("division by zero".to_string()));
    }
    let product = U256::from(x) * U256::from(y);
    let d = U256::from(denominator);
    let mut quotient = product / d;
    if product % d != U256::ZERO {
        quotient += U256::ONE;
    }
    narrow(quotient)
}

fn narrow(value: U256) -> Result<u128, ShoalError> {
    if value > U256::from(u128::MAX) {
        return Err(ShoalError::Validation(
            "amount overflows 128-bit accounting".to_string(),
        ));
    }
    Ok(value.as_u128())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounding_direction() {
        assert_eq!(mul_div_down(10, 1, 3).unwrap(), 3);
        assert_eq!(mul_div_up(10, 1, 3).unwrap(), 4);
        assert_eq!(mul_div_up(9, 1, 3).unwrap(), 3);
    }

    #[test]
    fn test_wide_intermediate() {
        let big = 10u128.pow(30);
        assert_eq!(mul_div_down(big, big, big).unwrap(), big);
    }

    #[test]
    fn test_zero_denominator() {
        assert!(mul_div_down(1, 1, 0).is_err());
        assert!(mul_div_up(1, 1, 0).is_err());
    }

    #[test]
    fn test_quotient_overflow() {
        assert!(mul_div_down(u128::MAX, 2, 1).is_err());
    }
}
