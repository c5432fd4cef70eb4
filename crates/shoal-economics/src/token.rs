// crates/shoal-economics/src/token.rs
//
// Base-asset amount type and unit constants.
//
// The smallest unit of the base asset is the "wei". 1 ETH = 10^18 wei.
// Receipt tokens and vault shares use the same 18-decimal scale, and all
// accounting is integer wei so no floating point ever touches a balance.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Number of wei in one ETH.
pub const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;

/// Size of one staking commitment: 32 ETH.
pub const DEPOSIT_UNIT_WEI: u128 = 32 * WEI_PER_ETH;

/// One whole vault share, used by `price_per_share`.
pub const SHARE_UNIT: u128 = WEI_PER_ETH;

/// Type alias for wei, the smallest base-asset unit.
pub type Wei = u128;

/// A base-asset amount.
///
/// Wraps an amount in wei. Used for display and CLI parsing; the engine
/// itself passes raw `u128` wei around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ether {
    pub wei: u128,
}

impl Ether {
    pub fn from_wei(wei: u128) -> Self {
        Self { wei }
    }

    /// Whole ETH. Saturates at `u128::MAX` wei.
    pub fn from_eth(eth: u64) -> Self {
        Self {
            wei: (eth as u128).saturating_mul(WEI_PER_ETH),
        }
    }

    /// Parse a decimal ETH string such as `"1.5"` or `"32"`.
    ///
    /// At most 18 fractional digits are accepted.
    pub fn parse_eth(s: &str) -> Option<Self> {
        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return None;
        }
        if frac.len() > 18 || !frac.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let frac_wei: u128 = if frac.is_empty() {
            0
        } else {
            format!("{:0<18}", frac).parse().ok()?
        };
        let wei = whole.checked_mul(WEI_PER_ETH)?.checked_add(frac_wei)?;
        Some(Self { wei })
    }

    pub fn zero() -> Self {
        Self { wei: 0 }
    }
}

impl Add for Ether {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            wei: self.wei.saturating_add(rhs.wei),
        }
    }
}

impl Sub for Ether {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            wei: self.wei.saturating_sub(rhs.wei),
        }
    }
}

impl fmt::Display for Ether {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.wei / WEI_PER_ETH;
        let frac = self.wei % WEI_PER_ETH;
        if frac == 0 {
            write!(f, "{} ETH", whole)
        } else {
            // Display up to 18 decimal places, trimming trailing zeros
            let frac_str = format!("{:018}", frac);
            let trimmed = frac_str.trim_end_matches('0');
            write!(f, "{}.{} ETH", whole, trimmed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_unit() {
        assert_eq!(DEPOSIT_UNIT_WEI, 32_000_000_000_000_000_000);
    }

    #[test]
    fn test_parse_eth() {
        assert_eq!(Ether::parse_eth("1.5").unwrap().wei, 1_500_000_000_000_000_000);
        assert_eq!(Ether::parse_eth("32").unwrap(), Ether::from_eth(32));
        assert_eq!(Ether::parse_eth(".25").unwrap().wei, WEI_PER_ETH / 4);
        assert!(Ether::parse_eth("1.2.3").is_none());
        assert!(Ether::parse_eth("abc").is_none());
        assert!(Ether::parse_eth("0.0000000000000000001").is_none());
    }

    #[test]
    fn test_sub_saturating() {
        let c = Ether::from_eth(1) - Ether::from_eth(2);
        assert_eq!(c.wei, 0);
    }

    #[test]
    fn test_display_whole() {
        assert_eq!(format!("{}", Ether::from_eth(42)), "42 ETH");
    }

    #[test]
    fn test_display_fractional() {
        let amount = Ether::from_wei(1_500_000_000_000_000_000);
        assert_eq!(format!("{}", amount), "1.5 ETH");
    }

    #[test]
    fn test_display_zero() {
        assert_eq!(format!("{}", Ether::zero()), "0 ETH");
    }
}
