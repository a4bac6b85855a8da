//! Fixed-point money primitives.
//!
//! All monetary values are signed integer **minor units** (cents). Floating
//! point never touches a balance or a commission computation.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A monetary amount in minor units (e.g. cents).
///
/// Positive = credit, negative = debit when used as a ledger delta.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    pub const fn minor_units(&self) -> i64 {
        self.0
    }

    pub fn checked_add(self, other: Amount) -> Result<Amount, DomainError> {
        self.0
            .checked_add(other.0)
            .map(Amount)
            .ok_or_else(|| DomainError::invariant("amount overflow"))
    }

    pub fn checked_sub(self, other: Amount) -> Result<Amount, DomainError> {
        self.0
            .checked_sub(other.0)
            .map(Amount)
            .ok_or_else(|| DomainError::invariant("amount overflow"))
    }

    pub fn checked_neg(self) -> Result<Amount, DomainError> {
        self.0
            .checked_neg()
            .map(Amount)
            .ok_or_else(|| DomainError::invariant("amount overflow"))
    }

    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl core::fmt::Display for Amount {
    /// Renders as major.minor with two decimal places (e.g. `50.00`, `-7.90`).
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// Platform commission rate in basis points (1/100th of a percent).
///
/// `10_000` basis points = 100%. A rate of `0.079` is `790` basis points.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommissionRate(u32);

impl CommissionRate {
    pub const MAX_BASIS_POINTS: u32 = 10_000;

    pub const ZERO: CommissionRate = CommissionRate(0);

    pub fn from_basis_points(bps: u32) -> Result<Self, DomainError> {
        if bps > Self::MAX_BASIS_POINTS {
            return Err(DomainError::validation(format!(
                "commission rate {bps} exceeds {} basis points",
                Self::MAX_BASIS_POINTS
            )));
        }
        Ok(Self(bps))
    }

    pub const fn basis_points(&self) -> u32 {
        self.0
    }

    /// Compute the commission on a non-negative gross amount.
    ///
    /// Rounding rule: **round half up** to the wallet's minor unit. Computed
    /// in i128 so `gross * bps` cannot overflow.
    pub fn apply_to(&self, gross: Amount) -> Result<Amount, DomainError> {
        if gross.is_negative() {
            return Err(DomainError::validation(
                "commission requires a non-negative gross amount",
            ));
        }
        let raw = gross.minor_units() as i128 * self.0 as i128;
        let rounded = (raw + i128::from(Self::MAX_BASIS_POINTS / 2)) / i128::from(Self::MAX_BASIS_POINTS);
        i64::try_from(rounded)
            .map(Amount::from_minor)
            .map_err(|_| DomainError::invariant("commission overflow"))
    }
}

impl core::fmt::Display for CommissionRate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn display_formats_minor_units() {
        assert_eq!(Amount::from_minor(5000).to_string(), "50.00");
        assert_eq!(Amount::from_minor(-790).to_string(), "-7.90");
        assert_eq!(Amount::from_minor(5).to_string(), "0.05");
        assert_eq!(Amount::ZERO.to_string(), "0.00");
    }

    #[test]
    fn commission_rate_rejects_over_100_percent() {
        assert!(CommissionRate::from_basis_points(10_001).is_err());
        assert!(CommissionRate::from_basis_points(10_000).is_ok());
    }

    #[test]
    fn commission_applies_with_half_up_rounding() {
        let rate = CommissionRate::from_basis_points(790).unwrap();
        // 10_000 * 0.079 = 790 exactly.
        assert_eq!(
            rate.apply_to(Amount::from_minor(10_000)).unwrap(),
            Amount::from_minor(790)
        );
        // 133 * 0.079 = 10.507 -> 11 (half up).
        assert_eq!(
            rate.apply_to(Amount::from_minor(133)).unwrap(),
            Amount::from_minor(11)
        );
        // 63 * 0.079 = 4.977 -> 5.
        assert_eq!(
            rate.apply_to(Amount::from_minor(63)).unwrap(),
            Amount::from_minor(5)
        );
        // Exactly .5 rounds up: 5_000 * 1bp = 0.5 -> 1.
        let one_bp = CommissionRate::from_basis_points(1).unwrap();
        assert_eq!(
            one_bp.apply_to(Amount::from_minor(5_000)).unwrap(),
            Amount::from_minor(1)
        );
    }

    #[test]
    fn commission_rejects_negative_gross() {
        let rate = CommissionRate::from_basis_points(790).unwrap();
        assert!(rate.apply_to(Amount::from_minor(-1)).is_err());
    }

    proptest! {
        /// Commission never exceeds gross and is never negative.
        #[test]
        fn commission_bounded_by_gross(
            gross in 0i64..1_000_000_000i64,
            bps in 0u32..=10_000u32,
        ) {
            let rate = CommissionRate::from_basis_points(bps).unwrap();
            let commission = rate.apply_to(Amount::from_minor(gross)).unwrap();
            prop_assert!(commission.minor_units() >= 0);
            prop_assert!(commission.minor_units() <= gross);
        }
    }
}
