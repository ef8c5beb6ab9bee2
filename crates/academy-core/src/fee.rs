//! # Platform Fee
//!
//! Share of each charge kept by the platform and the connected account the
//! remainder is transferred to.

use crate::error::{AcademyError, AcademyResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_FEE_PERCENT: u8 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformFee {
    /// Whole percent of the charged amount, 0..=100
    pub percent: u8,
    /// Connected account id receiving the transfer; without it no fee is
    /// forwarded to the processor
    pub destination: Option<String>,
}

impl PlatformFee {
    pub fn new(percent: u8, destination: Option<String>) -> AcademyResult<Self> {
        if percent > 100 {
            return Err(AcademyError::Configuration(format!(
                "platform fee percent must be within 0..=100, got {}",
                percent
            )));
        }
        Ok(Self {
            percent,
            destination,
        })
    }

    /// Fee for `amount` minor units, rounded down
    pub fn amount_for(&self, amount: i64) -> i64 {
        // percent <= 100, so the quotient never exceeds `amount`
        let fee = i128::from(amount.max(0)) * i128::from(self.percent) / 100;
        fee as i64
    }

    /// Fee and destination to forward with a charge, if any
    pub fn split(&self, amount: i64) -> Option<(i64, &str)> {
        self.destination
            .as_deref()
            .map(|dest| (self.amount_for(amount), dest))
    }
}

impl Default for PlatformFee {
    fn default() -> Self {
        Self {
            percent: DEFAULT_FEE_PERCENT,
            destination: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_twenty_percent() {
        let fee = PlatformFee::default();
        assert_eq!(fee.amount_for(1000), 200);
        assert_eq!(fee.amount_for(999), 199);
        assert_eq!(fee.amount_for(0), 0);
    }

    #[test]
    fn test_split_requires_destination() {
        assert_eq!(PlatformFee::default().split(5000), None);

        let fee = PlatformFee::new(10, Some("acct_123".into())).unwrap();
        assert_eq!(fee.split(5000), Some((500, "acct_123")));
    }

    #[test]
    fn test_fee_for_largest_amount() {
        let fee = PlatformFee::default();
        assert_eq!(fee.amount_for(i64::MAX), i64::MAX / 5);
        assert_eq!(PlatformFee::new(100, None).unwrap().amount_for(i64::MAX), i64::MAX);
    }

    #[test]
    fn test_rejects_percent_over_hundred() {
        assert!(PlatformFee::new(101, None).is_err());
        assert!(PlatformFee::new(100, None).is_ok());
    }
}
