//! Loan terms
//!
//! Validation and payment calculation for loan origination.

use chrono::{Months, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

use super::amount::{to_money, MONEY_SCALE};
use super::{Amount, DomainError};

/// Longest accepted loan term, in months
pub const MAX_TERM_MONTHS: u32 = 600;

/// Decimal places stored for an interest rate
pub const RATE_SCALE: u32 = 4;

/// Validated loan terms
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanTerms {
    pub principal: Amount,
    /// Annual rate as a fraction (0.05 = 5%)
    pub annual_rate: Decimal,
    pub term_months: u32,
}

impl LoanTerms {
    pub fn new(
        principal: Decimal,
        annual_rate: Decimal,
        term_months: i32,
    ) -> Result<Self, DomainError> {
        let principal = Amount::new(principal)?;

        if annual_rate <= Decimal::ZERO || annual_rate >= Decimal::ONE {
            return Err(DomainError::InvalidAmount(format!(
                "interest rate must be a fraction between 0 and 1 (got {})",
                annual_rate
            )));
        }

        if annual_rate.normalize().scale() > RATE_SCALE {
            return Err(DomainError::InvalidAmount(format!(
                "interest rate has more than {} decimal places",
                RATE_SCALE
            )));
        }

        let term_months = u32::try_from(term_months)
            .ok()
            .filter(|t| (1..=MAX_TERM_MONTHS).contains(t))
            .ok_or_else(|| {
                DomainError::InvalidAmount(format!(
                    "loan term must be between 1 and {} months (got {})",
                    MAX_TERM_MONTHS, term_months
                ))
            })?;

        Ok(Self {
            principal,
            annual_rate,
            term_months,
        })
    }

    /// Standard annuity payment: `P * r(1+r)^n / ((1+r)^n - 1)` with `r = rate / 12`,
    /// rounded half-up to cents.
    pub fn monthly_payment(&self) -> Decimal {
        let principal = self.principal.value();
        let monthly_rate = self.annual_rate / Decimal::from(12);
        let growth = Decimal::ONE + monthly_rate;

        let mut power = Decimal::ONE;
        for _ in 0..self.term_months {
            power *= growth;
        }

        // factor stays below 1 so large principals cannot overflow
        let factor = monthly_rate * power / (power - Decimal::ONE);
        let payment = principal * factor;
        to_money(
            payment.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Final due date for a loan disbursed on `disbursed`
    pub fn due_date(&self, disbursed: NaiveDate) -> Option<NaiveDate> {
        disbursed.checked_add_months(Months::new(self.term_months))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_monthly_payment_known_value() {
        // 10 000 at 6% over 12 months -> 860.66
        let terms = LoanTerms::new(dec!(10000), dec!(0.06), 12).unwrap();
        assert_eq!(terms.monthly_payment(), dec!(860.66));
    }

    #[test]
    fn test_monthly_payment_long_term() {
        // 200 000 at 5% over 30 years -> 1073.64
        let terms = LoanTerms::new(dec!(200000), dec!(0.05), 360).unwrap();
        assert_eq!(terms.monthly_payment(), dec!(1073.64));
    }

    #[test]
    fn test_rejects_bad_terms() {
        assert!(LoanTerms::new(dec!(0), dec!(0.05), 12).is_err());
        assert!(LoanTerms::new(dec!(1000), dec!(0), 12).is_err());
        assert!(LoanTerms::new(dec!(1000), dec!(1), 12).is_err());
        assert!(LoanTerms::new(dec!(1000), dec!(0.05125), 12).is_err());
        assert!(LoanTerms::new(dec!(1000), dec!(0.05), 0).is_err());
        assert!(LoanTerms::new(dec!(1000), dec!(0.05), -3).is_err());
        assert!(LoanTerms::new(dec!(1000), dec!(0.05), 601).is_err());
    }

    #[test]
    fn test_due_date() {
        let terms = LoanTerms::new(dec!(1000), dec!(0.05), 13).unwrap();
        let disbursed = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(terms.due_date(disbursed), NaiveDate::from_ymd_opt(2025, 2, 28));
    }
}
