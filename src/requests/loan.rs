use crate::models::loan::MAX_TERM_MONTHS;
use crate::requests::{clean_optional, is_whole_cents, ValidationError};
use rust_decimal::Decimal;
use serde::Deserialize;

fn check_amount(amount: Decimal, what: &str) -> Result<(), ValidationError> {
    if amount <= Decimal::ZERO {
        return Err(ValidationError::new(format!("{} must be greater than zero", what)));
    }
    if !is_whole_cents(amount) {
        return Err(ValidationError::new(format!(
            "{} cannot have more than two decimal places",
            what
        )));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct LoanApplicationRequest {
    pub amount: Decimal,
    pub term_months: i32,
    pub purpose: String,
}

impl LoanApplicationRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_amount(self.amount, "Loan amount")?;
        if !(1..=MAX_TERM_MONTHS).contains(&self.term_months) {
            return Err(ValidationError::new(format!(
                "Loan term must be between 1 and {} months",
                MAX_TERM_MONTHS
            )));
        }
        if self.purpose.trim().is_empty() {
            return Err(ValidationError::new("Loan purpose is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoanReviewRequest {
    #[serde(default)]
    pub note: Option<String>,
}

impl LoanReviewRequest {
    /// The review body is optional. An empty body means no note; anything
    /// else has to be valid JSON.
    pub fn from_body(body: &[u8]) -> Result<Self, ValidationError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| ValidationError::new(format!("Invalid request body: {}", e)))
    }

    pub fn note(&self) -> Option<String> {
        clean_optional(&self.note)
    }
}

#[derive(Debug, Deserialize)]
pub struct RepaymentRequest {
    pub amount: Decimal,
}

impl RepaymentRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_amount(self.amount, "Repayment amount")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn application(amount: i64, term_months: i32, purpose: &str) -> LoanApplicationRequest {
        LoanApplicationRequest {
            amount: Decimal::from(amount),
            term_months,
            purpose: purpose.to_string(),
        }
    }

    #[test]
    fn valid_application() {
        assert!(application(5000, 6, "Stock for shop").validate().is_ok());
        assert!(application(5000, 24, "Dairy cow").validate().is_ok());
    }

    #[test]
    fn term_and_purpose_bounds() {
        assert!(application(5000, 0, "x").validate().is_err());
        assert!(application(5000, 25, "x").validate().is_err());
        assert!(application(5000, 3, "  ").validate().is_err());
        assert!(application(0, 3, "x").validate().is_err());
    }

    #[test]
    fn amounts_must_be_whole_cents() {
        let mut loan = application(0, 6, "Stock for shop");
        loan.amount = Decimal::from_str("2500.505").unwrap();
        assert!(loan.validate().is_err());
        loan.amount = Decimal::from_str("2500.50").unwrap();
        assert!(loan.validate().is_ok());

        let repayment = |s: &str| RepaymentRequest {
            amount: Decimal::from_str(s).unwrap(),
        };
        assert_eq!(
            repayment("99.995").validate(),
            Err(ValidationError::new(
                "Repayment amount cannot have more than two decimal places"
            ))
        );
        assert!(repayment("99.990").validate().is_ok());
        assert!(repayment("0").validate().is_err());
    }

    #[test]
    fn review_note_is_trimmed() {
        let review = LoanReviewRequest { note: Some("  ok  ".to_string()) };
        assert_eq!(review.note().as_deref(), Some("ok"));
        assert_eq!(LoanReviewRequest::default().note(), None);
    }

    #[test]
    fn review_body_may_be_empty_but_not_broken() {
        assert_eq!(LoanReviewRequest::from_body(b"").unwrap().note(), None);
        assert_eq!(LoanReviewRequest::from_body(b" \n").unwrap().note(), None);
        assert_eq!(LoanReviewRequest::from_body(b"{}").unwrap().note(), None);
        assert_eq!(
            LoanReviewRequest::from_body(br#"{"note": "Guarantor confirmed"}"#)
                .unwrap()
                .note()
                .as_deref(),
            Some("Guarantor confirmed")
        );
        assert!(LoanReviewRequest::from_body(br#"{"note": "unterminated"#).is_err());
    }
}
