use crate::models::contribution::PaymentMethod;
use crate::requests::{clean_optional, is_whole_cents, ValidationError};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

/// Clock skew tolerated on client-supplied payment times.
const FUTURE_TOLERANCE_MINUTES: i64 = 5;

#[derive(Debug, Deserialize)]
pub struct ContributionRequest {
    /// Officers may record on behalf of a member; members always record for themselves.
    pub member_id: Option<Uuid>,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub contributed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidContribution {
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub contributed_at: DateTime<Utc>,
}

impl ContributionRequest {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<ValidContribution, ValidationError> {
        if self.amount <= Decimal::ZERO {
            return Err(ValidationError::new("Amount must be greater than zero"));
        }
        if !is_whole_cents(self.amount) {
            return Err(ValidationError::new("Amount cannot have more than two decimal places"));
        }

        let reference = clean_optional(&self.reference).map(|r| r.to_uppercase());
        if self.payment_method.requires_reference() && reference.is_none() {
            return Err(ValidationError::new(
                "M-Pesa contributions require the transaction reference",
            ));
        }

        let contributed_at = self.contributed_at.unwrap_or(now);
        if contributed_at > now + Duration::minutes(FUTURE_TOLERANCE_MINUTES) {
            return Err(ValidationError::new("Contribution date cannot be in the future"));
        }

        Ok(ValidContribution {
            amount: self.amount,
            payment_method: self.payment_method,
            reference,
            notes: clean_optional(&self.notes),
            contributed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn request(method: PaymentMethod, reference: Option<&str>) -> ContributionRequest {
        ContributionRequest {
            member_id: None,
            amount: Decimal::from(500),
            payment_method: method,
            reference: reference.map(str::to_string),
            notes: None,
            contributed_at: None,
        }
    }

    #[test]
    fn mpesa_needs_reference() {
        let now = Utc::now();
        assert!(request(PaymentMethod::Mpesa, None).validate(now).is_err());
        assert!(request(PaymentMethod::Mpesa, Some("  ")).validate(now).is_err());

        let valid = request(PaymentMethod::Mpesa, Some(" qk12abc3de ")).validate(now).unwrap();
        assert_eq!(valid.reference.as_deref(), Some("QK12ABC3DE"));
        assert_eq!(valid.contributed_at, now);
    }

    #[test]
    fn cash_needs_no_reference() {
        assert!(request(PaymentMethod::Cash, None).validate(Utc::now()).is_ok());
    }

    #[test]
    fn amount_must_be_positive_whole_cents() {
        let now = Utc::now();
        let mut req = request(PaymentMethod::Cash, None);
        req.amount = Decimal::from(-1);
        assert!(req.validate(now).is_err());

        req.amount = Decimal::from_str("10.005").unwrap();
        assert!(req.validate(now).is_err());

        req.amount = Decimal::from_str("10.500").unwrap();
        assert!(req.validate(now).is_ok());
    }

    #[test]
    fn future_dates_are_rejected() {
        let now = Utc::now();
        let mut req = request(PaymentMethod::Bank, None);
        req.contributed_at = Some(now + Duration::days(1));
        assert!(req.validate(now).is_err());

        req.contributed_at = Some(now - Duration::days(30));
        assert!(req.validate(now).is_ok());
    }
}
