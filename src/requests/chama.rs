use crate::models::chama::{ContributionFrequency, CreateChama};
use crate::requests::{clean_optional, ValidationError};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

const MAX_INTEREST_RATE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct CreateChamaRequest {
    pub name: String,
    pub description: Option<String>,
    pub contribution_amount: Decimal,
    pub contribution_frequency: Option<String>,
    pub loan_interest_rate: Option<Decimal>,
}

impl CreateChamaRequest {
    pub fn into_create(self, created_by: Uuid) -> Result<CreateChama, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::new("Chama name is required"));
        }
        if self.contribution_amount <= Decimal::ZERO {
            return Err(ValidationError::new(
                "Contribution amount must be greater than zero",
            ));
        }

        let contribution_frequency = match self.contribution_frequency.as_deref() {
            Some(freq) => freq.parse().map_err(|_| {
                ValidationError::new("Contribution frequency must be weekly or monthly")
            })?,
            None => ContributionFrequency::Monthly,
        };

        let loan_interest_rate = self.loan_interest_rate.unwrap_or(Decimal::TEN);
        if loan_interest_rate < Decimal::ZERO || loan_interest_rate > Decimal::from(MAX_INTEREST_RATE) {
            return Err(ValidationError::new(
                "Loan interest rate must be between 0 and 100 percent",
            ));
        }

        Ok(CreateChama {
            name: name.to_string(),
            description: clean_optional(&self.description),
            contribution_amount: self.contribution_amount,
            contribution_frequency,
            loan_interest_rate,
            created_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateChamaRequest {
        CreateChamaRequest {
            name: " Umoja Women Group ".to_string(),
            description: Some("".to_string()),
            contribution_amount: Decimal::from(1000),
            contribution_frequency: None,
            loan_interest_rate: None,
        }
    }

    #[test]
    fn defaults_to_monthly_and_ten_percent() {
        let creator = Uuid::new_v4();
        let chama = request().into_create(creator).unwrap();
        assert_eq!(chama.name, "Umoja Women Group");
        assert_eq!(chama.description, None);
        assert_eq!(chama.contribution_frequency, ContributionFrequency::Monthly);
        assert_eq!(chama.loan_interest_rate, Decimal::TEN);
        assert_eq!(chama.created_by, creator);
    }

    #[test]
    fn rejects_bad_values() {
        let mut req = request();
        req.contribution_amount = Decimal::ZERO;
        assert!(req.into_create(Uuid::new_v4()).is_err());

        let mut req = request();
        req.contribution_frequency = Some("daily".to_string());
        assert!(req.into_create(Uuid::new_v4()).is_err());

        let mut req = request();
        req.loan_interest_rate = Some(Decimal::from(101));
        assert!(req.into_create(Uuid::new_v4()).is_err());

        let mut req = request();
        req.name = "   ".to_string();
        assert!(req.into_create(Uuid::new_v4()).is_err());
    }

    #[test]
    fn weekly_frequency_is_accepted() {
        let mut req = request();
        req.contribution_frequency = Some("Weekly".to_string());
        let chama = req.into_create(Uuid::new_v4()).unwrap();
        assert_eq!(chama.contribution_frequency, ContributionFrequency::Weekly);
    }
}
