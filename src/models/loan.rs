use crate::database::connection::{is_unique_violation, DbPool};
use chrono::{DateTime, Months, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// A member may borrow up to this many times what they have contributed.
pub const LOAN_MULTIPLIER: i64 = 3;
pub const MAX_TERM_MONTHS: i32 = 24;

#[derive(Error, Debug)]
pub enum LoanError {
    #[error("Loan with ID {id} not found")]
    NotFound { id: Uuid },
    #[error("Member already has a pending or active loan")]
    ActiveLoanExists,
    #[error("Requested amount exceeds the loan limit of {limit}")]
    ExceedsLimit { limit: Decimal },
    #[error("Cannot move a loan from {from} to {to}")]
    InvalidTransition { from: LoanStatus, to: LoanStatus },
    #[error("Repayment of {amount} exceeds the outstanding balance of {balance}")]
    Overpayment { amount: Decimal, balance: Decimal },
    #[error("Amount must be greater than zero")]
    NonPositiveAmount,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "loan_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
    Repaid,
}

impl LoanStatus {
    pub fn can_transition_to(self, next: LoanStatus) -> bool {
        matches!(
            (self, next),
            (LoanStatus::Pending, LoanStatus::Approved)
                | (LoanStatus::Pending, LoanStatus::Rejected)
                | (LoanStatus::Approved, LoanStatus::Repaid)
        )
    }

    /// Pending and approved loans block a new application.
    pub fn is_active(self) -> bool {
        matches!(self, LoanStatus::Pending | LoanStatus::Approved)
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Approved => "approved",
            LoanStatus::Rejected => "rejected",
            LoanStatus::Repaid => "repaid",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    fn target(self) -> LoanStatus {
        match self {
            ReviewDecision::Approve => LoanStatus::Approved,
            ReviewDecision::Reject => LoanStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Loan {
    pub id: Uuid,
    pub member_id: Uuid,
    pub chama_id: Uuid,
    pub amount: Decimal,
    pub interest_rate: Decimal,
    pub term_months: i32,
    pub purpose: String,
    pub status: LoanStatus,
    pub amount_repaid: Decimal,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_note: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateLoan {
    pub member_id: Uuid,
    pub chama_id: Uuid,
    pub amount: Decimal,
    pub interest_rate: Decimal,
    pub term_months: i32,
    pub purpose: String,
}

/// Loan as returned by the API, with the derived repayment figures.
#[derive(Debug, Clone, Serialize)]
pub struct LoanView {
    #[serde(flatten)]
    pub loan: Loan,
    pub total_due: Decimal,
    pub balance: Decimal,
}

impl From<Loan> for LoanView {
    fn from(loan: Loan) -> Self {
        Self {
            total_due: loan.total_due(),
            balance: loan.balance(),
            loan,
        }
    }
}

/// Principal plus flat interest, rounded to cents.
pub fn total_due(amount: Decimal, interest_rate: Decimal) -> Decimal {
    let interest = amount * interest_rate / Decimal::ONE_HUNDRED;
    to_cents(amount + interest)
}

pub fn to_cents(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// How much a member may still borrow given their contributions and the
/// principal of loans they have not cleared.
pub fn loan_limit(total_contributions: Decimal, outstanding_principal: Decimal) -> Decimal {
    let limit = total_contributions * Decimal::from(LOAN_MULTIPLIER) - outstanding_principal;
    limit.max(Decimal::ZERO)
}

pub fn check_eligibility(
    amount: Decimal,
    total_contributions: Decimal,
    has_active_loan: bool,
) -> Result<(), LoanError> {
    if amount <= Decimal::ZERO {
        return Err(LoanError::NonPositiveAmount);
    }
    if has_active_loan {
        return Err(LoanError::ActiveLoanExists);
    }
    let limit = loan_limit(total_contributions, Decimal::ZERO);
    if amount > limit {
        return Err(LoanError::ExceedsLimit { limit });
    }
    Ok(())
}

/// Approved loans fall due `term_months` after review. Month ends clamp, so
/// 31 January plus one month is the last day of February.
pub fn due_date(reviewed_at: DateTime<Utc>, term_months: i32) -> Option<DateTime<Utc>> {
    let months = u32::try_from(term_months).ok()?;
    reviewed_at.checked_add_months(Months::new(months))
}

impl Loan {
    pub fn total_due(&self) -> Decimal {
        total_due(self.amount, self.interest_rate)
    }

    pub fn balance(&self) -> Decimal {
        (self.total_due() - self.amount_repaid).max(Decimal::ZERO)
    }

    /// Works out the repaid total and status after a repayment, without
    /// touching storage.
    pub fn apply_repayment(&self, amount: Decimal) -> Result<(Decimal, LoanStatus), LoanError> {
        if amount <= Decimal::ZERO {
            return Err(LoanError::NonPositiveAmount);
        }
        if self.status != LoanStatus::Approved {
            return Err(LoanError::InvalidTransition {
                from: self.status,
                to: LoanStatus::Repaid,
            });
        }
        let balance = self.balance();
        if amount > balance {
            return Err(LoanError::Overpayment { amount, balance });
        }

        let repaid = to_cents(self.amount_repaid + amount);
        let status = if repaid >= self.total_due() {
            LoanStatus::Repaid
        } else {
            LoanStatus::Approved
        };
        Ok((repaid, status))
    }

    pub async fn create(pool: &DbPool, loan: CreateLoan) -> Result<Self, LoanError> {
        let now = Utc::now();

        let created = sqlx::query_as::<_, Loan>(
            "INSERT INTO loans (id, member_id, chama_id, amount, interest_rate, term_months, purpose, status, amount_repaid, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(loan.member_id)
        .bind(loan.chama_id)
        .bind(loan.amount)
        .bind(loan.interest_rate)
        .bind(loan.term_months)
        .bind(loan.purpose.trim())
        .bind(LoanStatus::Pending)
        .bind(Decimal::ZERO)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                LoanError::ActiveLoanExists
            } else {
                LoanError::Database(e)
            }
        })?;

        Ok(created)
    }

    pub async fn find_by_id(pool: &DbPool, id: Uuid) -> Result<Option<Self>, LoanError> {
        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(loan)
    }

    pub async fn find_by_member(pool: &DbPool, member_id: Uuid) -> Result<Vec<Self>, LoanError> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE member_id = $1 ORDER BY created_at DESC",
        )
        .bind(member_id)
        .fetch_all(pool)
        .await?;

        Ok(loans)
    }

    pub async fn find_by_chama(pool: &DbPool, chama_id: Uuid) -> Result<Vec<Self>, LoanError> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE chama_id = $1 ORDER BY created_at DESC",
        )
        .bind(chama_id)
        .fetch_all(pool)
        .await?;

        Ok(loans)
    }

    pub async fn find_active_for_member(
        pool: &DbPool,
        member_id: Uuid,
    ) -> Result<Option<Self>, LoanError> {
        let loan = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE member_id = $1 AND status IN ('pending', 'approved') LIMIT 1",
        )
        .bind(member_id)
        .fetch_optional(pool)
        .await?;

        Ok(loan)
    }

    pub async fn review(
        pool: &DbPool,
        id: Uuid,
        decision: ReviewDecision,
        reviewer: Uuid,
        note: Option<String>,
    ) -> Result<Self, LoanError> {
        let existing = Self::find_by_id(pool, id)
            .await?
            .ok_or(LoanError::NotFound { id })?;

        let target = decision.target();
        if !existing.status.can_transition_to(target) {
            return Err(LoanError::InvalidTransition {
                from: existing.status,
                to: target,
            });
        }

        let now = Utc::now();
        let due = match decision {
            ReviewDecision::Approve => due_date(now, existing.term_months),
            ReviewDecision::Reject => None,
        };

        // Guarded on status so two concurrent reviews cannot both succeed.
        let updated = sqlx::query_as::<_, Loan>(
            "UPDATE loans
             SET status = $2, reviewed_by = $3, reviewed_at = $4, review_note = $5, due_date = $6, updated_at = $4
             WHERE id = $1 AND status = 'pending'
             RETURNING *",
        )
        .bind(id)
        .bind(target)
        .bind(reviewer)
        .bind(now)
        .bind(note)
        .bind(due)
        .fetch_optional(pool)
        .await?;

        updated.ok_or(LoanError::InvalidTransition {
            from: existing.status,
            to: target,
        })
    }

    pub async fn record_repayment(
        pool: &DbPool,
        id: Uuid,
        amount: Decimal,
    ) -> Result<Self, LoanError> {
        let mut tx = pool.begin().await?;

        let existing = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(LoanError::NotFound { id })?;

        let (repaid, status) = existing.apply_repayment(amount)?;

        let updated = sqlx::query_as::<_, Loan>(
            "UPDATE loans SET amount_repaid = $2, status = $3, updated_at = $4 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(repaid)
        .bind(status)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn loan(amount: &str, rate: &str, repaid: &str, status: LoanStatus) -> Loan {
        let now = Utc::now();
        Loan {
            id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
            chama_id: Uuid::new_v4(),
            amount: dec(amount),
            interest_rate: dec(rate),
            term_months: 6,
            purpose: "School fees".to_string(),
            status,
            amount_repaid: dec(repaid),
            reviewed_by: None,
            reviewed_at: None,
            review_note: None,
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn only_forward_transitions_are_allowed() {
        use LoanStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Repaid));

        assert!(!Pending.can_transition_to(Repaid));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Repaid.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Approved));
    }

    #[test]
    fn total_due_applies_flat_interest() {
        assert_eq!(total_due(dec("10000"), dec("10")), dec("11000.00"));
        assert_eq!(total_due(dec("333.33"), dec("7.5")), dec("358.33"));
        assert_eq!(total_due(dec("500"), Decimal::ZERO).to_string(), "500.00");
    }

    #[test]
    fn eligibility_caps_at_three_times_contributions() {
        assert!(check_eligibility(dec("15000"), dec("5000"), false).is_ok());
        match check_eligibility(dec("15000.01"), dec("5000"), false) {
            Err(LoanError::ExceedsLimit { limit }) => assert_eq!(limit, dec("15000")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn eligibility_rejects_second_loan_and_bad_amounts() {
        assert!(matches!(
            check_eligibility(dec("100"), dec("5000"), true),
            Err(LoanError::ActiveLoanExists)
        ));
        assert!(matches!(
            check_eligibility(Decimal::ZERO, dec("5000"), false),
            Err(LoanError::NonPositiveAmount)
        ));
        assert!(matches!(
            check_eligibility(dec("1"), Decimal::ZERO, false),
            Err(LoanError::ExceedsLimit { .. })
        ));
    }

    #[test]
    fn loan_limit_never_negative() {
        assert_eq!(loan_limit(dec("1000"), dec("5000")), Decimal::ZERO);
        assert_eq!(loan_limit(dec("1000"), dec("1000")), dec("2000"));
    }

    #[test]
    fn partial_then_full_repayment() {
        let mut l = loan("10000", "10", "0", LoanStatus::Approved);
        assert_eq!(l.balance(), dec("11000.00"));

        let (repaid, status) = l.apply_repayment(dec("4000")).unwrap();
        assert_eq!(repaid, dec("4000"));
        assert_eq!(status, LoanStatus::Approved);

        l.amount_repaid = repaid;
        assert_eq!(l.balance(), dec("7000.00"));

        let (repaid, status) = l.apply_repayment(dec("7000")).unwrap();
        assert_eq!(repaid, dec("11000"));
        assert_eq!(status, LoanStatus::Repaid);
    }

    #[test]
    fn overpayment_is_rejected() {
        let l = loan("1000", "10", "1000", LoanStatus::Approved);
        match l.apply_repayment(dec("100.01")) {
            Err(LoanError::Overpayment { balance, .. }) => assert_eq!(balance, dec("100.00")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn repayment_requires_approved_loan() {
        let l = loan("1000", "10", "0", LoanStatus::Pending);
        assert!(matches!(
            l.apply_repayment(dec("10")),
            Err(LoanError::InvalidTransition { from: LoanStatus::Pending, .. })
        ));
        assert!(matches!(
            loan("1000", "10", "0", LoanStatus::Approved).apply_repayment(dec("-5")),
            Err(LoanError::NonPositiveAmount)
        ));
    }

    #[test]
    fn sub_cent_repayment_still_closes_the_loan() {
        let mut l = loan("100", "0", "0", LoanStatus::Approved);

        let (repaid, status) = l.apply_repayment(dec("99.995")).unwrap();
        assert_eq!(repaid.to_string(), "100.00");
        assert_eq!(status, LoanStatus::Repaid);

        l.amount_repaid = dec("99.99");
        let (repaid, status) = l.apply_repayment(dec("0.004")).unwrap();
        assert_eq!(repaid, dec("99.99"));
        assert_eq!(status, LoanStatus::Approved);
        assert_eq!(l.balance(), dec("0.01"));
    }

    #[test]
    fn due_date_adds_the_term() {
        let reviewed = Utc.with_ymd_and_hms(2025, 3, 15, 9, 30, 0).unwrap();
        assert_eq!(
            due_date(reviewed, 6),
            Some(Utc.with_ymd_and_hms(2025, 9, 15, 9, 30, 0).unwrap())
        );
        assert_eq!(
            due_date(reviewed, 24),
            Some(Utc.with_ymd_and_hms(2027, 3, 15, 9, 30, 0).unwrap())
        );
    }

    #[test]
    fn due_date_clamps_to_month_end() {
        let jan_31 = Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap();
        assert_eq!(
            due_date(jan_31, 1),
            Some(Utc.with_ymd_and_hms(2025, 2, 28, 12, 0, 0).unwrap())
        );
        let leap = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
        assert_eq!(
            due_date(leap, 1),
            Some(Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap())
        );
        assert_eq!(due_date(jan_31, -1), None);
    }

    #[test]
    fn view_exposes_derived_figures() {
        let view = LoanView::from(loan("2000", "5", "500", LoanStatus::Approved));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["total_due"], "2100.00");
        assert_eq!(json["balance"], "1600.00");
        assert_eq!(json["status"], "approved");
    }
}
