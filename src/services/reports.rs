//! Chama and member reports, computed from rows already loaded from the
//! database. Nothing here does I/O.

use crate::models::{
    contribution::Contribution,
    loan::{loan_limit, to_cents, Loan, LoanStatus, LoanView},
    user::User,
};
use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

const FORMER_MEMBER: &str = "Former member";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MemberTotal {
    pub member_id: Uuid,
    pub fullname: String,
    pub total: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthlyTotal {
    /// `YYYY-MM`
    pub month: String,
    pub total: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct LoanStatusCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub repaid: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChamaSummary {
    pub total_contributions: Decimal,
    pub contribution_count: usize,
    pub member_totals: Vec<MemberTotal>,
    pub monthly_totals: Vec<MonthlyTotal>,
    pub loans_by_status: LoanStatusCounts,
    pub total_disbursed: Decimal,
    pub total_repaid: Decimal,
    pub outstanding_balance: Decimal,
    pub available_funds: Decimal,
}

fn month_key(at: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", at.year(), at.month())
}

impl ChamaSummary {
    pub fn build(contributions: &[Contribution], loans: &[Loan], members: &[User]) -> Self {
        let mut per_member: HashMap<Uuid, MemberTotal> = members
            .iter()
            .map(|m| {
                (
                    m.id,
                    MemberTotal {
                        member_id: m.id,
                        fullname: m.fullname.clone(),
                        total: Decimal::ZERO,
                        count: 0,
                    },
                )
            })
            .collect();
        let mut per_month: BTreeMap<String, (Decimal, usize)> = BTreeMap::new();
        let mut total_contributions = Decimal::ZERO;

        for c in contributions {
            total_contributions += c.amount;

            let entry = per_member.entry(c.member_id).or_insert_with(|| MemberTotal {
                member_id: c.member_id,
                fullname: FORMER_MEMBER.to_string(),
                total: Decimal::ZERO,
                count: 0,
            });
            entry.total += c.amount;
            entry.count += 1;

            let month = per_month.entry(month_key(c.contributed_at)).or_default();
            month.0 += c.amount;
            month.1 += 1;
        }

        let mut member_totals: Vec<MemberTotal> = per_member
            .into_values()
            .map(|mut m| {
                m.total = to_cents(m.total);
                m
            })
            .collect();
        member_totals.sort_by(|a, b| {
            b.total
                .cmp(&a.total)
                .then_with(|| a.fullname.cmp(&b.fullname))
        });

        let monthly_totals = per_month
            .into_iter()
            .map(|(month, (total, count))| MonthlyTotal {
                month,
                total: to_cents(total),
                count,
            })
            .collect();

        let mut loans_by_status = LoanStatusCounts::default();
        let mut total_disbursed = Decimal::ZERO;
        let mut total_repaid = Decimal::ZERO;
        let mut outstanding_balance = Decimal::ZERO;

        for loan in loans {
            match loan.status {
                LoanStatus::Pending => loans_by_status.pending += 1,
                LoanStatus::Rejected => loans_by_status.rejected += 1,
                LoanStatus::Approved => {
                    loans_by_status.approved += 1;
                    outstanding_balance += loan.balance();
                }
                LoanStatus::Repaid => loans_by_status.repaid += 1,
            }
            if matches!(loan.status, LoanStatus::Approved | LoanStatus::Repaid) {
                total_disbursed += loan.amount;
                total_repaid += loan.amount_repaid;
            }
        }

        Self {
            total_contributions: to_cents(total_contributions),
            contribution_count: contributions.len(),
            member_totals,
            monthly_totals,
            loans_by_status,
            total_disbursed: to_cents(total_disbursed),
            total_repaid: to_cents(total_repaid),
            outstanding_balance: to_cents(outstanding_balance),
            available_funds: to_cents(total_contributions + total_repaid - total_disbursed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberStatement {
    pub member_id: Uuid,
    pub fullname: String,
    pub total_contributed: Decimal,
    pub contribution_count: usize,
    pub last_contribution_at: Option<DateTime<Utc>>,
    pub active_loan: Option<LoanView>,
    pub loan_limit: Decimal,
}

impl MemberStatement {
    pub fn build(member: &User, contributions: &[Contribution], loans: &[Loan]) -> Self {
        let own: Vec<&Contribution> = contributions
            .iter()
            .filter(|c| c.member_id == member.id)
            .collect();
        let total: Decimal = own.iter().map(|c| c.amount).sum();

        let active_loan = loans
            .iter()
            .filter(|l| l.member_id == member.id && l.status.is_active())
            .max_by_key(|l| l.created_at)
            .cloned();
        let outstanding_principal = active_loan.as_ref().map_or(Decimal::ZERO, |l| l.amount);

        Self {
            member_id: member.id,
            fullname: member.fullname.clone(),
            total_contributed: to_cents(total),
            contribution_count: own.len(),
            last_contribution_at: own.iter().map(|c| c.contributed_at).max(),
            active_loan: active_loan.map(LoanView::from),
            loan_limit: to_cents(loan_limit(total, outstanding_principal)),
        }
    }
}
