use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::PayrollError;
use crate::model::role::ApprovalTier;

/// Lifecycle of a single payslip item.
///
/// ```text
/// Pending ──► ApprovedByHr ──► Paid
///    │              └────────► RejectedAtRelease
///    └──────► RejectedByHr
/// ```
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PayslipStatus {
    Pending,
    ApprovedByHr,
    RejectedByHr,
    Paid,
    RejectedAtRelease,
}

impl PayslipStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PayslipStatus::RejectedByHr | PayslipStatus::Paid | PayslipStatus::RejectedAtRelease
        )
    }

    pub fn is_rejection(self) -> bool {
        matches!(self, PayslipStatus::RejectedByHr | PayslipStatus::RejectedAtRelease)
    }

    pub fn can_transition_to(self, next: PayslipStatus) -> bool {
        use PayslipStatus::*;
        matches!(
            (self, next),
            (Pending, ApprovedByHr)
                | (Pending, RejectedByHr)
                | (ApprovedByHr, Paid)
                | (ApprovedByHr, RejectedAtRelease)
        )
    }

    /// Tier allowed to move an item *into* this status.
    pub fn required_tier(self) -> Option<ApprovalTier> {
        match self {
            PayslipStatus::Pending => None,
            PayslipStatus::ApprovedByHr | PayslipStatus::RejectedByHr => Some(ApprovalTier::Hr),
            PayslipStatus::Paid | PayslipStatus::RejectedAtRelease => Some(ApprovalTier::Release),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PayslipBatch {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Payroll 2026-01-01 to 2026-01-15")]
    pub title: String,
    pub remarks: Option<String>,
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub period_start: NaiveDate,
    #[schema(example = "2026-01-15", value_type = String, format = "date")]
    pub period_end: NaiveDate,
    #[schema(example = 7)]
    pub created_by: u64,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl PayslipBatch {
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.period_start <= end && start <= self.period_end
    }
}

/// Batch row before the store has assigned it an id.
#[derive(Debug, Clone)]
pub struct NewBatch {
    pub title: String,
    pub remarks: Option<String>,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub created_by: u64,
    pub created_at: DateTime<Utc>,
}

/// Calculator inputs together with the derived columns. Always written as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayslipAmounts {
    pub total_hours_worked: Decimal,
    pub overtime_pay: Decimal,
    pub philhealth_deduction: Decimal,
    pub sss_deduction: Decimal,
    pub pagibig_deduction: Decimal,
    pub total_deductions: Decimal,
    pub calculated_base_salary: Decimal,
    pub final_salary: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewPayslipItem {
    pub employee_id: u64,
    pub hourly_rate: Decimal,
    pub amounts: PayslipAmounts,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PayslipItem {
    #[schema(example = 11)]
    pub id: u64,
    #[schema(example = 1)]
    pub batch_id: u64,
    #[schema(example = 1001)]
    pub employee_id: u64,
    #[schema(example = "20.00")]
    pub hourly_rate: Decimal,
    #[schema(example = "80")]
    pub total_hours_worked: Decimal,
    #[schema(example = "500.00")]
    pub overtime_pay: Decimal,
    pub philhealth_deduction: Decimal,
    pub sss_deduction: Decimal,
    pub pagibig_deduction: Decimal,
    pub total_deductions: Decimal,
    #[schema(example = "1600.00")]
    pub calculated_base_salary: Decimal,
    #[schema(example = "2100.00")]
    pub final_salary: Decimal,
    pub status: PayslipStatus,
    pub remarks: Option<String>,
    pub decided_by: Option<u64>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub decided_at: Option<DateTime<Utc>>,
    pub released_by: Option<u64>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub released_at: Option<DateTime<Utc>>,
    pub evidence_ref: Option<String>,
    pub version: u32,
}

impl PayslipItem {
    pub fn amounts(&self) -> PayslipAmounts {
        PayslipAmounts {
            total_hours_worked: self.total_hours_worked,
            overtime_pay: self.overtime_pay,
            philhealth_deduction: self.philhealth_deduction,
            sss_deduction: self.sss_deduction,
            pagibig_deduction: self.pagibig_deduction,
            total_deductions: self.total_deductions,
            calculated_base_salary: self.calculated_base_salary,
            final_salary: self.final_salary,
        }
    }

    pub fn set_amounts(&mut self, amounts: PayslipAmounts) {
        self.total_hours_worked = amounts.total_hours_worked;
        self.overtime_pay = amounts.overtime_pay;
        self.philhealth_deduction = amounts.philhealth_deduction;
        self.sss_deduction = amounts.sss_deduction;
        self.pagibig_deduction = amounts.pagibig_deduction;
        self.total_deductions = amounts.total_deductions;
        self.calculated_base_salary = amounts.calculated_base_salary;
        self.final_salary = amounts.final_salary;
    }

    /// Single gate for every status change, bulk or not.
    pub fn check_transition(&self, next: PayslipStatus) -> Result<(), PayrollError> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(PayrollError::InvalidTransition {
                item_id: self.id,
                current: self.status,
                requested: next,
            })
        }
    }

    pub fn check_editable(&self) -> Result<(), PayrollError> {
        if self.status == PayslipStatus::Pending {
            Ok(())
        } else {
            Err(PayrollError::ImmutableState {
                item_id: self.id,
                status: self.status,
            })
        }
    }

    /// Applies an already validated transition to this row.
    pub fn apply(&mut self, transition: &Transition) {
        self.status = transition.to;
        if transition.remark.is_some() {
            self.remarks = transition.remark.clone();
        }
        match transition.to.required_tier() {
            Some(ApprovalTier::Hr) => {
                self.decided_by = Some(transition.actor_id);
                self.decided_at = Some(transition.at);
            }
            Some(ApprovalTier::Release) => {
                self.released_by = Some(transition.actor_id);
                self.released_at = Some(transition.at);
                if transition.evidence_ref.is_some() {
                    self.evidence_ref = transition.evidence_ref.clone();
                }
            }
            None => {}
        }
        self.version += 1;
    }
}

/// A requested status change, stamped with who asked and when.
#[derive(Debug, Clone)]
pub struct Transition {
    pub to: PayslipStatus,
    pub actor_id: u64,
    pub remark: Option<String>,
    pub evidence_ref: Option<String>,
    pub at: DateTime<Utc>,
}

impl Transition {
    pub fn event_for(&self, item_id: u64, from: PayslipStatus) -> NewItemEvent {
        NewItemEvent {
            item_id,
            from_status: from,
            to_status: self.to,
            actor_id: self.actor_id,
            remark: self.remark.clone(),
            at: self.at,
        }
    }
}

/// Audit row written alongside each status change.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemEvent {
    pub id: u64,
    pub item_id: u64,
    pub from_status: PayslipStatus,
    pub to_status: PayslipStatus,
    pub actor_id: u64,
    pub remark: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewItemEvent {
    pub item_id: u64,
    pub from_status: PayslipStatus,
    pub to_status: PayslipStatus,
    pub actor_id: u64,
    pub remark: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusTotal {
    pub items: u32,
    pub final_salary: Decimal,
}

impl StatusTotal {
    fn add(&mut self, item: &PayslipItem) {
        self.items = self.items.saturating_add(1);
        self.final_salary = self.final_salary.saturating_add(item.final_salary);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BatchSummary {
    pub total_items: u32,
    pub pending: StatusTotal,
    pub approved_by_hr: StatusTotal,
    pub rejected_by_hr: StatusTotal,
    pub paid: StatusTotal,
    pub rejected_at_release: StatusTotal,
}

impl BatchSummary {
    pub fn from_items(items: &[PayslipItem]) -> Self {
        let mut summary = BatchSummary::default();
        for item in items {
            summary.total_items += 1;
            let bucket = match item.status {
                PayslipStatus::Pending => &mut summary.pending,
                PayslipStatus::ApprovedByHr => &mut summary.approved_by_hr,
                PayslipStatus::RejectedByHr => &mut summary.rejected_by_hr,
                PayslipStatus::Paid => &mut summary.paid,
                PayslipStatus::RejectedAtRelease => &mut summary.rejected_at_release,
            };
            bucket.add(item);
        }
        summary
    }
}
