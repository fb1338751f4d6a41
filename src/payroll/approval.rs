use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use super::PayrollEngine;
use super::aggregator;
use super::calculator::{PayInputs, compute_amounts};
use crate::error::PayrollError;
use crate::model::payslip::{PayslipItem, PayslipStatus, Transition};
use crate::model::role::{Actor, ApprovalTier};

/// HR edits to calculator inputs. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ItemEdit {
    #[schema(example = "80")]
    pub total_hours_worked: Option<Decimal>,
    #[schema(example = "500.00")]
    pub overtime_pay: Option<Decimal>,
    pub philhealth_deduction: Option<Decimal>,
    pub sss_deduction: Option<Decimal>,
    pub pagibig_deduction: Option<Decimal>,
}

impl ItemEdit {
    fn is_empty(&self) -> bool {
        self.total_hours_worked.is_none()
            && self.overtime_pay.is_none()
            && self.philhealth_deduction.is_none()
            && self.sss_deduction.is_none()
            && self.pagibig_deduction.is_none()
    }

    fn merged_with(&self, item: &PayslipItem) -> PayInputs {
        PayInputs {
            hours: self.total_hours_worked.unwrap_or(item.total_hours_worked),
            hourly_rate: item.hourly_rate,
            overtime_pay: self.overtime_pay.unwrap_or(item.overtime_pay),
            philhealth: self.philhealth_deduction.unwrap_or(item.philhealth_deduction),
            sss: self.sss_deduction.unwrap_or(item.sss_deduction),
            pagibig: self.pagibig_deduction.unwrap_or(item.pagibig_deduction),
        }
    }
}

fn clean_remark(remark: Option<String>) -> Option<String> {
    remark.map(|r| r.trim().to_string()).filter(|r| !r.is_empty())
}

/// Stamps a transition after checking the remark rule: rejections must say why.
pub(super) fn stamp(
    actor: &Actor,
    to: PayslipStatus,
    remark: Option<String>,
    evidence_ref: Option<String>,
) -> Result<Transition, PayrollError> {
    let remark = clean_remark(remark);
    if to.is_rejection() && remark.is_none() {
        return Err(PayrollError::InvalidInput(format!(
            "a remark is required to move items to {to}"
        )));
    }
    Ok(Transition {
        to,
        actor_id: actor.user_id,
        remark,
        evidence_ref: clean_remark(evidence_ref),
        at: Utc::now(),
    })
}

impl PayrollEngine {
    /// Every status change, bulk or single, HR or release, lands here.
    pub(super) async fn commit_transition(
        &self,
        item_ids: &[u64],
        transition: Transition,
    ) -> Result<Vec<PayslipItem>, PayrollError> {
        if item_ids.is_empty() {
            return Err(PayrollError::InvalidInput("no payslip items given".into()));
        }
        // ascending id order is the lock order for every writer
        let mut ids = item_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let items = self.store.transition_items(&ids, &transition).await?;
        info!(
            user_id = transition.actor_id,
            status = %transition.to,
            items = ?ids,
            "Payslip items transitioned"
        );
        Ok(items)
    }

    /// HR decision on a set of `Pending` items. Either every item moves or none does.
    pub async fn transition_items(
        &self,
        actor: &Actor,
        item_ids: &[u64],
        new_status: PayslipStatus,
        remark: Option<String>,
    ) -> Result<Vec<PayslipItem>, PayrollError> {
        if new_status.required_tier() != Some(ApprovalTier::Hr) {
            return Err(PayrollError::InvalidInput(format!(
                "{new_status} is not an HR decision"
            )));
        }
        Self::authorize(actor, ApprovalTier::Hr, "decide on payslip items")?;
        let transition = stamp(actor, new_status, remark, None)?;
        self.commit_transition(item_ids, transition).await
    }

    /// Approves every item of the batch still `Pending`; decided items stay as they are.
    pub async fn accept_batch(
        &self,
        actor: &Actor,
        batch_id: u64,
        remark: Option<String>,
    ) -> Result<Vec<PayslipItem>, PayrollError> {
        self.decide_batch(actor, batch_id, PayslipStatus::ApprovedByHr, remark)
            .await
    }

    /// Rejects every item of the batch still `Pending`; decided items stay as they are.
    pub async fn reject_batch(
        &self,
        actor: &Actor,
        batch_id: u64,
        remark: String,
    ) -> Result<Vec<PayslipItem>, PayrollError> {
        self.decide_batch(actor, batch_id, PayslipStatus::RejectedByHr, Some(remark))
            .await
    }

    async fn decide_batch(
        &self,
        actor: &Actor,
        batch_id: u64,
        to: PayslipStatus,
        remark: Option<String>,
    ) -> Result<Vec<PayslipItem>, PayrollError> {
        Self::authorize(actor, ApprovalTier::Hr, "decide on payroll batch")?;
        let transition = stamp(actor, to, remark, None)?;
        let items = self
            .store
            .transition_pending_in_batch(batch_id, &transition)
            .await?;
        info!(
            batch_id,
            user_id = actor.user_id,
            status = %to,
            items = items.len(),
            "Batch decision applied"
        );
        Ok(items)
    }

    /// Re-runs the calculator on edited inputs. Only `Pending` items are editable.
    pub async fn edit_item_fields(
        &self,
        actor: &Actor,
        item_id: u64,
        edit: ItemEdit,
    ) -> Result<PayslipItem, PayrollError> {
        Self::authorize(actor, ApprovalTier::Hr, "edit payslip item")?;
        if edit.is_empty() {
            return Err(PayrollError::InvalidInput("no fields provided for update".into()));
        }

        let item = self.load_item(item_id).await?;
        item.check_editable()?;

        let amounts = compute_amounts(&edit.merged_with(&item))?;
        let updated = self
            .store
            .update_amounts(item.id, item.version, amounts)
            .await?;
        info!(item_id, user_id = actor.user_id, final_salary = %updated.final_salary, "Payslip item edited");
        Ok(updated)
    }

    /// Re-reads attendance for the batch period and recomputes a `Pending` item.
    pub async fn recompute_hours(&self, actor: &Actor, item_id: u64) -> Result<PayslipItem, PayrollError> {
        Self::authorize(actor, ApprovalTier::Hr, "recompute payslip hours")?;

        let item = self.load_item(item_id).await?;
        item.check_editable()?;
        let batch = self
            .store
            .batch(item.batch_id)
            .await?
            .ok_or_else(|| PayrollError::not_found("payslip batch", item.batch_id))?;

        let hours = aggregator::total_hours(
            self.directory.as_ref(),
            self.attendance.as_ref(),
            item.employee_id,
            batch.period_start,
            batch.period_end,
        )
        .await?;

        let edit = ItemEdit {
            total_hours_worked: Some(hours),
            ..ItemEdit::default()
        };
        let amounts = compute_amounts(&edit.merged_with(&item))?;
        let updated = self
            .store
            .update_amounts(item.id, item.version, amounts)
            .await?;
        info!(item_id, %hours, "Payslip hours recomputed from attendance");
        Ok(updated)
    }
}
