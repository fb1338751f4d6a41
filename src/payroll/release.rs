use tracing::info;

use super::PayrollEngine;
use super::approval::stamp;
use crate::error::PayrollError;
use crate::model::payslip::{PayslipItem, PayslipStatus, Transition};
use crate::model::role::{Actor, ApprovalTier};

impl PayrollEngine {
    /// Marks an HR-approved item paid. `evidence_ref` points at a signature or
    /// receipt held elsewhere and is stored verbatim.
    pub async fn release_payment(
        &self,
        actor: &Actor,
        item_id: u64,
        evidence_ref: Option<String>,
    ) -> Result<PayslipItem, PayrollError> {
        Self::authorize(actor, ApprovalTier::Release, "release payment")?;
        let transition = stamp(actor, PayslipStatus::Paid, None, evidence_ref)?;
        let item = self.release_one(item_id, transition).await?;
        info!(item_id, user_id = actor.user_id, amount = %item.final_salary, "Payment released");
        Ok(item)
    }

    pub async fn reject_at_release(
        &self,
        actor: &Actor,
        item_id: u64,
        remark: String,
    ) -> Result<PayslipItem, PayrollError> {
        Self::authorize(actor, ApprovalTier::Release, "reject payment")?;
        let transition = stamp(actor, PayslipStatus::RejectedAtRelease, Some(remark), None)?;
        let item = self.release_one(item_id, transition).await?;
        info!(item_id, user_id = actor.user_id, "Payment rejected at release");
        Ok(item)
    }

    async fn release_one(
        &self,
        item_id: u64,
        transition: Transition,
    ) -> Result<PayslipItem, PayrollError> {
        self.commit_transition(&[item_id], transition)
            .await?
            .pop()
            .ok_or_else(|| PayrollError::not_found("payslip item", item_id))
    }
}
