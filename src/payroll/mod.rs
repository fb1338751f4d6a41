//! Payroll computation and approval.
//!
//! Data moves one way: attendance is aggregated into hours, the calculator
//! turns hours into pay, batches group one item per employee, HR decides on
//! items, and the release gate pays or bounces HR-approved items.

pub mod aggregator;
pub mod approval;
pub mod batch;
pub mod calculator;
pub mod release;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use crate::error::PayrollError;
use crate::model::payslip::{ItemEvent, PayslipItem};
use crate::model::role::{Actor, ApprovalTier};
use crate::store::{AttendanceSource, EmployeeDirectory, PayrollStore};

pub use batch::OverlapPolicy;

pub struct PayrollEngine {
    store: Arc<dyn PayrollStore>,
    directory: Arc<dyn EmployeeDirectory>,
    attendance: Arc<dyn AttendanceSource>,
    overlap_policy: OverlapPolicy,
}

impl PayrollEngine {
    pub fn new(
        store: Arc<dyn PayrollStore>,
        directory: Arc<dyn EmployeeDirectory>,
        attendance: Arc<dyn AttendanceSource>,
        overlap_policy: OverlapPolicy,
    ) -> Self {
        Self {
            store,
            directory,
            attendance,
            overlap_policy,
        }
    }

    fn authorize(actor: &Actor, required: ApprovalTier, action: &'static str) -> Result<(), PayrollError> {
        if actor.tier == Some(required) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = actor.user_id,
                username = %actor.username,
                required = %required,
                action,
                "Payroll action refused for caller tier"
            );
            Err(PayrollError::Forbidden { action, required })
        }
    }

    fn authorize_read(actor: &Actor, action: &'static str) -> Result<(), PayrollError> {
        if actor.tier.is_some() {
            Ok(())
        } else {
            Err(PayrollError::NoApprovalTier { action })
        }
    }

    async fn load_item(&self, item_id: u64) -> Result<PayslipItem, PayrollError> {
        self.store
            .item(item_id)
            .await?
            .ok_or_else(|| PayrollError::not_found("payslip item", item_id))
    }

    pub async fn get_item(&self, actor: &Actor, item_id: u64) -> Result<PayslipItem, PayrollError> {
        Self::authorize_read(actor, "view payslip item")?;
        self.load_item(item_id).await
    }

    pub async fn item_history(&self, actor: &Actor, item_id: u64) -> Result<Vec<ItemEvent>, PayrollError> {
        Self::authorize_read(actor, "view payslip history")?;
        self.load_item(item_id).await?;
        self.store.item_events(item_id).await
    }
}
