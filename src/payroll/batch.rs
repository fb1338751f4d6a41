use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use super::PayrollEngine;
use super::aggregator;
use super::calculator::{PayInputs, compute_amounts, round_rate};
use crate::error::PayrollError;
use crate::model::payslip::{BatchSummary, NewBatch, NewPayslipItem, PayslipBatch, PayslipItem};
use crate::model::role::{Actor, ApprovalTier};

/// What to do with employees that already hold a live payslip for an
/// overlapping period.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum OverlapPolicy {
    /// Leave covered employees out of the new batch.
    #[default]
    ExcludeCovered,
    /// No check; overlapping runs are reviewed by hand.
    Allow,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GenerateBatch {
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub period_start: NaiveDate,
    #[schema(example = "2026-01-15", value_type = String, format = "date")]
    pub period_end: NaiveDate,
    #[schema(example = "Site crew payroll, first half of January")]
    pub title: String,
    #[schema(example = "Includes the Cebu tower crew")]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchDetail {
    pub batch: PayslipBatch,
    pub items: Vec<PayslipItem>,
    pub summary: BatchSummary,
}

impl BatchDetail {
    fn new(batch: PayslipBatch, items: Vec<PayslipItem>) -> Self {
        let summary = BatchSummary::from_items(&items);
        Self {
            batch,
            items,
            summary,
        }
    }
}

impl PayrollEngine {
    /// Builds one `Pending` item per eligible active employee and stores the
    /// batch with all of its items as a single unit.
    #[instrument(
        name = "payroll_generate",
        skip(self, actor, request),
        fields(user_id = actor.user_id, start = %request.period_start, end = %request.period_end)
    )]
    pub async fn generate(
        &self,
        actor: &Actor,
        request: GenerateBatch,
    ) -> Result<BatchDetail, PayrollError> {
        Self::authorize(actor, ApprovalTier::Hr, "generate payroll")?;

        let (start, end) = (request.period_start, request.period_end);
        if start > end {
            return Err(PayrollError::InvalidRange { start, end });
        }
        let title = request.title.trim();
        if title.is_empty() {
            return Err(PayrollError::InvalidInput("title must not be empty".into()));
        }

        let active = self.directory.active_employees().await?;
        if active.is_empty() {
            info!("No active employees, batch not created");
            return Err(PayrollError::NoEligibleEmployees { start, end });
        }

        let covered: HashSet<u64> = match self.overlap_policy {
            OverlapPolicy::ExcludeCovered => self
                .store
                .covered_employees(start, end)
                .await?
                .into_iter()
                .collect(),
            OverlapPolicy::Allow => HashSet::new(),
        };

        let mut items = Vec::with_capacity(active.len());
        for employee in active.iter().filter(|e| !covered.contains(&e.id)) {
            let hours = aggregator::total_hours(
                self.directory.as_ref(),
                self.attendance.as_ref(),
                employee.id,
                start,
                end,
            )
            .await?;
            let hourly_rate = round_rate(employee.hourly_rate);
            let amounts = compute_amounts(&PayInputs::hours_only(hours, hourly_rate))?;
            debug!(employee_id = employee.id, %hours, final_salary = %amounts.final_salary, "Computed payslip");
            items.push(NewPayslipItem {
                employee_id: employee.id,
                hourly_rate,
                amounts,
            });
        }

        if items.is_empty() {
            info!(covered = covered.len(), "Every active employee already covered");
            return Err(PayrollError::PeriodAlreadyCovered { start, end });
        }

        let new_batch = NewBatch {
            title: title.to_string(),
            remarks: request
                .remarks
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
            period_start: start,
            period_end: end,
            created_by: actor.user_id,
            created_at: Utc::now(),
        };

        let (batch, items) = self.store.insert_batch(new_batch, items).await?;
        info!(
            batch_id = batch.id,
            items = items.len(),
            skipped = active.len() - items.len(),
            "Payroll batch generated"
        );

        Ok(BatchDetail::new(batch, items))
    }

    pub async fn get_batch(&self, actor: &Actor, batch_id: u64) -> Result<BatchDetail, PayrollError> {
        Self::authorize_read(actor, "view payroll batch")?;
        let batch = self
            .store
            .batch(batch_id)
            .await?
            .ok_or_else(|| PayrollError::not_found("payslip batch", batch_id))?;
        let items = self.store.batch_items(batch_id).await?;
        Ok(BatchDetail::new(batch, items))
    }

    pub async fn list_batches(&self, actor: &Actor) -> Result<Vec<PayslipBatch>, PayrollError> {
        Self::authorize_read(actor, "list payroll batches")?;
        self.store.batches().await
    }
}
