//! Seams between the payroll engine and the systems it does not own.
//!
//! `EmployeeDirectory` and `AttendanceSource` are read-only collaborators.
//! `PayrollStore` owns batch and item rows and is responsible for the
//! atomicity guarantees the engine relies on: a generated batch appears with
//! all of its items or not at all, and every status change is a per-item
//! check-and-set.

#[cfg(test)]
pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::PayrollError;
use crate::model::attendance::AttendanceEntry;
use crate::model::employee::Employee;
use crate::model::payslip::{
    ItemEvent, NewBatch, NewPayslipItem, PayslipAmounts, PayslipBatch, PayslipItem, Transition,
};

pub type StoreResult<T> = Result<T, PayrollError>;

#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn active_employees(&self) -> StoreResult<Vec<Employee>>;

    async fn employee(&self, employee_id: u64) -> StoreResult<Option<Employee>>;
}

#[async_trait]
pub trait AttendanceSource: Send + Sync {
    async fn attendance(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<AttendanceEntry>>;
}

#[async_trait]
pub trait PayrollStore: Send + Sync {
    /// Writes the batch and every item as one unit.
    async fn insert_batch(
        &self,
        batch: NewBatch,
        items: Vec<NewPayslipItem>,
    ) -> StoreResult<(PayslipBatch, Vec<PayslipItem>)>;

    async fn batch(&self, batch_id: u64) -> StoreResult<Option<PayslipBatch>>;

    /// Newest first.
    async fn batches(&self) -> StoreResult<Vec<PayslipBatch>>;

    async fn batch_items(&self, batch_id: u64) -> StoreResult<Vec<PayslipItem>>;

    async fn item(&self, item_id: u64) -> StoreResult<Option<PayslipItem>>;

    /// Employee ids holding a non-rejected item in any batch whose period
    /// overlaps `[start, end]`.
    async fn covered_employees(&self, start: NaiveDate, end: NaiveDate) -> StoreResult<Vec<u64>>;

    /// Overwrites the amounts of a `Pending` item whose version still equals
    /// `expected_version`.
    async fn update_amounts(
        &self,
        item_id: u64,
        expected_version: u32,
        amounts: PayslipAmounts,
    ) -> StoreResult<PayslipItem>;

    /// Moves every listed item, or none of them.
    async fn transition_items(
        &self,
        item_ids: &[u64],
        transition: &Transition,
    ) -> StoreResult<Vec<PayslipItem>>;

    /// Moves every item of the batch that is `Pending` at the time of the call.
    async fn transition_pending_in_batch(
        &self,
        batch_id: u64,
        transition: &Transition,
    ) -> StoreResult<Vec<PayslipItem>>;

    /// Oldest first.
    async fn item_events(&self, item_id: u64) -> StoreResult<Vec<ItemEvent>>;
}
