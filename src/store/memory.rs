//! In-process implementations of the store traits.
//!
//! Every operation runs under one mutex, which makes each call a single
//! atomic unit. Backs the engine and HTTP tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, RwLock};

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{AttendanceSource, EmployeeDirectory, PayrollStore, StoreResult};
use crate::error::PayrollError;
use crate::model::attendance::AttendanceEntry;
use crate::model::employee::Employee;
use crate::model::payslip::{
    ItemEvent, NewBatch, NewItemEvent, NewPayslipItem, PayslipAmounts, PayslipBatch, PayslipItem,
    PayslipStatus, Transition,
};

#[derive(Default)]
struct Tables {
    batches: BTreeMap<u64, PayslipBatch>,
    items: BTreeMap<u64, PayslipItem>,
    events: Vec<ItemEvent>,
    last_batch_id: u64,
    last_item_id: u64,
    last_event_id: u64,
}

impl Tables {
    fn record_event(&mut self, event: NewItemEvent) {
        self.last_event_id += 1;
        self.events.push(ItemEvent {
            id: self.last_event_id,
            item_id: event.item_id,
            from_status: event.from_status,
            to_status: event.to_status,
            actor_id: event.actor_id,
            remark: event.remark,
            at: event.at,
        });
    }

    fn apply_transition(&mut self, item_id: u64, transition: &Transition) -> Option<PayslipItem> {
        let item = self.items.get_mut(&item_id)?;
        let from = item.status;
        item.apply(transition);
        let updated = item.clone();
        self.record_event(transition.event_for(item_id, from));
        Some(updated)
    }

    fn rollback_batch(&mut self, batch_id: u64) {
        self.items.retain(|_, item| item.batch_id != batch_id);
        self.batches.remove(&batch_id);
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_after_items: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose batch inserts break after writing `n` items, exercising
    /// the compensating rollback.
    pub fn failing_after(n: usize) -> Self {
        Self {
            tables: Mutex::default(),
            fail_after_items: Some(n),
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| PayrollError::Storage("payroll tables lock poisoned".into()))
    }
}

#[async_trait]
impl PayrollStore for MemoryStore {
    async fn insert_batch(
        &self,
        batch: NewBatch,
        items: Vec<NewPayslipItem>,
    ) -> StoreResult<(PayslipBatch, Vec<PayslipItem>)> {
        let mut tables = self.lock()?;

        tables.last_batch_id += 1;
        let batch = PayslipBatch {
            id: tables.last_batch_id,
            title: batch.title,
            remarks: batch.remarks,
            period_start: batch.period_start,
            period_end: batch.period_end,
            created_by: batch.created_by,
            created_at: batch.created_at,
        };
        tables.batches.insert(batch.id, batch.clone());

        let mut created = Vec::with_capacity(items.len());
        for (written, new_item) in items.into_iter().enumerate() {
            if self.fail_after_items == Some(written) {
                tables.rollback_batch(batch.id);
                return Err(PayrollError::Storage(format!(
                    "write failed after {written} payslip items"
                )));
            }
            if created
                .iter()
                .any(|item: &PayslipItem| item.employee_id == new_item.employee_id)
            {
                tables.rollback_batch(batch.id);
                return Err(PayrollError::InvalidInput(format!(
                    "employee {} appears twice in batch",
                    new_item.employee_id
                )));
            }

            tables.last_item_id += 1;
            let amounts = new_item.amounts;
            let item = PayslipItem {
                id: tables.last_item_id,
                batch_id: batch.id,
                employee_id: new_item.employee_id,
                hourly_rate: new_item.hourly_rate,
                total_hours_worked: amounts.total_hours_worked,
                overtime_pay: amounts.overtime_pay,
                philhealth_deduction: amounts.philhealth_deduction,
                sss_deduction: amounts.sss_deduction,
                pagibig_deduction: amounts.pagibig_deduction,
                total_deductions: amounts.total_deductions,
                calculated_base_salary: amounts.calculated_base_salary,
                final_salary: amounts.final_salary,
                status: PayslipStatus::Pending,
                remarks: None,
                decided_by: None,
                decided_at: None,
                released_by: None,
                released_at: None,
                evidence_ref: None,
                version: 1,
            };
            tables.items.insert(item.id, item.clone());
            created.push(item);
        }

        Ok((batch, created))
    }

    async fn batch(&self, batch_id: u64) -> StoreResult<Option<PayslipBatch>> {
        Ok(self.lock()?.batches.get(&batch_id).cloned())
    }

    async fn batches(&self) -> StoreResult<Vec<PayslipBatch>> {
        Ok(self.lock()?.batches.values().rev().cloned().collect())
    }

    async fn batch_items(&self, batch_id: u64) -> StoreResult<Vec<PayslipItem>> {
        Ok(self
            .lock()?
            .items
            .values()
            .filter(|item| item.batch_id == batch_id)
            .cloned()
            .collect())
    }

    async fn item(&self, item_id: u64) -> StoreResult<Option<PayslipItem>> {
        Ok(self.lock()?.items.get(&item_id).cloned())
    }

    async fn covered_employees(&self, start: NaiveDate, end: NaiveDate) -> StoreResult<Vec<u64>> {
        let tables = self.lock()?;
        let mut covered: Vec<u64> = tables
            .items
            .values()
            .filter(|item| !item.status.is_rejection())
            .filter(|item| {
                tables
                    .batches
                    .get(&item.batch_id)
                    .is_some_and(|batch| batch.overlaps(start, end))
            })
            .map(|item| item.employee_id)
            .collect();
        covered.sort_unstable();
        covered.dedup();
        Ok(covered)
    }

    async fn update_amounts(
        &self,
        item_id: u64,
        expected_version: u32,
        amounts: PayslipAmounts,
    ) -> StoreResult<PayslipItem> {
        let mut tables = self.lock()?;
        let item = tables
            .items
            .get_mut(&item_id)
            .ok_or_else(|| PayrollError::not_found("payslip item", item_id))?;

        item.check_editable()?;
        if item.version != expected_version {
            return Err(PayrollError::ConcurrentModification { item_id });
        }

        item.set_amounts(amounts);
        item.version += 1;
        Ok(item.clone())
    }

    async fn transition_items(
        &self,
        item_ids: &[u64],
        transition: &Transition,
    ) -> StoreResult<Vec<PayslipItem>> {
        let mut tables = self.lock()?;

        // validate everything before touching anything
        for &item_id in item_ids {
            tables
                .items
                .get(&item_id)
                .ok_or_else(|| PayrollError::not_found("payslip item", item_id))?
                .check_transition(transition.to)?;
        }

        Ok(item_ids
            .iter()
            .filter_map(|&item_id| tables.apply_transition(item_id, transition))
            .collect())
    }

    async fn transition_pending_in_batch(
        &self,
        batch_id: u64,
        transition: &Transition,
    ) -> StoreResult<Vec<PayslipItem>> {
        let mut tables = self.lock()?;
        if !tables.batches.contains_key(&batch_id) {
            return Err(PayrollError::not_found("payslip batch", batch_id));
        }

        let pending: Vec<u64> = tables
            .items
            .values()
            .filter(|item| item.batch_id == batch_id && item.status == PayslipStatus::Pending)
            .map(|item| item.id)
            .collect();

        Ok(pending
            .into_iter()
            .filter_map(|item_id| tables.apply_transition(item_id, transition))
            .collect())
    }

    async fn item_events(&self, item_id: u64) -> StoreResult<Vec<ItemEvent>> {
        Ok(self
            .lock()?
            .events
            .iter()
            .filter(|event| event.item_id == item_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryDirectory {
    employees: RwLock<BTreeMap<u64, Employee>>,
}

impl MemoryDirectory {
    pub fn new(employees: impl IntoIterator<Item = Employee>) -> Self {
        Self {
            employees: RwLock::new(employees.into_iter().map(|e| (e.id, e)).collect()),
        }
    }

    pub fn upsert(&self, employee: Employee) -> StoreResult<()> {
        self.employees
            .write()
            .map_err(|_| PayrollError::Storage("employee directory lock poisoned".into()))?
            .insert(employee.id, employee);
        Ok(())
    }
}

#[async_trait]
impl EmployeeDirectory for MemoryDirectory {
    async fn active_employees(&self) -> StoreResult<Vec<Employee>> {
        let employees = self
            .employees
            .read()
            .map_err(|_| PayrollError::Storage("employee directory lock poisoned".into()))?;
        Ok(employees.values().filter(|e| e.active).cloned().collect())
    }

    async fn employee(&self, employee_id: u64) -> StoreResult<Option<Employee>> {
        let employees = self
            .employees
            .read()
            .map_err(|_| PayrollError::Storage("employee directory lock poisoned".into()))?;
        Ok(employees.get(&employee_id).cloned())
    }
}

#[derive(Default)]
pub struct MemoryAttendance {
    entries: RwLock<Vec<AttendanceEntry>>,
}

impl MemoryAttendance {
    pub fn new(entries: impl IntoIterator<Item = AttendanceEntry>) -> Self {
        Self {
            entries: RwLock::new(entries.into_iter().collect()),
        }
    }

    pub fn record(&self, entry: AttendanceEntry) -> StoreResult<()> {
        self.entries
            .write()
            .map_err(|_| PayrollError::Storage("attendance lock poisoned".into()))?
            .push(entry);
        Ok(())
    }
}

#[async_trait]
impl AttendanceSource for MemoryAttendance {
    async fn attendance(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<AttendanceEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| PayrollError::Storage("attendance lock poisoned".into()))?;
        Ok(entries
            .iter()
            .filter(|e| e.employee_id == employee_id && e.date >= start && e.date <= end)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn new_batch() -> NewBatch {
        NewBatch {
            title: "March".into(),
            remarks: None,
            period_start: d(1),
            period_end: d(15),
            created_by: 1,
            created_at: Utc::now(),
        }
    }

    fn new_item(employee_id: u64) -> NewPayslipItem {
        NewPayslipItem {
            employee_id,
            hourly_rate: dec!(10),
            amounts: PayslipAmounts {
                total_hours_worked: dec!(8),
                overtime_pay: Decimal::ZERO,
                philhealth_deduction: Decimal::ZERO,
                sss_deduction: Decimal::ZERO,
                pagibig_deduction: Decimal::ZERO,
                total_deductions: Decimal::ZERO,
                calculated_base_salary: dec!(80.00),
                final_salary: dec!(80.00),
            },
        }
    }

    fn approve(actor_id: u64) -> Transition {
        Transition {
            to: PayslipStatus::ApprovedByHr,
            actor_id,
            remark: None,
            evidence_ref: None,
            at: Utc::now(),
        }
    }

    #[actix_web::test]
    async fn failed_insert_leaves_nothing_behind() {
        let store = MemoryStore::failing_after(2);
        let err = store
            .insert_batch(new_batch(), vec![new_item(1), new_item(2), new_item(3)])
            .await
            .unwrap_err();
        assert!(matches!(err, PayrollError::Storage(_)));
        assert!(store.batches().await.unwrap().is_empty());
        assert!(store.batch_items(1).await.unwrap().is_empty());
        assert!(store.item(1).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn duplicate_employee_in_one_batch_is_refused() {
        let store = MemoryStore::new();
        let err = store
            .insert_batch(new_batch(), vec![new_item(5), new_item(5)])
            .await
            .unwrap_err();
        assert!(matches!(err, PayrollError::InvalidInput(_)));
        assert!(store.batches().await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn bulk_transition_is_all_or_nothing() {
        let store = MemoryStore::new();
        let (_, items) = store
            .insert_batch(new_batch(), vec![new_item(1), new_item(2)])
            .await
            .unwrap();
        store
            .transition_items(&[items[1].id], &approve(9))
            .await
            .unwrap();

        let err = store
            .transition_items(&[items[0].id, items[1].id], &approve(9))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PayrollError::InvalidTransition { item_id, .. } if item_id == items[1].id
        ));
        let first = store.item(items[0].id).await.unwrap().unwrap();
        assert_eq!(first.status, PayslipStatus::Pending);
        assert_eq!(store.item_events(items[1].id).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn stale_version_is_a_concurrent_modification() {
        let store = MemoryStore::new();
        let (_, items) = store
            .insert_batch(new_batch(), vec![new_item(1)])
            .await
            .unwrap();
        let item = &items[0];
        store
            .update_amounts(item.id, item.version, item.amounts())
            .await
            .unwrap();

        let err = store
            .update_amounts(item.id, item.version, item.amounts())
            .await
            .unwrap_err();
        assert!(matches!(err, PayrollError::ConcurrentModification { .. }));
    }

    #[actix_web::test]
    async fn rejected_items_do_not_cover_a_period() {
        let store = MemoryStore::new();
        let (_, items) = store
            .insert_batch(new_batch(), vec![new_item(1), new_item(2)])
            .await
            .unwrap();
        let reject = Transition {
            to: PayslipStatus::RejectedByHr,
            remark: Some("wrong rate".into()),
            ..approve(9)
        };
        store.transition_items(&[items[0].id], &reject).await.unwrap();

        assert_eq!(store.covered_employees(d(10), d(20)).await.unwrap(), vec![2]);
        assert!(store.covered_employees(d(16), d(31)).await.unwrap().is_empty());
    }
}
