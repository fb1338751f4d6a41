use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySql, MySqlPool, Transaction};

use super::{AttendanceSource, EmployeeDirectory, PayrollStore, StoreResult};
use crate::error::PayrollError;
use crate::model::attendance::{AttendanceEntry, AttendanceStatus};
use crate::model::employee::Employee;
use crate::model::payslip::{
    ItemEvent, NewBatch, NewPayslipItem, PayslipAmounts, PayslipBatch, PayslipItem,
    PayslipStatus, Transition,
};

const ITEM_COLUMNS: &str = r#"
    id, batch_id, employee_id, hourly_rate, total_hours_worked, overtime_pay,
    philhealth_deduction, sss_deduction, pagibig_deduction, total_deductions,
    calculated_base_salary, final_salary, status, remarks, decided_by, decided_at,
    released_by, released_at, evidence_ref, version
"#;

fn parse_status(raw: &str) -> StoreResult<PayslipStatus> {
    PayslipStatus::from_str(raw)
        .map_err(|_| PayrollError::Storage(format!("unknown payslip status '{raw}'")))
}

#[derive(FromRow)]
struct BatchRow {
    id: u64,
    title: String,
    remarks: Option<String>,
    period_start: NaiveDate,
    period_end: NaiveDate,
    created_by: u64,
    created_at: DateTime<Utc>,
}

impl From<BatchRow> for PayslipBatch {
    fn from(row: BatchRow) -> Self {
        PayslipBatch {
            id: row.id,
            title: row.title,
            remarks: row.remarks,
            period_start: row.period_start,
            period_end: row.period_end,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct ItemRow {
    id: u64,
    batch_id: u64,
    employee_id: u64,
    hourly_rate: Decimal,
    total_hours_worked: Decimal,
    overtime_pay: Decimal,
    philhealth_deduction: Decimal,
    sss_deduction: Decimal,
    pagibig_deduction: Decimal,
    total_deductions: Decimal,
    calculated_base_salary: Decimal,
    final_salary: Decimal,
    status: String,
    remarks: Option<String>,
    decided_by: Option<u64>,
    decided_at: Option<DateTime<Utc>>,
    released_by: Option<u64>,
    released_at: Option<DateTime<Utc>>,
    evidence_ref: Option<String>,
    version: u32,
}

impl TryFrom<ItemRow> for PayslipItem {
    type Error = PayrollError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(PayslipItem {
            id: row.id,
            batch_id: row.batch_id,
            employee_id: row.employee_id,
            hourly_rate: row.hourly_rate,
            total_hours_worked: row.total_hours_worked,
            overtime_pay: row.overtime_pay,
            philhealth_deduction: row.philhealth_deduction,
            sss_deduction: row.sss_deduction,
            pagibig_deduction: row.pagibig_deduction,
            total_deductions: row.total_deductions,
            calculated_base_salary: row.calculated_base_salary,
            final_salary: row.final_salary,
            status: parse_status(&row.status)?,
            remarks: row.remarks,
            decided_by: row.decided_by,
            decided_at: row.decided_at,
            released_by: row.released_by,
            released_at: row.released_at,
            evidence_ref: row.evidence_ref,
            version: row.version,
        })
    }
}

#[derive(FromRow)]
struct EventRow {
    id: u64,
    item_id: u64,
    from_status: String,
    to_status: String,
    actor_id: u64,
    remark: Option<String>,
    at: DateTime<Utc>,
}

impl TryFrom<EventRow> for ItemEvent {
    type Error = PayrollError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(ItemEvent {
            id: row.id,
            item_id: row.item_id,
            from_status: parse_status(&row.from_status)?,
            to_status: parse_status(&row.to_status)?,
            actor_id: row.actor_id,
            remark: row.remark,
            at: row.at,
        })
    }
}

fn into_items(rows: Vec<ItemRow>) -> StoreResult<Vec<PayslipItem>> {
    rows.into_iter().map(PayslipItem::try_from).collect()
}

/// Payroll tables on MySQL. Multi-row writes run inside one transaction and
/// status changes lock their rows with `SELECT ... FOR UPDATE`.
#[derive(Clone)]
pub struct MySqlPayrollStore {
    pool: MySqlPool,
}

impl MySqlPayrollStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn lock_item(
        tx: &mut Transaction<'_, MySql>,
        item_id: u64,
    ) -> StoreResult<PayslipItem> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM payslip_items WHERE id = ? FOR UPDATE");
        let row = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(item_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| PayrollError::not_found("payslip item", item_id))?;
        row.try_into()
    }

    /// Writes an already validated transition for one locked row, plus its audit event.
    async fn write_transition(
        tx: &mut Transaction<'_, MySql>,
        mut item: PayslipItem,
        transition: &Transition,
    ) -> StoreResult<PayslipItem> {
        let from = item.status;
        let expected_version = item.version;
        item.apply(transition);

        let result = sqlx::query(
            r#"
            UPDATE payslip_items
            SET status = ?, remarks = ?, decided_by = ?, decided_at = ?,
                released_by = ?, released_at = ?, evidence_ref = ?, version = ?
            WHERE id = ? AND status = ? AND version = ?
            "#,
        )
        .bind(item.status.as_ref())
        .bind(&item.remarks)
        .bind(item.decided_by)
        .bind(item.decided_at)
        .bind(item.released_by)
        .bind(item.released_at)
        .bind(&item.evidence_ref)
        .bind(item.version)
        .bind(item.id)
        .bind(from.as_ref())
        .bind(expected_version)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PayrollError::ConcurrentModification { item_id: item.id });
        }

        let event = transition.event_for(item.id, from);
        sqlx::query(
            r#"
            INSERT INTO payslip_item_events
            (item_id, from_status, to_status, actor_id, remark, at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.item_id)
        .bind(event.from_status.as_ref())
        .bind(event.to_status.as_ref())
        .bind(event.actor_id)
        .bind(&event.remark)
        .bind(event.at)
        .execute(&mut **tx)
        .await?;

        Ok(item)
    }
}

#[async_trait]
impl PayrollStore for MySqlPayrollStore {
    async fn insert_batch(
        &self,
        batch: NewBatch,
        items: Vec<NewPayslipItem>,
    ) -> StoreResult<(PayslipBatch, Vec<PayslipItem>)> {
        // Dropping `tx` on any early return rolls the whole batch back.
        let mut tx = self.pool.begin().await?;

        let batch_id = sqlx::query(
            r#"
            INSERT INTO payslip_batches
            (title, remarks, period_start, period_end, created_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&batch.title)
        .bind(&batch.remarks)
        .bind(batch.period_start)
        .bind(batch.period_end)
        .bind(batch.created_by)
        .bind(batch.created_at)
        .execute(&mut *tx)
        .await?
        .last_insert_id();

        for item in &items {
            let a = item.amounts;
            sqlx::query(
                r#"
                INSERT INTO payslip_items
                (batch_id, employee_id, hourly_rate, total_hours_worked, overtime_pay,
                 philhealth_deduction, sss_deduction, pagibig_deduction, total_deductions,
                 calculated_base_salary, final_salary, status, version)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)
                "#,
            )
            .bind(batch_id)
            .bind(item.employee_id)
            .bind(item.hourly_rate)
            .bind(a.total_hours_worked)
            .bind(a.overtime_pay)
            .bind(a.philhealth_deduction)
            .bind(a.sss_deduction)
            .bind(a.pagibig_deduction)
            .bind(a.total_deductions)
            .bind(a.calculated_base_salary)
            .bind(a.final_salary)
            .bind(PayslipStatus::Pending.as_ref())
            .execute(&mut *tx)
            .await?;
        }

        let batch_row = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT id, title, remarks, period_start, period_end, created_by, created_at
            FROM payslip_batches
            WHERE id = ?
            "#,
        )
        .bind(batch_id)
        .fetch_one(&mut *tx)
        .await?;

        let sql = format!("SELECT {ITEM_COLUMNS} FROM payslip_items WHERE batch_id = ? ORDER BY id");
        let item_rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(batch_id)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok((batch_row.into(), into_items(item_rows)?))
    }

    async fn batch(&self, batch_id: u64) -> StoreResult<Option<PayslipBatch>> {
        let row = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT id, title, remarks, period_start, period_end, created_by, created_at
            FROM payslip_batches
            WHERE id = ?
            "#,
        )
        .bind(batch_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(PayslipBatch::from))
    }

    async fn batches(&self) -> StoreResult<Vec<PayslipBatch>> {
        let rows = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT id, title, remarks, period_start, period_end, created_by, created_at
            FROM payslip_batches
            ORDER BY id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(PayslipBatch::from).collect())
    }

    async fn batch_items(&self, batch_id: u64) -> StoreResult<Vec<PayslipItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM payslip_items WHERE batch_id = ? ORDER BY id");
        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(batch_id)
            .fetch_all(&self.pool)
            .await?;
        into_items(rows)
    }

    async fn item(&self, item_id: u64) -> StoreResult<Option<PayslipItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM payslip_items WHERE id = ?");
        let row = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(PayslipItem::try_from).transpose()
    }

    async fn covered_employees(&self, start: NaiveDate, end: NaiveDate) -> StoreResult<Vec<u64>> {
        let ids = sqlx::query_scalar::<_, u64>(
            r#"
            SELECT DISTINCT i.employee_id
            FROM payslip_items i
            JOIN payslip_batches b ON b.id = i.batch_id
            WHERE b.period_start <= ? AND ? <= b.period_end
            AND i.status NOT IN (?, ?)
            ORDER BY i.employee_id
            "#,
        )
        .bind(end)
        .bind(start)
        .bind(PayslipStatus::RejectedByHr.as_ref())
        .bind(PayslipStatus::RejectedAtRelease.as_ref())
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn update_amounts(
        &self,
        item_id: u64,
        expected_version: u32,
        amounts: PayslipAmounts,
    ) -> StoreResult<PayslipItem> {
        let mut tx = self.pool.begin().await?;
        let mut item = Self::lock_item(&mut tx, item_id).await?;

        item.check_editable()?;
        if item.version != expected_version {
            return Err(PayrollError::ConcurrentModification { item_id });
        }

        item.set_amounts(amounts);
        item.version += 1;

        sqlx::query(
            r#"
            UPDATE payslip_items
            SET total_hours_worked = ?, overtime_pay = ?, philhealth_deduction = ?,
                sss_deduction = ?, pagibig_deduction = ?, total_deductions = ?,
                calculated_base_salary = ?, final_salary = ?, version = ?
            WHERE id = ?
            "#,
        )
        .bind(amounts.total_hours_worked)
        .bind(amounts.overtime_pay)
        .bind(amounts.philhealth_deduction)
        .bind(amounts.sss_deduction)
        .bind(amounts.pagibig_deduction)
        .bind(amounts.total_deductions)
        .bind(amounts.calculated_base_salary)
        .bind(amounts.final_salary)
        .bind(item.version)
        .bind(item_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(item)
    }

    async fn transition_items(
        &self,
        item_ids: &[u64],
        transition: &Transition,
    ) -> StoreResult<Vec<PayslipItem>> {
        let mut ids = item_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut tx = self.pool.begin().await?;

        // rows are locked in id order so crossing requests queue instead of deadlocking
        let mut locked = Vec::with_capacity(ids.len());
        for &item_id in &ids {
            let item = Self::lock_item(&mut tx, item_id).await?;
            item.check_transition(transition.to)?;
            locked.push(item);
        }

        let mut updated = Vec::with_capacity(locked.len());
        for item in locked {
            updated.push(Self::write_transition(&mut tx, item, transition).await?);
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn transition_pending_in_batch(
        &self,
        batch_id: u64,
        transition: &Transition,
    ) -> StoreResult<Vec<PayslipItem>> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, u64>(
            "SELECT id FROM payslip_batches WHERE id = ? FOR UPDATE",
        )
        .bind(batch_id)
        .fetch_optional(&mut *tx)
        .await?;
        if exists.is_none() {
            return Err(PayrollError::not_found("payslip batch", batch_id));
        }

        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM payslip_items WHERE batch_id = ? AND status = ? ORDER BY id FOR UPDATE"
        );
        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(batch_id)
            .bind(PayslipStatus::Pending.as_ref())
            .fetch_all(&mut *tx)
            .await?;

        let mut updated = Vec::with_capacity(rows.len());
        for item in into_items(rows)? {
            item.check_transition(transition.to)?;
            updated.push(Self::write_transition(&mut tx, item, transition).await?);
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn item_events(&self, item_id: u64) -> StoreResult<Vec<ItemEvent>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, item_id, from_status, to_status, actor_id, remark, at
            FROM payslip_item_events
            WHERE item_id = ?
            ORDER BY id
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ItemEvent::try_from).collect()
    }
}

/// Reads the HR directory's `employees` table.
#[derive(Clone)]
pub struct MySqlDirectory {
    pool: MySqlPool,
}

impl MySqlDirectory {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

type EmployeeRow = (u64, Decimal, String);

fn employee_from_row((id, hourly_rate, status): EmployeeRow) -> Employee {
    Employee {
        id,
        hourly_rate,
        active: status.eq_ignore_ascii_case("active"),
    }
}

#[async_trait]
impl EmployeeDirectory for MySqlDirectory {
    async fn active_employees(&self) -> StoreResult<Vec<Employee>> {
        let rows = sqlx::query_as::<_, EmployeeRow>(
            r#"
            SELECT id, hourly_rate, status
            FROM employees
            WHERE status = 'active'
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(employee_from_row).collect())
    }

    async fn employee(&self, employee_id: u64) -> StoreResult<Option<Employee>> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            "SELECT id, hourly_rate, status FROM employees WHERE id = ?",
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(employee_from_row))
    }
}

/// Reads recorded daily attendance.
#[derive(Clone)]
pub struct MySqlAttendance {
    pool: MySqlPool,
}

impl MySqlAttendance {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceSource for MySqlAttendance {
    async fn attendance(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<AttendanceEntry>> {
        let rows = sqlx::query_as::<_, (u64, NaiveDate, String, Decimal)>(
            r#"
            SELECT employee_id, date, status, hours_worked
            FROM attendance
            WHERE employee_id = ?
            AND date BETWEEN ? AND ?
            ORDER BY date
            "#,
        )
        .bind(employee_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(employee_id, date, status, hours_worked)| {
                let status = AttendanceStatus::from_str(&status).map_err(|_| {
                    PayrollError::Storage(format!("unknown attendance status '{status}'"))
                })?;
                Ok(AttendanceEntry {
                    employee_id,
                    date,
                    status,
                    hours_worked,
                })
            })
            .collect()
    }
}
