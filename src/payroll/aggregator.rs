use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::calculator::round_hours;
use crate::error::PayrollError;
use crate::model::attendance::{AttendanceEntry, AttendanceStatus};
use crate::store::{AttendanceSource, EmployeeDirectory};

/// Sums worked hours for one employee over `[start, end]`.
///
/// `Absent` days count as zero whatever was stored. `Halfday` counts the stored
/// hours as-is; halving, if wanted, happens where attendance is recorded.
/// The total is rounded to the stored hours scale.
pub fn sum_hours(
    entries: &[AttendanceEntry],
    employee_id: u64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Decimal, PayrollError> {
    let mut total = Decimal::ZERO;
    for entry in entries
        .iter()
        .filter(|e| e.employee_id == employee_id && e.date >= start && e.date <= end)
    {
        if entry.hours_worked.is_sign_negative() && !entry.hours_worked.is_zero() {
            return Err(PayrollError::InvalidInput(format!(
                "attendance for employee {} on {} has negative hours",
                entry.employee_id, entry.date
            )));
        }
        if entry.status != AttendanceStatus::Absent {
            total = total.checked_add(entry.hours_worked).ok_or_else(|| {
                PayrollError::InvalidInput(format!(
                    "attendance hours for employee {employee_id} are too large"
                ))
            })?;
        }
    }
    Ok(round_hours(total))
}

pub async fn total_hours(
    directory: &dyn EmployeeDirectory,
    attendance: &dyn AttendanceSource,
    employee_id: u64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Decimal, PayrollError> {
    if directory.employee(employee_id).await?.is_none() {
        return Err(PayrollError::not_found("employee", employee_id));
    }
    let entries = attendance.attendance(employee_id, start, end).await?;
    sum_hours(&entries, employee_id, start, end)
}
