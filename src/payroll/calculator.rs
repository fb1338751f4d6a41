use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::PayrollError;
use crate::model::payslip::PayslipAmounts;

/// Money is carried to the centavo.
pub const MONEY_DP: u32 = 2;
pub const HOURS_DP: u32 = 2;
/// Rates keep four places so a snapshot reproduces the pay it was used for.
pub const RATE_DP: u32 = 4;

// Column limits: hours DECIMAL(10,2), rate DECIMAL(16,4), money DECIMAL(14,2).
fn max_hours() -> Decimal {
    Decimal::new(9_999_999_999, HOURS_DP)
}

fn max_rate() -> Decimal {
    Decimal::new(9_999_999_999_999_999, RATE_DP)
}

fn max_money() -> Decimal {
    Decimal::new(99_999_999_999_999, MONEY_DP)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayInputs {
    pub hours: Decimal,
    pub hourly_rate: Decimal,
    pub overtime_pay: Decimal,
    pub philhealth: Decimal,
    pub sss: Decimal,
    pub pagibig: Decimal,
}

impl PayInputs {
    /// Fresh item inputs: attendance hours at the employee's rate, nothing else.
    pub fn hours_only(hours: Decimal, hourly_rate: Decimal) -> Self {
        Self {
            hours,
            hourly_rate,
            overtime_pay: Decimal::ZERO,
            philhealth: Decimal::ZERO,
            sss: Decimal::ZERO,
            pagibig: Decimal::ZERO,
        }
    }

    fn validate(&self) -> Result<(), PayrollError> {
        check("hours", self.hours, HOURS_DP, max_hours())?;
        check("hourly_rate", self.hourly_rate, RATE_DP, max_rate())?;
        check("overtime_pay", self.overtime_pay, MONEY_DP, max_money())?;
        check("philhealth_deduction", self.philhealth, MONEY_DP, max_money())?;
        check("sss_deduction", self.sss, MONEY_DP, max_money())?;
        check("pagibig_deduction", self.pagibig, MONEY_DP, max_money())
    }
}

/// Inputs must be non-negative, fit their column and carry no more places
/// than the column stores.
fn check(name: &str, value: Decimal, dp: u32, max: Decimal) -> Result<(), PayrollError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(PayrollError::InvalidInput(format!(
            "{name} must not be negative (got {value})"
        )));
    }
    if value.normalize().scale() > dp {
        return Err(PayrollError::InvalidInput(format!(
            "{name} allows at most {dp} decimal places (got {value})"
        )));
    }
    if value > max {
        return Err(PayrollError::InvalidInput(format!(
            "{name} must not exceed {max} (got {value})"
        )));
    }
    Ok(())
}

fn overflow(what: &str) -> PayrollError {
    PayrollError::InvalidInput(format!("{what} is too large"))
}

/// Fails when a derived amount no longer fits the money columns.
fn bounded(what: &str, value: Decimal) -> Result<Decimal, PayrollError> {
    if value > max_money() {
        Err(overflow(what))
    } else {
        Ok(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayBreakdown {
    pub base_salary: Decimal,
    pub total_deductions: Decimal,
    pub final_salary: Decimal,
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Brings attendance totals to the stored hours scale.
pub fn round_hours(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(HOURS_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Brings a directory rate to the stored rate scale.
pub fn round_rate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(RATE_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// `final = max(0, round(hours * rate) + overtime - (philhealth + sss + pagibig))`.
///
/// Only the base is rounded; every other term already sits on the centavo, so
/// the sums are exact. The floor is applied last, after overtime has been added.
pub fn compute(inputs: &PayInputs) -> Result<PayBreakdown, PayrollError> {
    inputs.validate()?;

    let base = inputs
        .hours
        .checked_mul(inputs.hourly_rate)
        .ok_or_else(|| overflow("base salary"))?;
    let base_salary = bounded("base salary", round_money(base))?;
    let total_deductions = inputs
        .philhealth
        .checked_add(inputs.sss)
        .and_then(|sum| sum.checked_add(inputs.pagibig))
        .ok_or_else(|| overflow("total deductions"))?;
    let total_deductions = bounded("total deductions", total_deductions)?;
    let gross = base_salary
        .checked_add(inputs.overtime_pay)
        .ok_or_else(|| overflow("gross pay"))?;
    let final_salary = gross
        .checked_sub(total_deductions)
        .ok_or_else(|| overflow("final salary"))?
        .max(Decimal::ZERO);
    let final_salary = bounded("final salary", final_salary)?;

    Ok(PayBreakdown {
        base_salary,
        total_deductions,
        final_salary,
    })
}

/// Runs the calculator and packs inputs and derived values for a single write.
pub fn compute_amounts(inputs: &PayInputs) -> Result<PayslipAmounts, PayrollError> {
    let pay = compute(inputs)?;
    Ok(PayslipAmounts {
        total_hours_worked: inputs.hours,
        overtime_pay: inputs.overtime_pay,
        philhealth_deduction: inputs.philhealth,
        sss_deduction: inputs.sss,
        pagibig_deduction: inputs.pagibig,
        total_deductions: pay.total_deductions,
        calculated_base_salary: pay.base_salary,
        final_salary: pay.final_salary,
    })
}
