use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The slice of the employee directory the payroll engine reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: u64,
    pub hourly_rate: Decimal,
    pub active: bool,
}
