use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::NaiveDate;
use serde_json::json;
use sqlx::mysql::MySqlDatabaseError;
use thiserror::Error;

use crate::model::payslip::PayslipStatus;
use crate::model::role::ApprovalTier;

#[derive(Debug, Error)]
pub enum PayrollError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid period: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    #[error("payslip item {item_id} cannot move from {current} to {requested}")]
    InvalidTransition {
        item_id: u64,
        current: PayslipStatus,
        requested: PayslipStatus,
    },

    #[error("payslip item {item_id} is {status} and can no longer be edited")]
    ImmutableState { item_id: u64, status: PayslipStatus },

    #[error("no active employees to pay for {start}..{end}")]
    NoEligibleEmployees { start: NaiveDate, end: NaiveDate },

    #[error("every active employee already has a live payslip overlapping {start}..{end}")]
    PeriodAlreadyCovered { start: NaiveDate, end: NaiveDate },

    #[error("payslip item {item_id} was modified concurrently")]
    ConcurrentModification { item_id: u64 },

    /// The database gave up waiting on a row lock held by another request.
    #[error("payslip rows were locked by a concurrent update, retry the request")]
    LockConflict,

    #[error("{action} requires the {required} tier")]
    Forbidden {
        action: &'static str,
        required: ApprovalTier,
    },

    #[error("{action} requires an approval tier")]
    NoApprovalTier { action: &'static str },

    #[error("storage failure: {0}")]
    Storage(String),
}

impl PayrollError {
    pub fn kind(&self) -> &'static str {
        match self {
            PayrollError::InvalidInput(_) => "invalid_input",
            PayrollError::InvalidRange { .. } => "invalid_range",
            PayrollError::NotFound { .. } => "not_found",
            PayrollError::InvalidTransition { .. } => "invalid_transition",
            PayrollError::ImmutableState { .. } => "immutable_state",
            PayrollError::NoEligibleEmployees { .. } => "no_eligible_employees",
            PayrollError::PeriodAlreadyCovered { .. } => "period_already_covered",
            PayrollError::ConcurrentModification { .. } | PayrollError::LockConflict => {
                "concurrent_modification"
            }
            PayrollError::Forbidden { .. } | PayrollError::NoApprovalTier { .. } => "forbidden",
            PayrollError::Storage(_) => "storage",
        }
    }

    pub fn not_found(entity: &'static str, id: u64) -> Self {
        PayrollError::NotFound { entity, id }
    }
}

/// ER_LOCK_WAIT_TIMEOUT and ER_LOCK_DEADLOCK.
fn is_lock_conflict_code(number: u16) -> bool {
    matches!(number, 1205 | 1213)
}

fn is_lock_conflict(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db
            .try_downcast_ref::<MySqlDatabaseError>()
            .is_some_and(|mysql| is_lock_conflict_code(mysql.number())),
        _ => false,
    }
}

impl From<sqlx::Error> for PayrollError {
    fn from(e: sqlx::Error) -> Self {
        if is_lock_conflict(&e) {
            tracing::warn!(error = %e, "Payroll rows contended");
            return PayrollError::LockConflict;
        }
        tracing::error!(error = %e, "Payroll store query failed");
        PayrollError::Storage(e.to_string())
    }
}

impl ResponseError for PayrollError {
    fn status_code(&self) -> StatusCode {
        match self {
            PayrollError::InvalidInput(_) | PayrollError::InvalidRange { .. } => {
                StatusCode::BAD_REQUEST
            }
            PayrollError::Forbidden { .. } | PayrollError::NoApprovalTier { .. } => {
                StatusCode::FORBIDDEN
            }
            PayrollError::NotFound { .. } => StatusCode::NOT_FOUND,
            PayrollError::InvalidTransition { .. }
            | PayrollError::ImmutableState { .. }
            | PayrollError::ConcurrentModification { .. }
            | PayrollError::LockConflict
            | PayrollError::PeriodAlreadyCovered { .. } => StatusCode::CONFLICT,
            PayrollError::NoEligibleEmployees { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PayrollError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // storage details stay in the log
        let message = match self {
            PayrollError::Storage(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "message": message,
        }))
    }
}
