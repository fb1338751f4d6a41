//! Shared fixtures for engine tests: a small crew, half a month of attendance,
//! and actors for each tier.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use super::PayrollEngine;
use super::batch::{GenerateBatch, OverlapPolicy};
use crate::model::attendance::{AttendanceEntry, AttendanceStatus};
use crate::model::employee::Employee;
use crate::model::role::Actor;
use crate::store::memory::{MemoryAttendance, MemoryDirectory, MemoryStore};

pub const HR_USER: u64 = 7;
pub const FINANCE_USER: u64 = 8;

/// 20.00/h, eighty hours in the first half of January.
pub const CREW: u64 = 1;
/// 10.00/h, one half day of five hours.
pub const HELPER: u64 = 2;
/// Inactive.
pub const RETIRED: u64 = 3;

pub fn hr() -> Actor {
    Actor::hr(HR_USER, "hr.officer")
}

pub fn finance() -> Actor {
    Actor::release(FINANCE_USER, "finance.lead")
}

pub fn no_tier() -> Actor {
    Actor::new(99, "site.admin", None)
}

pub fn jan(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
}

pub fn january() -> GenerateBatch {
    GenerateBatch {
        period_start: jan(1),
        period_end: jan(15),
        title: "January first half".into(),
        remarks: Some("regular run".into()),
    }
}

pub fn crew() -> Vec<Employee> {
    vec![
        Employee {
            id: CREW,
            hourly_rate: dec!(20),
            active: true,
        },
        Employee {
            id: HELPER,
            hourly_rate: dec!(10),
            active: true,
        },
        Employee {
            id: RETIRED,
            hourly_rate: dec!(15),
            active: false,
        },
    ]
}

pub fn attendance() -> Vec<AttendanceEntry> {
    let mut entries: Vec<AttendanceEntry> = (1..=10)
        .map(|day| AttendanceEntry {
            employee_id: CREW,
            date: jan(day),
            status: AttendanceStatus::Present,
            hours_worked: dec!(8),
        })
        .collect();
    entries.push(AttendanceEntry {
        employee_id: CREW,
        date: jan(20),
        status: AttendanceStatus::Present,
        hours_worked: dec!(8),
    });
    entries.push(AttendanceEntry {
        employee_id: HELPER,
        date: jan(2),
        status: AttendanceStatus::Halfday,
        hours_worked: dec!(5),
    });
    entries.push(AttendanceEntry {
        employee_id: HELPER,
        date: jan(3),
        status: AttendanceStatus::Absent,
        hours_worked: dec!(8),
    });
    entries
}

pub struct Fixture {
    pub engine: PayrollEngine,
    pub store: Arc<MemoryStore>,
    pub directory: Arc<MemoryDirectory>,
    pub attendance: Arc<MemoryAttendance>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::build(
            Arc::new(MemoryStore::new()),
            crew(),
            OverlapPolicy::ExcludeCovered,
        )
    }

    pub fn with_store(store: Arc<MemoryStore>) -> Self {
        Self::build(store, crew(), OverlapPolicy::ExcludeCovered)
    }

    pub fn with_employees(employees: impl IntoIterator<Item = Employee>) -> Self {
        Self::build(
            Arc::new(MemoryStore::new()),
            employees.into_iter().collect(),
            OverlapPolicy::ExcludeCovered,
        )
    }

    pub fn with_policy(policy: OverlapPolicy) -> Self {
        Self::build(Arc::new(MemoryStore::new()), crew(), policy)
    }

    fn build(store: Arc<MemoryStore>, employees: Vec<Employee>, policy: OverlapPolicy) -> Self {
        let directory = Arc::new(MemoryDirectory::new(employees));
        let attendance = Arc::new(MemoryAttendance::new(attendance()));
        let engine = PayrollEngine::new(
            store.clone(),
            directory.clone(),
            attendance.clone(),
            policy,
        );
        Self {
            engine,
            store,
            directory,
            attendance,
        }
    }
}
