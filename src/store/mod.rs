//! Persistence boundary of the payroll pipeline.
//!
//! Employees are owned by the HR CRUD layer and only read here. Attendance
//! entries and payroll records are append-only; both backends enforce the
//! (employee, date) and (employee, month, year) uniqueness themselves so that
//! concurrent writers from several processes cannot create duplicates.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;

use crate::error::PayrollError;
use crate::model::attendance::AttendanceEntry;
use crate::model::employee::Employee;
use crate::model::payroll::{AuditEntry, PayrollRecord};
use crate::model::period::Period;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[async_trait]
pub trait PayrollStore: Send + Sync {
    async fn find_employee(&self, employee_id: &str) -> Result<Option<Employee>, PayrollError>;

    async fn active_employees(&self) -> Result<Vec<Employee>, PayrollError>;

    async fn attendance_for_period(
        &self,
        employee_id: &str,
        period: Period,
    ) -> Result<Vec<AttendanceEntry>, PayrollError>;

    /// Fails with `Conflict` when an entry already exists for the same date.
    async fn insert_attendance(&self, entry: &AttendanceEntry) -> Result<(), PayrollError>;

    async fn find_payroll(
        &self,
        employee_id: &str,
        period: Period,
    ) -> Result<Option<PayrollRecord>, PayrollError>;

    /// Fails with `Conflict` when a record already exists for the period;
    /// the stored record is never replaced.
    async fn insert_payroll(&self, record: &PayrollRecord) -> Result<(), PayrollError>;

    /// Records ordered by (year, month, employee).
    async fn list_payroll(
        &self,
        employee_id: Option<&str>,
    ) -> Result<Vec<PayrollRecord>, PayrollError>;

    async fn record_audit(&self, entry: &AuditEntry) -> Result<(), PayrollError>;
}

pub(crate) fn payroll_conflict(record: &PayrollRecord) -> PayrollError {
    PayrollError::Conflict(format!(
        "payroll for {} already exists for employee {}",
        record.period, record.employee_id
    ))
}

pub(crate) fn attendance_conflict(entry: &AttendanceEntry) -> PayrollError {
    PayrollError::Conflict(format!(
        "attendance for {} already recorded for employee {}",
        entry.date, entry.employee_id
    ))
}
