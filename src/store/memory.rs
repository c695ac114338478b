use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{PayrollStore, attendance_conflict, payroll_conflict};
use crate::error::PayrollError;
use crate::model::attendance::AttendanceEntry;
use crate::model::employee::Employee;
use crate::model::payroll::{AuditEntry, PayrollRecord};
use crate::model::period::Period;

#[derive(Default)]
struct Tables {
    employees: HashMap<String, Employee>,
    attendance: BTreeMap<(String, NaiveDate), AttendanceEntry>,
    // keyed by (period, employee) so iteration is already in list order
    payroll: BTreeMap<(Period, String), PayrollRecord>,
    audit: Vec<AuditEntry>,
}

/// Process-local store. Each write checks its uniqueness key under the write
/// lock, and no lock is held across an await.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, PayrollError> {
        self.tables
            .read()
            .map_err(|_| PayrollError::Upstream("memory store poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, PayrollError> {
        self.tables
            .write()
            .map_err(|_| PayrollError::Upstream("memory store poisoned".to_string()))
    }

    /// Inserts or replaces an employee, standing in for the HR CRUD layer.
    pub fn upsert_employee(&self, employee: Employee) -> Result<(), PayrollError> {
        self.write()?
            .employees
            .insert(employee.employee_id.clone(), employee);
        Ok(())
    }

    #[cfg(test)]
    pub fn audit_trail(&self) -> Result<Vec<AuditEntry>, PayrollError> {
        Ok(self.read()?.audit.clone())
    }
}

#[async_trait]
impl PayrollStore for MemoryStore {
    async fn find_employee(&self, employee_id: &str) -> Result<Option<Employee>, PayrollError> {
        Ok(self.read()?.employees.get(employee_id).cloned())
    }

    async fn active_employees(&self) -> Result<Vec<Employee>, PayrollError> {
        let tables = self.read()?;
        let mut employees: Vec<Employee> = tables
            .employees
            .values()
            .filter(|e| e.is_active())
            .cloned()
            .collect();
        employees.sort_by(|a, b| a.employee_id.cmp(&b.employee_id));
        Ok(employees)
    }

    async fn attendance_for_period(
        &self,
        employee_id: &str,
        period: Period,
    ) -> Result<Vec<AttendanceEntry>, PayrollError> {
        Ok(self
            .read()?
            .attendance
            .values()
            .filter(|e| e.employee_id == employee_id && period.contains(e.date))
            .cloned()
            .collect())
    }

    async fn insert_attendance(&self, entry: &AttendanceEntry) -> Result<(), PayrollError> {
        let mut tables = self.write()?;
        let key = (entry.employee_id.clone(), entry.date);
        if tables.attendance.contains_key(&key) {
            return Err(attendance_conflict(entry));
        }
        tables.attendance.insert(key, entry.clone());
        Ok(())
    }

    async fn find_payroll(
        &self,
        employee_id: &str,
        period: Period,
    ) -> Result<Option<PayrollRecord>, PayrollError> {
        Ok(self
            .read()?
            .payroll
            .get(&(period, employee_id.to_string()))
            .cloned())
    }

    async fn insert_payroll(&self, record: &PayrollRecord) -> Result<(), PayrollError> {
        let mut tables = self.write()?;
        let key = (record.period, record.employee_id.clone());
        if tables.payroll.contains_key(&key) {
            return Err(payroll_conflict(record));
        }
        tables.payroll.insert(key, record.clone());
        Ok(())
    }

    async fn list_payroll(
        &self,
        employee_id: Option<&str>,
    ) -> Result<Vec<PayrollRecord>, PayrollError> {
        Ok(self
            .read()?
            .payroll
            .values()
            .filter(|r| employee_id.is_none_or(|id| r.employee_id == id))
            .cloned()
            .collect())
    }

    async fn record_audit(&self, entry: &AuditEntry) -> Result<(), PayrollError> {
        self.write()?.audit.push(entry.clone());
        Ok(())
    }
}
