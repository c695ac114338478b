use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySqlPool};
use uuid::Uuid;

use super::{PayrollStore, attendance_conflict, payroll_conflict};
use crate::error::PayrollError;
use crate::model::attendance::AttendanceEntry;
use crate::model::employee::Employee;
use crate::model::payroll::{AuditEntry, PayrollRecord};
use crate::model::period::Period;

/// MySQL-backed store. Table layout lives in `schema.sql`.
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct PayrollRow {
    id: String,
    employee_id: String,
    employee_name: String,
    month: u32,
    year: i32,
    base_salary: Decimal,
    overtime_hours: Decimal,
    overtime_pay: Decimal,
    bonuses: Decimal,
    deductions: Decimal,
    gross: Decimal,
    tax: Decimal,
    net_salary: Decimal,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<PayrollRow> for PayrollRecord {
    type Error = PayrollError;

    fn try_from(row: PayrollRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| PayrollError::Upstream(format!("corrupt payroll id {}: {e}", row.id)))?;
        let period = Period::new(row.month, row.year)
            .map_err(|e| PayrollError::Upstream(format!("corrupt payroll period: {e}")))?;

        Ok(PayrollRecord {
            id,
            employee_id: row.employee_id,
            employee_name: row.employee_name,
            period,
            base_salary: row.base_salary,
            overtime_hours: row.overtime_hours,
            overtime_pay: row.overtime_pay,
            bonuses: row.bonuses,
            deductions: row.deductions,
            gross: row.gross,
            tax: row.tax,
            net_salary: row.net_salary,
            status: row.status,
            created_at: row.created_at,
        })
    }
}

const PAYROLL_COLUMNS: &str = "id, employee_id, employee_name, month, year, base_salary, \
     overtime_hours, overtime_pay, bonuses, deductions, gross, tax, net_salary, status, created_at";

fn upstream(operation: &'static str) -> impl FnOnce(sqlx::Error) -> PayrollError {
    move |e| {
        tracing::error!(error = %e, operation, "MySQL store failure");
        PayrollError::Upstream(format!("{operation} failed"))
    }
}

fn is_duplicate_key(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000"))
}

#[async_trait]
impl PayrollStore for MySqlStore {
    async fn find_employee(&self, employee_id: &str) -> Result<Option<Employee>, PayrollError> {
        sqlx::query_as::<_, Employee>(
            r#"
            SELECT employee_id, name, email, department, designation,
                   base_salary, joining_date, status
            FROM employees
            WHERE employee_id = ?
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(upstream("find_employee"))
    }

    async fn active_employees(&self) -> Result<Vec<Employee>, PayrollError> {
        sqlx::query_as::<_, Employee>(
            r#"
            SELECT employee_id, name, email, department, designation,
                   base_salary, joining_date, status
            FROM employees
            WHERE status = 'active'
            ORDER BY employee_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(upstream("active_employees"))
    }

    async fn attendance_for_period(
        &self,
        employee_id: &str,
        period: Period,
    ) -> Result<Vec<AttendanceEntry>, PayrollError> {
        sqlx::query_as::<_, AttendanceEntry>(
            r#"
            SELECT employee_id, date, hours_worked, overtime_hours, leaves
            FROM attendance_logs
            WHERE employee_id = ?
            AND date >= ?
            AND date < ?
            ORDER BY date
            "#,
        )
        .bind(employee_id)
        .bind(period.first_day())
        .bind(period.next().first_day())
        .fetch_all(&self.pool)
        .await
        .map_err(upstream("attendance_for_period"))
    }

    async fn insert_attendance(&self, entry: &AttendanceEntry) -> Result<(), PayrollError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance_logs
            (employee_id, date, hours_worked, overtime_hours, leaves)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.employee_id)
        .bind(entry.date)
        .bind(entry.hours_worked)
        .bind(entry.overtime_hours)
        .bind(entry.leaves)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(attendance_conflict(entry)),
            Err(e) => Err(upstream("insert_attendance")(e)),
        }
    }

    async fn find_payroll(
        &self,
        employee_id: &str,
        period: Period,
    ) -> Result<Option<PayrollRecord>, PayrollError> {
        let sql = format!(
            "SELECT {PAYROLL_COLUMNS} FROM payroll_records WHERE employee_id = ? AND month = ? AND year = ?"
        );
        let row = sqlx::query_as::<_, PayrollRow>(&sql)
            .bind(employee_id)
            .bind(period.month)
            .bind(period.year)
            .fetch_optional(&self.pool)
            .await
            .map_err(upstream("find_payroll"))?;

        row.map(PayrollRecord::try_from).transpose()
    }

    async fn insert_payroll(&self, record: &PayrollRecord) -> Result<(), PayrollError> {
        // UNIQUE (employee_id, month, year) makes this the serialization point
        let result = sqlx::query(
            r#"
            INSERT INTO payroll_records
            (id, employee_id, employee_name, month, year, base_salary, overtime_hours,
             overtime_pay, bonuses, deductions, gross, tax, net_salary, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.employee_id)
        .bind(&record.employee_name)
        .bind(record.period.month)
        .bind(record.period.year)
        .bind(record.base_salary)
        .bind(record.overtime_hours)
        .bind(record.overtime_pay)
        .bind(record.bonuses)
        .bind(record.deductions)
        .bind(record.gross)
        .bind(record.tax)
        .bind(record.net_salary)
        .bind(&record.status)
        .bind(record.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(payroll_conflict(record)),
            Err(e) => Err(upstream("insert_payroll")(e)),
        }
    }

    async fn list_payroll(
        &self,
        employee_id: Option<&str>,
    ) -> Result<Vec<PayrollRecord>, PayrollError> {
        let sql = format!(
            "SELECT {PAYROLL_COLUMNS} FROM payroll_records \
             WHERE (? IS NULL OR employee_id = ?) \
             ORDER BY year, month, employee_id"
        );
        let rows = sqlx::query_as::<_, PayrollRow>(&sql)
            .bind(employee_id)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await
            .map_err(upstream("list_payroll"))?;

        rows.into_iter().map(PayrollRecord::try_from).collect()
    }

    async fn record_audit(&self, entry: &AuditEntry) -> Result<(), PayrollError> {
        sqlx::query(
            r#"
            INSERT INTO audit_trail (id, action, employee_id, performed_by, details, timestamp)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(&entry.action)
        .bind(&entry.employee_id)
        .bind(&entry.performed_by)
        .bind(entry.details.to_string())
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(upstream("record_audit"))
    }
}
