use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info, warn};

use crate::config::PayrollPolicy;
use crate::error::PayrollError;
use crate::model::payroll::{Adjustments, AuditEntry, PayrollRecord, SalaryBreakdown};
use crate::model::period::Period;
use crate::services::attendance_aggregator;
use crate::store::PayrollStore;
use crate::utils::money::{MAX_AMOUNT, round_money};

/// 31 days of round-the-clock overtime.
const MAX_MONTHLY_OVERTIME_HOURS: Decimal = dec!(744);

/// Rounds to cents, rejecting overflow and anything a record cannot store.
fn storable(field: &'static str, amount: Option<Decimal>) -> Result<Decimal, PayrollError> {
    match amount.map(round_money) {
        Some(value) if value.abs() <= MAX_AMOUNT => Ok(value),
        _ => Err(PayrollError::validation(
            field,
            format!("amount exceeds the largest storable value of {MAX_AMOUNT}"),
        )),
    }
}

/// Turns an employee's compensation and attendance into a payroll record.
pub struct PayrollCalculator {
    store: Arc<dyn PayrollStore>,
    policy: PayrollPolicy,
}

impl PayrollCalculator {
    pub fn new(store: Arc<dyn PayrollStore>, policy: PayrollPolicy) -> Self {
        Self { store, policy }
    }

    /// Salary formula. Every intermediate amount is rounded to cents and net
    /// is derived from the rounded gross and tax, so
    /// `net = base + overtime_pay + bonuses - deductions - tax` holds exactly.
    /// Amounts that would not fit a stored record are rejected, never wrapped.
    pub fn compute(
        &self,
        base_salary: Decimal,
        overtime_hours: Decimal,
        adjustments: Adjustments,
    ) -> Result<SalaryBreakdown, PayrollError> {
        if base_salary <= Decimal::ZERO {
            return Err(PayrollError::validation("base_salary", "must be positive"));
        }
        if overtime_hours < Decimal::ZERO {
            return Err(PayrollError::validation("overtime_hours", "must not be negative"));
        }
        if overtime_hours > MAX_MONTHLY_OVERTIME_HOURS {
            return Err(PayrollError::validation(
                "overtime_hours",
                format!("{overtime_hours} exceeds {MAX_MONTHLY_OVERTIME_HOURS} hours in a month"),
            ));
        }
        if adjustments.bonuses < Decimal::ZERO {
            return Err(PayrollError::validation("bonuses", "must not be negative"));
        }
        if adjustments.deductions < Decimal::ZERO {
            return Err(PayrollError::validation("deductions", "must not be negative"));
        }

        let base_salary = storable("base_salary", Some(base_salary))?;
        let bonuses = storable("bonuses", Some(adjustments.bonuses))?;
        let deductions = storable("deductions", Some(adjustments.deductions))?;

        let overtime_pay = storable(
            "overtime_hours",
            base_salary
                .checked_div(self.policy.standard_monthly_hours)
                .and_then(|rate| rate.checked_mul(self.policy.overtime_multiplier))
                .and_then(|rate| rate.checked_mul(overtime_hours)),
        )?;

        let gross = storable(
            "gross",
            base_salary
                .checked_add(overtime_pay)
                .and_then(|v| v.checked_add(bonuses))
                .and_then(|v| v.checked_sub(deductions)),
        )?;
        if gross < Decimal::ZERO {
            return Err(PayrollError::validation(
                "deductions",
                format!("{deductions} exceeds gross earnings of {}", gross + deductions),
            ));
        }

        let tax = storable("gross", gross.checked_mul(self.policy.tax_rate))?;
        let net_salary = gross - tax;

        Ok(SalaryBreakdown {
            base_salary,
            overtime_hours,
            overtime_pay,
            bonuses,
            deductions,
            gross,
            tax,
            net_salary,
        })
    }

    /// Processes one employee for one period and persists the result.
    ///
    /// A second request for the same (employee, period) fails with
    /// `Conflict` and leaves the stored record untouched.
    pub async fn process(
        &self,
        employee_id: &str,
        period: Period,
        adjustments: Adjustments,
        performed_by: &str,
    ) -> Result<PayrollRecord, PayrollError> {
        let employee = self
            .store
            .find_employee(employee_id)
            .await?
            .ok_or_else(|| PayrollError::not_found("employee", employee_id))?;

        if !employee.is_active() {
            return Err(PayrollError::validation(
                "employee_id",
                format!("{employee_id} is not active ({})", employee.status),
            ));
        }

        // cheap early answer; the store's uniqueness check is authoritative
        if self.store.find_payroll(employee_id, period).await?.is_some() {
            return Err(PayrollError::Conflict(format!(
                "payroll for {period} already exists for employee {employee_id}"
            )));
        }

        let entries = self.store.attendance_for_period(employee_id, period).await?;
        if entries.is_empty() {
            debug!(employee_id, %period, "No attendance found, using base salary only");
        }
        let attendance = attendance_aggregator::aggregate(employee_id, period, &entries)?;

        let breakdown = self.compute(
            employee.base_salary,
            attendance.total_overtime_hours,
            adjustments,
        )?;
        let record = PayrollRecord::new(&employee.employee_id, &employee.name, period, breakdown);

        self.store.insert_payroll(&record).await?;

        info!(
            employee_id,
            %period,
            net_salary = %record.net_salary,
            performed_by,
            "Payroll processed"
        );

        // the record is already committed, an audit failure must not undo it
        if let Err(e) = self
            .store
            .record_audit(&AuditEntry::payroll_processed(&record, performed_by))
            .await
        {
            warn!(error = %e, record = %record.key(), "Failed to write payroll audit entry");
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::store::memory::fixtures::{attendance, employee};

    fn calculator_with(policy: PayrollPolicy) -> (Arc<MemoryStore>, PayrollCalculator) {
        let store = Arc::new(MemoryStore::new());
        let calc = PayrollCalculator::new(store.clone(), policy);
        (store, calc)
    }

    fn jan() -> Period {
        Period::new(1, 2026).unwrap()
    }

    fn adjustments(bonuses: Decimal, deductions: Decimal) -> Adjustments {
        Adjustments { bonuses, deductions }
    }

    #[test]
    fn worked_example_with_200_hour_divisor() {
        let (_, calc) = calculator_with(PayrollPolicy {
            standard_monthly_hours: dec!(200),
            ..PayrollPolicy::default()
        });

        let b = calc
            .compute(dec!(50000), dec!(10), adjustments(dec!(2000), dec!(500)))
            .unwrap();

        assert_eq!(b.overtime_pay, dec!(3750.00));
        assert_eq!(b.gross, dec!(55250.00));
        assert_eq!(b.tax, dec!(8287.50));
        assert_eq!(b.net_salary, dec!(46962.50));
    }

    #[test]
    fn net_identity_holds_exactly_after_rounding() {
        let (_, calc) = calculator_with(PayrollPolicy::default());
        let cases = [
            (dec!(33333.33), dec!(7.25), dec!(0.01), dec!(0)),
            (dec!(12345.67), dec!(0), dec!(0), dec!(99.99)),
            (dec!(98765.43), dec!(13.3), dec!(1234.565), dec!(0.005)),
            (dec!(1000), dec!(1), dec!(0), dec!(1000)),
        ];

        for (base, hours, bonus, deduction) in cases {
            let b = calc.compute(base, hours, adjustments(bonus, deduction)).unwrap();
            assert_eq!(
                b.net_salary,
                b.base_salary + b.overtime_pay + b.bonuses - b.deductions - b.tax,
                "base {base} hours {hours}"
            );
            assert_eq!(b.tax, round_money(b.tax));
            assert_eq!(b.overtime_pay, round_money(b.overtime_pay));
        }
    }

    #[test]
    fn negative_adjustments_and_excess_deductions_are_rejected() {
        let (_, calc) = calculator_with(PayrollPolicy::default());

        assert!(matches!(
            calc.compute(dec!(1000), dec!(0), adjustments(dec!(-1), dec!(0))),
            Err(PayrollError::Validation { field: "bonuses", .. })
        ));
        assert!(matches!(
            calc.compute(dec!(1000), dec!(0), adjustments(dec!(0), dec!(-1))),
            Err(PayrollError::Validation { field: "deductions", .. })
        ));
        assert!(matches!(
            calc.compute(dec!(1000), dec!(0), adjustments(dec!(0), dec!(1000.01))),
            Err(PayrollError::Validation { field: "deductions", .. })
        ));
    }

    #[test]
    fn amounts_beyond_a_stored_record_are_rejected() {
        let (_, calc) = calculator_with(PayrollPolicy::default());

        assert!(matches!(
            calc.compute(dec!(1000), dec!(0), adjustments(Decimal::MAX, dec!(0))),
            Err(PayrollError::Validation { field: "bonuses", .. })
        ));
        assert!(matches!(
            calc.compute(dec!(1000), dec!(0), adjustments(dec!(10000000000), dec!(0))),
            Err(PayrollError::Validation { field: "bonuses", .. })
        ));
        assert!(matches!(
            calc.compute(dec!(1000), dec!(0), adjustments(dec!(0), Decimal::MAX)),
            Err(PayrollError::Validation { field: "deductions", .. })
        ));
        assert!(matches!(
            calc.compute(MAX_AMOUNT, dec!(0), adjustments(dec!(1), dec!(0))),
            Err(PayrollError::Validation { field: "gross", .. })
        ));

        let at_cap = calc
            .compute(MAX_AMOUNT, dec!(0), adjustments(dec!(0), dec!(0)))
            .unwrap();
        assert_eq!(at_cap.gross, MAX_AMOUNT);
    }

    #[test]
    fn overtime_is_bounded_by_hours_and_by_pay() {
        let (_, calc) = calculator_with(PayrollPolicy::default());

        assert!(matches!(
            calc.compute(dec!(1000), dec!(745), adjustments(dec!(0), dec!(0))),
            Err(PayrollError::Validation { field: "overtime_hours", .. })
        ));
        assert!(calc
            .compute(dec!(1000), dec!(744), adjustments(dec!(0), dec!(0)))
            .is_ok());
        // 9 999 999 999.99 / 160 * 1.5 * 744 is far past the column width
        assert!(matches!(
            calc.compute(MAX_AMOUNT, dec!(744), adjustments(dec!(0), dec!(0))),
            Err(PayrollError::Validation { field: "overtime_hours", .. })
        ));
    }

    #[actix_web::test]
    async fn processes_with_period_overtime() {
        let (store, calc) = calculator_with(PayrollPolicy::default());
        store.upsert_employee(employee("EMP-1", "Engineering", dec!(48000))).unwrap();
        store.insert_attendance(&attendance("EMP-1", (2026, 1, 5), dec!(4))).await.unwrap();
        store.insert_attendance(&attendance("EMP-1", (2026, 1, 6), dec!(6))).await.unwrap();
        // outside the period, must not count
        store.insert_attendance(&attendance("EMP-1", (2026, 2, 2), dec!(8))).await.unwrap();

        let record = calc
            .process("EMP-1", jan(), Adjustments::default(), "hr@company.com")
            .await
            .unwrap();

        // 48000 / 160 * 1.5 * 10h
        assert_eq!(record.overtime_hours, dec!(10));
        assert_eq!(record.overtime_pay, dec!(4500.00));
        assert_eq!(record.gross, dec!(52500.00));
        assert_eq!(record.tax, dec!(7875.00));
        assert_eq!(record.net_salary, dec!(44625.00));
        assert_eq!(record.employee_name, "Employee EMP-1");

        let audit = store.audit_trail().unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].performed_by, "hr@company.com");
    }

    #[actix_web::test]
    async fn zero_attendance_uses_base_and_adjustments_only() {
        let (store, calc) = calculator_with(PayrollPolicy::default());
        store.upsert_employee(employee("EMP-1", "Sales", dec!(20000))).unwrap();

        let record = calc
            .process("EMP-1", jan(), adjustments(dec!(1000), dec!(0)), "admin")
            .await
            .unwrap();

        assert_eq!(record.overtime_pay, dec!(0));
        assert_eq!(record.gross, dec!(21000));
        assert_eq!(record.net_salary, dec!(17850.00));
    }

    #[actix_web::test]
    async fn reprocessing_conflicts_and_keeps_original() {
        let (store, calc) = calculator_with(PayrollPolicy::default());
        store.upsert_employee(employee("EMP-1", "Sales", dec!(20000))).unwrap();

        let first = calc
            .process("EMP-1", jan(), Adjustments::default(), "admin")
            .await
            .unwrap();
        let err = calc
            .process("EMP-1", jan(), adjustments(dec!(5000), dec!(0)), "admin")
            .await
            .unwrap_err();

        assert!(matches!(err, PayrollError::Conflict(_)));
        let stored = store.find_payroll("EMP-1", jan()).await.unwrap().unwrap();
        assert_eq!(stored, first);
    }

    #[actix_web::test]
    async fn later_salary_edits_do_not_touch_past_records() {
        let (store, calc) = calculator_with(PayrollPolicy::default());
        store.upsert_employee(employee("EMP-1", "Sales", dec!(20000))).unwrap();
        calc.process("EMP-1", jan(), Adjustments::default(), "admin")
            .await
            .unwrap();

        store.upsert_employee(employee("EMP-1", "Sales", dec!(90000))).unwrap();

        let stored = store.find_payroll("EMP-1", jan()).await.unwrap().unwrap();
        assert_eq!(stored.base_salary, dec!(20000));
    }

    #[actix_web::test]
    async fn unknown_or_inactive_employee_is_rejected() {
        let (store, calc) = calculator_with(PayrollPolicy::default());

        let err = calc
            .process("GHOST", jan(), Adjustments::default(), "admin")
            .await
            .unwrap_err();
        assert_eq!(err, PayrollError::not_found("employee", "GHOST"));

        let mut leaver = employee("EMP-9", "Sales", dec!(20000));
        leaver.status = "inactive".to_string();
        store.upsert_employee(leaver).unwrap();
        assert!(matches!(
            calc.process("EMP-9", jan(), Adjustments::default(), "admin").await,
            Err(PayrollError::Validation { field: "employee_id", .. })
        ));
        assert!(store.list_payroll(None).await.unwrap().is_empty());
    }
}
