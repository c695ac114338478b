use std::collections::HashSet;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::PayrollError;
use crate::model::attendance::{AttendanceEntry, AttendanceSummary};
use crate::model::period::Period;

const MAX_DAILY_HOURS: Decimal = dec!(24);
/// A day is either on leave or not.
const MAX_DAILY_LEAVES: u32 = 1;

/// Checks one entry at the recording boundary.
pub fn validate_entry(entry: &AttendanceEntry) -> Result<(), PayrollError> {
    if entry.employee_id.trim().is_empty() {
        return Err(PayrollError::validation("employee_id", "must not be empty"));
    }
    if entry.hours_worked < Decimal::ZERO || entry.hours_worked > MAX_DAILY_HOURS {
        return Err(PayrollError::validation(
            "hours_worked",
            format!("{} on {} is not between 0 and 24", entry.hours_worked, entry.date),
        ));
    }
    if entry.overtime_hours < Decimal::ZERO || entry.overtime_hours > MAX_DAILY_HOURS {
        return Err(PayrollError::validation(
            "overtime_hours",
            format!("{} on {} is not between 0 and 24", entry.overtime_hours, entry.date),
        ));
    }
    if entry.leaves > MAX_DAILY_LEAVES {
        return Err(PayrollError::validation(
            "leaves",
            format!("{} on {} is more than one day of leave", entry.leaves, entry.date),
        ));
    }
    Ok(())
}

/// Sums one employee's attendance over one period.
///
/// Every entry must belong to `employee_id` and `period`, and each date may
/// appear once; anything else is reported instead of being counted twice.
pub fn aggregate(
    employee_id: &str,
    period: Period,
    entries: &[AttendanceEntry],
) -> Result<AttendanceSummary, PayrollError> {
    let mut seen = HashSet::with_capacity(entries.len());
    let mut summary = AttendanceSummary::default();

    for entry in entries {
        validate_entry(entry)?;
        if entry.employee_id != employee_id {
            return Err(PayrollError::validation(
                "employee_id",
                format!("entry for {} in the summary of {employee_id}", entry.employee_id),
            ));
        }
        if !period.contains(entry.date) {
            return Err(PayrollError::validation(
                "date",
                format!("{} is outside {period}", entry.date),
            ));
        }
        if !seen.insert(entry.date) {
            return Err(PayrollError::validation(
                "date",
                format!("duplicate attendance for {employee_id} on {}", entry.date),
            ));
        }

        summary.total_hours_worked += entry.hours_worked;
        summary.total_overtime_hours += entry.overtime_hours;
        summary.total_leaves += entry.leaves;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::fixtures::attendance;

    fn jan() -> Period {
        Period::new(1, 2026).unwrap()
    }

    #[test]
    fn no_entries_means_zero_totals() {
        let summary = aggregate("EMP-1", jan(), &[]).unwrap();
        assert_eq!(summary, AttendanceSummary::default());
        assert_eq!(summary.total_leaves, 0);
    }

    #[test]
    fn sums_hours_overtime_and_leaves() {
        let mut sick = attendance("EMP-1", (2026, 1, 7), dec!(0));
        sick.hours_worked = Decimal::ZERO;
        sick.leaves = 1;
        let entries = vec![
            attendance("EMP-1", (2026, 1, 5), dec!(2.5)),
            attendance("EMP-1", (2026, 1, 6), dec!(1)),
            sick,
        ];

        let summary = aggregate("EMP-1", jan(), &entries).unwrap();
        assert_eq!(summary.total_hours_worked, dec!(16));
        assert_eq!(summary.total_overtime_hours, dec!(3.5));
        assert_eq!(summary.total_leaves, 1);
    }

    #[test]
    fn duplicate_dates_are_rejected() {
        let entries = vec![
            attendance("EMP-1", (2026, 1, 5), dec!(2)),
            attendance("EMP-1", (2026, 1, 5), dec!(2)),
        ];
        let err = aggregate("EMP-1", jan(), &entries).unwrap_err();
        assert!(matches!(err, PayrollError::Validation { field: "date", .. }));
    }

    #[test]
    fn entries_outside_period_or_employee_are_rejected() {
        let feb = vec![attendance("EMP-1", (2026, 2, 1), dec!(1))];
        assert!(aggregate("EMP-1", jan(), &feb).is_err());

        let other = vec![attendance("EMP-2", (2026, 1, 3), dec!(1))];
        assert!(matches!(
            aggregate("EMP-1", jan(), &other),
            Err(PayrollError::Validation { field: "employee_id", .. })
        ));
    }

    #[test]
    fn out_of_range_hours_are_rejected() {
        let mut entry = attendance("EMP-1", (2026, 1, 5), dec!(0));
        entry.hours_worked = dec!(24.5);
        assert!(matches!(
            validate_entry(&entry),
            Err(PayrollError::Validation { field: "hours_worked", .. })
        ));

        entry.hours_worked = dec!(8);
        entry.overtime_hours = dec!(-1);
        assert!(matches!(
            validate_entry(&entry),
            Err(PayrollError::Validation { field: "overtime_hours", .. })
        ));
    }

    #[test]
    fn overtime_and_leaves_are_capped_per_day() {
        let mut entry = attendance("EMP-1", (2026, 1, 5), dec!(25));
        assert!(matches!(
            validate_entry(&entry),
            Err(PayrollError::Validation { field: "overtime_hours", .. })
        ));

        entry.overtime_hours = dec!(24);
        assert!(validate_entry(&entry).is_ok());

        entry.leaves = 2;
        assert!(matches!(
            validate_entry(&entry),
            Err(PayrollError::Validation { field: "leaves", .. })
        ));
    }
}
