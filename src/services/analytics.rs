use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use actix_web::rt::time::timeout;
use actix_web::web;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::PayrollError;
use crate::model::analytics::{Analysis, AnomalyFlag, DashboardSummary, ForecastPoint};
use crate::model::employee::Employee;
use crate::model::payroll::PayrollRecord;
use crate::model::period::Period;
use crate::services::anomaly::AnomalyEngine;
use crate::services::forecast::{ForecastEngine, monthly_costs};
use crate::store::PayrollStore;
use crate::utils::money::round_money;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardScope {
    Organization,
    /// A single employee looking at their own figures
    Employee(String),
}

/// Read-side entry point for the dashboard and analytics consumers.
pub struct AnalyticsFacade {
    store: Arc<dyn PayrollStore>,
    forecast: Arc<ForecastEngine>,
    anomaly: Arc<AnomalyEngine>,
    budget: Duration,
}

/// Pure aggregation behind the dashboard.
pub fn summarize(employees: &[Employee], records: &[PayrollRecord], current: Period) -> DashboardSummary {
    let mut department_distribution = BTreeMap::new();
    for employee in employees {
        *department_distribution
            .entry(employee.department.clone())
            .or_insert(0u64) += 1;
    }

    let monthly_payroll_cost: Decimal = records
        .iter()
        .filter(|r| r.period == current)
        .map(|r| r.net_salary)
        .sum();
    let total_overtime_pay: Decimal = records.iter().map(|r| r.overtime_pay).sum();

    DashboardSummary {
        total_employees: employees.len() as u64,
        total_payroll_records: records.len() as u64,
        monthly_payroll_cost: round_money(monthly_payroll_cost),
        total_overtime_pay: round_money(total_overtime_pay),
        department_distribution,
    }
}

impl AnalyticsFacade {
    pub fn new(
        store: Arc<dyn PayrollStore>,
        forecast: ForecastEngine,
        anomaly: AnomalyEngine,
        budget: Duration,
    ) -> Self {
        Self {
            store,
            forecast: Arc::new(forecast),
            anomaly: Arc::new(anomaly),
            budget,
        }
    }

    pub async fn dashboard_summary(
        &self,
        scope: DashboardScope,
        today: NaiveDate,
    ) -> Result<DashboardSummary, PayrollError> {
        let current = Period::of_date(today);

        match scope {
            DashboardScope::Organization => {
                let employees = self.store.active_employees().await?;
                let records = self.store.list_payroll(None).await?;
                Ok(summarize(&employees, &records, current))
            }
            DashboardScope::Employee(employee_id) => {
                let employee = self
                    .store
                    .find_employee(&employee_id)
                    .await?
                    .ok_or_else(|| PayrollError::not_found("employee", employee_id.as_str()))?;
                let records = self.store.list_payroll(Some(&employee_id)).await?;
                Ok(summarize(&[employee], &records, current))
            }
        }
    }

    pub async fn forecast(&self) -> Result<Analysis<Vec<ForecastPoint>>, PayrollError> {
        let records = self.store.list_payroll(None).await?;
        let history = monthly_costs(&records);
        debug!(periods = history.len(), "Running payroll forecast");

        let engine = self.forecast.clone();
        self.off_thread("forecast", move || engine.forecast(&history))
            .await
    }

    pub async fn anomalies(&self) -> Result<Analysis<Vec<AnomalyFlag>>, PayrollError> {
        let records = self.store.list_payroll(None).await?;
        debug!(records = records.len(), "Running anomaly detection");

        let engine = self.anomaly.clone();
        self.off_thread("anomaly detection", move || engine.detect(&records))
            .await
    }

    /// Runs model work on the blocking pool; past the budget the caller gets
    /// `Timeout`, never a partial result.
    async fn off_thread<T, F>(&self, operation: &'static str, work: F) -> Result<T, PayrollError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        match timeout(self.budget, web::block(work)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(error = %e, operation, "Analytics worker failed");
                Err(PayrollError::Upstream(format!("{operation} worker failed")))
            }
            Err(_) => {
                let budget_ms = self.budget.as_millis() as u64;
                warn!(operation, budget_ms, "Analytics timed out");
                Err(PayrollError::Timeout {
                    operation,
                    budget_ms,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnomalyPolicy, ForecastPolicy};
    use crate::services::forecast::{Estimate, SeriesModel};
    use crate::store::MemoryStore;
    use crate::store::memory::fixtures::{employee, record};
    use rust_decimal_macros::dec;

    fn facade(store: Arc<MemoryStore>) -> AnalyticsFacade {
        AnalyticsFacade::new(
            store,
            ForecastEngine::new(ForecastPolicy::default()),
            AnomalyEngine::new(AnomalyPolicy::default()),
            Duration::from_secs(5),
        )
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    #[actix_web::test]
    async fn empty_store_yields_zero_summary() {
        let summary = facade(Arc::new(MemoryStore::new()))
            .dashboard_summary(DashboardScope::Organization, today())
            .await
            .unwrap();

        assert_eq!(summary, DashboardSummary::default());
        assert!(summary.department_distribution.is_empty());
    }

    #[actix_web::test]
    async fn organization_summary_aggregates_records() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_employee(employee("A", "Engineering", dec!(1000))).unwrap();
        store.upsert_employee(employee("B", "Engineering", dec!(1000))).unwrap();
        store.upsert_employee(employee("C", "Sales", dec!(1000))).unwrap();
        let mut gone = employee("D", "Sales", dec!(1000));
        gone.status = "inactive".to_string();
        store.upsert_employee(gone).unwrap();

        store.insert_payroll(&record("A", 3, 2026, dec!(1000.50), dec!(100))).await.unwrap();
        store.insert_payroll(&record("B", 3, 2026, dec!(2000.25), dec!(0))).await.unwrap();
        store.insert_payroll(&record("A", 2, 2026, dec!(999), dec!(50.10))).await.unwrap();

        let summary = facade(store)
            .dashboard_summary(DashboardScope::Organization, today())
            .await
            .unwrap();

        assert_eq!(summary.total_employees, 3);
        assert_eq!(summary.total_payroll_records, 3);
        assert_eq!(summary.monthly_payroll_cost, dec!(3000.75));
        assert_eq!(summary.total_overtime_pay, dec!(150.10));
        assert_eq!(summary.department_distribution["Engineering"], 2);
        assert_eq!(summary.department_distribution["Sales"], 1);
    }

    #[actix_web::test]
    async fn employee_summary_is_scoped() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_employee(employee("A", "Engineering", dec!(1000))).unwrap();
        store.upsert_employee(employee("B", "Sales", dec!(1000))).unwrap();
        store.insert_payroll(&record("A", 3, 2026, dec!(1000), dec!(10))).await.unwrap();
        store.insert_payroll(&record("B", 3, 2026, dec!(5000), dec!(20))).await.unwrap();

        let facade = facade(store);
        let summary = facade
            .dashboard_summary(DashboardScope::Employee("B".into()), today())
            .await
            .unwrap();

        assert_eq!(summary.total_employees, 1);
        assert_eq!(summary.total_payroll_records, 1);
        assert_eq!(summary.monthly_payroll_cost, dec!(5000));
        assert_eq!(summary.department_distribution.len(), 1);

        assert!(matches!(
            facade
                .dashboard_summary(DashboardScope::Employee("Z".into()), today())
                .await,
            Err(PayrollError::NotFound { .. })
        ));
    }

    #[actix_web::test]
    async fn forecast_and_anomalies_report_insufficient_data() {
        let store = Arc::new(MemoryStore::new());
        store.insert_payroll(&record("A", 1, 2026, dec!(1000), dec!(0))).await.unwrap();
        let facade = facade(store);

        assert_eq!(
            facade.forecast().await.unwrap(),
            Analysis::InsufficientData {
                required: 5,
                available: 1
            }
        );
        assert!(facade.anomalies().await.unwrap().is_insufficient());
    }

    #[actix_web::test]
    async fn forecast_runs_over_store_history() {
        let store = Arc::new(MemoryStore::new());
        for month in 1..=6 {
            let net = Decimal::from(10_000 + month * 500);
            store.insert_payroll(&record("A", month as u32, 2025, net, dec!(0))).await.unwrap();
            store.insert_payroll(&record("B", month as u32, 2025, net, dec!(0))).await.unwrap();
        }

        let points = facade(store).forecast().await.unwrap().ready().unwrap();
        assert_eq!(points.len(), 6);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
        assert_eq!(points[0].predicted_cost, dec!(27000.00));
    }

    struct SlowModel;

    impl SeriesModel for SlowModel {
        fn project(&self, _series: &[f64], horizon: usize) -> Vec<Estimate> {
            std::thread::sleep(Duration::from_millis(500));
            vec![
                Estimate {
                    predicted: 1.0,
                    lower: 0.0,
                    upper: 2.0
                };
                horizon
            ]
        }
    }

    #[actix_web::test]
    async fn slow_model_times_out() {
        let store = Arc::new(MemoryStore::new());
        for month in 1..=5 {
            store.insert_payroll(&record("A", month, 2025, dec!(100), dec!(0))).await.unwrap();
        }
        let facade = AnalyticsFacade::new(
            store,
            ForecastEngine::with_model(ForecastPolicy::default(), Box::new(SlowModel)),
            AnomalyEngine::new(AnomalyPolicy::default()),
            Duration::from_millis(20),
        );

        assert_eq!(
            facade.forecast().await.unwrap_err(),
            PayrollError::Timeout {
                operation: "forecast",
                budget_ms: 20
            }
        );
    }
}
