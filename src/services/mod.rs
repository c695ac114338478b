pub mod analytics;
pub mod anomaly;
pub mod attendance_aggregator;
pub mod forecast;
pub mod payroll_calculator;
