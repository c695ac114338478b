use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Salary formula constants.
#[derive(Debug, Clone, PartialEq)]
pub struct PayrollPolicy {
    /// Multiplier applied to the hourly rate for overtime hours
    pub overtime_multiplier: Decimal,
    /// Divisor turning a monthly base salary into an hourly rate
    pub standard_monthly_hours: Decimal,
    pub tax_rate: Decimal,
}

impl Default for PayrollPolicy {
    fn default() -> Self {
        Self {
            overtime_multiplier: dec!(1.5),
            standard_monthly_hours: dec!(160),
            tax_rate: dec!(0.15),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPolicy {
    /// Distinct months of history needed before projecting
    pub min_periods: usize,
    pub horizon: usize,
    /// Normal quantile for the prediction interval (1.96 = 95 %)
    pub interval_z: f64,
}

impl Default for ForecastPolicy {
    fn default() -> Self {
        Self {
            min_periods: 5,
            horizon: 6,
            interval_z: 1.96,
        }
    }
}

/// Inclusive upper edges of the Low and Medium bands; anything above is High.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityBands {
    pub low_max: f64,
    pub medium_max: f64,
}

impl Default for SeverityBands {
    fn default() -> Self {
        Self {
            low_max: 50.0,
            medium_max: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyPolicy {
    pub min_records: usize,
    pub neighbors: usize,
    /// Expected share of outliers, sets the flagging percentile
    pub contamination: f64,
    /// Raw distances are divided by this before reporting
    pub score_scale: f64,
    /// Scores at or below this are never flagged
    pub min_score: f64,
    pub bands: SeverityBands,
}

impl Default for AnomalyPolicy {
    fn default() -> Self {
        Self {
            min_records: 10,
            neighbors: 5,
            contamination: 0.1,
            score_scale: 1000.0,
            min_score: 0.0,
            bands: SeverityBands::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    MySql,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" => Ok(StoreBackend::MySql),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(anyhow!("unknown store backend `{other}`")),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    /// JSON array of employees loaded into the memory store at startup
    pub memory_seed_file: Option<String>,
    pub jwt_secret: String,
    pub api_prefix: String,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub log_dir: String,
    pub log_level: tracing::Level,

    pub analytics_timeout_ms: u64,

    pub payroll: PayrollPolicy,
    pub forecast: ForecastPolicy,
    pub anomaly: AnomalyPolicy,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{key}: cannot parse `{raw}`: {e}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let store_backend = parse_or("STORE_BACKEND", StoreBackend::MySql)?;
        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::MySql && database_url.is_none() {
            return Err(anyhow!("DATABASE_URL must be set for the mysql store"));
        }

        let payroll_defaults = PayrollPolicy::default();
        let forecast_defaults = ForecastPolicy::default();
        let anomaly_defaults = AnomalyPolicy::default();

        let config = Self {
            server_addr: required("SERVER_ADDR")?,
            store_backend,
            database_url,
            memory_seed_file: env::var("MEMORY_SEED_FILE").ok(),
            jwt_secret: required("JWT_SECRET")?,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            rate_protected_per_min: parse_or("RATE_PROTECTED_PER_MIN", 1000)?,

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: parse_or("LOG_LEVEL", tracing::Level::DEBUG)?,

            analytics_timeout_ms: parse_or("ANALYTICS_TIMEOUT_MS", 10_000)?,

            payroll: PayrollPolicy {
                overtime_multiplier: parse_or(
                    "OVERTIME_MULTIPLIER",
                    payroll_defaults.overtime_multiplier,
                )?,
                standard_monthly_hours: parse_or(
                    "STANDARD_MONTHLY_HOURS",
                    payroll_defaults.standard_monthly_hours,
                )?,
                tax_rate: parse_or("TAX_RATE", payroll_defaults.tax_rate)?,
            },
            forecast: ForecastPolicy {
                min_periods: parse_or("FORECAST_MIN_PERIODS", forecast_defaults.min_periods)?,
                horizon: parse_or("FORECAST_HORIZON", forecast_defaults.horizon)?,
                interval_z: forecast_defaults.interval_z,
            },
            anomaly: AnomalyPolicy {
                min_records: parse_or("ANOMALY_MIN_RECORDS", anomaly_defaults.min_records)?,
                neighbors: parse_or("ANOMALY_NEIGHBORS", anomaly_defaults.neighbors)?,
                contamination: parse_or(
                    "ANOMALY_CONTAMINATION",
                    anomaly_defaults.contamination,
                )?,
                bands: SeverityBands {
                    low_max: parse_or("SEVERITY_LOW_MAX", anomaly_defaults.bands.low_max)?,
                    medium_max: parse_or(
                        "SEVERITY_MEDIUM_MAX",
                        anomaly_defaults.bands.medium_max,
                    )?,
                },
                ..anomaly_defaults
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.payroll.standard_monthly_hours <= Decimal::ZERO {
            return Err(anyhow!("STANDARD_MONTHLY_HOURS must be positive"));
        }
        if self.payroll.tax_rate < Decimal::ZERO || self.payroll.tax_rate >= Decimal::ONE {
            return Err(anyhow!("TAX_RATE must be in [0, 1)"));
        }
        if !(0.0..0.5).contains(&self.anomaly.contamination) {
            return Err(anyhow!("ANOMALY_CONTAMINATION must be in [0, 0.5)"));
        }
        if self.anomaly.bands.low_max > self.anomaly.bands.medium_max {
            return Err(anyhow!("SEVERITY_LOW_MAX must not exceed SEVERITY_MEDIUM_MAX"));
        }
        if self.forecast.horizon == 0 || self.anomaly.neighbors == 0 {
            return Err(anyhow!("FORECAST_HORIZON and ANOMALY_NEIGHBORS must be positive"));
        }
        if self.forecast.min_periods == 0 {
            return Err(anyhow!("FORECAST_MIN_PERIODS must be positive"));
        }
        // a single record has no peers to be compared against
        if self.anomaly.min_records < 2 {
            return Err(anyhow!("ANOMALY_MIN_RECORDS must be at least 2"));
        }
        Ok(())
    }

    /// In-memory configuration used by tests.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            server_addr: "127.0.0.1:0".to_string(),
            store_backend: StoreBackend::Memory,
            database_url: None,
            memory_seed_file: None,
            jwt_secret: "test-secret".to_string(),
            api_prefix: "/api".to_string(),
            rate_protected_per_min: 1000,
            log_dir: "logs".to_string(),
            log_level: tracing::Level::DEBUG,
            analytics_timeout_ms: 5_000,
            payroll: PayrollPolicy::default(),
            forecast: ForecastPolicy::default(),
            anomaly: AnomalyPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policies_are_documented_values() {
        let payroll = PayrollPolicy::default();
        assert_eq!(payroll.overtime_multiplier, dec!(1.5));
        assert_eq!(payroll.standard_monthly_hours, dec!(160));
        assert_eq!(payroll.tax_rate, dec!(0.15));

        let forecast = ForecastPolicy::default();
        assert_eq!((forecast.min_periods, forecast.horizon), (5, 6));

        let anomaly = AnomalyPolicy::default();
        assert_eq!(anomaly.min_records, 10);
        assert_eq!(anomaly.bands, SeverityBands { low_max: 50.0, medium_max: 100.0 });
    }

    #[test]
    fn store_backend_parses_case_insensitively() {
        assert_eq!("MySQL".parse::<StoreBackend>().unwrap(), StoreBackend::MySql);
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("redis".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn validate_rejects_inverted_bands() {
        let mut config = Config::for_tests();
        config.anomaly.bands = SeverityBands { low_max: 120.0, medium_max: 100.0 };
        assert!(config.validate().is_err());
        assert!(Config::for_tests().validate().is_ok());
    }

    #[test]
    fn validate_rejects_thresholds_too_small_to_analyse() {
        let mut config = Config::for_tests();
        config.anomaly.min_records = 1;
        assert!(config.validate().is_err());

        let mut config = Config::for_tests();
        config.forecast.min_periods = 0;
        assert!(config.validate().is_err());

        let mut config = Config::for_tests();
        config.anomaly.min_records = 2;
        config.forecast.min_periods = 1;
        assert!(config.validate().is_ok());
    }
}
