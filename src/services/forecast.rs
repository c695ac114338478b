//! Payroll cost forecasting.
//!
//! The engine owns the contract (minimum history, gap filling, horizon,
//! ordered non-negative bounds, cent rounding) and delegates the statistics
//! to a [`SeriesModel`]. The default model is a least-squares fit of a linear
//! trend plus additive Fourier seasonality.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use rust_decimal::Decimal;

use crate::config::ForecastPolicy;
use crate::model::analytics::{Analysis, CostObservation, ForecastPoint};
use crate::model::payroll::PayrollRecord;
use crate::model::period::Period;
use crate::utils::money::{money_from_f64, to_f64};
use crate::utils::stats::solve_linear;

/// Raw model output for one projected step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub predicted: f64,
    pub lower: f64,
    pub upper: f64,
}

pub trait SeriesModel: Send + Sync {
    /// Fits `series` (one value per consecutive month, oldest first) and
    /// projects `horizon` steps past its end.
    fn project(&self, series: &[f64], horizon: usize) -> Vec<Estimate>;
}

/// Residual degrees of freedom required before another pair of seasonal
/// terms is added to the design.
const MIN_RESIDUAL_DOF: usize = 3;
const QUARTER: f64 = 3.0;
const YEAR: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Term {
    Intercept,
    Trend,
    Sin(f64),
    Cos(f64),
}

impl Term {
    fn eval(&self, t: f64) -> f64 {
        match *self {
            Term::Intercept => 1.0,
            Term::Trend => t,
            Term::Sin(period) => (2.0 * PI * t / period).sin(),
            Term::Cos(period) => (2.0 * PI * t / period).cos(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarmonicRegression {
    pub interval_z: f64,
}

impl HarmonicRegression {
    pub fn new(interval_z: f64) -> Self {
        Self { interval_z }
    }

    fn design(n: usize) -> Vec<Term> {
        let mut terms = vec![Term::Intercept, Term::Trend];
        if n >= terms.len() + 2 + MIN_RESIDUAL_DOF {
            terms.extend([Term::Sin(QUARTER), Term::Cos(QUARTER)]);
        }
        if n >= YEAR as usize && n >= terms.len() + 2 + MIN_RESIDUAL_DOF {
            terms.extend([Term::Sin(YEAR), Term::Cos(YEAR)]);
        }
        terms
    }

    fn fit(terms: &[Term], series: &[f64]) -> Option<Vec<f64>> {
        let p = terms.len();
        let mut xtx = vec![vec![0.0; p]; p];
        let mut xty = vec![0.0; p];

        for (t, y) in series.iter().enumerate() {
            let row: Vec<f64> = terms.iter().map(|term| term.eval(t as f64)).collect();
            for i in 0..p {
                xty[i] += row[i] * y;
                for j in 0..p {
                    xtx[i][j] += row[i] * row[j];
                }
            }
        }

        solve_linear(xtx, xty)
    }
}

impl SeriesModel for HarmonicRegression {
    fn project(&self, series: &[f64], horizon: usize) -> Vec<Estimate> {
        let n = series.len();
        if n == 0 {
            return Vec::new();
        }

        // fall back to simpler designs when the seasonal fit is singular
        let candidates = [
            Self::design(n),
            vec![Term::Intercept, Term::Trend],
            vec![Term::Intercept],
        ];
        let (terms, beta) = candidates
            .into_iter()
            .find_map(|terms| Self::fit(&terms, series).map(|beta| (terms, beta)))
            .unwrap_or_else(|| {
                let mean = series.iter().sum::<f64>() / n as f64;
                (vec![Term::Intercept], vec![mean])
            });

        let predict = |t: f64| -> f64 { terms.iter().zip(&beta).map(|(term, b)| term.eval(t) * b).sum() };

        let ssr: f64 = series
            .iter()
            .enumerate()
            .map(|(t, y)| (y - predict(t as f64)).powi(2))
            .sum();
        let dof = n.saturating_sub(terms.len()).max(1);
        let sigma = (ssr / dof as f64).sqrt();

        (1..=horizon)
            .map(|h| {
                let t = (n - 1 + h) as f64;
                let predicted = predict(t);
                let half_width = self.interval_z * sigma * (1.0 + h as f64 / n as f64).sqrt();
                Estimate {
                    predicted,
                    lower: predicted - half_width,
                    upper: predicted + half_width,
                }
            })
            .collect()
    }
}

/// Sums net salaries per period, the series the forecast runs on.
pub fn monthly_costs(records: &[PayrollRecord]) -> Vec<CostObservation> {
    let mut totals: BTreeMap<Period, Decimal> = BTreeMap::new();
    for record in records {
        *totals.entry(record.period).or_default() += record.net_salary;
    }
    totals
        .into_iter()
        .map(|(period, total_cost)| CostObservation { period, total_cost })
        .collect()
}

/// Turns sparse monthly totals into a dense series from the first to the
/// last observed month, interpolating linearly across missing months.
fn fill_gaps(totals: &BTreeMap<Period, f64>) -> Vec<f64> {
    let Some(first) = totals.keys().next().copied() else {
        return Vec::new();
    };
    let known: Vec<(usize, f64)> = totals
        .iter()
        .map(|(period, value)| (first.months_until(period) as usize, *value))
        .collect();

    let mut series = Vec::with_capacity(known.last().map_or(0, |(i, _)| i + 1));
    for pair in known.windows(2) {
        let (i0, v0) = pair[0];
        let (i1, v1) = pair[1];
        for i in i0..i1 {
            let frac = (i - i0) as f64 / (i1 - i0) as f64;
            series.push(v0 + (v1 - v0) * frac);
        }
    }
    if let Some((_, last)) = known.last() {
        series.push(*last);
    }
    series
}

/// Forces `0 <= lower <= predicted <= upper` whatever the model produced.
fn ordered(estimate: Estimate) -> (Decimal, Decimal, Decimal) {
    let finite = |v: f64| if v.is_finite() { v } else { 0.0 };

    let predicted = finite(estimate.predicted).max(0.0);
    let lower = finite(estimate.lower).clamp(0.0, predicted);
    let upper = finite(estimate.upper).max(predicted);

    let predicted = money_from_f64(predicted);
    let lower = money_from_f64(lower).min(predicted);
    let upper = money_from_f64(upper).max(predicted);
    (lower, predicted, upper)
}

pub struct ForecastEngine {
    model: Box<dyn SeriesModel>,
    policy: ForecastPolicy,
}

impl ForecastEngine {
    pub fn new(policy: ForecastPolicy) -> Self {
        let model = HarmonicRegression::new(policy.interval_z);
        Self::with_model(policy, Box::new(model))
    }

    pub fn with_model(policy: ForecastPolicy, model: Box<dyn SeriesModel>) -> Self {
        Self { model, policy }
    }

    pub fn forecast(&self, history: &[CostObservation]) -> Analysis<Vec<ForecastPoint>> {
        let mut totals: BTreeMap<Period, f64> = BTreeMap::new();
        for observation in history {
            *totals.entry(observation.period).or_default() += to_f64(observation.total_cost);
        }

        let available = totals.len();
        if available < self.policy.min_periods {
            return Analysis::InsufficientData {
                required: self.policy.min_periods,
                available,
            };
        }

        let Some(last) = totals.keys().next_back().copied() else {
            return Analysis::InsufficientData {
                required: self.policy.min_periods,
                available,
            };
        };

        let series = fill_gaps(&totals);
        let estimates = self.model.project(&series, self.policy.horizon);

        let mut period = last;
        let points = estimates
            .into_iter()
            .take(self.policy.horizon)
            .map(|estimate| {
                period = period.next();
                let (lower_bound, predicted_cost, upper_bound) = ordered(estimate);
                ForecastPoint {
                    date: period.first_day(),
                    predicted_cost,
                    lower_bound,
                    upper_bound,
                }
            })
            .collect();

        Analysis::Ready(points)
    }
}
