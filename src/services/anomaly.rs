use crate::config::{AnomalyPolicy, SeverityBands};
use crate::model::analytics::{Analysis, AnomalyFlag, Severity};
use crate::model::payroll::PayrollRecord;
use crate::utils::money::{round2, to_f64};
use crate::utils::stats::{mean, percentile, std_dev};

pub trait OutlierScorer: Send + Sync {
    /// One non-negative score per point; larger means more isolated.
    fn score(&self, points: &[Vec<f64>]) -> Vec<f64>;
}

/// Distance to the k-th nearest neighbour, k capped at `n - 1`.
#[derive(Debug, Clone, Copy)]
pub struct KnnScorer {
    pub neighbors: usize,
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

impl OutlierScorer for KnnScorer {
    fn score(&self, points: &[Vec<f64>]) -> Vec<f64> {
        let n = points.len();
        if n < 2 {
            return vec![0.0; n];
        }
        let k = self.neighbors.clamp(1, n - 1);

        points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let mut distances: Vec<f64> = points
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, q)| euclidean(p, q))
                    .collect();
                distances.sort_by(|a, b| a.total_cmp(b));
                distances[k - 1]
            })
            .collect()
    }
}

pub fn severity_for(score: f64, bands: &SeverityBands) -> Severity {
    if score <= bands.low_max {
        Severity::Low
    } else if score <= bands.medium_max {
        Severity::Medium
    } else {
        Severity::High
    }
}

/// Signed percentage of `value` above `mean`; zero when the mean is zero.
pub fn deviation_percent(value: f64, mean: f64) -> f64 {
    if mean == 0.0 {
        return 0.0;
    }
    (value - mean) / mean * 100.0
}

const FEATURES: [&str; 2] = ["Net salary", "Overtime pay"];

fn features(record: &PayrollRecord) -> Vec<f64> {
    vec![to_f64(record.net_salary), to_f64(record.overtime_pay)]
}

struct FeatureStats {
    means: Vec<f64>,
    std_devs: Vec<f64>,
}

impl FeatureStats {
    fn of(points: &[Vec<f64>]) -> Self {
        let columns: Vec<Vec<f64>> = (0..FEATURES.len())
            .map(|c| points.iter().map(|p| p[c]).collect())
            .collect();
        Self {
            means: columns.iter().map(|c| mean(c)).collect(),
            std_devs: columns.iter().map(|c| std_dev(c)).collect(),
        }
    }

    /// Explains a flag by the feature furthest from its mean in standard deviations.
    fn reason(&self, point: &[f64], peers: usize) -> String {
        let (driver, z) = point
            .iter()
            .enumerate()
            .map(|(c, x)| {
                let sd = self.std_devs[c];
                let z = if sd == 0.0 { 0.0 } else { (x - self.means[c]) / sd };
                (c, z)
            })
            .fold((0, 0.0_f64), |best, cur| if cur.1.abs() > best.1.abs() { cur } else { best });

        let direction = if z >= 0.0 { "high" } else { "low" };
        let pct = round2(deviation_percent(point[driver], self.means[driver]));
        format!(
            "{} is unusually {direction} relative to {peers} peer records ({pct:+.2}% from the mean)",
            FEATURES[driver]
        )
    }
}

pub struct AnomalyEngine {
    scorer: Box<dyn OutlierScorer>,
    policy: AnomalyPolicy,
}

impl AnomalyEngine {
    pub fn new(policy: AnomalyPolicy) -> Self {
        let scorer = KnnScorer {
            neighbors: policy.neighbors,
        };
        Self::with_scorer(policy, Box::new(scorer))
    }

    pub fn with_scorer(policy: AnomalyPolicy, scorer: Box<dyn OutlierScorer>) -> Self {
        Self { scorer, policy }
    }

    pub fn detect(&self, records: &[PayrollRecord]) -> Analysis<Vec<AnomalyFlag>> {
        if records.len() < self.policy.min_records {
            return Analysis::InsufficientData {
                required: self.policy.min_records,
                available: records.len(),
            };
        }

        // canonical order, results must not depend on how the store returned rows
        let mut ordered: Vec<&PayrollRecord> = records.iter().collect();
        ordered.sort_by(|a, b| {
            (a.period, &a.employee_id, a.id).cmp(&(b.period, &b.employee_id, b.id))
        });

        let points: Vec<Vec<f64>> = ordered.iter().map(|r| features(r)).collect();
        let scores: Vec<f64> = self
            .scorer
            .score(&points)
            .into_iter()
            .map(|raw| {
                let raw = if raw.is_finite() { raw.max(0.0) } else { 0.0 };
                round2(raw / self.policy.score_scale)
            })
            .collect();

        let cutoff = percentile(&scores, 100.0 * (1.0 - self.policy.contamination));
        let threshold = cutoff.max(self.policy.min_score);

        let stats = FeatureStats::of(&points);
        let mean_net = stats.means[0];
        let peers = ordered.len().saturating_sub(1);

        let mut flags: Vec<AnomalyFlag> = ordered
            .iter()
            .zip(&points)
            .zip(&scores)
            .filter(|(_, score)| **score > threshold)
            .map(|((record, point), score)| AnomalyFlag {
                employee_id: record.employee_id.clone(),
                employee_name: record.employee_name.clone(),
                period: record.period,
                net_salary: record.net_salary,
                anomaly_score: *score,
                deviation_percent: round2(deviation_percent(point[0], mean_net)),
                reason: stats.reason(point, peers),
                severity: severity_for(*score, &self.policy.bands),
            })
            .collect();

        flags.sort_by(|a, b| b.anomaly_score.total_cmp(&a.anomaly_score));
        Analysis::Ready(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::fixtures::record;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn engine() -> AnomalyEngine {
        AnomalyEngine::new(AnomalyPolicy::default())
    }

    /// `count` ordinary records one month apart, net 50 000 stepping by 100.
    fn population(count: usize) -> Vec<PayrollRecord> {
        (0..count)
            .map(|i| {
                let net = dec!(50000) + Decimal::from(i as u64 * 100);
                record(&format!("EMP-{i:02}"), 1 + (i % 12) as u32, 2025, net, dec!(0))
            })
            .collect()
    }

    #[test]
    fn nine_records_are_insufficient_even_with_an_outlier() {
        let mut records = population(8);
        records.push(record("EMP-X", 6, 2025, dec!(900000), dec!(0)));

        assert_eq!(
            engine().detect(&records),
            Analysis::InsufficientData {
                required: 10,
                available: 9
            }
        );
    }

    #[test]
    fn uniform_population_has_no_flags() {
        let records: Vec<PayrollRecord> = (0..10)
            .map(|i| record(&format!("EMP-{i}"), 3, 2026, dec!(42000), dec!(1500)))
            .collect();
        assert_eq!(engine().detect(&records), Analysis::Ready(vec![]));
    }

    #[test]
    fn clear_outlier_is_flagged_high() {
        let mut records = population(10);
        records.push(record("EMP-X", 7, 2025, dec!(200000), dec!(0)));

        let flags = engine().detect(&records).ready().unwrap();

        assert_eq!(flags.len(), 1);
        let flag = &flags[0];
        assert_eq!(flag.employee_id, "EMP-X");
        assert_eq!(flag.net_salary, dec!(200000));
        assert_eq!(flag.severity, Severity::High);
        assert!(flag.anomaly_score > 100.0);
        assert!(flag.deviation_percent > 200.0);
        assert!(flag.reason.starts_with("Net salary is unusually high"), "{}", flag.reason);
    }

    #[test]
    fn overtime_pay_can_drive_the_flag() {
        let mut records = population(10);
        records.push(record("EMP-OT", 2, 2025, dec!(50400), dec!(75000)));

        let flags = engine().detect(&records).ready().unwrap();

        assert_eq!(flags[0].employee_id, "EMP-OT");
        assert!(flags[0].reason.starts_with("Overtime pay is unusually high"));
        assert_eq!(flags[0].severity, Severity::Medium);
    }

    #[test]
    fn detection_ignores_input_order() {
        let mut records = population(12);
        records.push(record("EMP-X", 7, 2025, dec!(120000), dec!(0)));
        let forward = engine().detect(&records);
        records.reverse();
        assert_eq!(engine().detect(&records), forward);
    }

    #[test]
    fn severity_band_edges_belong_to_lower_band() {
        let bands = SeverityBands::default();
        assert_eq!(severity_for(0.0, &bands), Severity::Low);
        assert_eq!(severity_for(50.0, &bands), Severity::Low);
        assert_eq!(severity_for(50.01, &bands), Severity::Medium);
        assert_eq!(severity_for(100.0, &bands), Severity::Medium);
        assert_eq!(severity_for(100.01, &bands), Severity::High);
    }

    #[test]
    fn zero_minimum_with_no_records_is_an_empty_result() {
        let engine = AnomalyEngine::new(AnomalyPolicy {
            min_records: 0,
            ..AnomalyPolicy::default()
        });

        assert!(matches!(engine.detect(&[]), Analysis::Ready(flags) if flags.is_empty()));

        let single = population(1);
        assert!(matches!(engine.detect(&single), Analysis::Ready(flags) if flags.is_empty()));
    }

    #[test]
    fn deviation_is_zero_for_zero_mean() {
        assert_eq!(deviation_percent(10.0, 0.0), 0.0);
        assert_eq!(deviation_percent(150.0, 100.0), 50.0);
        assert_eq!(deviation_percent(50.0, 100.0), -50.0);
    }

    #[test]
    fn knn_uses_kth_neighbour_distance() {
        let scorer = KnnScorer { neighbors: 2 };
        let points = vec![vec![0.0], vec![1.0], vec![3.0], vec![10.0]];
        assert_eq!(scorer.score(&points), vec![3.0, 2.0, 3.0, 9.0]);
    }
}
