//! Seeded mock chart generators.
//!
//! Charts are created empty and grow on a fixed tick. Each tick draws a
//! random point count per chart; a chart at its row cap sits the tick out.
//! Timestamps are ordinals starting at 0.0 and stepping by 1.0.

use crate::source::{DataSource, GeneratorConfig, GeneratorKind};
use crate::store::Series;
use crate::types::{ChartError, ChartInfo, ChartResult, Row};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

/// Pull toward the mean per step of the mean-reverting recurrence.
const MEAN_REVERT_FACTOR: f64 = 0.9;

/// Constant drift per step; stationary mean works out to drift / (1 - factor).
const MEAN_REVERT_DRIFT: f64 = 10.0;

/// Recurrence iterations used to settle a fresh chart near the mean.
const WARMUP_STEPS: usize = 300;

enum ChartModel {
    /// v' = factor * v + gaussian + drift, opened from a warmed-up sample.
    MeanReverting,
    /// v' = v + gradient, opened at zero. The gradient is drawn once per
    /// chart and kept for its lifetime.
    Linear { gradient: f64 },
}

struct ChartState {
    series: Series,
    model: ChartModel,
}

impl ChartState {
    /// Append up to `count` rows. An empty chart spends its first point on
    /// the opening datum.
    fn advance(&mut self, rng: &mut StdRng, mut count: u32) {
        if count == 0 {
            return;
        }
        if self.series.is_empty() {
            let opening = match self.model {
                ChartModel::MeanReverting => warmup_value(rng, WARMUP_STEPS),
                ChartModel::Linear { .. } => 0.0,
            };
            self.series.append(Row::new(0.0, opening));
            count -= 1;
        }
        for _ in 0..count {
            let last = match self.series.last() {
                Some(row) => *row,
                None => break,
            };
            let value = match self.model {
                ChartModel::MeanReverting => {
                    last.value * MEAN_REVERT_FACTOR + gaussian(rng) + MEAN_REVERT_DRIFT
                }
                ChartModel::Linear { gradient } => last.value + gradient,
            };
            self.series.append(Row::new(last.time + 1.0, value));
        }
    }
}

/// Standard normal deviate via the polar method.
fn gaussian(rng: &mut StdRng) -> f64 {
    loop {
        let u = 2.0 * rng.gen::<f64>() - 1.0;
        let v = 2.0 * rng.gen::<f64>() - 1.0;
        let s = u * u + v * v;
        if s > 0.0 && s < 1.0 {
            return u * (-2.0 * s.ln() / s).sqrt();
        }
    }
}

/// Run the mean-reverting recurrence from zero and return where it settles,
/// so fresh charts open near the stationary mean instead of at zero.
fn warmup_value(rng: &mut StdRng, steps: usize) -> f64 {
    let mut value = 0.0;
    for _ in 0..steps {
        value = value * MEAN_REVERT_FACTOR + gaussian(rng) + MEAN_REVERT_DRIFT;
    }
    value
}

/// One growth pass over every chart.
fn step_all(
    charts: &mut BTreeMap<String, ChartState>,
    rng: &mut StdRng,
    config: &GeneratorConfig,
) {
    for (name, chart) in charts.iter_mut() {
        if chart.series.len() >= config.maximum_number_of_data_points_per_chart {
            continue;
        }
        let count = rng.gen_range(0..config.maximum_number_of_new_data_points_per_cycle);
        if count == 0 {
            continue;
        }
        chart.advance(rng, count);
        debug!("appended {count} rows to '{name}'");
    }
}

async fn tick_loop(
    charts: Arc<RwLock<BTreeMap<String, ChartState>>>,
    mut rng: StdRng,
    config: GeneratorConfig,
) {
    let period = Duration::from_millis(config.update_interval_milliseconds);
    let mut ticker = tokio::time::interval(period);
    // Swallow the interval's immediate first fire; charts stay empty until
    // one full period has elapsed.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let mut charts = charts.write().await;
        step_all(&mut charts, &mut rng, &config);
    }
}

/// Mock source producing charts named "Series 1", "Series 2", ...
pub struct GeneratorSource {
    name: &'static str,
    id: String,
    charts: Arc<RwLock<BTreeMap<String, ChartState>>>,
    ticker: JoinHandle<()>,
}

impl GeneratorSource {
    /// Build the chart set and start the tick task.
    pub fn spawn(config: GeneratorConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut charts = BTreeMap::new();
        for i in 1..=config.number_of_charts_to_generate {
            let model = match config.data_type {
                GeneratorKind::OrnsteinUhlenbeck => ChartModel::MeanReverting,
                GeneratorKind::Linear => ChartModel::Linear {
                    gradient: rng.gen::<f64>(),
                },
            };
            charts.insert(
                format!("Series {i}"),
                ChartState {
                    series: Series::new(),
                    model,
                },
            );
        }
        let name = match config.data_type {
            GeneratorKind::OrnsteinUhlenbeck => "Ornstein-Uhlenbeck generator",
            GeneratorKind::Linear => "Linear generator",
        };
        let charts = Arc::new(RwLock::new(charts));
        let ticker = tokio::spawn(tick_loop(Arc::clone(&charts), rng, config));
        Self {
            name,
            id: Uuid::new_v4().to_string(),
            charts,
            ticker,
        }
    }
}

impl Drop for GeneratorSource {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}

#[async_trait]
impl DataSource for GeneratorSource {
    fn name(&self) -> &str {
        self.name
    }

    fn id(&self) -> &str {
        &self.id
    }

    async fn known_charts(&self) -> ChartResult<Vec<ChartInfo>> {
        let charts = self.charts.read().await;
        Ok(charts
            .iter()
            .map(|(name, state)| ChartInfo::line(name, state.series.len()))
            .collect())
    }

    async fn data_after(&self, chart: &str, from: f64, inclusive: bool) -> ChartResult<Vec<Row>> {
        let charts = self.charts.read().await;
        let state = charts
            .get(chart)
            .ok_or_else(|| ChartError::UnknownChart(chart.to_string()))?;
        Ok(state.series.rows_after(from, inclusive).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::defaults;

    fn mean_reverting_chart() -> ChartState {
        ChartState {
            series: Series::new(),
            model: ChartModel::MeanReverting,
        }
    }

    fn test_config() -> GeneratorConfig {
        GeneratorConfig {
            data_type: GeneratorKind::OrnsteinUhlenbeck,
            number_of_charts_to_generate: 3,
            maximum_number_of_data_points_per_chart: 800,
            maximum_number_of_new_data_points_per_cycle: 20,
            update_interval_milliseconds: 1000,
            seed: 1,
        }
    }

    #[test]
    fn advance_produces_ordinal_timestamps() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut chart = mean_reverting_chart();
        chart.advance(&mut rng, 5);
        let times: Vec<f64> = chart.series.rows().iter().map(|r| r.time).collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn warmed_up_opening_sits_near_the_stationary_mean() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut chart = mean_reverting_chart();
        chart.advance(&mut rng, 1);
        let opening = chart.series.rows()[0].value;
        // drift / (1 - factor) = 100; the process std deviation is ~2.3.
        assert!((opening - 100.0).abs() < 30.0, "opening was {opening}");
    }

    #[test]
    fn linear_charts_grow_by_a_fixed_gradient_from_zero() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut chart = ChartState {
            series: Series::new(),
            model: ChartModel::Linear { gradient: 2.5 },
        };
        chart.advance(&mut rng, 4);
        let values: Vec<f64> = chart.series.rows().iter().map(|r| r.value).collect();
        assert_eq!(values, vec![0.0, 2.5, 5.0, 7.5]);
    }

    #[test]
    fn step_all_is_deterministic_for_a_seed() {
        let config = test_config();
        let run = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut charts = BTreeMap::new();
            charts.insert("Series 1".to_string(), mean_reverting_chart());
            charts.insert("Series 2".to_string(), mean_reverting_chart());
            for _ in 0..4 {
                step_all(&mut charts, &mut rng, &config);
            }
            charts
                .into_iter()
                .map(|(name, state)| (name, state.series.rows().to_vec()))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(1), run(1));
    }

    #[test]
    fn chart_at_cap_sits_the_tick_out() {
        let config = GeneratorConfig {
            maximum_number_of_data_points_per_chart: 4,
            ..test_config()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let mut charts = BTreeMap::new();
        charts.insert("Series 1".to_string(), mean_reverting_chart());
        for _ in 0..50 {
            step_all(&mut charts, &mut rng, &config);
        }
        let len = charts["Series 1"].series.len();
        // One tick may overshoot the cap; afterwards growth stops.
        let settled = len;
        for _ in 0..10 {
            step_all(&mut charts, &mut rng, &config);
        }
        assert_eq!(charts["Series 1"].series.len(), settled);
        assert!(settled >= 4);
    }

    #[test]
    fn per_cycle_maximum_of_one_never_appends() {
        // gen_range(0..1) is always zero, so every tick skips every chart.
        let config = GeneratorConfig {
            maximum_number_of_new_data_points_per_cycle: 1,
            ..test_config()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let mut charts = BTreeMap::new();
        charts.insert("Series 1".to_string(), mean_reverting_chart());
        for _ in 0..20 {
            step_all(&mut charts, &mut rng, &config);
        }
        assert!(charts["Series 1"].series.is_empty());
    }

    #[tokio::test]
    async fn spawned_source_lists_empty_charts_before_the_first_tick() {
        let source = GeneratorSource::spawn(GeneratorConfig {
            update_interval_milliseconds: 60_000,
            ..test_config()
        });
        let charts = source.known_charts().await.unwrap();
        let names: Vec<&str> = charts.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(names, vec!["Series 1", "Series 2", "Series 3"]);
        assert!(charts.iter().all(|c| c.size == 0));
        assert_eq!(
            source
                .data_after("Series 2", f64::MIN, false)
                .await
                .unwrap(),
            vec![]
        );
    }

    #[tokio::test]
    async fn unknown_chart_is_reported_by_name() {
        let source = GeneratorSource::spawn(GeneratorConfig {
            update_interval_milliseconds: 60_000,
            ..test_config()
        });
        let err = source
            .data_after("Series 9", f64::MIN, false)
            .await
            .unwrap_err();
        assert!(matches!(err, ChartError::UnknownChart(name) if name == "Series 9"));
    }

    #[tokio::test]
    async fn charts_grow_once_the_interval_elapses() {
        let source = GeneratorSource::spawn(GeneratorConfig {
            update_interval_milliseconds: 10,
            ..test_config()
        });
        // ~30 ticks; the odds of every chart drawing zero points on every
        // one are negligible, and the seed is fixed anyway.
        tokio::time::sleep(Duration::from_millis(300)).await;
        let charts = source.known_charts().await.unwrap();
        let total: usize = charts.iter().map(|c| c.size).sum();
        assert!(total > 0, "no rows after thirty ticks");
    }

    #[test]
    fn defaults_match_the_admin_contract() {
        let config = GeneratorConfig::default();
        assert_eq!(config.number_of_charts_to_generate, defaults::charts());
        assert_eq!(config.maximum_number_of_data_points_per_chart, 800);
        assert_eq!(config.maximum_number_of_new_data_points_per_cycle, 20);
        assert_eq!(config.update_interval_milliseconds, 1000);
    }
}
