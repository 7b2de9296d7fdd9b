//! Investment score: a deterministic weighted blend of market metrics.
//!
//! Each metric is normalized into [0, 1] with a bounded transform, inverted
//! where lower is better (volatility, time on market, supply pipeline), then
//! blended by weight into a 0–100 score with a Buy/Hold/Sell label and the
//! top three contributing drivers.
//!
//! The normalization bounds are pragmatic market-specific clamps; a missing
//! metric contributes a neutral 0.5 before weighting.

use serde::{Deserialize, Serialize};

/// Raw market metrics for one area or project.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoreMetrics {
    /// Gross rental yield as a fraction (0.06 = 6%).
    pub yield_pct: Option<f64>,
    /// Year-over-year price change as a fraction.
    pub yoy_change: Option<f64>,
    /// Price volatility; lower is better.
    pub volatility: Option<f64>,
    /// Transaction count over the observation window.
    pub txn_volume: Option<f64>,
    /// Average days on market; lower is better.
    pub time_on_market: Option<f64>,
    /// Units in the supply pipeline; lower is better.
    pub supply_pipeline_count: Option<f64>,
    /// Developer reliability in [0, 1].
    pub developer_reliability: Option<f64>,
}

/// Per-metric blend weights. Defaults sum to 1.0.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreWeights {
    pub yield_pct: f64,
    pub yoy_change: f64,
    pub volatility: f64,
    pub txn_volume: f64,
    pub time_on_market: f64,
    pub supply_pipeline_count: f64,
    pub developer_reliability: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            yield_pct: 0.25,
            yoy_change: 0.20,
            volatility: 0.15,
            txn_volume: 0.15,
            time_on_market: 0.10,
            supply_pipeline_count: 0.10,
            developer_reliability: 0.05,
        }
    }
}

impl ScoreWeights {
    fn total(&self) -> f64 {
        self.yield_pct
            + self.yoy_change
            + self.volatility
            + self.txn_volume
            + self.time_on_market
            + self.supply_pipeline_count
            + self.developer_reliability
    }
}

/// Recommendation label derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum ScoreLabel {
    Buy,
    Hold,
    Sell,
}

impl ScoreLabel {
    fn for_score(score: u32) -> Self {
        match score {
            70.. => ScoreLabel::Buy,
            40..=69 => ScoreLabel::Hold,
            _ => ScoreLabel::Sell,
        }
    }
}

/// One metric's share of the blended score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Driver {
    pub driver: &'static str,
    /// Contribution as a share of total weight, rounded to 3 decimals.
    pub contribution: f64,
}

/// Result of [`investment_score`].
#[derive(Debug, Clone, Serialize)]
pub struct InvestmentScore {
    /// Blended score in 0..=100.
    pub score: u32,
    pub label: ScoreLabel,
    /// Top three drivers by contribution, descending.
    pub drivers: Vec<Driver>,
}

/// Clamps `(x - lo) / (hi - lo)` into [0, 1]; missing values are neutral.
fn clamp01(x: Option<f64>, lo: f64, hi: f64) -> f64 {
    match x {
        Some(v) if hi > lo => ((v - lo) / (hi - lo)).clamp(0.0, 1.0),
        Some(_) => 0.5,
        None => 0.5,
    }
}

/// Computes the deterministic investment score for the given metrics.
pub fn investment_score(metrics: &ScoreMetrics, weights: &ScoreWeights) -> InvestmentScore {
    // Normalization ranges (market-specific; tune later).
    let yield_norm = clamp01(metrics.yield_pct, 0.01, 0.10);
    let yoy_norm = clamp01(metrics.yoy_change, -0.20, 0.50);
    let vol_norm = clamp01(metrics.volatility, 0.0, 1.0);
    let txn_norm = clamp01(metrics.txn_volume, 0.0, 2000.0);
    let tom_norm = clamp01(metrics.time_on_market, 0.0, 180.0);
    let supply_norm = clamp01(metrics.supply_pipeline_count, 0.0, 5000.0);
    let dev_norm = clamp01(metrics.developer_reliability, 0.0, 1.0);

    let contributions = [
        ("yield", weights.yield_pct * yield_norm),
        ("yoy_change", weights.yoy_change * yoy_norm),
        ("volatility", weights.volatility * (1.0 - vol_norm)),
        ("txn_volume", weights.txn_volume * txn_norm),
        ("time_on_market", weights.time_on_market * (1.0 - tom_norm)),
        (
            "supply_pipeline_count",
            weights.supply_pipeline_count * (1.0 - supply_norm),
        ),
        (
            "developer_reliability",
            weights.developer_reliability * dev_norm,
        ),
    ];

    let total_weight = match weights.total() {
        w if w > 0.0 => w,
        _ => 1.0,
    };
    let raw: f64 = contributions.iter().map(|(_, c)| c).sum();
    let score = ((raw / total_weight) * 100.0).round() as u32;

    let mut ranked = contributions;
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let drivers = ranked
        .iter()
        .take(3)
        .map(|(name, c)| Driver {
            driver: name,
            contribution: ((c / total_weight) * 1000.0).round() / 1000.0,
        })
        .collect();

    InvestmentScore {
        score,
        label: ScoreLabel::for_score(score),
        drivers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strong_metrics() -> ScoreMetrics {
        ScoreMetrics {
            yield_pct: Some(0.09),
            yoy_change: Some(0.40),
            volatility: Some(0.05),
            txn_volume: Some(1800.0),
            time_on_market: Some(20.0),
            supply_pipeline_count: Some(200.0),
            developer_reliability: Some(0.95),
        }
    }

    fn weak_metrics() -> ScoreMetrics {
        ScoreMetrics {
            yield_pct: Some(0.01),
            yoy_change: Some(-0.20),
            volatility: Some(1.0),
            txn_volume: Some(0.0),
            time_on_market: Some(180.0),
            supply_pipeline_count: Some(5000.0),
            developer_reliability: Some(0.0),
        }
    }

    #[test]
    fn strong_market_scores_buy() {
        let result = investment_score(&strong_metrics(), &ScoreWeights::default());
        assert!(result.score >= 70, "score was {}", result.score);
        assert_eq!(result.label, ScoreLabel::Buy);
    }

    #[test]
    fn weak_market_scores_sell() {
        let result = investment_score(&weak_metrics(), &ScoreWeights::default());
        assert!(result.score < 40, "score was {}", result.score);
        assert_eq!(result.label, ScoreLabel::Sell);
    }

    #[test]
    fn missing_metrics_land_near_neutral() {
        let result = investment_score(&ScoreMetrics::default(), &ScoreWeights::default());
        // All-neutral inputs blend to exactly 50.
        assert_eq!(result.score, 50);
        assert_eq!(result.label, ScoreLabel::Hold);
    }

    #[test]
    fn drivers_are_top_three_descending() {
        let result = investment_score(&strong_metrics(), &ScoreWeights::default());
        assert_eq!(result.drivers.len(), 3);
        assert!(result.drivers[0].contribution >= result.drivers[1].contribution);
        assert!(result.drivers[1].contribution >= result.drivers[2].contribution);
    }

    #[test]
    fn zero_weights_do_not_divide_by_zero() {
        let weights = ScoreWeights {
            yield_pct: 0.0,
            yoy_change: 0.0,
            volatility: 0.0,
            txn_volume: 0.0,
            time_on_market: 0.0,
            supply_pipeline_count: 0.0,
            developer_reliability: 0.0,
        };
        let result = investment_score(&strong_metrics(), &weights);
        assert_eq!(result.score, 0);
    }

    #[test]
    fn label_thresholds() {
        assert_eq!(ScoreLabel::for_score(70), ScoreLabel::Buy);
        assert_eq!(ScoreLabel::for_score(69), ScoreLabel::Hold);
        assert_eq!(ScoreLabel::for_score(40), ScoreLabel::Hold);
        assert_eq!(ScoreLabel::for_score(39), ScoreLabel::Sell);
    }
}
