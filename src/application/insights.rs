//! Insights service: analytics synthesis behind the insights endpoint.
//!
//! Four modes. The investment score is pure arithmetic
//! ([`crate::domain::scoring`]) with an LLM-written explanation on top; the
//! chart insight, market narrative, and opportunity snapshot are LLM
//! synthesis over a chart payload. Every LLM call is an enhancement: when it
//! degrades, a deterministic fallback is produced instead.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::application::chat::Degraded;
use crate::domain::scoring::{investment_score, InvestmentScore, ScoreMetrics, ScoreWeights};
use crate::ports::{CompletionProvider, PromptMessage};

/// Investment-score response returned by the insights endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct InsightsReport {
    pub area: String,
    #[serde(flatten)]
    pub score: InvestmentScore,
    pub explanation: String,
}

/// Chart payload behind the insight, narrative, and snapshot modes. The
/// context and data summary are opaque client JSON, quoted into the prompts.
#[derive(Debug, Clone)]
pub struct ChartContext {
    pub chart_type: String,
    pub context: Value,
    pub data_summary: Value,
    pub detail_level: String,
}

/// Qualitative verdict for a chart. Field names match the client wire shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpportunitySnapshot {
    #[serde(rename = "snapshotVerdict")]
    pub verdict: String,
    #[serde(rename = "snapshotReason")]
    pub reason: String,
}

impl Default for OpportunitySnapshot {
    fn default() -> Self {
        Self {
            verdict: "Neutral".to_string(),
            reason: "Market conditions are stable.".to_string(),
        }
    }
}

pub struct InsightsService {
    provider: Arc<dyn CompletionProvider>,
}

impl InsightsService {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Scores the given metrics and attaches an explanation.
    pub async fn investment_report(&self, area: &str, metrics: &ScoreMetrics) -> InsightsReport {
        let score = investment_score(metrics, &ScoreWeights::default());

        let explanation = match self.explain(area, &score).await {
            Ok(text) => text,
            Err(degraded) => {
                warn!(area, reason = %degraded.reason, "score explanation degraded");
                fallback_explanation(area, &score)
            }
        };

        InsightsReport {
            area: area.to_string(),
            score,
            explanation,
        }
    }

    /// One data-driven observation about a chart. Degrades to a canned line.
    pub async fn chart_insight(&self, chart: &ChartContext) -> String {
        let style = if chart.detail_level == "short" {
            "one-line quantitative insight"
        } else {
            "detailed investor insight of three to five sentences"
        };
        let prompt = [
            PromptMessage::system("You are a professional real-estate data analyst."),
            PromptMessage::user(format!(
                "Chart type: {}. Context: {}. Aggregated data summary: {}. \
                 Write a {style}. Focus on patterns, trends, or anomalies \
                 without repeating raw numbers exactly.",
                chart.chart_type, chart.context, chart.data_summary
            )),
        ];

        match self.synthesize(&prompt).await {
            Ok(text) => text,
            Err(degraded) => {
                warn!(chart_type = %chart.chart_type, reason = %degraded.reason, "chart insight degraded");
                "No insight generated.".to_string()
            }
        }
    }

    /// Story-style explanation of a chart for investors.
    pub async fn market_narrative(&self, chart: &ChartContext) -> String {
        let prompt = [
            PromptMessage::system("You are a market narrator for real-estate investors."),
            PromptMessage::user(format!(
                "Chart type: {}. Context: {}. Data summary: {}. \
                 Write a fluent, insight-driven narrative in {} detail.",
                chart.chart_type, chart.context, chart.data_summary, chart.detail_level
            )),
        ];

        match self.synthesize(&prompt).await {
            Ok(text) => text,
            Err(degraded) => {
                warn!(chart_type = %chart.chart_type, reason = %degraded.reason, "narrative degraded");
                "No narrative generated.".to_string()
            }
        }
    }

    /// Two-line Verdict/Reason snapshot. Lines the model fails to produce
    /// keep the Neutral defaults.
    pub async fn opportunity_snapshot(&self, chart: &ChartContext) -> OpportunitySnapshot {
        let prompt = [
            PromptMessage::system("You are a property investment advisor."),
            PromptMessage::user(format!(
                "Chart type: {}. Market context: {}. Aggregated data trends: {}. \
                 Output exactly two lines:\n\
                 Verdict: <Good|Neutral|Risky>\n\
                 Reason: <one short qualitative sentence, no numbers>",
                chart.chart_type, chart.context, chart.data_summary
            )),
        ];

        match self.synthesize(&prompt).await {
            Ok(text) => parse_snapshot(&text),
            Err(degraded) => {
                warn!(chart_type = %chart.chart_type, reason = %degraded.reason, "snapshot degraded");
                OpportunitySnapshot::default()
            }
        }
    }

    async fn explain(&self, area: &str, score: &InvestmentScore) -> Result<String, Degraded> {
        let drivers = score
            .drivers
            .iter()
            .map(|d| d.driver)
            .collect::<Vec<_>>()
            .join(", ");

        let prompt = [
            PromptMessage::system(
                "You are a real-estate investment analyst. Explain the score \
                 in two or three sentences for a non-expert reader.",
            ),
            PromptMessage::user(format!(
                "Area: {area}. Investment score: {}/100 ({:?}). Main drivers: {drivers}.",
                score.score, score.label
            )),
        ];

        self.synthesize(&prompt).await
    }

    /// One completion call, trimmed, with empty output treated as a failure.
    async fn synthesize(&self, prompt: &[PromptMessage]) -> Result<String, Degraded> {
        let text = self
            .provider
            .complete(prompt)
            .await
            .map_err(|err| Degraded {
                reason: err.to_string(),
            })?;

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(Degraded {
                reason: "empty completion".into(),
            });
        }
        Ok(text)
    }
}

/// Extracts `Verdict:`/`Reason:` lines; anything unmatched keeps the default.
fn parse_snapshot(text: &str) -> OpportunitySnapshot {
    let mut snapshot = OpportunitySnapshot::default();
    for line in text.lines() {
        let lower = line.trim_start().to_lowercase();
        if let Some((_, value)) = line.split_once(':') {
            if lower.starts_with("verdict") {
                snapshot.verdict = value.trim().to_string();
            } else if lower.starts_with("reason") {
                snapshot.reason = value.trim().to_string();
            }
        }
    }
    snapshot
}

/// Deterministic explanation used when the LLM call degrades.
fn fallback_explanation(area: &str, score: &InvestmentScore) -> String {
    let top = score
        .drivers
        .first()
        .map(|d| d.driver)
        .unwrap_or("overall market conditions");
    format!(
        "{area} scores {}/100 ({:?}), driven mainly by {top}.",
        score.score, score.label
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockProvider;

    fn metrics() -> ScoreMetrics {
        ScoreMetrics {
            yield_pct: Some(0.08),
            yoy_change: Some(0.30),
            volatility: Some(0.10),
            txn_volume: Some(1500.0),
            time_on_market: Some(30.0),
            supply_pipeline_count: Some(400.0),
            developer_reliability: Some(0.9),
        }
    }

    #[tokio::test]
    async fn report_carries_llm_explanation() {
        let service = InsightsService::new(Arc::new(MockProvider::returning(
            "Strong yields and fast absorption.",
        )));
        let report = service.investment_report("Dubai Marina", &metrics()).await;

        assert_eq!(report.area, "Dubai Marina");
        assert_eq!(report.explanation, "Strong yields and fast absorption.");
        assert!(report.score.score > 0);
    }

    #[tokio::test]
    async fn degraded_explanation_falls_back_deterministically() {
        let service = InsightsService::new(Arc::new(MockProvider::failing()));
        let report = service.investment_report("JVC", &metrics()).await;

        assert!(report.explanation.starts_with("JVC scores "));
        assert!(report.explanation.contains("/100"));
    }

    fn chart() -> ChartContext {
        ChartContext {
            chart_type: "price_trend".into(),
            context: serde_json::json!({"area": "JVC"}),
            data_summary: serde_json::json!([{"month": "Jan", "avg": 820}]),
            detail_level: "short".into(),
        }
    }

    #[tokio::test]
    async fn snapshot_parses_verdict_and_reason() {
        let service = InsightsService::new(Arc::new(MockProvider::returning(
            "Verdict: Good\nReason: Demand is outpacing new supply.",
        )));
        let snap = service.opportunity_snapshot(&chart()).await;
        assert_eq!(snap.verdict, "Good");
        assert_eq!(snap.reason, "Demand is outpacing new supply.");
    }

    #[tokio::test]
    async fn unstructured_snapshot_output_keeps_neutral_defaults() {
        let service = InsightsService::new(Arc::new(MockProvider::returning(
            "The market looks fine overall.",
        )));
        let snap = service.opportunity_snapshot(&chart()).await;
        assert_eq!(snap, OpportunitySnapshot::default());
        assert_eq!(snap.verdict, "Neutral");
    }

    #[tokio::test]
    async fn snapshot_degrades_to_neutral_on_provider_failure() {
        let service = InsightsService::new(Arc::new(MockProvider::failing()));
        let snap = service.opportunity_snapshot(&chart()).await;
        assert_eq!(snap.verdict, "Neutral");
    }

    #[tokio::test]
    async fn narrative_and_insight_degrade_to_canned_lines() {
        let service = InsightsService::new(Arc::new(MockProvider::failing()));
        assert_eq!(
            service.market_narrative(&chart()).await,
            "No narrative generated."
        );
        assert_eq!(
            service.chart_insight(&chart()).await,
            "No insight generated."
        );
    }

    #[test]
    fn snapshot_serializes_client_field_names() {
        let value = serde_json::to_value(OpportunitySnapshot::default()).unwrap();
        assert_eq!(value["snapshotVerdict"], "Neutral");
        assert!(value["snapshotReason"].is_string());
    }

    #[test]
    fn report_serializes_flat() {
        let score = investment_score(&metrics(), &ScoreWeights::default());
        let report = InsightsReport {
            area: "JVC".into(),
            score,
            explanation: "ok".into(),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert!(value["score"].is_u64());
        assert!(value["label"].is_string());
        assert!(value["drivers"].is_array());
    }
}
