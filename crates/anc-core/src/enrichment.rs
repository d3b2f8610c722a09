//! Normalisation of risk service responses.
//!
//! The risk service answers with several loosely-typed shapes: rules-based alerts and
//! recommendations, ensemble risk classifications and an LLM narrative. [`normalize`] turns a raw
//! response body into explicit [`EnrichmentResult`] variants and [`merge`] folds those variants
//! into the report fields. Absent or mistyped fields default to empty; only a body that is not a
//! JSON object is rejected.

use crate::report::EnrichmentFields;
use crate::risk::RiskTarget;
use anc_api_shared::wire::{RiskAssessment, RiskView};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentResult {
    Rules(RulesResult),
    RiskClass(RiskClassResult),
    Summary(SummaryResult),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RulesResult {
    pub alerts: Vec<String>,
    pub supplement_recommendations: Vec<String>,
    pub dietary_recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskClassResult {
    pub target: RiskTarget,
    /// Kept exactly as received; see [`RiskTarget::label`].
    pub ensemble_prediction: Value,
    pub probabilities: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryResult {
    pub llm_merged_summary: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("risk service response is not a JSON object")]
    NotAnObject,
}

/// Splits an `/analyze` response body into typed results.
///
/// Always yields one `Rules` and one `Summary` result (empty when the fields are missing), plus
/// a `RiskClass` result for each of `pregnancy_risk` / `fetal_risk` that is present.
pub fn normalize(payload: &Value) -> Result<Vec<EnrichmentResult>, NormalizeError> {
    let body = payload.as_object().ok_or(NormalizeError::NotAnObject)?;

    let mut results = vec![
        EnrichmentResult::Rules(RulesResult {
            alerts: string_list(body, "alerts"),
            supplement_recommendations: string_list(body, "supplement_recommendations"),
            dietary_recommendations: string_list(body, "dietary_recommendations"),
        }),
        EnrichmentResult::Summary(SummaryResult {
            llm_merged_summary: body
                .get("llm_merged_summary")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }),
    ];

    for (key, target) in [
        ("pregnancy_risk", RiskTarget::Pregnancy),
        ("fetal_risk", RiskTarget::Fetal),
    ] {
        if let Some(prediction) = body.get(key).and_then(|v| normalize_prediction(target, v)) {
            results.push(prediction);
        }
    }

    Ok(results)
}

/// Reads a `{ EnsemblePrediction, Probabilities }` payload. Returns `None` if it is not an object.
pub fn normalize_prediction(target: RiskTarget, payload: &Value) -> Option<EnrichmentResult> {
    let body = payload.as_object()?;
    Some(EnrichmentResult::RiskClass(RiskClassResult {
        target,
        ensemble_prediction: body.get("EnsemblePrediction").cloned().unwrap_or(Value::Null),
        probabilities: body.get("Probabilities").cloned().unwrap_or(Value::Null),
    }))
}

/// Folds results into the report's enrichment fields.
///
/// Risk classifications do not map onto report fields and are ignored here; see
/// [`risk_assessment`].
pub fn merge(results: &[EnrichmentResult]) -> EnrichmentFields {
    results
        .iter()
        .fold(EnrichmentFields::default(), |mut fields, result| {
            match result {
                EnrichmentResult::Rules(rules) => {
                    fields.alerts.extend(rules.alerts.iter().cloned());
                    fields
                        .recommendations
                        .extend(rules.supplement_recommendations.iter().cloned());
                    fields
                        .dietary_recommendations
                        .extend(rules.dietary_recommendations.iter().cloned());
                }
                EnrichmentResult::Summary(summary) => {
                    if !summary.llm_merged_summary.is_empty() {
                        fields.llm_merged_summary = summary.llm_merged_summary.clone();
                    }
                }
                EnrichmentResult::RiskClass(_) => {}
            }
            fields
        })
}

/// Presentation view of any risk classifications among `results`.
pub fn risk_assessment(results: &[EnrichmentResult]) -> Option<RiskAssessment> {
    let mut assessment = RiskAssessment::default();

    for result in results {
        if let EnrichmentResult::RiskClass(risk) = result {
            let view = RiskView {
                ensemble_prediction: risk.ensemble_prediction.clone(),
                label: risk.target.label(&risk.ensemble_prediction).to_string(),
                probabilities: risk.probabilities.clone(),
            };
            match risk.target {
                RiskTarget::Pregnancy => assessment.pregnancy = Some(view),
                RiskTarget::Fetal => assessment.fetal = Some(view),
            }
        }
    }

    if assessment.pregnancy.is_none() && assessment.fetal.is_none() {
        return None;
    }
    Some(assessment)
}

fn string_list(body: &Map<String, Value>, key: &str) -> Vec<String> {
    match body.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            tracing::warn!(key, kind = %json_kind(other), "ignoring non-array enrichment field");
            Vec::new()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
