//! Labels for the risk classes produced by the external prediction service.
//!
//! The ensemble class is never reinterpreted: it is kept verbatim and only mapped to a label for
//! display. Anything outside the known domain renders as "Unknown" so that a missing or
//! unexpected class is never shown as low risk.

use serde_json::Value;

/// Which model produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskTarget {
    Pregnancy,
    Fetal,
}

pub const UNKNOWN_RISK_LABEL: &str = "Unknown";

impl RiskTarget {
    /// Label for a known class, or `None` for anything outside 0, 1, 2.
    pub fn label_for_class(self, class: u8) -> Option<&'static str> {
        let label = match (self, class) {
            (RiskTarget::Pregnancy, 0) => "Low",
            (RiskTarget::Pregnancy, 1) => "Medium",
            (RiskTarget::Pregnancy, 2) => "High",
            (RiskTarget::Fetal, 0) => "Normal",
            (RiskTarget::Fetal, 1) => "Suspect",
            (RiskTarget::Fetal, 2) => "Pathological",
            _ => return None,
        };
        Some(label)
    }

    /// Label for a raw ensemble prediction value as returned by the service.
    pub fn label(self, prediction: &Value) -> &'static str {
        prediction_class(prediction)
            .and_then(|class| self.label_for_class(class))
            .unwrap_or(UNKNOWN_RISK_LABEL)
    }
}

/// Extracts an integral class from a JSON number. Strings, fractions and negatives yield `None`.
fn prediction_class(prediction: &Value) -> Option<u8> {
    if let Some(n) = prediction.as_u64() {
        return u8::try_from(n).ok();
    }
    let f = prediction.as_f64()?;
    if f.fract() == 0.0 && (0.0..=f64::from(u8::MAX)).contains(&f) {
        return Some(f as u8);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn known_classes_map_to_labels() {
        assert_eq!(RiskTarget::Pregnancy.label(&json!(0)), "Low");
        assert_eq!(RiskTarget::Pregnancy.label(&json!(1)), "Medium");
        assert_eq!(RiskTarget::Pregnancy.label(&json!(2)), "High");
        assert_eq!(RiskTarget::Fetal.label(&json!(0)), "Normal");
        assert_eq!(RiskTarget::Fetal.label(&json!(1)), "Suspect");
        assert_eq!(RiskTarget::Fetal.label(&json!(2)), "Pathological");
    }

    #[test]
    fn out_of_domain_class_is_unknown() {
        assert_eq!(RiskTarget::Pregnancy.label(&json!(5)), UNKNOWN_RISK_LABEL);
        assert_eq!(RiskTarget::Fetal.label(&json!(5)), UNKNOWN_RISK_LABEL);
        assert_eq!(RiskTarget::Pregnancy.label(&json!(-1)), UNKNOWN_RISK_LABEL);
        assert_eq!(RiskTarget::Pregnancy.label(&json!(1.5)), UNKNOWN_RISK_LABEL);
        assert_eq!(RiskTarget::Pregnancy.label(&json!(1000)), UNKNOWN_RISK_LABEL);
    }

    #[test]
    fn missing_or_non_numeric_class_is_unknown() {
        assert_eq!(RiskTarget::Pregnancy.label(&Value::Null), UNKNOWN_RISK_LABEL);
        assert_eq!(RiskTarget::Fetal.label(&json!("2")), UNKNOWN_RISK_LABEL);
        assert_eq!(RiskTarget::Fetal.label(&json!({})), UNKNOWN_RISK_LABEL);
    }

    #[test]
    fn integral_float_is_accepted() {
        assert_eq!(RiskTarget::Pregnancy.label(&json!(2.0)), "High");
    }
}
