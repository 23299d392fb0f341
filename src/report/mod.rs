//! Reporting utilities: text and JSON renderings of an assessment.

pub mod format;

pub use format::*;

use crate::app::pipeline::AssessmentOutput;
use crate::error::RiskError;

/// JSON rendering of the output contract (`probability`, `predicted_claim`, `tier`, `action`).
pub fn assessment_json(output: &AssessmentOutput) -> Result<String, RiskError> {
    serde_json::to_string_pretty(&output.assessment)
        .map_err(|e| RiskError::Output(format!("Failed to serialize assessment: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RiskAssessment, RiskTier};
    use crate::features::AlignmentReport;

    #[test]
    fn json_exposes_output_contract() {
        let output = AssessmentOutput {
            assessment: RiskAssessment {
                probability: 23.5,
                predicted_claim: 1,
                tier: RiskTier::VeryHigh,
                action: "Manual underwriting review".into(),
            },
            report: AlignmentReport::default(),
        };
        let value: serde_json::Value = serde_json::from_str(&assessment_json(&output).unwrap()).unwrap();
        assert_eq!(value["probability"], 23.5);
        assert_eq!(value["predicted_claim"], 1);
        assert_eq!(value["tier"], "VeryHigh");
        assert_eq!(value["action"], "Manual underwriting review");
    }
}
