//! Shared assessment pipeline used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! input -> alignment -> inference -> risk policy
//!
//! The front ends then only deal with presentation (printing vs widgets).

use std::sync::Arc;

use tracing::info;

use crate::classify::RiskClassifier;
use crate::config::Settings;
use crate::domain::{PolicyInput, RawAttributeRecord, RiskAssessment};
use crate::error::RiskError;
use crate::features::{AlignmentReport, DataQualityCounters, FeatureAligner};
use crate::models::ModelHandle;
use crate::policy::RiskPolicy;

/// All outputs of a single assessment.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentOutput {
    pub assessment: RiskAssessment,
    pub report: AlignmentReport,
}

/// A loaded model plus the classifier and policy that use it.
///
/// Constructed once at startup and handed to whichever front end runs.
#[derive(Debug, Clone)]
pub struct Engine {
    model: Arc<ModelHandle>,
    classifier: RiskClassifier,
    policy: RiskPolicy,
}

impl Engine {
    pub fn new(model: Arc<ModelHandle>, classifier: RiskClassifier, policy: RiskPolicy) -> Self {
        Self {
            model,
            classifier,
            policy,
        }
    }

    /// Load the model named by `settings` and wire up the pipeline.
    pub fn from_settings(settings: &Settings) -> Result<Self, RiskError> {
        let model = ModelHandle::load(&settings.model_path, settings.schema_path.as_deref())?;
        let aligner = FeatureAligner::new(
            settings.imputation.clone(),
            Arc::new(DataQualityCounters::default()),
        );
        Ok(Self::new(
            Arc::new(model),
            RiskClassifier::new(aligner, settings.strict),
            RiskPolicy::new(settings.thresholds),
        ))
    }

    pub fn model(&self) -> &Arc<ModelHandle> {
        &self.model
    }

    pub fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    pub fn is_strict(&self) -> bool {
        self.classifier.is_strict()
    }

    pub fn counters(&self) -> &Arc<DataQualityCounters> {
        self.classifier.aligner().counters()
    }

    pub fn assess(&self, input: &PolicyInput) -> Result<AssessmentOutput, RiskError> {
        let record = input.to_record()?;
        self.assess_record(&record)
    }

    /// Assess an arbitrary raw record (may carry fields beyond the form).
    pub fn assess_record(&self, record: &RawAttributeRecord) -> Result<AssessmentOutput, RiskError> {
        let classification = self.classifier.classify(record, &self.model)?;
        let result = classification.result;
        let decision = self.policy.decide(result.probability);
        let session = self.counters().snapshot();

        info!(
            probability = result.probability,
            predicted_claim = result.predicted_claim,
            tier = ?decision.tier,
            defaults = classification.report.defaults.len(),
            session_defaults = session.defaults(),
            session_assessments = session.alignments,
            "assessment complete"
        );

        Ok(AssessmentOutput {
            assessment: RiskAssessment {
                probability: result.probability,
                predicted_claim: result.predicted_claim,
                tier: decision.tier,
                action: decision.action.to_string(),
            },
            report: classification.report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RiskTier;
    use crate::models::fixtures;

    fn engine() -> Engine {
        Engine::new(
            Arc::new(fixtures::handle()),
            RiskClassifier::default(),
            RiskPolicy::default(),
        )
    }

    #[test]
    fn assessment_action_matches_tier() {
        let out = engine().assess(&PolicyInput::default()).unwrap();
        let a = &out.assessment;
        assert_eq!(a.tier, RiskPolicy::default().tier_for(a.probability));
        assert_eq!(a.action, a.tier.action());
    }

    #[test]
    fn invalid_input_never_reaches_the_model() {
        let input = PolicyInput {
            population_density: 10,
            ..PolicyInput::default()
        };
        let engine = engine();
        assert!(matches!(engine.assess(&input), Err(RiskError::InvalidInput(_))));
        assert_eq!(engine.counters().snapshot().alignments, 0);
    }

    #[test]
    fn tight_thresholds_push_every_score_up_a_tier() {
        let engine = Engine::new(
            Arc::new(fixtures::handle()),
            RiskClassifier::default(),
            RiskPolicy::new(crate::policy::TierThresholds::new(0.001, 0.002, 0.003).unwrap()),
        );
        let out = engine.assess(&PolicyInput::default()).unwrap();
        assert_eq!(out.assessment.tier, RiskTier::VeryHigh);
    }

    #[test]
    fn extra_fields_flow_through_assess_record() {
        let engine = engine();
        let record = PolicyInput::default()
            .to_record()
            .unwrap()
            .with("region_code", "R2")
            .with("airbags", 6i64);
        let out = engine.assess_record(&record).unwrap();
        assert!(out.report.is_clean());
        assert!(out.report.dropped.is_empty());
    }

    #[test]
    fn from_settings_surfaces_load_errors() {
        let settings = Settings {
            model_path: "/nonexistent/model.json".into(),
            ..Settings::default()
        };
        let err = Engine::from_settings(&settings).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
