//! One inference call: align, score, label.

use tracing::{debug, warn};

use crate::domain::{AssessmentResult, RawAttributeRecord};
use crate::error::RiskError;
use crate::features::{Alignment, AlignmentReport, FeatureAligner};
use crate::models::ModelHandle;

/// Classifier output plus what the aligner had to fill in to get there.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub result: AssessmentResult,
    pub report: AlignmentReport,
}

#[derive(Debug, Clone, Default)]
pub struct RiskClassifier {
    aligner: FeatureAligner,
    /// Refuse to impute instead of silently filling defaults.
    strict: bool,
}

impl RiskClassifier {
    pub fn new(aligner: FeatureAligner, strict: bool) -> Self {
        Self { aligner, strict }
    }

    pub fn aligner(&self) -> &FeatureAligner {
        &self.aligner
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Score one record. Inference errors are returned unchanged.
    pub fn classify(
        &self,
        record: &RawAttributeRecord,
        model: &ModelHandle,
    ) -> Result<Classification, RiskError> {
        let Alignment { table, report } = self.aligner.prepare(record, model.schema());

        if self.strict && !report.is_clean() {
            let columns = report.defaulted_columns();
            warn!(?columns, "strict mode refused a request that needed defaults");
            self.aligner.counters().record_strict_rejection();
            return Err(RiskError::MissingInputs(columns));
        }
        self.aligner.observe(&report);

        let proba = model.predict_proba(&table)?;
        let predicted_claim = model.predict(&table)?;
        let probability = (proba * 100.0).clamp(0.0, 100.0);

        debug!(probability, predicted_claim, defaults = report.defaults.len(), "classified");

        Ok(Classification {
            result: AssessmentResult {
                probability,
                predicted_claim,
            },
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::domain::{FuelType, NcapRating, PolicyInput};
    use crate::models::fixtures;

    fn record() -> RawAttributeRecord {
        PolicyInput {
            ncap_rating: NcapRating::Three,
            ..PolicyInput::default()
        }
        .to_record()
        .unwrap()
    }

    #[test]
    fn probability_is_a_percentage() {
        let model = fixtures::handle();
        let out = RiskClassifier::default().classify(&record(), &model).unwrap();
        assert!((0.0..=100.0).contains(&out.result.probability));
        assert!(out.result.predicted_claim <= 1);
        assert_eq!(out.report.defaulted_columns(), ["region_code", "airbags"]);
    }

    #[test]
    fn repeated_calls_are_bit_identical() {
        let model = fixtures::handle();
        let classifier = RiskClassifier::default();
        let a = classifier.classify(&record(), &model).unwrap();
        let b = classifier.classify(&record(), &model).unwrap();
        assert_eq!(a.result.probability.to_bits(), b.result.probability.to_bits());
        assert_eq!(a, b);
    }

    #[test]
    fn different_inputs_move_the_score() {
        let model = fixtures::handle();
        let classifier = RiskClassifier::default();
        let base = classifier.classify(&record(), &model).unwrap();
        let diesel = PolicyInput {
            fuel_type: FuelType::Diesel,
            policy_tenure: 10.0,
            ..PolicyInput::default()
        }
        .to_record()
        .unwrap();
        let other = classifier.classify(&diesel, &model).unwrap();
        assert_ne!(base.result.probability, other.result.probability);
    }

    #[test]
    fn strict_mode_rejects_imputation() {
        let model = fixtures::handle();
        let strict = RiskClassifier::new(FeatureAligner::default(), true);
        let err = strict.classify(&record(), &model).unwrap_err();
        assert_eq!(
            err,
            RiskError::MissingInputs(vec!["region_code".into(), "airbags".into()])
        );

        let complete = record().with("region_code", "R1").with("airbags", 6i64);
        assert!(strict.classify(&complete, &model).is_ok());
    }

    #[test]
    fn strict_rejection_is_not_counted_as_imputation() {
        let model = fixtures::handle();
        let strict = RiskClassifier::new(FeatureAligner::default(), true);
        assert!(strict.classify(&record(), &model).is_err());

        let snap = strict.aligner().counters().snapshot();
        assert_eq!(snap.strict_rejections, 1);
        assert_eq!(snap.defaults(), 0);
        assert_eq!(snap.alignments, 0);
    }

    #[test]
    fn inference_errors_pass_through_unchanged() {
        // `region_code` rejects unseen categories, so the "No" fill cannot encode.
        let json = fixtures::MODEL_JSON.replacen(
            r#"["R1", "R2"]
                     ]}"#,
            r#"["R1", "R2"]
                     ], "handle_unknown": "error"}"#,
            1,
        );
        assert_ne!(json, fixtures::MODEL_JSON);
        let model = ModelHandle::from_json_str(&json, None).unwrap();

        let err = RiskClassifier::default().classify(&record(), &model).unwrap_err();
        assert!(matches!(err, RiskError::Inference(_)), "{err:?}");
        assert_eq!(err.exit_code(), 4);

        let known = record().with("region_code", "R2");
        assert!(RiskClassifier::default().classify(&known, &model).is_ok());
    }

    #[test]
    fn shared_model_serves_concurrent_requests() {
        let model = Arc::new(fixtures::handle());
        let classifier = Arc::new(RiskClassifier::default());
        let expected = classifier.classify(&record(), &model).unwrap().result;

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let model = Arc::clone(&model);
                let classifier = Arc::clone(&classifier);
                thread::spawn(move || classifier.classify(&record(), &model).unwrap().result)
            })
            .collect();

        for worker in workers {
            assert_eq!(worker.join().unwrap(), expected);
        }
    }
}
