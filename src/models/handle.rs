//! Load-once, read-only handle over the claim model.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::domain::{AlignedFeatureTable, CellValue, ColumnKind, ModelSchema};
use crate::error::RiskError;
use crate::models::pipeline::{
    LogisticClassifier, PipelineArtifact, Preprocessor, SchemaFile,
};

/// Where the model's input schema came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    /// A sidecar descriptor validated against the pipeline.
    Sidecar(PathBuf),
    /// Derived from the preprocessor's transformer kinds.
    Derived,
}

/// The loaded preprocessing + classifier pipeline and its input contract.
///
/// Immutable after construction; share it across requests with `Arc`.
#[derive(Debug, Clone)]
pub struct ModelHandle {
    name: String,
    schema: ModelSchema,
    schema_source: SchemaSource,
    preprocessor: Preprocessor,
    classifier: LogisticClassifier,
}

impl ModelHandle {
    /// Load the artifact at `model_path`.
    ///
    /// The schema is read from `schema_path` when given (it must exist), else
    /// from `<stem>.schema.json` next to the artifact if present, else derived
    /// from the pipeline.
    pub fn load(model_path: &Path, schema_path: Option<&Path>) -> Result<Self, RiskError> {
        let text = fs::read_to_string(model_path)
            .map_err(|e| RiskError::model_load(model_path, format!("cannot read artifact: {e}")))?;
        let artifact: PipelineArtifact = serde_json::from_str(&text)
            .map_err(|e| RiskError::model_load(model_path, format!("invalid artifact JSON: {e}")))?;

        let sidecar_path = match schema_path {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let candidate = default_sidecar_path(model_path);
                candidate.is_file().then_some(candidate)
            }
        };

        let sidecar = match &sidecar_path {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .map_err(|e| RiskError::model_load(path, format!("cannot read schema: {e}")))?;
                let file: SchemaFile = serde_json::from_str(&text)
                    .map_err(|e| RiskError::model_load(path, format!("invalid schema JSON: {e}")))?;
                Some((path.clone(), file))
            }
            None => None,
        };

        let handle = Self::from_artifact(artifact, sidecar)
            .map_err(|reason| RiskError::model_load(model_path, reason))?;

        info!(
            model = %handle.name,
            path = %model_path.display(),
            columns = handle.schema.len(),
            categorical = handle.schema.categorical_columns().len(),
            schema = ?handle.schema_source,
            "model loaded"
        );
        Ok(handle)
    }

    /// Build a handle from in-memory JSON (artifact plus optional sidecar schema).
    pub fn from_json_str(model_json: &str, schema_json: Option<&str>) -> Result<Self, RiskError> {
        let source = PathBuf::from("<memory>");
        let artifact: PipelineArtifact = serde_json::from_str(model_json)
            .map_err(|e| RiskError::model_load(&source, format!("invalid artifact JSON: {e}")))?;
        let sidecar = match schema_json {
            Some(json) => {
                let file: SchemaFile = serde_json::from_str(json)
                    .map_err(|e| RiskError::model_load(&source, format!("invalid schema JSON: {e}")))?;
                Some((source.clone(), file))
            }
            None => None,
        };
        Self::from_artifact(artifact, sidecar).map_err(|reason| RiskError::model_load(&source, reason))
    }

    fn from_artifact(
        artifact: PipelineArtifact,
        sidecar: Option<(PathBuf, SchemaFile)>,
    ) -> Result<Self, String> {
        let preprocessor = Preprocessor::compile(&artifact.steps.prep)?;
        let classifier = LogisticClassifier::compile(&artifact.steps.clf, preprocessor.width())?;

        let (schema, schema_source) = match sidecar {
            Some((path, file)) => {
                let schema = ModelSchema::new(file.columns)?;
                check_sidecar(&schema, &preprocessor)?;
                debug!(path = %path.display(), "using sidecar schema");
                (schema, SchemaSource::Sidecar(path))
            }
            None => {
                info!("no sidecar schema found; deriving column kinds from the pipeline");
                (preprocessor.derived_schema()?, SchemaSource::Derived)
            }
        };

        Ok(Self {
            name: artifact.name.unwrap_or_else(|| "unnamed-model".to_string()),
            schema,
            schema_source,
            preprocessor,
            classifier,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    pub fn schema_source(&self) -> &SchemaSource {
        &self.schema_source
    }

    /// Input columns in fit order.
    pub fn expected_columns(&self) -> &[String] {
        self.schema.expected_columns()
    }

    pub fn categorical_columns(&self) -> &BTreeSet<String> {
        self.schema.categorical_columns()
    }

    pub fn decision_threshold(&self) -> f64 {
        self.classifier.threshold()
    }

    /// Probability (0–1) that a claim occurs.
    pub fn predict_proba(&self, table: &AlignedFeatureTable) -> Result<f64, RiskError> {
        self.check_table(table)?;
        let x = self.preprocessor.encode(table)?;
        let p = self.classifier.probability(&x);
        if !p.is_finite() {
            return Err(RiskError::Inference(format!("model produced non-finite probability {p}")));
        }
        Ok(p)
    }

    /// Hard claim label (0 or 1).
    pub fn predict(&self, table: &AlignedFeatureTable) -> Result<u8, RiskError> {
        self.check_table(table)?;
        let x = self.preprocessor.encode(table)?;
        Ok(self.classifier.label(&x))
    }

    fn check_table(&self, table: &AlignedFeatureTable) -> Result<(), RiskError> {
        let expected = self.expected_columns();
        if table.columns() != expected {
            return Err(RiskError::Inference(format!(
                "table columns [{}] do not match model columns [{}]",
                table.columns().join(", "),
                expected.join(", ")
            )));
        }

        for (col, (name, value)) in self.schema.columns().iter().zip(table.cells()) {
            let ok = match (col.kind, value) {
                (ColumnKind::Categorical, CellValue::Text(_)) => true,
                (ColumnKind::Numeric, CellValue::Number(v)) => v.is_finite(),
                _ => false,
            };
            if !ok {
                return Err(RiskError::Inference(format!(
                    "column '{name}' expects a {} value, got {value}",
                    col.kind.label()
                )));
            }
        }
        Ok(())
    }
}

/// `model/claims.json` -> `model/claims.schema.json`.
pub fn default_sidecar_path(model_path: &Path) -> PathBuf {
    let stem = model_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    model_path.with_file_name(format!("{stem}.schema.json"))
}

fn check_sidecar(schema: &ModelSchema, preprocessor: &Preprocessor) -> Result<(), String> {
    if schema.expected_columns() != preprocessor.feature_names_in() {
        return Err(format!(
            "sidecar columns [{}] differ from the fitted columns [{}]",
            schema.expected_columns().join(", "),
            preprocessor.feature_names_in().join(", ")
        ));
    }

    let declared: BTreeSet<&str> = schema
        .categorical_columns()
        .iter()
        .map(String::as_str)
        .collect();
    let fitted = preprocessor.categorical_inputs();
    if declared != fitted {
        let list = |set: &BTreeSet<&str>| set.iter().copied().collect::<Vec<_>>().join(", ");
        return Err(format!(
            "sidecar categorical columns [{}] differ from the encoder's [{}]",
            list(&declared),
            list(&fitted)
        ));
    }
    Ok(())
}
