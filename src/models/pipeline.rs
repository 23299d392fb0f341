//! Pipeline artifact format and its compiled, inference-ready form.
//!
//! The artifact is a JSON document with two steps:
//! - `prep`: the preprocessing stage (named sub-transformers over input columns)
//! - `clf`: the classifier stage consuming the encoded feature vector
//!
//! Compilation validates the artifact once at load so that inference only
//! has to check the request's table, never the model itself.

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::domain::{AlignedFeatureTable, ColumnKind, ModelSchema, SchemaColumn};
use crate::error::RiskError;

/// Decision threshold applied when the artifact does not declare one.
pub const DEFAULT_DECISION_THRESHOLD: f64 = 0.5;

/// Serialized two-stage pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineArtifact {
    #[serde(default)]
    pub name: Option<String>,
    pub steps: PipelineSteps,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSteps {
    pub prep: PreprocessorSpec,
    pub clf: ClassifierSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessorSpec {
    /// Input columns the preprocessor was fit on, in fit order.
    pub feature_names_in: Vec<String>,
    pub transformers: Vec<TransformerSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformerSpec {
    pub name: String,
    #[serde(flatten)]
    pub step: TransformerStep,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformerStep {
    StandardScaler {
        columns: Vec<String>,
        mean: Vec<f64>,
        scale: Vec<f64>,
    },
    OneHot {
        columns: Vec<String>,
        categories: Vec<Vec<String>>,
        #[serde(default)]
        handle_unknown: HandleUnknown,
    },
    Passthrough {
        columns: Vec<String>,
    },
}

impl TransformerStep {
    pub fn columns(&self) -> &[String] {
        match self {
            TransformerStep::StandardScaler { columns, .. }
            | TransformerStep::OneHot { columns, .. }
            | TransformerStep::Passthrough { columns } => columns,
        }
    }

    /// Column kind this transformer imposes on its inputs.
    pub fn input_kind(&self) -> ColumnKind {
        match self {
            TransformerStep::OneHot { .. } => ColumnKind::Categorical,
            TransformerStep::StandardScaler { .. } | TransformerStep::Passthrough { .. } => {
                ColumnKind::Numeric
            }
        }
    }
}

/// What a one-hot encoder does with a category it was not fit on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleUnknown {
    #[default]
    Ignore,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierSpec {
    LogisticRegression {
        coef: Vec<f64>,
        intercept: f64,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
}

fn default_threshold() -> f64 {
    DEFAULT_DECISION_THRESHOLD
}

/// Sidecar schema descriptor stored next to the artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaFile {
    pub columns: Vec<SchemaColumn>,
}

// -- Compiled form ----------------------------------------------------------

#[derive(Debug, Clone)]
enum Encoder {
    Scale { index: usize, mean: f64, scale: f64 },
    OneHot {
        index: usize,
        column: String,
        categories: Vec<String>,
        handle_unknown: HandleUnknown,
    },
    Passthrough { index: usize },
}

impl Encoder {
    fn width(&self) -> usize {
        match self {
            Encoder::OneHot { categories, .. } => categories.len(),
            Encoder::Scale { .. } | Encoder::Passthrough { .. } => 1,
        }
    }
}

/// Validated preprocessing stage.
///
/// Encoders refer to input columns by their position in `feature_names_in`,
/// which is also the position in any table that passed the schema check.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    feature_names_in: Vec<String>,
    input_kinds: BTreeMap<String, ColumnKind>,
    encoders: Vec<Encoder>,
    width: usize,
}

impl Preprocessor {
    pub fn compile(spec: &PreprocessorSpec) -> Result<Self, String> {
        if spec.feature_names_in.is_empty() {
            return Err("preprocessor declares no input columns".to_string());
        }

        let mut positions = BTreeMap::new();
        for (i, name) in spec.feature_names_in.iter().enumerate() {
            if positions.insert(name.clone(), i).is_some() {
                return Err(format!("duplicate input column '{name}'"));
            }
        }

        let mut input_kinds = BTreeMap::new();
        let mut encoders = Vec::new();

        for transformer in &spec.transformers {
            let index_of = |col: &String| {
                positions.get(col).copied().ok_or_else(|| {
                    format!(
                        "transformer '{}' uses column '{col}' which is not a fitted input",
                        transformer.name
                    )
                })
            };

            for col in transformer.step.columns() {
                if input_kinds
                    .insert(col.clone(), transformer.step.input_kind())
                    .is_some()
                {
                    return Err(format!("column '{col}' is consumed by more than one transformer"));
                }
            }

            match &transformer.step {
                TransformerStep::StandardScaler { columns, mean, scale } => {
                    if mean.len() != columns.len() || scale.len() != columns.len() {
                        return Err(format!(
                            "transformer '{}' has {} columns but {} means and {} scales",
                            transformer.name,
                            columns.len(),
                            mean.len(),
                            scale.len()
                        ));
                    }
                    for ((col, &m), &s) in columns.iter().zip(mean).zip(scale) {
                        if !(m.is_finite() && s.is_finite()) {
                            return Err(format!("non-finite scaling parameters for column '{col}'"));
                        }
                        // A zero scale means the column was constant at fit time.
                        let s = if s == 0.0 { 1.0 } else { s };
                        encoders.push(Encoder::Scale {
                            index: index_of(col)?,
                            mean: m,
                            scale: s,
                        });
                    }
                }
                TransformerStep::OneHot {
                    columns,
                    categories,
                    handle_unknown,
                } => {
                    if categories.len() != columns.len() {
                        return Err(format!(
                            "transformer '{}' has {} columns but {} category lists",
                            transformer.name,
                            columns.len(),
                            categories.len()
                        ));
                    }
                    for (col, cats) in columns.iter().zip(categories) {
                        if cats.is_empty() {
                            return Err(format!("column '{col}' has no fitted categories"));
                        }
                        encoders.push(Encoder::OneHot {
                            index: index_of(col)?,
                            column: col.clone(),
                            categories: cats.clone(),
                            handle_unknown: *handle_unknown,
                        });
                    }
                }
                TransformerStep::Passthrough { columns } => {
                    for col in columns {
                        encoders.push(Encoder::Passthrough { index: index_of(col)? });
                    }
                }
            }
        }

        if let Some(orphan) = spec
            .feature_names_in
            .iter()
            .find(|name| !input_kinds.contains_key(*name))
        {
            return Err(format!("input column '{orphan}' is not handled by any transformer"));
        }

        let width = encoders.iter().map(Encoder::width).sum();

        Ok(Self {
            feature_names_in: spec.feature_names_in.clone(),
            input_kinds,
            encoders,
            width,
        })
    }

    pub fn feature_names_in(&self) -> &[String] {
        &self.feature_names_in
    }

    /// Number of values in the encoded feature vector.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Schema implied by the transformer kinds (one-hot inputs are categorical).
    pub fn derived_schema(&self) -> Result<ModelSchema, String> {
        let columns = self
            .feature_names_in
            .iter()
            .map(|name| {
                let kind = self
                    .input_kinds
                    .get(name)
                    .copied()
                    .unwrap_or(ColumnKind::Numeric);
                SchemaColumn::new(name.clone(), kind)
            })
            .collect();
        ModelSchema::new(columns)
    }

    /// Columns consumed by categorical encoders.
    pub fn categorical_inputs(&self) -> BTreeSet<&str> {
        self.input_kinds
            .iter()
            .filter(|(_, kind)| **kind == ColumnKind::Categorical)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Encode a schema-checked table into the classifier's input vector.
    pub fn encode(&self, table: &AlignedFeatureTable) -> Result<DVector<f64>, RiskError> {
        let values = table.values();
        let mut out = DVector::zeros(self.width);
        let mut offset = 0;

        for encoder in &self.encoders {
            match encoder {
                Encoder::Scale { index, mean, scale } => {
                    out[offset] = (number_at(table, *index)? - mean) / scale;
                }
                Encoder::Passthrough { index } => {
                    out[offset] = number_at(table, *index)?;
                }
                Encoder::OneHot {
                    index,
                    column,
                    categories,
                    handle_unknown,
                } => {
                    let value = values[*index].as_text().ok_or_else(|| {
                        RiskError::Inference(format!("column '{column}' must hold a category"))
                    })?;
                    match categories.iter().position(|c| c == value) {
                        Some(hit) => out[offset + hit] = 1.0,
                        None if *handle_unknown == HandleUnknown::Ignore => {}
                        None => {
                            return Err(RiskError::Inference(format!(
                                "unknown category '{value}' for column '{column}'"
                            )));
                        }
                    }
                }
            }
            offset += encoder.width();
        }

        Ok(out)
    }
}

fn number_at(table: &AlignedFeatureTable, index: usize) -> Result<f64, RiskError> {
    let column = &table.columns()[index];
    let v = table.values()[index]
        .as_number()
        .ok_or_else(|| RiskError::Inference(format!("column '{column}' must hold a number")))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(RiskError::Inference(format!(
            "column '{column}' holds non-finite value {v}"
        )))
    }
}

/// Validated logistic-regression stage.
#[derive(Debug, Clone)]
pub struct LogisticClassifier {
    coef: DVector<f64>,
    intercept: f64,
    threshold: f64,
}

impl LogisticClassifier {
    pub fn compile(spec: &ClassifierSpec, expected_width: usize) -> Result<Self, String> {
        match spec {
            ClassifierSpec::LogisticRegression {
                coef,
                intercept,
                threshold,
            } => {
                if coef.len() != expected_width {
                    return Err(format!(
                        "classifier has {} coefficients but the preprocessor emits {expected_width} features",
                        coef.len()
                    ));
                }
                if !coef.iter().all(|c| c.is_finite()) || !intercept.is_finite() {
                    return Err("classifier has non-finite coefficients".to_string());
                }
                if !(threshold.is_finite() && *threshold > 0.0 && *threshold < 1.0) {
                    return Err(format!("decision threshold {threshold} is outside (0, 1)"));
                }
                Ok(Self {
                    coef: DVector::from_column_slice(coef),
                    intercept: *intercept,
                    threshold: *threshold,
                })
            }
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Probability of the positive class.
    pub fn probability(&self, x: &DVector<f64>) -> f64 {
        sigmoid(self.intercept + self.coef.dot(x))
    }

    /// Hard label: 1 iff the probability exceeds the decision threshold.
    pub fn label(&self, x: &DVector<f64>) -> u8 {
        u8::from(self.probability(x) > self.threshold)
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
