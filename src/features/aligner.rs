//! Raw attribute record -> aligned, typed single-row table.
//!
//! The aligner never fails. Fields the model needs but the caller did not
//! supply, and numeric fields that do not parse, are filled from the
//! `ImputationPolicy`. Every fill is reported, logged and counted so that
//! drift between the form and the model schema shows up operationally.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{
    AlignedFeatureTable, AttributeValue, CellValue, ColumnKind, ModelSchema, RawAttributeRecord,
};
use crate::features::counters::DataQualityCounters;

/// Sentinel used for categorical columns the caller did not supply.
pub const DEFAULT_CATEGORICAL_FILL: &str = "No";

/// Value used for numeric columns that are missing or unusable.
pub const DEFAULT_NUMERIC_FILL: f64 = 0.0;

/// Fill values for missing and non-coercible inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct ImputationPolicy {
    pub categorical_default: String,
    pub numeric_default: f64,
}

impl Default for ImputationPolicy {
    fn default() -> Self {
        Self {
            categorical_default: DEFAULT_CATEGORICAL_FILL.to_string(),
            numeric_default: DEFAULT_NUMERIC_FILL,
        }
    }
}

/// Why a default was used for a column.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultReason {
    /// The raw record did not contain the column.
    Missing,
    /// The value could not be read as a number.
    NotNumeric(String),
    /// The value was a number, but NaN or infinite.
    NonFinite,
}

impl fmt::Display for DefaultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultReason::Missing => write!(f, "missing"),
            DefaultReason::NotNumeric(raw) => write!(f, "not numeric ({raw:?})"),
            DefaultReason::NonFinite => write!(f, "non-finite"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefaultEvent {
    pub column: String,
    pub reason: DefaultReason,
}

/// What the aligner had to paper over for one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignmentReport {
    pub defaults: Vec<DefaultEvent>,
    /// Raw fields the model does not know about.
    pub dropped: Vec<String>,
}

impl AlignmentReport {
    pub fn is_clean(&self) -> bool {
        self.defaults.is_empty()
    }

    pub fn defaulted_columns(&self) -> Vec<String> {
        self.defaults.iter().map(|e| e.column.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub table: AlignedFeatureTable,
    pub report: AlignmentReport,
}

#[derive(Debug, Clone)]
pub struct FeatureAligner {
    policy: ImputationPolicy,
    counters: Arc<DataQualityCounters>,
}

impl Default for FeatureAligner {
    fn default() -> Self {
        Self::new(ImputationPolicy::default(), Arc::new(DataQualityCounters::default()))
    }
}

impl FeatureAligner {
    pub fn new(policy: ImputationPolicy, counters: Arc<DataQualityCounters>) -> Self {
        Self { policy, counters }
    }

    pub fn policy(&self) -> &ImputationPolicy {
        &self.policy
    }

    pub fn counters(&self) -> &Arc<DataQualityCounters> {
        &self.counters
    }

    /// Build the table the model expects from whatever the caller supplied,
    /// logging and counting every default applied.
    pub fn align(&self, record: &RawAttributeRecord, schema: &ModelSchema) -> Alignment {
        let alignment = self.prepare(record, schema);
        self.observe(&alignment.report);
        alignment
    }

    /// Same table as [`FeatureAligner::align`] with no logging or counting.
    ///
    /// Callers that may still refuse the request use this and call
    /// [`FeatureAligner::observe`] once the defaults are actually going to be used.
    pub fn prepare(&self, record: &RawAttributeRecord, schema: &ModelSchema) -> Alignment {
        let mut report = AlignmentReport::default();
        let mut cells = Vec::with_capacity(schema.len());

        for column in schema.columns() {
            let name = column.name.as_str();
            let cell = match (record.get(name), column.kind) {
                (None, ColumnKind::Categorical) => {
                    report.defaults.push(DefaultEvent {
                        column: name.to_string(),
                        reason: DefaultReason::Missing,
                    });
                    CellValue::Text(self.policy.categorical_default.clone())
                }
                (None, ColumnKind::Numeric) => {
                    report.defaults.push(DefaultEvent {
                        column: name.to_string(),
                        reason: DefaultReason::Missing,
                    });
                    CellValue::Number(self.policy.numeric_default)
                }
                (Some(value), ColumnKind::Categorical) => CellValue::Text(categorical_text(value)),
                (Some(value), ColumnKind::Numeric) => match numeric_value(value) {
                    Ok(v) => CellValue::Number(v),
                    Err(reason) => {
                        report.defaults.push(DefaultEvent {
                            column: name.to_string(),
                            reason,
                        });
                        CellValue::Number(self.policy.numeric_default)
                    }
                },
            };
            cells.push((column.name.clone(), cell));
        }

        for (name, _) in record.iter() {
            if schema.kind_of(name).is_none() {
                report.dropped.push(name.to_string());
            }
        }

        Alignment {
            table: AlignedFeatureTable::from_cells(cells),
            report,
        }
    }

    pub fn observe(&self, report: &AlignmentReport) {
        for event in &report.defaults {
            warn!(
                column = %event.column,
                reason = %event.reason,
                "input default applied; form and model schema may have drifted"
            );
            match event.reason {
                DefaultReason::Missing => self.counters.record_missing(),
                DefaultReason::NotNumeric(_) | DefaultReason::NonFinite => {
                    self.counters.record_coercion_fallback()
                }
            }
        }
        if !report.dropped.is_empty() {
            debug!(fields = ?report.dropped, "ignoring fields the model does not use");
            self.counters.record_dropped(report.dropped.len());
        }
        self.counters.record_alignment();
    }
}

/// String form of a value for a categorical column.
///
/// Floats keep a fractional part (`1.0` -> `"1.0"`) so that integer and float
/// inputs stay distinguishable, matching how the categories were fit.
pub fn categorical_text(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Text(v) => v.clone(),
        AttributeValue::Integer(v) => v.to_string(),
        AttributeValue::Float(v) => float_text(*v),
    }
}

fn float_text(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v.is_infinite() {
        let text = if v > 0.0 { "inf" } else { "-inf" };
        text.to_string()
    } else if v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

fn numeric_value(value: &AttributeValue) -> Result<f64, DefaultReason> {
    let v = match value {
        AttributeValue::Integer(v) => *v as f64,
        AttributeValue::Float(v) => *v,
        AttributeValue::Text(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| DefaultReason::NotNumeric(raw.clone()))?,
    };
    if v.is_finite() {
        Ok(v)
    } else {
        Err(DefaultReason::NonFinite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PolicyInput, SchemaColumn};

    fn schema(cols: &[(&str, ColumnKind)]) -> ModelSchema {
        ModelSchema::new(
            cols.iter()
                .map(|(name, kind)| SchemaColumn::new(*name, *kind))
                .collect(),
        )
        .unwrap()
    }

    fn nine_field_record() -> RawAttributeRecord {
        RawAttributeRecord::new()
            .with("policy_tenure", 1.0)
            .with("age_of_car", 3i64)
            .with("age_of_policyholder", 35i64)
            .with("area_cluster", "A")
            .with("segment", "A")
            .with("fuel_type", "Petrol")
            .with("population_density", 5000i64)
            .with("make", 1i64)
            .with("ncap_rating", 3i64)
    }

    #[test]
    fn output_follows_schema_order_for_any_schema() {
        use ColumnKind::*;
        let record = nine_field_record();
        let orders: [&[(&str, ColumnKind)]; 3] = [
            &[("make", Categorical), ("age_of_car", Numeric)],
            &[("zeta", Numeric), ("alpha", Categorical), ("policy_tenure", Numeric)],
            &[("ncap_rating", Categorical)],
        ];
        let aligner = FeatureAligner::default();
        for cols in orders {
            let schema = schema(cols);
            let out = aligner.align(&record, &schema);
            assert_eq!(out.table.columns(), schema.expected_columns());
        }
    }

    #[test]
    fn missing_columns_take_policy_defaults() {
        let schema = schema(&[
            ("region_code", ColumnKind::Categorical),
            ("airbags", ColumnKind::Numeric),
        ]);
        let out = FeatureAligner::default().align(&RawAttributeRecord::new(), &schema);
        assert_eq!(out.table.get("region_code"), Some(&CellValue::Text("No".into())));
        assert_eq!(out.table.get("airbags"), Some(&CellValue::Number(0.0)));
        assert_eq!(out.report.defaulted_columns(), ["region_code", "airbags"]);
        assert!(out.report.defaults.iter().all(|e| e.reason == DefaultReason::Missing));
    }

    #[test]
    fn non_numeric_values_fall_back_to_zero() {
        let schema = schema(&[("age_of_car", ColumnKind::Numeric), ("airbags", ColumnKind::Numeric)]);
        let record = RawAttributeRecord::new()
            .with("age_of_car", "three")
            .with("airbags", f64::NAN);
        let out = FeatureAligner::default().align(&record, &schema);
        assert_eq!(out.table.get("age_of_car"), Some(&CellValue::Number(0.0)));
        assert_eq!(out.table.get("airbags"), Some(&CellValue::Number(0.0)));
        assert_eq!(
            out.report.defaults[0].reason,
            DefaultReason::NotNumeric("three".into())
        );
        assert_eq!(out.report.defaults[1].reason, DefaultReason::NonFinite);
    }

    #[test]
    fn numeric_text_is_parsed() {
        let schema = schema(&[("population_density", ColumnKind::Numeric)]);
        let record = RawAttributeRecord::new().with("population_density", " 5000 ");
        let out = FeatureAligner::default().align(&record, &schema);
        assert_eq!(out.table.get("population_density"), Some(&CellValue::Number(5000.0)));
        assert!(out.report.is_clean());
    }

    #[test]
    fn categorical_values_become_strings() {
        let schema = schema(&[
            ("make", ColumnKind::Categorical),
            ("ratio", ColumnKind::Categorical),
            ("whole", ColumnKind::Categorical),
        ]);
        let record = RawAttributeRecord::new()
            .with("make", 2i64)
            .with("ratio", 2.5)
            .with("whole", 1.0);
        let out = FeatureAligner::default().align(&record, &schema);
        assert_eq!(out.table.get("make"), Some(&CellValue::Text("2".into())));
        assert_eq!(out.table.get("ratio"), Some(&CellValue::Text("2.5".into())));
        assert_eq!(out.table.get("whole"), Some(&CellValue::Text("1.0".into())));
    }

    #[test]
    fn unknown_fields_are_dropped_and_reported() {
        let schema = schema(&[("age_of_car", ColumnKind::Numeric)]);
        let out = FeatureAligner::default().align(&nine_field_record(), &schema);
        assert_eq!(out.table.len(), 1);
        assert_eq!(out.report.dropped.len(), 8);
        assert!(!out.report.dropped.contains(&"age_of_car".to_string()));
    }

    #[test]
    fn custom_policy_changes_fill_values() {
        let policy = ImputationPolicy {
            categorical_default: "Unknown".into(),
            numeric_default: -1.0,
        };
        let aligner = FeatureAligner::new(policy, Arc::new(DataQualityCounters::default()));
        let schema = schema(&[("is_esc", ColumnKind::Categorical), ("airbags", ColumnKind::Numeric)]);
        let out = aligner.align(&RawAttributeRecord::new(), &schema);
        assert_eq!(out.table.get("is_esc"), Some(&CellValue::Text("Unknown".into())));
        assert_eq!(out.table.get("airbags"), Some(&CellValue::Number(-1.0)));
    }

    #[test]
    fn counters_track_defaults() {
        let counters = Arc::new(DataQualityCounters::default());
        let aligner = FeatureAligner::new(ImputationPolicy::default(), counters.clone());
        let schema = schema(&[
            ("airbags", ColumnKind::Numeric),
            ("age_of_car", ColumnKind::Numeric),
        ]);
        let record = RawAttributeRecord::new().with("age_of_car", "old").with("extra", 1i64);
        aligner.align(&record, &schema);
        aligner.align(&record, &schema);

        let snap = counters.snapshot();
        assert_eq!(snap.alignments, 2);
        assert_eq!(snap.missing_filled, 2);
        assert_eq!(snap.coercion_fallbacks, 2);
        assert_eq!(snap.dropped_fields, 2);
    }

    #[test]
    fn prepare_counts_nothing_until_observed() {
        let counters = Arc::new(DataQualityCounters::default());
        let aligner = FeatureAligner::new(ImputationPolicy::default(), counters.clone());
        let schema = schema(&[("airbags", ColumnKind::Numeric)]);
        let out = aligner.prepare(&RawAttributeRecord::new(), &schema);
        assert_eq!(out.report.defaulted_columns(), ["airbags"]);
        assert_eq!(counters.snapshot(), crate::features::DataQualitySnapshot::default());

        aligner.observe(&out.report);
        assert_eq!(counters.snapshot().missing_filled, 1);
        assert_eq!(counters.snapshot().alignments, 1);
    }

    #[test]
    fn nine_field_scenario_against_wider_schema() {
        use ColumnKind::*;
        let schema = schema(&[
            ("area_cluster", Categorical),
            ("policy_tenure", Numeric),
            ("region_code", Categorical),
            ("age_of_car", Numeric),
            ("segment", Categorical),
            ("age_of_policyholder", Numeric),
            ("fuel_type", Categorical),
            ("airbags", Numeric),
            ("population_density", Numeric),
            ("make", Categorical),
            ("ncap_rating", Categorical),
        ]);
        let record = PolicyInput {
            ncap_rating: crate::domain::NcapRating::Three,
            ..PolicyInput::default()
        }
        .to_record()
        .unwrap();
        assert_eq!(record, nine_field_record());

        let out = FeatureAligner::default().align(&record, &schema);
        assert_eq!(out.table.columns(), schema.expected_columns());

        let expected = [
            ("area_cluster", CellValue::Text("A".into())),
            ("policy_tenure", CellValue::Number(1.0)),
            ("region_code", CellValue::Text("No".into())),
            ("age_of_car", CellValue::Number(3.0)),
            ("segment", CellValue::Text("A".into())),
            ("age_of_policyholder", CellValue::Number(35.0)),
            ("fuel_type", CellValue::Text("Petrol".into())),
            ("airbags", CellValue::Number(0.0)),
            ("population_density", CellValue::Number(5000.0)),
            ("make", CellValue::Text("1".into())),
            ("ncap_rating", CellValue::Text("3".into())),
        ];
        for ((name, cell), (want_name, want_cell)) in out.table.cells().zip(expected.iter()) {
            assert_eq!(name, *want_name);
            assert_eq!(cell, want_cell);
        }
        assert_eq!(out.report.defaulted_columns(), ["region_code", "airbags"]);
    }
}
