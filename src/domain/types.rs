//! Shared domain types.
//!
//! These types are kept small and serializable so they can be:
//!
//! - passed by value from the front ends into the core pipeline
//! - printed as JSON by `claim-risk assess --json`
//! - built directly in tests without a model artifact

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::RiskError;

/// A scalar attribute value as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl AttributeValue {
    /// Interpret free text the way a form field would: integer, then float, else text.
    pub fn parse_loose(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(v) = trimmed.parse::<i64>() {
            return AttributeValue::Integer(v);
        }
        if let Ok(v) = trimmed.parse::<f64>() {
            return AttributeValue::Float(v);
        }
        AttributeValue::Text(trimmed.to_string())
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Integer(v) => write!(f, "{v}"),
            AttributeValue::Float(v) => write!(f, "{v}"),
            AttributeValue::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        AttributeValue::Integer(i64::from(value))
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

/// Raw attributes for one assessment.
///
/// A best-effort subset of what the model needs; the model schema decides
/// which fields are used and how they are typed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawAttributeRecord {
    fields: BTreeMap<String, AttributeValue>,
}

impl RawAttributeRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// How a model column must be typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Categorical,
    Numeric,
}

impl ColumnKind {
    pub fn label(self) -> &'static str {
        match self {
            ColumnKind::Categorical => "categorical",
            ColumnKind::Numeric => "numeric",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaColumn {
    pub name: String,
    pub kind: ColumnKind,
}

impl SchemaColumn {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// The model's input contract: ordered columns plus their kinds.
///
/// The expected-column list and the categorical set are computed once here
/// and never recomputed per request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSchema {
    columns: Vec<SchemaColumn>,
    names: Vec<String>,
    categorical: BTreeSet<String>,
}

impl ModelSchema {
    /// Build a schema, rejecting empty schemas and duplicate column names.
    pub fn new(columns: Vec<SchemaColumn>) -> Result<Self, String> {
        if columns.is_empty() {
            return Err("schema has no columns".to_string());
        }

        let mut seen = BTreeSet::new();
        for col in &columns {
            if col.name.trim().is_empty() {
                return Err("schema contains an empty column name".to_string());
            }
            if !seen.insert(col.name.as_str()) {
                return Err(format!("duplicate column '{}'", col.name));
            }
        }

        let names = columns.iter().map(|c| c.name.clone()).collect();
        let categorical = columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Categorical)
            .map(|c| c.name.clone())
            .collect();

        Ok(Self {
            columns,
            names,
            categorical,
        })
    }

    pub fn columns(&self) -> &[SchemaColumn] {
        &self.columns
    }

    pub fn expected_columns(&self) -> &[String] {
        &self.names
    }

    pub fn categorical_columns(&self) -> &BTreeSet<String> {
        &self.categorical
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.kind)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A typed cell of an aligned table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

impl CellValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(v) => Some(v),
            CellValue::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            CellValue::Text(_) => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(v) => write!(f, "{v:?}"),
            CellValue::Number(v) => write!(f, "{v}"),
        }
    }
}

/// A single inference-ready row.
///
/// Built fresh for each request and dropped after inference.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedFeatureTable {
    columns: Vec<String>,
    values: Vec<CellValue>,
}

impl AlignedFeatureTable {
    pub fn from_cells(cells: Vec<(String, CellValue)>) -> Self {
        let (columns, values) = cells.into_iter().unzip();
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<&CellValue> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|i| &self.values[i])
    }

    pub fn cells(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Normalized classifier output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AssessmentResult {
    /// Probability of a claim, on a 0–100 scale.
    pub probability: f64,
    /// Hard label under the model's decision threshold (0 or 1).
    pub predicted_claim: u8,
}

/// Ordered claim-risk buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl RiskTier {
    pub const ALL: [RiskTier; 4] = [
        RiskTier::Low,
        RiskTier::Moderate,
        RiskTier::High,
        RiskTier::VeryHigh,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            RiskTier::Low => "Low Risk",
            RiskTier::Moderate => "Moderate Risk",
            RiskTier::High => "High Risk",
            RiskTier::VeryHigh => "Very High Risk",
        }
    }

    /// The underwriting action bound to this tier.
    pub fn action(self) -> &'static str {
        match self {
            RiskTier::Low => "Standard premium",
            RiskTier::Moderate => "Monitor customer",
            RiskTier::High => "Higher premium",
            RiskTier::VeryHigh => "Manual underwriting review",
        }
    }
}

/// Everything a front end displays for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub probability: f64,
    pub predicted_claim: u8,
    pub tier: RiskTier,
    pub action: String,
}

// -- Input contract ---------------------------------------------------------

pub const POLICY_TENURE_RANGE: (f64, f64) = (0.0, 30.0);
pub const AGE_OF_CAR_RANGE: (u32, u32) = (0, 20);
pub const AGE_OF_POLICYHOLDER_RANGE: (u32, u32) = (18, 90);
pub const POPULATION_DENSITY_RANGE: (u32, u32) = (500, 50_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum AreaCluster {
    A,
    B,
    C,
    D,
}

impl AreaCluster {
    pub const ALL: [AreaCluster; 4] = [AreaCluster::A, AreaCluster::B, AreaCluster::C, AreaCluster::D];

    pub fn code(self) -> &'static str {
        match self {
            AreaCluster::A => "A",
            AreaCluster::B => "B",
            AreaCluster::C => "C",
            AreaCluster::D => "D",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Segment {
    A,
    B,
    C,
}

impl Segment {
    pub const ALL: [Segment; 3] = [Segment::A, Segment::B, Segment::C];

    pub fn code(self) -> &'static str {
        match self {
            Segment::A => "A",
            Segment::B => "B",
            Segment::C => "C",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum FuelType {
    #[value(name = "Petrol", alias = "petrol")]
    Petrol,
    #[value(name = "Diesel", alias = "diesel")]
    Diesel,
    #[value(name = "CNG", alias = "cng")]
    Cng,
}

impl FuelType {
    pub const ALL: [FuelType; 3] = [FuelType::Petrol, FuelType::Diesel, FuelType::Cng];

    pub fn code(self) -> &'static str {
        match self {
            FuelType::Petrol => "Petrol",
            FuelType::Diesel => "Diesel",
            FuelType::Cng => "CNG",
        }
    }
}

/// Vehicle make, encoded as an integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum VehicleMake {
    #[value(name = "1")]
    Make1,
    #[value(name = "2")]
    Make2,
    #[value(name = "3")]
    Make3,
}

impl VehicleMake {
    pub const ALL: [VehicleMake; 3] = [VehicleMake::Make1, VehicleMake::Make2, VehicleMake::Make3];

    pub fn code(self) -> i64 {
        match self {
            VehicleMake::Make1 => 1,
            VehicleMake::Make2 => 2,
            VehicleMake::Make3 => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum NcapRating {
    #[value(name = "0")]
    Zero,
    #[value(name = "1")]
    One,
    #[value(name = "2")]
    Two,
    #[value(name = "3")]
    Three,
    #[value(name = "4")]
    Four,
    #[value(name = "5")]
    Five,
}

impl NcapRating {
    pub const ALL: [NcapRating; 6] = [
        NcapRating::Zero,
        NcapRating::One,
        NcapRating::Two,
        NcapRating::Three,
        NcapRating::Four,
        NcapRating::Five,
    ];

    pub fn stars(self) -> i64 {
        match self {
            NcapRating::Zero => 0,
            NcapRating::One => 1,
            NcapRating::Two => 2,
            NcapRating::Three => 3,
            NcapRating::Four => 4,
            NcapRating::Five => 5,
        }
    }
}

/// The policy attributes collected by a front end, passed by value into the core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyInput {
    pub policy_tenure: f64,
    pub age_of_car: u32,
    pub age_of_policyholder: u32,
    pub area_cluster: AreaCluster,
    pub segment: Segment,
    pub fuel_type: FuelType,
    pub population_density: u32,
    pub make: VehicleMake,
    pub ncap_rating: NcapRating,
}

impl Default for PolicyInput {
    fn default() -> Self {
        Self {
            policy_tenure: 1.0,
            age_of_car: 3,
            age_of_policyholder: 35,
            area_cluster: AreaCluster::A,
            segment: Segment::A,
            fuel_type: FuelType::Petrol,
            population_density: 5000,
            make: VehicleMake::Make1,
            ncap_rating: NcapRating::Zero,
        }
    }
}

impl PolicyInput {
    /// Record keys produced by [`PolicyInput::to_record`].
    pub const FIELD_NAMES: [&'static str; 9] = [
        "policy_tenure",
        "age_of_car",
        "age_of_policyholder",
        "area_cluster",
        "segment",
        "fuel_type",
        "population_density",
        "make",
        "ncap_rating",
    ];

    /// Check the numeric fields against their allowed ranges.
    pub fn validate(&self) -> Result<(), RiskError> {
        let (lo, hi) = POLICY_TENURE_RANGE;
        if !(self.policy_tenure.is_finite() && (lo..=hi).contains(&self.policy_tenure)) {
            return Err(RiskError::InvalidInput(format!(
                "policy_tenure must be within [{lo}, {hi}], got {}",
                self.policy_tenure
            )));
        }
        check_range("age_of_car", self.age_of_car, AGE_OF_CAR_RANGE)?;
        check_range("age_of_policyholder", self.age_of_policyholder, AGE_OF_POLICYHOLDER_RANGE)?;
        check_range("population_density", self.population_density, POPULATION_DENSITY_RANGE)?;
        Ok(())
    }

    /// Validate and convert into the raw record consumed by the aligner.
    pub fn to_record(&self) -> Result<RawAttributeRecord, RiskError> {
        self.validate()?;
        Ok(RawAttributeRecord::new()
            .with("policy_tenure", self.policy_tenure)
            .with("age_of_car", self.age_of_car)
            .with("age_of_policyholder", self.age_of_policyholder)
            .with("area_cluster", self.area_cluster.code())
            .with("segment", self.segment.code())
            .with("fuel_type", self.fuel_type.code())
            .with("population_density", self.population_density)
            .with("make", self.make.code())
            .with("ncap_rating", self.ncap_rating.stars()))
    }
}

fn check_range(field: &str, value: u32, (lo, hi): (u32, u32)) -> Result<(), RiskError> {
    if (lo..=hi).contains(&value) {
        Ok(())
    } else {
        Err(RiskError::InvalidInput(format!(
            "{field} must be within [{lo}, {hi}], got {value}"
        )))
    }
}
