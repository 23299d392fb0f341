//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw caller input (`RawAttributeRecord`, `PolicyInput` and its enums)
//! - the model's input contract (`ModelSchema`)
//! - per-request intermediates and outputs (`AlignedFeatureTable`,
//!   `AssessmentResult`, `RiskTier`, `RiskAssessment`)

pub mod types;

pub use types::*;
