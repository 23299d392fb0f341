//! Runtime settings.
//!
//! Values come from the process environment (a `.env` file is loaded first if
//! present); CLI flags override them in `app`.
//!
//! | variable                          | default                                   |
//! |-----------------------------------|-------------------------------------------|
//! | `CLAIM_RISK_MODEL`                | `model/final_insurance_claim_model.json`  |
//! | `CLAIM_RISK_SCHEMA`               | `<model stem>.schema.json` if present     |
//! | `CLAIM_RISK_TIERS`                | `5,10,20`                                 |
//! | `CLAIM_RISK_CATEGORICAL_DEFAULT`  | `No`                                      |
//! | `CLAIM_RISK_NUMERIC_DEFAULT`      | `0`                                       |
//! | `CLAIM_RISK_STRICT`               | `false`                                   |

use std::path::PathBuf;

use crate::error::RiskError;
use crate::features::ImputationPolicy;
use crate::policy::TierThresholds;

pub const DEFAULT_MODEL_PATH: &str = "model/final_insurance_claim_model.json";

pub const ENV_MODEL: &str = "CLAIM_RISK_MODEL";
pub const ENV_SCHEMA: &str = "CLAIM_RISK_SCHEMA";
pub const ENV_TIERS: &str = "CLAIM_RISK_TIERS";
pub const ENV_CATEGORICAL_DEFAULT: &str = "CLAIM_RISK_CATEGORICAL_DEFAULT";
pub const ENV_NUMERIC_DEFAULT: &str = "CLAIM_RISK_NUMERIC_DEFAULT";
pub const ENV_STRICT: &str = "CLAIM_RISK_STRICT";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub model_path: PathBuf,
    /// Explicit sidecar schema; `None` means "look next to the model".
    pub schema_path: Option<PathBuf>,
    pub thresholds: TierThresholds,
    pub imputation: ImputationPolicy,
    pub strict: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            schema_path: None,
            thresholds: TierThresholds::default(),
            imputation: ImputationPolicy::default(),
            strict: false,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, RiskError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup (the environment, or a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RiskError> {
        let mut settings = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get(ENV_MODEL) {
            settings.model_path = PathBuf::from(path);
        }
        if let Some(path) = get(ENV_SCHEMA) {
            settings.schema_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = get(ENV_TIERS) {
            settings.thresholds = TierThresholds::parse(&raw)?;
        }
        if let Some(raw) = lookup(ENV_CATEGORICAL_DEFAULT) {
            settings.imputation.categorical_default = raw;
        }
        if let Some(raw) = get(ENV_NUMERIC_DEFAULT) {
            let value = raw.trim().parse::<f64>().map_err(|e| {
                RiskError::Config(format!("{ENV_NUMERIC_DEFAULT}='{raw}' is not a number: {e}"))
            })?;
            if !value.is_finite() {
                return Err(RiskError::Config(format!("{ENV_NUMERIC_DEFAULT} must be finite")));
            }
            settings.imputation.numeric_default = value;
        }
        if let Some(raw) = get(ENV_STRICT) {
            settings.strict = parse_bool(ENV_STRICT, &raw)?;
        }

        Ok(settings)
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, RiskError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(RiskError::Config(format!("{key}='{other}' is not a boolean"))),
    }
}
