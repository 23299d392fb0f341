//! Command-line parsing for the claim-risk assessor.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! assessment pipeline; `app` does the dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{AreaCluster, AttributeValue, FuelType, NcapRating, PolicyInput, Segment, VehicleMake};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "claim-risk", version, about = "Vehicle insurance claim-risk assessment")]
pub struct Cli {
    /// Model artifact (JSON pipeline). Overrides CLAIM_RISK_MODEL.
    #[arg(long, global = true, value_name = "JSON")]
    pub model: Option<PathBuf>,

    /// Sidecar schema. Overrides CLAIM_RISK_SCHEMA.
    #[arg(long, global = true, value_name = "JSON")]
    pub schema: Option<PathBuf>,

    /// Reject requests that would need default imputation.
    #[arg(long, global = true)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Assess one policy and print the risk score, tier and action.
    Assess(AssessArgs),
    /// Print the model's expected input columns and their kinds.
    Schema,
    /// Launch the interactive dashboard.
    Tui(TuiArgs),
}

/// Policy attributes; defaults match the dashboard's initial form.
#[derive(Debug, Clone, Args)]
pub struct AssessArgs {
    /// Policy tenure in years [0, 30].
    #[arg(long, default_value_t = 1.0)]
    pub policy_tenure: f64,

    /// Vehicle age in years [0, 20].
    #[arg(long, default_value_t = 3)]
    pub age_of_car: u32,

    /// Policyholder age [18, 90].
    #[arg(long, default_value_t = 35)]
    pub age_of_policyholder: u32,

    #[arg(long, value_enum, default_value_t = AreaCluster::A)]
    pub area_cluster: AreaCluster,

    #[arg(long, value_enum, default_value_t = Segment::A)]
    pub segment: Segment,

    #[arg(long, value_enum, default_value_t = FuelType::Petrol)]
    pub fuel_type: FuelType,

    /// Population density [500, 50000].
    #[arg(long, default_value_t = 5000)]
    pub population_density: u32,

    #[arg(long, value_enum, default_value_t = VehicleMake::Make1)]
    pub make: VehicleMake,

    #[arg(long, value_enum, default_value_t = NcapRating::Zero)]
    pub ncap_rating: NcapRating,

    /// Additional raw attribute passed straight to the model (repeatable).
    #[arg(long = "extra", value_name = "KEY=VALUE", value_parser = parse_extra)]
    pub extras: Vec<(String, AttributeValue)>,

    /// Print the assessment as JSON.
    #[arg(long)]
    pub json: bool,
}

impl AssessArgs {
    pub fn to_input(&self) -> PolicyInput {
        PolicyInput {
            policy_tenure: self.policy_tenure,
            age_of_car: self.age_of_car,
            age_of_policyholder: self.age_of_policyholder,
            area_cluster: self.area_cluster,
            segment: self.segment,
            fuel_type: self.fuel_type,
            population_density: self.population_density,
            make: self.make,
            ncap_rating: self.ncap_rating,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct TuiArgs {
    /// Seed for the random-applicant key.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

fn parse_extra(raw: &str) -> Result<(String, AttributeValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), AttributeValue::parse_loose(value)))
}
