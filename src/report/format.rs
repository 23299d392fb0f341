//! Formatted terminal output.
//!
//! Formatting lives here so the pipeline stays free of presentation and
//! output changes stay localized.

use crate::app::pipeline::AssessmentOutput;
use crate::domain::PolicyInput;
use crate::features::AlignmentReport;
use crate::models::{ModelHandle, SchemaSource};

/// `7.2345` -> `"7.23%"`.
pub fn format_probability(probability: f64) -> String {
    format!("{probability:.2}%")
}

pub fn claim_text(predicted_claim: u8) -> &'static str {
    if predicted_claim == 1 {
        "Claim Expected"
    } else {
        "No Claim Expected"
    }
}

/// Full text report for one assessment.
pub fn format_assessment(output: &AssessmentOutput) -> String {
    let a = &output.assessment;
    let mut out = String::new();

    out.push_str("=== Insurance Risk Assessment ===\n");
    out.push_str(&format!("Risk probability: {}\n", format_probability(a.probability)));
    out.push_str(&format!("Risk category:    {}\n", a.tier.display_name()));
    out.push_str(&format!("Business action:  {}\n", a.action));
    out.push_str(&format!(
        "Predicted output: is_claim = {} ({})\n",
        a.predicted_claim,
        claim_text(a.predicted_claim)
    ));
    out.push_str(&format_alignment_notes(&output.report));

    out
}

/// Lines describing defaults and ignored fields; empty when nothing happened.
pub fn format_alignment_notes(report: &AlignmentReport) -> String {
    let mut out = String::new();
    if !report.defaults.is_empty() {
        let items = report
            .defaults
            .iter()
            .map(|e| format!("{} ({})", e.column, e.reason))
            .collect::<Vec<_>>();
        out.push_str(&format!("Defaults applied: {}\n", items.join(", ")));
    }
    if !report.dropped.is_empty() {
        out.push_str(&format!("Ignored fields:   {}\n", report.dropped.join(", ")));
    }
    out
}

/// One-sentence customer summary shown under the dashboard.
pub fn customer_insight(input: &PolicyInput) -> String {
    format!(
        "Customer from Area Cluster {} with Segment {}, living in population density {}, \
         driving a {} vehicle (NCAP {}), shows risk behavior impacting underwriting decisions.",
        input.area_cluster.code(),
        input.segment.code(),
        input.population_density,
        input.fuel_type.code(),
        input.ncap_rating.stars(),
    )
}

/// The model's input contract as a table.
pub fn format_schema(model: &ModelHandle) -> String {
    let mut out = String::new();
    out.push_str(&format!("Model: {}\n", model.name()));
    match model.schema_source() {
        SchemaSource::Sidecar(path) => {
            out.push_str(&format!("Schema: {}\n", path.display()));
        }
        SchemaSource::Derived => out.push_str("Schema: derived from pipeline\n"),
    }
    out.push_str(&format!("Decision threshold: {}\n\n", model.decision_threshold()));

    let width = model
        .expected_columns()
        .iter()
        .map(String::len)
        .max()
        .unwrap_or(0)
        .max("column".len());

    out.push_str(&format!("{:>3}  {:<width$}  kind\n", "#", "column"));
    for (i, col) in model.schema().columns().iter().enumerate() {
        out.push_str(&format!(
            "{:>3}  {:<width$}  {}\n",
            i + 1,
            col.name,
            col.kind.label()
        ));
    }
    out
}
