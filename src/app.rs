//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - initializes logging
//! - resolves settings (environment, then CLI overrides)
//! - loads the model once and hands the engine to the chosen front end

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{AssessArgs, Cli, Command};
use crate::config::Settings;
use crate::domain::{PolicyInput, RawAttributeRecord};
use crate::error::RiskError;

pub mod pipeline;

use pipeline::Engine;

/// Entry point for the `claim-risk` binary.
pub fn run() -> Result<(), RiskError> {
    // `claim-risk` and `claim-risk --model m.json` behave like `claim-risk tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);

    init_logging(matches!(cli.command, Command::Tui(_)));

    let settings = apply_overrides(Settings::from_env()?, &cli);
    // A model that fails to load stops the process before any request is served.
    let engine = Engine::from_settings(&settings)?;

    match cli.command {
        Command::Assess(args) => handle_assess(&engine, &args),
        Command::Schema => {
            print!("{}", crate::report::format_schema(engine.model()));
            Ok(())
        }
        Command::Tui(args) => crate::tui::run(engine, args),
    }
}

fn handle_assess(engine: &Engine, args: &AssessArgs) -> Result<(), RiskError> {
    let record = assess_record(args)?;
    let output = engine.assess_record(&record)?;

    if args.json {
        println!("{}", crate::report::assessment_json(&output)?);
    } else {
        print!("{}", crate::report::format_assessment(&output));
    }
    Ok(())
}

/// The validated form fields plus any `--extra` attributes.
///
/// Extras may only add columns; the nine form fields go through their own
/// typed, range-checked flags.
fn assess_record(args: &AssessArgs) -> Result<RawAttributeRecord, RiskError> {
    let mut record = args.to_input().to_record()?;
    for (key, value) in &args.extras {
        if PolicyInput::FIELD_NAMES.contains(&key.as_str()) {
            return Err(RiskError::InvalidInput(format!(
                "--extra cannot set '{key}'; use --{} instead",
                key.replace('_', "-")
            )));
        }
        record.insert(key.clone(), value.clone());
    }
    Ok(record)
}

/// CLI flags win over environment settings.
pub fn apply_overrides(mut settings: Settings, cli: &Cli) -> Settings {
    if let Some(path) = &cli.model {
        settings.model_path = path.clone();
    }
    if let Some(path) = &cli.schema {
        settings.schema_path = Some(path.clone());
    }
    if cli.strict {
        settings.strict = true;
    }
    settings
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
///
/// The dashboard owns the terminal, so in TUI mode events are discarded.
fn init_logging(tui: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    // Already initialized (e.g. by a test harness): keep the existing subscriber.
    if tui {
        builder.with_writer(std::io::sink).try_init().ok();
    } else {
        builder.with_writer(std::io::stderr).try_init().ok();
    }
}

/// Rewrite argv so `claim-risk` defaults to `claim-risk tui`.
///
/// Rules:
/// - `claim-risk`                      -> `claim-risk tui`
/// - `claim-risk --model m.json ...`   -> `claim-risk tui --model m.json ...`
/// - `claim-risk --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "assess" | "schema" | "tui");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AttributeValue;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_launches_tui() {
        assert_eq!(rewrite_args(args(&["claim-risk"])), args(&["claim-risk", "tui"]));
    }

    #[test]
    fn leading_flags_are_tui_flags() {
        assert_eq!(
            rewrite_args(args(&["claim-risk", "--model", "m.json"])),
            args(&["claim-risk", "tui", "--model", "m.json"])
        );
    }

    #[test]
    fn subcommands_and_help_are_untouched() {
        for argv in [
            args(&["claim-risk", "assess", "--json"]),
            args(&["claim-risk", "schema"]),
            args(&["claim-risk", "--help"]),
        ] {
            assert_eq!(rewrite_args(argv.clone()), argv);
        }
    }

    fn parsed_assess(argv: &[&str]) -> AssessArgs {
        match Cli::parse_from(argv.iter().copied()).command {
            Command::Assess(args) => args,
            other => panic!("expected assess, got {other:?}"),
        }
    }

    #[test]
    fn extras_cannot_override_form_fields() {
        for extra in [
            "age_of_policyholder=5",
            "fuel_type=Hydrogen",
            "population_density=-99999999",
        ] {
            let args = parsed_assess(&["claim-risk", "assess", "--extra", extra]);
            let err = assess_record(&args).unwrap_err();
            assert!(matches!(err, RiskError::InvalidInput(_)), "{extra}: {err:?}");
        }
    }

    #[test]
    fn extras_add_model_only_columns() {
        let args = parsed_assess(&[
            "claim-risk", "assess", "--age-of-car", "7", "--extra", "airbags=6", "--extra", "is_esc=Yes",
        ]);
        let record = assess_record(&args).unwrap();
        assert_eq!(record.len(), 11);
        assert_eq!(record.get("age_of_car"), Some(&AttributeValue::Integer(7)));
        assert_eq!(record.get("airbags"), Some(&AttributeValue::Integer(6)));
        assert_eq!(record.get("is_esc"), Some(&AttributeValue::Text("Yes".into())));
    }

    #[test]
    fn logging_init_tolerates_an_existing_subscriber() {
        init_logging(false);
        init_logging(true);
    }

    #[test]
    fn cli_flags_override_settings() {
        let cli = Cli::parse_from(["claim-risk", "assess", "--model", "x.json", "--strict"]);
        let settings = apply_overrides(Settings::default(), &cli);
        assert_eq!(settings.model_path, std::path::PathBuf::from("x.json"));
        assert!(settings.strict);
        assert_eq!(settings.schema_path, None);
    }
}
