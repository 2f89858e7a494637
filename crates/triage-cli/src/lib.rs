//! Triage CLI: rule file maintenance and one-off diagnoses
//!
//! ```text
//! triage validate <file>
//! triage merge <base> <overlay> [-o out]
//! triage diagnose --domain <Network|Computer> --facts '<json>'
//! triage cases
//! ```

pub mod cases;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

use triage_core::{Domain, Facts};
use triage_engine::{DiagnosisService, EngineConfig, JsonlRecorder};
use triage_rules::{IssueLevel, RuleFile};

/// Triage - rule-based IT diagnosis
#[derive(Parser, Debug)]
#[command(name = "triage")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Engine configuration (YAML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a rule file and list every issue
    Validate {
        file: PathBuf,
    },

    /// Merge an overlay rule file into a base file by rule id
    Merge {
        base: PathBuf,
        overlay: PathBuf,
        /// Output file; `.json` selects JSON, anything else YAML. Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Diagnose a fact set given as a JSON object
    Diagnose {
        #[arg(long)]
        domain: String,
        #[arg(long)]
        facts: String,
        /// Append the case to this JSON Lines file
        #[arg(long)]
        case_log: Option<PathBuf>,
    },

    /// Run the canonical cases and print the top diagnosis of each
    Cases,
}

pub fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Command::Validate { file } => validate(&file, out),
        Command::Merge { base, overlay, output } => merge(&base, &overlay, output.as_deref(), out),
        Command::Diagnose { domain, facts, case_log } => {
            diagnose(&config, &domain, &facts, case_log.as_deref(), out)
        }
        Command::Cases => run_cases(&config, out),
    }
}

pub fn validate(file: &Path, out: &mut impl Write) -> Result<()> {
    let rules = RuleFile::load(file).with_context(|| format!("reading {}", file.display()))?;
    let issues = rules.validate();

    for issue in &issues {
        writeln!(out, "{}", issue)?;
    }

    let errors = issues.iter().filter(|i| i.level == IssueLevel::Error).count();
    writeln!(
        out,
        "{}: {} rules, {} errors, {} warnings",
        file.display(),
        rules.rules.len(),
        errors,
        issues.len() - errors
    )?;

    if errors > 0 {
        bail!("{} has {} error(s)", file.display(), errors);
    }
    Ok(())
}

pub fn merge(base: &Path, overlay: &Path, output: Option<&Path>, out: &mut impl Write) -> Result<()> {
    let mut merged = RuleFile::load(base).with_context(|| format!("reading {}", base.display()))?;
    let overlay_file = RuleFile::load(overlay).with_context(|| format!("reading {}", overlay.display()))?;
    merged.merge(overlay_file);
    merged.normalize();

    let errors: Vec<_> = merged
        .validate()
        .into_iter()
        .filter(|i| i.level == IssueLevel::Error)
        .collect();
    if !errors.is_empty() {
        for issue in &errors {
            writeln!(out, "{}", issue)?;
        }
        bail!("merged rules have {} error(s)", errors.len());
    }

    let as_json = output
        .and_then(|p| p.extension())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let text = if as_json { merged.to_json()? } else { merged.to_yaml()? };

    match output {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            writeln!(out, "wrote {} rules to {}", merged.rules.len(), path.display())?;
        }
        None => write!(out, "{}", text)?,
    }
    Ok(())
}

pub fn diagnose(
    config: &EngineConfig,
    domain: &str,
    facts: &str,
    case_log: Option<&Path>,
    out: &mut impl Write,
) -> Result<()> {
    let domain: Domain = domain.parse()?;
    let facts = parse_facts(facts)?;

    let mut service = DiagnosisService::from_config(config)?;
    if let Some(path) = case_log {
        let recorder = JsonlRecorder::open(path).with_context(|| format!("opening {}", path.display()))?;
        service = service.with_recorder(Arc::new(recorder));
    }

    let outcome = service.diagnose(domain, facts);
    writeln!(out, "{}", serde_json::to_string_pretty(&outcome)?)?;
    Ok(())
}

fn parse_facts(json: &str) -> Result<Facts> {
    let value: Value = serde_json::from_str(json).context("--facts is not valid JSON")?;
    let Value::Object(map) = value else {
        bail!("--facts must be a JSON object");
    };

    let (facts, ignored) = Facts::from_json(&map);
    if !ignored.is_empty() {
        tracing::warn!(?ignored, "ignoring non-scalar facts");
    }
    Ok(facts)
}

pub fn run_cases(config: &EngineConfig, out: &mut impl Write) -> Result<()> {
    let service = DiagnosisService::from_config(config)?;
    let cases = cases::canonical_cases().context("parsing canonical cases")?;

    let mut failed = 0;
    for (i, case) in cases.iter().enumerate() {
        let result = case.run(&service);
        writeln!(
            out,
            "Case {}: {} facts={}",
            i + 1,
            case.domain,
            serde_json::to_string(&case.facts)?
        )?;
        match result.outcome.top() {
            Some(top) => writeln!(out, "  Top: {} (confidence={:.2})", top.name, top.confidence)?,
            None => writeln!(out, "  No result")?,
        }
        if !result.passed {
            failed += 1;
            writeln!(out, "  expected: {}", case.expect)?;
        }
    }

    if failed > 0 {
        bail!("{} of {} cases did not match", failed, cases.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_facts() {
        let facts = parse_facts(r#"{"cpu_temp": 85, "fan_speed_ok": false, "log": ["x"]}"#).unwrap();
        assert_eq!(facts.len(), 2);
        assert!(parse_facts("[1, 2]").is_err());
        assert!(parse_facts("{oops").is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["triage", "merge", "a.yaml", "b.yaml", "-o", "out.json"]).unwrap();
        match cli.command {
            Command::Merge { output, .. } => assert_eq!(output, Some(PathBuf::from("out.json"))),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
