//! Subcommand implementations
//!
//! Each command writes its report to `out` so the binary and the tests share
//! the same code path.

use crate::cli::OutputFormat;
use crate::config::CheckConfig;
use crate::request::RequestFixture;
use anyhow::{Context, Result};
use gatehouse_core::Error;
use gatehouse_policy::{Decision, Definition, Guard, PolicyDocument, Report};
use std::io::Write;
use tracing::info;

fn load_policy(config: &CheckConfig) -> Result<(PolicyDocument, Definition)> {
    let document = PolicyDocument::from_file(&config.policy_path)
        .with_context(|| format!("failed to read policy '{}'", config.policy_path))?;
    let definition = document
        .compile()
        .with_context(|| format!("invalid policy '{}'", config.policy_path))?;
    Ok((document, definition))
}

fn load_request(config: &CheckConfig) -> Result<RequestFixture> {
    RequestFixture::from_file(&config.request_path)
        .with_context(|| format!("failed to read request '{}'", config.request_path))
}

/// Authorize the fixture request, true when access is granted
pub fn check(config: &CheckConfig, out: &mut impl Write) -> Result<bool> {
    let (_, definition) = load_policy(config)?;
    let fixture = load_request(config)?;

    let controller = config
        .controller
        .clone()
        .unwrap_or_else(|| fixture.controller.clone());
    if controller.is_empty() {
        return Err(Error::config(
            "no controller given, set one in the request or the configuration",
        )
        .into());
    }

    let guard = Guard::new(&definition).unrestricted(config.unrestricted.iter().cloned());
    let provider = fixture.provider();
    let report = guard.evaluate(
        &provider,
        config.profiles.as_slice(),
        &controller,
        &fixture.action,
    )?;
    info!(
        controller = %controller,
        action = %fixture.action,
        verdict = report.verdict.as_str(),
        "request checked"
    );

    match config.output {
        OutputFormat::Text => write_text(&report, out)?,
        OutputFormat::Json => writeln!(out, "{}", report.to_json()?)?,
    }
    Ok(report.verdict.is_granted())
}

fn write_text(report: &Report, out: &mut impl Write) -> Result<()> {
    writeln!(
        out,
        "{}#{}: {}",
        report.controller,
        report.action,
        report.verdict.as_str()
    )?;
    let width = report
        .outcomes
        .iter()
        .map(|o| o.profile.len())
        .max()
        .unwrap_or(0);
    for outcome in &report.outcomes {
        let action = outcome
            .action
            .map(|decision| decision.as_str())
            .unwrap_or("-");
        writeln!(
            out,
            "  {:width$}  controller={} action={}",
            outcome.profile,
            outcome.controller,
            action,
            width = width
        )?;
    }
    Ok(())
}

/// Print the raw decision of one profile for the fixture request
pub fn validate(
    config: &CheckConfig,
    profile: &str,
    actions: &[String],
    out: &mut impl Write,
) -> Result<Decision> {
    let (_, definition) = load_policy(config)?;
    let fixture = load_request(config)?;

    let provider = fixture.provider();
    let decision = definition.validate(&provider, profile, actions.to_vec())?;
    writeln!(out, "{}", decision)?;
    Ok(decision)
}

/// List the profiles and tests of the policy document
pub fn lint(config: &CheckConfig, out: &mut impl Write) -> Result<()> {
    let (document, definition) = load_policy(config)?;

    let tests = definition.test_names();
    writeln!(
        out,
        "{}: {} profiles, {} tests",
        config.policy_path,
        document.profiles.len(),
        tests.len()
    )?;
    writeln!(out, "profiles:")?;
    for profile in &document.profiles {
        let context = profile
            .context
            .as_ref()
            .map(|expr| format!(" (context: {})", expr.name()))
            .unwrap_or_default();
        writeln!(
            out,
            "  {}: {} rules{}",
            profile.name,
            profile.rules.len(),
            context
        )?;
    }
    writeln!(out, "tests:")?;
    for test in tests {
        writeln!(out, "  {}", test)?;
    }
    Ok(())
}
