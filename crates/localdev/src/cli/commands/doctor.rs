//! Doctor command - check the local environment before building or starting projects

use std::collections::BTreeMap;

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::info;

use localdev_core::Version;
use localdev_docker::{ContainerRuntime, DockerCli};

use super::load_workspace;
use crate::cli::{output, Cli, OutputFormat};

/// Check environment variables and the Docker installation
#[derive(Debug, Args)]
pub struct DoctorCommand {
    /// Skip specific categories
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<CheckCategory>,
}

/// Categories of checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CheckCategory {
    /// Required environment variables
    Env,
    /// Docker binary and server version
    Docker,
}

/// Result of a single check
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub category: &'static str,
    pub name: String,
    pub status: CheckStatus,
    pub message: Option<String>,
}

/// Status of a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Warn,
    Fail,
    Skip,
}

impl CheckResult {
    fn new(category: &'static str, name: impl Into<String>, status: CheckStatus) -> Self {
        Self {
            category,
            name: name.into(),
            status,
            message: None,
        }
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Summary of all checks
#[derive(Debug, Serialize)]
pub struct DoctorSummary {
    pub checks: Vec<CheckResult>,
    pub ok_count: usize,
    pub warn_count: usize,
    pub fail_count: usize,
    pub skip_count: usize,
}

impl DoctorSummary {
    fn new(checks: Vec<CheckResult>) -> Self {
        let count = |status| checks.iter().filter(|c| c.status == status).count();
        Self {
            ok_count: count(CheckStatus::Ok),
            warn_count: count(CheckStatus::Warn),
            fail_count: count(CheckStatus::Fail),
            skip_count: count(CheckStatus::Skip),
            checks,
        }
    }
}

const ENV: &str = "Environment Variables";
const DOCKER: &str = "Docker";

impl DoctorCommand {
    /// Execute the doctor command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(skip = ?self.skip, "executing doctor command");
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.execute_async(cli))
    }

    async fn execute_async(&self, cli: &Cli) -> anyhow::Result<()> {
        let workspace = load_workspace(cli)?;
        let doctor = &workspace.config.doctor;
        let mut checks = Vec::new();

        if self.skip.contains(&CheckCategory::Env) {
            checks.push(CheckResult::new(ENV, "environment", CheckStatus::Skip));
        } else {
            checks.extend(check_env(&doctor.env, |key| std::env::var(key).ok()));
        }

        if self.skip.contains(&CheckCategory::Docker) {
            checks.push(CheckResult::new(DOCKER, "docker", CheckStatus::Skip));
        } else {
            let min = Version::parse(&doctor.min_docker_version).ok_or_else(|| {
                anyhow::anyhow!(
                    "doctor.min_docker_version '{}' is not a version",
                    doctor.min_docker_version
                )
            })?;
            match DockerCli::new() {
                Ok(docker) => {
                    checks.push(
                        CheckResult::new(DOCKER, "Binary", CheckStatus::Ok).with_message("found on PATH"),
                    );
                    checks.push(check_server_version(&docker, &min).await);
                }
                Err(e) => {
                    checks.push(
                        CheckResult::new(DOCKER, "Binary", CheckStatus::Fail).with_message(e.to_string()),
                    );
                }
            }
        }

        let summary = DoctorSummary::new(checks);
        match cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            OutputFormat::Text if !cli.quiet => {
                output::title("Doctor");
                print_results(&summary.checks);
                print_summary(&summary);
            }
            OutputFormat::Text => {}
        }

        if summary.fail_count > 0 {
            anyhow::bail!("{} check(s) failed", summary.fail_count);
        }
        Ok(())
    }
}

/// Compare each required variable with its expected value
///
/// A missing variable fails; a set variable with a different value than the
/// configured one only warns. An empty expected value accepts any value.
fn check_env(
    expected: &BTreeMap<String, String>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Vec<CheckResult> {
    if expected.is_empty() {
        return vec![CheckResult::new(ENV, "environment", CheckStatus::Skip)
            .with_message("no variables configured")];
    }

    expected
        .iter()
        .map(|(key, want)| match lookup(key).filter(|v| !v.is_empty()) {
            None => CheckResult::new(ENV, key, CheckStatus::Fail).with_message("not set"),
            Some(got) if !want.is_empty() && &got != want => {
                CheckResult::new(ENV, key, CheckStatus::Warn)
                    .with_message(format!("got '{}', expected '{}'", got, want))
            }
            Some(_) => CheckResult::new(ENV, key, CheckStatus::Ok),
        })
        .collect()
}

/// Ask the runtime's server for its version and compare it with `min`
async fn check_server_version(runtime: &dyn ContainerRuntime, min: &Version) -> CheckResult {
    let reported = match runtime.server_version().await {
        Ok(v) => v,
        Err(e) => {
            return CheckResult::new(DOCKER, "Server", CheckStatus::Fail)
                .with_message(format!("not reachable: {}", e))
        }
    };

    match Version::parse(&reported) {
        Some(installed) if installed >= *min => CheckResult::new(DOCKER, "Server", CheckStatus::Ok)
            .with_message(format!("Version: {} >= {}", installed, min)),
        Some(installed) => CheckResult::new(DOCKER, "Server", CheckStatus::Fail)
            .with_message(format!("Version: {} < {}", installed, min)),
        None => CheckResult::new(DOCKER, "Server", CheckStatus::Warn)
            .with_message(format!("unrecognised version '{}'", reported)),
    }
}

fn print_results(checks: &[CheckResult]) {
    let mut current = "";
    for check in checks {
        if check.category != current {
            if !current.is_empty() {
                println!();
            }
            output::section(check.category);
            current = check.category;
        }

        let msg = check.message.as_deref().unwrap_or("");
        let name = match check.status {
            CheckStatus::Ok => style(&check.name).green(),
            CheckStatus::Warn => style(&check.name).yellow(),
            CheckStatus::Fail => style(&check.name).red(),
            CheckStatus::Skip => style(&check.name).dim(),
        };
        println!("  {} {} {}", status_icon(check.status), name, style(msg).dim());
    }
}

fn print_summary(summary: &DoctorSummary) {
    println!();
    if summary.fail_count == 0 && summary.warn_count == 0 {
        output::success(&format!("All {} checks passed", summary.ok_count));
    } else {
        println!(
            "Summary: {} ok, {} warnings, {} failed, {} skipped",
            style(summary.ok_count).green(),
            style(summary.warn_count).yellow(),
            style(summary.fail_count).red(),
            style(summary.skip_count).dim(),
        );
    }
}

fn status_icon(status: CheckStatus) -> console::StyledObject<&'static str> {
    match status {
        CheckStatus::Ok => style("✓").green(),
        CheckStatus::Warn => style("!").yellow(),
        CheckStatus::Fail => style("✗").red(),
        CheckStatus::Skip => style("-").dim(),
    }
}
