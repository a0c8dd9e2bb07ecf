//! gNMI telemetry provisioning tool
//!
//! Applies one telemetry configuration to every device given on the command
//! line and exits non-zero unless all of them accepted it.

use std::process::ExitCode;

use anyhow::Context;

use telecfg_apply::{ProvisionArgs, ProvisionConfig, ProvisionRunner};
use telecfg_gnmi::{GnmiToolConfig, GnmiTransport};

const TOOL: &str = "telecfg-gnmi";

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = ProvisionArgs::parse_for(TOOL);

    let config = GnmiToolConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    let transport = GnmiTransport::new(config.gnmi.clone());

    let dry_run = args.dry_run;
    let runner = ProvisionRunner::new(TOOL, config, args)?;
    let report = runner.run(transport).await?;

    if !dry_run {
        for line in report.lines() {
            println!("{}", line);
        }
        println!(
            "{} of {} devices configured",
            report.applied_count(),
            report.outcomes.len()
        );
    }

    Ok(report.exit_code())
}
