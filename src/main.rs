use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use petstore_probe::cli::{Cli, OutputFormat};
use petstore_probe::http::Remote;
use petstore_probe::logging::init_tracing;
use petstore_probe::{HttpRemote, InMemoryPetstore, ScenarioContext, run_suite, select};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.to_config().context("failed to resolve configuration")?;
    let scenarios = select(&cli.family, cli.filter.as_deref());

    if cli.list {
        for scenario in &scenarios {
            println!("{}", scenario.qualified_name());
        }
        return Ok(ExitCode::SUCCESS);
    }
    if scenarios.is_empty() {
        anyhow::bail!("no scenarios match the given family/filter");
    }

    let remote: Arc<dyn Remote> = if cli.in_memory {
        Arc::new(InMemoryPetstore::new())
    } else {
        Arc::new(HttpRemote::new(&config).context("failed to set up HTTP client")?)
    };
    tracing::info!(
        remote = %remote.describe(),
        scenarios = scenarios.len(),
        max_workers = config.max_workers,
        "starting run"
    );

    let ctx = ScenarioContext::new(remote, config);
    let report = run_suite(&ctx, &scenarios).await;

    match cli.format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    Ok(if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
