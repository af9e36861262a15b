mod cli;
mod config;
mod data;
mod error;
mod report;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use log::{debug, error, warn};

use cli::Cli;
use data::loader::Fetcher;
use error::HuntError;

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .init();

    match hunt(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(err.downcast_ref::<HuntError>().map_or(1, HuntError::exit_code))
        }
    }
}

fn hunt(cli: &Cli) -> Result<()> {
    let config = cli.resolve_config().map_err(HuntError::from)?;

    let datasets = Fetcher::new(&config.sources)
        .and_then(|fetcher| fetcher.fetch_all(&config.sources))
        .map_err(HuntError::from)?;

    let report = data::run_pipeline(&datasets, &config);
    for count in &report.counts {
        debug!("{:>16}: {} remaining", count.stage, count.remaining);
    }
    if !report.issues.is_empty() {
        warn!(
            "{} system(s) excluded because of inconsistent source data",
            report.issues.len()
        );
    }

    report::publish(&config.report, &report.rows, &mut io::stdout().lock())?;
    Ok(())
}
