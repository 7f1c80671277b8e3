use std::process::ExitCode;

use chrono::Local;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::Result;
use graphql::GitHubClient;
use stats::Summary;

mod config;
mod error;
mod getrepodetails;
mod getrepolist;
mod graphql;
mod metrics;
mod pacing;
mod pipeline;
mod repolist;
mod report;
mod stats;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(status) => ExitCode::from(status),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<u8> {
    let config = Config::load()?;
    let collection = pipeline::run(&config, GitHubClient::new)?;
    if collection.from_cache {
        info!(
            path = %config.artifact_path.display(),
            "loaded metrics from cache, delete the file to collect again"
        );
    }

    if !collection.failures.is_empty() {
        eprintln!(
            "{} repositories could not be fetched and were skipped:",
            collection.failures.len()
        );
        for failure in &collection.failures {
            eprintln!("  {}: {}", failure.repository, failure.error);
        }
    }

    println!("{}", Summary::from_metrics(&collection.metrics));
    let report = report::render(&collection.metrics, Local::now().date_naive());
    report::write_report(&config.report_path, &report)?;
    Ok(collection.exit_status())
}
