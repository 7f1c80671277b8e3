use chrono::Utc;
use indicatif::ProgressBar;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::getrepodetails::{FetchFailure, fetch_details, progress_bar};
use crate::getrepolist::list_top;
use crate::graphql::QueryExecutor;
use crate::metrics::{RepositoryMetrics, derive_metrics, read_artifact, write_artifact};
use crate::pacing::FixedDelay;

#[derive(Debug)]
pub struct Collection {
    pub metrics: Vec<RepositoryMetrics>,
    pub failures: Vec<FetchFailure>,
    /// True when the metrics were read from an existing artifact.
    pub from_cache: bool,
}

/// Exit status when some repositories were skipped but the rest was persisted.
pub const PARTIAL_FAILURE: u8 = 2;

impl Collection {
    /// 0 for a complete run, [`PARTIAL_FAILURE`] when any repository was skipped.
    pub fn exit_status(&self) -> u8 {
        if self.failures.is_empty() {
            0
        } else {
            PARTIAL_FAILURE
        }
    }
}

/// Returns the metrics of the existing artifact, or collects them when there is
/// none. `connect` is only called, and the network only touched, in the second case.
pub fn run<E, F>(config: &Config, connect: F) -> Result<Collection>
where
    E: QueryExecutor,
    F: FnOnce(&Config) -> Result<E>,
{
    let path = &config.artifact_path;
    if path.exists() {
        info!(path = %path.display(), "artifact found, skipping collection");
        return Ok(Collection {
            metrics: read_artifact(path)?,
            failures: vec![],
            from_cache: true,
        });
    }
    let executor = connect(config)?;
    collect(config, &executor, &progress_bar())
}

/// Lists, fetches, derives and persists. Listing failures abort; per-repository
/// fetch failures are returned alongside the metrics.
pub fn collect(
    config: &Config,
    executor: &impl QueryExecutor,
    progress: &ProgressBar,
) -> Result<Collection> {
    let repos = list_top(
        executor,
        &FixedDelay(config.page_delay()),
        config.target_count,
        config.page_size(),
    )?;
    let outcome = fetch_details(
        executor,
        &FixedDelay(config.detail_delay()),
        &repos,
        progress,
    );
    let metrics = derive_metrics(&outcome.records, Utc::now())?;
    write_artifact(&config.artifact_path, &metrics)?;
    Ok(Collection {
        metrics,
        failures: outcome.failures,
        from_cache: false,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::error::Error;
    use crate::getrepodetails::testing::detail;
    use crate::graphql::GitHubClient;
    use crate::graphql::testing::ScriptedExecutor;
    use crate::stats::Summary;

    fn config(dir: &TempDir) -> Config {
        Config {
            target_count: 3,
            page_delay_ms: 0,
            detail_delay_ms: 0,
            artifact_path: dir.path().join("repo_metrics.csv"),
            report_path: dir.path().join("report.md"),
            ..Config::default()
        }
    }

    fn script() -> ScriptedExecutor {
        ScriptedExecutor::new([
            Ok(json!({
                "data": {
                    "search": {
                        "repos": [
                            { "repo": { "owner": { "login": "org" }, "name": "one" } },
                            { "repo": { "owner": { "login": "org" }, "name": "two" } },
                            { "repo": { "owner": { "login": "org" }, "name": "three" } }
                        ],
                        "pageInfo": { "endCursor": "c1", "hasNextPage": true }
                    }
                }
            })),
            detail("org/one", 10, 9),
            Err(Error::Transport {
                status: 502,
                body: "Bad Gateway".to_string(),
            }),
            detail("org/three", 0, 0),
        ])
    }

    #[test]
    fn collects_and_persists_successful_subset() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let executor = script();
        let collection = run(&config, |_| Ok(executor)).unwrap();

        assert!(!collection.from_cache);
        assert_eq!(collection.failures.len(), 1);
        assert_eq!(collection.failures[0].repository.name, "two");
        let names = collection
            .metrics
            .iter()
            .map(|m| m.full_name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, ["org/one", "org/three"]);
        assert_eq!(collection.metrics[0].issue_resolution_pct, 90.0);
        assert_eq!(read_artifact(&config.artifact_path).unwrap(), collection.metrics);
        assert_eq!(collection.exit_status(), PARTIAL_FAILURE);
    }

    #[test]
    fn existing_artifact_skips_the_network() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let first = run(&config, |_| Ok(script())).unwrap();

        let connected = Cell::new(false);
        let second = run(&config, |_| {
            connected.set(true);
            Ok(ScriptedExecutor::default())
        })
        .unwrap();

        assert!(!connected.get());
        assert!(second.from_cache);
        assert!(second.failures.is_empty());
        assert_eq!(second.exit_status(), 0);
        assert_eq!(second.metrics, first.metrics);
        assert_eq!(
            Summary::from_metrics(&second.metrics),
            Summary::from_metrics(&first.metrics)
        );
    }

    #[test]
    fn listing_failure_is_fatal_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let executor = ScriptedExecutor::new([Ok(json!({
            "errors": [{ "message": "Something went wrong while executing your query." }]
        }))]);
        let err = run(&config, |_| Ok(executor)).unwrap_err();
        assert!(matches!(err, Error::GraphQLResponse(_)));
        assert!(!config.artifact_path.exists());
    }

    #[test]
    fn missing_token_fails_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let err = run(&config, GitHubClient::new).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(!config.artifact_path.exists());
    }

    #[test]
    fn data_integrity_violation_aborts_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        config.target_count = 1;
        let executor = ScriptedExecutor::new([
            Ok(json!({
                "data": {
                    "search": {
                        "repos": [{ "repo": { "owner": { "login": "org" }, "name": "odd" } }],
                        "pageInfo": { "endCursor": null, "hasNextPage": false }
                    }
                }
            })),
            detail("org/odd", 3, 4),
        ]);
        let err = run(&config, |_| Ok(executor)).unwrap_err();
        assert!(matches!(err, Error::DataIntegrity { .. }));
        assert!(!config.artifact_path.exists());
    }
}
