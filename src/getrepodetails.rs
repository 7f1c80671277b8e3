use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::graphql::{QueryExecutor, into_data};
use crate::pacing::Pacer;
use crate::repolist::{RepositoryData, RepositoryIdentifier, RepositoryRecord};

const QUERY: &str = r#"query ($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    nameWithOwner
    createdAt
    pushedAt
    primaryLanguage {
      name
    }
    releases {
      totalCount
    }
    pullRequests(states: MERGED) {
      totalCount
    }
    issues {
      totalCount
    }
    closedIssues: issues(states: CLOSED) {
      totalCount
    }
  }
}"#;

#[derive(Debug)]
pub struct FetchFailure {
    pub repository: RepositoryIdentifier,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Successfully fetched records, in the order of the input identifiers.
    pub records: Vec<RepositoryRecord>,
    pub failures: Vec<FetchFailure>,
}

const PROGRESS_TEMPLATE: &str = "{msg} [{bar:40}] {pos}/{len} ({percent}%) ETA {eta}";

/// Bar for [`fetch_details`]; its length is set once the identifiers are known.
pub fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template(PROGRESS_TEMPLATE) {
        bar.set_style(style);
    }
    bar
}

/// Fetches the detail record of every identifier. A failing repository is logged,
/// recorded in `failures` and skipped; the batch always runs to the end.
pub fn fetch_details(
    executor: &impl QueryExecutor,
    pacer: &impl Pacer,
    repos: &[RepositoryIdentifier],
    progress: &ProgressBar,
) -> FetchOutcome {
    let mut outcome = FetchOutcome {
        records: Vec::with_capacity(repos.len()),
        failures: vec![],
    };
    progress.set_length(repos.len() as u64);
    progress.set_message("Fetching repository details");

    for (i, repo) in repos.iter().enumerate() {
        if i > 0 {
            pacer.wait_before_next_call();
        }
        match fetch_one(executor, repo) {
            Ok(record) => {
                debug!(repository = %repo, "fetched details");
                outcome.records.push(record);
            }
            Err(error) => {
                warn!(repository = %repo, %error, "skipping repository");
                outcome.failures.push(FetchFailure {
                    repository: repo.clone(),
                    error,
                });
            }
        }
        progress.inc(1);
    }

    progress.finish_with_message("Fetched repository details");
    info!(
        fetched = outcome.records.len(),
        failed = outcome.failures.len(),
        "detail fetch finished"
    );
    outcome
}

fn fetch_one(executor: &impl QueryExecutor, repo: &RepositoryIdentifier) -> Result<RepositoryRecord> {
    let body = executor.execute(QUERY, json!({ "owner": repo.owner, "name": repo.name }))?;
    into_data::<RepositoryData>(body)?
        .repository
        .ok_or_else(|| Error::missing_repository(repo))
}

#[cfg(test)]
pub mod testing {
    use serde_json::{Value, json};

    use crate::error::Result;

    /// A detail response body for `full_name` with fixed timestamps.
    pub fn detail(full_name: &str, total_issues: u64, closed_issues: u64) -> Result<Value> {
        Ok(json!({
            "data": {
                "repository": {
                    "nameWithOwner": full_name,
                    "createdAt": "2020-01-01T00:00:00Z",
                    "pushedAt": "2026-10-01T00:00:00Z",
                    "primaryLanguage": { "name": "Rust" },
                    "releases": { "totalCount": 3 },
                    "pullRequests": { "totalCount": 42 },
                    "issues": { "totalCount": total_issues },
                    "closedIssues": { "totalCount": closed_issues }
                }
            }
        }))
    }
}
