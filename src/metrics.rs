use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{Error, Result};
use crate::repolist::RepositoryRecord;

/// Stored instead of an empty cell when a repository has no primary language.
pub const NO_LANGUAGE: &str = "N/A";
pub const ACTIVE_WITHIN_DAYS: f64 = 30.0;
pub const MATURE_AFTER_DAYS: f64 = 365.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Header row of the artifact, in column order.
pub const COLUMNS: [&str; 11] = [
    "fullName",
    "ageDays",
    "mergedPullRequests",
    "releases",
    "daysSinceLastPush",
    "primaryLanguage",
    "closedIssues",
    "totalIssues",
    "issueResolutionPct",
    "activityLabel",
    "maturityLabel",
];

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy)]
pub enum Activity {
    Active,
    Inactive,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy)]
pub enum Maturity {
    Mature,
    Young,
}

/// One row of the artifact.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryMetrics {
    pub full_name: String,
    pub age_days: f64,
    pub merged_pull_requests: u64,
    pub releases: u64,
    pub days_since_last_push: f64,
    pub primary_language: String,
    pub closed_issues: u64,
    pub total_issues: u64,
    pub issue_resolution_pct: f64,
    pub activity_label: Activity,
    pub maturity_label: Maturity,
}

impl RepositoryMetrics {
    pub fn derive(record: &RepositoryRecord, now: DateTime<Utc>) -> Result<Self> {
        let integrity = |reason: &str| Error::DataIntegrity {
            repository: record.full_name.clone(),
            reason: reason.to_string(),
        };
        let created_at = record.created_at.ok_or_else(|| integrity("createdAt is null"))?;
        let pushed_at = record.pushed_at.ok_or_else(|| integrity("pushedAt is null"))?;
        let total_issues = record.total_issue_count();
        let closed_issues = record.closed_issue_count();
        if closed_issues > total_issues {
            return Err(integrity(&format!(
                "{closed_issues} closed issues out of {total_issues}"
            )));
        }

        let age_days = days_between(created_at, now);
        let days_since_last_push = days_between(pushed_at, now);
        let issue_resolution_pct = if total_issues > 0 {
            round2(closed_issues as f64 / total_issues as f64 * 100.0)
        } else {
            0.0
        };

        Ok(Self {
            full_name: record.full_name.clone(),
            age_days,
            merged_pull_requests: record.merged_pull_request_count(),
            releases: record.release_count(),
            days_since_last_push,
            primary_language: record
                .primary_language
                .as_ref()
                .map(|language| language.name.clone())
                .unwrap_or_else(|| NO_LANGUAGE.to_string()),
            closed_issues,
            total_issues,
            issue_resolution_pct,
            activity_label: activity(days_since_last_push),
            maturity_label: maturity(age_days),
        })
    }
}

pub fn activity(days_since_last_push: f64) -> Activity {
    if days_since_last_push <= ACTIVE_WITHIN_DAYS {
        Activity::Active
    } else {
        Activity::Inactive
    }
}

pub fn maturity(age_days: f64) -> Maturity {
    if age_days > MATURE_AFTER_DAYS {
        Maturity::Mature
    } else {
        Maturity::Young
    }
}

/// Whole days from `from` to `now`, rounded to two decimals. Timestamps in the
/// future count as zero.
fn days_between(from: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days = (now - from).num_milliseconds() as f64 / MILLIS_PER_DAY;
    round2(days.max(0.0))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Derives one metrics row per record. Absent entries (placeholders for failed
/// fetches) are skipped; a record with missing required fields fails the batch.
pub fn derive_metrics<'a, I>(records: I, now: DateTime<Utc>) -> Result<Vec<RepositoryMetrics>>
where
    I: IntoIterator,
    I::Item: Into<Option<&'a RepositoryRecord>>,
{
    records
        .into_iter()
        .filter_map(|item| -> Option<&RepositoryRecord> { item.into() })
        .map(|record| RepositoryMetrics::derive(record, now))
        .collect()
}

/// Replaces the artifact at `path` with `metrics`. The rows go to a temporary file
/// next to `path` first, so readers never see a half-written artifact.
pub fn write_artifact(path: &Path, metrics: &[RepositoryMetrics]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let file = NamedTempFile::new_in(dir)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer.write_record(COLUMNS)?;
    for row in metrics {
        writer.serialize(row)?;
    }
    let file = writer
        .into_inner()
        .map_err(|err| io::Error::other(err.to_string()))?;
    file.as_file().sync_all()?;
    file.persist(path)?;
    info!(path = %path.display(), rows = metrics.len(), "wrote artifact");
    Ok(())
}

pub fn read_artifact(path: &Path) -> Result<Vec<RepositoryMetrics>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?;
    if headers.iter().ne(COLUMNS) {
        return Err(Error::DataIntegrity {
            repository: path.display().to_string(),
            reason: format!("unexpected artifact header {headers:?}"),
        });
    }
    let rows = reader
        .deserialize::<RepositoryMetrics>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
