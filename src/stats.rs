use std::collections::HashMap;
use std::fmt;

use crate::metrics::{Activity, Maturity, RepositoryMetrics};

/// Count, mean, sample standard deviation, min, median and max of one column.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub median: f64,
    pub max: f64,
}

impl Describe {
    pub fn of(values: &[f64]) -> Option<Self> {
        let mean = mean(values)?;
        let median = median(values)?;
        let std = if values.len() > 1 {
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                / (values.len() - 1) as f64;
            variance.sqrt()
        } else {
            0.0
        };
        Some(Self {
            count: values.len(),
            mean,
            std,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            median,
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Number of repositories per primary language, most common first, ties by name.
pub fn language_counts(metrics: &[RepositoryMetrics]) -> Vec<(String, usize)> {
    let mut counts = HashMap::<&str, usize>::new();
    for row in metrics {
        *counts.entry(row.primary_language.as_str()).or_default() += 1;
    }
    let mut counts = counts
        .into_iter()
        .map(|(language, count)| (language.to_string(), count))
        .collect::<Vec<_>>();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

pub fn column(metrics: &[RepositoryMetrics], f: impl Fn(&RepositoryMetrics) -> f64) -> Vec<f64> {
    metrics.iter().map(f).collect()
}

/// Aggregate view of an artifact, printed after every run.
#[derive(Debug, PartialEq)]
pub struct Summary {
    pub repositories: usize,
    pub columns: Vec<(&'static str, Describe)>,
    pub active: usize,
    pub mature: usize,
    pub languages: Vec<(String, usize)>,
}

impl Summary {
    pub fn from_metrics(metrics: &[RepositoryMetrics]) -> Self {
        let numeric: [(&'static str, fn(&RepositoryMetrics) -> f64); 7] = [
            ("ageDays", |m: &RepositoryMetrics| m.age_days),
            ("mergedPullRequests", |m: &RepositoryMetrics| m.merged_pull_requests as f64),
            ("releases", |m: &RepositoryMetrics| m.releases as f64),
            ("daysSinceLastPush", |m: &RepositoryMetrics| m.days_since_last_push),
            ("closedIssues", |m: &RepositoryMetrics| m.closed_issues as f64),
            ("totalIssues", |m: &RepositoryMetrics| m.total_issues as f64),
            ("issueResolutionPct", |m: &RepositoryMetrics| m.issue_resolution_pct),
        ];
        let columns = numeric
            .into_iter()
            .filter_map(|(name, f)| Describe::of(&column(metrics, f)).map(|d| (name, d)))
            .collect();
        Self {
            repositories: metrics.len(),
            columns,
            active: metrics
                .iter()
                .filter(|m| m.activity_label == Activity::Active)
                .count(),
            mature: metrics
                .iter()
                .filter(|m| m.maturity_label == Maturity::Mature)
                .count(),
            languages: language_counts(metrics),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Repositories analyzed: {}", self.repositories)?;
        if self.repositories == 0 {
            return Ok(());
        }
        writeln!(
            f,
            "{:<20} {:>6} {:>12} {:>12} {:>10} {:>12} {:>12}",
            "column", "count", "mean", "std", "min", "median", "max"
        )?;
        for (name, d) in &self.columns {
            writeln!(
                f,
                "{:<20} {:>6} {:>12.2} {:>12.2} {:>10.2} {:>12.2} {:>12.2}",
                name, d.count, d.mean, d.std, d.min, d.median, d.max
            )?;
        }
        writeln!(
            f,
            "Active (pushed within 30 days): {} / Inactive: {}",
            self.active,
            self.repositories - self.active
        )?;
        writeln!(
            f,
            "Mature (older than 365 days): {} / Young: {}",
            self.mature,
            self.repositories - self.mature
        )?;
        writeln!(f, "Primary languages:")?;
        for (language, count) in &self.languages {
            writeln!(f, "  {language:<20} {count}")?;
        }
        Ok(())
    }
}
