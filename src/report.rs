use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use tracing::info;

use crate::error::Result;
use crate::metrics::{Activity, Maturity, NO_LANGUAGE, RepositoryMetrics};
use crate::stats::{column, language_counts, mean, median};

pub const MAINSTREAM_LANGUAGES: [&str; 6] =
    ["JavaScript", "Python", "TypeScript", "Java", "C++", "C#"];

const CONFIRMED: &str = "✅ Hypothesis confirmed";
const REFUTED: &str = "❌ Hypothesis refuted";
const PARTIAL: &str = "⚠️ Hypothesis partially confirmed";

/// Renders the markdown research report for one artifact.
pub fn render(metrics: &[RepositoryMetrics], date: NaiveDate) -> String {
    let total = metrics.len();
    let mut report = format!(
        "# Analysis of Popular GitHub Repositories

**Analysis date:** {}
**Repositories analyzed:** {total}

",
        date.format("%d/%m/%Y")
    );
    report.push_str(INTRODUCTION);
    if total == 0 {
        report.push_str("## 3. Results\n\nNo repositories were analyzed, so no hypothesis could be tested.\n");
        return report;
    }
    report.push_str("## 3. Results\n\n");
    report.push_str(&age_section(metrics));
    report.push_str(&pull_request_section(metrics));
    report.push_str(&release_section(metrics));
    report.push_str(&recency_section(metrics));
    report.push_str(&language_section(metrics));
    report.push_str(&issue_section(metrics));
    report.push_str(&per_language_section(metrics));
    report.push_str(DISCUSSION);
    report
}

pub fn write_report(path: &Path, report: &str) -> Result<()> {
    fs::write(path, report)?;
    info!(path = %path.display(), "wrote report");
    Ok(())
}

const INTRODUCTION: &str = "## 1. Introduction and Hypotheses

This study looks at the most popular repositories on GitHub to understand their maturity, contributions, releases, update frequency, languages and issue resolution.

### Informal hypotheses:
- **H1:** Popular repositories tend to be mature (older than one year)
- **H2:** Popular repositories receive many external contributions
- **H3:** Popular repositories publish releases frequently
- **H4:** Popular repositories are updated frequently
- **H5:** Popular repositories use mainstream languages (JavaScript, Python, TypeScript)
- **H6:** Popular repositories close a high share of their issues (>80%)

## 2. Methodology

The GitHub GraphQL API was used to collect the most popular public repositories, ordered by stars. For each repository we collected:

- Creation date and date of the last push
- Total number of merged pull requests
- Number of releases
- Primary language
- Total and closed issues

";

const DISCUSSION: &str = "## 5. Discussion

### Main findings:
1. **Maturity:** Popular repositories tend to be projects established several years ago
2. **Contributions:** Vary widely, with some projects receiving tens of thousands of contributions
3. **Releases:** Many popular projects do not use GitHub's release feature
4. **Updates:** Update frequency varies, some projects are very active and others much less
5. **Languages:** A mix of mainstream and specialised languages
6. **Issues:** Most projects keep a good issue resolution rate

### Conclusions:
The most popular repositories on GitHub are diverse, but tend to be mature, well maintained projects with good issue management and active community contributions.
";

fn pct(part: usize, whole: usize) -> f64 {
    part as f64 / whole as f64 * 100.0
}

fn formatted(value: u64) -> String {
    let mut buf = num_format::Buffer::default();
    buf.write_formatted(&value, &num_format::Locale::en);
    buf.to_string()
}

fn age_section(metrics: &[RepositoryMetrics]) -> String {
    let total = metrics.len();
    let ages = column(metrics, |m| m.age_days);
    let median_age = median(&ages).unwrap_or_default();
    let mean_age = mean(&ages).unwrap_or_default();
    let mature = metrics
        .iter()
        .filter(|m| m.maturity_label == Maturity::Mature)
        .count();
    let verdict = if pct(mature, total) > 70.0 {
        CONFIRMED
    } else {
        REFUTED
    };
    format!(
        "### RQ01: Are popular systems mature/old?
**Metric:** Repository age in days

- **Median age:** {median_age:.2} days ({:.2} years)
- **Mean age:** {mean_age:.2} days ({:.2} years)
- **Mature repositories (>1 year):** {mature} of {total} ({:.1}%)

**Result:** {verdict} - Most popular repositories are mature.

",
        median_age / 365.0,
        mean_age / 365.0,
        pct(mature, total)
    )
}

fn pull_request_section(metrics: &[RepositoryMetrics]) -> String {
    let prs = column(metrics, |m| m.merged_pull_requests as f64);
    let median_prs = median(&prs).unwrap_or_default();
    let mean_prs = mean(&prs).unwrap_or_default();
    // first listed repository wins a tie
    let top = metrics
        .iter()
        .reduce(|best, m| {
            if m.merged_pull_requests > best.merged_pull_requests {
                m
            } else {
                best
            }
        })
        .map(|m| format!("{} ({} PRs)", m.full_name, formatted(m.merged_pull_requests)))
        .unwrap_or_default();
    let verdict = if median_prs > 500.0 { CONFIRMED } else { PARTIAL };
    format!(
        "### RQ02: Do popular systems receive many external contributions?
**Metric:** Total merged pull requests

- **Median merged PRs:** {median_prs:.0}
- **Mean merged PRs:** {mean_prs:.2}
- **Repository with most PRs:** {top}

**Result:** {verdict} - Popular repositories receive significant contributions.

"
    )
}

fn release_section(metrics: &[RepositoryMetrics]) -> String {
    let total = metrics.len();
    let releases = column(metrics, |m| m.releases as f64);
    let median_releases = median(&releases).unwrap_or_default();
    let mean_releases = mean(&releases).unwrap_or_default();
    let with_releases = metrics.iter().filter(|m| m.releases > 0).count();
    let (verdict, reason) = if median_releases == 0.0 {
        (REFUTED, "Many repositories do not use GitHub's release feature")
    } else {
        (CONFIRMED, "Popular repositories publish releases regularly")
    };
    format!(
        "### RQ03: Do popular systems release frequently?
**Metric:** Total releases

- **Median releases:** {median_releases:.0}
- **Mean releases:** {mean_releases:.2}
- **Repositories with releases:** {with_releases} of {total} ({:.1}%)

**Result:** {verdict} - {reason}.

",
        pct(with_releases, total)
    )
}

fn recency_section(metrics: &[RepositoryMetrics]) -> String {
    let total = metrics.len();
    let days = column(metrics, |m| m.days_since_last_push);
    let median_days = median(&days).unwrap_or_default();
    let mean_days = mean(&days).unwrap_or_default();
    let active = metrics
        .iter()
        .filter(|m| m.activity_label == Activity::Active)
        .count();
    let (verdict, reason) = if pct(active, total) > 50.0 {
        (CONFIRMED, "Most repositories are updated frequently")
    } else {
        (REFUTED, "Not every repository is updated frequently")
    };
    format!(
        "### RQ04: Are popular systems updated frequently?
**Metric:** Time since the last update

- **Median days since last update:** {median_days:.2} days
- **Mean days since last update:** {mean_days:.2} days
- **Active repositories (last 30 days):** {active} of {total} ({:.1}%)

**Result:** {verdict} - {reason}.

",
        pct(active, total)
    )
}

fn language_section(metrics: &[RepositoryMetrics]) -> String {
    let total = metrics.len();
    let mut section = "### RQ05: Are popular systems written in the most popular languages?
**Metric:** Primary language

**Distribution by language:**
"
    .to_string();
    for (language, count) in language_counts(metrics) {
        section.push_str(&format!(
            "- **{language}:** {count} repositor{} ({:.1}%)\n",
            if count == 1 { "y" } else { "ies" },
            pct(count, total)
        ));
    }
    let mainstream = metrics
        .iter()
        .filter(|m| MAINSTREAM_LANGUAGES.contains(&m.primary_language.as_str()))
        .count();
    let (verdict, reason) = if pct(mainstream, total) > 50.0 {
        (CONFIRMED, "Most use mainstream languages")
    } else {
        (REFUTED, "Languages are diverse")
    };
    section.push_str(&format!(
        "
**Repositories in mainstream languages:** {mainstream} of {total} ({:.1}%)

**Result:** {verdict} - {reason}.

",
        pct(mainstream, total)
    ));
    section
}

fn issue_section(metrics: &[RepositoryMetrics]) -> String {
    let mut section = "### RQ06: Do popular systems close a high share of their issues?
**Metric:** Issue resolution rate

"
    .to_string();
    let with_issues = metrics
        .iter()
        .filter(|m| m.total_issues > 0)
        .cloned()
        .collect::<Vec<_>>();
    if with_issues.is_empty() {
        section.push_str("No repository has issues, so the resolution rate is undefined.\n\n");
        return section;
    }
    let rates = column(&with_issues, |m| m.issue_resolution_pct);
    let median_rate = median(&rates).unwrap_or_default();
    let mean_rate = mean(&rates).unwrap_or_default();
    let high = rates.iter().filter(|&&rate| rate > 80.0).count();
    let (verdict, reason) = if median_rate > 80.0 {
        (CONFIRMED, "Popular repositories keep a high resolution rate")
    } else {
        (REFUTED, "The resolution rate varies significantly")
    };
    section.push_str(&format!(
        "- **Median resolution rate:** {median_rate:.2}%
- **Mean resolution rate:** {mean_rate:.2}%
- **Repositories with high resolution (>80%):** {high} of {} ({:.1}%)

**Result:** {verdict} - {reason}.

",
        with_issues.len(),
        pct(high, with_issues.len())
    ));
    section
}

fn per_language_section(metrics: &[RepositoryMetrics]) -> String {
    let mut section = "## 4. Analysis by Language (RQ07)

**Question:** Do systems written in more popular languages receive more external contributions, release more often and get updated more frequently?

"
    .to_string();
    for (language, count) in language_counts(metrics) {
        if language == NO_LANGUAGE {
            continue;
        }
        let subset = metrics
            .iter()
            .filter(|m| m.primary_language == language)
            .cloned()
            .collect::<Vec<_>>();
        let prs = median(&column(&subset, |m| m.merged_pull_requests as f64)).unwrap_or_default();
        let releases = median(&column(&subset, |m| m.releases as f64)).unwrap_or_default();
        let days = median(&column(&subset, |m| m.days_since_last_push)).unwrap_or_default();
        section.push_str(&format!(
            "### {language}
- **Number of repositories:** {count}
- **Merged PRs (median):** {prs:.0}
- **Releases (median):** {releases:.0}
- **Days since last update (median):** {days:.2}

"
        ));
    }
    section
}
