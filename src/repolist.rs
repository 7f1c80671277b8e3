use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Body returned by the GraphQL endpoint. `errors` may accompany partial `data`.
#[derive(Deserialize, PartialEq, Eq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQLError>>,
}

#[derive(Deserialize, PartialEq, Eq, Debug)]
pub struct GraphQLError {
    pub message: String,
}

impl<T> GraphQLResponse<T> {
    pub fn error_message(&self) -> Option<String> {
        self.errors.as_ref().map(|errors| {
            errors
                .iter()
                .map(|error| error.message.as_str())
                .collect::<Vec<_>>()
                .join("; ")
        })
    }
}

#[derive(Deserialize, PartialEq, Eq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SearchData {
    pub search: Search,
}

#[derive(Deserialize, PartialEq, Eq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Search {
    pub repos: Vec<Repo>,
    pub page_info: PageInfo,
}

#[derive(Deserialize, PartialEq, Eq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Repo {
    /// Null when the search hit is not a repository the token can see.
    pub repo: Option<RepoNode>,
}

#[derive(Deserialize, PartialEq, Eq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RepoNode {
    pub owner: Owner,
    pub name: String,
}

#[derive(Deserialize, PartialEq, Eq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub login: String,
}

#[derive(Deserialize, PartialEq, Eq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

/// Owner and name of a repository, enough to look up its details.
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct RepositoryIdentifier {
    pub owner: String,
    pub name: String,
}

impl RepositoryIdentifier {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepositoryIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl From<RepoNode> for RepositoryIdentifier {
    fn from(node: RepoNode) -> Self {
        Self::new(node.owner.login, node.name)
    }
}

#[derive(Deserialize, PartialEq, Eq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryData {
    pub repository: Option<RepositoryRecord>,
}

/// Raw detail payload of one repository. `created_at` and `pushed_at` stay optional
/// here because the API may null them; the deriver rejects such records.
#[derive(Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRecord {
    #[serde(rename = "nameWithOwner")]
    pub full_name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub primary_language: Option<Language>,
    pub releases: Count,
    pub pull_requests: Count,
    pub issues: Count,
    pub closed_issues: Count,
}

#[derive(Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct Language {
    pub name: String,
}

#[derive(Deserialize, PartialEq, Eq, Debug, Clone, Copy, Default)]
#[serde(rename_all = "camelCase")]
pub struct Count {
    pub total_count: u64,
}

impl RepositoryRecord {
    pub fn release_count(&self) -> u64 {
        self.releases.total_count
    }

    pub fn merged_pull_request_count(&self) -> u64 {
        self.pull_requests.total_count
    }

    pub fn total_issue_count(&self) -> u64 {
        self.issues.total_count
    }

    pub fn closed_issue_count(&self) -> u64 {
        self.closed_issues.total_count
    }
}

#[test]
fn search_page() {
    let json = serde_json::from_str::<GraphQLResponse<SearchData>>(
        r#"
{
  "data": {
    "search": {
      "repos": [
        {
          "repo": {
            "owner": { "login": "freeCodeCamp" },
            "name": "freeCodeCamp"
          }
        },
        { "repo": null },
        {
          "repo": {
            "owner": { "login": "EbookFoundation" },
            "name": "free-programming-books"
          }
        }
      ],
      "pageInfo": {
        "endCursor": "Y3Vyc29yOjM=",
        "hasNextPage": true
      }
    }
  }
}
"#,
    )
    .unwrap();
    assert_eq!(
        json,
        GraphQLResponse {
            data: Some(SearchData {
                search: Search {
                    repos: vec![
                        Repo {
                            repo: Some(RepoNode {
                                owner: Owner {
                                    login: "freeCodeCamp".to_string()
                                },
                                name: "freeCodeCamp".to_string()
                            })
                        },
                        Repo { repo: None },
                        Repo {
                            repo: Some(RepoNode {
                                owner: Owner {
                                    login: "EbookFoundation".to_string()
                                },
                                name: "free-programming-books".to_string()
                            })
                        }
                    ],
                    page_info: PageInfo {
                        end_cursor: Some("Y3Vyc29yOjM=".to_string()),
                        has_next_page: true
                    }
                }
            }),
            errors: None
        }
    )
}

#[test]
fn repository_detail() {
    let json = serde_json::from_str::<GraphQLResponse<RepositoryData>>(
        r#"
{
  "data": {
    "repository": {
      "nameWithOwner": "rust-lang/rust",
      "createdAt": "2010-06-16T20:39:03Z",
      "pushedAt": "2026-10-17T08:12:45Z",
      "primaryLanguage": { "name": "Rust" },
      "releases": { "totalCount": 250 },
      "pullRequests": { "totalCount": 90000 },
      "issues": { "totalCount": 50000 },
      "closedIssues": { "totalCount": 40000 }
    }
  }
}
"#,
    )
    .unwrap();
    let record = json.data.unwrap().repository.unwrap();
    assert_eq!(record.full_name, "rust-lang/rust");
    assert_eq!(
        record.created_at.unwrap().to_rfc3339(),
        "2010-06-16T20:39:03+00:00"
    );
    assert_eq!(record.primary_language.as_ref().unwrap().name, "Rust");
    assert_eq!(record.merged_pull_request_count(), 90000);
    assert_eq!(record.closed_issue_count(), 40000);
}

#[test]
fn missing_repository_with_errors() {
    let json = serde_json::from_str::<GraphQLResponse<RepositoryData>>(
        r#"
{
  "data": { "repository": null },
  "errors": [
    { "type": "NOT_FOUND", "path": ["repository"], "message": "Could not resolve to a Repository with the name 'gone/away'." }
  ]
}
"#,
    )
    .unwrap();
    assert_eq!(json.data, Some(RepositoryData { repository: None }));
    assert_eq!(
        json.error_message().unwrap(),
        "Could not resolve to a Repository with the name 'gone/away'."
    );
}
