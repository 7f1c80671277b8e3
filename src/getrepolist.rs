use std::collections::HashSet;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::graphql::{QueryExecutor, into_data};
use crate::pacing::Pacer;
use crate::repolist::{RepositoryIdentifier, SearchData};

const QUERY: &str = r#"query ($pageSize: Int!, $cursor: String) {
  search(type: REPOSITORY, query: "is:public sort:stars-desc", first: $pageSize, after: $cursor) {
    repos: edges {
      repo: node {
        ... on Repository {
          owner {
            login
          }
          name
        }
      }
    }
    pageInfo {
      endCursor
      hasNextPage
    }
  }
}"#;

/// Collects up to `target` of the most-starred public repositories, in ranking order
/// and without duplicates. Any failed page aborts the listing.
pub fn list_top(
    executor: &impl QueryExecutor,
    pacer: &impl Pacer,
    target: usize,
    page_size: usize,
) -> Result<Vec<RepositoryIdentifier>> {
    let mut repos = Vec::with_capacity(target.min(page_size));
    let mut seen = HashSet::new();
    let mut cursor: Option<String> = None;
    let mut page = 0usize;

    while repos.len() < target {
        if page > 0 {
            pacer.wait_before_next_call();
        }
        page += 1;
        let body = executor.execute(QUERY, json!({ "pageSize": page_size, "cursor": cursor }))?;
        let search = into_data::<SearchData>(body)?.search;

        let before = repos.len();
        for node in search.repos.into_iter().filter_map(|r| r.repo) {
            let id = RepositoryIdentifier::from(node);
            if seen.insert(id.clone()) {
                repos.push(id);
            }
        }
        debug!(page, added = repos.len() - before, total = repos.len(), "listed page");

        if !search.page_info.has_next_page {
            break;
        }
        let Some(end_cursor) = search.page_info.end_cursor else {
            return Err(Error::GraphQLResponse(
                "hasNextPage is true but endCursor is null".to_string(),
            ));
        };
        if cursor.as_ref() == Some(&end_cursor) {
            return Err(Error::GraphQLResponse(format!(
                "cursor {end_cursor} did not advance"
            )));
        }
        cursor = Some(end_cursor);
    }

    if repos.len() < target {
        warn!(
            found = repos.len(),
            target, "search exhausted before reaching the target count"
        );
    }
    repos.truncate(target);
    info!(count = repos.len(), pages = page, "listed repositories");
    Ok(repos)
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::graphql::testing::ScriptedExecutor;
    use crate::pacing::testing::CountingPacer;

    fn page(names: &[&str], end_cursor: Option<&str>, has_next_page: bool) -> Result<Value> {
        let repos = names
            .iter()
            .map(|name| json!({ "repo": { "owner": { "login": "org" }, "name": name } }))
            .collect::<Vec<_>>();
        Ok(json!({
            "data": {
                "search": {
                    "repos": repos,
                    "pageInfo": { "endCursor": end_cursor, "hasNextPage": has_next_page }
                }
            }
        }))
    }

    fn names(ids: &[RepositoryIdentifier]) -> Vec<String> {
        ids.iter().map(|id| id.name.clone()).collect()
    }

    #[test]
    fn stops_at_target_and_truncates() {
        let executor = ScriptedExecutor::new([
            page(&["a", "b", "c"], Some("c1"), true),
            page(&["d", "e", "f"], Some("c2"), true),
        ]);
        let pacer = CountingPacer::default();
        let ids = list_top(&executor, &pacer, 5, 3).unwrap();
        assert_eq!(names(&ids), ["a", "b", "c", "d", "e"]);
        assert_eq!(executor.call_count(), 2);
        assert_eq!(pacer.waits.get(), 1);
    }

    #[test]
    fn advances_cursor_between_pages() {
        let executor = ScriptedExecutor::new([
            page(&["a"], Some("c1"), true),
            page(&["b"], Some("c2"), true),
            page(&["c"], None, false),
        ]);
        list_top(&executor, &CountingPacer::default(), 10, 1).unwrap();
        let calls = executor.calls.borrow();
        assert_eq!(calls[0]["cursor"], Value::Null);
        assert_eq!(calls[1]["cursor"], "c1");
        assert_eq!(calls[2]["cursor"], "c2");
        assert_eq!(calls[0]["pageSize"], 1);
    }

    #[test]
    fn exhausted_source_returns_what_is_available() {
        let executor = ScriptedExecutor::new([
            page(&["a", "b"], Some("c1"), true),
            page(&["c"], Some("c2"), false),
        ]);
        let ids = list_top(&executor, &CountingPacer::default(), 100, 2).unwrap();
        assert_eq!(names(&ids), ["a", "b", "c"]);
    }

    #[test]
    fn drops_duplicates_and_non_repository_hits() {
        let executor = ScriptedExecutor::new([
            page(&["a", "b"], Some("c1"), true),
            Ok(json!({
                "data": {
                    "search": {
                        "repos": [
                            { "repo": { "owner": { "login": "org" }, "name": "b" } },
                            { "repo": null },
                            { "repo": { "owner": { "login": "org" }, "name": "c" } }
                        ],
                        "pageInfo": { "endCursor": "c2", "hasNextPage": false }
                    }
                }
            })),
        ]);
        let ids = list_top(&executor, &CountingPacer::default(), 10, 2).unwrap();
        assert_eq!(names(&ids), ["a", "b", "c"]);
        let unique = ids.iter().collect::<HashSet<_>>();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn huge_target_returns_what_is_available() {
        let executor = ScriptedExecutor::new([page(&["only"], None, false)]);
        let ids = list_top(&executor, &CountingPacer::default(), usize::MAX, 100).unwrap();
        assert_eq!(names(&ids), ["only"]);
    }

    #[test]
    fn zero_target_makes_no_calls() {
        let executor = ScriptedExecutor::default();
        let ids = list_top(&executor, &CountingPacer::default(), 0, 100).unwrap();
        assert!(ids.is_empty());
        assert_eq!(executor.call_count(), 0);
    }

    #[test]
    fn graphql_errors_abort_listing() {
        let executor = ScriptedExecutor::new([
            page(&["a"], Some("c1"), true),
            Ok(json!({ "errors": [{ "message": "API rate limit exceeded" }] })),
        ]);
        let err = list_top(&executor, &CountingPacer::default(), 10, 1).unwrap_err();
        assert!(matches!(err, Error::GraphQLResponse(m) if m.contains("rate limit")));
    }

    #[test]
    fn transport_errors_abort_listing() {
        let executor = ScriptedExecutor::new([Err(Error::Transport {
            status: 502,
            body: "Bad Gateway".to_string(),
        })]);
        let err = list_top(&executor, &CountingPacer::default(), 10, 1).unwrap_err();
        assert!(matches!(err, Error::Transport { status: 502, .. }));
    }

    #[test]
    fn missing_or_stuck_cursor_is_an_error() {
        let executor = ScriptedExecutor::new([page(&["a"], None, true)]);
        assert!(matches!(
            list_top(&executor, &CountingPacer::default(), 10, 1),
            Err(Error::GraphQLResponse(_))
        ));

        let executor = ScriptedExecutor::new([
            page(&["a"], Some("c1"), true),
            page(&["b"], Some("c1"), true),
        ]);
        assert!(matches!(
            list_top(&executor, &CountingPacer::default(), 10, 1),
            Err(Error::GraphQLResponse(_))
        ));
    }
}
