//! Paged listing helpers.

use thunderdrive_api::{Entry, EntryQuery};
use thunderdrive_transfer::{RetryPolicy, retry};
use tracing::debug;

use crate::connection::DriveConnection;
use crate::error::DriveError;

/// Collects entries for `query`, page by page.
///
/// Stops once `limit` entries are collected (the result is truncated to
/// exactly `limit`), the last page was read, or a page came back empty.
/// Each page request is retried on its own.
pub async fn fetch_entries(
    conn: &dyn DriveConnection,
    query: &EntryQuery,
    limit: Option<usize>,
    policy: &RetryPolicy,
) -> Result<Vec<Entry>, DriveError> {
    let mut entries = Vec::new();
    if limit == Some(0) {
        return Ok(entries);
    }

    let mut page: u32 = 1;
    loop {
        let batch = retry(policy, "list entries", || conn.list_entries(query, page)).await?;
        let last_page = batch.last_page.max(1);
        let empty = batch.data.is_empty();
        entries.extend(batch.data);
        debug!(?query, page, last_page, collected = entries.len(), "listing page");

        if let Some(limit) = limit
            && entries.len() >= limit
        {
            entries.truncate(limit);
            break;
        }
        if empty || page >= last_page {
            break;
        }
        page += 1;
    }
    Ok(entries)
}

/// Every entry matching `phrase`.
pub async fn search(
    conn: &dyn DriveConnection,
    phrase: &str,
    policy: &RetryPolicy,
) -> Result<Vec<Entry>, DriveError> {
    fetch_entries(conn, &EntryQuery::Search(phrase.to_string()), None, policy).await
}

/// The `n` most recently modified entries.
pub async fn recent(
    conn: &dyn DriveConnection,
    n: usize,
    policy: &RetryPolicy,
) -> Result<Vec<Entry>, DriveError> {
    fetch_entries(conn, &EntryQuery::Recent, Some(n), policy).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDrive;
    use std::time::Duration;
    use thunderdrive_api::EntriesPage;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            initial_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
            max_delay: Duration::from_millis(1),
        }
    }

    fn page(names: &[&str], current: u32, last: u32) -> EntriesPage {
        EntriesPage {
            data: names
                .iter()
                .map(|n| Entry {
                    name: n.to_string(),
                    kind: "file".into(),
                    ..Default::default()
                })
                .collect(),
            current_page: current,
            last_page: last,
        }
    }

    fn names(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[tokio::test]
    async fn walks_every_page_until_last() {
        let drive = MockDrive::new().with_pages(vec![
            page(&["a", "b"], 1, 3),
            page(&["c"], 2, 3),
            page(&["d"], 3, 3),
        ]);

        let got = search(&drive, "x", &policy()).await.unwrap();

        assert_eq!(names(&got), vec!["a", "b", "c", "d"]);
        let queries = drive.queries.lock().unwrap();
        let pages: Vec<u32> = queries.iter().map(|(_, p)| *p).collect();
        assert_eq!(pages, vec![1, 2, 3]);
        assert_eq!(queries[0].0, EntryQuery::Search("x".into()));
    }

    #[tokio::test]
    async fn stops_and_truncates_at_limit() {
        let drive = MockDrive::new().with_pages(vec![
            page(&["a", "b"], 1, 3),
            page(&["c", "d"], 2, 3),
            page(&["e"], 3, 3),
        ]);

        let got = recent(&drive, 3, &policy()).await.unwrap();

        assert_eq!(names(&got), vec!["a", "b", "c"]);
        assert_eq!(drive.queries.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn limit_beyond_available_returns_everything() {
        let drive = MockDrive::new().with_pages(vec![page(&["a"], 1, 2), page(&["b"], 2, 2)]);
        let got = recent(&drive, 50, &policy()).await.unwrap();
        assert_eq!(names(&got), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn empty_page_ends_listing() {
        let drive = MockDrive::new().with_pages(vec![page(&["a"], 1, 9), page(&[], 2, 9)]);
        let got = search(&drive, "q", &policy()).await.unwrap();
        assert_eq!(names(&got), vec!["a"]);
        assert_eq!(drive.queries.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn zero_limit_makes_no_request() {
        let drive = MockDrive::new();
        let got = recent(&drive, 0, &policy()).await.unwrap();
        assert!(got.is_empty());
        assert!(drive.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn page_failure_surfaces_after_retries() {
        let drive = MockDrive::new().with_pages(vec![page(&["a"], 1, 2)]);
        let err = search(&drive, "q", &policy()).await.unwrap_err();
        assert!(matches!(err, DriveError::Transport(_)));
        // page 2 asked twice
        assert_eq!(drive.queries.lock().unwrap().len(), 3);
    }
}
