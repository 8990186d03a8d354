// Firefox places.sqlite reader

use crate::error::{ProviderError, Result};
use crate::provider::HistoryProvider;
use crate::visit::{VisitId, VisitRecord, VisitedUrl};
use crate::window::TimeWindow;
use rusqlite::{Connection, OpenFlags, params};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads history straight out of a Firefox profile's `places.sqlite`.
///
/// Firefox keeps the database locked while running, so point this at a copy
/// when the browser is open.
#[derive(Debug, Clone)]
pub struct PlacesProvider {
    path: PathBuf,
}

impl PlacesProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(path: &Path) -> Result<Connection> {
        if !path.exists() {
            return Err(ProviderError::Unavailable(format!(
                "places database not found at {}",
                path.display()
            )));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| ProviderError::Unavailable(format!("{}: {}", path.display(), e)))?;
        Ok(conn)
    }

    fn visited_urls_blocking(
        path: &Path,
        window: TimeWindow,
        max_results: usize,
    ) -> Result<Vec<VisitedUrl>> {
        let conn = Self::open(path)?;
        let mut stmt = conn.prepare(
            "SELECT p.url, p.title, MAX(v.visit_date) AS last_visit
             FROM moz_places p
             JOIN moz_historyvisits v ON v.place_id = p.id
             WHERE v.visit_date >= ?1 AND v.visit_date <= ?2
             GROUP BY p.id
             ORDER BY last_visit DESC
             LIMIT ?3",
        )?;

        // visit_date is stored in microseconds
        let urls = stmt
            .query_map(
                params![
                    window.start_millis() * 1000,
                    window.end_millis() * 1000,
                    max_results as i64
                ],
                |row| {
                    Ok(VisitedUrl {
                        url: row.get(0)?,
                        title: row.get(1)?,
                        last_visit_time: row.get::<_, Option<i64>>(2)?.map(|us| us / 1000),
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!("places: {} urls in window", urls.len());
        Ok(urls)
    }

    fn visits_blocking(path: &Path, url: &str) -> Result<Vec<VisitRecord>> {
        let conn = Self::open(path)?;
        let mut stmt = conn.prepare(
            "SELECT v.id, v.visit_date, v.from_visit, v.visit_type
             FROM moz_historyvisits v
             JOIN moz_places p ON p.id = v.place_id
             WHERE p.url = ?1
             ORDER BY v.visit_date DESC, v.id DESC",
        )?;

        let visits = stmt
            .query_map(params![url], |row| {
                let id: i64 = row.get(0)?;
                let visit_date: Option<i64> = row.get(1)?;
                let from_visit: Option<i64> = row.get(2)?;
                let visit_type: Option<i64> = row.get(3)?;
                Ok(VisitRecord {
                    visit_id: VisitId::from(id),
                    url: url.to_string(),
                    visit_time: visit_date.map(|us| us / 1000),
                    // 0 marks a visit with no referrer
                    referring_visit_id: from_visit.filter(|v| *v > 0).map(VisitId::from),
                    transition: visit_type.and_then(transition_name).map(str::to_string),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(visits)
    }
}

/// Map a `moz_historyvisits.visit_type` onto the WebExtension transition names
pub fn transition_name(visit_type: i64) -> Option<&'static str> {
    match visit_type {
        1 => Some("link"),
        2 => Some("typed"),
        3 => Some("auto_bookmark"),
        4 => Some("auto_subframe"),
        5 | 6 | 7 => Some("link"),
        8 => Some("manual_subframe"),
        9 => Some("reload"),
        _ => None,
    }
}

impl HistoryProvider for PlacesProvider {
    async fn query_visited_urls(
        &self,
        window: TimeWindow,
        max_results: usize,
    ) -> Result<Vec<VisitedUrl>> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::visited_urls_blocking(&path, window, max_results))
            .await?
    }

    async fn query_visits(&self, url: &str) -> Result<Vec<VisitRecord>> {
        let path = self.path.clone();
        let url = url.to_string();
        tokio::task::spawn_blocking(move || Self::visits_blocking(&path, &url)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    const DAY_US: i64 = 86_400_000_000;

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    fn create_places(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("places.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "
            CREATE TABLE moz_places (
                id INTEGER PRIMARY KEY,
                url LONGVARCHAR,
                title LONGVARCHAR
            );
            CREATE TABLE moz_historyvisits (
                id INTEGER PRIMARY KEY,
                from_visit INTEGER,
                place_id INTEGER,
                visit_date INTEGER,
                visit_type INTEGER
            );
            ",
        )
        .unwrap();

        let now_us = now().timestamp_millis() * 1000;
        conn.execute_batch(&format!(
            "
            INSERT INTO moz_places (id, url, title) VALUES (1, 'https://a.com/', 'A');
            INSERT INTO moz_places (id, url, title) VALUES (2, 'https://b.com/', 'B');
            INSERT INTO moz_places (id, url, title) VALUES (3, 'https://old.com/', 'Old');
            INSERT INTO moz_historyvisits VALUES (10, 0, 1, {a1}, 2);
            INSERT INTO moz_historyvisits VALUES (11, 10, 2, {b1}, 1);
            INSERT INTO moz_historyvisits VALUES (12, 0, 1, {a2}, 9);
            INSERT INTO moz_historyvisits VALUES (13, 0, 3, {old}, 1);
            ",
            a1 = now_us - 3 * DAY_US,
            b1 = now_us - 3 * DAY_US + 1_000_000,
            a2 = now_us - DAY_US,
            old = now_us - 30 * DAY_US,
        ))
        .unwrap();
        path
    }

    #[tokio::test]
    async fn test_visited_urls_in_window_most_recent_first() {
        let dir = TempDir::new().unwrap();
        let provider = PlacesProvider::new(create_places(&dir));

        let urls = provider
            .query_visited_urls(TimeWindow::last_days(7, now()), 1000)
            .await
            .unwrap();

        let names: Vec<&str> = urls.iter().map(|u| u.url.as_str()).collect();
        assert_eq!(names, vec!["https://a.com/", "https://b.com/"]);
        assert_eq!(urls[0].title.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_visited_urls_respects_cap() {
        let dir = TempDir::new().unwrap();
        let provider = PlacesProvider::new(create_places(&dir));

        let urls = provider
            .query_visited_urls(TimeWindow::last_days(60, now()), 2)
            .await
            .unwrap();

        assert_eq!(urls.len(), 2);
    }

    #[tokio::test]
    async fn test_visits_map_referrers_and_transitions() {
        let dir = TempDir::new().unwrap();
        let provider = PlacesProvider::new(create_places(&dir));

        let a_visits = provider.query_visits("https://a.com/").await.unwrap();
        assert_eq!(a_visits.len(), 2);
        assert_eq!(a_visits[0].visit_id, VisitId::from(12));
        assert_eq!(a_visits[0].transition.as_deref(), Some("reload"));
        assert!(a_visits.iter().all(|v| v.referring_visit_id.is_none()));
        assert!(a_visits.iter().all(|v| v.url == "https://a.com/"));

        let b_visits = provider.query_visits("https://b.com/").await.unwrap();
        assert_eq!(b_visits.len(), 1);
        assert_eq!(b_visits[0].referring_visit_id, Some(VisitId::from(10)));
        assert_eq!(b_visits[0].transition.as_deref(), Some("link"));
    }

    #[tokio::test]
    async fn test_unknown_url_has_no_visits() {
        let dir = TempDir::new().unwrap();
        let provider = PlacesProvider::new(create_places(&dir));

        let visits = provider.query_visits("https://nowhere.example/").await.unwrap();
        assert!(visits.is_empty());
    }

    #[tokio::test]
    async fn test_missing_database_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let provider = PlacesProvider::new(dir.path().join("missing.sqlite"));

        let result = provider
            .query_visited_urls(TimeWindow::last_days(7, now()), 1000)
            .await;

        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
    }

    #[test]
    fn test_transition_names() {
        assert_eq!(transition_name(1), Some("link"));
        assert_eq!(transition_name(2), Some("typed"));
        assert_eq!(transition_name(3), Some("auto_bookmark"));
        assert_eq!(transition_name(42), None);
    }
}
