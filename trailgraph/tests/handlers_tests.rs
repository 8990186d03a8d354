use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;
use trailgraph::handlers::*;
use trailgraph_core::{GraphBuilder, Notice, NoticeLevel};
use url::Url;

#[test]
fn test_parse_url_line_with_scheme() {
    let result = parse_url_line("https://example.com/page");
    assert_eq!(result, Some("https://example.com/page".to_string()));
}

#[test]
fn test_parse_url_line_without_scheme() {
    let result = parse_url_line("example.com");
    assert_eq!(result, Some("https://example.com".to_string()));
}

#[test]
fn test_parse_url_line_invalid() {
    assert_eq!(parse_url_line("not a valid url!!!"), None);
}

#[test]
fn test_load_urls_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, "https://example.com/")?;
    writeln!(temp_file, "news.example.org")?;
    writeln!(temp_file)?; // Empty line
    writeln!(temp_file, "definitely not a url")?;
    writeln!(temp_file, "https://api.example.com/v1")?;

    let urls = load_urls_from_file(temp_file.path())?;

    assert_eq!(
        urls,
        vec![
            "https://example.com/".to_string(),
            "https://news.example.org".to_string(),
            "https://api.example.com/v1".to_string(),
        ]
    );
    Ok(())
}

#[test]
fn test_load_urls_from_missing_file() {
    let result = load_urls_from_file(&PathBuf::from("/nonexistent/tabs.txt"));
    assert!(result.unwrap_err().contains("Failed to read tabs file"));
}

#[test]
fn test_history_source_requires_one_flag() {
    let result = history_source(None, None, None);
    assert!(result.unwrap_err().contains("--places"));
}

#[test]
fn test_history_source_prefers_given_flag() {
    let endpoint = Url::parse("http://127.0.0.1:8080/").unwrap();
    assert_eq!(
        history_source(None, Some(&endpoint), None),
        Ok(HistorySource::Endpoint(endpoint.clone()))
    );

    let fixture = "history.json".to_string();
    assert_eq!(
        history_source(None, None, Some(&fixture)),
        Ok(HistorySource::Fixture(PathBuf::from("history.json")))
    );
}

#[tokio::test]
async fn test_missing_places_file_gives_empty_graph_and_notice()
-> Result<(), Box<dyn std::error::Error>> {
    let source = HistorySource::Places(PathBuf::from("/nonexistent/places.sqlite"));
    let provider = open_provider(&source, 10)?;

    let seen: Arc<Mutex<Vec<Notice>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let graph = GraphBuilder::new(provider)
        .with_notice_callback(Arc::new(move |notice: Notice| {
            sink.lock().unwrap().push(notice)
        }))
        .build_graph(7)
        .await;

    assert!(graph.is_empty());
    let notices = seen.lock().unwrap();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert!(notices[0].message.contains("History unavailable"));
    Ok(())
}

#[test]
fn test_open_provider_rejects_bad_fixture() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, "{{ not json")?;

    let source = HistorySource::Fixture(temp_file.path().to_path_buf());
    assert!(open_provider(&source, 10).is_err());
    Ok(())
}

#[tokio::test]
async fn test_fixture_provider_builds_graph() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    write!(
        temp_file,
        r#"{{
            "urls": [{{"url": "https://a.com/"}}, {{"url": "https://b.com/"}}],
            "visits": {{
                "https://a.com/": [{{"visitId": "1", "url": "https://a.com/"}}],
                "https://b.com/": [{{"visitId": 2, "url": "https://b.com/", "referringVisitId": "1"}}]
            }}
        }}"#
    )?;

    let source = HistorySource::Fixture(temp_file.path().to_path_buf());
    let provider = open_provider(&source, 10)?;
    let graph = GraphBuilder::new(provider).build_graph(7).await;

    assert_eq!(graph.nodes.len(), 2);
    assert_eq!(graph.edges.len(), 1);
    assert_eq!(graph.edges[0].source, "https://a.com/");
    Ok(())
}

#[test]
fn test_build_options_from_args() {
    let command = clap::Command::new("t")
        .arg(clap::arg!(--"max-results" <NUM>).value_parser(clap::value_parser!(usize)))
        .arg(clap::arg!(--"concurrency" <NUM>).value_parser(clap::value_parser!(usize)))
        .arg(clap::arg!(--"timeout" <SECONDS>).value_parser(clap::value_parser!(u64)))
        .arg(clap::arg!(--"clip-to-window").action(clap::ArgAction::SetTrue))
        .arg(clap::arg!(-d --"days" <DAYS>).allow_hyphen_values(true));

    let matches = command
        .clone()
        .try_get_matches_from(["t", "--concurrency", "0", "--timeout", "0", "--clip-to-window", "-d", "-3"])
        .unwrap();
    let options = build_options(&matches);
    assert_eq!(options.concurrency, 1);
    assert_eq!(options.query_timeout, None);
    assert!(options.clip_to_window);
    assert_eq!(options.max_results, 1000);
    assert_eq!(days_from_args(&matches), 7);

    let matches = command
        .try_get_matches_from(["t", "--timeout", "3", "--days", "30"])
        .unwrap();
    let options = build_options(&matches);
    assert_eq!(options.query_timeout, Some(Duration::from_secs(3)));
    assert_eq!(days_from_args(&matches), 30);
}
