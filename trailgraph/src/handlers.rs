use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::Level;
use trailgraph_core::report::{ReportData, ReportFormat, generate_report, save_report};
use trailgraph_core::{
    BuildOptions, GraphBuilder, MessageRouter, Notice, NoticeCallback, NoticeLevel,
    RenderSession, Request, SessionEvent, TabList, parse_days,
};
use trailgraph_history::{
    HistoryProvider, HttpProvider, MemoryProvider, PlacesProvider, ProviderError, TimeWindow,
    VisitRecord, VisitedUrl,
};
use url::Url;

/// Where history comes from
#[derive(Debug, Clone, PartialEq)]
pub enum HistorySource {
    Places(PathBuf),
    Endpoint(Url),
    Fixture(PathBuf),
}

/// One of the concrete providers, chosen at runtime
pub enum AnyProvider {
    Places(PlacesProvider),
    Http(HttpProvider),
    Memory(MemoryProvider),
}

impl HistoryProvider for AnyProvider {
    async fn query_visited_urls(
        &self,
        window: TimeWindow,
        max_results: usize,
    ) -> Result<Vec<VisitedUrl>, ProviderError> {
        match self {
            AnyProvider::Places(p) => p.query_visited_urls(window, max_results).await,
            AnyProvider::Http(p) => p.query_visited_urls(window, max_results).await,
            AnyProvider::Memory(p) => p.query_visited_urls(window, max_results).await,
        }
    }

    async fn query_visits(&self, url: &str) -> Result<Vec<VisitRecord>, ProviderError> {
        match self {
            AnyProvider::Places(p) => p.query_visits(url).await,
            AnyProvider::Http(p) => p.query_visits(url).await,
            AnyProvider::Memory(p) => p.query_visits(url).await,
        }
    }
}

// Helper functions shared by the graph and view handlers

/// Pick the history source from the mutually exclusive source flags
pub fn history_source(
    places: Option<&String>,
    endpoint: Option<&Url>,
    fixture: Option<&String>,
) -> Result<HistorySource, String> {
    if let Some(places) = places {
        Ok(HistorySource::Places(expand_path(places)))
    } else if let Some(endpoint) = endpoint {
        Ok(HistorySource::Endpoint(endpoint.clone()))
    } else if let Some(fixture) = fixture {
        Ok(HistorySource::Fixture(expand_path(fixture)))
    } else {
        Err("One of --places, --endpoint or --fixture must be provided".to_string())
    }
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

pub fn open_provider(source: &HistorySource, timeout_secs: u64) -> Result<AnyProvider, String> {
    match source {
        // A missing database is an outage, reported by the build as a notice
        HistorySource::Places(path) => Ok(AnyProvider::Places(PlacesProvider::new(path.clone()))),
        HistorySource::Endpoint(url) => HttpProvider::with_timeout(url.clone(), timeout_secs)
            .map(AnyProvider::Http)
            .map_err(|e| format!("Failed to set up history endpoint {}: {}", url, e)),
        HistorySource::Fixture(path) => MemoryProvider::load(path)
            .map(AnyProvider::Memory)
            .map_err(|e| format!("Failed to load fixture {}: {}", path.display(), e)),
    }
}

/// Collect the build tunables from parsed arguments
pub fn build_options(args: &ArgMatches) -> BuildOptions {
    let defaults = BuildOptions::default();
    let timeout = args.get_one::<u64>("timeout").copied().unwrap_or(10);
    BuildOptions {
        max_results: args
            .get_one::<usize>("max-results")
            .copied()
            .unwrap_or(defaults.max_results),
        concurrency: args
            .get_one::<usize>("concurrency")
            .copied()
            .unwrap_or(defaults.concurrency)
            .max(1),
        query_timeout: (timeout > 0).then(|| Duration::from_secs(timeout)),
        clip_to_window: args.get_flag("clip-to-window"),
    }
}

pub fn days_from_args(args: &ArgMatches) -> u32 {
    parse_days(args.get_one::<String>("days").map(String::as_str).unwrap_or(""))
}

/// Load and parse URLs from a file
pub fn load_urls_from_file(path: &Path) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read tabs file {}: {}", path.display(), e))?;

    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| parse_url_line(line.trim()))
        .collect())
}

/// Parse a single line as a URL, trying to add https:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    if let Ok(url) = Url::parse(line)
        && url.has_host()
    {
        return Some(line.to_string());
    }

    let with_scheme = format!("https://{}", line);
    if let Ok(url) = Url::parse(&with_scheme)
        && url.host_str().is_some_and(|h| h.contains('.'))
    {
        return Some(with_scheme);
    }

    eprintln!("{} Skipping invalid URL '{}'", "⚠".yellow(), line);
    None
}

fn source_from_args(args: &ArgMatches) -> Result<HistorySource, String> {
    history_source(
        args.get_one::<String>("places"),
        args.get_one::<Url>("endpoint"),
        args.get_one::<String>("fixture"),
    )
}

fn fail(message: &str) -> ! {
    eprintln!("{} {}", "✗".red().bold(), message);
    std::process::exit(1);
}

fn print_notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Error => eprintln!("{} {}", "✗".red().bold(), notice.message.red()),
        NoticeLevel::Warn => eprintln!("{} {}", "⚠".yellow().bold(), notice.message.yellow()),
        NoticeLevel::Info => eprintln!("{} {}", "→".blue(), notice.message),
    }
}

pub async fn handle_graph(sub_matches: &ArgMatches) {
    let verbose = sub_matches.get_flag("verbose");
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let source = source_from_args(sub_matches).unwrap_or_else(|e| fail(&e));
    let options = build_options(sub_matches);
    let timeout_secs = options.query_timeout.map_or(0, |t| t.as_secs());
    let provider = open_provider(&source, timeout_secs).unwrap_or_else(|e| fail(&e));
    let days = days_from_args(sub_matches);
    let format = sub_matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);
    let output = sub_matches.get_one::<PathBuf>("output");

    let notices: Arc<Mutex<Vec<Notice>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&notices);
    let notice_callback: NoticeCallback = Arc::new(move |notice| {
        if let Ok(mut pending) = sink.lock() {
            pending.push(notice);
        }
    });

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Reading the last {} day(s) of history...", days));

    let builder = GraphBuilder::new(provider)
        .with_options(options)
        .with_notice_callback(notice_callback);
    let graph = builder.build_graph(days).await;
    spinner.finish_and_clear();

    if let Ok(pending) = notices.lock() {
        for notice in pending.iter() {
            print_notice(notice);
        }
    }

    eprintln!(
        "{} Graph complete: {} pages, {} links, {} visits",
        "✓".green().bold(),
        graph.nodes.len(),
        graph.edges.len(),
        graph.visits.len()
    );

    let data = ReportData::from_graph(&graph, days);
    let content = generate_report(&data, &format)
        .unwrap_or_else(|e| fail(&format!("Failed to render report: {}", e)));

    match output {
        Some(path) => {
            if let Err(e) = save_report(&content, path) {
                fail(&format!("Failed to write report {}: {}", path.display(), e));
            }
            eprintln!(
                "{} Report saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
        }
        None => print!("{}", content),
    }
}

pub async fn handle_view(sub_matches: &ArgMatches) {
    // The viewer owns the terminal, so no log subscriber here
    let source = source_from_args(sub_matches).unwrap_or_else(|e| fail(&e));
    let options = build_options(sub_matches);
    let timeout_secs = options.query_timeout.map_or(0, |t| t.as_secs());
    let provider = open_provider(&source, timeout_secs).unwrap_or_else(|e| fail(&e));
    let days = days_from_args(sub_matches);

    let open_tabs = match sub_matches.get_one::<PathBuf>("open-tabs") {
        Some(path) => load_urls_from_file(&expand_path(&path.to_string_lossy()))
            .unwrap_or_else(|e| fail(&e)),
        None => Vec::new(),
    };

    let (event_tx, event_rx) = trailgraph_tui::create_viewer_channel();
    let (request_tx, mut request_rx) = mpsc::unbounded_channel::<Request>();

    let notice_events = event_tx.clone();
    let notice_callback: NoticeCallback = Arc::new(move |notice| {
        let _ = notice_events.send(SessionEvent::Notice(notice));
    });

    let builder = GraphBuilder::new(provider)
        .with_options(options)
        .with_notice_callback(notice_callback);
    let router = Arc::new(MessageRouter::new(builder, TabList::from_urls(open_tabs)));

    // Each request gets its own task so a newer history query can supersede an
    // older one. Admission happens here, in arrival order, before any task runs.
    let dispatcher = tokio::spawn(async move {
        while let Some(request) = request_rx.recv().await {
            let admitted = router.admit(request);
            let router = Arc::clone(&router);
            let events = event_tx.clone();
            tokio::spawn(async move {
                if let Some(response) = router.respond(admitted).await {
                    let _ = events.send(SessionEvent::from(response));
                }
            });
        }
    });

    let should_exit = Arc::new(AtomicBool::new(false));
    let interrupt = Arc::clone(&should_exit);
    let interrupt_watch = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.store(true, Ordering::Relaxed);
        }
    });

    let session = RenderSession::new(days);
    let result = tokio::task::spawn_blocking(move || {
        trailgraph_tui::run_viewer(session, event_rx, request_tx, should_exit)
    })
    .await;

    dispatcher.abort();
    interrupt_watch.abort();

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => fail(&format!("Error running viewer: {}", e)),
        Err(e) => fail(&format!("Viewer task failed: {}", e)),
    }
}
