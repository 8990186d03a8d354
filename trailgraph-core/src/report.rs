// Report generation from a visit graph

use crate::index::GraphIndex;
use crate::model::Graph;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub const RECENT_VISIT_LIMIT: usize = 10;
pub const TOP_REFERRER_LIMIT: usize = 10;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    pub days: u32,
    pub summary: GraphSummary,
    pub hosts: Vec<HostCount>,
    pub edges: Vec<EdgeRow>,
    pub recent_visits: Vec<VisitRow>,
    pub top_referrers: Vec<ReferrerCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub total_visits: usize,
    pub total_hosts: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCount {
    pub host: String,
    pub nodes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRow {
    pub source: String,
    pub target: String,
    pub visit_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRow {
    pub visit_id: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visit_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referring_visit_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferrerCount {
    pub url: String,
    pub out_degree: usize,
}

impl ReportData {
    pub fn from_graph(graph: &Graph, days: u32) -> Self {
        let index = GraphIndex::new(graph);

        // Host counts, most nodes first
        let mut host_counts: HashMap<String, usize> = HashMap::new();
        for node in &graph.nodes {
            *host_counts.entry(host_of(&node.url)).or_default() += 1;
        }
        let mut hosts: Vec<HostCount> = host_counts
            .into_iter()
            .map(|(host, nodes)| HostCount { host, nodes })
            .collect();
        hosts.sort_by(|a, b| b.nodes.cmp(&a.nodes).then_with(|| a.host.cmp(&b.host)));

        let edges = graph
            .edges
            .iter()
            .map(|e| EdgeRow {
                source: e.source.clone(),
                target: e.target.clone(),
                visit_id: e.visit_id.to_string(),
            })
            .collect();

        let recent_visits = graph
            .recent_visits(RECENT_VISIT_LIMIT)
            .into_iter()
            .map(|v| VisitRow {
                visit_id: v.visit_id.to_string(),
                url: v.url.clone(),
                visit_time: v.visit_time,
                referring_visit_id: v.referring_visit_id.as_ref().map(|r| r.to_string()),
                transition: v.transition.clone(),
            })
            .collect();

        // Stable sort keeps node order among ties
        let mut top_referrers: Vec<ReferrerCount> = graph
            .nodes
            .iter()
            .map(|n| ReferrerCount {
                url: n.url.clone(),
                out_degree: index.out_degree(&n.url),
            })
            .filter(|r| r.out_degree > 0)
            .collect();
        top_referrers.sort_by(|a, b| b.out_degree.cmp(&a.out_degree));
        top_referrers.truncate(TOP_REFERRER_LIMIT);

        ReportData {
            days,
            summary: GraphSummary {
                total_nodes: graph.nodes.len(),
                total_edges: graph.edges.len(),
                total_visits: graph.visits.len(),
                total_hosts: hosts.len(),
            },
            hosts,
            edges,
            recent_visits,
            top_referrers,
        }
    }
}

pub fn generate_text_report(data: &ReportData) -> String {
    let mut report = String::new();

    report.push_str(RULE);
    report.push_str("                        TRAILGRAPH NAVIGATION REPORT\n");
    report.push_str(RULE);
    report.push('\n');

    report.push_str(&format!("Lookback:     {} day(s)\n", data.days));
    report.push_str(&format!("Pages:        {}\n", data.summary.total_nodes));
    report.push_str(&format!("Links:        {}\n", data.summary.total_edges));
    report.push_str(&format!("Visits:       {}\n", data.summary.total_visits));
    report.push_str(&format!("Hosts:        {}\n", data.summary.total_hosts));
    report.push('\n');

    if data.summary.total_nodes == 0 {
        report.push_str("No history in this window.\n\n");
    }

    if !data.hosts.is_empty() {
        section(&mut report, "HOSTS");
        for host in &data.hosts {
            report.push_str(&format!("  {:<50} {:>5}\n", truncate(&host.host, 50), host.nodes));
        }
        report.push('\n');
    }

    if !data.top_referrers.is_empty() {
        section(&mut report, "TOP REFERRING PAGES");
        for (idx, referrer) in data.top_referrers.iter().enumerate() {
            report.push_str(&format!(
                "  [{}] {}  ({} outbound)\n",
                idx + 1,
                referrer.url,
                referrer.out_degree
            ));
        }
        report.push('\n');
    }

    if !data.edges.is_empty() {
        section(&mut report, "NAVIGATION EDGES");
        report.push_str(&format!("  {:<36} {:<36} {}\n", "Source", "Target", "Visit ID"));
        report.push_str("  ────────────────────────────────────────────────────────────────────────────\n");
        for edge in &data.edges {
            report.push_str(&format!(
                "  {:<36} {:<36} {}\n",
                truncate(&edge.source, 36),
                truncate(&edge.target, 36),
                edge.visit_id
            ));
        }
        report.push('\n');
    }

    if !data.recent_visits.is_empty() {
        section(&mut report, "RECENT VISITS");
        for visit in &data.recent_visits {
            report.push_str(&format!("  #{:<8} {}\n", visit.visit_id, visit.url));
            report.push_str(&format!(
                "            at {}  from {}  via {}\n",
                format_timestamp(visit.visit_time),
                visit.referring_visit_id.as_deref().unwrap_or("-"),
                visit.transition.as_deref().unwrap_or("-")
            ));
        }
        report.push('\n');
    }

    report.push_str(RULE);
    report.push_str("                          End of Report\n");
    report.push_str(RULE);

    report
}

pub fn generate_json_report(data: &ReportData) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "trailgraph",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json",
                "days": data.days
            },
            "summary": data.summary,
            "hosts": data.hosts,
            "top_referrers": data.top_referrers,
            "edges": data.edges,
            "recent_visits": data.recent_visits
        }
    });

    serde_json::to_string_pretty(&json_report)
}

/// Edge table as CSV, one row per referrer visit
pub fn generate_csv_report(data: &ReportData) -> String {
    let mut report = String::from("source,target,visit_id\n");
    for edge in &data.edges {
        report.push_str(&format!(
            "{},{},{}\n",
            csv_field(&edge.source),
            csv_field(&edge.target),
            csv_field(&edge.visit_id)
        ));
    }
    report
}

pub fn generate_markdown_report(data: &ReportData) -> String {
    let mut report = String::new();

    report.push_str("# Trailgraph Navigation Report\n\n");
    report.push_str(&format!("Lookback: **{} day(s)**\n\n", data.days));

    report.push_str("| Pages | Links | Visits | Hosts |\n");
    report.push_str("|------:|------:|-------:|------:|\n");
    report.push_str(&format!(
        "| {} | {} | {} | {} |\n\n",
        data.summary.total_nodes,
        data.summary.total_edges,
        data.summary.total_visits,
        data.summary.total_hosts
    ));

    if !data.top_referrers.is_empty() {
        report.push_str("## Top Referring Pages\n\n");
        for referrer in &data.top_referrers {
            report.push_str(&format!("- `{}` ({} outbound)\n", referrer.url, referrer.out_degree));
        }
        report.push('\n');
    }

    if !data.edges.is_empty() {
        report.push_str("## Navigation Edges\n\n");
        report.push_str("| Source | Target | Visit ID |\n");
        report.push_str("|--------|--------|----------|\n");
        for edge in &data.edges {
            report.push_str(&format!(
                "| {} | {} | {} |\n",
                md_cell(&edge.source),
                md_cell(&edge.target),
                md_cell(&edge.visit_id)
            ));
        }
        report.push('\n');
    }

    if !data.recent_visits.is_empty() {
        report.push_str("## Recent Visits\n\n");
        report.push_str("| Visit ID | URL | Time | Referrer | Transition |\n");
        report.push_str("|----------|-----|------|----------|------------|\n");
        for visit in &data.recent_visits {
            report.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                md_cell(&visit.visit_id),
                md_cell(&visit.url),
                format_timestamp(visit.visit_time),
                visit.referring_visit_id.as_deref().map(md_cell).unwrap_or_else(|| "-".to_string()),
                visit.transition.as_deref().unwrap_or("-")
            ));
        }
        report.push('\n');
    }

    report
}

pub fn generate_report(data: &ReportData, format: &ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(data)),
        ReportFormat::Json => generate_json_report(data),
        ReportFormat::Csv => Ok(generate_csv_report(data)),
        ReportFormat::Markdown => Ok(generate_markdown_report(data)),
    }
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn section(report: &mut String, title: &str) {
    report.push_str(RULE);
    report.push_str(title);
    report.push('\n');
    report.push_str(RULE);
    report.push('\n');
}

fn host_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
        .unwrap_or_else(|| "(no host)".to_string())
}

fn format_timestamp(millis: Option<i64>) -> String {
    use chrono::{DateTime, Utc};
    millis
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{}…", kept)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn md_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("https://a.com/"), "https://a.com/");
        assert_eq!(csv_field("https://a.com/?q=1,2"), "\"https://a.com/?q=1,2\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }

    #[test]
    fn test_host_of_handles_non_urls() {
        assert_eq!(host_of("https://news.example.org/a"), "news.example.org");
        assert_eq!(host_of("x.com"), "(no host)");
    }
}
