use crate::CLAP_STYLING;
use clap::{Arg, arg, command};
use url::Url;

fn source_args() -> [Arg; 3] {
    [
        arg!(--"places" <PATH>)
            .required(false)
            .help("Read a Firefox places.sqlite database")
            .value_parser(clap::value_parser!(String))
            .conflicts_with_all(["endpoint", "fixture"]),
        arg!(--"endpoint" <URL>)
            .required(false)
            .help("Query a JSON history bridge at this base URL")
            .value_parser(clap::value_parser!(Url))
            .conflicts_with_all(["places", "fixture"]),
        arg!(--"fixture" <PATH>)
            .required(false)
            .help("Load history from a JSON fixture file")
            .value_parser(clap::value_parser!(String))
            .conflicts_with_all(["places", "endpoint"]),
    ]
}

fn build_args() -> [Arg; 5] {
    [
        arg!(-d --"days" <DAYS>)
            .required(false)
            .help("How many days of history to include (non-numbers and values below 1 mean 7)")
            .allow_hyphen_values(true)
            .default_value("7"),
        arg!(--"max-results" <NUM>)
            .required(false)
            .help("Maximum number of distinct URLs to look up")
            .value_parser(clap::value_parser!(usize))
            .default_value("1000"),
        arg!(--"concurrency" <NUM>)
            .required(false)
            .help("Per-URL visit lookups allowed in flight at once")
            .value_parser(clap::value_parser!(usize))
            .default_value("4"),
        arg!(--"timeout" <SECONDS>)
            .required(false)
            .help("Timeout for each history query in seconds (0 disables)")
            .value_parser(clap::value_parser!(u64))
            .default_value("10"),
        arg!(--"clip-to-window")
            .required(false)
            .help("Drop visits that fall outside the lookback window")
            .action(clap::ArgAction::SetTrue),
    ]
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("trailgraph")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("trailgraph")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("graph")
                .about("Build the navigation graph for a lookback window and print a report")
                .args(source_args())
                .args(build_args())
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, csv, markdown")
                        .value_parser(["text", "json", "csv", "markdown", "md"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-v --"verbose")
                        .required(false)
                        .help("Log per-URL lookups")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("view")
                .about("Explore the navigation graph in an interactive terminal viewer")
                .args(source_args())
                .args(build_args())
                .arg(
                    arg!(--"open-tabs" <PATH>)
                        .required(false)
                        .help("Newline-delimited file of URLs to treat as open tabs")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
}
