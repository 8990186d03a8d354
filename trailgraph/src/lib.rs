// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

pub use handlers::{
    AnyProvider, HistorySource, build_options, days_from_args, history_source,
    load_urls_from_file, open_provider, parse_url_line,
};
