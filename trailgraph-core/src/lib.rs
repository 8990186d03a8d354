pub mod builder;
pub mod index;
pub mod layout;
pub mod message;
pub mod model;
pub mod notice;
pub mod report;
pub mod session;
pub mod supersede;

pub use builder::{BuildOptions, GraphBuilder, assemble_graph, normalize_days, parse_days};
pub use index::GraphIndex;
pub use layout::{ForceLayout, Point};
pub use message::{Admitted, MessageRouter, Request, Response, TabHost, TabList};
pub use model::{Edge, Graph, Node};
pub use notice::{Notice, NoticeCallback, NoticeLevel};
pub use report::{ReportData, ReportFormat};
pub use session::{RenderSession, SessionEffect, SessionEvent};
pub use supersede::{BuildOutcome, BuildTicket, LatestOnly};
pub use trailgraph_history::{HistoryProvider, ProviderError, VisitId, VisitRecord};

/// Banner goes to stderr; stdout is reserved for command output
pub fn print_banner() {
    let banner = r#"
    ╔══════════════════════════════════════════╗
    ║   t r a i l g r a p h                    ║
    ║   where did that tab come from?          ║
    ╚══════════════════════════════════════════╝
"#;
    eprintln!("{}", banner);
}
