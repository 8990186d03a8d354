pub mod viewer;

pub use viewer::{GraphViewer, create_viewer_channel, run_viewer};
