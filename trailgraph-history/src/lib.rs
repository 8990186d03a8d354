pub mod error;
pub mod http;
pub mod memory;
pub mod places;
pub mod provider;
pub mod visit;
pub mod window;

pub use error::ProviderError;
pub use http::HttpProvider;
pub use memory::MemoryProvider;
pub use places::PlacesProvider;
pub use provider::HistoryProvider;
pub use visit::{VisitId, VisitRecord, VisitedUrl};
pub use window::TimeWindow;
