pub mod engine;
pub mod error;
pub mod loader;
pub mod result;

pub use engine::{AuditEngine, StaticRuleEngine};
pub use error::ScanError;
pub use loader::{HttpPageLoader, PageLoader};
pub use result::{Impact, LoadedPage, Violation};
