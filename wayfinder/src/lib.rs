// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    collect_exclusions, load_exclusions_from_file, parse_exclusion_line, parse_impact_list,
    resolve_report_dir, resolve_repository,
};
