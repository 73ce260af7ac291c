mod file_scanner;
mod project;

pub use file_scanner::{FileScanner, ScannedFile};
pub use project::{detect_project_type, resolve_project_type};
