pub mod export;
pub mod ingest;

pub use export::{ExportService, EXPORT_MEMBER};
pub use ingest::{IngestService, INGEST_MEMBER};
