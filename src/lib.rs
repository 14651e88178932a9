pub mod api;
pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;

pub use config::AppConfig;
pub use db::{create_pool, MemoryPriceStore, PgPriceStore, PriceStore};
pub use error::{ExportError, IngestError};
pub use service::{ExportService, IngestService};
