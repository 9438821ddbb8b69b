// Financial Literacy App - Core Library
// Exposes all modules for use in the CLI, web server, and tests

pub mod analysis;
pub mod catalog;
pub mod config;
pub mod error;
pub mod store;
pub mod transactions;

// Re-export commonly used types
pub use analysis::{
    apply_results, build_request, AnalysisBridge, AnalysisRequest, AnalysisResult, ScriptBridge,
};
pub use catalog::{
    parse_catalog_csv, CatalogEntry, ImportPipeline, ImportReport, DEFAULT_IMAGE_URL,
    DEFAULT_LEARN_MORE_URL, REQUIRED_COLUMNS,
};
pub use config::AppConfig;
pub use error::{AnalysisError, ImportError};
pub use store::CatalogStore;
pub use transactions::{parse_batch, TransactionRecord, DEFAULT_CATEGORY};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
