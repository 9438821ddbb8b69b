// Runtime configuration, resolved from environment variables with local
// defaults. Everything the binaries need lives here so the library stays
// free of ambient lookups.

use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// Interpreter for the analysis script ("python3" on most hosts).
    pub interpreter: String,
    /// Path to the batch analysis script.
    pub script_path: PathBuf,
    /// Bind address for the web server.
    pub bind_addr: String,
    /// Fixed user identifier sent with every analysis request.
    pub user_id: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            db_path: env::var("FINLIT_DB")
                .unwrap_or_else(|_| "finlit.db".to_string())
                .into(),
            interpreter: env::var("FINLIT_PYTHON").unwrap_or_else(|_| "python3".to_string()),
            script_path: env::var("FINLIT_SCRIPT")
                .unwrap_or_else(|_| "scripts/batch_analyze.py".to_string())
                .into(),
            bind_addr: env::var("FINLIT_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            user_id: 1,
        }
    }
}
