// Financial Literacy App - Web Server
// HTML pages plus a small JSON API over the catalog store and the
// analysis bridge.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use finlit::{
    parse_batch, AnalysisBridge, AppConfig, CatalogEntry, CatalogStore, ImportError,
    ImportPipeline, ScriptBridge, TransactionRecord,
};

/// Transient status shown once on the next render of the upload page.
#[derive(Debug, Clone)]
enum Flash {
    Message(String),
    Error(String),
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    store: Arc<Mutex<CatalogStore>>,
    pipeline: Arc<ImportPipeline>,
    bridge: Arc<dyn AnalysisBridge>,
    flash: Arc<Mutex<Option<Flash>>>,
    /// Where a finished import lands, success or failure.
    import_redirect: &'static str,
}

impl AppState {
    fn set_flash(&self, flash: Flash) {
        *self.flash.lock().unwrap() = Some(flash);
    }

    fn take_flash(&self) -> Option<Flash> {
        self.flash.lock().unwrap().take()
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl<T: Default> ApiResponse<T> {
    fn err(message: String) -> Self {
        Self {
            success: false,
            data: T::default(),
            error: Some(message),
        }
    }
}

// ============================================================================
// Page Handlers
// ============================================================================

/// GET / - Landing page
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

/// GET /Finance101 - Static financial literacy content
async fn serve_finance101() -> impl IntoResponse {
    Html(include_str!("../web/finance101.html"))
}

/// GET /FinancialTools - Catalog listing in timeline order
async fn serve_financial_tools(State(state): State<AppState>) -> Response {
    let entries = match state.store.lock().unwrap().all_by_timeline() {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!(error = %e, "failed to load catalog");
            return (StatusCode::INTERNAL_SERVER_ERROR, "catalog unavailable").into_response();
        }
    };

    let rows: String = entries
        .iter()
        .map(|entry| {
            format!(
                "<tr{}><td>{}</td><td>{}</td><td>{}</td><td><a href=\"{}\">Learn more</a></td></tr>\n",
                if entry.is_priority { " class=\"priority\"" } else { "" },
                entry.timeline_position,
                escape_html(&entry.name),
                escape_html(&entry.short_description),
                escape_html(&entry.learn_more_url),
            )
        })
        .collect();

    let page = include_str!("../web/financial_tools.html").replace("{{rows}}", &rows);
    Html(page).into_response()
}

/// GET /Analyze - Upload form, renders and consumes the pending flash
async fn serve_analyze(State(state): State<AppState>) -> impl IntoResponse {
    let flash_html = match state.take_flash() {
        Some(Flash::Message(text)) => {
            format!("<p class=\"flash message\">{}</p>", escape_html(&text))
        }
        Some(Flash::Error(text)) => {
            format!("<p class=\"flash error\">{}</p>", escape_html(&text))
        }
        None => String::new(),
    };

    Html(include_str!("../web/analyze.html").replace("{{flash}}", &flash_html))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ============================================================================
// Upload Handlers
// ============================================================================

/// Pull the bytes of the multipart field named `file`.
async fn read_file_field(multipart: &mut Multipart) -> Result<Vec<u8>, ImportError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ImportError::Parse(e.to_string()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ImportError::Parse(e.to_string()))?;
            return Ok(bytes.to_vec());
        }
    }
    Err(ImportError::NoFileSupplied)
}

/// POST /ImportCsv - Replace the catalog from an uploaded CSV, then redirect
/// with a transient status message
async fn import_csv(State(state): State<AppState>, mut multipart: Multipart) -> Redirect {
    let result = match read_file_field(&mut multipart).await {
        Ok(data) => state.pipeline.import(&data),
        Err(err) => Err(err),
    };

    match result {
        Ok(report) => {
            state.set_flash(Flash::Message(format!(
                "Imported {} products! Roll Tide!",
                report.inserted
            )));
        }
        Err(err) => {
            tracing::warn!(error = %err, "catalog import failed");
            state.set_flash(Flash::Error(err.to_string()));
        }
    }

    Redirect::to(state.import_redirect)
}

/// POST /AnalyzeTransactions - Parse an uploaded transactions CSV, run the
/// analysis bridge, and return the annotated batch as JSON
async fn analyze_transactions(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let data = match read_file_field(&mut multipart).await {
        Ok(data) if !data.is_empty() => data,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<Vec<TransactionRecord>>::err(
                    ImportError::NoFileSupplied.to_string(),
                )),
            )
                .into_response();
        }
    };

    let batch = match parse_batch(data.as_slice()) {
        Ok(batch) => batch,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<Vec<TransactionRecord>>::err(err.to_string())),
            )
                .into_response();
        }
    };

    // The external process is the one blocking step; keep it off the
    // async workers. The bridge itself never fails.
    let bridge = state.bridge.clone();
    match tokio::task::spawn_blocking(move || bridge.analyze(batch)).await {
        Ok(annotated) => (StatusCode::OK, Json(ApiResponse::ok(annotated))).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "analysis task panicked");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<Vec<TransactionRecord>>::err(
                    "analysis unavailable".to_string(),
                )),
            )
                .into_response()
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/products - All catalog entries in timeline order
async fn api_products(State(state): State<AppState>) -> Response {
    match state.store.lock().unwrap().all_by_timeline() {
        Ok(entries) => (StatusCode::OK, Json(ApiResponse::ok(entries))).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to load catalog");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<Vec<CatalogEntry>>::err(e.to_string())),
            )
                .into_response()
        }
    }
}

/// GET /api/products/:id - Single catalog entry
async fn api_product(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.store.lock().unwrap().get(id) {
        Ok(Some(entry)) => (StatusCode::OK, Json(ApiResponse::ok(entry))).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<Option<CatalogEntry>>::err(format!(
                "no product with id {id}"
            ))),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to load product");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<Option<CatalogEntry>>::err(e.to_string())),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();

    let mut store = CatalogStore::open(&config.db_path)?;
    let seeded = store.seed_if_empty()?;
    if seeded > 0 {
        tracing::info!(seeded, "seeded catalog");
    }

    let store = Arc::new(Mutex::new(store));
    let state = AppState {
        store: store.clone(),
        pipeline: Arc::new(ImportPipeline::new(store)),
        bridge: Arc::new(ScriptBridge::new(
            &config.interpreter,
            &config.script_path,
            config.user_id,
        )),
        flash: Arc::new(Mutex::new(None)),
        import_redirect: "/Analyze",
    };

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/products", get(api_products))
        .route("/products/:id", get(api_product));

    let app = Router::new()
        .route("/", get(serve_index))
        .route("/Finance101", get(serve_finance101))
        .route("/FinancialTools", get(serve_financial_tools))
        .route("/Analyze", get(serve_analyze))
        .route("/ImportCsv", post(import_csv))
        .route("/AnalyzeTransactions", post(analyze_transactions))
        .nest("/api", api_routes)
        .nest_service("/static", ServeDir::new("web"))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
