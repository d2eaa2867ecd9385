// Streamer Ledger - Web Server
// REST API with Axum over the shared SQLite store

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use streamer_ledger::{
    aggregate_snapshots, filter_by_month, filter_by_year, filter_streamers, format_text_block,
    monthly_growth, realtime_stats, resolve_period_label, sort_streamers, spreadsheet_preview,
    to_csv_string, BatchImportResult, BatchImporter, DashboardStats, ExportField, ExportOptions,
    ExportRecord, ImportMode, ImportPreview, LedgerConfig, LedgerError, MonthlyGrowth, NewSnapshot,
    ParsedGiftUpdate, ParsedRegistration, PeriodType, RecordStore, Snapshot, SortDirection,
    SortField, SqliteStore, Streamer, StreamerDraft, UpdateSubMode,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
struct AppState {
    store: Arc<Mutex<SqliteStore>>,
    importer: Arc<BatchImporter>,
}

impl AppState {
    fn store(&self) -> Result<MutexGuard<'_, SqliteStore>, ApiError> {
        self.store
            .lock()
            .map_err(|_| ApiError::Internal("store lock poisoned".to_string()))
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

// ============================================================================
// Errors
// ============================================================================

enum ApiError {
    Ledger(LedgerError),
    Internal(String),
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        ApiError::Ledger(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Ledger(e) => {
                let status = match &e {
                    LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
                    e if e.is_conflict() => StatusCode::CONFLICT,
                    LedgerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("{}", message);
        }

        let body = ApiResponse {
            success: false,
            data: (),
            error: Some(message),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// Streamers
// ============================================================================

#[derive(Deserialize)]
struct StreamerQuery {
    search: Option<String>,
    sort: Option<String>,
    direction: Option<String>,
}

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/streamers?search=&sort=&direction=
async fn list_streamers(
    State(state): State<AppState>,
    Query(query): Query<StreamerQuery>,
) -> ApiResult<Vec<Streamer>> {
    let sort = query
        .sort
        .as_deref()
        .map(str::parse::<SortField>)
        .transpose()?
        .unwrap_or_default();
    let direction = query
        .direction
        .as_deref()
        .map(str::parse::<SortDirection>)
        .transpose()?
        .unwrap_or_default();

    let mut streamers = state.store()?.list_streamers()?;
    sort_streamers(&mut streamers, sort, direction);

    let shown = filter_streamers(&streamers, query.search.as_deref().unwrap_or(""))
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(ApiResponse::ok(shown)))
}

fn validate_draft(draft: &StreamerDraft) -> Result<(), ApiError> {
    if draft.name.trim().is_empty() || draft.streamer_id.trim().is_empty() {
        return Err(LedgerError::InvalidInput("name and streamer_id are required".to_string()).into());
    }
    Ok(())
}

/// POST /api/streamers
async fn create_streamer(
    State(state): State<AppState>,
    Json(draft): Json<StreamerDraft>,
) -> ApiResult<Streamer> {
    validate_draft(&draft)?;
    let streamer = state.store()?.create_streamer(&draft)?;
    Ok(Json(ApiResponse::ok(streamer)))
}

/// PUT /api/streamers/:id
async fn update_streamer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(draft): Json<StreamerDraft>,
) -> ApiResult<Streamer> {
    validate_draft(&draft)?;
    let streamer = state.store()?.update_streamer(&id, &draft)?;
    Ok(Json(ApiResponse::ok(streamer)))
}

/// DELETE /api/streamers/:id
async fn delete_streamer(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.store()?.delete_streamer(&id)?;
    Ok(Json(ApiResponse::ok(())))
}

/// POST /api/streamers/clear-monthly
async fn clear_monthly(State(state): State<AppState>) -> ApiResult<usize> {
    let cleared = state.store()?.clear_monthly()?;
    info!("Monthly reset: {} streamers zeroed", cleared);
    Ok(Json(ApiResponse::ok(cleared)))
}

// ============================================================================
// Snapshots
// ============================================================================

#[derive(Deserialize)]
struct CreateSnapshotRequest {
    period_type: PeriodType,
    period_label: Option<String>,
    snapshot_date: Option<NaiveDate>,
}

/// GET /api/snapshots
async fn list_snapshots(State(state): State<AppState>) -> ApiResult<Vec<Snapshot>> {
    Ok(Json(ApiResponse::ok(state.store()?.list_snapshots()?)))
}

/// POST /api/snapshots - Capture the current profiles
async fn create_snapshot(
    State(state): State<AppState>,
    Json(request): Json<CreateSnapshotRequest>,
) -> ApiResult<Snapshot> {
    let date = request.snapshot_date.unwrap_or_else(|| Local::now().date_naive());
    let label = resolve_period_label(request.period_type, request.period_label.as_deref(), date)?;

    let mut store = state.store()?;
    let streamers = store.list_streamers()?;
    if streamers.is_empty() {
        return Err(LedgerError::InvalidInput("No streamers to snapshot".to_string()).into());
    }

    let snapshot = store.create_snapshot(&NewSnapshot::capture(request.period_type, label, date, &streamers))?;
    Ok(Json(ApiResponse::ok(snapshot)))
}

/// DELETE /api/snapshots/:id
async fn delete_snapshot(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.store()?.delete_snapshot(&id)?;
    Ok(Json(ApiResponse::ok(())))
}

// ============================================================================
// Import
// ============================================================================

#[derive(Deserialize)]
struct ImportRequest {
    mode: ImportMode,
    #[serde(default)]
    sub_mode: UpdateSubMode,
    text: String,
}

#[derive(Serialize)]
#[serde(untagged)]
enum PreviewBody {
    Registration(ImportPreview<ParsedRegistration>),
    GiftUpdate(ImportPreview<ParsedGiftUpdate>),
}

#[derive(Serialize)]
struct CommitBody {
    preview: PreviewBody,
    result: BatchImportResult,
}

/// POST /api/import/preview - Parse and reconcile, no writes
async fn import_preview(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<PreviewBody> {
    let existing = state.store()?.streamer_refs()?;

    let body = match request.mode {
        ImportMode::Register => {
            PreviewBody::Registration(state.importer.preview_registrations(&request.text, &existing))
        }
        ImportMode::Update => PreviewBody::GiftUpdate(state.importer.preview_gift_updates(
            &request.text,
            &existing,
            request.sub_mode,
        )),
    };
    Ok(Json(ApiResponse::ok(body)))
}

/// POST /api/import/commit - Re-parse server-side, then write the valid lines
async fn import_commit(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<CommitBody> {
    let mut store = state.store()?;

    let body = match request.mode {
        ImportMode::Register => {
            let (preview, result) = state.importer.import_registrations(&mut *store, &request.text)?;
            CommitBody {
                preview: PreviewBody::Registration(preview),
                result,
            }
        }
        ImportMode::Update => {
            let (preview, result) =
                state
                    .importer
                    .import_gift_updates(&mut *store, &request.text, request.sub_mode)?;
            CommitBody {
                preview: PreviewBody::GiftUpdate(preview),
                result,
            }
        }
    };
    Ok(Json(ApiResponse::ok(body)))
}

// ============================================================================
// Export + Dashboard
// ============================================================================

#[derive(Deserialize)]
struct ExportQuery {
    /// text | csv | table
    format: Option<String>,
    /// Comma-separated field names
    fields: Option<String>,
    snapshot: Option<String>,
    search: Option<String>,
}

/// GET /api/export
async fn export(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let options = match query.fields.as_deref().filter(|f| !f.trim().is_empty()) {
        Some(list) => {
            let fields = list
                .split(',')
                .map(str::parse::<ExportField>)
                .collect::<Result<Vec<_>, _>>()?;
            ExportOptions::only(&fields)
        }
        None => ExportOptions::default(),
    };
    let search = query.search.as_deref().unwrap_or("");

    let records: Vec<ExportRecord> = {
        let store = state.store()?;
        match query.snapshot.as_deref() {
            Some(id) => {
                let snapshot = store
                    .list_snapshots()?
                    .into_iter()
                    .find(|s| s.id == id)
                    .ok_or_else(|| LedgerError::NotFound(format!("snapshot {}", id)))?;
                let needle = search.to_lowercase();
                snapshot
                    .data
                    .iter()
                    .filter(|row| {
                        row.name.to_lowercase().contains(&needle)
                            || row.streamer_id.to_lowercase().contains(&needle)
                    })
                    .map(ExportRecord::from)
                    .collect()
            }
            None => {
                let streamers = store.list_streamers()?;
                filter_streamers(&streamers, search)
                    .into_iter()
                    .map(ExportRecord::from)
                    .collect()
            }
        }
    };

    let response = match query.format.as_deref().unwrap_or("text") {
        "csv" => (
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            to_csv_string(&records, &options)?,
        )
            .into_response(),
        "table" => Json(ApiResponse::ok(spreadsheet_preview(&records, &options))).into_response(),
        "text" => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format_text_block(&records, &options),
        )
            .into_response(),
        other => {
            return Err(LedgerError::InvalidInput(format!("Unknown export format: {}", other)).into())
        }
    };
    Ok(response)
}

#[derive(Deserialize)]
struct DashboardQuery {
    month: Option<String>,
    year: Option<i32>,
}

#[derive(Serialize)]
struct DashboardBody {
    stats: DashboardStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    growth: Option<Vec<MonthlyGrowth>>,
}

/// GET /api/dashboard?month=2025-03 | ?year=2025 | live when neither
async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<DashboardBody> {
    let store = state.store()?;

    let body = match (query.month.as_deref(), query.year) {
        (Some(key), _) => {
            let snapshots = store.list_snapshots()?;
            DashboardBody {
                stats: aggregate_snapshots(filter_by_month(&snapshots, key)),
                growth: None,
            }
        }
        (None, Some(year)) => {
            let snapshots = store.list_snapshots()?;
            DashboardBody {
                stats: aggregate_snapshots(filter_by_year(&snapshots, year)),
                growth: Some(monthly_growth(&snapshots, year)),
            }
        }
        (None, None) => DashboardBody {
            stats: realtime_stats(&store.list_streamers()?),
            growth: None,
        },
    };
    Ok(Json(ApiResponse::ok(body)))
}

// ============================================================================
// Main Server
// ============================================================================

fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/streamers", get(list_streamers).post(create_streamer))
        .route("/streamers/clear-monthly", post(clear_monthly))
        .route("/streamers/:id", put(update_streamer).delete(delete_streamer))
        .route("/snapshots", get(list_snapshots).post(create_snapshot))
        .route("/snapshots/:id", delete(delete_snapshot))
        .route("/import/preview", post(import_preview))
        .route("/import/commit", post(import_commit))
        .route("/export", get(export))
        .route("/dashboard", get(dashboard))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use anyhow::Context;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting Streamer Ledger server v{}", streamer_ledger::VERSION);

    let config = LedgerConfig::resolve(None).context("Failed to load configuration")?;
    let store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("Failed to open database {}", config.database_path.display()))?
        .with_actor("ledger-server");
    info!("✓ Database opened: {}", config.database_path.display());

    let state = AppState {
        store: Arc::new(Mutex::new(store)),
        importer: Arc::new(BatchImporter::new(config.import.clone())),
    };

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind_addr))?;

    info!("🚀 Server running on http://{}", config.server.bind_addr);
    info!("   API: http://{}/api/streamers", config.server.bind_addr);

    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
