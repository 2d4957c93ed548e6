use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Json, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use weekly_journal_schemas::{
    today, week_range_of, week_range_of_str, EntryCreated, EntryId, ErrorResponse,
    GenerateSummaryRequest, GeneratedSummary, MessageResponse, NewEntry, SaveSummaryRequest,
    WeekRange,
};
use weekly_journal_store::{Database, EntryStore, JournalStore, StoreError, SummaryStore};

use crate::llm_providers::SummaryGenerator;
use crate::pipeline::{PipelineError, SummaryPipeline};

/// Shared handler state. The same store handle backs the handlers and the pipeline.
pub struct AppState<S = Database> {
    db: Arc<Mutex<S>>,
    pipeline: SummaryPipeline<S>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            pipeline: self.pipeline.clone(),
        }
    }
}

impl<S: JournalStore> AppState<S> {
    pub fn new(
        store: S,
        generator: Arc<dyn SummaryGenerator>,
        generation_timeout: Duration,
    ) -> Self {
        let db = Arc::new(Mutex::new(store));
        let pipeline = SummaryPipeline::new(Arc::clone(&db), generator)
            .with_generation_timeout(generation_timeout);

        Self { db, pipeline }
    }
}

/// Errors returned to HTTP callers as `{"error": ...}`
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Store(StoreError),
    Pipeline(PipelineError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Store(e) => ApiError::Store(e),
            other => ApiError::Pipeline(other),
        }
    }
}

// Extractor failures answer with the same JSON error body as every other client error
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

fn error_body(status: StatusCode, error: String, summary: Option<String>) -> Response {
    (status, Json(ErrorResponse { error, summary })).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                warn!("Rejected request: {}", message);
                error_body(StatusCode::BAD_REQUEST, message, None)
            }
            ApiError::NotFound(message) => error_body(StatusCode::NOT_FOUND, message, None),
            ApiError::Store(e) if e.is_validation() => {
                warn!("Rejected request: {}", e);
                error_body(StatusCode::BAD_REQUEST, e.to_string(), None)
            }
            ApiError::Store(e) => {
                error!("Storage failure: {}", e);
                error_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), None)
            }
            ApiError::Pipeline(e @ PipelineError::NoEntries { .. }) => {
                warn!("{}", e);
                error_body(
                    StatusCode::BAD_REQUEST,
                    "No entries found for the specified week".to_string(),
                    None,
                )
            }
            ApiError::Pipeline(PipelineError::Generation(detail)) => {
                error!("Failed to generate summary: {}", detail);
                error_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to generate summary".to_string(),
                    None,
                )
            }
            ApiError::Pipeline(PipelineError::PersistFailed { summary, source }) => {
                error!("Generated summary could not be saved: {}", source);
                error_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Summary generated but not saved: {}", source),
                    Some(summary),
                )
            }
            ApiError::Pipeline(PipelineError::Store(e)) => ApiError::Store(e).into_response(),
        }
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Build the service router. All journal routes live under `/api`.
pub fn router<S: JournalStore + 'static>(state: AppState<S>) -> Router {
    // The browser front end is served from a different origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/entries", get(list_entries::<S>).post(add_entry::<S>))
        .route("/entries/:id", put(update_entry::<S>).delete(delete_entry::<S>))
        .route("/summaries", get(list_summaries::<S>).post(save_summary::<S>))
        .route("/summaries/generate-summary", post(generate_summary::<S>))
        .route(
            "/summaries/generate-and-save",
            post(generate_and_save_summary::<S>),
        )
        .route("/weeks", get(weekly_overview::<S>))
        .route("/weeks/current", get(current_week));

    Router::new()
        .route("/health", get(health_check::<S>))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check<S: JournalStore>(
    State(state): State<AppState<S>>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.lock().await;
    let entries = db.count_entries()?;
    let summaries = db.count_summaries()?;

    Ok(Json(serde_json::json!({
        "service": "weekly-journal",
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "entries": entries,
        "summaries": summaries
    })))
}

// ========== ENTRIES ==========

#[derive(Debug, Default, Deserialize)]
struct EntriesQuery {
    /// `current`, or any date inside the wanted week
    week: Option<String>,
}

async fn list_entries<S: JournalStore>(
    State(state): State<AppState<S>>,
    query: Result<Query<EntriesQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let entries = match query.week.as_deref() {
        None => {
            let db = state.db.lock().await;
            db.list_entries()?
        }
        Some("current") => state.pipeline.current_week_entries().await?,
        Some(reference) => {
            let week =
                week_range_of_str(reference).map_err(|e| ApiError::BadRequest(e.to_string()))?;
            let db = state.db.lock().await;
            db.list_entries_in_range(&week.start, &week.end)?
        }
    };

    Ok(Json(entries))
}

async fn add_entry<S: JournalStore>(
    State(state): State<AppState<S>>,
    payload: Result<Json<NewEntry>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(entry) = payload?;
    let db = state.db.lock().await;
    let id = db.add_entry(&entry)?;

    info!("Added entry {} for {}", id, entry.date);
    Ok((StatusCode::CREATED, Json(EntryCreated { id })))
}

async fn update_entry<S: JournalStore>(
    State(state): State<AppState<S>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<NewEntry>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    let Json(entry) = payload?;
    let db = state.db.lock().await;
    if !db.update_entry(EntryId(id), &entry)? {
        return Err(ApiError::NotFound("Entry not found".to_string()));
    }

    info!("Updated entry {}", id);
    Ok(Json(MessageResponse::new("Entry updated successfully")))
}

async fn delete_entry<S: JournalStore>(
    State(state): State<AppState<S>>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    let db = state.db.lock().await;
    if !db.delete_entry(EntryId(id))? {
        return Err(ApiError::NotFound("Entry not found".to_string()));
    }

    info!("Deleted entry {}", id);
    Ok(Json(MessageResponse::new("Entry deleted successfully")))
}

// ========== SUMMARIES ==========

#[derive(Debug, Default, Deserialize)]
struct SummariesQuery {
    week_start: Option<String>,
    week_end: Option<String>,
}

async fn list_summaries<S: JournalStore>(
    State(state): State<AppState<S>>,
    query: Result<Query<SummariesQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let db = state.db.lock().await;

    let summaries = match (query.week_start, query.week_end) {
        (None, None) => db.list_summaries()?,
        (Some(start), Some(end)) => db.summaries_for_week(&WeekRange::new(start, end))?,
        _ => {
            return Err(ApiError::BadRequest(
                "week_start and week_end must be given together".to_string(),
            ))
        }
    };

    Ok(Json(summaries))
}

async fn save_summary<S: JournalStore>(
    State(state): State<AppState<S>>,
    payload: Result<Json<SaveSummaryRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let db = state.db.lock().await;
    let saved = db.save_summary(&request.week_start, &request.week_end, &request.summary)?;

    Ok((StatusCode::CREATED, Json(saved)))
}

fn require_week(request: &GenerateSummaryRequest) -> ApiResult<()> {
    if request.week_start.trim().is_empty() || request.week_end.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Missing week_start or week_end".to_string(),
        ));
    }
    Ok(())
}

async fn generate_summary<S: JournalStore>(
    State(state): State<AppState<S>>,
    payload: Result<Json<GenerateSummaryRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    require_week(&request)?;

    let summary = state
        .pipeline
        .compose_summary(&request.week_start, &request.week_end)
        .await?;

    Ok(Json(GeneratedSummary { summary }))
}

async fn generate_and_save_summary<S: JournalStore>(
    State(state): State<AppState<S>>,
    payload: Result<Json<GenerateSummaryRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    require_week(&request)?;

    let saved = state
        .pipeline
        .compose_and_save_summary(&request.week_start, &request.week_end)
        .await?;

    Ok((StatusCode::CREATED, Json(saved)))
}

// ========== WEEKS ==========

async fn weekly_overview<S: JournalStore>(
    State(state): State<AppState<S>>,
) -> ApiResult<impl IntoResponse> {
    let overview = state.pipeline.weekly_overview().await?;
    Ok(Json(overview))
}

async fn current_week() -> ApiResult<impl IntoResponse> {
    let week = week_range_of(today()).map_err(StoreError::from)?;
    Ok(Json(week))
}
