use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::dispatch::{mint_id, DispatchQueue, Job, Lane, PauseSet, Priority};
use crate::error::{ApiError, Result};

/// Shared handles threaded through every handler.
///
/// The queue and the pause set are separately synchronized; the dispatch
/// path reads the pause set first and only then touches the queue, so a
/// pause observed before a dequeue always wins.
#[derive(Clone, Default)]
pub struct AppState {
    pub queue: Arc<RwLock<DispatchQueue>>,
    pub paused: Arc<RwLock<PauseSet>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Deserialize)]
struct AgentQuery {
    #[serde(default)]
    agent: String,
}

impl AgentQuery {
    fn require(&self) -> Result<&str> {
        if self.agent.is_empty() {
            return Err(ApiError::AgentRequired);
        }
        Ok(&self.agent)
    }
}

#[derive(Deserialize)]
struct EnqueueRequest {
    agent: String,
    model: String,
    #[serde(default)]
    priority: Priority,
    #[serde(default = "empty_object")]
    payload: Value,
    #[serde(default)]
    id: Option<String>,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

#[derive(Serialize)]
struct EnqueueResponse {
    id: String,
}

#[derive(Deserialize)]
struct CompleteRequest {
    #[serde(default = "default_status")]
    status: String,
    #[serde(default)]
    error: String,
}

fn default_status() -> String {
    "ok".to_string()
}

#[derive(Serialize)]
struct OkResponse {
    ok: bool,
}

#[derive(Serialize)]
struct RemovedResponse {
    removed: usize,
}

#[derive(Serialize)]
struct StopResponse {
    ok: bool,
    paused: bool,
    removed: usize,
}

#[derive(Serialize)]
struct PausedResponse {
    paused: Vec<String>,
}

#[derive(Serialize)]
struct PeekResponse {
    job: Job,
    lane: Lane,
    position: usize,
}

#[derive(Serialize, Default)]
struct AgentCounts {
    queued_high: usize,
    queued_low: usize,
    inflight: usize,
}

#[derive(Serialize)]
struct Metrics {
    queued_high: usize,
    queued_low: usize,
    inflight: usize,
    by_agent: BTreeMap<String, AgentCounts>,
}

#[derive(Serialize)]
struct QueueLanes {
    high: Vec<Job>,
    low: Vec<Job>,
}

#[derive(Serialize)]
struct StatsResponse {
    queues: QueueLanes,
    inflight: Vec<Job>,
    metrics: Metrics,
}

/// Build the full route table. Kept separate from [`run_server`] so tests
/// can drive the router without binding a socket.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/enqueue", post(enqueue_handler))
        .route("/dequeue", get(dequeue_handler))
        .route("/complete/{id}", post(complete_handler))
        .route("/stats", get(stats_handler))
        .route("/peek", get(peek_handler))
        .route("/jobs", delete(cancel_jobs_handler))
        .route("/control/pause", post(pause_handler))
        .route("/control/resume", post(resume_handler))
        .route("/control/state", get(control_state_handler))
        .route("/control/skip_next", post(skip_next_handler))
        .route("/control/bring_forward", post(bring_forward_handler))
        .route("/control/stop", post(stop_handler))
        .fallback(not_found_handler)
        .method_not_allowed_fallback(not_found_handler)
        .layer(cors)
        .with_state(state)
}

/// Bind `addr` and serve until the shutdown token is cancelled.
pub async fn run_server(
    addr: SocketAddr,
    state: AppState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "dispatch service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}

async fn enqueue_handler(
    State(state): State<AppState>,
    body: std::result::Result<Json<EnqueueRequest>, JsonRejection>,
) -> Result<Json<EnqueueResponse>> {
    let Json(req) = body?;
    if req.agent.is_empty() {
        return Err(ApiError::InvalidRequest(
            "agent must be a non-empty string".to_string(),
        ));
    }
    if req.model.is_empty() {
        return Err(ApiError::InvalidRequest(
            "model must be a non-empty string".to_string(),
        ));
    }

    let id = match req.id {
        Some(id) if !id.is_empty() => id,
        _ => mint_id(),
    };
    let job = Job::with_id(id, req.agent, req.model, req.priority, req.payload);

    let job = state.queue.write().await.enqueue(job);
    tracing::debug!(id = %job.id, agent = %job.agent, priority = %job.priority, "job enqueued");

    Ok(Json(EnqueueResponse { id: job.id }))
}

async fn dequeue_handler(
    State(state): State<AppState>,
    Query(query): Query<AgentQuery>,
) -> Result<Response> {
    let agent = query.require()?;

    // Paused agents get an immediate idle signal; the queue is not touched.
    if state.paused.read().await.contains(agent) {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    match state.queue.write().await.dequeue_for_agent(agent) {
        Some(job) => {
            tracing::debug!(id = %job.id, agent, "job dispatched");
            Ok(Json(job).into_response())
        }
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

async fn complete_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: std::result::Result<Json<CompleteRequest>, JsonRejection>,
) -> Result<Json<OkResponse>> {
    let Json(req) = body?;
    let ok = req.status == "ok";

    state.queue.write().await.complete(&id, ok, &req.error);
    tracing::debug!(%id, ok, "job completed");

    Ok(Json(OkResponse { ok: true }))
}

async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let snapshot = state.queue.read().await.snapshot();

    let mut by_agent: BTreeMap<String, AgentCounts> = BTreeMap::new();
    for job in &snapshot.high {
        by_agent.entry(job.agent.clone()).or_default().queued_high += 1;
    }
    for job in &snapshot.low {
        by_agent.entry(job.agent.clone()).or_default().queued_low += 1;
    }
    for job in &snapshot.inflight {
        by_agent.entry(job.agent.clone()).or_default().inflight += 1;
    }

    let metrics = Metrics {
        queued_high: snapshot.high.len(),
        queued_low: snapshot.low.len(),
        inflight: snapshot.inflight.len(),
        by_agent,
    };

    Json(StatsResponse {
        queues: QueueLanes {
            high: snapshot.high,
            low: snapshot.low,
        },
        inflight: snapshot.inflight,
        metrics,
    })
}

async fn peek_handler(
    State(state): State<AppState>,
    Query(query): Query<AgentQuery>,
) -> Result<Response> {
    let agent = query.require()?;

    match state.queue.read().await.peek_for_agent(agent) {
        Some(info) => Ok(Json(PeekResponse {
            job: info.job,
            lane: info.lane,
            position: info.position,
        })
        .into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

async fn cancel_jobs_handler(
    State(state): State<AppState>,
    Query(query): Query<AgentQuery>,
) -> Result<Json<RemovedResponse>> {
    let agent = query.require()?;

    let removed = state.queue.write().await.cancel_queued_for_agent(agent);
    tracing::info!(agent, removed, "queued jobs cancelled");

    Ok(Json(RemovedResponse { removed }))
}

async fn pause_handler(
    State(state): State<AppState>,
    Query(query): Query<AgentQuery>,
) -> Result<Json<OkResponse>> {
    let agent = query.require()?;

    state.paused.write().await.pause(agent);
    tracing::info!(agent, "agent paused");

    Ok(Json(OkResponse { ok: true }))
}

async fn resume_handler(
    State(state): State<AppState>,
    Query(query): Query<AgentQuery>,
) -> Result<Json<OkResponse>> {
    let agent = query.require()?;

    state.paused.write().await.resume(agent);
    tracing::info!(agent, "agent resumed");

    Ok(Json(OkResponse { ok: true }))
}

async fn control_state_handler(State(state): State<AppState>) -> Json<PausedResponse> {
    let paused = state.paused.read().await.list();
    Json(PausedResponse { paused })
}

async fn skip_next_handler(
    State(state): State<AppState>,
    Query(query): Query<AgentQuery>,
) -> Result<Json<OkResponse>> {
    let agent = query.require()?;

    let moved = state.queue.write().await.skip_next_for_agent(agent);
    tracing::info!(agent, moved, "skip_next applied");

    Ok(Json(OkResponse { ok: moved }))
}

async fn bring_forward_handler(
    State(state): State<AppState>,
    Query(query): Query<AgentQuery>,
) -> Result<Json<OkResponse>> {
    let agent = query.require()?;

    let moved = state.queue.write().await.bring_forward_for_agent(agent);
    tracing::info!(agent, moved, "bring_forward applied");

    Ok(Json(OkResponse { ok: moved }))
}

/// Pause plus cancel. The pause write completes before the cancel starts, so
/// no dequeue for this agent can be served once the response is sent.
async fn stop_handler(
    State(state): State<AppState>,
    Query(query): Query<AgentQuery>,
) -> Result<Json<StopResponse>> {
    let agent = query.require()?;

    state.paused.write().await.pause(agent);
    let removed = state.queue.write().await.cancel_queued_for_agent(agent);
    tracing::info!(agent, removed, "agent stopped");

    Ok(Json(StopResponse {
        ok: true,
        paused: true,
        removed,
    }))
}

async fn not_found_handler() -> ApiError {
    ApiError::NotFound
}
