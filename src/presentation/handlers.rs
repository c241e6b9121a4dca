// HTTP request handlers
use crate::domain::error::TelemetryError;
use crate::domain::record::SeriesRecord;
use crate::infrastructure::chunked_stream::chunked_json_stream;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: u64,
    pub selection: String,
}

#[derive(Debug)]
pub enum ApiError {
    SessionNotFound(u64),
    Telemetry(TelemetryError),
    Status(StatusCode),
}

impl From<TelemetryError> for ApiError {
    fn from(err: TelemetryError) -> Self {
        Self::Telemetry(err)
    }
}

impl From<StatusCode> for ApiError {
    fn from(status: StatusCode) -> Self {
        Self::Status(status)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::SessionNotFound(id) => (StatusCode::NOT_FOUND, format!("unknown session: {id}")),
            Self::Telemetry(err @ TelemetryError::UnknownKey { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            Self::Telemetry(err) if err.is_internal() => {
                tracing::error!(error = %err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            Self::Telemetry(err) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
            Self::Status(status) => return status.into_response(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub fn router<R: SeriesRecord>(state: Arc<AppState<R>>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/keys", get(list_keys::<R>))
        .route("/sessions", post(create_session::<R>))
        .route("/sessions/:id", delete(end_session::<R>))
        .route("/sessions/:id/selection", put(select_key::<R>))
        .route("/sessions/:id/views", get(get_views::<R>))
        .route("/sessions/:id/stream", get(stream_views::<R>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// List the configured keys, in configured order
pub async fn list_keys<R: SeriesRecord>(
    headers: HeaderMap,
    State(state): State<Arc<AppState<R>>>,
) -> Result<Response, ApiError> {
    let keys = state.sessions.keys().list_keys();
    Ok(json_response(StatusCode::OK, &keys, accepts_brotli(&headers)).await?)
}

pub async fn create_session<R: SeriesRecord>(
    State(state): State<Arc<AppState<R>>>,
) -> impl IntoResponse {
    let session = state.sessions.create().await;
    let body = SessionResponse {
        id: session.id(),
        selection: session.selection().key,
    };
    (StatusCode::CREATED, Json(body))
}

pub async fn select_key<R: SeriesRecord>(
    Path(id): Path<u64>,
    State(state): State<Arc<AppState<R>>>,
    Json(request): Json<SelectionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state
        .sessions
        .get(id)
        .await
        .ok_or(ApiError::SessionNotFound(id))?;
    let selection = state.sessions.select(&session, &request.key)?;
    Ok(Json(SessionResponse {
        id,
        selection: selection.key,
    }))
}

/// Every declared view, refreshed against the newest snapshot and selection
pub async fn get_views<R: SeriesRecord>(
    Path(id): Path<u64>,
    headers: HeaderMap,
    State(state): State<Arc<AppState<R>>>,
) -> Result<Response, ApiError> {
    let session = state
        .sessions
        .get(id)
        .await
        .ok_or(ApiError::SessionNotFound(id))?;
    let dashboard = session.refresh().await?;
    Ok(json_response(StatusCode::OK, &dashboard, accepts_brotli(&headers)).await?)
}

/// Push a frame of views on every snapshot or selection change
pub async fn stream_views<R: SeriesRecord>(
    Path(id): Path<u64>,
    headers: HeaderMap,
    State(state): State<Arc<AppState<R>>>,
) -> Result<Response, ApiError> {
    let session = state
        .sessions
        .get(id)
        .await
        .ok_or(ApiError::SessionNotFound(id))?;
    tracing::info!(session = id, "streaming views");
    Ok(chunked_json_stream(session.updates(), accepts_brotli(&headers))?)
}

pub async fn end_session<R: SeriesRecord>(
    Path(id): Path<u64>,
    State(state): State<Arc<AppState<R>>>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.end(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ingestor::tests::minute;
    use crate::application::key_service::KeyService;
    use crate::application::session::SessionRegistry;
    use crate::application::snapshot_cache::SnapshotCache;
    use crate::application::snapshot_store::SnapshotStore;
    use crate::application::source_resolver::SourceResolver;
    use crate::application::view_spec::{Projection, ViewInput, ViewSpec};
    use crate::domain::stock::StockQuote;
    use crate::infrastructure::csv_codec::{self, CsvCodec};
    use crate::infrastructure::memory_store::MemorySnapshotStore;
    use axum::body::{self, Body};
    use axum::http::{Request, header};
    use futures::StreamExt;
    use tower::ServiceExt;

    async fn app() -> Router {
        let store = Arc::new(MemorySnapshotStore::new());
        let rows = vec![
            StockQuote::new("Duolingo", "DUOL", 181.0, minute(1)),
            StockQuote::new("Cricut", "CRCT", 6.5, minute(1)),
        ];
        store.publish(csv_codec::encode(&rows).unwrap()).await.unwrap();

        let resolver = SourceResolver::new(vec![
            ("Duolingo".to_string(), "DUOL".to_string()),
            ("Cricut".to_string(), "CRCT".to_string()),
        ])
        .unwrap();
        let views = vec![
            ViewSpec::new::<StockQuote>(
                "summary",
                Projection::Summary,
                &[ViewInput::Snapshot, ViewInput::Selection],
            )
            .unwrap(),
        ];
        let sessions = SessionRegistry::<StockQuote>::new(
            Arc::new(SnapshotCache::new(store, Arc::new(CsvCodec))),
            views,
            KeyService::from_resolver(Arc::new(resolver)),
            "Duolingo".to_string(),
        )
        .unwrap();
        router(Arc::new(AppState { sessions }))
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        json: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let payload = match json {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(request.body(payload).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_keys() {
        let app = app().await;
        let (status, keys) = send(&app, "GET", "/keys", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(keys, serde_json::json!(["Duolingo", "Cricut"]));
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let app = app().await;

        let (status, session) = send(&app, "POST", "/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(session["selection"], "Duolingo");
        let id = session["id"].as_u64().unwrap();

        let (status, views) = send(&app, "GET", &format!("/sessions/{id}/views"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(views["version"], 1);
        assert_eq!(views["views"][0]["state"]["state"], "ready");
        assert!(views["views"][0]["state"]["output"]["text"]
            .as_str()
            .unwrap()
            .starts_with("Duolingo (DUOL)"));

        let (status, selected) = send(
            &app,
            "PUT",
            &format!("/sessions/{id}/selection"),
            Some(serde_json::json!({"key": "Cricut"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(selected["selection"], "Cricut");

        let (_, views) = send(&app, "GET", &format!("/sessions/{id}/views"), None).await;
        assert_eq!(views["selection"], "Cricut");

        let (status, _) = send(&app, "DELETE", &format!("/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", &format!("/sessions/{id}/views"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_key_is_unprocessable() {
        let app = app().await;
        let (_, session) = send(&app, "POST", "/sessions", None).await;
        let id = session["id"].as_u64().unwrap();

        let (status, error) = send(
            &app,
            "PUT",
            &format!("/sessions/{id}/selection"),
            Some(serde_json::json!({"key": "Allbirds"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(error["error"], "unknown key: Allbirds");

        let (_, views) = send(&app, "GET", &format!("/sessions/{id}/views"), None).await;
        assert_eq!(views["selection"], "Duolingo");
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let app = app().await;
        let (status, _) = send(
            &app,
            "PUT",
            "/sessions/42/selection",
            Some(serde_json::json!({"key": "Cricut"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stream_ends_when_session_is_deleted() {
        let app = app().await;
        let (_, session) = send(&app, "POST", "/sessions", None).await;
        let id = session["id"].as_u64().unwrap();

        let request = Request::builder()
            .uri(format!("/sessions/{id}/stream"))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let mut frames = response.into_body().into_data_stream();

        let frame = frames.next().await.unwrap().unwrap();
        let length = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        let dashboard: serde_json::Value = serde_json::from_slice(&frame[4..4 + length]).unwrap();
        assert_eq!(dashboard["selection"], "Duolingo");
        assert_eq!(dashboard["version"], 1);

        let (status, _) = send(&app, "DELETE", &format!("/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(frames.next().await.is_none());
    }
}
