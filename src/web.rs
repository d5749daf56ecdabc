use crate::{
    app::{AppError, AppState},
    models::{HealthResponse, RecipeDetail, SearchQuery, SearchResponse},
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};
use anyhow::Context;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::signal;

#[derive(Clone)]
struct SharedState {
    app: Arc<AppState>,
}

/// Seconds a client should wait before retrying while resources load.
const RETRY_AFTER_SECS: &str = "10";

pub fn router(app: AppState) -> Router {
    let shared_state = Arc::new(SharedState { app: Arc::new(app) });

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/search", post(search))
        .route("/recipe/:id", get(recipe))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                log::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::warn!("shutting down");
}

async fn start_app(app: AppState, bind: &str) -> anyhow::Result<()> {
    let router = router(app);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    log::info!("listening on {bind}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn start_daemon(app: AppState, bind: &str) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async { start_app(app, bind).await })
}

#[derive(Debug)]
struct HttpError(AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let body = Json(json!({"error": self.0.to_string()}));

        match self.0 {
            AppError::NotReady => (
                StatusCode::SERVICE_UNAVAILABLE,
                [(header::RETRY_AFTER, RETRY_AFTER_SECS)],
                body,
            )
                .into_response(),
            AppError::RecipeNotFound(_) => (StatusCode::NOT_FOUND, body).into_response(),
            AppError::InvalidRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, body).into_response(),
            AppError::StoreUnavailable | AppError::Search(_) | AppError::Other(_) => {
                log::error!("{self:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

fn invalid(rejection: impl std::fmt::Display) -> HttpError {
    HttpError(AppError::InvalidRequest(rejection.to_string()))
}

async fn root() -> Redirect {
    Redirect::temporary("/health")
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    offset: Option<usize>,
    limit: Option<usize>,
}

async fn search(
    State(state): State<Arc<SharedState>>,
    pagination: Result<Query<Pagination>, QueryRejection>,
    payload: Result<Json<SearchQuery>, JsonRejection>,
) -> Result<Json<SearchResponse>, HttpError> {
    let Query(pagination) = pagination.map_err(invalid)?;
    let Json(payload) = payload.map_err(invalid)?;

    log::debug!("payload: {payload:?} {pagination:?}");

    let app = state.app.clone();
    let offset = pagination.offset.unwrap_or(0);
    let limit = pagination.limit.unwrap_or(app.default_limit);

    // embedding the query is CPU-bound
    tokio::task::block_in_place(move || {
        app.search(&payload.query, offset, limit)
            .map(Json)
            .map_err(Into::into)
    })
}

async fn recipe(
    State(state): State<Arc<SharedState>>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<RecipeDetail>, HttpError> {
    let Path(id) = id.map_err(invalid)?;

    log::info!("get recipe detail: id={id}");

    let detail = state.app.recipe(id)?;
    log::debug!("returning recipe {id}: {:?}", detail.name);

    Ok(Json(detail))
}
