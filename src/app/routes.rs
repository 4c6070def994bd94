use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Json;
use axum::routing::{get, post};
use tokio::sync::{Mutex, RwLock};
use tower_http::trace::TraceLayer;

use crate::app::model::{HealthResponse, TriggerResponse};
use crate::app::runner::ScrapeRunner;
use crate::formats::BookRecord;
use crate::store::BookStore;

#[derive(Clone)]
pub struct AppState {
    runner: Arc<ScrapeRunner>,
    store: Arc<dyn BookStore>,
    books: Arc<RwLock<Arc<Vec<BookRecord>>>>,
    scrape_lock: Arc<Mutex<()>>,
    trigger_token: Option<String>,
}

impl AppState {
    /// `trigger_token` guards the trigger route; `None` leaves it open.
    pub fn new(
        runner: Arc<ScrapeRunner>,
        store: Arc<dyn BookStore>,
        trigger_token: Option<String>,
    ) -> Self {
        Self {
            runner,
            store,
            books: Arc::new(RwLock::new(Arc::new(Vec::new()))),
            scrape_lock: Arc::new(Mutex::new(())),
            trigger_token,
        }
    }

    /// Refreshes the in-memory snapshot from the store.
    pub async fn reload_books(&self) -> anyhow::Result<usize> {
        let books = self.store.load().await?;
        let count = books.len();
        *self.books.write().await = Arc::new(books);
        tracing::info!(books = count, "books loaded");
        Ok(count)
    }

    pub async fn books(&self) -> Arc<Vec<BookRecord>> {
        Arc::clone(&*self.books.read().await)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/api/v1/health", get(health))
        .route("/api/v1/scraping/trigger", post(trigger_scraping))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        api_status: "healthy".to_string(),
        data_loaded: !state.books().await.is_empty(),
    })
}

async fn trigger_scraping(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TriggerResponse>, (StatusCode, String)> {
    authorize(state.trigger_token.as_deref(), &headers)?;

    let Ok(running) = Arc::clone(&state.scrape_lock).try_lock_owned() else {
        return Err((
            StatusCode::CONFLICT,
            "scraping already in progress".to_string(),
        ));
    };

    // Outlives the request future.
    let job_state = state.clone();
    let job = tokio::spawn(async move {
        let _running = running;
        let summary = job_state.runner.run().await?;
        if let Err(err) = job_state.reload_books().await {
            tracing::error!(?err, "reload books after scraping");
        }
        Ok::<_, anyhow::Error>(summary)
    });

    let summary = job
        .await
        .map_err(|err| {
            tracing::error!(?err, "scrape task aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("scrape task aborted: {err}"),
            )
        })?
        .map_err(|err| {
            tracing::error!(?err, "scraping failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
        })?;

    Ok(Json(TriggerResponse {
        message: format!("{} books extracted and saved", summary.books),
        summary,
    }))
}

fn authorize(expected: Option<&str>, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    match provided {
        Some(token) if token == expected => Ok(()),
        Some(_) => {
            tracing::warn!("trigger called with an invalid token");
            Err((StatusCode::UNAUTHORIZED, "invalid credentials".to_string()))
        }
        None => Err((StatusCode::UNAUTHORIZED, "missing bearer token".to_string())),
    }
}
