use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::connectivity::SharedConnectivity;
use crate::fetcher::HttpStorySource;
use crate::service::StoryService;
use crate::state::StoryState;
use crate::store::SqliteStore;
use crate::view::{build_layout, ClientContext, Slot};

pub type Upvote = StoryService<HttpStorySource, SqliteStore, SharedConnectivity>;

pub struct AppState {
    pub service: Arc<Upvote>,
}

// Template structs
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub slots: Vec<Slot>,
    pub offline: bool,
    pub refreshing: bool,
    pub last_error: Option<String>,
}

#[derive(Template)]
#[template(path = "status.html")]
pub struct StatusTemplate {
    pub offline: bool,
    pub refreshing: bool,
    pub last_error: Option<String>,
}

impl StatusTemplate {
    fn from_state(state: &StoryState, refreshing: bool) -> Self {
        Self {
            offline: state.offline,
            refreshing,
            last_error: state.last_error.clone(),
        }
    }
}

// Wrapper for HTML responses
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/stories", get(stories))
        .route("/refresh", post(refresh))
        .route("/status", get(status))
        .route("/health", get(health))
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Route handlers
pub async fn index(
    State(state): State<Arc<AppState>>,
    Query(ctx): Query<ClientContext>,
) -> impl IntoResponse {
    let snapshot = state.service.state().await;

    HtmlTemplate(IndexTemplate {
        slots: build_layout(&snapshot, &ctx),
        offline: snapshot.offline,
        refreshing: false,
        last_error: snapshot.last_error,
    })
}

pub async fn stories(State(state): State<Arc<AppState>>) -> Json<StoryState> {
    Json(state.service.state().await)
}

pub async fn refresh(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let service = state.service.clone();
    tokio::spawn(async move {
        service.get_stories().await;
    });

    let snapshot = state.service.state().await;
    HtmlTemplate(StatusTemplate::from_state(&snapshot, true))
}

pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.service.state().await;
    HtmlTemplate(StatusTemplate::from_state(&snapshot, false))
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
