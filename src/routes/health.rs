use crate::state::AppState;
use axum::routing::get;
use axum::Router;

async fn healthz() -> &'static str {
    "ok"
}

pub fn router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}
