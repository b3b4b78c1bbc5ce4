use std::sync::Arc;

use axum::{routing::get, Router};

use diet_chart_cell::router::diet_chart_routes;
use diet_chart_cell::DietChartState;

pub fn create_router(state: Arc<DietChartState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Ayush Aahar diet chart API is running!" }))
        .nest("/api", diet_chart_routes(state))
}
