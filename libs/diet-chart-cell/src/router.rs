use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::DietChartState;

pub fn diet_chart_routes(state: Arc<DietChartState>) -> Router {
    Router::new()
        // Chart generation
        .route("/generate-enhanced-diet-chart", post(handlers::generate_diet_chart))
        .route("/diet-charts", post(handlers::generate_diet_chart))
        .route("/parse-recipe", post(handlers::parse_recipe))

        // Knowledge base and weather lookups
        .route("/smart-swaps/{food}", get(handlers::get_smart_swaps))
        .route("/foods", get(handlers::search_foods))
        .route("/weather/{city}", get(handlers::get_weather))
        .with_state(state)
}
