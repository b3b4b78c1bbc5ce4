use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_models::error::AppError;

use crate::models::{
    ClimateContext, DietChart, DietChartError, DietChartRequest, DietType, FoodFilter, FoodItem,
    RecipeInput,
};
use crate::services::constraints::{ConstraintResolver, DietaryConstraints};
use crate::services::weather::StaticWeatherProvider;
use crate::state::DietChartState;

#[derive(Debug, Default, Deserialize)]
pub struct SmartSwapQuery {
    /// Comma-separated allergens.
    pub allergens: Option<String>,
    /// Comma-separated foods or tastes.
    pub dislikes: Option<String>,
    pub diet_type: Option<DietType>,
}

// ==============================================================================
// DIET CHART HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn generate_diet_chart(
    State(state): State<Arc<DietChartState>>,
    payload: Result<Json<DietChartRequest>, JsonRejection>,
) -> Result<Json<DietChart>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let (_, city) = request.validate()?;

    info!("Generating diet chart for city {}", city);

    let mut notes = Vec::new();
    let climate = match &request.climate {
        Some(supplied) => {
            let mut climate = supplied.clone();
            if climate.city.trim().is_empty() {
                climate.city = city.to_string();
            }
            climate
        }
        None => match state.weather.current_climate(city).await {
            Ok(climate) => climate,
            Err(e) => {
                warn!("Weather lookup for {} failed, assuming moderate climate: {}", city, e);
                notes.push(format!(
                    "Live weather for {} was unavailable, so a moderate climate (25°C, 60% humidity) was assumed.",
                    city
                ));
                StaticWeatherProvider::default().climate_for(city, Utc::now().month())
            }
        },
    };

    let mut recipes = state
        .recipe_parser
        .parse_recipes(request.meal_recipes.as_ref());
    notes.append(&mut recipes.notes);
    recipes.notes = notes;

    let chart = state.engine.generate(&request, &climate, &recipes)?;
    Ok(Json(chart))
}

#[axum::debug_handler]
pub async fn parse_recipe(
    State(state): State<Arc<DietChartState>>,
    payload: Result<Json<RecipeInput>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(input) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let Some(text) = input.text() else {
        if input.has_image() {
            return Ok(Json(json!({
                "ingredients": [],
                "ingredient_details": [],
                "success": false,
                "total_found": 0,
                "message": "Image recipes cannot be read yet; send recipe_text instead"
            })));
        }
        return Err(AppError::BadRequest(
            "recipe_text or recipe_image_base64 is required".to_string(),
        ));
    };

    let ingredients = state.recipe_parser.parse(text);
    let names: Vec<&str> = ingredients.iter().map(|i| i.name.as_str()).collect();
    debug!("Parsed {} ingredients from recipe text", names.len());

    Ok(Json(json!({
        "ingredients": names,
        "ingredient_details": ingredients,
        "success": true,
        "total_found": ingredients.len()
    })))
}

// ==============================================================================
// KNOWLEDGE BASE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_smart_swaps(
    State(state): State<Arc<DietChartState>>,
    Path(food): Path<String>,
    Query(query): Query<SmartSwapQuery>,
) -> Result<Json<Value>, AppError> {
    let kb = state.knowledge_base();
    let item = kb
        .lookup(&food)
        .ok_or_else(|| DietChartError::FoodNotFound(food.clone()))?;

    let constraints = DietaryConstraints::from_parts(
        comma_list(query.allergens.as_deref()),
        comma_list(query.dislikes.as_deref()),
        query.diet_type.unwrap_or_default(),
    );
    let resolver = ConstraintResolver::new(kb, &constraints);

    let swaps: Vec<Value> = resolver
        .substitutes(item)
        .into_iter()
        .map(|candidate| {
            json!({
                "name": candidate.name,
                "category": candidate.category,
                "reason": swap_reason(item, candidate),
            })
        })
        .collect();

    Ok(Json(json!({
        "original_food": item.name,
        "conflict": constraints.conflict(item).map(|reason| reason.to_string()),
        "swaps": swaps,
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn search_foods(
    State(state): State<Arc<DietChartState>>,
    Query(filter): Query<FoodFilter>,
) -> Result<Json<Value>, AppError> {
    let foods = state.knowledge_base().search(&filter);

    Ok(Json(json!({
        "foods": foods,
        "total": foods.len()
    })))
}

#[axum::debug_handler]
pub async fn get_weather(
    State(state): State<Arc<DietChartState>>,
    Path(city): Path<String>,
) -> Result<Json<ClimateContext>, AppError> {
    if city.trim().is_empty() {
        return Err(AppError::BadRequest("city cannot be empty".to_string()));
    }

    let climate = state
        .weather
        .current_climate(city.trim())
        .await
        .map_err(DietChartError::from)?;

    Ok(Json(climate))
}

fn comma_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
}

fn swap_reason(original: &FoodItem, candidate: &FoodItem) -> String {
    let shared = candidate
        .rasa
        .iter()
        .find(|rasa| original.rasa.contains(rasa))
        .map(|rasa| format!(", shares {} taste", rasa))
        .unwrap_or_default();

    format!(
        "Same {} category{}, {:.0} kcal vs {:.0} kcal",
        candidate.category, shared, candidate.calories, original.calories
    )
}
