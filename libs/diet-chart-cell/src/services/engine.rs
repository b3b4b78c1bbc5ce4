// libs/diet-chart-cell/src/services/engine.rs
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_config::{DietEngineConfig, MealSplit};

use crate::models::{
    ClimateContext, DietChart, DietChartError, DietChartRequest, MealPlanEntry, ParsedRecipes,
};
use crate::services::climate::ClimateAdapter;
use crate::services::composer::{
    ayurvedic_profile, estimate_daily_calories, nutrient_bars, MealComposer,
};
use crate::services::constraints::{ConstraintResolver, DietaryConstraints};
use crate::services::knowledge_base::FoodKnowledgeBase;
use crate::services::portion::PortionScale;
use crate::services::rationale::{smart_swaps_applied, RationaleGenerator, RecommendationInputs};

/// Namespace for name-based chart ids.
const CHART_NAMESPACE: Uuid = Uuid::from_u128(0x5f1c_2a9e_7d4b_4c8a_9e61_3b0d_a7c2_e410);

/// Pure diet chart pipeline over a shared, immutable knowledge base.
#[derive(Debug, Clone)]
pub struct DietChartEngine {
    kb: Arc<FoodKnowledgeBase>,
    config: DietEngineConfig,
    climate: ClimateAdapter,
}

impl DietChartEngine {
    pub fn new(kb: Arc<FoodKnowledgeBase>, mut config: DietEngineConfig) -> Self {
        if !config.meal_split.is_valid() {
            warn!(
                "Meal split {:?} does not sum to 100, using default split",
                config.meal_split
            );
            config.meal_split = MealSplit::default();
        }

        Self {
            climate: ClimateAdapter::new(&config.climate),
            kb,
            config,
        }
    }

    pub fn knowledge_base(&self) -> &FoodKnowledgeBase {
        &self.kb
    }

    pub fn config(&self) -> &DietEngineConfig {
        &self.config
    }

    /// Builds a chart from already-fetched weather and already-parsed recipes.
    /// Identical inputs always produce an identical chart.
    #[instrument(skip_all, fields(city = %climate.city))]
    pub fn generate(
        &self,
        request: &DietChartRequest,
        climate: &ClimateContext,
        recipes: &ParsedRecipes,
    ) -> Result<DietChart, DietChartError> {
        let (profile, _city) = request.validate()?;
        let preferences = &request.diet_preferences;

        let constraints = DietaryConstraints::new(&profile.allergies, preferences);
        let weights = self.climate.dosha_weights(climate);
        let estimate = estimate_daily_calories(profile, preferences, &self.config);
        let portion = PortionScale::for_profile(profile);

        debug!(
            "Generating chart for {}: target {} kcal, weights {:?}, portion x{:.2}",
            profile.patient_id, estimate.target, weights, portion.multiplier
        );

        let composer = MealComposer::new(
            &self.kb,
            ConstraintResolver::new(&self.kb, &constraints),
            weights,
            &profile.constitution,
            self.config.meal_split,
        );
        let plan = composer.compose_day(recipes, estimate.target, portion.multiplier);

        let rationale = RationaleGenerator::new(profile, climate, weights);
        let mut portion_adjustments = BTreeMap::new();
        let mut meals = Vec::with_capacity(plan.meals.len());

        for meal in plan.meals {
            let foods: Vec<_> = meal
                .servings
                .into_iter()
                .map(|serving| serving.into_serving(&portion))
                .collect();

            for food in foods.iter().filter(|f| !f.estimated) {
                portion_adjustments
                    .entry(food.name.clone())
                    .or_insert_with(|| portion.describe(profile));
            }

            let protein: f64 = foods.iter().map(|f| f.protein).sum();
            let carbs: f64 = foods.iter().map(|f| f.carbs).sum();
            let fat: f64 = foods.iter().map(|f| f.fat).sum();

            let mut entry = MealPlanEntry {
                meal_type: meal.meal_type,
                total_calories: foods.iter().map(|f| f.calories).sum(),
                nutrient_bars: nutrient_bars(protein, carbs, fat),
                ayurvedic_profile: ayurvedic_profile(&foods),
                ayurvedic_rationale: String::new(),
                source: meal.source,
                foods,
            };
            entry.ayurvedic_rationale = rationale.meal_rationale(&entry, meal.recipe_ingredient_count);
            meals.push(entry);
        }

        let recommendations = rationale.recommendations(&RecommendationInputs {
            calorie_estimate: &estimate,
            min_daily_calories: self.config.min_daily_calories,
            max_daily_calories: self.config.max_daily_calories,
            portion: &portion,
            meals: &meals,
            swaps: &plan.swaps,
            allergies: constraints.allergies(),
            warnings: &plan.warnings,
            unknown_ingredients: &plan.unknown_ingredients,
            top_ups: &plan.top_ups,
            notes: &recipes.notes,
            custom_preferences: preferences.custom_preferences.as_deref(),
        });

        let chart = DietChart {
            chart_id: chart_id(request, climate, recipes),
            patient_id: profile.patient_id.clone(),
            total_daily_calories: estimate.target,
            ayurvedic_analysis: rationale.analysis(&meals),
            smart_swaps_applied: smart_swaps_applied(&plan.swaps),
            meals,
            weather_context: climate.clone(),
            dosha_weights: weights,
            calorie_estimate: estimate,
            recommendations,
            portion_adjustments,
        };

        info!(
            "Generated diet chart {} for patient {} ({} kcal, {} swaps)",
            chart.chart_id,
            chart.patient_id,
            chart.total_daily_calories,
            chart.smart_swaps_applied.len()
        );

        Ok(chart)
    }
}

/// Name-based id over the serialized inputs.
fn chart_id(request: &DietChartRequest, climate: &ClimateContext, recipes: &ParsedRecipes) -> Uuid {
    let bytes = serde_json::to_vec(&(request, climate, recipes)).unwrap_or_default();
    Uuid::new_v5(&CHART_NAMESPACE, &bytes)
}
