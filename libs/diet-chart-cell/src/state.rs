// libs/diet-chart-cell/src/state.rs
use std::sync::Arc;

use tracing::info;

use shared_config::AppConfig;

use crate::models::DietChartError;
use crate::services::engine::DietChartEngine;
use crate::services::knowledge_base::FoodKnowledgeBase;
use crate::services::recipe_parser::RecipeParser;
use crate::services::weather::{provider_from_config, WeatherProvider};

/// Everything the diet chart handlers share. Built once at startup.
pub struct DietChartState {
    pub engine: DietChartEngine,
    pub recipe_parser: RecipeParser,
    pub weather: Arc<dyn WeatherProvider>,
}

impl DietChartState {
    pub fn new(
        config: &AppConfig,
        kb: Arc<FoodKnowledgeBase>,
        weather: Arc<dyn WeatherProvider>,
    ) -> Result<Self, DietChartError> {
        let recipe_parser = RecipeParser::new(&kb)?;
        let engine = DietChartEngine::new(kb, config.diet_engine.clone());

        Ok(Self {
            engine,
            recipe_parser,
            weather,
        })
    }

    /// Loads the food catalog and picks a weather provider from configuration.
    pub fn from_config(config: AppConfig) -> Result<Self, DietChartError> {
        let kb = FoodKnowledgeBase::load(config.food_catalog_path.as_deref())?;
        info!("Food knowledge base ready with {} items", kb.len());

        let weather = provider_from_config(&config);
        Self::new(&config, Arc::new(kb), weather)
    }

    pub fn knowledge_base(&self) -> &FoodKnowledgeBase {
        self.engine.knowledge_base()
    }
}
