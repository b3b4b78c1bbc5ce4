pub mod knowledge_base;
pub mod constraints;
pub mod climate;
pub mod portion;
pub mod composer;
pub mod rationale;
pub mod engine;
pub mod recipe_parser;
pub mod weather;

pub use knowledge_base::FoodKnowledgeBase;
pub use constraints::{ConflictReason, ConstraintResolver, DietaryConstraints, Resolution};
pub use climate::ClimateAdapter;
pub use portion::PortionScale;
pub use composer::MealComposer;
pub use rationale::RationaleGenerator;
pub use engine::DietChartEngine;
pub use recipe_parser::RecipeParser;
pub use weather::{OpenWeatherClient, StaticWeatherProvider, WeatherError, WeatherProvider};
