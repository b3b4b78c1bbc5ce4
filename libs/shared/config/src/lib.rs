use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub openweather_api_key: String,
    pub openweather_base_url: String,
    pub food_catalog_path: Option<String>,
    pub diet_engine: DietEngineConfig,
}

/// Tuning tables for the diet chart engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DietEngineConfig {
    pub meal_split: MealSplit,
    pub climate: ClimateThresholds,
    pub min_daily_calories: u32,
    pub max_daily_calories: u32,
}

/// Share of the daily calorie target, in percent, given to each meal slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealSplit {
    pub breakfast: u8,
    pub lunch: u8,
    pub snack: u8,
    pub dinner: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClimateThresholds {
    pub hot_celsius: f64,
    pub extreme_heat_celsius: f64,
    pub cold_celsius: f64,
    pub freezing_celsius: f64,
    pub humid_percent: f64,
    pub dry_percent: f64,
}

impl Default for MealSplit {
    fn default() -> Self {
        Self {
            breakfast: 25,
            lunch: 35,
            snack: 10,
            dinner: 30,
        }
    }
}

impl MealSplit {
    pub fn total(&self) -> u32 {
        self.breakfast as u32 + self.lunch as u32 + self.snack as u32 + self.dinner as u32
    }

    pub fn is_valid(&self) -> bool {
        self.total() == 100
    }
}

impl FromStr for MealSplit {
    type Err = String;

    /// Parses `"25,35,10,30"` (breakfast, lunch, snack, dinner).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<u8>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid meal split '{}': {}", s, e))?;

        let &[breakfast, lunch, snack, dinner] = parts.as_slice() else {
            return Err(format!("meal split '{}' must have exactly four values", s));
        };

        let split = Self { breakfast, lunch, snack, dinner };
        if !split.is_valid() {
            return Err(format!("meal split '{}' must sum to 100, got {}", s, split.total()));
        }
        Ok(split)
    }
}

impl Default for ClimateThresholds {
    fn default() -> Self {
        Self {
            hot_celsius: 32.0,
            extreme_heat_celsius: 36.0,
            cold_celsius: 15.0,
            freezing_celsius: 8.0,
            humid_percent: 70.0,
            dry_percent: 35.0,
        }
    }
}

impl Default for DietEngineConfig {
    fn default() -> Self {
        Self {
            meal_split: MealSplit::default(),
            climate: ClimateThresholds::default(),
            min_daily_calories: 1200,
            max_daily_calories: 4000,
        }
    }
}

impl DietEngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let meal_split = env_or("MEAL_SPLIT", defaults.meal_split);
        let climate = ClimateThresholds {
            hot_celsius: env_or("CLIMATE_HOT_CELSIUS", defaults.climate.hot_celsius),
            extreme_heat_celsius: env_or(
                "CLIMATE_EXTREME_HEAT_CELSIUS",
                defaults.climate.extreme_heat_celsius,
            ),
            cold_celsius: env_or("CLIMATE_COLD_CELSIUS", defaults.climate.cold_celsius),
            freezing_celsius: env_or("CLIMATE_FREEZING_CELSIUS", defaults.climate.freezing_celsius),
            humid_percent: env_or("CLIMATE_HUMID_PERCENT", defaults.climate.humid_percent),
            dry_percent: env_or("CLIMATE_DRY_PERCENT", defaults.climate.dry_percent),
        };

        let mut min_daily_calories = env_or("MIN_DAILY_CALORIES", defaults.min_daily_calories);
        let mut max_daily_calories = env_or("MAX_DAILY_CALORIES", defaults.max_daily_calories);
        if min_daily_calories >= max_daily_calories {
            warn!(
                "MIN_DAILY_CALORIES ({}) must be below MAX_DAILY_CALORIES ({}), using defaults",
                min_daily_calories, max_daily_calories
            );
            min_daily_calories = defaults.min_daily_calories;
            max_daily_calories = defaults.max_daily_calories;
        }

        Self {
            meal_split,
            climate,
            min_daily_calories,
            max_daily_calories,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            port: env_or("PORT", 3000),
            openweather_api_key: env::var("OPENWEATHER_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("OPENWEATHER_API_KEY not set, weather lookups will use a static climate");
                    String::new()
                }),
            openweather_base_url: env::var("OPENWEATHER_BASE_URL")
                .unwrap_or_else(|_| "https://api.openweathermap.org/data/2.5".to_string()),
            food_catalog_path: env::var("FOOD_CATALOG_PATH").ok().filter(|p| !p.trim().is_empty()),
            diet_engine: DietEngineConfig::from_env(),
        };

        if !config.is_weather_configured() {
            warn!("Application not fully configured - missing weather API credentials");
        }

        config
    }

    pub fn is_weather_configured(&self) -> bool {
        !self.openweather_api_key.is_empty() && !self.openweather_base_url.is_empty()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            openweather_api_key: String::new(),
            openweather_base_url: "https://api.openweathermap.org/data/2.5".to_string(),
            food_catalog_path: None,
            diet_engine: DietEngineConfig::default(),
        }
    }
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(value) => value,
            Err(e) => {
                warn!("{} has invalid value '{}' ({}), using default {:?}", key, raw, e, default);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_meal_split_sums_to_100() {
        assert!(MealSplit::default().is_valid());
    }

    #[test]
    fn test_meal_split_parsing() {
        let split: MealSplit = "20,40,10,30".parse().unwrap();
        assert_eq!(split.lunch, 40);

        assert!("25,35,10".parse::<MealSplit>().is_err());
        assert!("25,35,10,40".parse::<MealSplit>().is_err());
        assert!("a,b,c,d".parse::<MealSplit>().is_err());
    }

    #[test]
    fn test_weather_configuration_check() {
        let mut config = AppConfig::default();
        assert!(!config.is_weather_configured());

        config.openweather_api_key = "key".to_string();
        assert!(config.is_weather_configured());
    }
}
