
use serde_json::{json, Value};

use shared_config::{AppConfig, DietEngineConfig};

pub struct TestConfig {
    pub openweather_api_key: String,
    pub openweather_base_url: String,
    pub food_catalog_path: Option<String>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            openweather_api_key: "test-openweather-key".to_string(),
            openweather_base_url: "http://localhost:18080/data/2.5".to_string(),
            food_catalog_path: None,
        }
    }
}

impl TestConfig {
    /// Config pointing the weather client at a mock server.
    pub fn with_weather_server(base_url: &str) -> Self {
        Self {
            openweather_base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// Config with no weather credentials, so the static climate is used.
    pub fn offline() -> Self {
        Self {
            openweather_api_key: String::new(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            port: 0,
            openweather_api_key: self.openweather_api_key.clone(),
            openweather_base_url: self.openweather_base_url.clone(),
            food_catalog_path: self.food_catalog_path.clone(),
            diet_engine: DietEngineConfig::default(),
        }
    }
}

pub struct TestPatient {
    pub patient_id: String,
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub city: String,
    pub constitution: String,
    pub allergies: Vec<String>,
    pub activity_level: String,
}

impl Default for TestPatient {
    fn default() -> Self {
        Self {
            patient_id: "P-1001".to_string(),
            name: "Test Patient".to_string(),
            age: 35,
            gender: "Male".to_string(),
            city: "Chennai".to_string(),
            constitution: "Pitta".to_string(),
            allergies: Vec::new(),
            activity_level: "Moderate".to_string(),
        }
    }
}

impl TestPatient {
    pub fn new(patient_id: &str, age: u32, gender: &str, constitution: &str) -> Self {
        Self {
            patient_id: patient_id.to_string(),
            age,
            gender: gender.to_string(),
            constitution: constitution.to_string(),
            ..Self::default()
        }
    }

    pub fn with_allergies(mut self, allergies: &[&str]) -> Self {
        self.allergies = allergies.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_activity(mut self, activity_level: &str) -> Self {
        self.activity_level = activity_level.to_string();
        self
    }

    pub fn to_json(&self) -> Value {
        json!({
            "patient_id": self.patient_id,
            "name": self.name,
            "age": self.age,
            "gender": self.gender,
            "city": self.city,
            "constitution": self.constitution,
            "condition": "",
            "allergies": self.allergies,
            "activity_level": self.activity_level
        })
    }
}

pub struct DietChartFixtures;

impl DietChartFixtures {
    /// Chart request with a fixed climate, so no weather lookup happens.
    pub fn request_with_climate(
        patient: &TestPatient,
        city: &str,
        temperature: f64,
        humidity: f64,
        season: &str,
    ) -> Value {
        json!({
            "patient_profile": patient.to_json(),
            "diet_preferences": {
                "allergies": [],
                "dislikes": [],
                "diet_type": "Non-Vegetarian"
            },
            "city_name": city,
            "climate": {
                "temperature": temperature,
                "humidity": humidity,
                "season": season,
                "city": city,
                "description": "clear sky"
            }
        })
    }

    /// Chart request that relies on the configured weather provider.
    pub fn request_for_city(patient: &TestPatient, city: &str) -> Value {
        json!({
            "patient_profile": patient.to_json(),
            "diet_preferences": {},
            "city_name": city
        })
    }

    pub fn with_breakfast_recipe(mut request: Value, recipe_text: &str) -> Value {
        request["meal_recipes"] = json!({
            "breakfast": { "recipe_text": recipe_text }
        });
        request
    }

    pub fn with_preferences(mut request: Value, allergies: &[&str], dislikes: &[&str], diet_type: &str) -> Value {
        request["diet_preferences"] = json!({
            "allergies": allergies,
            "dislikes": dislikes,
            "diet_type": diet_type
        });
        request
    }
}

pub struct MockOpenWeatherResponses;

impl MockOpenWeatherResponses {
    pub fn current_weather(city: &str, temperature: f64, humidity: f64, description: &str) -> Value {
        json!({
            "coord": { "lon": 80.28, "lat": 13.09 },
            "weather": [
                { "id": 721, "main": "Haze", "description": description, "icon": "50d" }
            ],
            "main": {
                "temp": temperature,
                "feels_like": temperature + 2.0,
                "temp_min": temperature - 1.0,
                "temp_max": temperature + 1.0,
                "pressure": 1008,
                "humidity": humidity
            },
            "name": city,
            "cod": 200
        })
    }

    pub fn error_response(message: &str, code: u16) -> Value {
        json!({
            "cod": code.to_string(),
            "message": message
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default().to_app_config();
        assert!(config.is_weather_configured());
        assert_eq!(config.openweather_api_key, "test-openweather-key");

        let offline = TestConfig::offline().to_app_config();
        assert!(!offline.is_weather_configured());
    }

    #[test]
    fn test_patient_fixture() {
        let patient = TestPatient::new("P-7", 70, "Female", "Vata-Kapha").with_allergies(&["peanut"]);
        let value = patient.to_json();

        assert_eq!(value["age"], 70);
        assert_eq!(value["constitution"], "Vata-Kapha");
        assert_eq!(value["allergies"][0], "peanut");
    }

    #[test]
    fn test_request_fixture_carries_recipe() {
        let request = DietChartFixtures::request_with_climate(&TestPatient::default(), "Chennai", 38.0, 80.0, "Summer");
        let request = DietChartFixtures::with_breakfast_recipe(request, "Idli with coconut chutney");

        assert_eq!(request["climate"]["temperature"], 38.0);
        assert_eq!(request["meal_recipes"]["breakfast"]["recipe_text"], "Idli with coconut chutney");
    }
}
