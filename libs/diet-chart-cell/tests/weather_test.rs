use assert_matches::assert_matches;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use diet_chart_cell::models::Season;
use diet_chart_cell::services::weather::{
    provider_from_config, OpenWeatherClient, WeatherError, WeatherProvider,
};
use shared_utils::test_utils::{MockOpenWeatherResponses, TestConfig};

#[tokio::test]
async fn test_openweather_current_climate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "Chennai"))
        .and(query_param("appid", "test-openweather-key"))
        .and(query_param("units", "metric"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(MockOpenWeatherResponses::current_weather("Chennai", 38.0, 80.0, "haze")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = TestConfig::with_weather_server(&server.uri()).to_app_config();
    let client = OpenWeatherClient::new(&config).unwrap();

    let climate = client.current_climate("Chennai").await.unwrap();
    assert_eq!(climate.temperature, 38.0);
    assert_eq!(climate.humidity, 80.0);
    assert_eq!(climate.city, "Chennai");
    assert_eq!(climate.description, "haze");
    assert_eq!(climate.season, Season::Summer);
}

#[tokio::test]
async fn test_openweather_city_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(MockOpenWeatherResponses::error_response("city not found", 404)),
        )
        .mount(&server)
        .await;

    let config = TestConfig::with_weather_server(&server.uri()).to_app_config();
    let client = OpenWeatherClient::new(&config).unwrap();

    let result = client.current_climate("Atlantis").await;
    assert_matches!(result, Err(WeatherError::Api { status: 404, ref message }) if message.contains("city not found"));
}

#[tokio::test]
async fn test_openweather_unexpected_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"main\": {}}"))
        .mount(&server)
        .await;

    let config = TestConfig::with_weather_server(&server.uri()).to_app_config();
    let client = OpenWeatherClient::new(&config).unwrap();

    assert_matches!(client.current_climate("Pune").await, Err(WeatherError::Http(_)));
}

#[tokio::test]
async fn test_provider_from_config_without_key_is_static() {
    let config = TestConfig::offline().to_app_config();
    let provider = provider_from_config(&config);

    let climate = provider.current_climate("Shimla").await.unwrap();
    assert_eq!(climate.city, "Shimla");
    assert_eq!(climate.temperature, 25.0);
    assert_eq!(climate.humidity, 60.0);
}
