use std::sync::Arc;
use std::thread;

use assert_matches::assert_matches;
use serde_json::Value;

use diet_chart_cell::models::{
    ClimateContext, DietChart, DietChartError, DietChartRequest, MealSource, MealType, ParsedRecipes,
};
use diet_chart_cell::services::engine::DietChartEngine;
use diet_chart_cell::services::knowledge_base::FoodKnowledgeBase;
use diet_chart_cell::services::recipe_parser::RecipeParser;
use shared_config::DietEngineConfig;
use shared_utils::test_utils::{DietChartFixtures, TestPatient};

fn engine() -> DietChartEngine {
    let kb = Arc::new(FoodKnowledgeBase::embedded().unwrap());
    DietChartEngine::new(kb, DietEngineConfig::default())
}

fn request(value: Value) -> DietChartRequest {
    serde_json::from_value(value).unwrap()
}

/// Runs the same steps as the HTTP handler: parse recipes, then generate.
fn generate(engine: &DietChartEngine, request: &DietChartRequest) -> DietChart {
    let parser = RecipeParser::new(engine.knowledge_base()).unwrap();
    let recipes = parser.parse_recipes(request.meal_recipes.as_ref());
    let climate = request.climate.clone().unwrap();
    engine.generate(request, &climate, &recipes).unwrap()
}

fn hot_pitta_request() -> DietChartRequest {
    request(DietChartFixtures::request_with_climate(
        &TestPatient::default(),
        "Chennai",
        38.0,
        80.0,
        "Summer",
    ))
}

fn served_names(chart: &DietChart) -> Vec<&str> {
    chart
        .meals
        .iter()
        .flat_map(|m| m.foods.iter())
        .map(|f| f.name.as_str())
        .collect()
}

#[test]
fn test_meal_calories_sum_to_daily_target() {
    let engine = engine();
    let patients = [
        TestPatient::default(),
        TestPatient::new("P-2", 8, "Female", "Vata"),
        TestPatient::new("P-3", 72, "Male", "Kapha").with_activity("Low"),
        TestPatient::new("P-4", 24, "Other", "Vata-Pitta").with_activity("High"),
    ];

    for patient in &patients {
        let chart = generate(
            &engine,
            &request(DietChartFixtures::request_with_climate(patient, "Delhi", 12.0, 30.0, "Winter")),
        );

        let total: u32 = chart.meals.iter().map(|m| m.total_calories).sum();
        let target = f64::from(chart.total_daily_calories);
        let drift = (f64::from(total) - target).abs() / target;
        assert!(
            drift <= 0.05,
            "{}: meals total {} kcal for a {} kcal target",
            patient.patient_id,
            total,
            chart.total_daily_calories
        );
    }
}

#[test]
fn test_nutrient_bars_cover_each_meal() {
    let chart = generate(&engine(), &hot_pitta_request());

    assert_eq!(chart.meals.len(), 4);
    for meal in &chart.meals {
        assert!(!meal.foods.is_empty(), "{} is empty", meal.meal_type);
        let total = meal.nutrient_bars.total();
        assert!((98..=100).contains(&total), "{} bars total {}", meal.meal_type, total);
    }
}

#[test]
fn test_generation_is_idempotent() {
    let engine = engine();
    let request = request(DietChartFixtures::with_breakfast_recipe(
        DietChartFixtures::request_with_climate(&TestPatient::default(), "Pune", 27.0, 65.0, "Monsoon"),
        "Idli with coconut chutney",
    ));

    let first = generate(&engine, &request);
    let second = generate(&engine, &request);
    assert_eq!(first, second);
    assert_eq!(first.chart_id, second.chart_id);
}

#[test]
fn test_different_patients_get_different_chart_ids() {
    let engine = engine();
    let a = generate(&engine, &hot_pitta_request());
    let b = generate(
        &engine,
        &request(DietChartFixtures::request_with_climate(
            &TestPatient::new("P-9", 35, "Male", "Pitta"),
            "Chennai",
            38.0,
            80.0,
            "Summer",
        )),
    );
    assert_ne!(a.chart_id, b.chart_id);
}

#[test]
fn test_concurrent_generation_over_shared_knowledge_base() {
    let engine = engine();
    let request = hot_pitta_request();
    let expected = generate(&engine, &request);

    let charts: Vec<DietChart> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| generate(&engine, &request)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for chart in charts {
        assert_eq!(chart, expected);
    }
}

#[test]
fn test_no_allergen_reaches_the_plate() {
    let engine = engine();
    let patient = TestPatient::default().with_allergies(&["coconut", "peanut"]);
    let value = DietChartFixtures::with_preferences(
        DietChartFixtures::request_with_climate(&patient, "Mumbai", 31.0, 85.0, "Monsoon"),
        &["dairy"],
        &[],
        "Vegetarian",
    );
    let chart = generate(&engine, &request(value));

    for food in chart.meals.iter().flat_map(|m| m.foods.iter()) {
        for allergen in ["coconut", "peanut", "dairy"] {
            assert!(
                !food.allergens.iter().any(|a| a == allergen),
                "{} carries {}",
                food.name,
                allergen
            );
            assert!(!food.name.to_lowercase().contains(allergen), "{} served", food.name);
        }
        assert_ne!(food.name, "Chicken");
        assert_ne!(food.name, "Fish");
    }
    assert!(chart
        .recommendations
        .iter()
        .any(|r| r.contains("coconut, peanut, dairy")));
}

#[test]
fn test_portion_multipliers_stay_in_range() {
    let engine = engine();
    for (age, gender, activity) in [
        (4, "Male", "High"),
        (15, "Female", "Low"),
        (30, "Male", "High"),
        (58, "Other", "Moderate"),
        (90, "Female", "Low"),
    ] {
        let patient = TestPatient::new("P-range", age, gender, "Tridoshic").with_activity(activity);
        let chart = generate(
            &engine,
            &request(DietChartFixtures::request_with_climate(&patient, "Pune", 25.0, 60.0, "Spring")),
        );
        for food in chart.meals.iter().flat_map(|m| m.foods.iter()) {
            let multiplier = food.portion_info.multiplier;
            assert!((0.6..=1.6).contains(&multiplier), "age {}: {}", age, multiplier);
        }
    }
}

#[test]
fn test_hot_humid_pitta_scenario() {
    let chart = generate(&engine(), &hot_pitta_request());

    assert_eq!(chart.dosha_weights.pitta, 1.0);
    assert!(chart.ayurvedic_analysis.contains("cooling"));
    assert!(chart.ayurvedic_analysis.contains("Pitta-reducing"));
    assert_eq!(chart.calorie_estimate.target, 2488);
    assert_eq!(chart.total_daily_calories, 2488);
    assert!(chart
        .recommendations
        .iter()
        .any(|r| r.starts_with("Strong heat detected")));
    assert_eq!(chart.weather_context.city, "Chennai");
}

#[test]
fn test_disliked_recipe_food_is_swapped() {
    let value = DietChartFixtures::with_preferences(
        DietChartFixtures::request_with_climate(&TestPatient::default(), "Chennai", 38.0, 80.0, "Summer"),
        &[],
        &["curd"],
        "Vegetarian",
    );
    let mut value = value;
    value["meal_recipes"] = serde_json::json!({ "lunch": { "recipe_text": "Curd rice" } });

    let chart = generate(&engine(), &request(value));

    assert!(chart
        .smart_swaps_applied
        .contains(&"Curd → Buttermilk".to_string()));
    let lunch = chart
        .meals
        .iter()
        .find(|m| m.meal_type == MealType::Lunch)
        .unwrap();
    assert_eq!(lunch.source, MealSource::Recipe);
    let buttermilk = lunch.foods.iter().find(|f| f.name == "Buttermilk").unwrap();
    assert_eq!(buttermilk.substituted_for.as_deref(), Some("Curd"));
    assert!(lunch.foods.iter().any(|f| f.name == "Curry Leaves (estimated)" && f.estimated));
}

#[test]
fn test_unconstrained_patient_uses_knowledge_base_everywhere() {
    let chart = generate(&engine(), &hot_pitta_request());

    for meal in &chart.meals {
        assert_eq!(meal.source, MealSource::KnowledgeBase);
    }
    assert!(chart.smart_swaps_applied.is_empty());
    assert!(!chart.portion_adjustments.is_empty());
}

#[test]
fn test_coconut_allergy_swaps_breakfast_chutney() {
    let patient = TestPatient::default().with_allergies(&["coconut"]);
    let value = DietChartFixtures::with_breakfast_recipe(
        DietChartFixtures::request_with_climate(&patient, "Chennai", 30.0, 75.0, "Summer"),
        "Idli with coconut chutney",
    );
    let chart = generate(&engine(), &request(value));

    assert!(chart
        .smart_swaps_applied
        .contains(&"Coconut Chutney → Tomato Chutney".to_string()));

    let breakfast = &chart.meals[0];
    assert_eq!(breakfast.meal_type, MealType::Breakfast);
    assert_eq!(breakfast.source, MealSource::Recipe);
    let names: Vec<&str> = breakfast.foods.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Idli", "Tomato Chutney"]);
    assert!(breakfast.ayurvedic_rationale.starts_with("Based on the submitted breakfast recipe"));

    assert!(!served_names(&chart).iter().any(|n| n.contains("Coconut")));
}

#[test]
fn test_low_calorie_recipe_keeps_sensible_portions() {
    let engine = engine();
    for (recipe, food, quantity) in [("Ginger tea", "Ginger Tea", "330ml"), ("Black pepper", "Black Pepper", "3g")] {
        let value = DietChartFixtures::with_breakfast_recipe(
            DietChartFixtures::request_with_climate(&TestPatient::default(), "Chennai", 38.0, 80.0, "Summer"),
            recipe,
        );
        let chart = generate(&engine, &request(value));

        let breakfast = &chart.meals[0];
        assert_eq!(breakfast.source, MealSource::Recipe);
        assert_eq!(breakfast.foods[0].name, food);
        assert_eq!(breakfast.foods[0].quantity, quantity);
        assert!(breakfast.foods.len() > 1, "{} was not topped up", recipe);

        let allocation = f64::from(chart.total_daily_calories) * 0.25;
        let drift = (f64::from(breakfast.total_calories) - allocation).abs() / allocation;
        assert!(drift <= 0.05, "{}: breakfast {} kcal", recipe, breakfast.total_calories);
        assert!(chart
            .recommendations
            .iter()
            .any(|r| r.starts_with("The breakfast recipe was rounded out with")));
    }
}

#[test]
fn test_unresolvable_recipe_food_is_left_out_with_warning() {
    let value = DietChartFixtures::with_breakfast_recipe(
        DietChartFixtures::with_preferences(
            DietChartFixtures::request_with_climate(&TestPatient::default(), "Chennai", 30.0, 70.0, "Summer"),
            &[],
            &[],
            "Vegan",
        ),
        "Paneer with rice",
    );
    let chart = generate(&engine(), &request(value));

    let breakfast = &chart.meals[0];
    assert_eq!(breakfast.source, MealSource::Recipe);
    assert!(breakfast.foods.iter().any(|f| f.name == "Basmati Rice"));
    assert!(!served_names(&chart).contains(&"Paneer"));
    assert!(chart.recommendations.iter().any(|r| r.starts_with(
        "Warning: Left Paneer out of Breakfast because of Vegan diet; no dairy with a shared taste is safe to use instead"
    )));
}

#[test]
fn test_validation_errors_come_before_generation() {
    let engine = engine();
    let climate = ClimateContext {
        temperature: 25.0,
        humidity: 60.0,
        season: diet_chart_cell::models::Season::Spring,
        city: "Pune".to_string(),
        description: String::new(),
    };

    let mut missing_city = hot_pitta_request();
    missing_city.city_name = Some("   ".to_string());
    assert_matches!(
        engine.generate(&missing_city, &climate, &ParsedRecipes::default()),
        Err(DietChartError::Validation(msg)) if msg.contains("city_name")
    );

    let mut zero_age = hot_pitta_request();
    if let Some(profile) = zero_age.patient_profile.as_mut() {
        profile.age = 0;
    }
    assert_matches!(
        engine.generate(&zero_age, &climate, &ParsedRecipes::default()),
        Err(DietChartError::Validation(msg)) if msg.contains("age")
    );
}

#[test]
fn test_unparseable_constitution_is_rejected() {
    let mut value = DietChartFixtures::request_with_climate(&TestPatient::default(), "Pune", 25.0, 60.0, "Spring");
    value["patient_profile"]["constitution"] = Value::String("Fire".to_string());

    assert!(serde_json::from_value::<DietChartRequest>(value).is_err());
}
