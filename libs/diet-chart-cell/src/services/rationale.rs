// libs/diet-chart-cell/src/services/rationale.rs
use std::collections::BTreeSet;

use crate::models::{
    CalorieEstimate, CalorieSource, ClimateContext, Constitution, Dosha, DoshaEffect, DoshaWeights,
    MealPlanEntry, MealSource, MealType, PatientProfile, Virya,
};
use crate::services::climate::dominant_dosha;
use crate::services::composer::SwapRecord;
use crate::services::portion::PortionScale;

fn dosha_nature(dosha: Dosha) -> &'static str {
    match dosha {
        Dosha::Vata => "Vata (air and space) governs movement and tends toward dryness, cold and irregular digestion",
        Dosha::Pitta => "Pitta (fire and water) governs metabolism and tends toward heat, acidity and inflammation",
        Dosha::Kapha => "Kapha (earth and water) governs structure and tends toward heaviness, congestion and sluggish digestion",
    }
}

fn counter_strategy(dosha: Dosha) -> &'static str {
    match dosha {
        Dosha::Pitta => "cooling, Pitta-reducing foods with sweet, bitter and astringent tastes",
        Dosha::Vata => "warm, grounding, Vata-reducing foods with sweet, sour and salty tastes",
        Dosha::Kapha => "light, warming, Kapha-reducing foods with pungent, bitter and astringent tastes",
    }
}

/// Everything the recommendation rules look at.
pub struct RecommendationInputs<'a> {
    pub calorie_estimate: &'a CalorieEstimate,
    pub min_daily_calories: u32,
    pub max_daily_calories: u32,
    pub portion: &'a PortionScale,
    pub meals: &'a [MealPlanEntry],
    pub swaps: &'a [SwapRecord],
    pub allergies: &'a [String],
    pub warnings: &'a [String],
    pub unknown_ingredients: &'a [String],
    pub top_ups: &'a [String],
    pub notes: &'a [String],
    pub custom_preferences: Option<&'a str>,
}

pub struct RationaleGenerator<'a> {
    profile: &'a PatientProfile,
    climate: &'a ClimateContext,
    weights: DoshaWeights,
}

impl<'a> RationaleGenerator<'a> {
    pub fn new(profile: &'a PatientProfile, climate: &'a ClimateContext, weights: DoshaWeights) -> Self {
        Self {
            profile,
            climate,
            weights,
        }
    }

    fn constitution(&self) -> &Constitution {
        &self.profile.constitution
    }

    fn weather_phrase(&self) -> String {
        format!(
            "{} weather ({:.0}°C, {:.0}% humidity)",
            self.climate.season.to_string().to_lowercase(),
            self.climate.temperature,
            self.climate.humidity
        )
    }

    pub fn meal_rationale(&self, meal: &MealPlanEntry, recipe_ingredient_count: usize) -> String {
        if meal.foods.is_empty() {
            return format!(
                "No foods could be served for {} within the patient's restrictions.",
                meal.meal_type.as_str().to_lowercase()
            );
        }

        let mut sentences = Vec::new();
        if meal.source == MealSource::Recipe {
            sentences.push(format!(
                "Based on the submitted {} recipe with {} ingredient{}.",
                meal.meal_type.as_str().to_lowercase(),
                recipe_ingredient_count,
                if recipe_ingredient_count == 1 { "" } else { "s" }
            ));
        }

        let profile = &meal.ayurvedic_profile;
        let tastes: Vec<&str> = profile.rasa.iter().take(2).map(|r| r.as_str()).collect();
        let potency = match profile.virya {
            Some(Virya::Cooling) => "cooling ",
            Some(Virya::Heating) => "warming ",
            None => "",
        };
        if tastes.is_empty() {
            sentences.push(format!(
                "A {}{} for a {} constitution.",
                potency,
                meal.meal_type.as_str().to_lowercase(),
                self.constitution()
            ));
        } else {
            let lead = if tastes.len() == 1 { "taste leads" } else { "tastes lead" };
            sentences.push(format!(
                "{} {} this {}{} for a {} constitution.",
                tastes.join(" and "),
                lead,
                potency,
                meal.meal_type.as_str().to_lowercase(),
                self.constitution()
            ));
        }

        let balance: Vec<String> = self
            .constitution()
            .doshas()
            .iter()
            .map(|dosha| match profile.dosha_effect.get(*dosha) {
                DoshaEffect::Decrease => format!("pacifies {}", dosha),
                DoshaEffect::Increase => format!("may raise {}, so keep portions steady", dosha),
                DoshaEffect::Neutral => format!("keeps {} steady", dosha),
            })
            .collect();
        sentences.push(format!("Overall it {}.", balance.join(" and ")));

        match dominant_dosha(&self.weights) {
            Some(dosha) => {
                let fit = match profile.dosha_effect.get(dosha) {
                    DoshaEffect::Decrease => "counters",
                    DoshaEffect::Neutral => "stays neutral to",
                    DoshaEffect::Increase => "adds to",
                };
                sentences.push(format!(
                    "It {} the {}-aggravating {}.",
                    fit,
                    dosha,
                    self.weather_phrase()
                ));
            }
            None => sentences.push(format!("Suited to the current {}.", self.weather_phrase())),
        }

        sentences.join(" ")
    }

    pub fn analysis(&self, meals: &[MealPlanEntry]) -> String {
        let constitution = self.constitution();
        let natures: Vec<&str> = constitution.doshas().iter().map(|d| dosha_nature(*d)).collect();

        let mut text = format!(
            "{}'s {} constitution: {}.",
            display_name(self.profile),
            constitution,
            natures.join("; ")
        );

        match dominant_dosha(&self.weights) {
            Some(dosha) => {
                text.push_str(&format!(
                    " The {} in {} aggravates {} most (climate weight {:+.2}).",
                    self.weather_phrase(),
                    city_label(self.climate),
                    dosha,
                    self.weights.get(dosha)
                ));
                text.push_str(&format!(" The plan counters this with {}", counter_strategy(dosha)));
                let examples = pacifying_examples(meals, dosha);
                if examples.is_empty() {
                    text.push('.');
                } else {
                    text.push_str(&format!(", such as {}.", examples.join(" and ")));
                }
            }
            None => {
                text.push_str(&format!(
                    " The {} in {} is balanced, so the plan focuses on keeping the {} constitution steady.",
                    self.weather_phrase(),
                    city_label(self.climate),
                    constitution
                ));
            }
        }

        if let Some(primary) = constitution.doshas().first() {
            if dominant_dosha(&self.weights) != Some(*primary) {
                text.push_str(&format!(
                    " Foods were also chosen to keep {} in balance through {}.",
                    primary,
                    counter_strategy(*primary)
                ));
            }
        }

        text
    }

    pub fn recommendations(&self, inputs: &RecommendationInputs<'_>) -> Vec<String> {
        let mut recommendations = Vec::new();

        // Climate
        if self.weights.pitta >= 0.6 {
            recommendations.push(
                "Strong heat detected: favour cooling, Pitta-reducing foods and avoid fried or very spicy dishes."
                    .to_string(),
            );
        } else if self.weights.pitta >= 0.3 {
            recommendations.push("Warm weather: favour cooling foods and stay well hydrated.".to_string());
        }
        if self.weights.vata >= 0.5 {
            recommendations.push(
                "Cold or dry weather detected: favour warm, moist, grounding meals and warm drinks.".to_string(),
            );
        }
        if self.weights.kapha >= 0.5 {
            recommendations.push(
                "Damp weather detected: prefer light, warm, freshly cooked meals and limit heavy dairy.".to_string(),
            );
        }

        // Constitution
        recommendations.push(format!(
            "Foods were selected to balance the {} constitution.",
            self.constitution()
        ));

        // Calories
        let estimate = inputs.calorie_estimate;
        let mut calories = match (estimate.source, estimate.bmr, estimate.activity_multiplier) {
            (CalorieSource::Estimated, Some(bmr), Some(multiplier)) => format!(
                "Daily calorie target of {} kcal estimated for a {}-year-old {} with {} activity (basal {} kcal x {})",
                estimate.target,
                self.profile.age,
                self.profile.gender,
                self.profile.activity_level,
                bmr,
                multiplier
            ),
            _ => format!("Daily calorie target of {} kcal set by the practitioner", estimate.target),
        };
        if estimate.clamped {
            calories.push_str(&format!(
                ", adjusted from {} kcal to stay within {}-{} kcal",
                estimate.unclamped, inputs.min_daily_calories, inputs.max_daily_calories
            ));
        }
        calories.push('.');
        recommendations.push(calories);

        // Portions
        recommendations.push(format!("{}.", inputs.portion.describe(self.profile)));

        // Recipes
        let recipe_meals: Vec<MealType> = inputs
            .meals
            .iter()
            .filter(|m| m.source == MealSource::Recipe)
            .map(|m| m.meal_type)
            .collect();
        if !recipe_meals.is_empty() {
            let names: Vec<&str> = recipe_meals.iter().map(MealType::as_str).collect();
            recommendations.push(format!("Custom recipes were used for {}.", names.join(", ")));
        }
        recommendations.extend(inputs.top_ups.iter().cloned());

        // Swaps
        let swap_count = smart_swaps_applied(inputs.swaps).len();
        if swap_count > 0 {
            recommendations.push(format!(
                "{} smart swap{} applied to respect allergies, dislikes and diet type.",
                swap_count,
                if swap_count == 1 { " was" } else { "s were" }
            ));
        }
        if !inputs.allergies.is_empty() {
            recommendations.push(format!(
                "Every food was checked against these allergies: {}.",
                inputs.allergies.join(", ")
            ));
        }

        for warning in inputs.warnings {
            recommendations.push(format!("Warning: {}.", warning.trim_end_matches('.')));
        }

        if !inputs.unknown_ingredients.is_empty() {
            recommendations.push(format!(
                "Nutrition for {} is not in the food database; those items are shown as estimates without calories.",
                inputs.unknown_ingredients.join(", ")
            ));
        }

        recommendations.extend(inputs.notes.iter().cloned());

        if let Some(custom) = inputs.custom_preferences.map(str::trim).filter(|c| !c.is_empty()) {
            recommendations.push(format!("Practitioner note: {}", custom));
        }

        recommendations
    }
}

/// "Original → Replacement" labels, first occurrence order, no repeats.
pub fn smart_swaps_applied(swaps: &[SwapRecord]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    swaps
        .iter()
        .filter(|swap| seen.insert((swap.original.as_str(), swap.replacement.as_str())))
        .map(SwapRecord::label)
        .collect()
}

fn pacifying_examples(meals: &[MealPlanEntry], dosha: Dosha) -> Vec<String> {
    let mut foods: Vec<(u32, &str)> = meals
        .iter()
        .flat_map(|m| m.foods.iter())
        .filter(|f| !f.estimated && f.dosha_effect.get(dosha) == DoshaEffect::Decrease)
        .map(|f| (f.calories, f.name.as_str()))
        .collect();
    foods.sort_by(|(ca, na), (cb, nb)| cb.cmp(ca).then_with(|| na.cmp(nb)));

    let mut examples: Vec<String> = Vec::new();
    for (_, name) in foods {
        if !examples.iter().any(|e| e == name) {
            examples.push(name.to_string());
        }
        if examples.len() == 2 {
            break;
        }
    }
    examples
}

fn display_name(profile: &PatientProfile) -> &str {
    if profile.name.trim().is_empty() {
        "The patient"
    } else {
        profile.name.trim()
    }
}

fn city_label(climate: &ClimateContext) -> &str {
    if climate.city.trim().is_empty() {
        "the patient's city"
    } else {
        climate.city.trim()
    }
}
