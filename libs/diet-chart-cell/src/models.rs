use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

// ==============================================================================
// AYURVEDIC VOCABULARY
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodCategory {
    #[serde(alias = "Grain", alias = "grains")]
    Grain,
    #[serde(alias = "Vegetable", alias = "vegetables")]
    Vegetable,
    #[serde(alias = "Fruit", alias = "fruits")]
    Fruit,
    #[serde(alias = "Dairy")]
    Dairy,
    #[serde(alias = "Protein", alias = "legumes")]
    Protein,
    #[serde(alias = "Spice", alias = "spices", alias = "herbs")]
    Spice,
    #[serde(alias = "Beverage", alias = "beverages")]
    Beverage,
}

impl FoodCategory {
    pub const ALL: [FoodCategory; 7] = [
        FoodCategory::Grain,
        FoodCategory::Vegetable,
        FoodCategory::Fruit,
        FoodCategory::Dairy,
        FoodCategory::Protein,
        FoodCategory::Spice,
        FoodCategory::Beverage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FoodCategory::Grain => "grain",
            FoodCategory::Vegetable => "vegetable",
            FoodCategory::Fruit => "fruit",
            FoodCategory::Dairy => "dairy",
            FoodCategory::Protein => "protein",
            FoodCategory::Spice => "spice",
            FoodCategory::Beverage => "beverage",
        }
    }
}

impl fmt::Display for FoodCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FoodCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        let needle = needle.strip_suffix('s').unwrap_or(&needle);
        FoodCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| format!("unknown food category '{}'", s))
    }
}

/// Taste (rasa).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rasa {
    #[serde(alias = "sweet", alias = "madhura")]
    Sweet,
    #[serde(alias = "sour", alias = "amla")]
    Sour,
    #[serde(alias = "salty", alias = "lavana")]
    Salty,
    #[serde(alias = "pungent", alias = "katu")]
    Pungent,
    #[serde(alias = "bitter", alias = "tikta")]
    Bitter,
    #[serde(alias = "astringent", alias = "kashaya")]
    Astringent,
}

impl Rasa {
    pub const ALL: [Rasa; 6] = [
        Rasa::Sweet,
        Rasa::Sour,
        Rasa::Salty,
        Rasa::Pungent,
        Rasa::Bitter,
        Rasa::Astringent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rasa::Sweet => "Sweet",
            Rasa::Sour => "Sour",
            Rasa::Salty => "Salty",
            Rasa::Pungent => "Pungent",
            Rasa::Bitter => "Bitter",
            Rasa::Astringent => "Astringent",
        }
    }

    fn sanskrit(&self) -> &'static str {
        match self {
            Rasa::Sweet => "madhura",
            Rasa::Sour => "amla",
            Rasa::Salty => "lavana",
            Rasa::Pungent => "katu",
            Rasa::Bitter => "tikta",
            Rasa::Astringent => "kashaya",
        }
    }
}

impl fmt::Display for Rasa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rasa {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Rasa::ALL
            .into_iter()
            .find(|r| r.as_str().to_lowercase() == needle || r.sanskrit() == needle)
            .ok_or_else(|| format!("unknown taste '{}'", s))
    }
}

/// Potency (virya).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Virya {
    #[serde(alias = "heating", alias = "Hot", alias = "hot", alias = "ushna")]
    Heating,
    #[serde(alias = "cooling", alias = "Cold", alias = "cold", alias = "sheeta")]
    Cooling,
}

/// Post-digestive effect (vipaka).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vipaka {
    #[serde(alias = "sweet")]
    Sweet,
    #[serde(alias = "sour")]
    Sour,
    #[serde(alias = "pungent")]
    Pungent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dosha {
    #[serde(alias = "vata")]
    Vata,
    #[serde(alias = "pitta")]
    Pitta,
    #[serde(alias = "kapha")]
    Kapha,
}

impl Dosha {
    pub const ALL: [Dosha; 3] = [Dosha::Vata, Dosha::Pitta, Dosha::Kapha];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dosha::Vata => "Vata",
            Dosha::Pitta => "Pitta",
            Dosha::Kapha => "Kapha",
        }
    }
}

impl fmt::Display for Dosha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dosha {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Dosha::ALL
            .into_iter()
            .find(|d| d.as_str().to_lowercase() == needle)
            .ok_or_else(|| format!("unknown dosha '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoshaEffect {
    #[serde(alias = "increase", alias = "Aggravates")]
    Increase,
    #[serde(alias = "decrease", alias = "Pacifies")]
    Decrease,
    #[serde(alias = "neutral")]
    Neutral,
}

/// Effect of a food on each dosha. Every dosha carries exactly one entry;
/// a catalog entry missing one of the three keys fails to deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DoshaEffects {
    #[serde(rename = "Vata")]
    pub vata: DoshaEffect,
    #[serde(rename = "Pitta")]
    pub pitta: DoshaEffect,
    #[serde(rename = "Kapha")]
    pub kapha: DoshaEffect,
}

impl DoshaEffects {
    pub fn neutral() -> Self {
        Self {
            vata: DoshaEffect::Neutral,
            pitta: DoshaEffect::Neutral,
            kapha: DoshaEffect::Neutral,
        }
    }

    pub fn get(&self, dosha: Dosha) -> DoshaEffect {
        match dosha {
            Dosha::Vata => self.vata,
            Dosha::Pitta => self.pitta,
            Dosha::Kapha => self.kapha,
        }
    }

    pub fn set(&mut self, dosha: Dosha, effect: DoshaEffect) {
        match dosha {
            Dosha::Vata => self.vata = effect,
            Dosha::Pitta => self.pitta = effect,
            Dosha::Kapha => self.kapha = effect,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DietType {
    #[serde(alias = "vegetarian", alias = "Veg", alias = "veg")]
    Vegetarian,
    #[serde(
        alias = "Non-vegetarian",
        alias = "Non-Vegetarian",
        alias = "non_vegetarian",
        alias = "non-vegetarian",
        alias = "NonVeg"
    )]
    NonVegetarian,
    #[serde(alias = "vegan")]
    Vegan,
    #[serde(alias = "jain")]
    Jain,
    #[serde(alias = "eggetarian")]
    Eggetarian,
}

impl Default for DietType {
    fn default() -> Self {
        DietType::NonVegetarian
    }
}

impl fmt::Display for DietType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DietType::Vegetarian => "Vegetarian",
            DietType::NonVegetarian => "Non-vegetarian",
            DietType::Vegan => "Vegan",
            DietType::Jain => "Jain",
            DietType::Eggetarian => "Eggetarian",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServingUnit {
    #[serde(rename = "g")]
    Grams,
    #[serde(rename = "ml")]
    Millilitres,
}

impl ServingUnit {
    pub fn suffix(&self) -> &'static str {
        match self {
            ServingUnit::Grams => "g",
            ServingUnit::Millilitres => "ml",
        }
    }
}

// ==============================================================================
// FOOD KNOWLEDGE BASE RECORDS
// ==============================================================================

/// One catalog record. Nutrients are per `serving_size` of `unit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,
    pub category: FoodCategory,
    pub serving_size: f64,
    pub unit: ServingUnit,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub rasa: Vec<Rasa>,
    #[serde(default)]
    pub guna: Vec<String>,
    pub virya: Virya,
    pub vipaka: Vipaka,
    pub dosha_effect: DoshaEffects,
    #[serde(default)]
    pub allergens: Vec<String>,
    pub diet_types: Vec<DietType>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl FoodItem {
    pub fn primary_rasa(&self) -> Option<Rasa> {
        self.rasa.first().copied()
    }

    pub fn shares_rasa_with(&self, other: &FoodItem) -> bool {
        self.rasa.iter().any(|r| other.rasa.contains(r))
    }

    pub fn allows_diet(&self, diet: DietType) -> bool {
        self.diet_types.contains(&diet)
    }

    pub fn macro_energy(&self) -> MacroEnergy {
        MacroEnergy::from_grams(self.protein, self.carbs, self.fat)
    }
}

/// Energy contributed by each macronutrient, in kcal.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MacroEnergy {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

pub const KCAL_PER_GRAM_PROTEIN: f64 = 4.0;
pub const KCAL_PER_GRAM_CARBS: f64 = 4.0;
pub const KCAL_PER_GRAM_FAT: f64 = 9.0;

impl MacroEnergy {
    pub fn from_grams(protein: f64, carbs: f64, fat: f64) -> Self {
        Self {
            protein: protein * KCAL_PER_GRAM_PROTEIN,
            carbs: carbs * KCAL_PER_GRAM_CARBS,
            fat: fat * KCAL_PER_GRAM_FAT,
        }
    }

    pub fn total(&self) -> f64 {
        self.protein + self.carbs + self.fat
    }

    pub fn scaled(&self, factor: f64) -> MacroEnergy {
        MacroEnergy {
            protein: self.protein * factor,
            carbs: self.carbs * factor,
            fat: self.fat * factor,
        }
    }

    pub fn add(&self, other: &MacroEnergy) -> MacroEnergy {
        MacroEnergy {
            protein: self.protein + other.protein,
            carbs: self.carbs + other.carbs,
            fat: self.fat + other.fat,
        }
    }
}

/// Query-string filter for knowledge base searches. `dosha` without `effect`
/// means foods that pacify (decrease) that dosha.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoodFilter {
    pub category: Option<FoodCategory>,
    pub rasa: Option<Rasa>,
    pub dosha: Option<Dosha>,
    pub effect: Option<DoshaEffect>,
}

impl FoodFilter {
    pub fn dosha_effect(&self) -> Option<(Dosha, DoshaEffect)> {
        self.dosha
            .map(|dosha| (dosha, self.effect.unwrap_or(DoshaEffect::Decrease)))
    }

    pub fn matches(&self, food: &FoodItem) -> bool {
        if let Some(category) = self.category {
            if food.category != category {
                return false;
            }
        }
        if let Some(rasa) = self.rasa {
            if !food.rasa.contains(&rasa) {
                return false;
            }
        }
        if let Some((dosha, effect)) = self.dosha_effect() {
            if food.dosha_effect.get(dosha) != effect {
                return false;
            }
        }
        true
    }
}

// ==============================================================================
// PATIENT INPUT
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(alias = "male", alias = "M")]
    Male,
    #[serde(alias = "female", alias = "F")]
    Female,
    #[serde(alias = "other")]
    Other,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityLevel {
    #[serde(alias = "low", alias = "sedentary")]
    Low,
    #[serde(alias = "moderate")]
    Moderate,
    #[serde(alias = "high", alias = "active")]
    High,
}

impl Default for ActivityLevel {
    fn default() -> Self {
        ActivityLevel::Moderate
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActivityLevel::Low => "Low",
            ActivityLevel::Moderate => "Moderate",
            ActivityLevel::High => "High",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgeBracket {
    Child,
    Teen,
    Adult,
    Mature,
    Senior,
}

impl AgeBracket {
    pub fn from_age(age: u32) -> Self {
        match age {
            0..=12 => AgeBracket::Child,
            13..=17 => AgeBracket::Teen,
            18..=50 => AgeBracket::Adult,
            51..=65 => AgeBracket::Mature,
            _ => AgeBracket::Senior,
        }
    }
}

/// Prakriti: one, two or all three doshas. Serialized as `"Pitta"`,
/// `"Vata-Pitta"` or `"Tridoshic"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Constitution {
    doshas: Vec<Dosha>,
}

impl Constitution {
    pub fn new(doshas: Vec<Dosha>) -> Result<Self, String> {
        if doshas.is_empty() {
            return Err("constitution needs at least one dosha".to_string());
        }
        let mut seen = Vec::with_capacity(doshas.len());
        for dosha in doshas {
            if seen.contains(&dosha) {
                return Err(format!("constitution repeats {}", dosha));
            }
            seen.push(dosha);
        }
        Ok(Self { doshas: seen })
    }

    pub fn doshas(&self) -> &[Dosha] {
        &self.doshas
    }

    pub fn primary(&self) -> Dosha {
        self.doshas.first().copied().unwrap_or(Dosha::Vata)
    }

    pub fn is_tridoshic(&self) -> bool {
        self.doshas.len() == Dosha::ALL.len()
    }

    pub fn contains(&self, dosha: Dosha) -> bool {
        self.doshas.contains(&dosha)
    }

    pub fn label(&self) -> String {
        if self.is_tridoshic() {
            return "Tridoshic".to_string();
        }
        self.doshas
            .iter()
            .map(Dosha::as_str)
            .collect::<Vec<_>>()
            .join("-")
    }
}

impl FromStr for Constitution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("tridoshic") || trimmed.eq_ignore_ascii_case("tridosha") {
            return Ok(Self { doshas: Dosha::ALL.to_vec() });
        }

        let doshas = trimmed
            .split(['-', '/'])
            .map(|part| part.parse::<Dosha>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| {
                format!(
                    "invalid constitution '{}'; expected a dosha (Vata, Pitta, Kapha), a hyphenated pair such as Vata-Pitta, or Tridoshic",
                    s
                )
            })?;
        Constitution::new(doshas)
    }
}

impl TryFrom<String> for Constitution {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Constitution> for String {
    fn from(value: Constitution) -> Self {
        value.label()
    }
}

impl fmt::Display for Constitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub patient_id: String,
    #[serde(default)]
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    #[serde(default)]
    pub city: String,
    pub constitution: Constitution,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub activity_level: ActivityLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DietPreferences {
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub dislikes: Vec<String>,
    #[serde(default)]
    pub calorie_target: Option<u32>,
    #[serde(default)]
    pub custom_preferences: Option<String>,
    #[serde(default)]
    pub diet_type: DietType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeInput {
    pub recipe_text: Option<String>,
    pub recipe_image_base64: Option<String>,
}

impl RecipeInput {
    pub fn text(&self) -> Option<&str> {
        self.recipe_text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    pub fn has_image(&self) -> bool {
        self.recipe_image_base64
            .as_deref()
            .is_some_and(|img| !img.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MealRecipes {
    pub breakfast: Option<RecipeInput>,
    pub lunch: Option<RecipeInput>,
    pub snack: Option<RecipeInput>,
    pub dinner: Option<RecipeInput>,
}

impl MealRecipes {
    pub fn get(&self, meal_type: MealType) -> Option<&RecipeInput> {
        match meal_type {
            MealType::Breakfast => self.breakfast.as_ref(),
            MealType::Lunch => self.lunch.as_ref(),
            MealType::Snack => self.snack.as_ref(),
            MealType::Dinner => self.dinner.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DietChartRequest {
    pub patient_profile: Option<PatientProfile>,
    #[serde(default)]
    pub diet_preferences: DietPreferences,
    pub city_name: Option<String>,
    #[serde(default)]
    pub meal_recipes: Option<MealRecipes>,
    /// Caller-supplied weather snapshot; skips the weather lookup when present.
    #[serde(default)]
    pub climate: Option<ClimateContext>,
}

impl DietChartRequest {
    /// Checks the fields every chart needs and returns the profile and city.
    pub fn validate(&self) -> Result<(&PatientProfile, &str), DietChartError> {
        let profile = self
            .patient_profile
            .as_ref()
            .ok_or_else(|| DietChartError::Validation("patient_profile is required".to_string()))?;

        let city = self
            .city_name
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| DietChartError::Validation("city_name is required".to_string()))?;

        if profile.patient_id.trim().is_empty() {
            return Err(DietChartError::Validation(
                "patient_profile.patient_id cannot be empty".to_string(),
            ));
        }

        if profile.age == 0 {
            return Err(DietChartError::Validation(
                "patient_profile.age must be greater than 0".to_string(),
            ));
        }

        if let Some(climate) = &self.climate {
            if !(0.0..=100.0).contains(&climate.humidity) || !climate.temperature.is_finite() {
                return Err(DietChartError::Validation(
                    "climate.humidity must be within 0-100 and temperature must be a number"
                        .to_string(),
                ));
            }
        }

        Ok((profile, city))
    }
}

// ==============================================================================
// CLIMATE
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    #[serde(alias = "summer", alias = "Grishma")]
    Summer,
    #[serde(alias = "monsoon", alias = "Varsha", alias = "Autumn", alias = "autumn")]
    Monsoon,
    #[serde(alias = "winter", alias = "Hemanta", alias = "Shishira")]
    Winter,
    #[serde(alias = "spring", alias = "Vasanta")]
    Spring,
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Season::Summer => "Summer",
            Season::Monsoon => "Monsoon",
            Season::Winter => "Winter",
            Season::Spring => "Spring",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateContext {
    pub temperature: f64,
    pub humidity: f64,
    pub season: Season,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub description: String,
}

/// Per-dosha climate pressure in [-1, 1]. Positive values mean foods that
/// increase that dosha should be suppressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DoshaWeights {
    #[serde(rename = "Vata")]
    pub vata: f64,
    #[serde(rename = "Pitta")]
    pub pitta: f64,
    #[serde(rename = "Kapha")]
    pub kapha: f64,
}

impl DoshaWeights {
    pub fn get(&self, dosha: Dosha) -> f64 {
        match dosha {
            Dosha::Vata => self.vata,
            Dosha::Pitta => self.pitta,
            Dosha::Kapha => self.kapha,
        }
    }

    pub fn add(&mut self, dosha: Dosha, delta: f64) {
        match dosha {
            Dosha::Vata => self.vata += delta,
            Dosha::Pitta => self.pitta += delta,
            Dosha::Kapha => self.kapha += delta,
        }
    }
}

// ==============================================================================
// RECIPE COLLABORATOR OUTPUT
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MealType {
    #[serde(alias = "breakfast")]
    Breakfast,
    #[serde(alias = "lunch")]
    Lunch,
    #[serde(alias = "snack")]
    Snack,
    #[serde(alias = "dinner")]
    Dinner,
}

impl MealType {
    pub const ALL: [MealType; 4] = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Snack,
        MealType::Dinner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "Breakfast",
            MealType::Lunch => "Lunch",
            MealType::Snack => "Snack",
            MealType::Dinner => "Dinner",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedIngredient {
    pub name: String,
    #[serde(default)]
    pub category: Option<FoodCategory>,
}

impl ParsedIngredient {
    pub fn new(name: impl Into<String>, category: Option<FoodCategory>) -> Self {
        Self {
            name: name.into(),
            category,
        }
    }
}

/// Ingredients already extracted from recipes, keyed by meal slot, plus any
/// notes the parsing stage wants surfaced to the practitioner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedRecipes {
    pub meals: BTreeMap<MealType, Vec<ParsedIngredient>>,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl ParsedRecipes {
    pub fn with_meal(mut self, meal_type: MealType, ingredients: Vec<ParsedIngredient>) -> Self {
        self.meals.insert(meal_type, ingredients);
        self
    }

    pub fn ingredients(&self, meal_type: MealType) -> Option<&[ParsedIngredient]> {
        self.meals
            .get(&meal_type)
            .map(Vec::as_slice)
            .filter(|list| !list.is_empty())
    }
}

// ==============================================================================
// DIET CHART OUTPUT
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortionInfo {
    pub age_adjusted: bool,
    pub activity_level: ActivityLevel,
    pub multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodServing {
    pub name: String,
    pub category: FoodCategory,
    pub quantity: String,
    pub calories: u32,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub rasa: Vec<Rasa>,
    pub guna: Vec<String>,
    pub virya: Option<Virya>,
    pub vipaka: Option<Vipaka>,
    pub dosha_effect: DoshaEffects,
    pub allergens: Vec<String>,
    pub smart_swaps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substituted_for: Option<String>,
    #[serde(default)]
    pub estimated: bool,
    pub portion_info: PortionInfo,
}

/// Percent of a meal's macro energy from protein, carbs and fat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutrientBars {
    pub protein: u32,
    pub carbs: u32,
    pub fat: u32,
}

impl NutrientBars {
    pub fn total(&self) -> u32 {
        self.protein + self.carbs + self.fat
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealSource {
    Recipe,
    KnowledgeBase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AyurvedicProfile {
    pub rasa: Vec<Rasa>,
    pub virya: Option<Virya>,
    pub dosha_effect: DoshaEffects,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlanEntry {
    pub meal_type: MealType,
    pub foods: Vec<FoodServing>,
    pub total_calories: u32,
    pub nutrient_bars: NutrientBars,
    pub ayurvedic_rationale: String,
    pub source: MealSource,
    pub ayurvedic_profile: AyurvedicProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalorieSource {
    Estimated,
    Practitioner,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalorieEstimate {
    pub source: CalorieSource,
    pub bmr: Option<u32>,
    pub activity_multiplier: Option<f64>,
    pub unclamped: u32,
    pub target: u32,
    pub clamped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DietChart {
    pub chart_id: Uuid,
    pub patient_id: String,
    pub total_daily_calories: u32,
    pub meals: Vec<MealPlanEntry>,
    pub weather_context: ClimateContext,
    pub dosha_weights: DoshaWeights,
    pub calorie_estimate: CalorieEstimate,
    pub ayurvedic_analysis: String,
    pub recommendations: Vec<String>,
    pub smart_swaps_applied: Vec<String>,
    pub portion_adjustments: BTreeMap<String, String>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum KnowledgeBaseError {
    #[error("failed to read food catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("food catalog is not a JSON array of entries: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid food catalog entry #{index} ({name}): {reason}")]
    InvalidEntry {
        index: usize,
        name: String,
        reason: String,
    },
    #[error("food catalog contains no entries")]
    Empty,
}

#[derive(Debug, Error)]
pub enum DietChartError {
    #[error("{0}")]
    Validation(String),
    #[error("food '{0}' not found in the knowledge base")]
    FoodNotFound(String),
    #[error("weather lookup failed: {0}")]
    Weather(String),
    #[error("recipe parser setup failed: {0}")]
    RecipeParser(#[from] regex::Error),
    #[error(transparent)]
    KnowledgeBase(#[from] KnowledgeBaseError),
}

impl From<DietChartError> for AppError {
    fn from(err: DietChartError) -> Self {
        match err {
            DietChartError::Validation(msg) => AppError::ValidationError(msg),
            DietChartError::FoodNotFound(_) => AppError::NotFound(err.to_string()),
            DietChartError::Weather(msg) => AppError::ExternalService(msg),
            DietChartError::RecipeParser(_) | DietChartError::KnowledgeBase(_) => {
                AppError::Internal(err.to_string())
            }
        }
    }
}
