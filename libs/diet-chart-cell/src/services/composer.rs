// libs/diet-chart-cell/src/services/composer.rs
use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use shared_config::{DietEngineConfig, MealSplit};

use crate::models::{
    ActivityLevel, AgeBracket, AyurvedicProfile, CalorieEstimate, CalorieSource, Constitution,
    DietPreferences, Dosha, DoshaEffect, DoshaEffects, DoshaWeights, FoodCategory, FoodItem,
    FoodServing, Gender, MacroEnergy, MealSource, MealType, NutrientBars, ParsedIngredient,
    ParsedRecipes, PatientProfile, Rasa, Virya,
};
use crate::services::constraints::{ConflictReason, ConstraintResolver, Resolution};
use crate::services::knowledge_base::FoodKnowledgeBase;
use crate::services::portion::PortionScale;

/// Target share of meal energy from protein, carbs and fat.
pub const TARGET_MACRO_SPLIT: [f64; 3] = [0.20, 0.55, 0.25];

/// A slot adds filler roles until its foods can reach the allocation at this
/// many standard servings.
pub const MAX_SERVING_SCALE: f64 = 2.5;

/// Share of its allocation a capped recipe slot may fall short by before
/// foods are added to it.
const RECIPE_SHORTFALL_TOLERANCE: f64 = 0.04;

const REPEAT_PENALTY: f64 = 0.3;
const DISLIKED_TASTE_PENALTY: f64 = 0.3;
const CONSTITUTION_WEIGHT: f64 = 0.4;
const VIRYA_WEIGHT: f64 = 0.2;
const MAX_LISTED_ALTERNATIVES: usize = 3;

struct SlotTemplate {
    primary: &'static [FoodCategory],
    fillers: &'static [FoodCategory],
}

fn slot_template(meal_type: MealType) -> SlotTemplate {
    use FoodCategory::*;
    match meal_type {
        MealType::Breakfast => SlotTemplate {
            primary: &[Grain, Dairy, Fruit],
            fillers: &[Protein, Grain],
        },
        MealType::Lunch => SlotTemplate {
            primary: &[Grain, Protein, Vegetable, Vegetable, Spice],
            fillers: &[Dairy, Grain, Protein],
        },
        MealType::Snack => SlotTemplate {
            primary: &[Fruit, Beverage],
            fillers: &[Protein, Dairy],
        },
        MealType::Dinner => SlotTemplate {
            primary: &[Grain, Protein, Vegetable, Spice],
            fillers: &[Vegetable, Grain, Protein],
        },
    }
}

pub fn slot_share(split: &MealSplit, meal_type: MealType) -> u8 {
    match meal_type {
        MealType::Breakfast => split.breakfast,
        MealType::Lunch => split.lunch,
        MealType::Snack => split.snack,
        MealType::Dinner => split.dinner,
    }
}

// ==============================================================================
// DRAFT PLAN
// ==============================================================================

#[derive(Debug, Clone)]
pub enum ServingKind<'a> {
    Known(&'a FoodItem),
    /// Recipe ingredient with no catalog record.
    Placeholder { name: String, category: FoodCategory },
}

/// A serving before portion scaling. `scale` counts standard catalog servings.
#[derive(Debug, Clone)]
pub struct DraftServing<'a> {
    pub kind: ServingKind<'a>,
    pub scale: f64,
    pub substituted_for: Option<String>,
    pub smart_swaps: Vec<String>,
}

impl<'a> DraftServing<'a> {
    pub fn known(item: &'a FoodItem) -> Self {
        Self {
            kind: ServingKind::Known(item),
            scale: 1.0,
            substituted_for: None,
            smart_swaps: Vec::new(),
        }
    }

    pub fn substitute(replacement: &'a FoodItem, original: &FoodItem, alternatives: &[&'a FoodItem]) -> Self {
        Self {
            substituted_for: Some(original.name.clone()),
            smart_swaps: alternatives
                .iter()
                .take(MAX_LISTED_ALTERNATIVES)
                .map(|alt| alt.name.clone())
                .collect(),
            ..Self::known(replacement)
        }
    }

    pub fn placeholder(name: &str, category: Option<FoodCategory>) -> Self {
        Self {
            kind: ServingKind::Placeholder {
                name: format!("{} (estimated)", name.trim()),
                category: category.unwrap_or(FoodCategory::Vegetable),
            },
            scale: 1.0,
            substituted_for: None,
            smart_swaps: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        match &self.kind {
            ServingKind::Known(item) => &item.name,
            ServingKind::Placeholder { name, .. } => name,
        }
    }

    pub fn item(&self) -> Option<&'a FoodItem> {
        match self.kind {
            ServingKind::Known(item) => Some(item),
            ServingKind::Placeholder { .. } => None,
        }
    }

    /// Calories of one standard serving; placeholders carry none.
    fn base_calories(&self) -> f64 {
        self.item().map_or(0.0, |item| item.calories)
    }

    fn base_energy(&self) -> MacroEnergy {
        self.item().map_or_else(MacroEnergy::default, FoodItem::macro_energy)
    }

    /// Final serving after the portion multiplier is applied.
    pub fn into_serving(self, portion: &PortionScale) -> FoodServing {
        let portion_info = portion.portion_info();
        match self.kind {
            ServingKind::Known(item) => {
                let factor = self.scale * portion.multiplier;
                FoodServing {
                    name: item.name.clone(),
                    category: item.category,
                    quantity: format_quantity(item.serving_size * factor, item.unit.suffix()),
                    calories: (item.calories * factor).round() as u32,
                    protein: round1(item.protein * factor),
                    carbs: round1(item.carbs * factor),
                    fat: round1(item.fat * factor),
                    fiber: round1(item.fiber * factor),
                    rasa: item.rasa.clone(),
                    guna: item.guna.clone(),
                    virya: Some(item.virya),
                    vipaka: Some(item.vipaka),
                    dosha_effect: item.dosha_effect,
                    allergens: item.allergens.clone(),
                    smart_swaps: self.smart_swaps,
                    substituted_for: self.substituted_for,
                    estimated: false,
                    portion_info,
                }
            }
            ServingKind::Placeholder { name, category } => FoodServing {
                name,
                category,
                quantity: "as per recipe".to_string(),
                calories: 0,
                protein: 0.0,
                carbs: 0.0,
                fat: 0.0,
                fiber: 0.0,
                rasa: Vec::new(),
                guna: Vec::new(),
                virya: None,
                vipaka: None,
                dosha_effect: DoshaEffects::neutral(),
                allergens: Vec::new(),
                smart_swaps: Vec::new(),
                substituted_for: None,
                estimated: true,
                portion_info,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComposedMeal<'a> {
    pub meal_type: MealType,
    pub source: MealSource,
    pub servings: Vec<DraftServing<'a>>,
    /// Calories assigned to this slot from the daily target.
    pub allocation: f64,
    pub recipe_ingredient_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwapRecord {
    pub meal_type: MealType,
    pub original: String,
    pub replacement: String,
    pub reason: ConflictReason,
}

impl SwapRecord {
    pub fn label(&self) -> String {
        format!("{} → {}", self.original, self.replacement)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DayPlan<'a> {
    pub meals: Vec<ComposedMeal<'a>>,
    pub swaps: Vec<SwapRecord>,
    pub warnings: Vec<String>,
    pub unknown_ingredients: Vec<String>,
    /// Foods added to recipe slots whose ingredients hit their serving caps.
    pub top_ups: Vec<String>,
}

// ==============================================================================
// COMPOSER
// ==============================================================================

pub struct MealComposer<'a> {
    kb: &'a FoodKnowledgeBase,
    resolver: ConstraintResolver<'a>,
    weights: DoshaWeights,
    constitution: &'a Constitution,
    split: MealSplit,
}

impl<'a> MealComposer<'a> {
    pub fn new(
        kb: &'a FoodKnowledgeBase,
        resolver: ConstraintResolver<'a>,
        weights: DoshaWeights,
        constitution: &'a Constitution,
        split: MealSplit,
    ) -> Self {
        Self {
            kb,
            resolver,
            weights,
            constitution,
            split,
        }
    }

    /// Builds all four slots in order. Allocations are divided by
    /// `portion_multiplier` before composition, so the multiplier sets how far
    /// a single food may grow: every serving cap is a count of standard
    /// servings times the multiplier, and a smaller multiplier spreads the
    /// same calories across more foods.
    pub fn compose_day(
        &self,
        recipes: &ParsedRecipes,
        daily_target: u32,
        portion_multiplier: f64,
    ) -> DayPlan<'a> {
        let mut plan = DayPlan::default();
        let mut served_today = BTreeSet::new();

        for meal_type in MealType::ALL {
            let allocation = f64::from(daily_target) * f64::from(slot_share(&self.split, meal_type)) / 100.0;
            let base_target = allocation / portion_multiplier;

            let recipe_meal = recipes.ingredients(meal_type).and_then(|ingredients| {
                let meal = self.compose_from_recipe(meal_type, ingredients, base_target, &served_today, &mut plan);
                if meal.is_none() {
                    plan.warnings.push(format!(
                        "None of the {} recipe ingredients carry known calories, so {} was composed from the food database",
                        meal_type.as_str().to_lowercase(),
                        meal_type
                    ));
                }
                meal
            });

            let mut meal = match recipe_meal {
                Some(meal) => meal,
                None => self.compose_by_selection(meal_type, base_target, &served_today, &mut plan),
            };
            meal.allocation = allocation;

            debug!(
                "Composed {} from {:?}: {} servings for {:.0} kcal",
                meal_type,
                meal.source,
                meal.servings.len(),
                allocation
            );

            served_today.extend(meal.servings.iter().map(|s| s.name().to_string()));
            plan.meals.push(meal);
        }

        plan
    }

    fn compose_from_recipe(
        &self,
        meal_type: MealType,
        ingredients: &[ParsedIngredient],
        base_target: f64,
        served_today: &BTreeSet<String>,
        plan: &mut DayPlan<'a>,
    ) -> Option<ComposedMeal<'a>> {
        let mut servings: Vec<DraftServing<'a>> = Vec::new();
        let mut swaps = Vec::new();

        for ingredient in ingredients {
            let Some(found) = self.kb.lookup_with_hint(&ingredient.name, ingredient.category) else {
                if let Some(reason) = self.resolver.constraints().conflict_for_name(&ingredient.name) {
                    plan.warnings.push(format!(
                        "Left {} out of {} because of {}; it is not in the food database, so no substitute was found",
                        ingredient.name, meal_type, reason
                    ));
                    continue;
                }
                plan.unknown_ingredients.push(format!("{} ({})", ingredient.name.trim(), meal_type));
                push_unique(&mut servings, DraftServing::placeholder(&ingredient.name, ingredient.category));
                continue;
            };

            match self.resolver.resolve(found.item) {
                Resolution::Resolved(item) => {
                    push_unique(&mut servings, DraftServing::known(item));
                }
                Resolution::Substituted {
                    original,
                    replacement,
                    alternatives,
                    reason,
                } => {
                    if push_unique(&mut servings, DraftServing::substitute(replacement, original, &alternatives)) {
                        swaps.push(SwapRecord {
                            meal_type,
                            original: original.name.clone(),
                            replacement: replacement.name.clone(),
                            reason,
                        });
                    }
                }
                Resolution::Unresolved { original, reason } => {
                    plan.warnings.push(omitted_warning(meal_type, original, &reason));
                }
            }
        }

        let base_kcal: f64 = servings.iter().map(DraftServing::base_calories).sum();
        if base_kcal <= 0.0 {
            return None;
        }
        plan.swaps.extend(swaps);

        let recipe_servings = servings.len();
        let shortfall = fit_recipe_servings(&mut servings, base_target);
        if shortfall > base_target * RECIPE_SHORTFALL_TOLERANCE {
            self.fill_roles(meal_type, &mut servings, shortfall, false, served_today, plan);
            let added: Vec<&str> = servings[recipe_servings..].iter().map(DraftServing::name).collect();
            if !added.is_empty() {
                plan.top_ups.push(format!(
                    "The {} recipe was rounded out with {} to reach its calorie share at sensible portions.",
                    meal_type.as_str().to_lowercase(),
                    added.join(", ")
                ));
            }
        }

        Some(ComposedMeal {
            meal_type,
            source: MealSource::Recipe,
            servings,
            allocation: 0.0,
            recipe_ingredient_count: ingredients.len(),
        })
    }

    fn compose_by_selection(
        &self,
        meal_type: MealType,
        base_target: f64,
        served_today: &BTreeSet<String>,
        plan: &mut DayPlan<'a>,
    ) -> ComposedMeal<'a> {
        let mut servings: Vec<DraftServing<'a>> = Vec::new();
        if !self.fill_roles(meal_type, &mut servings, base_target, true, served_today, plan) {
            plan.warnings.push(format!(
                "{} could not be composed within the patient's restrictions",
                meal_type
            ));
        }

        ComposedMeal {
            meal_type,
            source: MealSource::KnowledgeBase,
            servings,
            allocation: 0.0,
            recipe_ingredient_count: 0,
        }
    }

    /// Appends the slot template's roles to `servings` and scales only the
    /// appended foods onto `target`. Optional roles stop once the appended
    /// foods can reach `target` within `MAX_SERVING_SCALE`; with
    /// `primary_required` the template's primary roles are always filled.
    /// Returns false when nothing could be appended.
    fn fill_roles(
        &self,
        meal_type: MealType,
        servings: &mut Vec<DraftServing<'a>>,
        target: f64,
        primary_required: bool,
        served_today: &BTreeSet<String>,
        plan: &mut DayPlan<'a>,
    ) -> bool {
        let template = slot_template(meal_type);
        let roles = template
            .primary
            .iter()
            .map(|c| (*c, !primary_required))
            .chain(template.fillers.iter().map(|c| (*c, true)));

        let first_added = servings.len();
        let mut running = servings.iter().fold(MacroEnergy::default(), |energy, s| {
            energy.add(&s.base_energy().scaled(s.scale))
        });
        let mut added_kcal = 0.0;

        for (category, optional) in roles {
            if optional && added_kcal * MAX_SERVING_SCALE >= target {
                break;
            }
            match self.fill_role(meal_type, category, servings, running, served_today, plan) {
                Some(serving) => {
                    running = running.add(&serving.base_energy());
                    added_kcal += serving.base_calories();
                    servings.push(serving);
                }
                None if !optional => plan.warnings.push(format!(
                    "No {} option for {} fits the patient's restrictions, so the meal is served without one",
                    category, meal_type
                )),
                None => {}
            }
        }

        if added_kcal <= 0.0 {
            return false;
        }
        let factor = target / added_kcal;
        for serving in &mut servings[first_added..] {
            serving.scale = factor;
        }
        true
    }

    /// Best-scoring safe food for one category role.
    fn fill_role(
        &self,
        meal_type: MealType,
        category: FoodCategory,
        current: &[DraftServing<'a>],
        running: MacroEnergy,
        served_today: &BTreeSet<String>,
        plan: &mut DayPlan<'a>,
    ) -> Option<DraftServing<'a>> {
        let in_meal = |name: &str| current.iter().any(|s| s.name() == name);

        let mut ranked: Vec<(f64, &'a FoodItem)> = self
            .kb
            .in_category(category)
            .filter(|food| !in_meal(&food.name))
            .map(|food| (self.score(food, running, served_today), food))
            .collect();
        ranked.sort_by(|(sa, a), (sb, b)| sb.total_cmp(sa).then_with(|| a.name.cmp(&b.name)));

        for (_, candidate) in ranked {
            match self.resolver.resolve(candidate) {
                Resolution::Resolved(item) => return Some(DraftServing::known(item)),
                Resolution::Substituted {
                    original,
                    replacement,
                    alternatives,
                    reason,
                } => {
                    if in_meal(&replacement.name) {
                        continue;
                    }
                    plan.swaps.push(SwapRecord {
                        meal_type,
                        original: original.name.clone(),
                        replacement: replacement.name.clone(),
                        reason,
                    });
                    return Some(DraftServing::substitute(replacement, original, &alternatives));
                }
                Resolution::Unresolved { .. } => continue,
            }
        }
        None
    }

    /// `nutritional fit - climate penalty + constitution bonus - repeat penalty - taste penalty`
    pub fn score(&self, food: &FoodItem, running: MacroEnergy, served_today: &BTreeSet<String>) -> f64 {
        let fit = nutritional_fit(&running.add(&food.macro_energy()));
        let repeat = if served_today.contains(&food.name) {
            REPEAT_PENALTY
        } else {
            0.0
        };
        let disliked = self.resolver.constraints().disliked_tastes();
        let taste = DISLIKED_TASTE_PENALTY * food.rasa.iter().filter(|r| disliked.contains(r)).count() as f64;

        fit - self.climate_penalty(food) + self.constitution_bonus(food) - repeat - taste
    }

    fn climate_penalty(&self, food: &FoodItem) -> f64 {
        Dosha::ALL
            .into_iter()
            .map(|dosha| {
                let weight = self.weights.get(dosha);
                if weight <= 0.0 {
                    return 0.0;
                }
                let effect = match food.dosha_effect.get(dosha) {
                    DoshaEffect::Increase => weight,
                    DoshaEffect::Decrease => -0.5 * weight,
                    DoshaEffect::Neutral => 0.0,
                };
                let potency = match (dosha, food.virya) {
                    (Dosha::Pitta, Virya::Heating)
                    | (Dosha::Vata, Virya::Cooling)
                    | (Dosha::Kapha, Virya::Cooling) => VIRYA_WEIGHT * weight,
                    _ => 0.0,
                };
                effect + potency
            })
            .sum()
    }

    fn constitution_bonus(&self, food: &FoodItem) -> f64 {
        let doshas = self.constitution.doshas();
        let share = CONSTITUTION_WEIGHT / doshas.len().max(1) as f64;
        doshas
            .iter()
            .map(|dosha| match food.dosha_effect.get(*dosha) {
                DoshaEffect::Decrease => share,
                DoshaEffect::Increase => -share,
                DoshaEffect::Neutral => 0.0,
            })
            .sum()
    }
}

/// Standard servings of one recipe food a slot may use before the rest of
/// the allocation is topped up from the food database.
pub fn recipe_serving_cap(category: FoodCategory) -> f64 {
    match category {
        FoodCategory::Grain | FoodCategory::Protein | FoodCategory::Vegetable => 3.0,
        FoodCategory::Dairy | FoodCategory::Fruit => MAX_SERVING_SCALE,
        FoodCategory::Spice | FoodCategory::Beverage => 1.5,
    }
}

/// Scales recipe foods together toward `target`, holding any food that would
/// pass its cap at the cap and sharing what is left among the others.
/// Returns the calories that could not be placed.
fn fit_recipe_servings(servings: &mut [DraftServing<'_>], target: f64) -> f64 {
    let cap = |serving: &DraftServing<'_>| {
        serving
            .item()
            .map_or(MAX_SERVING_SCALE, |item| recipe_serving_cap(item.category))
    };

    let mut remaining = target;
    let mut open: Vec<usize> = (0..servings.len())
        .filter(|&i| servings[i].base_calories() > 0.0)
        .collect();

    while !open.is_empty() {
        let open_kcal: f64 = open.iter().map(|&i| servings[i].base_calories()).sum();
        let factor = remaining / open_kcal;
        let (capped, free): (Vec<usize>, Vec<usize>) =
            open.into_iter().partition(|&i| factor > cap(&servings[i]));

        if capped.is_empty() {
            for i in free {
                servings[i].scale = factor;
            }
            return 0.0;
        }
        for i in capped {
            let limit = cap(&servings[i]);
            servings[i].scale = limit;
            remaining -= servings[i].base_calories() * limit;
        }
        open = free;
    }

    remaining.max(0.0)
}

fn push_unique<'a>(servings: &mut Vec<DraftServing<'a>>, serving: DraftServing<'a>) -> bool {
    if servings.iter().any(|s| s.name() == serving.name()) {
        return false;
    }
    servings.push(serving);
    true
}

fn omitted_warning(meal_type: MealType, original: &FoodItem, reason: &ConflictReason) -> String {
    format!(
        "Left {} out of {} because of {}; no {} with a shared taste is safe to use instead",
        original.name, meal_type, reason, original.category
    )
}

/// 1.0 when the energy split matches the target exactly, 0.0 at the far extreme.
pub fn nutritional_fit(energy: &MacroEnergy) -> f64 {
    let total = energy.total();
    if total <= 0.0 {
        return 0.0;
    }
    let shares = [energy.protein / total, energy.carbs / total, energy.fat / total];
    let distance: f64 = shares
        .iter()
        .zip(TARGET_MACRO_SPLIT)
        .map(|(share, target)| (share - target).abs())
        .sum();
    1.0 - distance / 2.0
}

// ==============================================================================
// MEAL SUMMARIES
// ==============================================================================

/// Integer percentages of macro energy. The rounding residual goes to the
/// largest bucket so non-empty meals always total 100.
pub fn nutrient_bars(protein_g: f64, carbs_g: f64, fat_g: f64) -> NutrientBars {
    let energy = MacroEnergy::from_grams(protein_g, carbs_g, fat_g);
    let total = energy.total();
    if total <= 0.0 {
        return NutrientBars::default();
    }

    let raw = [energy.protein, energy.carbs, energy.fat].map(|kcal| kcal / total * 100.0);
    let mut bars = raw.map(|pct| pct.round() as i64);
    let residual = 100 - bars.iter().sum::<i64>();

    let largest = raw
        .iter()
        .enumerate()
        .fold(0, |best, (i, pct)| if *pct > raw[best] { i } else { best });
    bars[largest] += residual;

    let [protein, carbs, fat] = bars.map(|b| b.max(0) as u32);
    NutrientBars { protein, carbs, fat }
}

/// Tastes by frequency, calorie-weighted potency and net dosha effect.
pub fn ayurvedic_profile(foods: &[FoodServing]) -> AyurvedicProfile {
    let mut taste_counts: BTreeMap<Rasa, usize> = BTreeMap::new();
    for rasa in foods.iter().flat_map(|f| f.rasa.iter()) {
        *taste_counts.entry(*rasa).or_default() += 1;
    }
    let mut rasa: Vec<(Rasa, usize)> = taste_counts.into_iter().collect();
    rasa.sort_by(|(ra, ca), (rb, cb)| cb.cmp(ca).then_with(|| ra.cmp(rb)));

    let mut heating = 0.0;
    let mut cooling = 0.0;
    for food in foods {
        match food.virya {
            Some(Virya::Heating) => heating += f64::from(food.calories),
            Some(Virya::Cooling) => cooling += f64::from(food.calories),
            None => {}
        }
    }
    let virya = if heating + cooling <= 0.0 {
        None
    } else if heating > cooling {
        Some(Virya::Heating)
    } else {
        Some(Virya::Cooling)
    };

    let total: f64 = foods.iter().map(|f| f64::from(f.calories)).sum();
    let mut dosha_effect = DoshaEffects::neutral();
    if total > 0.0 {
        for dosha in Dosha::ALL {
            let net: f64 = foods
                .iter()
                .map(|f| match f.dosha_effect.get(dosha) {
                    DoshaEffect::Increase => f64::from(f.calories),
                    DoshaEffect::Decrease => -f64::from(f.calories),
                    DoshaEffect::Neutral => 0.0,
                })
                .sum();
            let effect = if net > 0.1 * total {
                DoshaEffect::Increase
            } else if net < -0.1 * total {
                DoshaEffect::Decrease
            } else {
                DoshaEffect::Neutral
            };
            dosha_effect.set(dosha, effect);
        }
    }

    AyurvedicProfile {
        rasa: rasa.into_iter().map(|(r, _)| r).collect(),
        virya,
        dosha_effect,
    }
}

// ==============================================================================
// CALORIE TARGET
// ==============================================================================

pub fn activity_factor(activity: ActivityLevel) -> f64 {
    match activity {
        ActivityLevel::Low => 1.2,
        ActivityLevel::Moderate => 1.55,
        ActivityLevel::High => 1.9,
    }
}

/// Reference weight (kg) and height (cm) for an age bracket.
fn reference_body(age: u32, gender: Gender) -> (f64, f64) {
    match (AgeBracket::from_age(age), gender) {
        (AgeBracket::Child, _) => (28.0, 130.0),
        (AgeBracket::Teen, Gender::Male) => (56.0, 168.0),
        (AgeBracket::Teen, Gender::Female) => (50.0, 158.0),
        (AgeBracket::Teen, Gender::Other) => (53.0, 163.0),
        (AgeBracket::Adult | AgeBracket::Mature, Gender::Male) => (70.0, 172.0),
        (AgeBracket::Adult | AgeBracket::Mature, Gender::Female) => (58.0, 160.0),
        (AgeBracket::Adult | AgeBracket::Mature, Gender::Other) => (64.0, 166.0),
        (AgeBracket::Senior, Gender::Male) => (66.0, 169.0),
        (AgeBracket::Senior, Gender::Female) => (55.0, 156.0),
        (AgeBracket::Senior, Gender::Other) => (60.0, 162.0),
    }
}

/// Mifflin-St Jeor resting energy for the reference body of this age and gender.
pub fn basal_metabolic_rate(age: u32, gender: Gender) -> f64 {
    let (weight, height) = reference_body(age, gender);
    let offset = match gender {
        Gender::Male => 5.0,
        Gender::Female => -161.0,
        Gender::Other => -78.0,
    };
    (10.0 * weight + 6.25 * height - 5.0 * f64::from(age) + offset).max(0.0)
}

pub fn estimate_daily_calories(
    profile: &PatientProfile,
    preferences: &DietPreferences,
    config: &DietEngineConfig,
) -> CalorieEstimate {
    let (min, max) = if config.min_daily_calories <= config.max_daily_calories {
        (config.min_daily_calories, config.max_daily_calories)
    } else {
        (config.max_daily_calories, config.min_daily_calories)
    };

    if let Some(requested) = preferences.calorie_target {
        let target = requested.clamp(min, max);
        return CalorieEstimate {
            source: CalorieSource::Practitioner,
            bmr: None,
            activity_multiplier: None,
            unclamped: requested,
            target,
            clamped: target != requested,
        };
    }

    let bmr = basal_metabolic_rate(profile.age, profile.gender);
    let multiplier = activity_factor(profile.activity_level);
    let unclamped = (bmr * multiplier).round() as u32;
    let target = unclamped.clamp(min, max);

    CalorieEstimate {
        source: CalorieSource::Estimated,
        bmr: Some(bmr.round() as u32),
        activity_multiplier: Some(multiplier),
        unclamped,
        target,
        clamped: target != unclamped,
    }
}

fn format_quantity(amount: f64, suffix: &str) -> String {
    let rounded = if amount >= 20.0 {
        (amount / 5.0).round() * 5.0
    } else {
        amount.round().max(1.0)
    };
    format!("{}{}", rounded as u32, suffix)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityLevel;
    use crate::services::constraints::DietaryConstraints;

    fn profile(age: u32, gender: Gender, activity_level: ActivityLevel) -> PatientProfile {
        PatientProfile {
            patient_id: "P-test".to_string(),
            name: "Test".to_string(),
            age,
            gender,
            city: "Pune".to_string(),
            constitution: "Pitta".parse().unwrap(),
            condition: String::new(),
            allergies: vec![],
            activity_level,
        }
    }

    #[test]
    fn test_nutrient_bars_sum_to_100() {
        let cases = [(4.0, 42.0, 0.5), (13.0, 1.1, 11.0), (1.0, 1.0, 1.0), (0.0, 0.0, 10.0)];
        for (p, c, f) in cases {
            let bars = nutrient_bars(p, c, f);
            assert_eq!(bars.total(), 100, "bars for {:?}", (p, c, f));
        }
        assert_eq!(nutrient_bars(0.0, 0.0, 0.0).total(), 0);
    }

    #[test]
    fn test_nutritional_fit_prefers_target_split() {
        let balanced = MacroEnergy {
            protein: 20.0,
            carbs: 55.0,
            fat: 25.0,
        };
        let fatty = MacroEnergy {
            protein: 0.0,
            carbs: 0.0,
            fat: 100.0,
        };
        assert!((nutritional_fit(&balanced) - 1.0).abs() < 1e-9);
        assert!(nutritional_fit(&fatty) < nutritional_fit(&balanced));
    }

    #[test]
    fn test_calorie_estimate_for_adult_male() {
        let estimate = estimate_daily_calories(
            &profile(35, Gender::Male, ActivityLevel::Moderate),
            &DietPreferences::default(),
            &DietEngineConfig::default(),
        );
        assert_eq!(estimate.source, CalorieSource::Estimated);
        assert_eq!(estimate.bmr, Some(1605));
        assert_eq!(estimate.target, 2488);
        assert!(!estimate.clamped);
    }

    #[test]
    fn test_requested_target_is_clamped() {
        let preferences = DietPreferences {
            calorie_target: Some(900),
            ..DietPreferences::default()
        };
        let estimate = estimate_daily_calories(
            &profile(35, Gender::Female, ActivityLevel::Low),
            &preferences,
            &DietEngineConfig::default(),
        );
        assert_eq!(estimate.source, CalorieSource::Practitioner);
        assert_eq!(estimate.target, 1200);
        assert!(estimate.clamped);
    }

    #[test]
    fn test_compose_day_hits_allocations() {
        let kb = FoodKnowledgeBase::embedded().unwrap();
        let constraints = DietaryConstraints::default();
        let constitution: Constitution = "Vata".parse().unwrap();
        let composer = MealComposer::new(
            &kb,
            ConstraintResolver::new(&kb, &constraints),
            DoshaWeights::default(),
            &constitution,
            MealSplit::default(),
        );

        let plan = composer.compose_day(&ParsedRecipes::default(), 2000, 1.0);
        assert_eq!(plan.meals.len(), 4);
        assert!(plan.swaps.is_empty());

        for meal in &plan.meals {
            assert_eq!(meal.source, MealSource::KnowledgeBase);
            let kcal: f64 = meal.servings.iter().map(|s| s.base_calories() * s.scale).sum();
            assert!((kcal - meal.allocation).abs() < 1.0);
        }
    }

    #[test]
    fn test_recipe_serving_caps_follow_portion_multiplier() {
        let kb = FoodKnowledgeBase::embedded().unwrap();
        let constraints = DietaryConstraints::default();
        let constitution: Constitution = "Vata".parse().unwrap();
        let composer = MealComposer::new(
            &kb,
            ConstraintResolver::new(&kb, &constraints),
            DoshaWeights::default(),
            &constitution,
            MealSplit::default(),
        );
        let recipes = ParsedRecipes::default().with_meal(
            MealType::Breakfast,
            vec![ParsedIngredient::new("Idli", Some(FoodCategory::Grain))],
        );

        // 500 kcal breakfast: fits in capped Idli at x1.6, not at x0.6.
        let large = composer.compose_day(&recipes, 2000, 1.6);
        let small = composer.compose_day(&recipes, 2000, 0.6);

        let large_breakfast = &large.meals[0];
        assert_eq!(large_breakfast.servings.len(), 1);
        assert!((large_breakfast.servings[0].scale * 1.6 - 3.125).abs() < 1e-9);
        assert!(large.top_ups.is_empty());

        let small_breakfast = &small.meals[0];
        assert_eq!(small_breakfast.source, MealSource::Recipe);
        assert_eq!(small_breakfast.servings[0].name(), "Idli");
        assert_eq!(small_breakfast.servings[0].scale, recipe_serving_cap(FoodCategory::Grain));
        assert!(small_breakfast.servings.len() > 1);
        assert_eq!(small.top_ups.len(), 1);

        let kcal: f64 = small_breakfast
            .servings
            .iter()
            .map(|s| s.base_calories() * s.scale)
            .sum();
        assert!((kcal - 500.0 / 0.6).abs() < 1.0);
    }

    #[test]
    fn test_substitute_already_in_recipe_records_no_swap() {
        let kb = FoodKnowledgeBase::embedded().unwrap();
        let constraints = DietaryConstraints::new(&["coconut".to_string()], &DietPreferences::default());
        let constitution: Constitution = "Pitta".parse().unwrap();
        let composer = MealComposer::new(
            &kb,
            ConstraintResolver::new(&kb, &constraints),
            DoshaWeights::default(),
            &constitution,
            MealSplit::default(),
        );
        let recipes = ParsedRecipes::default().with_meal(
            MealType::Breakfast,
            vec![
                ParsedIngredient::new("Idli", Some(FoodCategory::Grain)),
                ParsedIngredient::new("Tomato Chutney", Some(FoodCategory::Spice)),
                ParsedIngredient::new("Coconut Chutney", Some(FoodCategory::Spice)),
            ],
        );

        let plan = composer.compose_day(&recipes, 2000, 1.0);

        let names: Vec<&str> = plan.meals[0].servings.iter().map(DraftServing::name).collect();
        assert_eq!(names, vec!["Idli", "Tomato Chutney"]);
        assert!(plan.swaps.iter().all(|s| s.meal_type != MealType::Breakfast));
    }

    #[test]
    fn test_fit_recipe_servings_holds_capped_foods() {
        let kb = FoodKnowledgeBase::embedded().unwrap();
        let mut servings = vec![
            DraftServing::known(kb.lookup("Idli").unwrap()),
            DraftServing::known(kb.lookup("Tomato Chutney").unwrap()),
            DraftServing::placeholder("Kokum", None),
        ];

        let shortfall = fit_recipe_servings(&mut servings, 400.0);

        assert_eq!(shortfall, 0.0);
        assert_eq!(servings[1].scale, 1.5);
        assert!((servings[0].scale - (400.0 - 67.5) / 160.0).abs() < 1e-9);
        assert_eq!(servings[2].scale, 1.0);
    }

    #[test]
    fn test_placeholder_serving_is_marked_estimated() {
        let portion = PortionScale {
            multiplier: 1.1,
            activity_level: ActivityLevel::Moderate,
        };
        let serving = DraftServing::placeholder("Kokum", None).into_serving(&portion);
        assert_eq!(serving.name, "Kokum (estimated)");
        assert!(serving.estimated);
        assert_eq!(serving.calories, 0);
    }

    #[test]
    fn test_quantity_formatting() {
        assert_eq!(format_quantity(151.0, "g"), "150g");
        assert_eq!(format_quantity(3.4, "g"), "3g");
        assert_eq!(format_quantity(0.2, "ml"), "1ml");
    }
}
