// libs/diet-chart-cell/src/services/recipe_parser.rs
use std::collections::HashSet;

use regex::Regex;
use tracing::debug;

use crate::models::{MealRecipes, MealType, ParsedIngredient, ParsedRecipes};
use crate::services::knowledge_base::{normalize, FoodKnowledgeBase};

/// Composite dishes and their usual ingredients. Ingredients missing from the
/// catalog come through uncategorized and are served as estimates.
const DISHES: &[(&[&str], &[&str])] = &[
    (
        &["sambar rice", "sambhar rice"],
        &["Basmati Rice", "Toor Dal", "Tomato", "Onion", "Drumstick", "Tamarind", "Turmeric", "Ghee"],
    ),
    (
        &["sambar", "sambhar"],
        &["Toor Dal", "Tomato", "Onion", "Drumstick", "Tamarind", "Turmeric"],
    ),
    (
        &["curd rice", "dahi chawal"],
        &["Basmati Rice", "Curd", "Cumin Seeds", "Curry Leaves"],
    ),
    (
        &["dal rice", "daal chawal", "dal chawal"],
        &["Basmati Rice", "Toor Dal", "Turmeric", "Ghee", "Cumin Seeds"],
    ),
    (
        &["rasam"],
        &["Toor Dal", "Tomato", "Tamarind", "Black Pepper", "Cumin Seeds", "Ghee"],
    ),
    (
        &["chicken biryani", "biryani"],
        &["Basmati Rice", "Chicken", "Onion", "Tomato", "Ginger", "Garlic", "Ghee", "Garam Masala"],
    ),
    (
        &["chicken curry", "murgh curry"],
        &["Chicken", "Onion", "Tomato", "Ginger", "Garlic", "Turmeric", "Coriander Seeds"],
    ),
    (
        &["paneer butter masala", "butter masala"],
        &["Paneer", "Tomato", "Onion", "Ghee", "Ginger", "Garlic", "Turmeric"],
    ),
    (
        &["palak paneer"],
        &["Spinach", "Paneer", "Onion", "Garlic", "Ghee"],
    ),
    (
        &["chana masala", "chole masala"],
        &["Chickpeas", "Onion", "Tomato", "Ginger", "Coriander Seeds"],
    ),
    (
        &["dal tadka", "dal fry"],
        &["Toor Dal", "Ghee", "Cumin Seeds", "Garlic", "Turmeric"],
    ),
    (
        &["vegetable pulao", "veg pulao", "pulao"],
        &["Basmati Rice", "Carrot", "Green Beans", "Ghee", "Cumin Seeds"],
    ),
    (
        &["masala dosa"],
        &["Plain Dosa", "Potato", "Onion", "Turmeric"],
    ),
];

struct Pattern {
    phrase_len: usize,
    regex: Regex,
    ingredients: Vec<ParsedIngredient>,
}

/// Extracts catalog ingredients from free recipe text.
pub struct RecipeParser {
    dishes: Vec<Pattern>,
    terms: Vec<Pattern>,
}

impl RecipeParser {
    pub fn new(kb: &FoodKnowledgeBase) -> Result<Self, regex::Error> {
        let ingredient = |name: &str| {
            let category = kb.lookup_exact(name).map(|food| food.category);
            ParsedIngredient::new(name, category)
        };

        let mut dishes = Vec::new();
        for (phrases, names) in DISHES {
            let ingredients: Vec<ParsedIngredient> = names.iter().map(|n| ingredient(*n)).collect();
            for phrase in *phrases {
                dishes.push(Pattern {
                    phrase_len: phrase.len(),
                    regex: phrase_regex(phrase)?,
                    ingredients: ingredients.clone(),
                });
            }
        }

        let mut seen = HashSet::new();
        let mut terms = Vec::new();
        for food in kb.items() {
            for term in std::iter::once(&food.name).chain(food.aliases.iter()) {
                let term = normalize(term);
                if term.is_empty() || !seen.insert(term.clone()) {
                    continue;
                }
                terms.push(Pattern {
                    phrase_len: term.len(),
                    regex: phrase_regex(&term)?,
                    ingredients: vec![ParsedIngredient::new(food.name.clone(), Some(food.category))],
                });
            }
        }

        // Longest phrases first so "curd rice" wins over "rice".
        dishes.sort_by(|a, b| b.phrase_len.cmp(&a.phrase_len));
        terms.sort_by(|a, b| b.phrase_len.cmp(&a.phrase_len));

        debug!("Recipe parser ready: {} dish patterns, {} food terms", dishes.len(), terms.len());
        Ok(Self { dishes, terms })
    }

    /// Ingredients in order of first mention, without repeats.
    pub fn parse(&self, text: &str) -> Vec<ParsedIngredient> {
        let mut working = text.to_lowercase();
        let mut hits: Vec<(usize, &[ParsedIngredient])> = Vec::new();

        for pattern in self.dishes.iter().chain(self.terms.iter()) {
            let ranges: Vec<_> = pattern.regex.find_iter(&working).map(|m| m.range()).collect();
            for range in ranges {
                hits.push((range.start, pattern.ingredients.as_slice()));
                working.replace_range(range.clone(), &" ".repeat(range.len()));
            }
        }

        hits.sort_by_key(|(start, _)| *start);

        let mut seen = HashSet::new();
        hits.into_iter()
            .flat_map(|(_, ingredients)| ingredients.iter())
            .filter(|ingredient| seen.insert(ingredient.name.clone()))
            .cloned()
            .collect()
    }

    /// Parses every meal slot that carries recipe text.
    pub fn parse_recipes(&self, recipes: Option<&MealRecipes>) -> ParsedRecipes {
        let mut parsed = ParsedRecipes::default();
        let Some(recipes) = recipes else {
            return parsed;
        };

        for meal_type in MealType::ALL {
            let Some(input) = recipes.get(meal_type) else {
                continue;
            };
            let slot = meal_type.as_str().to_lowercase();

            match input.text() {
                Some(text) => {
                    let ingredients = self.parse(text);
                    if ingredients.is_empty() {
                        parsed.notes.push(format!(
                            "No known ingredients were found in the {} recipe, so {} was composed from the food database.",
                            slot, slot
                        ));
                    } else {
                        debug!("Parsed {} ingredients from {} recipe", ingredients.len(), slot);
                        parsed.meals.insert(meal_type, ingredients);
                    }
                }
                None if input.has_image() => parsed.notes.push(format!(
                    "The {} recipe was sent as an image only; add the recipe text to use it. {} was composed from the food database.",
                    slot, meal_type
                )),
                None => {}
            }
        }

        parsed
    }
}

/// Case-insensitive whole-phrase match, tolerant of extra spaces and plurals.
fn phrase_regex(phrase: &str) -> Result<Regex, regex::Error> {
    let body = phrase
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    Regex::new(&format!(r"(?i)\b{}(?:e?s)?\b", body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FoodCategory, RecipeInput};

    fn parser() -> RecipeParser {
        let kb = FoodKnowledgeBase::embedded().unwrap();
        RecipeParser::new(&kb).unwrap()
    }

    fn names(ingredients: &[ParsedIngredient]) -> Vec<&str> {
        ingredients.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn test_parses_catalog_items_in_text_order() {
        let parsed = parser().parse("Idli with coconut chutney");
        assert_eq!(names(&parsed), vec!["Idli", "Coconut Chutney"]);
        assert_eq!(parsed[1].category, Some(FoodCategory::Spice));
    }

    #[test]
    fn test_dish_expands_before_single_terms() {
        let parsed = parser().parse("Curd rice and a bowl of RASAM");
        let found = names(&parsed);
        assert_eq!(&found[..2], &["Basmati Rice", "Curd"]);
        assert!(found.contains(&"Black Pepper"));
        assert!(found.contains(&"Curry Leaves"));

        let curry_leaves = parsed.iter().find(|i| i.name == "Curry Leaves").unwrap();
        assert_eq!(curry_leaves.category, None);
    }

    #[test]
    fn test_aliases_and_plurals() {
        let parsed = parser().parse("two rotis, dahi and some bhindi");
        assert_eq!(names(&parsed), vec!["Wheat Chapati", "Curd", "Okra"]);
    }

    #[test]
    fn test_duplicates_are_removed() {
        let parsed = parser().parse("rice, more rice and basmati rice");
        assert_eq!(names(&parsed), vec!["Basmati Rice"]);
    }

    #[test]
    fn test_image_only_recipe_adds_note() {
        let recipes = MealRecipes {
            lunch: Some(RecipeInput {
                recipe_text: None,
                recipe_image_base64: Some("aGVsbG8=".to_string()),
            }),
            ..MealRecipes::default()
        };
        let parsed = parser().parse_recipes(Some(&recipes));
        assert!(parsed.meals.is_empty());
        assert_eq!(parsed.notes.len(), 1);
        assert!(parsed.notes[0].contains("image"));
    }
}
