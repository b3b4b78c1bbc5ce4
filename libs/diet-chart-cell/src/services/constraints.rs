// libs/diet-chart-cell/src/services/constraints.rs
use std::fmt;

use tracing::debug;

use crate::models::{DietPreferences, DietType, FoodItem, Rasa};
use crate::services::knowledge_base::{normalize, FoodKnowledgeBase};

/// Why a food cannot be served as proposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictReason {
    Allergen(String),
    DislikedFood(String),
    DislikedTaste(Rasa),
    DietType(DietType),
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictReason::Allergen(allergen) => write!(f, "allergy to {}", allergen),
            ConflictReason::DislikedFood(food) => write!(f, "dislike of {}", food),
            ConflictReason::DislikedTaste(rasa) => write!(f, "dislike of {} taste", rasa),
            ConflictReason::DietType(diet) => write!(f, "{} diet", diet),
        }
    }
}

/// Outcome of passing a proposed food through the patient's restrictions.
#[derive(Debug, Clone)]
pub enum Resolution<'a> {
    Resolved(&'a FoodItem),
    Substituted {
        original: &'a FoodItem,
        replacement: &'a FoodItem,
        alternatives: Vec<&'a FoodItem>,
        reason: ConflictReason,
    },
    Unresolved {
        original: &'a FoodItem,
        reason: ConflictReason,
    },
}

/// Combined allergies, dislikes and diet type for one patient.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DietaryConstraints {
    allergens: Vec<Vec<String>>,
    allergen_labels: Vec<String>,
    disliked_foods: Vec<Vec<String>>,
    disliked_food_labels: Vec<String>,
    disliked_tastes: Vec<Rasa>,
    diet_type: DietType,
}

impl DietaryConstraints {
    pub fn new(profile_allergies: &[String], preferences: &DietPreferences) -> Self {
        let allergies = profile_allergies
            .iter()
            .chain(preferences.allergies.iter())
            .map(String::as_str);
        Self::from_parts(allergies, preferences.dislikes.iter().map(String::as_str), preferences.diet_type)
    }

    pub fn from_parts<'s>(
        allergies: impl IntoIterator<Item = &'s str>,
        dislikes: impl IntoIterator<Item = &'s str>,
        diet_type: DietType,
    ) -> Self {
        let mut constraints = Self {
            diet_type,
            ..Self::default()
        };

        for allergy in allergies {
            let label = normalize(allergy);
            if label.is_empty() || constraints.allergen_labels.contains(&label) {
                continue;
            }
            constraints.allergens.push(words(&label));
            constraints.allergen_labels.push(label);
        }

        for dislike in dislikes {
            if let Ok(rasa) = dislike.parse::<Rasa>() {
                if !constraints.disliked_tastes.contains(&rasa) {
                    constraints.disliked_tastes.push(rasa);
                }
                continue;
            }
            let label = normalize(dislike);
            if label.is_empty() || constraints.disliked_food_labels.contains(&label) {
                continue;
            }
            constraints.disliked_foods.push(words(&label));
            constraints.disliked_food_labels.push(label);
        }

        constraints
    }

    pub fn allergies(&self) -> &[String] {
        &self.allergen_labels
    }

    pub fn disliked_tastes(&self) -> &[Rasa] {
        &self.disliked_tastes
    }

    pub fn diet_type(&self) -> DietType {
        self.diet_type
    }

    pub fn is_unrestricted(&self) -> bool {
        self.allergens.is_empty()
            && self.disliked_foods.is_empty()
            && self.disliked_tastes.is_empty()
            && self.diet_type == DietType::NonVegetarian
    }

    /// First restriction the food breaks, checked allergen, diet, food, taste.
    pub fn conflict(&self, food: &FoodItem) -> Option<ConflictReason> {
        let name_words: Vec<Vec<String>> = std::iter::once(&food.name)
            .chain(food.aliases.iter())
            .map(|n| words(&normalize(n)))
            .collect();
        let tag_words: Vec<Vec<String>> = food.allergens.iter().map(|t| words(&normalize(t))).collect();

        for (allergen, label) in self.allergens.iter().zip(&self.allergen_labels) {
            let tagged = tag_words.iter().any(|tag| contains_phrase(tag, allergen));
            let named = name_words.iter().any(|name| contains_phrase(name, allergen));
            if tagged || named {
                return Some(ConflictReason::Allergen(label.clone()));
            }
        }

        if !food.allows_diet(self.diet_type) {
            return Some(ConflictReason::DietType(self.diet_type));
        }

        for (dislike, label) in self.disliked_foods.iter().zip(&self.disliked_food_labels) {
            if name_words.iter().any(|name| contains_phrase(name, dislike)) {
                return Some(ConflictReason::DislikedFood(label.clone()));
            }
        }

        if let Some(primary) = food.primary_rasa() {
            if self.disliked_tastes.contains(&primary) {
                return Some(ConflictReason::DislikedTaste(primary));
            }
        }

        None
    }

    /// Checks a free-text ingredient name that has no catalog record.
    pub fn conflict_for_name(&self, name: &str) -> Option<ConflictReason> {
        let name = words(&normalize(name));
        if let Some(label) = self
            .allergens
            .iter()
            .zip(&self.allergen_labels)
            .find(|(allergen, _)| contains_phrase(&name, allergen))
            .map(|(_, label)| label)
        {
            return Some(ConflictReason::Allergen(label.clone()));
        }
        self.disliked_foods
            .iter()
            .zip(&self.disliked_food_labels)
            .find(|(dislike, _)| contains_phrase(&name, dislike))
            .map(|(_, label)| ConflictReason::DislikedFood(label.clone()))
    }
}

pub struct ConstraintResolver<'a> {
    kb: &'a FoodKnowledgeBase,
    constraints: &'a DietaryConstraints,
}

impl<'a> ConstraintResolver<'a> {
    pub fn new(kb: &'a FoodKnowledgeBase, constraints: &'a DietaryConstraints) -> Self {
        Self { kb, constraints }
    }

    pub fn constraints(&self) -> &'a DietaryConstraints {
        self.constraints
    }

    pub fn resolve(&self, food: &'a FoodItem) -> Resolution<'a> {
        let Some(reason) = self.constraints.conflict(food) else {
            return Resolution::Resolved(food);
        };

        let mut candidates = self.substitutes(food);
        if candidates.is_empty() {
            debug!("No substitute for {} ({})", food.name, reason);
            return Resolution::Unresolved {
                original: food,
                reason,
            };
        }

        let replacement = candidates.remove(0);
        debug!("Substituting {} with {} ({})", food.name, replacement.name, reason);
        Resolution::Substituted {
            original: food,
            replacement,
            alternatives: candidates,
            reason,
        }
    }

    /// Safe foods of the same category sharing a taste, closest calories first.
    pub fn substitutes(&self, food: &FoodItem) -> Vec<&'a FoodItem> {
        let mut candidates: Vec<&'a FoodItem> = self
            .kb
            .in_category(food.category)
            .filter(|candidate| candidate.name != food.name)
            .filter(|candidate| candidate.shares_rasa_with(food))
            .filter(|candidate| self.constraints.conflict(candidate).is_none())
            .collect();

        candidates.sort_by(|a, b| {
            let da = (a.calories - food.calories).abs();
            let db = (b.calories - food.calories).abs();
            da.total_cmp(&db).then_with(|| a.name.cmp(&b.name))
        });
        candidates
    }
}

/// Normalized words with a trailing plural stripped.
fn words(normalized: &str) -> Vec<String> {
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(singular)
        .collect()
}

fn singular(word: &str) -> String {
    if word.len() > 4 && word.ends_with("ies") {
        return format!("{}y", &word[..word.len() - 3]);
    }
    if word.len() > 3 && word.ends_with("oes") {
        return word[..word.len() - 2].to_string();
    }
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

fn contains_phrase(haystack: &[String], needle: &[String]) -> bool {
    !needle.is_empty()
        && haystack.len() >= needle.len()
        && haystack.windows(needle.len()).any(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn kb() -> FoodKnowledgeBase {
        FoodKnowledgeBase::embedded().unwrap()
    }

    #[test]
    fn test_allergen_matches_tag_and_name_words() {
        let kb = kb();
        let constraints = DietaryConstraints::from_parts(["Nuts"], [], DietType::NonVegetarian);

        let almonds = kb.lookup("Almonds").unwrap();
        assert_eq!(constraints.conflict(almonds), Some(ConflictReason::Allergen("nuts".into())));

        // "coconut" is not the word "nut"
        let chutney = kb.lookup("Coconut Chutney").unwrap();
        assert_eq!(constraints.conflict(chutney), None);

        let milk_allergy = DietaryConstraints::from_parts(["milk"], [], DietType::NonVegetarian);
        let lassi = kb.lookup("Sweet Lassi").unwrap();
        assert_matches!(milk_allergy.conflict(lassi), Some(ConflictReason::Allergen(_)));
    }

    #[test]
    fn test_plural_insensitive_allergen() {
        let kb = kb();
        let constraints = DietaryConstraints::from_parts(["strawberries"], [], DietType::NonVegetarian);
        let strawberry = kb.lookup("Strawberry").unwrap();
        assert!(constraints.conflict(strawberry).is_some());
    }

    #[test]
    fn test_taste_dislike_only_blocks_primary_rasa() {
        let kb = kb();
        let constraints = DietaryConstraints::from_parts([], ["sour"], DietType::NonVegetarian);

        let curd = kb.lookup("Curd").unwrap();
        assert_eq!(constraints.conflict(curd), Some(ConflictReason::DislikedTaste(Rasa::Sour)));

        // Idli is Sweet first, Sour second.
        let idli = kb.lookup("Idli").unwrap();
        assert_eq!(constraints.conflict(idli), None);
    }

    #[test]
    fn test_food_dislike_matches_alias() {
        let kb = kb();
        let constraints = DietaryConstraints::from_parts([], ["bhindi"], DietType::NonVegetarian);
        let okra = kb.lookup("Okra").unwrap();
        assert_matches!(constraints.conflict(okra), Some(ConflictReason::DislikedFood(_)));
    }

    #[test]
    fn test_coconut_chutney_substitution() {
        let kb = kb();
        let constraints = DietaryConstraints::from_parts(["coconut"], [], DietType::NonVegetarian);
        let resolver = ConstraintResolver::new(&kb, &constraints);

        let chutney = kb.lookup("Coconut Chutney").unwrap();
        match resolver.resolve(chutney) {
            Resolution::Substituted { original, replacement, alternatives, reason } => {
                assert_eq!(original.name, "Coconut Chutney");
                assert_eq!(replacement.name, "Tomato Chutney");
                assert_eq!(replacement.category, chutney.category);
                assert!(replacement.shares_rasa_with(chutney));
                assert!(alternatives.iter().all(|alt| constraints.conflict(alt).is_none()));
                assert_eq!(reason, ConflictReason::Allergen("coconut".into()));
            }
            other => panic!("expected substitution, got {:?}", other),
        }
    }

    #[test]
    fn test_vegan_dairy_is_unresolved() {
        let kb = kb();
        let constraints = DietaryConstraints::from_parts([], [], DietType::Vegan);
        let resolver = ConstraintResolver::new(&kb, &constraints);

        let paneer = kb.lookup("Paneer").unwrap();
        assert_matches!(
            resolver.resolve(paneer),
            Resolution::Unresolved { reason: ConflictReason::DietType(DietType::Vegan), .. }
        );
    }

    #[test]
    fn test_unrestricted_resolves_everything() {
        let kb = kb();
        let constraints = DietaryConstraints::default();
        assert!(constraints.is_unrestricted());
        let resolver = ConstraintResolver::new(&kb, &constraints);
        for food in kb.items() {
            assert_matches!(resolver.resolve(food), Resolution::Resolved(_));
        }
    }
}
