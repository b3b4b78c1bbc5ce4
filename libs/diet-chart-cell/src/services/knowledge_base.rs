// libs/diet-chart-cell/src/services/knowledge_base.rs
use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use crate::models::{FoodCategory, FoodFilter, FoodItem, KnowledgeBaseError};

/// Catalog compiled into the binary, used when no override path is configured.
pub const EMBEDDED_CATALOG: &str = include_str!("../../data/food_catalog.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FoodId(usize);

/// A lookup hit. `distance` is 0 for exact name or alias matches.
#[derive(Debug, Clone, Copy)]
pub struct FoodMatch<'a> {
    pub item: &'a FoodItem,
    pub distance: usize,
}

/// Immutable food catalog. Records live in one arena sorted by name; the
/// indexes hold arena positions only.
#[derive(Debug)]
pub struct FoodKnowledgeBase {
    foods: Vec<FoodItem>,
    by_name: HashMap<String, FoodId>,
    by_category: HashMap<FoodCategory, Vec<FoodId>>,
}

impl FoodKnowledgeBase {
    pub fn embedded() -> Result<Self, KnowledgeBaseError> {
        Self::from_json_str(EMBEDDED_CATALOG)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, KnowledgeBaseError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| KnowledgeBaseError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let kb = Self::from_json_str(&raw)?;
        info!("Loaded {} foods from {}", kb.len(), path.display());
        Ok(kb)
    }

    /// Loads the override catalog when a path is given, otherwise the embedded one.
    pub fn load(path: Option<&str>) -> Result<Self, KnowledgeBaseError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::embedded(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, KnowledgeBaseError> {
        let entries: Vec<Value> = serde_json::from_str(json)?;

        let items = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let name = entry
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("<unnamed>")
                    .to_string();
                serde_json::from_value::<FoodItem>(entry).map_err(|e| {
                    KnowledgeBaseError::InvalidEntry {
                        index,
                        name,
                        reason: e.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_items(items)
    }

    pub fn from_items(items: Vec<FoodItem>) -> Result<Self, KnowledgeBaseError> {
        if items.is_empty() {
            return Err(KnowledgeBaseError::Empty);
        }

        let mut seen = HashSet::new();
        for (index, item) in items.iter().enumerate() {
            validate_entry(index, item)?;
            if !seen.insert(normalize(&item.name)) {
                return Err(KnowledgeBaseError::InvalidEntry {
                    index,
                    name: item.name.clone(),
                    reason: "duplicate food name".to_string(),
                });
            }
        }

        let mut foods = items;
        foods.sort_by(|a, b| a.name.cmp(&b.name));

        let mut by_name = HashMap::new();
        let mut by_category: HashMap<FoodCategory, Vec<FoodId>> = HashMap::new();

        // Canonical names first so an alias never shadows another food's name.
        for (position, food) in foods.iter().enumerate() {
            by_name.insert(normalize(&food.name), FoodId(position));
            by_category.entry(food.category).or_default().push(FoodId(position));
        }
        for (position, food) in foods.iter().enumerate() {
            for alias in &food.aliases {
                by_name.entry(normalize(alias)).or_insert(FoodId(position));
            }
        }

        debug!(
            "Food knowledge base indexed: {} foods, {} lookup keys",
            foods.len(),
            by_name.len()
        );

        Ok(Self {
            foods,
            by_name,
            by_category,
        })
    }

    pub fn len(&self) -> usize {
        self.foods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.foods.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &FoodItem> {
        self.foods.iter()
    }

    pub fn get(&self, id: FoodId) -> Option<&FoodItem> {
        self.foods.get(id.0)
    }

    /// Foods of one category, in name order.
    pub fn in_category(&self, category: FoodCategory) -> impl Iterator<Item = &FoodItem> {
        self.by_category
            .get(&category)
            .into_iter()
            .flatten()
            .filter_map(|id| self.get(*id))
    }

    pub fn lookup(&self, name: &str) -> Option<&FoodItem> {
        self.lookup_with_hint(name, None).map(|m| m.item)
    }

    pub fn lookup_exact(&self, name: &str) -> Option<&FoodItem> {
        self.by_name.get(&normalize(name)).and_then(|id| self.get(*id))
    }

    /// Exact match over names and aliases, then the closest fuzzy match.
    /// Fuzzy ties prefer `hint`'s category, then the alphabetically first name.
    pub fn lookup_with_hint(
        &self,
        name: &str,
        hint: Option<FoodCategory>,
    ) -> Option<FoodMatch<'_>> {
        let query = normalize(name);
        if query.is_empty() {
            return None;
        }

        if let Some(item) = self.by_name.get(&query).and_then(|id| self.get(*id)) {
            return Some(FoodMatch { item, distance: 0 });
        }

        let max_distance = if query.chars().count() < 5 { 1 } else { 2 };
        let query_len = query.chars().count();

        self.by_name
            .iter()
            .filter(|(key, _)| key.chars().count().abs_diff(query_len) <= max_distance)
            .filter_map(|(key, id)| {
                let distance = levenshtein(&query, key);
                (distance <= max_distance)
                    .then(|| self.get(*id).map(|item| (distance, item)))
                    .flatten()
            })
            .min_by(|(da, a), (db, b)| {
                let hint_miss = |item: &FoodItem| hint.is_some_and(|h| h != item.category);
                da.cmp(db)
                    .then_with(|| hint_miss(a).cmp(&hint_miss(b)))
                    .then_with(|| a.name.cmp(&b.name))
            })
            .map(|(distance, item)| FoodMatch { item, distance })
    }

    pub fn search(&self, filter: &FoodFilter) -> Vec<&FoodItem> {
        self.foods.iter().filter(|food| filter.matches(food)).collect()
    }
}

fn validate_entry(index: usize, item: &FoodItem) -> Result<(), KnowledgeBaseError> {
    let invalid = |reason: String| KnowledgeBaseError::InvalidEntry {
        index,
        name: item.name.clone(),
        reason,
    };

    if item.name.trim().is_empty() {
        return Err(invalid("name cannot be empty".to_string()));
    }
    if item.rasa.is_empty() {
        return Err(invalid("rasa must list at least one taste".to_string()));
    }
    if item.diet_types.is_empty() {
        return Err(invalid("diet_types must list at least one diet".to_string()));
    }
    if !(item.serving_size.is_finite() && item.serving_size > 0.0) {
        return Err(invalid("serving_size must be a positive number".to_string()));
    }

    let nutrients = [
        ("calories", item.calories),
        ("protein", item.protein),
        ("carbs", item.carbs),
        ("fat", item.fat),
        ("fiber", item.fiber),
    ];
    for (field, value) in nutrients {
        if !value.is_finite() || value < 0.0 {
            return Err(invalid(format!("{} must be a non-negative number, got {}", field, value)));
        }
    }

    Ok(())
}

/// Lowercases, trims and collapses inner whitespace and underscores.
pub fn normalize(name: &str) -> String {
    name.to_lowercase()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}
