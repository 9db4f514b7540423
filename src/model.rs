//! Recipe representation

use serde::{Deserialize, Serialize};

/// Opaque identifier of a stored [`Recipe`]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct RecipeId(pub(crate) u64);

impl std::fmt::Display for RecipeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A recipe ingredient
///
/// The unit is free text. It may be a known unit (`g`, `cups`), something the
/// converter doesn't know (`pinch`) or empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    /// Name, not necessarily unique in the recipe
    pub name: String,
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit: unit.into(),
        }
    }
}

/// A stored recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    /// In insertion order
    pub ingredients: Vec<Ingredient>,
}

impl Recipe {
    /// First ingredient with the given name
    ///
    /// Duplicate names are allowed in a recipe, only the first one can be
    /// chosen as key.
    pub fn ingredient(&self, name: &str) -> Option<&Ingredient> {
        self.ingredients.iter().find(|i| i.name == name)
    }
}

/// What the user asked for: the key ingredient from its original amount to
/// a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleRequest {
    pub key_ingredient_name: String,
    pub key_original_quantity: f64,
    pub key_original_unit: String,
    pub key_target_quantity: f64,
    pub key_target_unit: String,
}

impl ScaleRequest {
    /// Builds a request for the first ingredient called `key` in `recipe`
    ///
    /// An empty `target_unit` means the key ingredient's own unit. Returns
    /// [`None`] if no ingredient has that name.
    pub fn for_key(
        recipe: &Recipe,
        key: &str,
        target_quantity: f64,
        target_unit: &str,
    ) -> Option<Self> {
        let ingredient = recipe.ingredient(key)?;
        let target_unit = if target_unit.trim().is_empty() {
            ingredient.unit.clone()
        } else {
            target_unit.to_string()
        };
        Some(Self {
            key_ingredient_name: ingredient.name.clone(),
            key_original_quantity: ingredient.quantity,
            key_original_unit: ingredient.unit.clone(),
            key_target_quantity: target_quantity,
            key_target_unit: target_unit,
        })
    }

    pub fn original(&self) -> (f64, &str) {
        (self.key_original_quantity, &self.key_original_unit)
    }

    pub fn target(&self) -> (f64, &str) {
        (self.key_target_quantity, &self.key_target_unit)
    }
}

/// A scaled ingredient, ready to be shown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
}

impl ConversionResult {
    pub fn new(name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit: unit.into(),
        }
    }
}

impl std::fmt::Display for ConversionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.quantity)?;
        if !self.unit.is_empty() {
            write!(f, " {}", self.unit)?;
        }
        Ok(())
    }
}
