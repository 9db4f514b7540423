//! Recipe storage
//!
//! Recipes are kept as two flat tables, recipes and ingredients, the way a
//! small SQL database would. [`MemoryStore`] is the in memory version; other
//! backends implement [`RecipeStore`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Ingredient, Recipe, RecipeId};

/// Recipe as entered by the user, before it has an id
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecipeDraft {
    pub name: String,
    /// Rows with an empty name are not stored
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
}

impl RecipeDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ingredients: Vec::new(),
        }
    }

    pub fn ingredient(
        mut self,
        name: impl Into<String>,
        quantity: f64,
        unit: impl Into<String>,
    ) -> Self {
        self.ingredients.push(Ingredient::new(name, quantity, unit));
        self
    }
}

/// Errors from a [`RecipeStore`]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Please enter a recipe name")]
    MissingName,

    #[error("Ingredient '{name}' has an invalid quantity: {quantity}")]
    InvalidQuantity { name: String, quantity: f64 },

    #[error("Recipe {0} not found")]
    NotFound(RecipeId),
}

/// Storage of recipes
///
/// Access is expected to be serialized by the caller, a single writer at a
/// time.
pub trait RecipeStore {
    /// Stores a new recipe and returns its id
    fn add_recipe(&mut self, draft: RecipeDraft) -> Result<RecipeId, StoreError>;

    /// Renames the recipe and replaces all of its ingredients
    fn update_recipe(&mut self, id: RecipeId, draft: RecipeDraft) -> Result<(), StoreError>;

    fn remove_recipe(&mut self, id: RecipeId) -> Result<(), StoreError>;

    /// A recipe with its ingredients in insertion order
    fn recipe(&self, id: RecipeId) -> Result<Recipe, StoreError>;

    /// Id and name of every recipe, oldest first
    fn recipes(&self) -> Vec<(RecipeId, String)>;
}

#[derive(Debug, Clone)]
struct RecipeRow {
    name: String,
}

#[derive(Debug, Clone)]
struct IngredientRow {
    recipe: RecipeId,
    ingredient: Ingredient,
}

/// In memory [`RecipeStore`]
///
/// Ids are assigned incrementally from 1 and never reused.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    recipes: IndexMap<RecipeId, RecipeRow>,
    ingredients: Vec<IngredientRow>,
    last_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    fn insert_ingredients(&mut self, recipe: RecipeId, ingredients: Vec<Ingredient>) -> usize {
        let before = self.ingredients.len();
        self.ingredients.extend(
            ingredients
                .into_iter()
                .filter(|i| !i.name.trim().is_empty())
                .map(|ingredient| IngredientRow { recipe, ingredient }),
        );
        self.ingredients.len() - before
    }

    fn delete_ingredients(&mut self, recipe: RecipeId) {
        self.ingredients.retain(|row| row.recipe != recipe);
    }
}

fn validate(draft: &RecipeDraft) -> Result<(), StoreError> {
    if draft.name.trim().is_empty() {
        return Err(StoreError::MissingName);
    }
    let invalid = draft
        .ingredients
        .iter()
        .filter(|i| !i.name.trim().is_empty())
        .find(|i| !i.quantity.is_finite() || i.quantity < 0.0);
    if let Some(i) = invalid {
        return Err(StoreError::InvalidQuantity {
            name: i.name.clone(),
            quantity: i.quantity,
        });
    }
    Ok(())
}

impl RecipeStore for MemoryStore {
    #[tracing::instrument(level = "debug", skip_all, fields(name = %draft.name))]
    fn add_recipe(&mut self, draft: RecipeDraft) -> Result<RecipeId, StoreError> {
        validate(&draft)?;
        self.last_id += 1;
        let id = RecipeId(self.last_id);
        self.recipes.insert(id, RecipeRow { name: draft.name });
        let stored = self.insert_ingredients(id, draft.ingredients);
        tracing::debug!(%id, ingredients = stored, "recipe saved");
        Ok(id)
    }

    #[tracing::instrument(level = "debug", skip(self, draft), fields(name = %draft.name))]
    fn update_recipe(&mut self, id: RecipeId, draft: RecipeDraft) -> Result<(), StoreError> {
        validate(&draft)?;
        let row = self.recipes.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        row.name = draft.name;
        self.delete_ingredients(id);
        let stored = self.insert_ingredients(id, draft.ingredients);
        tracing::debug!(ingredients = stored, "recipe updated");
        Ok(())
    }

    fn remove_recipe(&mut self, id: RecipeId) -> Result<(), StoreError> {
        self.recipes
            .shift_remove(&id)
            .ok_or(StoreError::NotFound(id))?;
        self.delete_ingredients(id);
        Ok(())
    }

    fn recipe(&self, id: RecipeId) -> Result<Recipe, StoreError> {
        let row = self.recipes.get(&id).ok_or(StoreError::NotFound(id))?;
        let ingredients = self
            .ingredients
            .iter()
            .filter(|r| r.recipe == id)
            .map(|r| r.ingredient.clone())
            .collect();
        Ok(Recipe {
            id,
            name: row.name.clone(),
            ingredients,
        })
    }

    fn recipes(&self) -> Vec<(RecipeId, String)> {
        self.recipes
            .iter()
            .map(|(id, row)| (*id, row.name.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_not_reused() {
        let mut store = MemoryStore::new();
        let a = store.add_recipe(RecipeDraft::new("a")).unwrap();
        store.remove_recipe(a).unwrap();
        let b = store.add_recipe(RecipeDraft::new("b")).unwrap();
        assert_ne!(a, b);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_drops_ingredients() {
        let mut store = MemoryStore::new();
        let id = store
            .add_recipe(RecipeDraft::new("bread").ingredient("flour", 500.0, "g"))
            .unwrap();
        store.remove_recipe(id).unwrap();
        assert!(store.ingredients.is_empty());
        assert_eq!(store.recipe(id), Err(StoreError::NotFound(id)));
    }

    #[test]
    fn negative_quantity() {
        let mut store = MemoryStore::new();
        let err = store
            .add_recipe(RecipeDraft::new("bread").ingredient("flour", -1.0, "g"))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuantity { .. }));
        assert!(store.is_empty());
    }
}
