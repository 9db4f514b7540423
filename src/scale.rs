//! Support for recipe scaling
//!
//! Scaling is driven by a key ingredient: the user changes its amount and
//! every other ingredient follows in proportion.
//!
//! 1. [`resolve_factor`] compares the original and target amounts of the key
//!    ingredient, converting units when both are known and compatible.
//! 2. [`scale_ingredients`] multiplies every ingredient by that factor.
//!
//! Neither step fails. Unknown units, units that measure different things
//! and zero amounts fall back to plain numbers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    convert::Converter,
    model::{ConversionResult, Ingredient, Recipe, RecipeId, ScaleRequest},
    quantity::{round_to, Quantity},
};

/// Configures how scaled values are presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScaleOptions {
    /// Decimal places of every scaled quantity. Defaults to 3.
    pub decimals: u32,
    pub unit_style: UnitStyle,
}

impl Default for ScaleOptions {
    fn default() -> Self {
        Self {
            decimals: 3,
            unit_style: UnitStyle::default(),
        }
    }
}

/// How the unit of a scaled known unit is written
///
/// Unknown units are always kept as written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnitStyle {
    /// The same text the ingredient had: `2 cups` scales to `4 cups`
    #[default]
    AsWritten,
    /// The unit symbol: `2 cups` scales to `4 c`
    Symbol,
    /// The best unit of the same system: `600 g` doubled is `1.2 kg`
    BestFit,
}

/// A resolved scale factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleFactor {
    value: f64,
    kind: FactorKind,
}

/// Where a [`ScaleFactor`] comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FactorKind {
    /// Both key amounts had known and compatible units
    Converted,
    /// Plain division of the amounts, units ignored
    Unitless,
    /// The original key amount is zero, there is nothing to scale
    ZeroOriginal,
}

impl ScaleFactor {
    /// Get the calculated scaling factor
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn kind(&self) -> FactorKind {
        self.kind
    }
}

/// Outcome of scaling one ingredient
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum ScaledAmount {
    /// The unit is known, the value is a [`Quantity`]
    Converted(Quantity),
    /// The unit is unknown or missing, the value is just a number
    Unitless(f64),
}

impl ScaledAmount {
    /// Unrounded scaled value
    pub fn value(&self) -> f64 {
        match self {
            ScaledAmount::Converted(q) => q.value(),
            ScaledAmount::Unitless(v) => *v,
        }
    }

    pub fn is_converted(&self) -> bool {
        matches!(self, ScaledAmount::Converted(_))
    }

    /// Renders the amount for `ingredient`, the one it was scaled from
    pub fn into_result(
        self,
        ingredient: &Ingredient,
        options: &ScaleOptions,
        converter: &Converter,
    ) -> ConversionResult {
        let (value, unit) = match self {
            ScaledAmount::Unitless(value) => (value, ingredient.unit.clone()),
            ScaledAmount::Converted(q) => match options.unit_style {
                UnitStyle::AsWritten => (q.value(), ingredient.unit.clone()),
                UnitStyle::Symbol => (q.value(), q.unit().symbol().to_string()),
                UnitStyle::BestFit => {
                    let fitted = q.fit(converter).unwrap_or(q);
                    (fitted.value(), fitted.unit().symbol().to_string())
                }
            },
        };
        ConversionResult {
            name: ingredient.name.clone(),
            quantity: round_to(value, options.decimals),
            unit,
        }
    }
}

/// Possible errors during scaling process
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScaleError {
    #[error("No ingredient named '{name}' in the recipe")]
    KeyIngredientNotFound { name: String },
}

/// Calculates the factor that takes the key ingredient from `original` to
/// `target`.
///
/// When both units are known and measure the same thing, `target` is first
/// converted to the unit of `original`, so `500 ml` over `1 liter` is `0.5`.
/// Otherwise the amounts are divided as they are. A zero `original` gives a
/// zero factor.
#[tracing::instrument(level = "debug", skip(converter), ret)]
pub fn resolve_factor(
    original: (f64, &str),
    target: (f64, &str),
    converter: &Converter,
) -> ScaleFactor {
    let (original_value, original_unit) = original;
    let (target_value, target_unit) = target;

    if original_value == 0.0 {
        return ScaleFactor {
            value: 0.0,
            kind: FactorKind::ZeroOriginal,
        };
    }

    let converted = converter
        .parse(original_value, original_unit)
        .and_then(|original| {
            converter
                .parse(target_value, target_unit)?
                .convert_to(original.unit(), converter)
        });

    match converted {
        Ok(target) => ScaleFactor {
            value: target.value() / original_value,
            kind: FactorKind::Converted,
        },
        Err(error) => {
            tracing::debug!(%error, "key ingredient units not convertible, dividing amounts");
            ScaleFactor {
                value: target_value / original_value,
                kind: FactorKind::Unitless,
            }
        }
    }
}

impl Ingredient {
    /// Scale this ingredient by `factor`
    pub fn scale(&self, factor: f64, converter: &Converter) -> ScaledAmount {
        match converter.parse(self.quantity, &self.unit) {
            Ok(q) => ScaledAmount::Converted(q.scale(factor)),
            Err(error) => {
                tracing::debug!(
                    %error,
                    ingredient = %self.name,
                    "unknown unit, scaling as a plain number"
                );
                ScaledAmount::Unitless(self.quantity * factor)
            }
        }
    }
}

/// Scales every ingredient by `factor`
///
/// The output has the same length and order as `ingredients`. An ingredient
/// with an unknown unit never affects the others.
#[tracing::instrument(level = "debug", skip_all, fields(len = ingredients.len(), factor = factor))]
pub fn scale_ingredients(
    ingredients: &[Ingredient],
    factor: f64,
    converter: &Converter,
    options: &ScaleOptions,
) -> Vec<ConversionResult> {
    ingredients
        .iter()
        .map(|i| i.scale(factor, converter).into_result(i, options, converter))
        .collect()
}

/// A recipe after scaling
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaledRecipe {
    pub id: RecipeId,
    pub name: String,
    pub factor: ScaleFactor,
    /// Same index as in the recipe
    pub ingredients: Vec<ConversionResult>,
}

impl Recipe {
    /// Scale a recipe from a [`ScaleRequest`]
    ///
    /// The key ingredient is looked up by name (the first one if the name is
    /// repeated) and it's scaled like any other ingredient. The factor uses
    /// the amounts in the request, not the ones stored in the recipe.
    pub fn scale_by_key(
        &self,
        request: &ScaleRequest,
        converter: &Converter,
        options: &ScaleOptions,
    ) -> Result<ScaledRecipe, ScaleError> {
        if self.ingredient(&request.key_ingredient_name).is_none() {
            return Err(ScaleError::KeyIngredientNotFound {
                name: request.key_ingredient_name.clone(),
            });
        }

        let factor = resolve_factor(request.original(), request.target(), converter);
        let ingredients = scale_ingredients(&self.ingredients, factor.value(), converter, options);

        Ok(ScaledRecipe {
            id: self.id,
            name: self.name.clone(),
            factor,
            ingredients,
        })
    }

    /// Scale so the ingredient `key` becomes `target_quantity` `target_unit`
    ///
    /// An empty `target_unit` keeps the key ingredient's unit.
    pub fn scale_to(
        &self,
        key: &str,
        target_quantity: f64,
        target_unit: &str,
        converter: &Converter,
        options: &ScaleOptions,
    ) -> Result<ScaledRecipe, ScaleError> {
        let request = ScaleRequest::for_key(self, key, target_quantity, target_unit).ok_or_else(
            || ScaleError::KeyIngredientNotFound {
                name: key.to_string(),
            },
        )?;
        self.scale_by_key(&request, converter, options)
    }
}
