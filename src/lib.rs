//! Proportional recipe scaling with unit conversion.
//!
//! Pick a key ingredient, say how much of it you want now, and every other
//! ingredient is scaled in proportion.
//!
//! Includes:
//! - A configurable unit vocabulary and converter.
//! - A scale factor resolver that understands units.
//! - A recipe scaler that degrades to plain numbers for units it doesn't know.
//! - A small recipe store.
//!
//! # Basic usage
//!
//! ```rust
//! use recipe_scaler::{resolve_scale_factor, scale_recipe, Ingredient};
//!
//! let factor = resolve_scale_factor((2.0, "cups"), (4.0, "cups"));
//! assert_eq!(factor, 2.0);
//!
//! let scaled = scale_recipe(
//!     &[
//!         Ingredient::new("flour", 2.0, "cups"),
//!         Ingredient::new("sugar", 100.0, "g"),
//!         Ingredient::new("salt", 1.0, "pinch"),
//!     ],
//!     factor,
//! );
//! assert_eq!(scaled[1].quantity, 200.0);
//! assert_eq!(scaled[2].unit, "pinch");
//! ```
//!
//! The free functions use a shared [`Converter::default`]. To use other units
//! or other output options, build a [`Converter`] and call
//! [`scale::resolve_factor`] and [`scale::scale_ingredients`] directly, or
//! [`Recipe::scale_by_key`].

#![warn(rustdoc::broken_intra_doc_links, clippy::doc_markdown)]

#[cfg(doc)]
pub mod _features {
    //! This lib has 1 feature, enabled by default:
    //! - `bundled_units`. Includes a units file with the most common units for
    //!   recipes in English. The default [`Converter`](crate::convert::Converter)
    //!   uses them if this feature is enabled.
}

pub mod convert;
pub mod model;
pub mod quantity;
pub mod scale;
pub mod store;

use once_cell::sync::Lazy;

pub use convert::Converter;
pub use model::*;
pub use quantity::Quantity;
pub use scale::{ScaleFactor, ScaleOptions, ScaledAmount, UnitStyle};
pub use store::{MemoryStore, RecipeDraft, RecipeStore};

static DEFAULT_CONVERTER: Lazy<Converter> = Lazy::new(Converter::default);

/// Get the factor to go from `key_original` to `key_target`
///
/// Uses the default [`Converter`]. See [`scale::resolve_factor`].
pub fn resolve_scale_factor(key_original: (f64, &str), key_target: (f64, &str)) -> f64 {
    scale::resolve_factor(key_original, key_target, &DEFAULT_CONVERTER).value()
}

/// Scale all the ingredients by `factor`
///
/// Uses the default [`Converter`] and [`ScaleOptions`]. See
/// [`scale::scale_ingredients`].
pub fn scale_recipe(ingredients: &[Ingredient], factor: f64) -> Vec<ConversionResult> {
    scale::scale_ingredients(
        ingredients,
        factor,
        &DEFAULT_CONVERTER,
        &ScaleOptions::default(),
    )
}
