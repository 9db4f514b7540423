//! Unit vocabulary and conversions
//!
//! This includes:
//! - A layered configuration system ([`UnitsFile`] + [`ConverterBuilder`])
//! - Recognition of unit names, symbols and aliases
//! - Conversions between units of the same [`PhysicalQuantity`]
//! - Conversions to the best fit unit of a system

use std::{collections::HashMap, sync::Arc};

use enum_map::EnumMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::quantity::Quantity;

pub use builder::{ConverterBuilder, ConverterBuilderError};
pub use units_file::UnitsFile;

mod builder;
pub mod units_file;

/// Main struct to recognize units and perform conversions
///
/// This holds information about all the known units and how to convert them.
///
/// To create one use [`Converter::builder`].
///
/// [`Converter::default`] changes with the feature `bundled_units`:
/// - When enabled, [`Converter::bundled`].
/// - When disabled, [`Converter::empty`].
#[derive(Debug, Clone)]
pub struct Converter {
    all_units: Vec<Arc<Unit>>,
    unit_index: UnitIndex,
    best: EnumMap<PhysicalQuantity, BestConversionsStore>,
    default_system: System,
}

impl Converter {
    /// Start to create a new [Converter]
    pub fn builder() -> ConverterBuilder {
        ConverterBuilder::new()
    }

    /// Empty converter
    ///
    /// Every unit is unknown to it, so every scaling done with it takes the
    /// unitless path.
    pub fn empty() -> Self {
        Self {
            all_units: Default::default(),
            unit_index: Default::default(),
            best: Default::default(),
            default_system: Default::default(),
        }
    }

    /// Converter with the bundled units
    ///
    /// The most common units for recipes in English: metric and US customary
    /// volumes and masses, counts, lengths, temperatures and times.
    ///
    /// This is only available when the `bundled_units` feature is enabled.
    #[cfg(feature = "bundled_units")]
    pub fn bundled() -> Self {
        ConverterBuilder::new()
            .with_bundled_units()
            .and_then(ConverterBuilder::finish)
            .expect("bundled units are valid")
    }

    /// Get the default unit [System]
    pub fn default_system(&self) -> System {
        self.default_system
    }

    /// Get the total number of known units.
    ///
    /// This is **not** all the known unit names, just **different units**.
    pub fn unit_count(&self) -> usize {
        self.all_units.len()
    }

    /// Get an iterator of all the known units.
    pub fn all_units(&self) -> impl Iterator<Item = &Unit> {
        self.all_units.iter().map(|u| u.as_ref())
    }

    /// Find a unit by any of it's names, symbols or aliases
    ///
    /// Surrounding whitespace is ignored. If there is no exact match, a case
    /// insensitive one is tried, unless it's ambiguous (`C` is celsius but
    /// `c` is a cup).
    pub fn find_unit(&self, unit: &str) -> Option<Arc<Unit>> {
        let uid = self.unit_index.lookup(unit)?;
        Some(Arc::clone(&self.all_units[uid]))
    }

    /// Creates a [`Quantity`] if the unit is known
    ///
    /// ```
    /// # use recipe_scaler::Converter;
    /// let converter = Converter::bundled();
    /// let q = converter.parse(2.0, "cups").unwrap();
    /// assert_eq!(q.unit().symbol(), "c");
    /// assert!(converter.parse(1.0, "pinch").is_err());
    /// assert!(converter.parse(1.0, "").is_err());
    /// ```
    pub fn parse(&self, value: f64, unit: &str) -> Result<Quantity, ConvertError> {
        let known = self
            .find_unit(unit)
            .ok_or_else(|| UnknownUnit(unit.to_string()))?;
        Ok(Quantity::new(value, known))
    }

    /// Converts a quantity to the unit named by `to`
    ///
    /// Fails if `to` is unknown or measures another [`PhysicalQuantity`].
    #[tracing::instrument(level = "trace", skip(self), fields(from = %quantity), ret, err)]
    pub fn convert_quantity(
        &self,
        quantity: &Quantity,
        to: &str,
    ) -> Result<Quantity, ConvertError> {
        let target = self
            .find_unit(to)
            .ok_or_else(|| UnknownUnit(to.to_string()))?;
        let value = self.convert_to_unit(quantity.value(), quantity.unit(), &target)?;
        Ok(Quantity::new(value, target))
    }

    /// Check if two unit strings are known and measure the same thing
    pub fn are_compatible(&self, a: &str, b: &str) -> bool {
        match (self.find_unit(a), self.find_unit(b)) {
            (Some(a), Some(b)) => a.physical_quantity == b.physical_quantity,
            _ => false,
        }
    }

    pub(crate) fn convert_to_unit(
        &self,
        value: f64,
        unit: &Unit,
        target: &Unit,
    ) -> Result<f64, ConvertError> {
        if unit.physical_quantity != target.physical_quantity {
            return Err(ConvertError::MixedQuantities {
                from: unit.physical_quantity,
                to: target.physical_quantity,
            });
        }
        Ok(convert_f64(value, unit, target))
    }

    /// Best unit of the same quantity in `system`, or the unit's own system
    /// when it has one.
    pub(crate) fn convert_to_best(
        &self,
        value: f64,
        unit: &Unit,
        system: Option<System>,
    ) -> Result<(f64, Arc<Unit>), ConvertError> {
        let system = system.or(unit.system).unwrap_or(self.default_system);
        let conversions = self.best[unit.physical_quantity].conversions(system);

        let best_unit = conversions.best_unit(self, value, unit).ok_or(
            ConvertError::BestUnitNotFound {
                physical_quantity: unit.physical_quantity,
                system: unit.system,
            },
        )?;
        let converted = convert_f64(value, unit, &best_unit);
        Ok((converted, best_unit))
    }
}

#[cfg(not(feature = "bundled_units"))]
impl Default for Converter {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(feature = "bundled_units")]
impl Default for Converter {
    fn default() -> Self {
        Self::bundled()
    }
}

impl PartialEq for Converter {
    fn eq(&self, other: &Self) -> bool {
        self.all_units == other.all_units
            && self.unit_index == other.unit_index
            && self.best == other.best
            && self.default_system == other.default_system
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct UnitIndex {
    exact: HashMap<Arc<str>, usize>,
    folded: HashMap<String, usize>,
}

impl UnitIndex {
    fn get_unit_id(&self, key: &str) -> Result<usize, UnknownUnit> {
        self.exact
            .get(key)
            .copied()
            .ok_or_else(|| UnknownUnit(key.to_string()))
    }

    fn lookup(&self, key: &str) -> Option<usize> {
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        self.exact
            .get(key)
            .or_else(|| self.folded.get(&key.to_lowercase()))
            .copied()
    }
}

/// A unit
///
/// Conversion will be `(val + difference) * ratio` to the quantity base.
///
/// It implements [Display](std::fmt::Display). It will use [`Self::symbol`] or,
/// if alternate (`#`) is given, it will try the first name.
#[derive(Debug, Clone, Serialize)]
pub struct Unit {
    /// All the names that may be used to format the unit
    pub names: Vec<Arc<str>>,
    /// All the symbols (abbreviations), like `ml` for `millilitres`
    pub symbols: Vec<Arc<str>>,
    /// Custom aliases to parse the unit from a different string
    pub aliases: Vec<Arc<str>>,
    /// Conversion ratio
    pub ratio: f64,
    /// Difference offset to the conversion ratio
    pub difference: f64,
    /// The [`PhysicalQuantity`] this unit belongs to
    pub physical_quantity: PhysicalQuantity,
    /// The unit [System] this unit belongs to, if any
    pub system: Option<System>,
}

impl Unit {
    fn all_keys(&self) -> impl Iterator<Item = &Arc<str>> {
        self.names.iter().chain(&self.symbols).chain(&self.aliases)
    }

    /// Get the symbol that represent this unit. The process is:
    /// - First symbol (if any)
    /// - Or first name (if any)
    /// - Or first alias
    ///
    /// The builder rejects units without any of them.
    pub fn symbol(&self) -> &str {
        self.symbols
            .first()
            .or_else(|| self.names.first())
            .or_else(|| self.aliases.first())
            .map(|s| s.as_ref())
            .unwrap_or_default()
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names
            && self.symbols == other.symbols
            && self.aliases == other.aliases
            && self.ratio == other.ratio
            && self.difference == other.difference
            && self.physical_quantity == other.physical_quantity
            && self.system == other.system
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if f.alternate() && !self.names.is_empty() {
            write!(f, "{}", self.names[0])
        } else {
            write!(f, "{}", self.symbol())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum BestConversionsStore {
    Unified(BestConversions),
    BySystem {
        metric: BestConversions,
        imperial: BestConversions,
    },
}

impl BestConversionsStore {
    fn conversions(&self, system: System) -> &BestConversions {
        match self {
            BestConversionsStore::Unified(u) => u,
            BestConversionsStore::BySystem { metric, imperial } => match system {
                System::Metric => metric,
                System::Imperial => imperial,
            },
        }
    }
}

impl Default for BestConversionsStore {
    fn default() -> Self {
        Self::Unified(Default::default())
    }
}

/// `(threshold in base unit, unit id)`, sorted by threshold
#[derive(Debug, Clone, Default, PartialEq)]
struct BestConversions(Vec<(f64, usize)>);

impl BestConversions {
    fn best_unit(&self, converter: &Converter, value: f64, unit: &Unit) -> Option<Arc<Unit>> {
        let &(_, base_id) = self.0.first()?;
        let base_unit = &converter.all_units[base_id];
        let norm = convert_f64(value.abs(), unit, base_unit);

        let best_id = self
            .0
            .iter()
            .rev()
            .find(|(threshold, _)| norm >= (threshold - 0.001))
            .or_else(|| self.0.first())
            .map(|&(_, id)| id)?;
        Some(Arc::clone(&converter.all_units[best_id]))
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    enum_map::Enum,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum PhysicalQuantity {
    Volume,
    Mass,
    Count,
    Length,
    Temperature,
    Time,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    Default,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    enum_map::Enum,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum System {
    #[default]
    Metric,
    Imperial,
}

pub(crate) fn convert_f64(value: f64, from: &Unit, to: &Unit) -> f64 {
    if std::ptr::eq(from, to) {
        return value;
    }
    let norm = (value + from.difference) * from.ratio;
    (norm / to.ratio) - to.difference
}

/// Error when try to convert an unknown unit
#[derive(Debug, Error, Clone, PartialEq)]
#[error("Unknown unit: '{0}'")]
pub struct UnknownUnit(pub String);

/// Errors from converting
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConvertError {
    #[error("Mixed physical quantities: {from} {to}")]
    MixedQuantities {
        from: PhysicalQuantity,
        to: PhysicalQuantity,
    },

    #[error("Could not find best unit for a {physical_quantity} unit. System: {system:?}")]
    BestUnitNotFound {
        physical_quantity: PhysicalQuantity,
        system: Option<System>,
    },

    #[error(transparent)]
    UnknownUnit(#[from] UnknownUnit),
}

#[cfg(all(test, feature = "bundled_units"))]
mod tests {
    use super::*;

    #[test]
    fn kilograms_to_grams() {
        let converter = Converter::bundled();
        let kg = converter.parse(1.5, "kg").unwrap();
        let g = converter.convert_quantity(&kg, "g").unwrap();
        assert!((g.value() - 1500.0).abs() < 1e-9);
        assert_eq!(g.unit().symbol(), "g");
    }

    #[test]
    fn liter_to_milliliters() {
        let converter = Converter::bundled();
        let l = converter.parse(1.0, "liter").unwrap();
        let ml = converter.convert_quantity(&l, "ml").unwrap();
        assert!((ml.value() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn fahrenheit_to_celsius() {
        let converter = Converter::bundled();
        let f = converter.parse(212.0, "°F").unwrap();
        let c = converter.convert_quantity(&f, "°C").unwrap();
        assert!((c.value() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn mixed_quantities() {
        let converter = Converter::bundled();
        let g = converter.parse(100.0, "g").unwrap();
        let err = converter.convert_quantity(&g, "ml").unwrap_err();
        assert_eq!(
            err,
            ConvertError::MixedQuantities {
                from: PhysicalQuantity::Mass,
                to: PhysicalQuantity::Volume
            }
        );
    }

    #[test]
    fn unknown_target() {
        let converter = Converter::bundled();
        let g = converter.parse(100.0, "g").unwrap();
        let err = converter.convert_quantity(&g, "handful").unwrap_err();
        assert!(matches!(err, ConvertError::UnknownUnit(_)));
    }

    #[test]
    fn lookup_is_forgiving() {
        let converter = Converter::bundled();
        assert_eq!(converter.find_unit(" Cups ").unwrap().symbol(), "c");
        assert_eq!(converter.find_unit("KG").unwrap().symbol(), "kg");
        assert_eq!(converter.find_unit("C").unwrap().symbol(), "°C");
        assert_eq!(converter.find_unit("c").unwrap().symbol(), "c");
        assert!(converter.find_unit("   ").is_none());
    }

    #[test]
    fn compatibility() {
        let converter = Converter::bundled();
        assert!(converter.are_compatible("g", "lb"));
        assert!(converter.are_compatible("cups", "ml"));
        assert!(!converter.are_compatible("g", "ml"));
        assert!(!converter.are_compatible("g", "pinch"));
    }

    #[test]
    fn default_is_bundled() {
        assert_eq!(Converter::default(), Converter::bundled());
    }

    #[test]
    fn empty_knows_nothing() {
        let converter = Converter::empty();
        assert_eq!(converter.unit_count(), 0);
        assert!(converter.parse(1.0, "g").is_err());
    }
}
