//! Units vocabulary files
//!
//! A [`Converter`](super::Converter) learns which unit strings a recipe may
//! use from one or more of these files, given as layers to
//! [`ConverterBuilder`](super::ConverterBuilder). The bundled `units.toml` is
//! the usual first layer.

use enum_map::EnumMap;
use serde::Deserialize;
use std::{collections::HashMap, fmt::Debug, sync::Arc};

use super::{PhysicalQuantity, System};

/// One layer of the units vocabulary
///
/// Usually read from TOML. A small user layer that only adds regional names
/// for bundled units looks like this:
///
/// ```
/// # use recipe_scaler::convert::UnitsFile;
/// let layer: UnitsFile = toml::from_str(r#"
/// [extend.units]
/// g = { aliases = ["gr"] }
/// "#).unwrap();
/// assert!(layer.quantity.is_empty());
/// ```
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct UnitsFile {
    /// System whose best units are used to fit a scaled amount when its unit
    /// has no system (kelvin, seconds, pieces...)
    pub default_system: Option<System>,
    /// Prefixes to generate `kilogram`, `ml` and so on from a base unit.
    ///
    /// Needed in some layer if any unit sets [`UnitEntry::expand_si`].
    pub si: Option<SI>,
    /// Changes to units declared by earlier layers
    pub extend: Option<Extend>,
    /// Units grouped by what they measure
    #[serde(default)]
    pub quantity: Vec<QuantityGroup>,
}

/// Metric prefixes of a layer
///
/// Name prefixes apply to [`UnitEntry::names`] and symbol prefixes to
/// [`UnitEntry::symbols`]. Several spellings per prefix are allowed, as in
/// `milli = ["milli"]` and `milli = ["m"]`.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SI {
    pub prefixes: Option<EnumMap<SIPrefix, Vec<String>>>,
    pub symbol_prefixes: Option<EnumMap<SIPrefix, Vec<String>>>,
    /// How these lists combine with the ones of earlier layers
    #[serde(default)]
    pub precedence: Precedence,
}

/// Metric prefixes common in kitchen units
#[derive(
    Debug, Deserialize, Clone, Copy, strum::Display, strum::AsRefStr, enum_map::Enum, PartialEq,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum SIPrefix {
    Kilo,
    Hecto,
    Deca,
    Deci,
    Centi,
    Milli,
}

impl SIPrefix {
    /// Multiplier applied to the base unit ratio
    ///
    /// ```
    /// # use recipe_scaler::convert::units_file::SIPrefix;
    /// assert_eq!(SIPrefix::Milli.ratio(), 0.001);
    /// ```
    pub fn ratio(&self) -> f64 {
        match self {
            SIPrefix::Kilo => 1e3,
            SIPrefix::Hecto => 1e2,
            SIPrefix::Deca => 1e1,
            SIPrefix::Deci => 1e-1,
            SIPrefix::Centi => 1e-2,
            SIPrefix::Milli => 1e-3,
        }
    }
}

/// Edits to units of earlier layers
///
/// Keys are any name, symbol or alias of the unit to edit, so `cup`, `cups`
/// and `c` all point to the same unit. Two keys of the same unit in one layer
/// are an error.
#[derive(Debug, Default, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Extend {
    pub precedence: Precedence,
    pub units: HashMap<String, ExtendUnitEntry>,
}

/// How a list from a new layer joins the existing one
///
/// The first symbol is what [`UnitStyle::Symbol`](crate::UnitStyle::Symbol)
/// prints, so `before` is how a layer changes the displayed symbol.
#[derive(Debug, Default, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Precedence {
    /// New entries go first
    #[default]
    Before,
    /// New entries go last
    After,
    /// New entries replace the old ones
    Override,
}

/// Fields of a unit that a later layer can change
///
/// Units generated from an SI prefix only accept `aliases`.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ExtendUnitEntry {
    pub ratio: Option<f64>,
    pub difference: Option<f64>,
    #[serde(alias = "name")]
    pub names: Option<Vec<Arc<str>>>,
    #[serde(alias = "symbol")]
    pub symbols: Option<Vec<Arc<str>>>,
    #[serde(alias = "alias")]
    pub aliases: Option<Vec<Arc<str>>>,
}

/// Units that measure the same [`PhysicalQuantity`]
///
/// Only units in the same group can be converted into each other, so `g`
/// and `ml` never are.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct QuantityGroup {
    pub quantity: PhysicalQuantity,
    /// Candidates when fitting a scaled amount, like `["mg", "g", "kg"]`
    ///
    /// Some layer must give them for every quantity. A later layer replaces
    /// them completely.
    #[serde(default)]
    pub best: Option<BestUnits>,
    #[serde(default)]
    pub units: Option<Units>,
}

/// Best fit candidates, for every system or one list per system
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged, deny_unknown_fields)]
pub enum BestUnits {
    Unified(Vec<String>),
    BySystem {
        metric: Vec<String>,
        imperial: Vec<String>,
    },
}

/// Unit declarations of a group
///
/// Units under `metric` or `imperial` are fitted within their own system,
/// so doubled cups never turn into liters.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged, deny_unknown_fields)]
pub enum Units {
    Unified(Vec<UnitEntry>),
    BySystem {
        #[serde(default)]
        metric: Vec<UnitEntry>,
        #[serde(default)]
        imperial: Vec<UnitEntry>,
        /// Units without a system, like kelvin
        #[serde(default)]
        unspecified: Vec<UnitEntry>,
    },
}

/// A unit as written in the file
///
/// `ratio` and `difference` take a value to the base of the group:
/// `(value + difference) * ratio`. With liters as base, a cup has a ratio of
/// `0.2365882365`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct UnitEntry {
    /// Full names, singular and plural: `["cup", "cups"]`
    #[serde(alias = "name")]
    pub names: Vec<Arc<str>>,
    /// Abbreviations, the first one is the display symbol
    #[serde(alias = "symbol")]
    pub symbols: Vec<Arc<str>>,
    /// Other accepted spellings. Not SI expanded.
    #[serde(default, alias = "alias")]
    pub aliases: Vec<Arc<str>>,
    pub ratio: f64,
    /// Offset for temperature scales
    #[serde(default)]
    pub difference: f64,
    /// Also declare the prefixed units, `gram` gives `kilogram`, `mg`...
    #[serde(default)]
    pub expand_si: bool,
}

#[cfg(feature = "bundled_units")]
impl UnitsFile {
    /// The units vocabulary shipped with the crate
    ///
    /// This is only available with the `bundled_units` feature.
    pub fn bundled() -> Self {
        toml::from_str(BUNDLED_TOML).expect("bundled units file is valid")
    }
}

#[cfg(feature = "bundled_units")]
const BUNDLED_TOML: &str = include_str!("../../units.toml");

#[cfg(all(test, feature = "bundled_units"))]
mod tests {
    use super::*;

    #[test]
    fn bundled_parses() {
        let file = UnitsFile::bundled();
        assert_eq!(file.default_system, Some(System::Metric));
        let quantities: Vec<_> = file.quantity.iter().map(|g| g.quantity).collect();
        for q in [
            PhysicalQuantity::Volume,
            PhysicalQuantity::Mass,
            PhysicalQuantity::Count,
        ] {
            assert!(quantities.contains(&q), "missing {q}");
        }
    }

    #[test]
    fn every_group_has_best_units() {
        let file = UnitsFile::bundled();
        assert!(file.quantity.iter().all(|g| g.best.is_some()));
    }

    #[test]
    fn kitchen_units_by_system() {
        let file = UnitsFile::bundled();
        let volume = file
            .quantity
            .iter()
            .find(|g| g.quantity == PhysicalQuantity::Volume)
            .unwrap();
        let Some(Units::BySystem {
            metric, imperial, ..
        }) = &volume.units
        else {
            panic!("volume units should be split by system");
        };
        assert!(metric.iter().any(|u| u.expand_si));
        assert!(imperial
            .iter()
            .any(|u| u.names.iter().any(|n| n.as_ref() == "cup")));
    }
}
