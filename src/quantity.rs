//! Quantity model

use std::{fmt::Display, sync::Arc};

use serde::{Serialize, Serializer};

use crate::convert::{ConvertError, Converter, PhysicalQuantity, System, Unit};

/// A magnitude measured in a known [`Unit`]
///
/// Quantities are only created from units the [`Converter`] recognizes, see
/// [`Converter::parse`]. Free text units never become a [`Quantity`].
///
/// The [`Display`] implementation rounds the value to 3 decimal places.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quantity {
    value: f64,
    #[serde(serialize_with = "unit_symbol")]
    unit: Arc<Unit>,
}

fn unit_symbol<S: Serializer>(unit: &Arc<Unit>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(unit.symbol())
}

impl Quantity {
    /// Creates a new quantity
    pub fn new(value: f64, unit: Arc<Unit>) -> Self {
        Self { value, unit }
    }

    /// Magnitude in [`Self::unit`]
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> &Arc<Unit> {
        &self.unit
    }

    pub fn physical_quantity(&self) -> PhysicalQuantity {
        self.unit.physical_quantity
    }

    /// Multiplies the magnitude, keeping the unit
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            value: self.value * factor,
            unit: Arc::clone(&self.unit),
        }
    }

    /// Checks if both quantities can be converted into each other
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.physical_quantity() == other.physical_quantity()
    }

    /// Converts the quantity to another known unit
    pub fn convert_to(
        &self,
        unit: &Arc<Unit>,
        converter: &Converter,
    ) -> Result<Self, ConvertError> {
        let value = converter.convert_to_unit(self.value, &self.unit, unit)?;
        Ok(Self::new(value, Arc::clone(unit)))
    }

    /// Re-expresses the quantity in the best unit of the same system.
    ///
    /// For example, `1500 g` would be `1.5 kg` and `0.25 l` would be `250 ml`.
    /// Zero stays in its unit.
    #[tracing::instrument(level = "trace", skip_all, fields(quantity = %self))]
    pub fn fit(&self, converter: &Converter) -> Result<Self, ConvertError> {
        self.fit_to(None, converter)
    }

    /// Same as [`Self::fit`] but choosing units of `system`.
    pub fn fit_to(
        &self,
        system: Option<System>,
        converter: &Converter,
    ) -> Result<Self, ConvertError> {
        if self.value == 0.0 {
            return Ok(self.clone());
        }
        let (value, unit) = converter.convert_to_best(self.value, &self.unit, system)?;
        Ok(Self::new(value, unit))
    }
}

impl Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", round_to(self.value, 3), self.unit)
    }
}

/// Round to the given number of decimal places
///
/// ```
/// # use recipe_scaler::quantity::round_to;
/// assert_eq!(round_to(2.0 / 3.0, 3), 0.667);
/// assert_eq!(round_to(1.0005, 0), 1.0);
/// ```
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let exp = i32::try_from(decimals).unwrap_or(i32::MAX);
    let p = 10f64.powi(exp);
    let rounded = (value * p).round() / p;
    // huge values or decimals overflow, those are already as precise as they get
    if rounded.is_finite() {
        rounded
    } else {
        value
    }
}
