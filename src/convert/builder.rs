use std::sync::Arc;

use enum_map::{enum_map, EnumMap};
use thiserror::Error;

use super::{
    convert_f64,
    units_file::{BestUnits, Extend, Precedence, SIPrefix, UnitEntry, Units, UnitsFile, SI},
    BestConversions, BestConversionsStore, Converter, PhysicalQuantity, System, Unit, UnitIndex,
    UnknownUnit,
};

/// Builder to create a custom [`Converter`]
///
/// Every [`UnitsFile`] added is a layer. A layer can declare new units, add
/// names to the units of a previous layer with `extend` or replace the best
/// units of a quantity.
///
/// ```
/// # use recipe_scaler::convert::ConverterBuilder;
/// let converter = ConverterBuilder::new()
///     .with_bundled_units()?
///     .with_units_toml(r#"
///         [extend.units]
///         g = { aliases = ["gr"] }
///     "#)?
///     .finish()?;
/// assert_eq!(converter.find_unit("gr").unwrap().symbol(), "g");
/// # Ok::<(), recipe_scaler::convert::ConverterBuilderError>(())
/// ```
#[derive(Debug, Default)]
pub struct ConverterBuilder {
    units: Vec<PendingUnit>,
    index: UnitIndex,
    extend: Vec<Extend>,
    si: SI,
    best_units: EnumMap<PhysicalQuantity, Option<BestUnits>>,
    default_system: System,
}

#[derive(Debug)]
struct PendingUnit {
    unit: Unit,
    /// Generated by SI expansion of another unit
    generated: bool,
    expand_si: bool,
    expansions: Option<EnumMap<SIPrefix, usize>>,
}

impl PendingUnit {
    fn declared(entry: UnitEntry, quantity: PhysicalQuantity, system: Option<System>) -> Self {
        Self {
            unit: Unit {
                names: entry.names,
                symbols: entry.symbols,
                aliases: entry.aliases,
                ratio: entry.ratio,
                difference: entry.difference,
                physical_quantity: quantity,
                system,
            },
            generated: false,
            expand_si: entry.expand_si,
            expansions: None,
        }
    }
}

impl std::ops::Deref for PendingUnit {
    type Target = Unit;

    fn deref(&self) -> &Self::Target {
        &self.unit
    }
}

impl std::ops::DerefMut for PendingUnit {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.unit
    }
}

impl ConverterBuilder {
    /// New empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the bundled units to the builder
    ///
    /// This is only available with the `bundled_units` feature.
    #[cfg(feature = "bundled_units")]
    pub fn with_bundled_units(self) -> Result<Self, ConverterBuilderError> {
        self.with_units_file(UnitsFile::bundled())
    }

    /// Parse a TOML [`UnitsFile`] and add it as a new layer
    pub fn with_units_toml(self, text: &str) -> Result<Self, ConverterBuilderError> {
        let file: UnitsFile = toml::from_str(text)?;
        self.with_units_file(file)
    }

    /// Add a [`UnitsFile`] to the builder
    pub fn with_units_file(mut self, units: UnitsFile) -> Result<Self, ConverterBuilderError> {
        self.add_units_file(units)?;
        Ok(self)
    }

    /// Add a [`UnitsFile`] to the builder
    #[tracing::instrument(level = "debug", skip_all, fields(groups = units.quantity.len()))]
    pub fn add_units_file(&mut self, units: UnitsFile) -> Result<&mut Self, ConverterBuilderError> {
        for group in units.quantity {
            let quantity = group.quantity;

            match group.units {
                Some(Units::Unified(entries)) => self.declare(entries, quantity, None)?,
                Some(Units::BySystem {
                    metric,
                    imperial,
                    unspecified,
                }) => {
                    self.declare(metric, quantity, Some(System::Metric))?;
                    self.declare(imperial, quantity, Some(System::Imperial))?;
                    self.declare(unspecified, quantity, None)?;
                }
                None => {}
            }

            if let Some(best) = group.best {
                let empty = match &best {
                    BestUnits::Unified(v) => v.is_empty(),
                    BestUnits::BySystem { metric, imperial } => {
                        metric.is_empty() || imperial.is_empty()
                    }
                };
                if empty {
                    return Err(ConverterBuilderError::EmptyBest {
                        reason: "empty list of units",
                        quantity,
                    });
                }
                self.best_units[quantity] = Some(best);
            }
        }

        // extensions are resolved in `finish`, after SI expansion
        if let Some(extend) = units.extend {
            self.extend.push(extend);
        }

        if let Some(si) = units.si {
            self.si.prefixes = join_prefixes(self.si.prefixes.take(), si.prefixes, si.precedence);
            self.si.symbol_prefixes = join_prefixes(
                self.si.symbol_prefixes.take(),
                si.symbol_prefixes,
                si.precedence,
            );
            self.si.precedence = si.precedence;
        }

        if let Some(system) = units.default_system {
            self.default_system = system;
        }

        Ok(self)
    }

    /// Consume the builder and return the new [`Converter`]
    pub fn finish(mut self) -> Result<Converter, ConverterBuilderError> {
        let declared = self.units.len();
        for id in 0..declared {
            if !self.units[id].expand_si {
                continue;
            }
            let mut ids = EnumMap::<SIPrefix, usize>::default();
            for (prefix, unit) in expand_si(&self.units[id], &self.si)? {
                ids[prefix] = self.push_unit(unit)?;
            }
            self.units[id].expansions = Some(ids);
        }

        for extend in std::mem::take(&mut self.extend) {
            apply_extend(extend, &mut self.units, &mut self.index, &self.si)?;
        }

        let mut best: EnumMap<PhysicalQuantity, BestConversionsStore> = EnumMap::default();
        for (quantity, slot) in best.iter_mut() {
            let Some(best_units) = &self.best_units[quantity] else {
                return Err(ConverterBuilderError::EmptyBest {
                    reason: "no best units given",
                    quantity,
                });
            };
            *slot = BestConversionsStore::new(best_units, quantity, &self.index, &self.units)?;
        }

        let units: Vec<Arc<Unit>> = self.units.into_iter().map(|u| Arc::new(u.unit)).collect();
        self.index.build_folded(&units);

        tracing::debug!(units = units.len(), "converter ready");

        Ok(Converter {
            all_units: units,
            unit_index: self.index,
            best,
            default_system: self.default_system,
        })
    }

    fn declare(
        &mut self,
        entries: Vec<UnitEntry>,
        quantity: PhysicalQuantity,
        system: Option<System>,
    ) -> Result<(), ConverterBuilderError> {
        for entry in entries {
            self.push_unit(PendingUnit::declared(entry, quantity, system))?;
        }
        Ok(())
    }

    fn push_unit(&mut self, unit: PendingUnit) -> Result<usize, ConverterBuilderError> {
        let id = self.units.len();
        self.index.insert_unit(&unit, id)?;
        self.units.push(unit);
        Ok(id)
    }
}

impl BestConversionsStore {
    fn new(
        best_units: &BestUnits,
        quantity: PhysicalQuantity,
        index: &UnitIndex,
        units: &[PendingUnit],
    ) -> Result<Self, ConverterBuilderError> {
        let conversions = |keys: &[String]| BestConversions::new(keys, quantity, index, units);
        let store = match best_units {
            BestUnits::Unified(keys) => Self::Unified(conversions(keys)?),
            BestUnits::BySystem { metric, imperial } => Self::BySystem {
                metric: conversions(metric)?,
                imperial: conversions(imperial)?,
            },
        };
        Ok(store)
    }
}

impl BestConversions {
    /// Sorts the units from smallest to largest and stores, for each one, the
    /// value in the smallest unit where it starts to be the best choice.
    fn new(
        keys: &[String],
        quantity: PhysicalQuantity,
        index: &UnitIndex,
        units: &[PendingUnit],
    ) -> Result<Self, ConverterBuilderError> {
        let mut ids = keys
            .iter()
            .map(|k| index.get_unit_id(k))
            .collect::<Result<Vec<_>, _>>()?;
        ids.sort_by(|&a, &b| units[a].ratio.total_cmp(&units[b].ratio));

        let Some(&base) = ids.first() else {
            return Err(ConverterBuilderError::EmptyBest {
                reason: "empty list of units",
                quantity,
            });
        };

        let thresholds = ids
            .into_iter()
            .map(|id| {
                let threshold = if id == base {
                    1.0
                } else {
                    convert_f64(1.0, &units[id], &units[base])
                };
                (threshold, id)
            })
            .collect();
        Ok(Self(thresholds))
    }
}

fn apply_extend(
    extend: Extend,
    units: &mut [PendingUnit],
    index: &mut UnitIndex,
    si: &SI,
) -> Result<(), ConverterBuilderError> {
    let Extend {
        precedence,
        units: entries,
    } = extend;

    // resolve every key before editing, so a layer can't see its own edits
    let mut resolved = Vec::with_capacity(entries.len());
    for (key, entry) in entries {
        let id = index.get_unit_id(&key)?;
        if resolved.iter().any(|&(other, _)| other == id) {
            return Err(ConverterBuilderError::DuplicateExtendUnit { key });
        }
        let touches_definition = entry.ratio.is_some()
            || entry.difference.is_some()
            || entry.names.is_some()
            || entry.symbols.is_some();
        if units[id].generated && touches_definition {
            return Err(ConverterBuilderError::InvalidExtendExpanded { key });
        }
        resolved.push((id, entry));
    }

    for (id, entry) in resolved {
        index.remove_recursive(units, id);

        let unit = &mut units[id];
        if let Some(ratio) = entry.ratio {
            unit.ratio = ratio;
        }
        if let Some(difference) = entry.difference {
            unit.difference = difference;
        }
        if let Some(names) = entry.names {
            join_keys(&mut unit.names, names, precedence);
        }
        if let Some(symbols) = entry.symbols {
            join_keys(&mut unit.symbols, symbols, precedence);
        }
        if let Some(aliases) = entry.aliases {
            join_keys(&mut unit.aliases, aliases, precedence);
        }

        if units[id].expansions.is_some() {
            regenerate_expansions(id, units, index, si)?;
        }
        index.insert_unit(&units[id], id)?;
    }
    Ok(())
}

fn regenerate_expansions(
    id: usize,
    units: &mut [PendingUnit],
    index: &mut UnitIndex,
    si: &SI,
) -> Result<(), ConverterBuilderError> {
    let Some(expansions) = units[id].expansions.clone() else {
        return Ok(());
    };
    for (prefix, fresh) in expand_si(&units[id], si)? {
        let target = expansions[prefix];
        // aliases of generated units come from extend layers, keep them
        let aliases = std::mem::take(&mut units[target].aliases);
        units[target] = fresh;
        units[target].aliases = aliases;
        index.insert_unit(&units[target], target)?;
    }
    Ok(())
}

fn join_keys(target: &mut Vec<Arc<str>>, mut src: Vec<Arc<str>>, precedence: Precedence) {
    match precedence {
        Precedence::Before => {
            src.append(target);
            *target = src;
        }
        Precedence::After => target.append(&mut src),
        Precedence::Override => *target = src,
    }
}

fn join_prefixes(
    current: Option<EnumMap<SIPrefix, Vec<String>>>,
    incoming: Option<EnumMap<SIPrefix, Vec<String>>>,
    precedence: Precedence,
) -> Option<EnumMap<SIPrefix, Vec<String>>> {
    match (current, incoming) {
        (None, None) => None,
        (None, Some(v)) | (Some(v), None) => Some(v),
        (Some(mut current), Some(mut incoming)) => match precedence {
            Precedence::Before => {
                for (p, v) in current {
                    incoming[p].extend(v);
                }
                Some(incoming)
            }
            Precedence::After => {
                for (p, v) in incoming {
                    current[p].extend(v);
                }
                Some(current)
            }
            Precedence::Override => Some(incoming),
        },
    }
}

fn expand_si(
    unit: &PendingUnit,
    si: &SI,
) -> Result<EnumMap<SIPrefix, PendingUnit>, ConverterBuilderError> {
    let (Some(prefixes), Some(symbol_prefixes)) = (&si.prefixes, &si.symbol_prefixes) else {
        return Err(ConverterBuilderError::EmptySIPrefixes);
    };

    let prefixed = |prefixes: &[String], keys: &[Arc<str>]| -> Vec<Arc<str>> {
        prefixes
            .iter()
            .flat_map(|p| keys.iter().map(move |k| Arc::from(format!("{p}{k}"))))
            .collect()
    };

    Ok(enum_map! {
        prefix => PendingUnit {
            unit: Unit {
                names: prefixed(&prefixes[prefix], &unit.names),
                symbols: prefixed(&symbol_prefixes[prefix], &unit.symbols),
                aliases: Vec::new(),
                ratio: unit.ratio * prefix.ratio(),
                difference: unit.difference,
                physical_quantity: unit.physical_quantity,
                system: unit.system,
            },
            generated: true,
            expand_si: false,
            expansions: None,
        }
    })
}

impl UnitIndex {
    fn remove_recursive(&mut self, units: &[PendingUnit], id: usize) {
        if let Some(expansions) = &units[id].expansions {
            for (_, &generated) in expansions {
                self.remove_recursive(units, generated);
            }
        }
        for key in units[id].all_keys() {
            self.exact.remove(key);
        }
    }

    fn insert_unit(&mut self, unit: &Unit, id: usize) -> Result<(), ConverterBuilderError> {
        let mut inserted = 0;
        for key in unit.all_keys() {
            if key.trim().is_empty() {
                return Err(ConverterBuilderError::EmptyUnitKey {
                    unit: unit.clone().into(),
                });
            }
            if self.exact.insert(Arc::clone(key), id).is_some() {
                return Err(ConverterBuilderError::DuplicateUnit {
                    name: key.to_string(),
                });
            }
            inserted += 1;
        }
        if inserted == 0 {
            return Err(ConverterBuilderError::EmptyUnit {
                unit: unit.clone().into(),
            });
        }
        Ok(())
    }

    /// Case insensitive keys. A folded key shared by two different units is
    /// ambiguous and left out.
    fn build_folded(&mut self, units: &[Arc<Unit>]) {
        use std::collections::hash_map::Entry;

        self.folded.clear();
        let mut ambiguous = Vec::new();
        for (id, unit) in units.iter().enumerate() {
            for key in unit.all_keys() {
                match self.folded.entry(key.to_lowercase()) {
                    Entry::Vacant(e) => {
                        e.insert(id);
                    }
                    Entry::Occupied(e) => {
                        if *e.get() != id {
                            ambiguous.push(e.key().clone());
                        }
                    }
                }
            }
        }
        for key in ambiguous {
            self.folded.remove(&key);
        }
    }
}

/// Errors generated by [`ConverterBuilder`]
#[derive(Debug, Error)]
pub enum ConverterBuilderError {
    #[error("Duplicate unit: {name}")]
    DuplicateUnit { name: String },

    #[error("Duplicate unit in extend, another key points to the same unit: {key}")]
    DuplicateExtendUnit { key: String },

    #[error("Can only edit aliases in auto expanded unit: {key}")]
    InvalidExtendExpanded { key: String },

    #[error(transparent)]
    UnknownUnit(#[from] UnknownUnit),

    #[error("Unit without names or symbols in {}", unit.physical_quantity)]
    EmptyUnit { unit: Box<Unit> },

    #[error("Unit with an empty name, symbol or alias in {}", unit.physical_quantity)]
    EmptyUnitKey { unit: Box<Unit> },

    #[error("Best units for '{quantity}' empty: {reason}")]
    EmptyBest {
        reason: &'static str,
        quantity: PhysicalQuantity,
    },

    #[error("No SI prefixes found when expanding SI on a unit")]
    EmptySIPrefixes,

    #[error("Invalid units file: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
        [si.prefixes]
        kilo = ["kilo"]
        hecto = ["hecto"]
        deca = ["deca"]
        deci = ["deci"]
        centi = ["centi"]
        milli = ["milli"]

        [si.symbol_prefixes]
        kilo = ["k"]
        hecto = ["h"]
        deca = ["da"]
        deci = ["d"]
        centi = ["c"]
        milli = ["m"]

        [[quantity]]
        quantity = "mass"
        best = ["g", "kg"]
        units = [{ names = ["gram"], symbols = ["g"], ratio = 1.0, expand_si = true }]

        [[quantity]]
        quantity = "volume"
        best = ["l"]
        units = [{ names = ["liter"], symbols = ["l"], ratio = 1.0 }]

        [[quantity]]
        quantity = "count"
        best = ["pc"]
        units = [{ names = ["piece"], symbols = ["pc"], ratio = 1.0 }]

        [[quantity]]
        quantity = "length"
        best = ["m"]
        units = [{ names = ["meter"], symbols = ["m"], ratio = 1.0 }]

        [[quantity]]
        quantity = "temperature"
        best = ["K"]
        units = [{ names = ["kelvin"], symbols = ["K"], ratio = 1.0 }]

        [[quantity]]
        quantity = "time"
        best = ["s"]
        units = [{ names = ["second"], symbols = ["s"], ratio = 1.0 }]
    "#;

    #[test]
    fn expands_si() {
        let converter = ConverterBuilder::new()
            .with_units_toml(BASE)
            .unwrap()
            .finish()
            .unwrap();
        let kg = converter.find_unit("kg").unwrap();
        assert_eq!(kg.ratio, 1000.0);
        assert_eq!(
            converter.find_unit("milligram").unwrap().symbol(),
            "mg"
        );
    }

    #[test]
    fn extend_adds_aliases() {
        let converter = ConverterBuilder::new()
            .with_units_toml(BASE)
            .unwrap()
            .with_units_toml(
                r#"
                [extend.units]
                kg = { aliases = ["kilo"] }
                "#,
            )
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(converter.find_unit("kilo").unwrap().symbol(), "kg");
    }

    #[test]
    fn extend_cannot_redefine_expanded() {
        let err = ConverterBuilder::new()
            .with_units_toml(BASE)
            .unwrap()
            .with_units_toml(
                r#"
                [extend.units]
                kg = { ratio = 2.0 }
                "#,
            )
            .unwrap()
            .finish()
            .unwrap_err();
        assert!(matches!(
            err,
            ConverterBuilderError::InvalidExtendExpanded { .. }
        ));
    }

    #[test]
    fn duplicate_key() {
        let err = ConverterBuilder::new()
            .with_units_toml(BASE)
            .unwrap()
            .with_units_toml(
                r#"
                [[quantity]]
                quantity = "volume"
                units = [{ names = ["gram"], symbols = ["x"], ratio = 1.0 }]
                "#,
            )
            .unwrap_err();
        assert!(matches!(err, ConverterBuilderError::DuplicateUnit { .. }));
    }

    #[test]
    fn missing_best_units() {
        let err = ConverterBuilder::new()
            .with_units_toml(
                r#"
                [[quantity]]
                quantity = "mass"
                units = [{ names = ["gram"], symbols = ["g"], ratio = 1.0 }]
                "#,
            )
            .unwrap()
            .finish()
            .unwrap_err();
        assert!(matches!(err, ConverterBuilderError::EmptyBest { .. }));
    }

    #[test]
    fn invalid_toml() {
        let err = ConverterBuilder::new()
            .with_units_toml("quantity = 3")
            .unwrap_err();
        assert!(matches!(err, ConverterBuilderError::Toml(_)));
    }
}
