use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::data::CatalogError;

/// Largest number of powers a ruleset can declare.
pub const MAX_POWERS: usize = 64;

/// A single power, identified by its ordinal in the lattice.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Power(u8);

impl Power {
    pub fn ordinal(self) -> usize {
        self.0 as usize
    }

    pub fn bit(self) -> u64 {
        1u64 << self.0
    }
}

/// A combination of powers packed into one 64-bit mask.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PowerSet(u64);

impl PowerSet {
    pub const fn empty() -> Self {
        PowerSet(0)
    }

    pub const fn from_bits(bits: u64) -> Self {
        PowerSet(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Has-all test: true when every bit of `other` is also set here. The
    /// empty set is contained in everything.
    pub const fn contains(self, other: PowerSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn has(self, power: Power) -> bool {
        self.0 & power.bit() != 0
    }

    pub fn insert(&mut self, power: Power) {
        self.0 |= power.bit();
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }
}

impl From<Power> for PowerSet {
    fn from(power: Power) -> Self {
        PowerSet(power.bit())
    }
}

impl BitOr for PowerSet {
    type Output = PowerSet;

    fn bitor(self, rhs: PowerSet) -> PowerSet {
        PowerSet(self.0 | rhs.0)
    }
}

impl BitOrAssign for PowerSet {
    fn bitor_assign(&mut self, rhs: PowerSet) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for PowerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// How a power combination is written in the data files.
///
/// `3`, `"Swim | Dash"`, `"Swim, Dash"`, `["Swim", "Dash"]` and `"None"`
/// are all accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PowerValue {
    Mask(u64),
    Text(String),
    Names(Vec<String>),
}

impl Default for PowerValue {
    fn default() -> Self {
        PowerValue::Mask(0)
    }
}

/// The ordered set of powers for one ruleset. Declaration order is the
/// canonical unlock order: the power at ordinal `i` owns bit `1 << i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PowerLattice {
    names: Vec<String>,
}

impl PowerLattice {
    pub fn new<I, S>(names: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut lattice = PowerLattice { names: Vec::new() };
        for name in names {
            let name = name.into();
            let trimmed = name.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
                return Err(CatalogError::ReservedPowerName(name));
            }
            if lattice.names.iter().any(|n| n == trimmed) {
                return Err(CatalogError::DuplicatePower(trimmed.to_string()));
            }
            if lattice.names.len() == MAX_POWERS {
                return Err(CatalogError::TooManyPowers(MAX_POWERS));
            }
            lattice.names.push(trimmed.to_string());
        }
        Ok(lattice)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn power(&self, name: &str) -> Option<Power> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| Power(idx as u8))
    }

    pub fn name(&self, power: Power) -> Option<&str> {
        self.names.get(power.ordinal()).map(String::as_str)
    }

    /// Powers in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = Power> + '_ {
        (0..self.names.len()).map(|idx| Power(idx as u8))
    }

    pub fn all(&self) -> PowerSet {
        self.iter().fold(PowerSet::empty(), |acc, p| acc | PowerSet::from(p))
    }

    /// First power, in canonical order, that `current` does not hold.
    pub fn lowest_missing(&self, current: PowerSet) -> Option<Power> {
        self.iter().find(|&p| !current.has(p))
    }

    /// Render a set as `A | B`, or `None` when empty.
    pub fn describe(&self, set: PowerSet) -> String {
        let names: Vec<&str> = self
            .iter()
            .filter(|&p| set.has(p))
            .filter_map(|p| self.name(p))
            .collect();
        if names.is_empty() {
            "None".to_string()
        } else {
            names.join(" | ")
        }
    }

    pub fn resolve(&self, value: &PowerValue) -> Result<PowerSet, CatalogError> {
        match value {
            PowerValue::Mask(bits) => {
                let stray = bits & !self.all().bits();
                if stray != 0 {
                    return Err(CatalogError::UnknownPowerBits(stray));
                }
                Ok(PowerSet::from_bits(*bits))
            }
            PowerValue::Text(text) => self.resolve_names(text.split(['|', ','])),
            PowerValue::Names(names) => self.resolve_names(names.iter().map(String::as_str)),
        }
    }

    fn resolve_names<'a, I>(&self, names: I) -> Result<PowerSet, CatalogError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut set = PowerSet::empty();
        for raw in names {
            let name = raw.trim();
            if name.is_empty() || name.eq_ignore_ascii_case("none") {
                continue;
            }
            let power = self
                .power(name)
                .ok_or_else(|| CatalogError::UnknownPower(name.to_string()))?;
            set.insert(power);
        }
        Ok(set)
    }
}
