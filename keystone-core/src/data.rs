use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::items::{Item, ItemCatalog};
use crate::locations::{Location, LocationCatalog};
use crate::power::{PowerLattice, PowerValue};

/// Errors raised while reading a ruleset from disk.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("power '{0}' is declared more than once")]
    DuplicatePower(String),

    #[error("'{0}' cannot be used as a power name")]
    ReservedPowerName(String),

    #[error("a ruleset can declare at most {0} powers")]
    TooManyPowers(usize),

    #[error("unknown power '{0}'")]
    UnknownPower(String),

    #[error("power mask has bits outside the declared powers: {0:#x}")]
    UnknownPowerBits(u64),

    #[error("item '{0}' is defined more than once")]
    DuplicateItem(String),

    #[error("location '{0}' is defined more than once")]
    DuplicateLocation(String),

    #[error("{kind} '{name}': {source}")]
    Record {
        kind: &'static str,
        name: String,
        #[source]
        source: Box<CatalogError>,
    },
}

/// Which parallel set of data files a run uses.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    /// `1` is easy, `2` normal, anything else hard.
    pub fn from_tier(tier: i64) -> Self {
        match tier {
            1 => Difficulty::Easy,
            2 => Difficulty::Normal,
            _ => Difficulty::Hard,
        }
    }

    pub fn tier(self) -> u8 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Normal => 2,
            Difficulty::Hard => 3,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        }
    }

    pub fn item_file(self) -> String {
        format!("logic/items_{}.json", self.suffix())
    }

    pub fn location_file(self) -> String {
        format!("logic/locations_{}.json", self.suffix())
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
        };
        f.write_str(name)
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(tier) = s.parse::<i64>() {
            return Ok(Difficulty::from_tier(tier));
        }
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "normal" => Ok(Difficulty::Normal),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{other}' (expected easy, normal, hard or 1-3)")),
        }
    }
}

pub const POWERS_FILE: &str = "logic/powers.json";

#[derive(Debug, Clone, Deserialize)]
pub struct ItemRecord {
    pub name: String,
    #[serde(default)]
    pub powers: PowerValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationRecord {
    pub name: String,
    pub id: i32,
    #[serde(rename = "requiredPowers", alias = "required_powers", default)]
    pub required_powers: Vec<PowerValue>,
}

/// Everything a run reads but never changes.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub lattice: PowerLattice,
    pub items: ItemCatalog,
    pub locations: LocationCatalog,
}

impl Catalog {
    pub fn from_records(
        lattice: PowerLattice,
        items: Vec<ItemRecord>,
        locations: Vec<LocationRecord>,
    ) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        let mut resolved_items = Vec::with_capacity(items.len());
        for record in items {
            if !seen.insert(record.name.clone()) {
                return Err(CatalogError::DuplicateItem(record.name));
            }
            let grants = lattice
                .resolve(&record.powers)
                .map_err(|e| record_error("item", &record.name, e))?;
            resolved_items.push(Item {
                name: record.name,
                grants,
            });
        }

        let mut seen = HashSet::new();
        let mut resolved_locations = Vec::with_capacity(locations.len());
        for record in locations {
            if !seen.insert(record.name.clone()) {
                return Err(CatalogError::DuplicateLocation(record.name));
            }
            if record.required_powers.is_empty() {
                warn!(
                    "location '{}' has no requirement alternatives and can never be reached",
                    record.name
                );
            }
            let requirements = record
                .required_powers
                .iter()
                .map(|value| lattice.resolve(value))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| record_error("location", &record.name, e))?;
            resolved_locations.push(Location {
                name: record.name,
                id: record.id,
                requirements,
            });
        }

        Ok(Catalog {
            lattice,
            items: ItemCatalog::from_items(resolved_items),
            locations: LocationCatalog::from_locations(resolved_locations),
        })
    }

    pub fn from_json_strs(powers: &str, items: &str, locations: &str) -> Result<Self, CatalogError> {
        let lattice = PowerLattice::new(parse_json::<Vec<String>>(Path::new(POWERS_FILE), powers)?)?;
        let items = parse_json(Path::new("items"), items)?;
        let locations = parse_json(Path::new("locations"), locations)?;
        Catalog::from_records(lattice, items, locations)
    }

    /// Load the ruleset under `base` for one difficulty tier.
    pub fn load(base: &Path, difficulty: Difficulty) -> Result<Self, CatalogError> {
        let powers_path = base.join(POWERS_FILE);
        let item_path = base.join(difficulty.item_file());
        let location_path = base.join(difficulty.location_file());

        let names: Vec<String> = read_json(&powers_path)?;
        let lattice = PowerLattice::new(names)?;
        let items: Vec<ItemRecord> = read_json(&item_path)?;
        let locations: Vec<LocationRecord> = read_json(&location_path)?;

        let catalog = Catalog::from_records(lattice, items, locations)?;
        info!(
            "loaded {} powers, {} items, {} locations ({} difficulty)",
            catalog.lattice.len(),
            catalog.items.len(),
            catalog.locations.len(),
            difficulty
        );
        Ok(catalog)
    }
}

fn record_error(kind: &'static str, name: &str, source: CatalogError) -> CatalogError {
    CatalogError::Record {
        kind,
        name: name.to_string(),
        source: Box::new(source),
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(path: &Path, text: &str) -> Result<T, CatalogError> {
    serde_json::from_str(text).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let text = fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_json(path, &text)
}
