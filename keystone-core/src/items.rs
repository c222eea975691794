use std::collections::HashSet;

use crate::power::{Power, PowerSet};
use crate::rng::{RangeError, SeededRng};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Item {
    pub name: String,
    pub grants: PowerSet,
}

/// Items in load order. Load order fixes candidate order, which in turn
/// fixes which item a given random index selects.
#[derive(Clone, Debug, Default)]
pub struct ItemCatalog {
    items: Vec<Item>,
}

impl ItemCatalog {
    pub(crate) fn from_items(items: Vec<Item>) -> Self {
        ItemCatalog { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.name == name)
    }

    /// Unused items granting `wanting`. With nothing left to want, every
    /// unused item qualifies.
    pub fn eligible_items(&self, used: &HashSet<String>, wanting: Option<Power>) -> Vec<&str> {
        self.items
            .iter()
            .filter(|item| !used.contains(&item.name))
            .filter(|item| wanting.map_or(true, |power| item.grants.has(power)))
            .map(|item| item.name.as_str())
            .collect()
    }

    /// Draw one candidate, mark it used, and return it with the power set
    /// the run would hold after collecting it.
    pub fn draw_random(
        &self,
        rng: &mut SeededRng,
        candidates: &[&str],
        used: &mut HashSet<String>,
        current: PowerSet,
    ) -> Result<Option<(String, PowerSet)>, RangeError> {
        let Some(&name) = rng.pick(candidates)? else {
            return Ok(None);
        };
        let grants = self.get(name).map_or(PowerSet::empty(), |item| item.grants);
        used.insert(name.to_string());
        Ok(Some((name.to_string(), current | grants)))
    }
}
