use std::collections::HashSet;

use crate::power::PowerSet;
use crate::rng::{RangeError, SeededRng};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Location {
    pub name: String,
    pub id: i32,
    /// Alternative requirement sets; any single satisfied one opens the
    /// location.
    pub requirements: Vec<PowerSet>,
}

impl Location {
    pub fn is_open(&self, current: PowerSet) -> bool {
        self.requirements.iter().any(|req| current.contains(*req))
    }
}

#[derive(Clone, Debug, Default)]
pub struct LocationCatalog {
    locations: Vec<Location>,
}

impl LocationCatalog {
    pub(crate) fn from_locations(locations: Vec<Location>) -> Self {
        LocationCatalog { locations }
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Location> {
        self.locations.iter().find(|loc| loc.name == name)
    }

    pub fn id_of(&self, name: &str) -> Option<i32> {
        self.get(name).map(|loc| loc.id)
    }

    /// Name to id pairs in load order.
    pub fn ids(&self) -> Vec<(String, i32)> {
        self.locations
            .iter()
            .map(|loc| (loc.name.clone(), loc.id))
            .collect()
    }

    pub fn reachable(&self, current: PowerSet, placed: &HashSet<String>) -> Vec<&str> {
        self.locations
            .iter()
            .filter(|loc| loc.is_open(current) && !placed.contains(&loc.name))
            .map(|loc| loc.name.as_str())
            .collect()
    }

    pub fn draw_random(
        &self,
        rng: &mut SeededRng,
        candidates: &[&str],
    ) -> Result<Option<String>, RangeError> {
        Ok(rng.pick(candidates)?.map(|name| name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SWIM: PowerSet = PowerSet::from_bits(0b01);
    const DASH: PowerSet = PowerSet::from_bits(0b10);

    fn catalog() -> LocationCatalog {
        LocationCatalog::from_locations(vec![
            Location { name: "Shore".into(), id: 1, requirements: vec![PowerSet::empty()] },
            Location { name: "Reef".into(), id: 2, requirements: vec![SWIM] },
            Location { name: "Cliff".into(), id: 3, requirements: vec![SWIM | DASH] },
            Location { name: "Cave".into(), id: 4, requirements: vec![SWIM, DASH] },
            Location { name: "Sealed".into(), id: 5, requirements: vec![] },
        ])
    }

    #[test]
    fn empty_requirement_is_always_open() {
        let locs = catalog();
        let placed = HashSet::new();
        assert_eq!(locs.reachable(PowerSet::empty(), &placed), vec!["Shore"]);
    }

    #[test]
    fn any_alternative_opens_a_location() {
        let locs = catalog();
        let placed = HashSet::new();
        assert_eq!(locs.reachable(DASH, &placed), vec!["Shore", "Cave"]);
        assert_eq!(locs.reachable(SWIM, &placed), vec!["Shore", "Reef", "Cave"]);
        assert_eq!(
            locs.reachable(SWIM | DASH, &placed),
            vec!["Shore", "Reef", "Cliff", "Cave"]
        );
    }

    #[test]
    fn no_alternatives_never_opens() {
        let locs = catalog();
        let sealed = locs.get("Sealed").unwrap();
        assert!(!sealed.is_open(PowerSet::from_bits(u64::MAX)));
    }

    #[test]
    fn placed_locations_are_excluded() {
        let locs = catalog();
        let mut placed = HashSet::new();
        placed.insert("Shore".to_string());
        placed.insert("Reef".to_string());
        assert_eq!(locs.reachable(SWIM, &placed), vec!["Cave"]);
    }

    #[test]
    fn ids_pass_through() {
        let locs = catalog();
        assert_eq!(locs.id_of("Cliff"), Some(3));
        assert_eq!(locs.id_of("Nowhere"), None);
        assert_eq!(locs.ids()[0], ("Shore".to_string(), 1));
        assert_eq!(locs.ids().len(), 5);
    }

    #[test]
    fn draw_picks_a_candidate() {
        let locs = catalog();
        let mut rng = SeededRng::new(3);
        let candidates = ["Reef", "Cave"];
        for _ in 0..20 {
            let name = locs.draw_random(&mut rng, &candidates).unwrap().unwrap();
            assert!(candidates.contains(&name.as_str()));
        }
        assert_eq!(locs.draw_random(&mut rng, &[]).unwrap(), None);
    }
}
