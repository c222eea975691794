use log::debug;
use serde::Serialize;
use std::collections::HashSet;

use crate::data::Catalog;
use crate::power::PowerSet;
use crate::rng::{RangeError, SeededRng};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum EngineState {
    Ready,
    /// No unplaced location is reachable with the powers held.
    LocationsExhausted,
    /// A location was open but no unused item matched the gating policy.
    ItemsExhausted,
}

impl EngineState {
    pub fn is_terminal(self) -> bool {
        self != EngineState::Ready
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Placement {
    pub location: String,
    pub item: String,
}

/// Mutable state of one run. Powers and placements only ever grow.
#[derive(Clone, Debug, Default)]
pub struct RunState {
    pub powers: PowerSet,
    pub used_items: HashSet<String>,
    pub placements: Vec<Placement>,
    placed_locations: HashSet<String>,
}

impl RunState {
    pub fn placed_locations(&self) -> &HashSet<String> {
        &self.placed_locations
    }

    fn commit(&mut self, location: String, item: String, powers: PowerSet) {
        self.placed_locations.insert(location.clone());
        self.placements.push(Placement { location, item });
        self.powers = powers;
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StepOutcome {
    Placed {
        location: String,
        item: String,
        powers: PowerSet,
    },
    LocationsExhausted,
    /// The drawn location is handed back uncommitted.
    ItemsExhausted {
        location: String,
    },
}

/// One step plus the candidate counts it saw, for diagnostics.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StepReport {
    pub outcome: StepOutcome,
    pub reachable: usize,
    pub eligible: usize,
}

/// What a finished run hands to its caller.
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub seed: u64,
    pub placements: Vec<Placement>,
    pub location_ids: Vec<(String, i32)>,
    pub powers: PowerSet,
    pub steps: usize,
    pub terminal: EngineState,
    pub unplaced_locations: Vec<String>,
    pub unused_items: Vec<String>,
}

impl RunSummary {
    /// Every location received an item.
    pub fn is_complete(&self) -> bool {
        self.unplaced_locations.is_empty()
    }
}

/// Places one item per step until a pool runs dry.
pub struct Randomiser<'a> {
    catalog: &'a Catalog,
    rng: SeededRng,
    state: RunState,
    engine_state: EngineState,
    stalled_at: Option<String>,
    steps: usize,
}

impl<'a> Randomiser<'a> {
    pub fn new(catalog: &'a Catalog, seed: u64) -> Self {
        Self::with_rng(catalog, SeededRng::new(seed))
    }

    pub fn with_rng(catalog: &'a Catalog, rng: SeededRng) -> Self {
        Randomiser {
            catalog,
            rng,
            state: RunState::default(),
            engine_state: EngineState::Ready,
            stalled_at: None,
            steps: 0,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn engine_state(&self) -> EngineState {
        self.engine_state
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    pub fn step(&mut self) -> Result<StepReport, RangeError> {
        match self.engine_state {
            EngineState::LocationsExhausted => {
                return Ok(StepReport {
                    outcome: StepOutcome::LocationsExhausted,
                    reachable: 0,
                    eligible: 0,
                })
            }
            EngineState::ItemsExhausted => {
                // Nothing changed since the stall, so every query would repeat.
                return Ok(StepReport {
                    outcome: StepOutcome::ItemsExhausted {
                        location: self.stalled_at.clone().unwrap_or_default(),
                    },
                    reachable: self
                        .catalog
                        .locations
                        .reachable(self.state.powers, &self.state.placed_locations)
                        .len(),
                    eligible: 0,
                });
            }
            EngineState::Ready => {}
        }
        self.steps += 1;

        let catalog = self.catalog;
        let reachable = catalog
            .locations
            .reachable(self.state.powers, &self.state.placed_locations);
        debug!(
            "step {}: {} reachable locations: {}",
            self.steps,
            reachable.len(),
            reachable.join(", ")
        );

        let Some(location) = catalog.locations.draw_random(&mut self.rng, &reachable)? else {
            debug!(
                "step {}: no locations left, {} placed",
                self.steps,
                self.state.placements.len()
            );
            self.engine_state = EngineState::LocationsExhausted;
            return Ok(StepReport {
                outcome: StepOutcome::LocationsExhausted,
                reachable: 0,
                eligible: 0,
            });
        };

        let wanting = catalog.lattice.lowest_missing(self.state.powers);
        let candidates = catalog.items.eligible_items(&self.state.used_items, wanting);
        debug!(
            "step {}: {} eligible items (wanting {}): {}",
            self.steps,
            candidates.len(),
            wanting
                .and_then(|p| catalog.lattice.name(p))
                .unwrap_or("anything"),
            candidates.join(", ")
        );

        let drawn = catalog.items.draw_random(
            &mut self.rng,
            &candidates,
            &mut self.state.used_items,
            self.state.powers,
        )?;
        let Some((item, powers)) = drawn else {
            debug!(
                "step {}: no items left for {location}, {} placed",
                self.steps,
                self.state.placements.len()
            );
            self.engine_state = EngineState::ItemsExhausted;
            self.stalled_at = Some(location.clone());
            return Ok(StepReport {
                outcome: StepOutcome::ItemsExhausted { location },
                reachable: reachable.len(),
                eligible: 0,
            });
        };

        debug!(
            "step {}: {location} <- {item} (powers now {})",
            self.steps,
            catalog.lattice.describe(powers)
        );
        self.state.commit(location.clone(), item.clone(), powers);

        Ok(StepReport {
            outcome: StepOutcome::Placed {
                location,
                item,
                powers,
            },
            reachable: reachable.len(),
            eligible: candidates.len(),
        })
    }

    /// Step until a terminal state. `on_step` sees every report, including
    /// the final one.
    pub fn run_with<F>(mut self, mut on_step: F) -> Result<RunSummary, RangeError>
    where
        F: FnMut(&StepReport),
    {
        // Each placing step consumes one item, so this bound is never hit.
        let max_steps = self.catalog.items.len() + self.catalog.locations.len() + 1;
        while !self.engine_state.is_terminal() && self.steps < max_steps {
            let report = self.step()?;
            on_step(&report);
        }
        Ok(self.finish())
    }

    pub fn run(self) -> Result<RunSummary, RangeError> {
        self.run_with(|_| {})
    }

    pub fn finish(self) -> RunSummary {
        let catalog = self.catalog;
        let unplaced_locations = catalog
            .locations
            .iter()
            .filter(|loc| !self.state.placed_locations.contains(&loc.name))
            .map(|loc| loc.name.clone())
            .collect();
        let unused_items = catalog
            .items
            .iter()
            .filter(|item| !self.state.used_items.contains(&item.name))
            .map(|item| item.name.clone())
            .collect();

        RunSummary {
            seed: self.rng.seed(),
            placements: self.state.placements,
            location_ids: catalog.locations.ids(),
            powers: self.state.powers,
            steps: self.steps,
            terminal: self.engine_state,
            unplaced_locations,
            unused_items,
        }
    }
}
