use serde::Serialize;

use crate::data::Catalog;
use crate::engine::{RunSummary, StepOutcome, StepReport};
use crate::power::PowerLattice;
use crate::RandomiserSettings;

#[derive(Debug, Clone, Serialize)]
pub struct PlacementRecord<'a> {
    pub location: &'a str,
    pub location_id: Option<i32>,
    pub item: &'a str,
}

pub fn placement_records(summary: &RunSummary) -> Vec<PlacementRecord<'_>> {
    summary
        .placements
        .iter()
        .map(|p| PlacementRecord {
            location: &p.location,
            location_id: summary
                .location_ids
                .iter()
                .find(|(name, _)| *name == p.location)
                .map(|(_, id)| *id),
            item: &p.item,
        })
        .collect()
}

pub fn placements_json(summary: &RunSummary) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&placement_records(summary))
}

pub fn format_step(report: &StepReport, lattice: &PowerLattice) -> String {
    match &report.outcome {
        StepOutcome::Placed {
            location,
            item,
            powers,
        } => format!(
            "reachable: {} eligible: {} | {} <- {} | powers: {}",
            report.reachable,
            report.eligible,
            location,
            item,
            lattice.describe(*powers)
        ),
        StepOutcome::LocationsExhausted => "no locations left".to_string(),
        StepOutcome::ItemsExhausted { location } => format!(
            "reachable: {} | no items left for {}",
            report.reachable, location
        ),
    }
}

pub fn spoiler_log(
    settings: &RandomiserSettings,
    catalog: &Catalog,
    summary: &RunSummary,
    attempts: usize,
    trace: &[String],
) -> String {
    let mut log = format!("Keystone seed: {}\n", settings.seed);
    log.push_str(&format!("Difficulty: {}\n", settings.difficulty));
    log.push_str(&format!(
        "Attempts: {} (placement seed {})\n",
        attempts, summary.seed
    ));
    log.push_str(&format!(
        "Result: {} ({:?} after {} steps)\n",
        if summary.is_complete() { "complete" } else { "stalled" },
        summary.terminal,
        summary.steps
    ));
    log.push_str(&format!(
        "Final powers: {}\n",
        catalog.lattice.describe(summary.powers)
    ));
    log.push_str(&format!(
        "Placed {} of {} locations, {} of {} items\n",
        summary.placements.len(),
        catalog.locations.len(),
        catalog.items.len() - summary.unused_items.len(),
        catalog.items.len()
    ));

    log.push_str("\nPlacements:\n");
    for record in placement_records(summary) {
        match record.location_id {
            Some(id) => log.push_str(&format!("  [{}] {}: {}\n", id, record.location, record.item)),
            None => log.push_str(&format!("  {}: {}\n", record.location, record.item)),
        }
    }

    if !summary.unplaced_locations.is_empty() {
        log.push_str("\nUnplaced locations:\n");
        for name in &summary.unplaced_locations {
            log.push_str(&format!("  {}\n", name));
        }
    }

    if !summary.unused_items.is_empty() {
        log.push_str("\nUnused items:\n");
        for name in &summary.unused_items {
            log.push_str(&format!("  {}\n", name));
        }
    }

    if !trace.is_empty() {
        log.push_str("\nSteps:\n");
        for (idx, line) in trace.iter().enumerate() {
            log.push_str(&format!("  {:>4}: {}\n", idx + 1, line));
        }
    }

    log
}

pub fn item_dump(catalog: &Catalog) -> String {
    let mut out = String::from("Items:\n");
    for item in catalog.items.iter() {
        out.push_str("\n=== New Item ===\n");
        out.push_str(&format!("Item Name: {}\n", item.name));
        out.push_str(&format!(
            "Granted Powers: {}\n",
            catalog.lattice.describe(item.grants)
        ));
        out.push_str("=== End Item ===\n");
    }
    out
}

pub fn location_dump(catalog: &Catalog) -> String {
    let mut out = String::from("Locations:\n");
    for location in catalog.locations.iter() {
        out.push_str("\n=== New Location ===\n");
        out.push_str(&format!("Location: {} (id {})\n", location.name, location.id));
        for req in &location.requirements {
            out.push_str(&format!(
                "Required Powers: {}\n",
                catalog.lattice.describe(*req)
            ));
        }
        out.push_str("=== End Location ===\n");
    }
    out
}
