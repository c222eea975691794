use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

pub mod data;
pub mod engine;
pub mod items;
pub mod locations;
pub mod power;
pub mod rng;
pub mod spoiler;

pub use data::{Catalog, CatalogError, Difficulty};
pub use engine::{EngineState, Placement, Randomiser, RunState, RunSummary, StepOutcome, StepReport};
pub use power::{Power, PowerLattice, PowerSet, PowerValue};
pub use rng::{RangeError, SeededRng, DEFAULT_STREAM};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomiserSettings {
    pub seed: u64,
    /// PCG stream id; `None` uses [`DEFAULT_STREAM`].
    pub stream: Option<u64>,
    pub difficulty: Difficulty,
    /// Stalled runs are retried with fresh seeds up to this many times.
    pub max_attempts: usize,
    pub debug: bool,
    pub data_path: PathBuf,
    pub output_path: PathBuf,
}

impl Default for RandomiserSettings {
    fn default() -> Self {
        RandomiserSettings {
            seed: 0,
            stream: None,
            difficulty: Difficulty::default(),
            max_attempts: 1,
            debug: false,
            data_path: PathBuf::from("."),
            output_path: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RandomiserError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to load catalog: {0}")]
    Catalog(#[from] CatalogError),
    #[error("invalid random range: {0}")]
    Range(#[from] RangeError),
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RandomiserError>;

/// Result of a whole randomisation: the best attempt and how it was found.
#[derive(Debug, Clone)]
pub struct RandomiserOutcome {
    pub summary: RunSummary,
    pub attempts: usize,
    /// Per-step trace of the returned attempt; filled only in debug mode.
    pub trace: Vec<String>,
}

impl RandomiserOutcome {
    pub fn is_complete(&self) -> bool {
        self.summary.is_complete()
    }
}

/// Stream that derives retry seeds from the configured seed.
const ATTEMPT_STREAM: u64 = 0x4B45_5953;

/// Seeds tried in order: the configured seed first, then derived ones.
fn attempt_seeds(seed: u64) -> impl Iterator<Item = u64> {
    let mut rng = SeededRng::with_stream(seed, ATTEMPT_STREAM);
    std::iter::once(seed).chain(std::iter::repeat_with(move || u64::from(rng.next_uint())))
}

/// Run attempts against an already loaded catalog until one places every
/// location. When all attempts stall, the attempt with the most placements
/// is returned.
pub fn randomise(catalog: &Catalog, settings: &RandomiserSettings) -> Result<RandomiserOutcome> {
    if settings.max_attempts == 0 {
        return Err(RandomiserError::Config(
            "max_attempts must be at least 1".to_string(),
        ));
    }
    let stream = settings.stream.unwrap_or(DEFAULT_STREAM);

    let mut best: Option<RandomiserOutcome> = None;
    for (idx, seed) in attempt_seeds(settings.seed)
        .take(settings.max_attempts)
        .enumerate()
    {
        let attempt = idx + 1;
        let mut trace = Vec::new();
        let summary = Randomiser::with_rng(catalog, SeededRng::with_stream(seed, stream))
            .run_with(|report| {
                if settings.debug {
                    trace.push(spoiler::format_step(report, &catalog.lattice));
                }
            })?;

        if summary.is_complete() {
            info!(
                "Attempt {attempt}/{}: seed {seed} placed all {} locations in {} steps",
                settings.max_attempts,
                summary.placements.len(),
                summary.steps
            );
            return Ok(RandomiserOutcome {
                summary,
                attempts: attempt,
                trace,
            });
        }

        info!(
            "Attempt {attempt}/{}: seed {seed} stalled ({:?}) with {} unplaced locations and {} unused items",
            settings.max_attempts,
            summary.terminal,
            summary.unplaced_locations.len(),
            summary.unused_items.len()
        );

        let better = best
            .as_ref()
            .map_or(true, |b| summary.placements.len() > b.summary.placements.len());
        if better {
            best = Some(RandomiserOutcome {
                summary,
                attempts: attempt,
                trace,
            });
        }
    }

    let mut outcome = best.ok_or_else(|| RandomiserError::Config("no attempts were made".to_string()))?;
    outcome.attempts = settings.max_attempts;
    warn!(
        "Exhausted {} randomisation attempts; keeping seed {} with {} of {} locations placed",
        settings.max_attempts,
        outcome.summary.seed,
        outcome.summary.placements.len(),
        catalog.locations.len()
    );
    Ok(outcome)
}

/// Load the ruleset, randomise, and write the outputs into a per-seed
/// folder under `output_path`. Returns the outcome and that folder.
pub fn run(settings: RandomiserSettings) -> Result<(RandomiserOutcome, PathBuf)> {
    if !settings.data_path.exists() {
        return Err(RandomiserError::Config(format!(
            "Data path does not exist: {}",
            settings.data_path.display()
        )));
    }

    info!(
        "Generating seed {} ({} difficulty)",
        settings.seed, settings.difficulty
    );
    let catalog = Catalog::load(&settings.data_path, settings.difficulty)?;
    let outcome = randomise(&catalog, &settings)?;

    // One folder per seed so repeated runs do not overwrite each other.
    let out_root = settings
        .output_path
        .join(format!("Keystone_{}", settings.seed));
    fs::create_dir_all(&out_root)?;

    fs::write(
        out_root.join("placements.json"),
        spoiler::placements_json(&outcome.summary)?,
    )?;
    fs::write(
        out_root.join("spoiler_log.txt"),
        spoiler::spoiler_log(
            &settings,
            &catalog,
            &outcome.summary,
            outcome.attempts,
            &outcome.trace,
        ),
    )?;

    if settings.debug {
        fs::write(out_root.join("items.log"), spoiler::item_dump(&catalog))?;
        fs::write(out_root.join("locations.log"), spoiler::location_dump(&catalog))?;
    }

    Ok((outcome, out_root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const POWERS: &str = r#"["Swim", "Dash"]"#;
    const ITEMS: &str = r#"[
        { "name": "Flippers", "powers": "Swim" },
        { "name": "Boots", "powers": "Dash" },
        { "name": "Potion" }
    ]"#;
    const LOCATIONS: &str = r#"[
        { "name": "Shore", "id": 1, "requiredPowers": ["None"] },
        { "name": "Reef", "id": 2, "requiredPowers": ["Swim"] },
        { "name": "Ledge", "id": 3, "requiredPowers": ["Swim | Dash"] }
    ]"#;

    fn write_ruleset(dir: &Path, difficulty: Difficulty) {
        let logic = dir.join("logic");
        fs::create_dir_all(&logic).unwrap();
        fs::write(dir.join(data::POWERS_FILE), POWERS).unwrap();
        fs::write(dir.join(difficulty.item_file()), ITEMS).unwrap();
        fs::write(dir.join(difficulty.location_file()), LOCATIONS).unwrap();
    }

    #[test]
    fn attempt_seeds_start_with_configured_seed() {
        let seeds: Vec<u64> = attempt_seeds(42).take(4).collect();
        assert_eq!(seeds, vec![42, 171922725, 3058585063, 2254968971]);
        let seeds: Vec<u64> = attempt_seeds(0).take(3).collect();
        assert_eq!(seeds, vec![0, 320424081, 987031705]);
    }

    #[test]
    fn zero_attempts_is_a_config_error() {
        let catalog = Catalog::default();
        let settings = RandomiserSettings {
            max_attempts: 0,
            ..RandomiserSettings::default()
        };
        assert!(matches!(
            randomise(&catalog, &settings),
            Err(RandomiserError::Config(_))
        ));
    }

    #[test]
    fn stalled_runs_use_every_attempt() {
        // "Reef" needs Swim but nothing grants it: every seed stalls.
        let catalog = Catalog::from_json_strs(
            POWERS,
            r#"[{ "name": "Potion" }, { "name": "Ether" }]"#,
            LOCATIONS,
        )
        .unwrap();
        let settings = RandomiserSettings {
            seed: 5,
            max_attempts: 3,
            ..RandomiserSettings::default()
        };
        let outcome = randomise(&catalog, &settings).unwrap();
        assert!(!outcome.is_complete());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.summary.terminal, EngineState::ItemsExhausted);
    }

    #[test]
    fn complete_run_stops_at_first_attempt() {
        let catalog = Catalog::from_json_strs(POWERS, ITEMS, LOCATIONS).unwrap();
        let settings = RandomiserSettings {
            seed: 42,
            max_attempts: 10,
            debug: true,
            ..RandomiserSettings::default()
        };
        let outcome = randomise(&catalog, &settings).unwrap();
        assert!(outcome.is_complete());
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.summary.seed, 42);
        assert_eq!(outcome.trace.len(), outcome.summary.steps);
    }

    #[test]
    fn stream_changes_the_placement_sequence() {
        let items: Vec<String> = (0..10).map(|i| format!(r#"{{ "name": "i{i}" }}"#)).collect();
        let locations: Vec<String> = (0..10)
            .map(|i| format!(r#"{{ "name": "l{i}", "id": {i}, "requiredPowers": [0] }}"#))
            .collect();
        let catalog = Catalog::from_json_strs(
            "[]",
            &format!("[{}]", items.join(",")),
            &format!("[{}]", locations.join(",")),
        )
        .unwrap();

        let base = RandomiserSettings {
            seed: 42,
            ..RandomiserSettings::default()
        };
        let other = RandomiserSettings {
            stream: Some(54),
            ..base.clone()
        };
        let a = randomise(&catalog, &base).unwrap();
        let b = randomise(&catalog, &other).unwrap();
        let a2 = randomise(&catalog, &base).unwrap();
        assert_eq!(a.summary.placements, a2.summary.placements);
        assert_ne!(a.summary.placements, b.summary.placements);
    }

    #[test]
    fn run_writes_outputs() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_ruleset(data.path(), Difficulty::Hard);

        let settings = RandomiserSettings {
            seed: 1234,
            difficulty: Difficulty::Hard,
            max_attempts: 5,
            debug: true,
            data_path: data.path().to_path_buf(),
            output_path: out.path().to_path_buf(),
            ..RandomiserSettings::default()
        };
        let (outcome, folder) = run(settings).unwrap();
        assert!(outcome.is_complete());
        assert_eq!(folder, out.path().join("Keystone_1234"));

        let placements: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(folder.join("placements.json")).unwrap())
                .unwrap();
        assert_eq!(placements.as_array().unwrap().len(), 3);

        let log = fs::read_to_string(folder.join("spoiler_log.txt")).unwrap();
        assert!(log.starts_with("Keystone seed: 1234\nDifficulty: Hard\n"));
        assert!(folder.join("items.log").exists());
        assert!(folder.join("locations.log").exists());
    }

    #[test]
    fn run_reports_missing_data() {
        let out = tempfile::tempdir().unwrap();
        let settings = RandomiserSettings {
            data_path: out.path().join("missing"),
            ..RandomiserSettings::default()
        };
        assert!(matches!(run(settings), Err(RandomiserError::Config(_))));

        let empty = tempfile::tempdir().unwrap();
        let settings = RandomiserSettings {
            data_path: empty.path().to_path_buf(),
            output_path: out.path().to_path_buf(),
            ..RandomiserSettings::default()
        };
        assert!(matches!(run(settings), Err(RandomiserError::Catalog(_))));
    }

    #[test]
    fn demo_rulesets_complete() {
        let demos = Path::new(env!("CARGO_MANIFEST_DIR")).join("../demos");
        for difficulty in [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard] {
            let catalog = Catalog::load(&demos, difficulty).unwrap();
            for seed in 0..20 {
                let summary = Randomiser::new(&catalog, seed).run().unwrap();
                assert!(summary.is_complete(), "{difficulty} seed {seed} stalled");
            }
        }
    }

    #[test]
    fn settings_round_trip_through_json() {
        let settings: RandomiserSettings =
            serde_json::from_str(r#"{ "seed": 9, "difficulty": "normal", "max_attempts": 4 }"#)
                .unwrap();
        assert_eq!(settings.seed, 9);
        assert_eq!(settings.difficulty, Difficulty::Normal);
        assert_eq!(settings.max_attempts, 4);
        assert_eq!(settings.stream, None);
    }
}
