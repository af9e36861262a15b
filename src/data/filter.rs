use std::fmt;

use log::{info, warn};

use super::geometry::{within_any, ReferenceRange};
use super::model::{Datasets, LargePadStationNames, PermitIndex, PopulatedSystem};
use crate::config::HuntConfig;
use crate::error::DataIntegrityError;

/// Allegiance reserved for player-owned systems; never a candidate.
pub const EXCLUDED_ALLEGIANCE: &str = "Pilots Federation";

// ---------------------------------------------------------------------------
// Predicates – pure functions over a single system
// ---------------------------------------------------------------------------

pub fn is_not_excluded_allegiance(system: &PopulatedSystem) -> bool {
    system.allegiance != EXCLUDED_ALLEGIANCE
}

pub fn meets_population(system: &PopulatedSystem, minimum: u64) -> bool {
    system.population >= minimum
}

/// Systems without faction data pass.
pub fn free_of_player_factions(system: &PopulatedSystem) -> bool {
    system
        .factions
        .as_deref()
        .map_or(true, |fs| !fs.iter().any(|f| f.is_player))
}

/// Systems without faction data pass.
pub fn factions_within_limit(system: &PopulatedSystem, faction_max: usize) -> bool {
    system.factions.is_none() || system.active_faction_count() <= faction_max
}

/// At least one station appears in the large-pad catalog.
pub fn has_large_pad(system: &PopulatedSystem, large_pads: &LargePadStationNames) -> bool {
    system
        .stations
        .as_deref()
        .unwrap_or_default()
        .iter()
        .any(|s| large_pads.contains(&s.name))
}

/// `Ok(true)` when the system is known and needs no permit. A system missing
/// from the index is an integrity error, never a pass.
pub fn needs_no_permit(
    system: &PopulatedSystem,
    permits: &PermitIndex,
) -> Result<bool, DataIntegrityError> {
    permits
        .get(system.id)
        .map(|record| !record.needs_permit)
        .ok_or_else(|| DataIntegrityError::MissingPermitRecord {
            id: system.id,
            name: system.name.clone(),
        })
}

// ---------------------------------------------------------------------------
// Stage – one named step of the chain
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    WithinRange(Vec<ReferenceRange>),
    NotExcludedAllegiance,
    MinPopulation(u64),
    NoPlayerFactions,
    FactionCeiling(usize),
    LargePad,
    NoPermit,
}

/// Result of evaluating one stage against one system.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Keep,
    Drop,
    Invalid(DataIntegrityError),
}

impl From<bool> for Verdict {
    fn from(keep: bool) -> Self {
        if keep { Verdict::Keep } else { Verdict::Drop }
    }
}

/// Auxiliary data the stages look systems up in.
#[derive(Debug, Clone, Copy)]
pub struct Lookups<'a> {
    pub permits: &'a PermitIndex,
    pub large_pads: &'a LargePadStationNames,
}

impl<'a> From<&'a Datasets> for Lookups<'a> {
    fn from(ds: &'a Datasets) -> Self {
        Lookups {
            permits: &ds.permits,
            large_pads: &ds.large_pads,
        }
    }
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::WithinRange(_) => "range",
            Stage::NotExcludedAllegiance => "allegiance",
            Stage::MinPopulation(_) => "population",
            Stage::NoPlayerFactions => "player-factions",
            Stage::FactionCeiling(_) => "faction-count",
            Stage::LargePad => "large-pad",
            Stage::NoPermit => "permit",
        }
    }

    pub fn evaluate(&self, system: &PopulatedSystem, lookups: Lookups<'_>) -> Verdict {
        match self {
            Stage::WithinRange(refs) => within_any(system, refs).into(),
            Stage::NotExcludedAllegiance => is_not_excluded_allegiance(system).into(),
            Stage::MinPopulation(min) => meets_population(system, *min).into(),
            Stage::NoPlayerFactions => free_of_player_factions(system).into(),
            Stage::FactionCeiling(max) => factions_within_limit(system, *max).into(),
            Stage::LargePad => has_large_pad(system, lookups.large_pads).into(),
            Stage::NoPermit => match needs_no_permit(system, lookups.permits) {
                Ok(keep) => keep.into(),
                Err(e) => Verdict::Invalid(e),
            },
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::WithinRange(refs) => {
                let parts: Vec<String> = refs
                    .iter()
                    .map(|r| format!("{} Ly of {}", r.max_distance, r.point.name))
                    .collect();
                write!(f, "systems within {}", parts.join(" or "))
            }
            Stage::NotExcludedAllegiance => write!(f, "out {EXCLUDED_ALLEGIANCE} systems"),
            Stage::MinPopulation(min) => write!(f, "systems with at least {min} population"),
            Stage::NoPlayerFactions => write!(f, "out systems with player factions"),
            Stage::FactionCeiling(max) => write!(f, "systems with at most {max} active factions"),
            Stage::LargePad => write!(f, "out systems without large landing pads"),
            Stage::NoPermit => write!(f, "out systems requiring permits"),
        }
    }
}

// ---------------------------------------------------------------------------
// FilterChain
// ---------------------------------------------------------------------------

/// Number of systems left after a stage ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCount {
    pub stage: &'static str,
    pub remaining: usize,
}

#[derive(Debug, Clone)]
pub struct FilterOutcome<'a> {
    /// Survivors, in input order.
    pub systems: Vec<&'a PopulatedSystem>,
    pub counts: Vec<StageCount>,
    pub issues: Vec<DataIntegrityError>,
}

/// Ordered conjunction of stages.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterChain {
    stages: Vec<Stage>,
}

impl FilterChain {
    /// The standard chain for a configuration. Optional faction stages are
    /// only present when enabled.
    pub fn from_config(config: &HuntConfig) -> Self {
        let prefs = &config.preferences;
        let mut stages = vec![
            Stage::WithinRange(config.reference_ranges()),
            Stage::NotExcludedAllegiance,
            Stage::MinPopulation(prefs.population),
        ];
        if prefs.exclude_player_factions {
            stages.push(Stage::NoPlayerFactions);
        }
        if prefs.limit_faction_count {
            stages.push(Stage::FactionCeiling(prefs.faction_max));
        }
        stages.push(Stage::LargePad);
        stages.push(Stage::NoPermit);
        FilterChain { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run every stage in order. A system rejected by one stage is never
    /// seen by later ones.
    pub fn run<'a>(
        &self,
        systems: &'a [PopulatedSystem],
        lookups: Lookups<'_>,
    ) -> FilterOutcome<'a> {
        info!("Processing {} systems...", systems.len());

        let mut survivors: Vec<&PopulatedSystem> = systems.iter().collect();
        let mut counts = Vec::with_capacity(self.stages.len());
        let mut issues = Vec::new();

        for stage in &self.stages {
            info!("Filtering {stage}...");
            survivors.retain(|system| match stage.evaluate(system, lookups) {
                Verdict::Keep => true,
                Verdict::Drop => false,
                Verdict::Invalid(e) => {
                    warn!("Excluding system: {e}");
                    issues.push(e);
                    false
                }
            });
            info!("Filter complete, {} systems remaining.", survivors.len());
            counts.push(StageCount {
                stage: stage.name(),
                remaining: survivors.len(),
            });
        }

        FilterOutcome {
            systems: survivors,
            counts,
            issues,
        }
    }
}
