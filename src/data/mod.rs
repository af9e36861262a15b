/// Data layer: datasets, loading, filtering and ranking.
///
/// Architecture:
/// ```text
///  EDSM systemsPopulated.json.gz   EDDB systems_populated.json   EDDB stations.json
///            │                              │                            │
///            └───────────────┬──────────────┴────────────────────────────┘
///                            ▼
///                      ┌──────────┐
///                      │  loader  │  fetch (concurrently) → Datasets
///                      └──────────┘
///                            │
///                            ▼
///                      ┌──────────┐
///                      │  filter  │  ordered stages, uses geometry + lookups
///                      └──────────┘
///                            │
///                            ▼
///                      ┌──────────┐
///                      │   rank   │  stable sort by population → ReportRow
///                      └──────────┘
/// ```

pub mod filter;
pub mod geometry;
pub mod loader;
pub mod model;
pub mod rank;

use filter::{FilterChain, Lookups, Stage, StageCount};
use log::debug;
use model::{Datasets, ReportRow};

use crate::config::HuntConfig;
use crate::error::DataIntegrityError;

/// Output of one pipeline run.
#[derive(Debug, Clone)]
pub struct HuntReport {
    pub rows: Vec<ReportRow>,
    pub counts: Vec<StageCount>,
    pub issues: Vec<DataIntegrityError>,
}

/// Filter and rank already-loaded datasets. Pure: no I/O besides logging.
pub fn run_pipeline(datasets: &Datasets, config: &HuntConfig) -> HuntReport {
    let chain = FilterChain::from_config(config);
    let names: Vec<&str> = chain.stages().iter().map(Stage::name).collect();
    debug!("Filter stages: {}", names.join(" → "));
    let outcome = chain.run(&datasets.systems, Lookups::from(datasets));
    HuntReport {
        rows: rank::rank_systems(&outcome.systems),
        counts: outcome.counts,
        issues: outcome.issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReferenceSystem;
    use model::{Coords, PermitIndex, PermitRecord, PopulatedSystem, Station};

    fn candidate(id: u64, name: &str, x: f64, population: u64) -> PopulatedSystem {
        PopulatedSystem {
            id,
            name: name.into(),
            allegiance: "Federation".into(),
            coords: Coords::new(x, 0.0, 0.0),
            population,
            factions: Some(Vec::new()),
            stations: Some(vec![
                Station { name: format!("{name} Dock"), kind: "Orbis Starport".into() },
                Station { name: format!("{name} Base"), kind: "Planetary Outpost".into() },
            ]),
        }
    }

    fn origin_config() -> HuntConfig {
        let mut config = HuntConfig::default();
        config.reference_systems.clear();
        config.reference_systems.insert(
            "ORIGIN".into(),
            ReferenceSystem { name: Some("Origin".into()), coords: Coords::default(), range: 10.0 },
        );
        config
    }

    #[test]
    fn pipeline_filters_then_ranks() {
        let systems = vec![
            candidate(1, "Big", 1.0, 900),
            candidate(2, "Far", 50.0, 10),
            candidate(3, "Small", 2.0, 100),
            candidate(4, "Tie", 3.0, 100),
        ];
        let datasets = Datasets {
            permits: PermitIndex::from_records(
                (1..=4).map(|id| PermitRecord { id, needs_permit: false }),
            ),
            large_pads: systems.iter().map(|s| format!("{} Dock", s.name)).collect(),
            systems,
        };

        let report = run_pipeline(&datasets, &origin_config());

        let ranked: Vec<_> = report.rows.iter().map(|r| (r.rank, r.name.as_str())).collect();
        assert_eq!(ranked, [(1, "Small"), (2, "Tie"), (3, "Big")]);
        assert!(report
            .rows
            .iter()
            .all(|r| r.orbital_station_count == 1 && r.surface_station_count == 1));
        assert_eq!(report.counts.len(), 5);
        assert!(report.issues.is_empty());
    }
}
