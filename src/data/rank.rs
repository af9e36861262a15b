use super::model::{PopulatedSystem, ReportRow};

/// Sort by ascending population and project into report rows.
///
/// The sort is stable: systems with equal population keep their input order.
pub fn rank_systems(systems: &[&PopulatedSystem]) -> Vec<ReportRow> {
    let mut ordered = systems.to_vec();
    ordered.sort_by_key(|s| s.population);

    ordered
        .into_iter()
        .enumerate()
        .map(|(i, system)| project(i + 1, system))
        .collect()
}

fn project(rank: usize, system: &PopulatedSystem) -> ReportRow {
    let (orbital, surface) = system.station_split();
    ReportRow {
        rank,
        name: system.name.clone(),
        allegiance: system.allegiance.clone(),
        population: system.population,
        active_faction_count: system.active_faction_count(),
        orbital_station_count: orbital,
        surface_station_count: surface,
    }
}
