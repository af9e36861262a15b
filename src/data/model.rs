use std::collections::{HashMap, HashSet};

use log::debug;
use serde::{Deserialize, Deserializer, Serialize};

/// Factions at or below this influence are considered inactive.
pub const ACTIVE_INFLUENCE_THRESHOLD: f64 = 0.001;

/// Station type that counts as a surface (planetary) station.
pub const SURFACE_STATION_TYPE: &str = "Planetary Outpost";

/// Treat an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Coords
// ---------------------------------------------------------------------------

/// Galactic coordinates in light years.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coords {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coords {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Coords { x, y, z }
    }
}

// ---------------------------------------------------------------------------
// PopulatedSystem – one record of the EDSM populated-systems dump
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Faction {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "isPlayer", default, deserialize_with = "null_as_default")]
    pub is_player: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub influence: f64,
}

impl Faction {
    pub fn is_active(&self) -> bool {
        self.influence > ACTIVE_INFLUENCE_THRESHOLD
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Station {
    pub name: String,
    /// Station type, e.g. "Coriolis Starport" or "Planetary Outpost".
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
}

impl Station {
    pub fn is_surface(&self) -> bool {
        self.kind == SURFACE_STATION_TYPE
    }
}

/// A populated star system. Unknown upstream fields are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PopulatedSystem {
    /// EDSM id; unique within one dump.
    pub id: u64,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub allegiance: String,
    pub coords: Coords,
    #[serde(default, deserialize_with = "null_as_default")]
    pub population: u64,
    /// `None` when the dump carries no faction data for the system.
    #[serde(default)]
    pub factions: Option<Vec<Faction>>,
    #[serde(default)]
    pub stations: Option<Vec<Station>>,
}

impl PopulatedSystem {
    /// Factions with influence above [`ACTIVE_INFLUENCE_THRESHOLD`].
    pub fn active_faction_count(&self) -> usize {
        self.factions
            .as_deref()
            .map_or(0, |fs| fs.iter().filter(|f| f.is_active()).count())
    }

    /// `(orbital, surface)` station counts.
    pub fn station_split(&self) -> (usize, usize) {
        let stations = self.stations.as_deref().unwrap_or_default();
        let surface = stations.iter().filter(|s| s.is_surface()).count();
        (stations.len() - surface, surface)
    }
}

// ---------------------------------------------------------------------------
// PermitIndex – EDSM id → permit requirement, from the EDDB dump
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermitRecord {
    pub id: u64,
    pub needs_permit: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PermitIndex {
    records: HashMap<u64, PermitRecord>,
}

impl PermitIndex {
    /// Build the index. On duplicate ids the first record wins.
    pub fn from_records(records: impl IntoIterator<Item = PermitRecord>) -> Self {
        let mut map = HashMap::new();
        for record in records {
            if map.contains_key(&record.id) {
                debug!("Duplicate permit record for id {}, keeping the first", record.id);
                continue;
            }
            map.insert(record.id, record);
        }
        PermitIndex { records: map }
    }

    pub fn get(&self, id: u64) -> Option<&PermitRecord> {
        self.records.get(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// LargePadStationNames
// ---------------------------------------------------------------------------

/// Names of stations with a large landing pad.
#[derive(Debug, Clone, Default)]
pub struct LargePadStationNames {
    names: HashSet<String>,
}

impl LargePadStationNames {
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for LargePadStationNames {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        LargePadStationNames {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Datasets – everything the pipeline needs, materialised
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Datasets {
    pub systems: Vec<PopulatedSystem>,
    pub permits: PermitIndex,
    pub large_pads: LargePadStationNames,
}

// ---------------------------------------------------------------------------
// ReportRow
// ---------------------------------------------------------------------------

/// One line of the final report. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    #[serde(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Allegiance")]
    pub allegiance: String,
    #[serde(rename = "Population")]
    pub population: u64,
    #[serde(rename = "Faction Count")]
    pub active_faction_count: usize,
    #[serde(rename = "Orbital Stations")]
    pub orbital_station_count: usize,
    #[serde(rename = "Surface Stations")]
    pub surface_station_count: usize,
}
