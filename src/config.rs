// Run configuration
// Loaded from an optional TOML file, then overridden by command-line flags.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::geometry::ReferenceRange;
use crate::data::model::Coords;
use crate::error::ConfigError;

pub const EDSM_POPULATED_SYSTEMS_URL: &str = "https://www.edsm.net/dump/systemsPopulated.json.gz";
pub const EDDB_POPULATED_SYSTEMS_URL: &str = "https://eddb.io/archive/v6/systems_populated.json";
pub const EDDB_STATIONS_URL: &str = "https://eddb.io/archive/v6/stations.json";
pub const DEFAULT_CSV_PATH: &str = "reports/populated-systems.csv";

/// Complete, immutable configuration for one hunt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HuntConfig {
    pub preferences: Preferences,
    /// Keyed by an identifier; a system matches when it is in range of any entry.
    pub reference_systems: BTreeMap<String, ReferenceSystem>,
    pub sources: Sources,
    pub report: ReportOptions,
}

/// Candidate requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Minimum population (inclusive).
    pub population: u64,
    /// Maximum number of active factions, when `limit_faction_count` is set.
    pub faction_max: usize,
    pub exclude_player_factions: bool,
    pub limit_faction_count: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            population: 1,
            faction_max: 6,
            exclude_player_factions: false,
            limit_faction_count: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSystem {
    /// Display name; the table key is used when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub coords: Coords,
    /// Maximum distance in light years.
    pub range: f64,
}

/// Where each dataset comes from: an http(s) URL or a local path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sources {
    pub populated_systems: String,
    pub permits: String,
    pub stations: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for Sources {
    fn default() -> Self {
        Self {
            populated_systems: EDSM_POPULATED_SYSTEMS_URL.to_string(),
            permits: EDDB_POPULATED_SYSTEMS_URL.to_string(),
            stations: EDDB_STATIONS_URL.to_string(),
            timeout_secs: 600,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    /// CSV destination; `None` disables the file.
    pub csv_path: Option<PathBuf>,
    /// Print the console table.
    pub table: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            csv_path: Some(PathBuf::from(DEFAULT_CSV_PATH)),
            table: true,
        }
    }
}

impl Default for HuntConfig {
    fn default() -> Self {
        let mut reference_systems = BTreeMap::new();
        reference_systems.insert(
            "RHEA".to_string(),
            ReferenceSystem {
                name: Some("Rhea".to_string()),
                coords: Coords::new(58.125, 22.59375, -28.59375),
                range: 80.0,
            },
        );
        reference_systems.insert(
            "26 ALPHA MONOCEROTIS".to_string(),
            ReferenceSystem {
                name: Some("26 Alpha Monocerotis".to_string()),
                coords: Coords::new(108.28125, 17.9375, -98.96875),
                range: 100.0,
            },
        );
        Self {
            preferences: Preferences::default(),
            reference_systems,
            sources: Sources::default(),
            report: ReportOptions::default(),
        }
    }
}

impl HuntConfig {
    /// Load from a TOML file. Missing sections fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reference_systems.is_empty() {
            return Err(ConfigError::NoReferenceSystems);
        }
        for (key, reference) in &self.reference_systems {
            let Coords { x, y, z } = reference.coords;
            for (axis, value) in [('x', x), ('y', y), ('z', z)] {
                if !value.is_finite() {
                    return Err(ConfigError::NonFiniteCoordinate {
                        key: key.clone(),
                        axis,
                    });
                }
            }
            if !reference.range.is_finite() || reference.range < 0.0 {
                return Err(ConfigError::InvalidRange {
                    key: key.clone(),
                    range: reference.range,
                });
            }
        }
        if self.sources.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Reference ranges in key order.
    pub fn reference_ranges(&self) -> Vec<ReferenceRange> {
        self.reference_systems
            .iter()
            .map(|(key, r)| {
                let name = r.name.clone().unwrap_or_else(|| key.clone());
                ReferenceRange::new(name, r.coords, r.range)
            })
            .collect()
    }
}

/// Parse `NAME=X,Y,Z:RANGE` into a keyed reference system.
pub fn parse_reference_spec(spec: &str) -> Result<(String, ReferenceSystem), ConfigError> {
    let malformed = |reason: &str| ConfigError::MalformedReference {
        spec: spec.to_string(),
        reason: reason.to_string(),
    };

    let (name, rest) = spec
        .split_once('=')
        .ok_or_else(|| malformed("expected NAME=X,Y,Z:RANGE"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(malformed("name is empty"));
    }
    let (coords, range) = rest
        .rsplit_once(':')
        .ok_or_else(|| malformed("missing ':RANGE'"))?;

    let parts = coords
        .split(',')
        .map(|tok| tok.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| malformed("coordinates must be numbers"))?;
    let [x, y, z] = parts[..] else {
        return Err(malformed("expected exactly three coordinates"));
    };
    let range = range
        .trim()
        .parse::<f64>()
        .map_err(|_| malformed("range must be a number"))?;

    Ok((
        name.to_ascii_uppercase(),
        ReferenceSystem {
            name: Some(name.to_string()),
            coords: Coords::new(x, y, z),
            range,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = HuntConfig::default();
        config.validate().unwrap();
        let names: Vec<_> = config
            .reference_ranges()
            .into_iter()
            .map(|r| r.point.name)
            .collect();
        assert_eq!(names, ["26 Alpha Monocerotis", "Rhea"]);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = HuntConfig::from_toml(
            r#"
            [preferences]
            population = 1000
            limit_faction_count = true
            "#,
        )
        .unwrap();
        assert_eq!(config.preferences.population, 1000);
        assert_eq!(config.preferences.faction_max, 6);
        assert!(config.preferences.limit_faction_count);
        assert_eq!(config.reference_systems.len(), 2);
        assert_eq!(config.sources.max_retries, 3);
    }

    #[test]
    fn reference_table_replaces_defaults() {
        let config = HuntConfig::from_toml(
            r#"
            [reference_systems.sol]
            coords = { x = 0.0, y = 0.0, z = 0.0 }
            range = 15
            "#,
        )
        .unwrap();
        let refs = config.reference_ranges();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].point.name, "sol");
        assert_eq!(refs[0].max_distance, 15.0);
    }

    #[test]
    fn empty_reference_set_is_rejected() {
        let mut config = HuntConfig::default();
        config.reference_systems.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoReferenceSystems)));
    }

    #[test]
    fn negative_range_names_the_key() {
        let mut config = HuntConfig::default();
        config.reference_systems.get_mut("RHEA").unwrap().range = -5.0;
        match config.validate() {
            Err(ConfigError::InvalidRange { key, .. }) => assert_eq!(key, "RHEA"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn nan_coordinate_is_rejected() {
        let mut config = HuntConfig::default();
        config.reference_systems.get_mut("RHEA").unwrap().coords.y = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonFiniteCoordinate { axis: 'y', .. })
        ));
    }

    #[test]
    fn parses_reference_spec() {
        let (key, r) =
            parse_reference_spec("26 Alpha Monocerotis=108.28125,17.9375,-98.96875:100").unwrap();
        assert_eq!(key, "26 ALPHA MONOCEROTIS");
        assert_eq!(r.name.as_deref(), Some("26 Alpha Monocerotis"));
        assert_eq!(r.coords, Coords::new(108.28125, 17.9375, -98.96875));
        assert_eq!(r.range, 100.0);
    }

    #[test]
    fn rejects_malformed_reference_specs() {
        let specs = [
            "Rhea",
            "=1,2,3:4",
            "Rhea=1,2:4",
            "Rhea=1,2,3",
            "Rhea=a,2,3:4",
            "Rhea=1,2,3:far",
        ];
        for spec in specs {
            assert!(
                matches!(
                    parse_reference_spec(spec),
                    Err(ConfigError::MalformedReference { .. })
                ),
                "{spec} should be rejected"
            );
        }
    }

    #[test]
    fn load_reports_path_on_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "preferences = [").unwrap();
        match HuntConfig::load(file.path()) {
            Err(ConfigError::Parse { path, .. }) => {
                assert_eq!(path, file.path().display().to_string())
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
