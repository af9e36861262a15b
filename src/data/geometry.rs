use log::debug;

use super::model::{Coords, PopulatedSystem};

/// A named point in space that candidate systems are measured against.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePoint {
    pub name: String,
    pub coords: Coords,
}

/// A reference point paired with the maximum accepted distance to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceRange {
    pub point: ReferencePoint,
    pub max_distance: f64,
}

impl ReferenceRange {
    pub fn new(name: impl Into<String>, coords: Coords, max_distance: f64) -> Self {
        ReferenceRange {
            point: ReferencePoint {
                name: name.into(),
                coords,
            },
            max_distance,
        }
    }

    pub fn contains(&self, coords: &Coords) -> bool {
        distance(coords, &self.point.coords) <= self.max_distance
    }
}

/// Euclidean distance between two points.
pub fn distance(a: &Coords, b: &Coords) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    let dz = a.z - b.z;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// True when the system lies within range of at least one reference.
/// An empty reference list matches nothing.
pub fn within_any(system: &PopulatedSystem, refs: &[ReferenceRange]) -> bool {
    match refs.iter().find(|r| r.contains(&system.coords)) {
        Some(hit) => {
            debug!("{} is within {} Ly of {}", system.name, hit.max_distance, hit.point.name);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system_at(x: f64, y: f64, z: f64) -> PopulatedSystem {
        PopulatedSystem {
            id: 1,
            name: "Probe".into(),
            allegiance: "Independent".into(),
            coords: Coords::new(x, y, z),
            population: 1,
            factions: None,
            stations: None,
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            (Coords::new(0.0, 0.0, 0.0), Coords::new(3.0, 4.0, 0.0)),
            (Coords::new(58.125, 22.59375, -28.59375), Coords::new(108.28125, 17.9375, -98.96875)),
            (Coords::new(-1.5, 2.25, 1e6), Coords::new(7.0, -3.0, -1e6)),
        ];
        for (a, b) in pairs {
            assert_eq!(distance(&a, &b), distance(&b, &a));
        }
        assert_eq!(distance(&pairs[0].0, &pairs[0].1), 5.0);
    }

    #[test]
    fn empty_reference_list_matches_nothing() {
        assert!(!within_any(&system_at(0.0, 0.0, 0.0), &[]));
    }

    #[test]
    fn range_boundary_is_inclusive() {
        let refs = [ReferenceRange::new("Origin", Coords::default(), 5.0)];
        assert!(within_any(&system_at(3.0, 4.0, 0.0), &refs));
        assert!(!within_any(&system_at(3.0, 4.1, 0.0), &refs));
    }

    #[test]
    fn any_single_reference_is_enough() {
        let refs = [
            ReferenceRange::new("Near", Coords::new(100.0, 0.0, 0.0), 1.0),
            ReferenceRange::new("Far", Coords::new(0.0, 0.0, 0.0), 10.0),
        ];
        assert!(within_any(&system_at(1.0, 1.0, 1.0), &refs));
        assert!(!within_any(&system_at(50.0, 0.0, 0.0), &refs));
    }
}
