//! Write a small synthetic trio of datasets for offline runs:
//!
//! ```text
//! cargo run --bin generate_sample -- sample_data
//! cargo run -- --systems sample_data/systemsPopulated.json.gz \
//!              --permits sample_data/systems_populated.json \
//!              --stations sample_data/stations.json
//! ```

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{json, Value};

const STATION_TYPES: [&str; 5] = [
    "Coriolis Starport",
    "Orbis Starport",
    "Outpost",
    "Planetary Outpost",
    "Planetary Port",
];
const ALLEGIANCES: [&str; 5] = [
    "Federation",
    "Empire",
    "Alliance",
    "Independent",
    "Pilots Federation",
];

// Rhea and 26 Alpha Monocerotis; half the systems are scattered near them.
const CENTRES: [(f64, f64, f64); 2] = [
    (58.125, 22.59375, -28.59375),
    (108.28125, 17.9375, -98.96875),
];

/// SplitMix64: enough spread for sample data, and reproducible per seed.
struct SampleRng(u64);

impl SampleRng {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Index in `0..n`.
    fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }

    /// Float in `lo..hi`.
    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        let unit = (self.next() >> 11) as f64 / (1u64 << 53) as f64;
        lo + (hi - lo) * unit
    }
}

struct Sample {
    systems: Vec<Value>,
    permits: Vec<Value>,
    stations: Vec<Value>,
}

fn generate(count: u64, rng: &mut SampleRng) -> Sample {
    let mut sample = Sample {
        systems: Vec::new(),
        permits: Vec::new(),
        stations: Vec::new(),
    };

    for id in 1..=count {
        let name = format!("HIP {}", 10_000 + id * 7);
        let near = id % 2 == 0;
        let (cx, cy, cz) = if near {
            CENTRES[rng.below(2)]
        } else {
            (0.0, 0.0, 0.0)
        };
        let spread = if near { 120.0 } else { 400.0 };
        let (dx, dy, dz) = (
            rng.uniform(-spread, spread),
            rng.uniform(-spread, spread),
            rng.uniform(-spread, spread),
        );
        let coords = json!({ "x": cx + dx, "y": cy + dy, "z": cz + dz });

        let factions: Vec<Value> = (0..rng.below(8))
            .map(|f| {
                let is_player = rng.below(10) == 0;
                let influence = if rng.below(6) == 0 {
                    0.0
                } else {
                    rng.uniform(0.01, 0.6)
                };
                json!({
                    "id": id * 100 + f as u64,
                    "name": format!("{name} Faction {f}"),
                    "isPlayer": is_player,
                    "influence": influence,
                })
            })
            .collect();

        let stations: Vec<Value> = (0..rng.below(5))
            .map(|s| {
                let station_name = format!("{name} Station {s}");
                let pad = ["S", "M", "L"][rng.below(3)];
                let kind = STATION_TYPES[rng.below(STATION_TYPES.len())];
                sample.stations.push(json!({
                    "id": id * 100 + s as u64,
                    "name": station_name,
                    "max_landing_pad_size": pad,
                }));
                json!({
                    "id": id * 100 + s as u64,
                    "name": station_name,
                    "type": kind,
                })
            })
            .collect();

        let allegiance = ALLEGIANCES[rng.below(ALLEGIANCES.len())];
        let population = rng.below(5) as u64 * 10u64.pow(rng.below(10) as u32);
        sample.systems.push(json!({
            "id": id,
            "name": name,
            "coords": coords,
            "allegiance": allegiance,
            "population": population,
            "factions": factions,
            "stations": stations,
        }));

        // Every 25th system is missing from the permit dump.
        if id % 25 != 0 {
            let needs_permit = rng.below(8) == 0;
            sample.permits.push(json!({
                "id": id + 50_000,
                "edsm_id": id,
                "needs_permit": needs_permit,
            }));
        }
    }

    sample
}

fn write_json(path: &Path, value: &[Value]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer(file, value).with_context(|| format!("writing {}", path.display()))
}

fn main() -> Result<()> {
    let out_dir = std::env::args().nth(1).unwrap_or_else(|| "sample_data".to_string());
    let out_dir = Path::new(&out_dir);
    fs::create_dir_all(out_dir).context("creating output directory")?;

    let mut rng = SampleRng(42);
    let sample = generate(2_000, &mut rng);

    let systems_path = out_dir.join("systemsPopulated.json.gz");
    let mut encoder = GzEncoder::new(
        File::create(&systems_path).context("creating systems dump")?,
        Compression::default(),
    );
    encoder.write_all(&serde_json::to_vec(&sample.systems)?)?;
    encoder.finish().context("finishing gzip stream")?;

    write_json(&out_dir.join("systems_populated.json"), &sample.permits)?;
    write_json(&out_dir.join("stations.json"), &sample.stations)?;

    println!(
        "Wrote {} systems, {} permit records and {} stations to {}",
        sample.systems.len(),
        sample.permits.len(),
        sample.stations.len(),
        out_dir.display()
    );
    Ok(())
}
