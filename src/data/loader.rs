use std::collections::HashSet;
use std::io::Read;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use flate2::read::GzDecoder;
use log::{debug, info, warn};
use serde::Deserialize;

use super::model::{Datasets, LargePadStationNames, PermitIndex, PermitRecord, PopulatedSystem};
use crate::config::Sources;
use crate::error::FetchError;

const USER_AGENT: &str = concat!("househunt/", env!("CARGO_PKG_VERSION"));
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub const POPULATED_SYSTEMS: &str = "populated systems";
pub const PERMITS: &str = "permit data";
pub const STATIONS: &str = "large stations";

// ---------------------------------------------------------------------------
// Upstream record shapes (only the fields we read)
// ---------------------------------------------------------------------------

/// One entry of EDDB's `systems_populated.json`.
#[derive(Debug, Deserialize)]
struct EddbSystem {
    edsm_id: Option<u64>,
    #[serde(default)]
    needs_permit: Option<bool>,
}

/// One entry of EDDB's `stations.json`.
#[derive(Debug, Deserialize)]
struct EddbStation {
    name: String,
    #[serde(default)]
    max_landing_pad_size: Option<String>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Gunzip the payload when it carries the gzip magic bytes.
pub fn decode_payload(dataset: &'static str, bytes: Vec<u8>) -> Result<Vec<u8>, FetchError> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(bytes);
    }
    info!("Decompressing {dataset}...");
    let mut out = Vec::with_capacity(bytes.len() * 4);
    GzDecoder::new(bytes.as_slice())
        .read_to_end(&mut out)
        .map_err(|source| FetchError::Decompress { dataset, source })?;
    info!("Data decompressed ({} bytes).", out.len());
    Ok(out)
}

/// Parse the EDSM populated-systems dump (a JSON array). Ids are unique in
/// the result: a repeated id keeps its first occurrence.
pub fn parse_populated_systems(json: &[u8]) -> Result<Vec<PopulatedSystem>, FetchError> {
    let mut systems: Vec<PopulatedSystem> =
        serde_json::from_slice(json).map_err(|source| FetchError::Parse {
            dataset: POPULATED_SYSTEMS,
            source,
        })?;
    let mut seen = HashSet::with_capacity(systems.len());
    systems.retain(|s| {
        let first = seen.insert(s.id);
        if !first {
            debug!("Duplicate system id {} ({}), keeping the first", s.id, s.name);
        }
        first
    });
    Ok(systems)
}

/// Build the permit index from EDDB's populated-systems dump. Entries
/// without an EDSM id cannot be joined and are skipped.
pub fn parse_permit_index(json: &[u8]) -> Result<PermitIndex, FetchError> {
    let raw: Vec<EddbSystem> =
        serde_json::from_slice(json).map_err(|source| FetchError::Parse {
            dataset: PERMITS,
            source,
        })?;
    let total = raw.len();
    let records: Vec<PermitRecord> = raw
        .into_iter()
        .filter_map(|s| {
            Some(PermitRecord {
                id: s.edsm_id?,
                needs_permit: s.needs_permit.unwrap_or(false),
            })
        })
        .collect();
    if records.len() < total {
        debug!("Skipped {} permit entries without an EDSM id", total - records.len());
    }
    Ok(PermitIndex::from_records(records))
}

/// Names of stations whose largest landing pad is `L`.
pub fn parse_large_pad_station_names(json: &[u8]) -> Result<LargePadStationNames, FetchError> {
    let raw: Vec<EddbStation> =
        serde_json::from_slice(json).map_err(|source| FetchError::Parse {
            dataset: STATIONS,
            source,
        })?;
    Ok(raw
        .into_iter()
        .filter(|s| s.max_landing_pad_size.as_deref() == Some("L"))
        .map(|s| s.name)
        .collect())
}

// ---------------------------------------------------------------------------
// Fetcher – URL or local path, with retry on transient HTTP failures
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Fetcher {
    http: reqwest::blocking::Client,
    max_retries: u32,
    initial_backoff: Duration,
}

impl Fetcher {
    pub fn new(sources: &Sources) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(sources.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Transport {
                dataset: "client",
                source_name: "reqwest".into(),
                details: e.to_string(),
            })?;
        Ok(Self {
            http,
            max_retries: sources.max_retries,
            initial_backoff: Duration::from_secs(1),
        })
    }

    /// Read a source: `http(s)://` URLs are downloaded, anything else is a
    /// local path. The result is decompressed when gzipped.
    pub fn fetch_bytes(&self, dataset: &'static str, source: &str) -> Result<Vec<u8>, FetchError> {
        info!("Retrieving {dataset} from {source}");
        let bytes = if is_remote(source) {
            self.download(dataset, source)?
        } else {
            std::fs::read(source).map_err(|e| FetchError::Io {
                dataset,
                path: source.to_string(),
                source: e,
            })?
        };
        info!("{dataset}: {} bytes received", bytes.len());
        decode_payload(dataset, bytes)
    }

    /// GET with exponential backoff. 429, 5xx and transport errors are
    /// retried; any other non-success status fails immediately.
    fn download(&self, dataset: &'static str, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut backoff = self.initial_backoff;
        let mut last = String::new();

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!("{dataset}: attempt {attempt} failed ({last}), retrying in {backoff:?}");
                thread::sleep(backoff);
                backoff *= 2;
            }

            let resp = match self.http.get(url).send() {
                Ok(resp) => resp,
                Err(e) => {
                    last = e.to_string();
                    continue;
                }
            };

            let status = resp.status();
            if status.is_success() {
                match resp.bytes() {
                    Ok(body) => return Ok(body.to_vec()),
                    Err(e) => {
                        last = e.to_string();
                        continue;
                    }
                }
            }
            if status.as_u16() == 429 || status.is_server_error() {
                last = format!("HTTP {}", status.as_u16());
                continue;
            }
            return Err(FetchError::Status {
                dataset,
                source_name: url.to_string(),
                status: status.as_u16(),
            });
        }

        Err(FetchError::RetriesExhausted {
            dataset,
            source_name: url.to_string(),
            attempts: self.max_retries + 1,
            last,
        })
    }

    pub fn fetch_populated_systems(
        &self,
        source: &str,
    ) -> Result<Vec<PopulatedSystem>, FetchError> {
        parse_populated_systems(&self.fetch_bytes(POPULATED_SYSTEMS, source)?)
    }

    pub fn fetch_permit_index(&self, source: &str) -> Result<PermitIndex, FetchError> {
        parse_permit_index(&self.fetch_bytes(PERMITS, source)?)
    }

    pub fn fetch_large_pad_station_names(
        &self,
        source: &str,
    ) -> Result<LargePadStationNames, FetchError> {
        parse_large_pad_station_names(&self.fetch_bytes(STATIONS, source)?)
    }

    /// Fetch the three datasets concurrently. The first failure is returned
    /// as soon as it arrives; fetches still in flight are abandoned.
    pub fn fetch_all(&self, sources: &Sources) -> Result<Datasets, FetchError> {
        let (tx, rx) = mpsc::channel();
        let mut handles = Vec::with_capacity(3);

        let jobs: [(String, fn(&Fetcher, &str) -> Result<Loaded, FetchError>); 3] = [
            (sources.stations.clone(), |f, src| {
                f.fetch_large_pad_station_names(src).map(Loaded::LargePads)
            }),
            (sources.permits.clone(), |f, src| {
                f.fetch_permit_index(src).map(Loaded::Permits)
            }),
            (sources.populated_systems.clone(), |f, src| {
                f.fetch_populated_systems(src).map(Loaded::Systems)
            }),
        ];
        for (source, job) in jobs {
            let fetcher = self.clone();
            let tx = tx.clone();
            // A closed channel means the load already failed elsewhere.
            handles.push(thread::spawn(move || {
                let _ = tx.send(job(&fetcher, &source));
            }));
        }
        drop(tx);

        let mut datasets = Datasets::default();
        for _ in 0..handles.len() {
            match rx.recv() {
                Ok(loaded) => match loaded? {
                    Loaded::Systems(systems) => datasets.systems = systems,
                    Loaded::Permits(permits) => datasets.permits = permits,
                    Loaded::LargePads(names) => datasets.large_pads = names,
                },
                // Every sender is gone without reporting: a fetch thread panicked.
                Err(mpsc::RecvError) => {
                    for handle in handles {
                        if let Err(payload) = handle.join() {
                            std::panic::resume_unwind(payload);
                        }
                    }
                    unreachable!("fetch thread exited without a result");
                }
            }
        }

        info!(
            "Loaded {} populated systems, {} permit records, {} large-pad stations",
            datasets.systems.len(),
            datasets.permits.len(),
            datasets.large_pads.len()
        );
        if datasets.permits.is_empty() {
            warn!("Permit index is empty; every system will be excluded");
        }
        if datasets.large_pads.is_empty() {
            warn!("No large-pad stations found; every system will be excluded");
        }
        Ok(datasets)
    }
}

enum Loaded {
    Systems(Vec<PopulatedSystem>),
    Permits(PermitIndex),
    LargePads(LargePadStationNames),
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}
