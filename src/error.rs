use thiserror::Error;

/// Upstream retrieval failure. Fatal for the run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{dataset}: request to {source_name} failed: {details}")]
    Transport {
        dataset: &'static str,
        source_name: String,
        details: String,
    },

    #[error("{dataset}: {source_name} answered HTTP {status}")]
    Status {
        dataset: &'static str,
        source_name: String,
        status: u16,
    },

    #[error("{dataset}: gave up on {source_name} after {attempts} attempts ({last})")]
    RetriesExhausted {
        dataset: &'static str,
        source_name: String,
        attempts: u32,
        last: String,
    },

    #[error("{dataset}: cannot read {path}")]
    Io {
        dataset: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{dataset}: failed to decompress payload")]
    Decompress {
        dataset: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{dataset}: failed to parse JSON")]
    Parse {
        dataset: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Invalid or missing configuration, detected before any fetch starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no reference systems configured (reference_systems is empty)")]
    NoReferenceSystems,

    #[error("reference_systems.{key}.coords.{axis} is not a finite number")]
    NonFiniteCoordinate { key: String, axis: char },

    #[error("reference_systems.{key}.range must be a finite, non-negative distance (got {range})")]
    InvalidRange { key: String, range: f64 },

    #[error("invalid --reference '{spec}': {reason}")]
    MalformedReference { spec: String, reason: String },

    #[error("reference system {key} is given more than once")]
    DuplicateReference { key: String },

    #[error("sources.timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("cannot read config file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// A per-record inconsistency between the merged datasets. The offending
/// system is excluded and the run continues.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataIntegrityError {
    #[error("system {name} (id {id}) has no permit record")]
    MissingPermitRecord { id: u64, name: String },
}

#[derive(Debug, Error)]
pub enum HuntError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to write report {path}")]
    Report {
        path: String,
        #[source]
        source: csv::Error,
    },
}

impl HuntError {
    /// Process exit code for this failure class.
    pub fn exit_code(&self) -> u8 {
        match self {
            HuntError::Report { .. } => 1,
            HuntError::Config(_) => 2,
            HuntError::Fetch(_) => 3,
        }
    }
}
