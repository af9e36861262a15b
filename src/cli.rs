use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Args, Parser};

use crate::config::{parse_reference_spec, HuntConfig};
use crate::error::ConfigError;

#[derive(Parser, Debug)]
#[command(
    name = "househunt",
    about = "Find populated systems near reference stars that have large pads and need no permit",
    version
)]
pub struct Cli {
    /// TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub filters: FilterOptions,

    #[command(flatten)]
    pub sources: SourceOptions,

    #[command(flatten)]
    pub report: ReportArgs,

    /// Log every reference match and skipped record
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Args, Debug)]
#[command(next_help_heading = "Filters")]
pub struct FilterOptions {
    /// Minimum system population
    #[arg(long, value_name = "N")]
    pub population: Option<u64>,

    /// Maximum active factions (with --limit-factions)
    #[arg(long, value_name = "N")]
    pub faction_max: Option<usize>,

    /// Drop systems that host a player faction
    #[arg(long)]
    pub exclude_player_factions: bool,

    /// Drop systems with more than --faction-max active factions
    #[arg(long)]
    pub limit_factions: bool,

    /// Reference system NAME=X,Y,Z:RANGE; repeatable, replaces configured ones
    #[arg(long = "reference", value_name = "SPEC", action = clap::ArgAction::Append)]
    pub references: Vec<String>,
}

#[derive(Args, Debug)]
#[command(next_help_heading = "Sources")]
pub struct SourceOptions {
    /// EDSM populated systems dump (URL or path, optionally gzipped)
    #[arg(long, value_name = "SOURCE")]
    pub systems: Option<String>,

    /// EDDB populated systems dump carrying permit flags
    #[arg(long, value_name = "SOURCE")]
    pub permits: Option<String>,

    /// EDDB stations dump
    #[arg(long, value_name = "SOURCE")]
    pub stations: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Retries for transient HTTP failures
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,
}

#[derive(Args, Debug)]
#[command(next_help_heading = "Report")]
pub struct ReportArgs {
    /// CSV output path
    #[arg(long, value_name = "FILE", conflicts_with = "no_csv")]
    pub csv: Option<PathBuf>,

    /// Do not write a CSV file
    #[arg(long)]
    pub no_csv: bool,

    /// Do not print the table
    #[arg(long)]
    pub no_table: bool,
}

impl Cli {
    /// Config file (or defaults) with command-line overrides applied, validated.
    pub fn resolve_config(&self) -> Result<HuntConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => HuntConfig::load(path)?,
            None => HuntConfig::default(),
        };
        self.apply(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, config: &mut HuntConfig) -> Result<(), ConfigError> {
        let prefs = &mut config.preferences;
        if let Some(population) = self.filters.population {
            prefs.population = population;
        }
        if let Some(max) = self.filters.faction_max {
            prefs.faction_max = max;
        }
        prefs.exclude_player_factions |= self.filters.exclude_player_factions;
        prefs.limit_faction_count |= self.filters.limit_factions;

        if !self.filters.references.is_empty() {
            let mut references = BTreeMap::new();
            for spec in &self.filters.references {
                let (key, reference) = parse_reference_spec(spec)?;
                if references.insert(key.clone(), reference).is_some() {
                    return Err(ConfigError::DuplicateReference { key });
                }
            }
            config.reference_systems = references;
        }

        let sources = &mut config.sources;
        for (flag, slot) in [
            (&self.sources.systems, &mut sources.populated_systems),
            (&self.sources.permits, &mut sources.permits),
            (&self.sources.stations, &mut sources.stations),
        ] {
            if let Some(value) = flag {
                slot.clone_from(value);
            }
        }
        if let Some(timeout) = self.sources.timeout {
            sources.timeout_secs = timeout;
        }
        if let Some(retries) = self.sources.retries {
            sources.max_retries = retries;
        }

        if self.report.no_csv {
            config.report.csv_path = None;
        } else if let Some(path) = &self.report.csv {
            config.report.csv_path = Some(path.clone());
        }
        if self.report.no_table {
            config.report.table = false;
        }
        Ok(())
    }

    /// Default log filter; `RUST_LOG` still takes precedence.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Coords;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("househunt").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn no_flags_gives_defaults() {
        assert_eq!(parse(&[]).resolve_config().unwrap(), HuntConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--population",
            "1000",
            "--limit-factions",
            "--faction-max",
            "4",
            "--reference",
            "Sol=0,0,0:20",
            "--reference",
            "Achenar=67.5,-119.46875,24.84375:50",
            "--systems",
            "data/systems.json.gz",
            "--no-csv",
            "--no-table",
        ])
        .resolve_config()
        .unwrap();

        assert_eq!(config.preferences.population, 1000);
        assert_eq!(config.preferences.faction_max, 4);
        assert!(config.preferences.limit_faction_count);
        assert!(!config.preferences.exclude_player_factions);
        assert_eq!(config.reference_systems.len(), 2);
        assert_eq!(config.reference_systems["SOL"].coords, Coords::default());
        assert_eq!(config.sources.populated_systems, "data/systems.json.gz");
        assert_eq!(config.report.csv_path, None);
        assert!(!config.report.table);
    }

    #[test]
    fn malformed_reference_is_a_config_error() {
        let err = parse(&["--reference", "Sol=0,0:20"]).resolve_config().unwrap_err();
        assert!(matches!(err, ConfigError::MalformedReference { .. }));
    }

    #[test]
    fn reference_names_differing_only_in_case_collide() {
        let err = parse(&["--reference", "Sol=0,0,0:20", "--reference", "SOL=1,1,1:5"])
            .resolve_config()
            .unwrap_err();
        match err {
            ConfigError::DuplicateReference { key } => assert_eq!(key, "SOL"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = parse(&["--timeout", "0"]).resolve_config().unwrap_err();
        assert!(matches!(err, ConfigError::ZeroTimeout));
    }

    #[test]
    fn csv_conflicts_with_no_csv() {
        assert!(Cli::try_parse_from(["househunt", "--csv", "out.csv", "--no-csv"]).is_err());
    }

    #[test]
    fn verbosity_selects_log_level() {
        assert_eq!(parse(&[]).log_level(), "info");
        assert_eq!(parse(&["-v"]).log_level(), "debug");
        assert_eq!(parse(&["-q"]).log_level(), "warn");
    }
}
