use crate::bracket::Round;
use crate::match_sim::Goaliness;
use crate::standings::TieBreakPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A line of an input file could not be parsed.
    #[error("{what}, line {line}: {reason}")]
    MalformedLine {
        what: String,
        line: usize,
        reason: String,
    },
    #[error("unknown team {0:?}")]
    UnknownTeam(String),
    #[error("team {0:?} is listed twice")]
    DuplicateTeam(String),
    /// Ranks must lie in `0..total` for the scoring rate to stay positive.
    #[error("rank {rank} of team {team:?} is out of range ({total} teams)")]
    RankOutOfRange { team: String, rank: u32, total: usize },
    #[error("goaliness bounds must be finite, positive and high at most 1000 times low (low {low}, high {high})")]
    InvalidGoaliness { low: f64, high: f64 },
    #[error("resuming at the {round} needs {expected} teams, {found} were provided")]
    ResumeListLength {
        round: Round,
        expected: usize,
        found: usize,
    },
    #[error("the bracket needs {expected} groups, {found} were provided")]
    GroupCount { expected: usize, found: usize },
    #[error("the number of trials must be positive")]
    NoTrials,
    #[error("invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Settings of a simulation run. Every field has a default, so a partial JSON file is enough.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub trials: u64,
    pub base_seed: u64,
    pub goaliness: Goaliness,
    pub parallel: bool,
    pub tie_breaks: TieBreakPolicy,
    pub record_scorelines: bool,
    pub track_outcomes: bool,
    /// Trials between two progress messages of a sequential run. Zero disables them.
    pub progress_interval: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            trials: 100_000,
            base_seed: 0,
            goaliness: Goaliness::default(),
            parallel: false,
            tie_breaks: TieBreakPolicy::default(),
            record_scorelines: true,
            track_outcomes: true,
            progress_interval: 10_000,
        }
    }
}

impl SimulationConfig {
    /// Reads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<SimulationConfig, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        SimulationConfig::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<SimulationConfig, ConfigError> {
        let config: SimulationConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trials == 0 {
            return Err(ConfigError::NoTrials);
        }
        self.goaliness.validate()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::from_json("{}").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.trials, 100_000);
        assert_eq!(config.goaliness, Goaliness { low: 1.53, high: 1.54 });
        assert_eq!(config.tie_breaks, TieBreakPolicy::NameFallback);
    }

    #[test]
    fn test_partial_file() {
        let config = SimulationConfig::from_json(
            r#"{ "trials": 500, "tie_breaks": "strict", "goaliness": { "low": 1.2, "high": 2.5 } }"#,
        )
        .unwrap();
        assert_eq!(config.trials, 500);
        assert_eq!(config.tie_breaks, TieBreakPolicy::Strict);
        assert_eq!(config.goaliness.high, 2.5);
        assert!(config.record_scorelines);
    }

    #[test]
    fn test_rejected() {
        assert!(matches!(
            SimulationConfig::from_json(r#"{ "trials": 0 }"#),
            Err(ConfigError::NoTrials)
        ));
        assert!(matches!(
            SimulationConfig::from_json(r#"{ "goaliness": { "low": -1.0, "high": 1.5 } }"#),
            Err(ConfigError::InvalidGoaliness { .. })
        ));
        assert!(matches!(
            SimulationConfig::from_json(r#"{ "tie_breaks": "coin_toss" }"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "trials": 42, "parallel": true }}"#).unwrap();
        let config = SimulationConfig::load(file.path()).unwrap();
        assert_eq!(config.trials, 42);
        assert!(config.parallel);

        assert!(matches!(
            SimulationConfig::load("/nonexistent/wcmc.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
