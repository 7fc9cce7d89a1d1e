#![forbid(unsafe_code)]

//! Monte-Carlo prediction of group + knockout football tournaments.
//!
//! A [`tournament::Tournament`] plays one trial end to end using a
//! [`match_sim::MatchModel`], and a [`simulation::Simulation`] repeats trials
//! with independent seeds, collecting everything into a [`tally::Tally`].

use rand::Rng;
use thiserror::Error;

pub mod bracket;
pub mod config;
pub mod data;
pub mod final_positions;
pub mod groups;
pub mod match_sim;
pub mod report;
pub mod simulation;
pub mod standings;
pub mod tally;
pub mod teams;
pub mod tournament;

pub use bracket::{Round, Stage};
pub use config::{ConfigError, SimulationConfig};

/// Random generator used by the simulation.
pub type RandGen = rand_pcg::Pcg64;

/// Seeder used to derive [`RandGen`]s.
pub use rand_seeder::Seeder;

/// Generates a random base seed.
#[inline]
pub fn gen_seed() -> u64 {
    rand::thread_rng().gen()
}

/// Returns the seeder of the `trial`-th trial of a run started from `base_seed`.
#[inline]
pub fn trial_seeder(base_seed: u64, trial: u64) -> Seeder {
    Seeder::from(base_seed.wrapping_add(trial))
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Malformed or missing input data. Detected before simulating.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    /// The tournament data and the bracket logic disagree.
    #[error("invariant violation: {0}")]
    InvariantViolation(#[from] InvariantViolation),
    /// Two teams are tied on every tie-break criterion and the strict policy is in use.
    #[error("statistical degeneracy: {first} and {second} are tied on every tie-break criterion")]
    StatisticalDegeneracy { first: String, second: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum InvariantViolation {
    #[error("group {group} has {size} teams ({expected} expected)")]
    GroupSize {
        group: String,
        size: usize,
        expected: usize,
    },
    #[error("team {0} is a member of more than one group")]
    TeamInTwoGroups(String),
    #[error("bracket source {0} is routed more than once")]
    DuplicateSource(String),
    #[error("slot {slot} of match {fixture} is fed {count} times")]
    SlotFeed { fixture: u8, slot: usize, count: usize },
    #[error("bracket has no route for {0}")]
    UnroutedSource(String),
    #[error("match {0} was reached with fewer than two teams")]
    IncompleteFixture(u8),
    #[error("team {team} appears twice in the {round}")]
    DuplicateTeamInRound { team: String, round: Round },
    #[error("tally shapes differ ({0})")]
    TallyShape(&'static str),
    #[error("invalid scoring rate {0}")]
    InvalidScoringRate(f64),
    #[error("an error occurred while resolving the tournament: {0}")]
    InternalError(&'static str),
}

