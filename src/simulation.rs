use crate::bracket::Round;
use crate::match_sim::PoissonModel;
use crate::tally::Tally;
use crate::teams::TeamId;
use crate::tournament::{Tournament, TrialOutcome};
use crate::{trial_seeder, ConfigError, Error, InvariantViolation, RandGen, SimulationConfig};
use itertools::Itertools;
use log::{debug, info};
use rayon::prelude::*;
use std::fmt::{Display, Formatter};

/// Where the trials of a run start.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StartPoint {
    /// Group stage included.
    Full,
    /// First two of every group, in resume order.
    AfterGroupStage(Vec<TeamId>),
    /// Winners of the round of 16.
    AfterRoundOf16(Vec<TeamId>),
    /// Winners of the quarter-finals.
    AfterQuarterFinals(Vec<TeamId>),
    /// Finalists, then the losing semi-finalists.
    AfterSemiFinals(Vec<TeamId>),
}

impl StartPoint {
    /// First knockout round simulated.
    #[inline]
    pub fn first_round(&self) -> Round {
        match self {
            StartPoint::Full | StartPoint::AfterGroupStage(_) => Round::RoundOf16,
            StartPoint::AfterRoundOf16(_) => Round::QuarterFinals,
            StartPoint::AfterQuarterFinals(_) => Round::SemiFinals,
            StartPoint::AfterSemiFinals(_) => Round::FinalRound,
        }
    }

    /// Teams the run resumes with. Empty for a full run.
    #[inline]
    pub fn teams(&self) -> &[TeamId] {
        match self {
            StartPoint::Full => &[],
            StartPoint::AfterGroupStage(teams)
            | StartPoint::AfterRoundOf16(teams)
            | StartPoint::AfterQuarterFinals(teams)
            | StartPoint::AfterSemiFinals(teams) => teams,
        }
    }
}

impl Display for StartPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StartPoint::Full => f.write_str("full tournament"),
            start => write!(f, "from the {}", start.first_round()),
        }
    }
}

/// A Monte-Carlo run: many independent trials of one tournament.
#[derive(Clone, Debug)]
pub struct Simulation {
    tournament: Tournament,
    start: StartPoint,
    config: SimulationConfig,
}

impl Simulation {
    /// Creates a run, checking the configuration and the start point against the tournament.
    pub fn new(
        mut tournament: Tournament,
        start: StartPoint,
        config: SimulationConfig,
    ) -> Result<Simulation, Error> {
        config.validate()?;
        tournament.set_policy(config.tie_breaks);

        let bracket = tournament.bracket();
        match &start {
            StartPoint::Full => {
                if tournament.groups().len() != bracket.groups() {
                    return Err(ConfigError::GroupCount {
                        expected: bracket.groups(),
                        found: tournament.groups().len(),
                    }
                    .into());
                }
            }
            start => {
                let round = start.first_round();
                let expected = bracket.entry_sources(round).len();
                if start.teams().len() != expected {
                    return Err(ConfigError::ResumeListLength {
                        round,
                        expected,
                        found: start.teams().len(),
                    }
                    .into());
                }
                if let Some(team) = start.teams().iter().duplicates().next() {
                    return Err(InvariantViolation::DuplicateTeamInRound {
                        team: tournament.teams()[*team].name().to_owned(),
                        round,
                    }
                    .into());
                }
            }
        }

        Ok(Simulation {
            tournament,
            start,
            config,
        })
    }

    #[inline]
    pub fn tournament(&self) -> &Tournament {
        &self.tournament
    }

    #[inline]
    pub fn start(&self) -> &StartPoint {
        &self.start
    }

    #[inline]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Runs every trial, in parallel if configured so.
    pub fn run(&self) -> Result<Tally, Error> {
        info!(
            "simulating {} trials ({}, base seed {}, {})",
            self.config.trials,
            self.start,
            self.config.base_seed,
            if self.config.parallel {
                "parallel"
            } else {
                "sequential"
            }
        );

        let tally = if self.config.parallel {
            self.run_parallel()?
        } else {
            self.run_sequential()?
        };

        info!("finished {} trials", tally.trials());
        Ok(tally)
    }

    pub fn run_sequential(&self) -> Result<Tally, Error> {
        let mut tournament = self.tournament.clone();
        let mut tally = self.empty_tally();
        let interval = self.config.progress_interval;

        for trial in 0..self.config.trials {
            self.run_trial(&mut tournament, trial, &mut tally)?;
            if interval > 0 && (trial + 1) % interval == 0 {
                info!("{} / {} trials", trial + 1, self.config.trials);
            }
        }

        Ok(tally)
    }

    /// Spreads the trials over the rayon pool. Every worker owns a copy of the
    /// tournament, and the partial tallies are merged at the end.
    pub fn run_parallel(&self) -> Result<Tally, Error> {
        (0..self.config.trials)
            .into_par_iter()
            .try_fold(
                || (self.tournament.clone(), self.empty_tally()),
                |(mut tournament, mut tally), trial| -> Result<_, Error> {
                    self.run_trial(&mut tournament, trial, &mut tally)?;
                    Ok((tournament, tally))
                },
            )
            .map(|partial| partial.map(|(_, tally)| tally))
            .try_reduce(
                || self.empty_tally(),
                |mut tally, other| -> Result<_, Error> {
                    tally.merge(other)?;
                    Ok(tally)
                },
            )
    }

    /// Plays the `trial`-th trial on `tournament` and records it.
    pub fn run_trial(
        &self,
        tournament: &mut Tournament,
        trial: u64,
        tally: &mut Tally,
    ) -> Result<TrialOutcome, Error> {
        let rng: RandGen = trial_seeder(self.config.base_seed, trial).make_rng();
        let mut model = PoissonModel::new(self.config.goaliness, tournament.teams().len(), rng);

        let outcome = match &self.start {
            StartPoint::Full => tournament.play_full(&mut model, tally)?,
            StartPoint::AfterGroupStage(teams) => {
                tournament.play_from_round_of_16(teams, &mut model, tally)?
            }
            StartPoint::AfterRoundOf16(teams) => {
                tournament.play_from_quarter_finals(teams, &mut model, tally)?
            }
            StartPoint::AfterQuarterFinals(teams) => {
                tournament.play_from_semi_finals(teams, &mut model, tally)?
            }
            StartPoint::AfterSemiFinals(teams) => {
                tournament.play_final_round(teams, &mut model, tally)?
            }
        };
        tally.record_trial(&outcome, tournament)?;

        debug!(
            "trial {trial}: {} beat {} in the final",
            tournament.teams()[outcome.final_positions.champion].name(),
            tournament.teams()[outcome.final_positions.runner_up].name()
        );
        Ok(outcome)
    }

    fn empty_tally(&self) -> Tally {
        Tally::for_tournament(&self.tournament)
            .with_options(self.config.record_scorelines, self.config.track_outcomes)
    }
}
