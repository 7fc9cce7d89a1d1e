use crate::bracket::{BracketTable, Fixture, Round, Slot, Source};
use crate::final_positions::FinalPositions;
use crate::groups::{check_disjoint, Group, TEAMS_PER_GROUP};
use crate::match_sim::{MatchModel, Score};
use crate::standings::{self, TieBreakPolicy};
use crate::tally::Tally;
use crate::teams::{Reset, TeamId, Teams};
use crate::{ConfigError, Error, InvariantViolation};
use log::trace;
use std::collections::{HashMap, HashSet};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
/// Result of a knockout match.
pub struct FixtureResult {
    pub fixture: Fixture,
    pub home: TeamId,
    pub away: TeamId,
    pub score: Score,
    pub winner: TeamId,
    pub loser: TeamId,
}

#[derive(Clone, Debug, Eq, PartialEq)]
/// Results of a knockout round, in playing order.
pub struct RoundResult {
    pub round: Round,
    pub fixtures: Vec<FixtureResult>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
/// Everything a trial decided.
pub struct TrialOutcome {
    /// Placement of every group, best first. Empty when the trial started after the group stage.
    pub groups: Vec<[TeamId; TEAMS_PER_GROUP]>,
    /// Knockout rounds actually simulated.
    pub rounds: Vec<RoundResult>,
    pub final_positions: FinalPositions,
}

impl TrialOutcome {
    #[inline]
    pub fn round(&self, round: Round) -> Option<&RoundResult> {
        self.rounds.iter().find(|r| r.round == round)
    }
}

/// A tournament: teams, groups and bracket, plus the per-trial team state.
#[derive(Clone, Debug)]
pub struct Tournament {
    teams: Teams,
    groups: Vec<Group>,
    bracket: BracketTable,
    policy: TieBreakPolicy,
}

impl Tournament {
    /// Creates a new tournament.
    ///
    /// `groups` may be empty for runs that start after the group stage, otherwise it
    /// must match the number of groups the bracket expects.
    pub fn new(
        teams: Teams,
        groups: Vec<Group>,
        bracket: BracketTable,
        policy: TieBreakPolicy,
    ) -> Result<Tournament, Error> {
        teams.validate()?;
        if !groups.is_empty() && groups.len() != bracket.groups() {
            return Err(ConfigError::GroupCount {
                expected: bracket.groups(),
                found: groups.len(),
            }
            .into());
        }
        if groups
            .iter()
            .flat_map(|g| g.teams().iter())
            .any(|&t| teams.get(t).is_none())
        {
            return Err(InvariantViolation::InternalError("group member outside the registry").into());
        }
        check_disjoint(&groups, &teams)?;

        Ok(Tournament {
            teams,
            groups,
            bracket,
            policy,
        })
    }

    #[inline]
    pub fn teams(&self) -> &Teams {
        &self.teams
    }

    #[inline]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    #[inline]
    pub fn bracket(&self) -> &BracketTable {
        &self.bracket
    }

    #[inline]
    pub fn policy(&self) -> TieBreakPolicy {
        self.policy
    }

    #[inline]
    pub fn set_policy(&mut self, policy: TieBreakPolicy) {
        self.policy = policy;
    }

    /// Plays a whole tournament, group stage included.
    pub fn play_full<M: MatchModel>(
        &mut self,
        model: &mut M,
        tally: &mut Tally,
    ) -> Result<TrialOutcome, Error> {
        if self.groups.len() != self.bracket.groups() {
            return Err(ConfigError::GroupCount {
                expected: self.bracket.groups(),
                found: self.groups.len(),
            }
            .into());
        }

        self.teams.reset(Reset::All);
        let groups = self.play_group_stage(model, tally)?;

        let seeded = self
            .bracket
            .entry_sources(Round::RoundOf16)
            .into_iter()
            .map(|source| match source {
                Source::Group { group, position } => groups
                    .get(group.index())
                    .and_then(|placement| placement.get(position))
                    .map(|&team| (source, team))
                    .ok_or(InvariantViolation::UnroutedSource(source.to_string())),
                _ => Err(InvariantViolation::InternalError(
                    "round of 16 fed by a knockout match",
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut outcome = self.play_knockout(Round::RoundOf16, seeded, false, model, tally)?;
        outcome.groups = groups;
        Ok(outcome)
    }

    /// Resumes after the group stage. `qualified` lists the first two of every group:
    /// winner of A, runner-up of A, winner of B, ...
    #[inline]
    pub fn play_from_round_of_16<M: MatchModel>(
        &mut self,
        qualified: &[TeamId],
        model: &mut M,
        tally: &mut Tally,
    ) -> Result<TrialOutcome, Error> {
        self.resume(Round::RoundOf16, qualified, model, tally)
    }

    /// Resumes after the round of 16. `qualified` lists the winners of matches 49 to 56.
    #[inline]
    pub fn play_from_quarter_finals<M: MatchModel>(
        &mut self,
        qualified: &[TeamId],
        model: &mut M,
        tally: &mut Tally,
    ) -> Result<TrialOutcome, Error> {
        self.resume(Round::QuarterFinals, qualified, model, tally)
    }

    /// Resumes after the quarter-finals. `qualified` lists the winners of matches 57 to 60.
    #[inline]
    pub fn play_from_semi_finals<M: MatchModel>(
        &mut self,
        qualified: &[TeamId],
        model: &mut M,
        tally: &mut Tally,
    ) -> Result<TrialOutcome, Error> {
        self.resume(Round::SemiFinals, qualified, model, tally)
    }

    /// Resumes after the semi-finals. `qualified` lists the two finalists (winners of
    /// 61 and 62) followed by the two losing semi-finalists.
    #[inline]
    pub fn play_final_round<M: MatchModel>(
        &mut self,
        qualified: &[TeamId],
        model: &mut M,
        tally: &mut Tally,
    ) -> Result<TrialOutcome, Error> {
        self.resume(Round::FinalRound, qualified, model, tally)
    }

    fn resume<M: MatchModel>(
        &mut self,
        round: Round,
        qualified: &[TeamId],
        model: &mut M,
        tally: &mut Tally,
    ) -> Result<TrialOutcome, Error> {
        let sources = self.bracket.entry_sources(round);
        if sources.len() != qualified.len() {
            return Err(ConfigError::ResumeListLength {
                round,
                expected: sources.len(),
                found: qualified.len(),
            }
            .into());
        }
        if qualified.iter().any(|&t| self.teams.get(t).is_none()) {
            return Err(InvariantViolation::InternalError("qualified team outside the registry").into());
        }

        self.teams.reset(Reset::All);
        let seeded = sources.into_iter().zip(qualified.iter().copied()).collect();
        self.play_knockout(round, seeded, true, model, tally)
    }

    fn play_group_stage<M: MatchModel>(
        &mut self,
        model: &mut M,
        tally: &mut Tally,
    ) -> Result<Vec<[TeamId; TEAMS_PER_GROUP]>, Error> {
        let Tournament {
            teams,
            groups,
            policy,
            ..
        } = self;

        let mut placements = Vec::with_capacity(groups.len());
        for group in groups.iter() {
            for (home, away) in group.fixtures() {
                play_match(teams, home, away, model, tally, true)?;
            }

            let order = standings::placements(group.teams(), teams, *policy)?;
            let order = <[TeamId; TEAMS_PER_GROUP]>::try_from(order)
                .map_err(|_| InvariantViolation::InternalError("group placement lost a team"))?;
            trace!(
                "group {}: {} ahead of {}",
                group.label(),
                teams[order[0]].name(),
                teams[order[1]].name()
            );
            placements.push(order);
        }

        Ok(placements)
    }

    /// Plays from `first` to the final. Scorelines are recorded for `first` only when
    /// `record_first` is set.
    fn play_knockout<M: MatchModel>(
        &mut self,
        first: Round,
        seeded: Vec<(Source, TeamId)>,
        record_first: bool,
        model: &mut M,
        tally: &mut Tally,
    ) -> Result<TrialOutcome, Error> {
        let Tournament {
            teams,
            bracket,
            policy,
            ..
        } = self;

        let mut draw = Draw::default();
        for (source, team) in seeded {
            let slot = bracket
                .route(source)
                .ok_or_else(|| InvariantViolation::UnroutedSource(source.to_string()))?;
            draw.place(slot, team)?;
        }

        let mut rounds = Vec::with_capacity(Round::ALL.len());
        let mut current = Some(first);
        while let Some(round) = current {
            teams.reset(Reset::PointsOnly);
            let record = record_first && round == first;
            let mut seen = HashSet::new();
            let mut fixtures = Vec::new();

            for fixture in bracket.fixtures(round) {
                let [home, away] = draw.take(fixture)?;
                for team in [home, away] {
                    if !seen.insert(team) {
                        return Err(InvariantViolation::DuplicateTeamInRound {
                            team: teams[team].name().to_owned(),
                            round,
                        }
                        .into());
                    }
                }

                let score = play_match(teams, home, away, model, tally, record)?;
                let order = standings::placements(&[home, away], teams, *policy)?;
                let (winner, loser) = (order[0], order[1]);
                for (source, team) in [(Source::Winner(fixture), winner), (Source::Loser(fixture), loser)] {
                    if let Some(slot) = bracket.route(source) {
                        draw.place(slot, team)?;
                    }
                }

                fixtures.push(FixtureResult {
                    fixture,
                    home,
                    away,
                    score,
                    winner,
                    loser,
                });
            }

            rounds.push(RoundResult { round, fixtures });
            current = round.next();
        }

        let last = rounds
            .last()
            .ok_or(InvariantViolation::InternalError("no knockout round played"))?;
        let final_positions = FinalPositions::evaluate(&last.fixtures)?;

        Ok(TrialOutcome {
            groups: Vec::new(),
            rounds,
            final_positions,
        })
    }
}

fn play_match<M: MatchModel>(
    teams: &mut Teams,
    home: TeamId,
    away: TeamId,
    model: &mut M,
    tally: &mut Tally,
    opening_round: bool,
) -> Result<Score, Error> {
    let score = model.play(&teams[home], &teams[away])?;
    teams[home].record(score.home, score.away);
    teams[away].record(score.away, score.home);
    tally.record_match(home, away, score, opening_round)?;
    trace!(
        "{} {}-{} {}",
        teams[home].name(),
        score.home,
        score.away,
        teams[away].name()
    );
    Ok(score)
}

/// Teams waiting for their next fixture.
#[derive(Debug, Default)]
struct Draw {
    slots: HashMap<Fixture, [Option<TeamId>; 2]>,
}

impl Draw {
    fn place(&mut self, slot: Slot, team: TeamId) -> Result<(), InvariantViolation> {
        let places = self.slots.entry(slot.fixture).or_default();
        let place = places
            .get_mut(slot.index)
            .ok_or(InvariantViolation::SlotFeed {
                fixture: slot.fixture.number,
                slot: slot.index,
                count: 1,
            })?;
        if place.is_some() {
            return Err(InvariantViolation::SlotFeed {
                fixture: slot.fixture.number,
                slot: slot.index,
                count: 2,
            });
        }
        *place = Some(team);
        Ok(())
    }

    fn take(&mut self, fixture: Fixture) -> Result<[TeamId; 2], InvariantViolation> {
        match self.slots.remove(&fixture) {
            Some([Some(home), Some(away)]) => Ok([home, away]),
            _ => Err(InvariantViolation::IncompleteFixture(fixture.number)),
        }
    }
}
