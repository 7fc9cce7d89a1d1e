use crate::bracket::Round;
use crate::groups::TEAMS_PER_GROUP;
use crate::match_sim::Score;
use crate::teams::{TeamId, Teams};
use crate::tournament::{RoundResult, TrialOutcome, Tournament};
use crate::InvariantViolation;
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// Number of regular bins of the goal histograms (0 to 8 goals).
pub const GOAL_BINS: usize = 9;
/// Scorelines are tabulated up to this many goals per side (exclusive).
pub const SCORELINE_GOALS: usize = 8;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
/// Per-team event counted once per trial.
pub enum Milestone {
    QualifiedFromGroup,
    WonRoundOf16,
    WonQuarterFinal,
    ReachedFinal,
    Champion,
    RunnerUp,
    ThirdPlace,
    FourthPlace,
}

impl Milestone {
    pub const COUNT: usize = 8;
    pub const ALL: [Milestone; Milestone::COUNT] = [
        Milestone::QualifiedFromGroup,
        Milestone::WonRoundOf16,
        Milestone::WonQuarterFinal,
        Milestone::ReachedFinal,
        Milestone::Champion,
        Milestone::RunnerUp,
        Milestone::ThirdPlace,
        Milestone::FourthPlace,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short column label.
    pub fn label(self) -> &'static str {
        match self {
            Milestone::QualifiedFromGroup => "R16",
            Milestone::WonRoundOf16 => "QF",
            Milestone::WonQuarterFinal => "SF",
            Milestone::ReachedFinal => "Final",
            Milestone::Champion => "1st",
            Milestone::RunnerUp => "2nd",
            Milestone::ThirdPlace => "3rd",
            Milestone::FourthPlace => "4th",
        }
    }

    /// Round deciding the milestone, `None` for the group stage.
    #[inline]
    pub fn round(self) -> Option<Round> {
        match self {
            Milestone::QualifiedFromGroup => None,
            Milestone::WonRoundOf16 => Some(Round::RoundOf16),
            Milestone::WonQuarterFinal => Some(Round::QuarterFinals),
            Milestone::ReachedFinal => Some(Round::SemiFinals),
            _ => Some(Round::FinalRound),
        }
    }

    /// Milestone earned by the winners of `round`, if any.
    fn won(round: Round) -> Option<Milestone> {
        match round {
            Round::RoundOf16 => Some(Milestone::WonRoundOf16),
            Round::QuarterFinals => Some(Milestone::WonQuarterFinal),
            Round::SemiFinals => Some(Milestone::ReachedFinal),
            Round::FinalRound => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
/// How much of the bracket an outcome key describes.
pub enum OutcomeDepth {
    /// Champion, runner-up and semi-final losers.
    Semis,
    /// Adds the quarter-final losers.
    Quarters,
    /// Adds the round-of-16 losers.
    Full,
}

impl OutcomeDepth {
    pub const ALL: [OutcomeDepth; 3] = [
        OutcomeDepth::Semis,
        OutcomeDepth::Quarters,
        OutcomeDepth::Full,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Earliest round the key mentions. The depth is only tracked when it was simulated.
    #[inline]
    pub fn earliest_round(self) -> Round {
        match self {
            OutcomeDepth::Semis => Round::SemiFinals,
            OutcomeDepth::Quarters => Round::QuarterFinals,
            OutcomeDepth::Full => Round::RoundOf16,
        }
    }
}

impl Display for OutcomeDepth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OutcomeDepth::Semis => "semi-finals",
            OutcomeDepth::Quarters => "quarter-finals",
            OutcomeDepth::Full => "round of 16",
        })
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
/// Counts per value, with everything past the last bin in `overflow`.
pub struct Histogram {
    pub bins: [u64; GOAL_BINS],
    pub overflow: u64,
}

impl Histogram {
    #[inline]
    pub fn fill(&mut self, value: u32) {
        match self.bins.get_mut(value as usize) {
            Some(bin) => *bin += 1,
            None => self.overflow += 1,
        }
    }

    pub fn merge(&mut self, other: &Histogram) {
        for (bin, add) in self.bins.iter_mut().zip(other.bins) {
            *bin += add;
        }
        self.overflow += other.overflow;
    }

    #[inline]
    pub fn entries(&self) -> u64 {
        self.bins.iter().sum::<u64>() + self.overflow
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
/// Scorelines of one pairing, indexed by home goals then away goals.
pub struct ScorelineTable {
    pub counts: [[u64; SCORELINE_GOALS]; SCORELINE_GOALS],
    /// Scorelines past the table, split into home wins, draws and away wins.
    pub overflow: [u64; 3],
}

impl ScorelineTable {
    #[inline]
    pub fn fill(&mut self, score: Score) {
        match self
            .counts
            .get_mut(score.home as usize)
            .and_then(|row| row.get_mut(score.away as usize))
        {
            Some(count) => *count += 1,
            None => self.overflow[result_index(score.home as usize, score.away as usize)] += 1,
        }
    }

    pub fn merge(&mut self, other: &ScorelineTable) {
        for (row, add) in self.counts.iter_mut().zip(&other.counts) {
            for (count, add) in row.iter_mut().zip(add) {
                *count += add;
            }
        }
        for (count, add) in self.overflow.iter_mut().zip(other.overflow) {
            *count += add;
        }
    }

    /// Times `score` was recorded, zero when it lies past the table.
    #[inline]
    pub fn count(&self, score: Score) -> u64 {
        self.counts
            .get(score.home as usize)
            .and_then(|row| row.get(score.away as usize))
            .copied()
            .unwrap_or(0)
    }

    /// Number of matches recorded, overflow included.
    #[inline]
    pub fn entries(&self) -> u64 {
        self.counts.iter().flatten().sum::<u64>() + self.overflow.iter().sum::<u64>()
    }

    /// Home wins, draws and away wins, overflow included.
    pub fn results(&self) -> [u64; 3] {
        let mut results = self.overflow;
        for (home, row) in self.counts.iter().enumerate() {
            for (away, count) in row.iter().enumerate() {
                results[result_index(home, away)] += count;
            }
        }
        results
    }

    /// The most frequent tabulated scoreline. Ties go to the fewest goals.
    pub fn most_likely(&self) -> Option<(Score, u64)> {
        (0..SCORELINE_GOALS)
            .cartesian_product(0..SCORELINE_GOALS)
            .map(|(home, away)| (Score::new(home as u32, away as u32), self.counts[home][away]))
            .filter(|&(_, count)| count > 0)
            .min_by_key(|&(score, count)| (std::cmp::Reverse(count), score.total(), score.home))
    }
}

/// 0 for a home win, 1 for a draw, 2 for an away win.
#[inline]
fn result_index(home: usize, away: usize) -> usize {
    match home.cmp(&away) {
        Ordering::Greater => 0,
        Ordering::Equal => 1,
        Ordering::Less => 2,
    }
}

const TEAM_OUTSIDE_TALLY: InvariantViolation = InvariantViolation::TallyShape("teams");

/// Everything collected over a run.
///
/// A tally is owned by the caller, filled by [`Tournament`] trials and combined with [`Tally::merge`].
#[derive(Clone, Debug, PartialEq)]
pub struct Tally {
    trials: u64,
    milestones: Vec<[u64; Milestone::COUNT]>,
    goals_scored: Vec<u64>,
    /// Per group: member slot x finishing position.
    group_positions: Vec<[[u64; TEAMS_PER_GROUP]; TEAMS_PER_GROUP]>,
    total_goals: Histogram,
    goal_margin: Histogram,
    scorelines: IndexMap<(TeamId, TeamId), ScorelineTable>,
    outcomes: [IndexMap<String, u64>; 3],
    record_scorelines: bool,
    track_outcomes: bool,
}

impl Tally {
    pub fn new(team_count: usize, group_count: usize) -> Tally {
        Tally {
            trials: 0,
            milestones: vec![[0; Milestone::COUNT]; team_count],
            goals_scored: vec![0; team_count],
            group_positions: vec![[[0; TEAMS_PER_GROUP]; TEAMS_PER_GROUP]; group_count],
            total_goals: Histogram::default(),
            goal_margin: Histogram::default(),
            scorelines: IndexMap::new(),
            outcomes: Default::default(),
            record_scorelines: true,
            track_outcomes: true,
        }
    }

    /// Creates an empty tally shaped for `tournament`.
    #[inline]
    pub fn for_tournament(tournament: &Tournament) -> Tally {
        Tally::new(tournament.teams().len(), tournament.groups().len())
    }

    /// Switches the optional tables on or off.
    #[inline]
    pub fn with_options(mut self, record_scorelines: bool, track_outcomes: bool) -> Tally {
        self.record_scorelines = record_scorelines;
        self.track_outcomes = track_outcomes;
        self
    }

    /// Zeroes every count, keeping the shape and the options.
    pub fn clear(&mut self) {
        let options = (self.record_scorelines, self.track_outcomes);
        *self = Tally::new(self.milestones.len(), self.group_positions.len())
            .with_options(options.0, options.1);
    }

    /// Records a played match. Scorelines are kept for the opening round only.
    ///
    /// Fails without recording anything if a team lies outside the tally.
    pub fn record_match(
        &mut self,
        home: TeamId,
        away: TeamId,
        score: Score,
        opening_round: bool,
    ) -> Result<(), InvariantViolation> {
        let teams = self.goals_scored.len();
        if home.index() >= teams || away.index() >= teams {
            return Err(TEAM_OUTSIDE_TALLY);
        }

        self.goals_scored[home.index()] += score.home as u64;
        self.goals_scored[away.index()] += score.away as u64;
        self.total_goals.fill(score.total());
        self.goal_margin.fill(score.margin());
        if opening_round && self.record_scorelines {
            self.scorelines.entry((home, away)).or_default().fill(score);
        }
        Ok(())
    }

    /// Records the milestones and the bracket outcome of a completed trial.
    pub fn record_trial(
        &mut self,
        outcome: &TrialOutcome,
        tournament: &Tournament,
    ) -> Result<(), InvariantViolation> {
        let teams = self.milestones.len();
        let mut awarded = outcome
            .groups
            .iter()
            .flat_map(|placement| placement.iter().copied())
            .chain(outcome.rounds.iter().flat_map(|r| r.fixtures.iter().map(|f| f.winner)))
            .chain(outcome.final_positions.teams());
        if awarded.any(|team| team.index() >= teams) {
            return Err(TEAM_OUTSIDE_TALLY);
        }

        for (index, placement) in outcome.groups.iter().enumerate() {
            let group = tournament
                .groups()
                .get(index)
                .ok_or(InvariantViolation::TallyShape("group outside the tournament"))?;
            let positions = self
                .group_positions
                .get_mut(index)
                .ok_or(InvariantViolation::TallyShape("groups"))?;
            for (position, &team) in placement.iter().enumerate() {
                let slot = group
                    .slot_of(team)
                    .ok_or(InvariantViolation::InternalError("placed team outside its group"))?;
                positions[slot][position] += 1;
            }
            for &team in &placement[..2] {
                self.milestones[team.index()][Milestone::QualifiedFromGroup.index()] += 1;
            }
        }

        for round in &outcome.rounds {
            if let Some(milestone) = Milestone::won(round.round) {
                for fixture in &round.fixtures {
                    self.milestones[fixture.winner.index()][milestone.index()] += 1;
                }
            }
        }

        let positions = outcome.final_positions;
        for (team, milestone) in positions.teams().into_iter().zip([
            Milestone::Champion,
            Milestone::RunnerUp,
            Milestone::ThirdPlace,
            Milestone::FourthPlace,
        ]) {
            self.milestones[team.index()][milestone.index()] += 1;
        }

        if self.track_outcomes {
            for depth in OutcomeDepth::ALL {
                if let Some(key) = outcome_key(outcome, depth, tournament.teams()) {
                    *self.outcomes[depth.index()].entry(key).or_default() += 1;
                }
            }
        }

        self.trials += 1;
        Ok(())
    }

    /// Adds every count of `other`. Both tallies must have the same shape.
    pub fn merge(&mut self, other: Tally) -> Result<(), InvariantViolation> {
        if self.milestones.len() != other.milestones.len() {
            return Err(InvariantViolation::TallyShape("teams"));
        }
        if self.group_positions.len() != other.group_positions.len() {
            return Err(InvariantViolation::TallyShape("groups"));
        }

        self.trials += other.trials;
        for (counts, add) in self.milestones.iter_mut().zip(&other.milestones) {
            for (count, add) in counts.iter_mut().zip(add) {
                *count += add;
            }
        }
        for (goals, add) in self.goals_scored.iter_mut().zip(&other.goals_scored) {
            *goals += add;
        }
        for (table, add) in self.group_positions.iter_mut().zip(&other.group_positions) {
            for (count, add) in table.iter_mut().flatten().zip(add.iter().flatten()) {
                *count += add;
            }
        }
        self.total_goals.merge(&other.total_goals);
        self.goal_margin.merge(&other.goal_margin);
        for (pairing, table) in other.scorelines {
            self.scorelines.entry(pairing).or_default().merge(&table);
        }
        for (outcomes, add) in self.outcomes.iter_mut().zip(other.outcomes) {
            for (key, count) in add {
                *outcomes.entry(key).or_default() += count;
            }
        }
        Ok(())
    }

    /// Number of completed trials.
    #[inline]
    pub fn trials(&self) -> u64 {
        self.trials
    }

    /// Number of teams the tally was shaped for.
    #[inline]
    pub fn team_count(&self) -> usize {
        self.milestones.len()
    }

    /// Trials in which `team` reached `milestone`. Zero for a team outside the tally.
    #[inline]
    pub fn milestone(&self, team: TeamId, milestone: Milestone) -> u64 {
        self.milestones
            .get(team.index())
            .map_or(0, |counts| counts[milestone.index()])
    }

    /// Fraction of the trials in which `team` reached `milestone`.
    pub fn probability(&self, team: TeamId, milestone: Milestone) -> f64 {
        if self.trials == 0 {
            return 0.0;
        }
        self.milestone(team, milestone) as f64 / self.trials as f64
    }

    /// Goals `team` scored over every trial.
    #[inline]
    pub fn goals_scored(&self, team: TeamId) -> u64 {
        self.goals_scored.get(team.index()).copied().unwrap_or(0)
    }

    /// Member slot x finishing position counts of a group.
    #[inline]
    pub fn group_positions(&self, group: usize) -> Option<&[[u64; TEAMS_PER_GROUP]; TEAMS_PER_GROUP]> {
        self.group_positions.get(group)
    }

    /// Goals per match, both sides together.
    #[inline]
    pub fn total_goals(&self) -> &Histogram {
        &self.total_goals
    }

    /// Absolute goal difference per match.
    #[inline]
    pub fn goal_margin(&self) -> &Histogram {
        &self.goal_margin
    }

    /// Scoreline tables of the opening round, keyed by (home, away).
    #[inline]
    pub fn scorelines(&self) -> &IndexMap<(TeamId, TeamId), ScorelineTable> {
        &self.scorelines
    }

    /// Bracket outcome keys at `depth` with their counts, in first-seen order.
    #[inline]
    pub fn outcomes(&self, depth: OutcomeDepth) -> &IndexMap<String, u64> {
        &self.outcomes[depth.index()]
    }

    /// The `n` most frequent outcomes at `depth`, most frequent first.
    pub fn most_common_outcomes(&self, depth: OutcomeDepth, n: usize) -> Vec<(&str, u64)> {
        self.outcomes(depth)
            .iter()
            .map(|(key, &count)| (key.as_str(), count))
            .sorted_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)))
            .take(n)
            .collect()
    }
}

/// Key of a bracket outcome, or `None` when a round it mentions was not simulated.
fn outcome_key(outcome: &TrialOutcome, depth: OutcomeDepth, teams: &Teams) -> Option<String> {
    let abbreviation = move |team: TeamId| teams[team].abbreviation();
    let losers = |round: &RoundResult| {
        round
            .fixtures
            .iter()
            .map(|f| abbreviation(f.loser))
            .sorted_unstable()
            .join("_")
    };

    outcome.round(depth.earliest_round())?;
    let positions = outcome.final_positions;
    let mut key = format!(
        "{}/{}/{}",
        abbreviation(positions.champion),
        abbreviation(positions.runner_up),
        [abbreviation(positions.third), abbreviation(positions.fourth)]
            .iter()
            .sorted_unstable()
            .join("_")
    );
    for round in [Round::QuarterFinals, Round::RoundOf16] {
        if depth.earliest_round() > round {
            break;
        }
        key.push('/');
        key.push_str(&losers(outcome.round(round)?));
    }
    Some(key)
}
