use crate::groups::TEAMS_PER_GROUP;
use crate::match_sim::{Goaliness, Score};
use crate::simulation::{Simulation, StartPoint};
use crate::standings::TieBreakPolicy;
use crate::tally::{Histogram, Milestone, OutcomeDepth, Tally};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;
use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, Serialize)]
/// Summary of a run, ready to be printed or written as JSON.
pub struct Report {
    pub run: RunInfo,
    /// Strongest contenders first.
    pub teams: Vec<TeamRow>,
    /// Empty unless the group stage was simulated.
    pub groups: Vec<GroupRow>,
    pub scorelines: Vec<ScorelineRow>,
    pub total_goals: Distribution,
    pub goal_margin: Distribution,
    /// Only the depths the run could record.
    pub outcomes: Vec<OutcomeRows>,
}

#[derive(Clone, Debug, Serialize)]
/// Settings the run was made with.
pub struct RunInfo {
    pub trials: u64,
    pub base_seed: u64,
    /// Where the trials started, e.g. `full tournament`.
    pub start: String,
    pub goaliness: Goaliness,
    pub tie_breaks: TieBreakPolicy,
}

#[derive(Clone, Debug, Serialize)]
/// Per-team results.
pub struct TeamRow {
    pub name: String,
    pub abbreviation: String,
    pub rank: u32,
    /// Probability of every milestone the run could reach.
    pub milestones: IndexMap<Milestone, f64>,
    /// Goals per trial.
    pub mean_goals: f64,
}

#[derive(Clone, Debug, Serialize)]
/// Finishing positions of one group.
pub struct GroupRow {
    pub label: String,
    /// Per member, in listing order: probability of every finishing position.
    pub positions: IndexMap<String, [f64; TEAMS_PER_GROUP]>,
}

#[derive(Clone, Debug, Serialize)]
/// Result probabilities of one opening-round pairing.
pub struct ScorelineRow {
    pub home: String,
    pub away: String,
    pub most_likely: Option<Score>,
    /// Probability of `most_likely`.
    pub probability: f64,
    /// Win and draw fractions count every match, scorelines past the table included.
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
}

#[derive(Clone, Debug, Serialize)]
/// Normalised goal histogram.
pub struct Distribution {
    /// Fraction of the matches per value, the last entry collecting everything above.
    pub fractions: Vec<f64>,
    pub matches: u64,
}

#[derive(Clone, Debug, Serialize)]
/// Most common bracket outcomes at one depth.
pub struct OutcomeRows {
    pub depth: OutcomeDepth,
    /// Outcome keys with their probability, most likely first.
    pub top: Vec<(String, f64)>,
}

impl Report {
    /// Builds the report of a finished run, keeping the `top` most common outcomes per depth.
    pub fn new(simulation: &Simulation, tally: &Tally, top: usize) -> Report {
        let tournament = simulation.tournament();
        let config = simulation.config();
        let teams = tournament.teams();
        let trials = tally.trials().max(1) as f64;
        let milestones = reachable_milestones(simulation.start());

        let team_rows = teams
            .iter()
            .map(|(id, team)| TeamRow {
                name: team.name().to_owned(),
                abbreviation: team.abbreviation().to_owned(),
                rank: team.rank(),
                milestones: milestones
                    .iter()
                    .map(|&milestone| (milestone, tally.probability(id, milestone)))
                    .collect(),
                mean_goals: tally.goals_scored(id) as f64 / trials,
            })
            .sorted_by(|a, b| {
                let key = |row: &TeamRow| row.milestones.get(&Milestone::Champion).copied();
                key(b)
                    .partial_cmp(&key(a))
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.rank.cmp(&b.rank))
            })
            .collect();

        let simulated_groups: &[_] = match simulation.start() {
            StartPoint::Full => tournament.groups(),
            _ => &[],
        };
        let groups = simulated_groups
            .iter()
            .enumerate()
            .filter_map(|(index, group)| {
                let counts = tally.group_positions(index)?;
                let positions = group
                    .teams()
                    .iter()
                    .zip(counts)
                    .map(|(&team, counts)| (teams[team].name().to_owned(), counts.map(|c| c as f64 / trials)))
                    .collect();
                Some(GroupRow {
                    label: group.label().to_owned(),
                    positions,
                })
            })
            .collect();

        let scorelines = tally
            .scorelines()
            .iter()
            .map(|(&(home, away), table)| {
                let entries = table.entries().max(1) as f64;
                let [home_win, draw, away_win] = table.results().map(|count| count as f64 / entries);
                let most_likely = table.most_likely();
                ScorelineRow {
                    home: teams[home].name().to_owned(),
                    away: teams[away].name().to_owned(),
                    most_likely: most_likely.map(|(score, _)| score),
                    probability: most_likely.map_or(0.0, |(_, count)| count as f64 / entries),
                    home_win,
                    draw,
                    away_win,
                }
            })
            .collect();

        let outcomes = OutcomeDepth::ALL
            .iter()
            .filter(|depth| !tally.outcomes(**depth).is_empty())
            .map(|&depth| OutcomeRows {
                depth,
                top: tally
                    .most_common_outcomes(depth, top)
                    .into_iter()
                    .map(|(key, count)| (key.to_owned(), count as f64 / trials))
                    .collect(),
            })
            .collect();

        Report {
            run: RunInfo {
                trials: tally.trials(),
                base_seed: config.base_seed,
                start: simulation.start().to_string(),
                goaliness: config.goaliness,
                tie_breaks: config.tie_breaks,
            },
            teams: team_rows,
            groups,
            scorelines,
            total_goals: Distribution::from(tally.total_goals()),
            goal_margin: Distribution::from(tally.goal_margin()),
            outcomes,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Milestone probabilities as a text table, strongest contenders first, then the
/// most common outcomes.
impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let columns: Vec<Milestone> = self
            .teams
            .first()
            .map(|row| row.milestones.keys().copied().collect())
            .unwrap_or_default();

        write!(f, "{:<16} {:>4}", "Team", "Rank")?;
        for milestone in &columns {
            write!(f, " {:>7}", milestone.label())?;
        }
        writeln!(f, " {:>6}", "Goals")?;

        for row in &self.teams {
            write!(f, "{:<16} {:>4}", row.name, row.rank)?;
            for probability in row.milestones.values() {
                write!(f, " {:>6.2}%", probability * 100.0)?;
            }
            writeln!(f, " {:>6.2}", row.mean_goals)?;
        }

        for outcomes in &self.outcomes {
            writeln!(f, "\nMost common outcomes down to the {}:", outcomes.depth)?;
            for (key, probability) in &outcomes.top {
                writeln!(f, "  {:>6.3}%  {key}", probability * 100.0)?;
            }
        }
        Ok(())
    }
}

impl From<&Histogram> for Distribution {
    fn from(histogram: &Histogram) -> Self {
        let matches = histogram.entries();
        let total = matches.max(1) as f64;
        Distribution {
            fractions: histogram
                .bins
                .iter()
                .chain(std::iter::once(&histogram.overflow))
                .map(|&count| count as f64 / total)
                .collect(),
            matches,
        }
    }
}

/// Milestones a run starting at `start` can award.
fn reachable_milestones(start: &StartPoint) -> Vec<Milestone> {
    Milestone::ALL
        .into_iter()
        .filter(|milestone| match (milestone.round(), start) {
            (None, StartPoint::Full) => true,
            (None, _) => false,
            (Some(round), start) => round >= start.first_round(),
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::test_data;
    use crate::SimulationConfig;

    fn report(start: StartPoint, trials: u64) -> Report {
        let config = SimulationConfig {
            trials,
            progress_interval: 0,
            ..SimulationConfig::default()
        };
        let simulation = Simulation::new(test_data::world_cup_2022(), start, config).unwrap();
        let tally = simulation.run().unwrap();
        Report::new(&simulation, &tally, 5)
    }

    #[test]
    fn test_full_report() {
        let report = report(StartPoint::Full, 100);
        assert_eq!(report.run.trials, 100);
        assert_eq!(report.teams.len(), 32);
        assert_eq!(report.groups.len(), 8);
        assert_eq!(report.scorelines.len(), 48);
        assert_eq!(report.outcomes.len(), 3);

        let champion: f64 = report
            .teams
            .iter()
            .map(|row| row.milestones[&Milestone::Champion])
            .sum();
        assert!((champion - 1.0).abs() < 1e-9);
        assert!(report
            .teams
            .windows(2)
            .all(|w| w[0].milestones[&Milestone::Champion] >= w[1].milestones[&Milestone::Champion]));

        for group in &report.groups {
            for positions in group.positions.values() {
                assert!((positions.iter().sum::<f64>() - 1.0).abs() < 1e-9);
            }
        }
        for row in &report.scorelines {
            assert!((row.home_win + row.draw + row.away_win - 1.0).abs() < 1e-9);
        }
        assert_eq!(report.total_goals.fractions.len(), 10);
        assert_eq!(report.total_goals.matches, 6400);

        let table = report.to_string();
        assert!(table.starts_with("Team"));
        assert!(table.contains("Brazil"));

        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["teams"][0]["milestones"]["champion"].is_number());
        assert_eq!(value["run"]["tie_breaks"], "name_fallback");
    }

    #[test]
    fn test_resumed_report() {
        let tournament = test_data::world_cup_2022();
        let qualified = test_data::passed_group_stage(&tournament);
        let start = StartPoint::AfterQuarterFinals(qualified[..4].to_vec());
        let report = report(start, 50);

        let columns: Vec<_> = report.teams[0].milestones.keys().copied().collect();
        assert_eq!(
            columns,
            vec![
                Milestone::ReachedFinal,
                Milestone::Champion,
                Milestone::RunnerUp,
                Milestone::ThirdPlace,
                Milestone::FourthPlace
            ]
        );
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].depth, OutcomeDepth::Semis);
        assert_eq!(report.scorelines.len(), 2);
        // The tournament has groups, but none were played
        assert!(report.groups.is_empty());
        assert!(report.to_string().starts_with("Team"));
    }
}
