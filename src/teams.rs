use crate::ConfigError;
use indexmap::IndexMap;
use log::warn;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::ops::{Index, IndexMut};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
/// A team inside a [`Teams`] registry.
pub struct TeamId {
    index: usize,
}

impl TeamId {
    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        TeamId { index }
    }

    /// Stable position of the team in its registry.
    #[inline]
    pub fn index(self) -> usize {
        self.index
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
/// Per-trial accumulators of a team.
pub struct TeamStats {
    pub points: i32,
    pub goal_difference: i32,
    pub goals: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
/// Which accumulators a reset clears.
pub enum Reset {
    /// Everything, at the start of a trial.
    All,
    /// Points only, between knockout rounds. Goal tallies carry over.
    PointsOnly,
}

#[derive(Clone, Debug)]
/// A team of the tournament.
pub struct Team {
    name: String,
    abbreviation: String,
    rank: u32,
    index: usize,
    stats: TeamStats,
}

impl Team {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn abbreviation(&self) -> &str {
        &self.abbreviation
    }

    /// Seed rank, lower is stronger.
    #[inline]
    pub fn rank(&self) -> u32 {
        self.rank
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Accumulators of the current trial.
    #[inline]
    pub fn stats(&self) -> TeamStats {
        self.stats
    }

    /// Adds the result of a match to the accumulators (3 points for a win, 1 for a draw).
    pub fn record(&mut self, scored: u32, conceded: u32) {
        self.stats.points += match scored.cmp(&conceded) {
            Ordering::Greater => 3,
            Ordering::Equal => 1,
            Ordering::Less => 0,
        };
        self.stats.goals += scored;
        self.stats.goal_difference += scored as i32 - conceded as i32;
    }

    #[inline]
    pub fn reset(&mut self, scope: Reset) {
        match scope {
            Reset::All => self.stats = TeamStats::default(),
            Reset::PointsOnly => self.stats.points = 0,
        }
    }
}

#[derive(Clone, Debug, Default)]
/// Registry of the teams, in load order.
pub struct Teams {
    teams: IndexMap<String, Team>,
}

impl Teams {
    #[inline]
    pub fn new() -> Teams {
        Self {
            teams: IndexMap::with_capacity(32),
        }
    }

    /// Adds a new team to the registry.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        abbreviation: impl Into<String>,
        rank: u32,
    ) -> Result<TeamId, ConfigError> {
        let name = name.into();
        if self.teams.contains_key(&name) {
            return Err(ConfigError::DuplicateTeam(name));
        }

        let index = self.teams.len();
        self.teams.insert(
            name.clone(),
            Team {
                name,
                abbreviation: abbreviation.into(),
                rank,
                index,
                stats: TeamStats::default(),
            },
        );
        Ok(TeamId::new(index))
    }

    /// Checks that every rank lies below the number of teams, since the match model
    /// turns `total - rank` into an expected score.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let total = self.teams.len();
        let mut seen: HashMap<u32, &str> = HashMap::with_capacity(total);
        for team in self.teams.values() {
            if team.rank as usize >= total {
                return Err(ConfigError::RankOutOfRange {
                    team: team.name.clone(),
                    rank: team.rank,
                    total,
                });
            }
            if let Some(other) = seen.insert(team.rank, &team.name) {
                warn!(
                    "teams {other:?} and {:?} share rank {}, ties between them fall back to the name",
                    team.name, team.rank
                );
            }
        }
        Ok(())
    }

    /// Handle of the team called `name`, if registered.
    #[inline]
    pub fn id_of(&self, name: &str) -> Option<TeamId> {
        self.teams.get_index_of(name).map(TeamId::new)
    }

    /// Like [`Teams::id_of`], but an unknown name is a configuration error.
    #[inline]
    pub fn lookup(&self, name: &str) -> Result<TeamId, ConfigError> {
        self.id_of(name)
            .ok_or_else(|| ConfigError::UnknownTeam(name.to_owned()))
    }

    #[inline]
    pub fn get(&self, id: TeamId) -> Option<&Team> {
        self.teams.get_index(id.index).map(|(_, team)| team)
    }

    /// Resets the statistics of every team.
    pub fn reset(&mut self, scope: Reset) {
        for team in self.teams.values_mut() {
            team.reset(scope);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.teams.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Teams with their handles, in load order.
    pub fn iter(&self) -> impl Iterator<Item = (TeamId, &Team)> {
        self.teams
            .values()
            .enumerate()
            .map(|(i, team)| (TeamId::new(i), team))
    }
}

impl Index<TeamId> for Teams {
    type Output = Team;

    #[inline]
    fn index(&self, id: TeamId) -> &Team {
        &self.teams[id.index]
    }
}

impl IndexMut<TeamId> for Teams {
    #[inline]
    fn index_mut(&mut self, id: TeamId) -> &mut Team {
        &mut self.teams[id.index]
    }
}
