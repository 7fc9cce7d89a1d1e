use crate::teams::{TeamId, Teams};
use crate::InvariantViolation;
use itertools::Itertools;
use std::collections::HashSet;
use std::fmt::{Display, Formatter};

/// Number of teams per group.
pub const TEAMS_PER_GROUP: usize = 4;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
/// Position of a group inside the tournament.
pub struct GroupId {
    index: usize,
}

impl GroupId {
    #[inline]
    pub fn new(index: usize) -> Self {
        GroupId { index }
    }

    #[inline]
    pub fn index(self) -> usize {
        self.index
    }
}

/// Groups are lettered in listing order: `A`, `B`, ... Past `Z` the index is shown.
impl Display for GroupId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match u8::try_from(self.index) {
            Ok(index) if index < 26 => write!(f, "{}", char::from(b'A' + index)),
            _ => write!(f, "#{}", self.index),
        }
    }
}

/// A group of the group stage.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Group {
    label: String,
    teams: [TeamId; TEAMS_PER_GROUP],
}

impl Group {
    /// Creates a new group. Fails unless exactly [`TEAMS_PER_GROUP`] teams are provided.
    pub fn new(label: impl Into<String>, teams: Vec<TeamId>) -> Result<Group, InvariantViolation> {
        let label = label.into();
        let teams = <[TeamId; TEAMS_PER_GROUP]>::try_from(teams).map_err(|teams| {
            InvariantViolation::GroupSize {
                group: label.clone(),
                size: teams.len(),
                expected: TEAMS_PER_GROUP,
            }
        })?;
        Ok(Group { label, teams })
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The members, in the order they were listed.
    #[inline]
    pub fn teams(&self) -> &[TeamId; TEAMS_PER_GROUP] {
        &self.teams
    }

    /// Position of `team` in the member list.
    #[inline]
    pub fn slot_of(&self, team: TeamId) -> Option<usize> {
        self.teams.iter().position(|&t| t == team)
    }

    /// Round-robin fixtures: every pair plays once, the earlier-listed team at home.
    pub fn fixtures(&self) -> impl Iterator<Item = (TeamId, TeamId)> + '_ {
        self.teams.iter().copied().tuple_combinations()
    }
}

/// Checks that no team is a member of two groups.
pub fn check_disjoint(groups: &[Group], teams: &Teams) -> Result<(), InvariantViolation> {
    let mut seen = HashSet::with_capacity(groups.len() * TEAMS_PER_GROUP);
    for team in groups.iter().flat_map(|g| g.teams.iter()) {
        if !seen.insert(*team) {
            let name = teams
                .get(*team)
                .map(|t| t.name().to_owned())
                .unwrap_or_else(|| format!("#{}", team.index()));
            return Err(InvariantViolation::TeamInTwoGroups(name));
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn four_teams() -> (Teams, Vec<TeamId>) {
        let mut teams = Teams::new();
        let ids = ["A", "B", "C", "D"]
            .iter()
            .enumerate()
            .map(|(i, name)| teams.add(*name, *name, i as u32).unwrap())
            .collect();
        (teams, ids)
    }

    #[test]
    fn test_fixtures() {
        let (_, ids) = four_teams();
        let group = Group::new("A", ids.clone()).unwrap();
        let fixtures: Vec<_> = group.fixtures().collect();

        assert_eq!(fixtures.len(), 6);
        assert_eq!(fixtures[0], (ids[0], ids[1]));
        assert_eq!(fixtures[5], (ids[2], ids[3]));
        for team in &ids {
            let played = fixtures
                .iter()
                .filter(|(home, away)| home == team || away == team)
                .count();
            assert_eq!(played, 3);
        }
    }

    #[test]
    fn test_group_size() {
        let (_, ids) = four_teams();
        let error = Group::new("B", ids[..3].to_vec()).unwrap_err();
        assert_eq!(
            error,
            InvariantViolation::GroupSize {
                group: "B".to_owned(),
                size: 3,
                expected: 4
            }
        );
    }

    #[test]
    fn test_disjoint() {
        let (teams, ids) = four_teams();
        let a = Group::new("A", ids.clone()).unwrap();
        let b = Group::new("B", vec![ids[3], ids[2], ids[1], ids[0]]).unwrap();
        assert!(check_disjoint(std::slice::from_ref(&a), &teams).is_ok());
        assert_eq!(
            check_disjoint(&[a, b], &teams),
            Err(InvariantViolation::TeamInTwoGroups("D".to_owned()))
        );
        assert_eq!(
            Group::new("A", ids.clone()).unwrap().slot_of(ids[2]),
            Some(2)
        );
    }
}
