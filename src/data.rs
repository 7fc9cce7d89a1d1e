//! Loaders for the plain-text input files.
//!
//! Every file is whitespace-delimited. Blank lines and lines starting with `#` are
//! skipped, and the first `-` of every field stands for a space (`Saudi-Arabia`).

use crate::bracket::BracketTable;
use crate::groups::{Group, TEAMS_PER_GROUP};
use crate::standings::TieBreakPolicy;
use crate::teams::{TeamId, Teams};
use crate::tournament::Tournament;
use crate::{ConfigError, Error};
use log::debug;
use std::path::Path;

/// Splits `text` into records: (1-based line number, fields).
pub fn read_fields(text: &str) -> impl Iterator<Item = (usize, Vec<String>)> + '_ {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(number, line)| {
            let fields = line
                .split_whitespace()
                .map(|field| field.replacen('-', " ", 1))
                .collect();
            (number, fields)
        })
}

/// Parses a team file: `name abbreviation [rank]` per line.
///
/// Without the rank column, the rank is the position of the team in the file.
pub fn parse_teams(text: &str, what: &str) -> Result<Teams, ConfigError> {
    let mut teams = Teams::new();
    for (position, (line, fields)) in read_fields(text).enumerate() {
        let malformed = |reason: String| ConfigError::MalformedLine {
            what: what.to_owned(),
            line,
            reason,
        };
        let (name, abbreviation, rank) = match fields.as_slice() {
            [name, abbreviation] => (name, abbreviation, position as u32),
            [name, abbreviation, rank] => {
                let rank = rank
                    .parse::<u32>()
                    .map_err(|e| malformed(format!("invalid rank {rank:?}: {e}")))?;
                (name, abbreviation, rank)
            }
            _ => {
                return Err(malformed(format!(
                    "expected a name, an abbreviation and an optional rank, found {} fields",
                    fields.len()
                )))
            }
        };
        teams.add(name.as_str(), abbreviation.as_str(), rank)?;
    }

    debug!("loaded {} teams from {what}", teams.len());
    Ok(teams)
}

/// Parses a group file: `label team1 team2 team3 team4` per line.
pub fn parse_groups(text: &str, what: &str, teams: &Teams) -> Result<Vec<Group>, Error> {
    let mut groups = Vec::new();
    for (line, fields) in read_fields(text) {
        let Some((label, members)) = fields.split_first() else {
            continue;
        };
        if members.len() != TEAMS_PER_GROUP {
            return Err(ConfigError::MalformedLine {
                what: what.to_owned(),
                line,
                reason: format!(
                    "group {label} lists {} teams ({TEAMS_PER_GROUP} expected)",
                    members.len()
                ),
            }
            .into());
        }
        let members = members
            .iter()
            .map(|name| teams.lookup(name))
            .collect::<Result<Vec<_>, _>>()?;
        groups.push(Group::new(label.as_str(), members)?);
    }

    debug!("loaded {} groups from {what}", groups.len());
    Ok(groups)
}

/// Parses a resume list: one team per line, first field only.
pub fn parse_team_list(text: &str, what: &str, teams: &Teams) -> Result<Vec<TeamId>, ConfigError> {
    let list = read_fields(text)
        .filter_map(|(_, fields)| fields.into_iter().next())
        .map(|name| teams.lookup(&name))
        .collect::<Result<Vec<_>, _>>()?;

    debug!("loaded {} teams to resume with from {what}", list.len());
    Ok(list)
}

pub fn load_teams(path: impl AsRef<Path>) -> Result<Teams, ConfigError> {
    let path = path.as_ref();
    parse_teams(&read(path)?, &path.display().to_string())
}

pub fn load_groups(path: impl AsRef<Path>, teams: &Teams) -> Result<Vec<Group>, Error> {
    let path = path.as_ref();
    parse_groups(&read(path)?, &path.display().to_string(), teams)
}

pub fn load_team_list(path: impl AsRef<Path>, teams: &Teams) -> Result<Vec<TeamId>, ConfigError> {
    let path = path.as_ref();
    parse_team_list(&read(path)?, &path.display().to_string(), teams)
}

/// Loads a tournament played on the standard bracket. Without a group file, only
/// resumed runs are possible.
pub fn load_tournament(
    teams_path: impl AsRef<Path>,
    groups_path: Option<&Path>,
    policy: TieBreakPolicy,
) -> Result<Tournament, Error> {
    let teams = load_teams(teams_path)?;
    let groups = match groups_path {
        Some(path) => load_groups(path, &teams)?,
        None => Vec::new(),
    };
    Tournament::new(teams, groups, BracketTable::world_cup(), policy)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_owned(),
        source,
    })
}

/// The 2022 data shipped with the crate.
#[cfg(test)]
pub(crate) mod test_data {
    use super::*;

    pub const TEAMS: &str = include_str!("../data/wc_2022_team_ranks.txt");
    pub const GROUPS: &str = include_str!("../data/wc_2022_groups.txt");
    pub const PASSED_GROUP_STAGE: &str = include_str!("../data/wc_2022_pass_groups.txt");

    pub fn world_cup_2022() -> Tournament {
        let teams = parse_teams(TEAMS, "teams").unwrap();
        let groups = parse_groups(GROUPS, "groups", &teams).unwrap();
        Tournament::new(
            teams,
            groups,
            BracketTable::world_cup(),
            TieBreakPolicy::default(),
        )
        .unwrap()
    }

    /// The sixteen teams that left the 2022 group stage, in resume order.
    pub fn passed_group_stage(tournament: &Tournament) -> Vec<TeamId> {
        parse_team_list(PASSED_GROUP_STAGE, "passed", tournament.teams()).unwrap()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::InvariantViolation;
    use std::io::Write;

    #[test]
    fn test_read_fields() {
        let text = "# comment\n\nSaudi-Arabia KSA\n  Costa-Rica   CRC 24 \nBosnia-and-Herzegovina BIH\n";
        let records: Vec<_> = read_fields(text).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], (3, vec!["Saudi Arabia".to_owned(), "KSA".to_owned()]));
        assert_eq!(records[1].1, vec!["Costa Rica", "CRC", "24"]);
        // Only the first dash is replaced
        assert_eq!(records[2].1[0], "Bosnia and-Herzegovina");
    }

    #[test]
    fn test_shipped_data() {
        let tournament = test_data::world_cup_2022();
        let teams = tournament.teams();
        assert_eq!(teams.len(), 32);
        assert_eq!(tournament.groups().len(), 8);

        let brazil = teams.lookup("Brazil").unwrap();
        assert_eq!(teams[brazil].rank(), 0);
        let ghana = teams.lookup("Ghana").unwrap();
        assert_eq!(teams[ghana].rank(), 31);
        let saudi = teams.lookup("Saudi Arabia").unwrap();
        assert_eq!(teams[saudi].abbreviation(), "KSA");

        let group_c = &tournament.groups()[2];
        assert_eq!(group_c.label(), "C");
        assert!(group_c.slot_of(saudi).is_some());

        let qualified = test_data::passed_group_stage(&tournament);
        assert_eq!(qualified.len(), 16);
        assert_eq!(teams[qualified[15]].name(), "Korea Republic");
    }

    #[test]
    fn test_explicit_ranks() {
        let teams = parse_teams("Alpha ALP 1\nBeta BET 0\n", "teams").unwrap();
        assert_eq!(teams[teams.lookup("Beta").unwrap()].rank(), 0);
        assert_eq!(teams[teams.lookup("Alpha").unwrap()].rank(), 1);
    }

    #[test]
    fn test_malformed_teams() {
        assert!(matches!(
            parse_teams("Alpha ALP\nBeta\n", "teams"),
            Err(ConfigError::MalformedLine { line: 2, .. })
        ));
        assert!(matches!(
            parse_teams("Alpha ALP first\n", "teams"),
            Err(ConfigError::MalformedLine { line: 1, .. })
        ));
        assert!(matches!(
            parse_teams("Alpha ALP\nAlpha AL2\n", "teams"),
            Err(ConfigError::DuplicateTeam(_))
        ));
    }

    #[test]
    fn test_malformed_groups() {
        let teams = parse_teams(test_data::TEAMS, "teams").unwrap();
        assert!(matches!(
            parse_groups("A Qatar Ecuador Senegal\n", "groups", &teams),
            Err(Error::Configuration(ConfigError::MalformedLine { .. }))
        ));
        assert!(matches!(
            parse_groups("A Qatar Ecuador Senegal Atlantis\n", "groups", &teams),
            Err(Error::Configuration(ConfigError::UnknownTeam(name))) if name == "Atlantis"
        ));

        let groups =
            parse_groups("A Qatar Ecuador Senegal Netherlands\nB Qatar Wales USA England\n", "groups", &teams)
                .unwrap();
        let result = Tournament::new(teams, groups, BracketTable::world_cup(), TieBreakPolicy::default());
        assert!(matches!(result, Err(Error::Configuration(ConfigError::GroupCount { .. }))));
    }

    #[test]
    fn test_team_in_two_groups() {
        let teams = parse_teams(test_data::TEAMS, "teams").unwrap();
        let text = test_data::GROUPS.replace("Wales", "Qatar");
        let groups = parse_groups(&text, "groups", &teams).unwrap();
        let result = Tournament::new(teams, groups, BracketTable::world_cup(), TieBreakPolicy::default());
        assert!(matches!(
            result,
            Err(Error::InvariantViolation(InvariantViolation::TeamInTwoGroups(name))) if name == "Qatar"
        ));
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let teams_path = dir.path().join("teams.txt");
        let passed_path = dir.path().join("passed.txt");
        std::fs::write(&teams_path, test_data::TEAMS).unwrap();
        let mut passed = std::fs::File::create(&passed_path).unwrap();
        writeln!(passed, "Argentina\nFrance\nCroatia\nMorocco").unwrap();

        let tournament = load_tournament(&teams_path, None, TieBreakPolicy::Strict).unwrap();
        assert!(tournament.groups().is_empty());
        let list = load_team_list(&passed_path, tournament.teams()).unwrap();
        assert_eq!(list.len(), 4);

        assert!(matches!(
            load_teams(dir.path().join("missing.txt")),
            Err(ConfigError::Io { .. })
        ));
    }
}
