use crate::groups::GroupId;
use crate::InvariantViolation;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// Number of groups of the standard bracket.
pub const WORLD_CUP_GROUPS: usize = 8;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
/// A stage of the tournament.
pub enum Stage {
    GroupStage,
    RoundOf16,
    QuarterFinals,
    SemiFinals,
    ThirdPlacePlayoff,
    Final,
}

impl Stage {
    /// Whether no team advances from this stage.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::ThirdPlacePlayoff | Stage::Final)
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::GroupStage => "group stage",
            Stage::RoundOf16 => "round of 16",
            Stage::QuarterFinals => "quarter-finals",
            Stage::SemiFinals => "semi-finals",
            Stage::ThirdPlacePlayoff => "third-place play-off",
            Stage::Final => "final",
        })
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
/// A knockout round. Points are reset at the start of every round.
pub enum Round {
    RoundOf16,
    QuarterFinals,
    SemiFinals,
    /// Third-place play-off and final.
    FinalRound,
}

impl Round {
    pub const ALL: [Round; 4] = [
        Round::RoundOf16,
        Round::QuarterFinals,
        Round::SemiFinals,
        Round::FinalRound,
    ];

    /// Stages played in this round, in playing order.
    #[inline]
    pub fn stages(self) -> &'static [Stage] {
        match self {
            Round::RoundOf16 => &[Stage::RoundOf16],
            Round::QuarterFinals => &[Stage::QuarterFinals],
            Round::SemiFinals => &[Stage::SemiFinals],
            Round::FinalRound => &[Stage::ThirdPlacePlayoff, Stage::Final],
        }
    }

    #[inline]
    pub fn next(self) -> Option<Round> {
        match self {
            Round::RoundOf16 => Some(Round::QuarterFinals),
            Round::QuarterFinals => Some(Round::SemiFinals),
            Round::SemiFinals => Some(Round::FinalRound),
            Round::FinalRound => None,
        }
    }

    #[inline]
    pub fn of(stage: Stage) -> Option<Round> {
        Round::ALL
            .into_iter()
            .find(|round| round.stages().contains(&stage))
    }
}

impl Display for Round {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Round::FinalRound => f.write_str("final round"),
            round => write!(f, "{}", round.stages()[0]),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
/// A knockout match, labelled by its official match number.
pub struct Fixture {
    pub stage: Stage,
    pub number: u8,
}

impl Fixture {
    #[inline]
    pub const fn new(stage: Stage, number: u8) -> Self {
        Fixture { stage, number }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
/// Where a team entering a fixture comes from.
pub enum Source {
    /// Finishing position (0-based) in a group.
    Group { group: GroupId, position: usize },
    Winner(Fixture),
    Loser(Fixture),
}

impl Display for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Group { group, position } => {
                write!(f, "position {} of group {group}", position + 1)
            }
            Source::Winner(fixture) => write!(f, "winner of match {}", fixture.number),
            Source::Loser(fixture) => write!(f, "loser of match {}", fixture.number),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
/// One of the two places of a fixture. Slot 0 plays at home.
pub struct Slot {
    pub fixture: Fixture,
    pub index: usize,
}

/// Declarative bracket: which fixture slot every source feeds.
#[derive(Clone, Debug)]
pub struct BracketTable {
    routes: Vec<(Source, Slot)>,
    lookup: HashMap<Source, Slot>,
    fixtures: Vec<Fixture>,
    groups: usize,
}

impl BracketTable {
    /// Builds a bracket from its routes and checks it is complete:
    /// - every source is routed at most once;
    /// - every fixture is fed exactly once per slot;
    /// - the winner of every non-terminal fixture goes somewhere;
    /// - the first two of every group go somewhere.
    pub fn new(routes: Vec<(Source, Slot)>, groups: usize) -> Result<Self, InvariantViolation> {
        let mut lookup = HashMap::with_capacity(routes.len());
        let mut feeds: HashMap<Fixture, [usize; 2]> = HashMap::new();

        for &(source, slot) in &routes {
            if lookup.insert(source, slot).is_some() {
                return Err(InvariantViolation::DuplicateSource(source.to_string()));
            }
            let counts = feeds.entry(slot.fixture).or_default();
            match counts.get_mut(slot.index) {
                Some(count) => *count += 1,
                None => {
                    return Err(InvariantViolation::SlotFeed {
                        fixture: slot.fixture.number,
                        slot: slot.index,
                        count: 1,
                    })
                }
            }
        }

        let mut fixtures: Vec<_> = feeds.keys().copied().collect();
        fixtures.sort_unstable();

        for fixture in &fixtures {
            let counts = feeds[fixture];
            if let Some((slot, &count)) = counts.iter().enumerate().find(|&(_, &c)| c != 1) {
                return Err(InvariantViolation::SlotFeed {
                    fixture: fixture.number,
                    slot,
                    count,
                });
            }
            if !fixture.stage.is_terminal() && !lookup.contains_key(&Source::Winner(*fixture)) {
                return Err(InvariantViolation::UnroutedSource(
                    Source::Winner(*fixture).to_string(),
                ));
            }
        }

        for group in (0..groups).map(GroupId::new) {
            for position in 0..2 {
                let source = Source::Group { group, position };
                if !lookup.contains_key(&source) {
                    return Err(InvariantViolation::UnroutedSource(source.to_string()));
                }
            }
        }

        Ok(BracketTable {
            routes,
            lookup,
            fixtures,
            groups,
        })
    }

    /// The 32-team bracket: eight groups, round of 16 (matches 49-56), quarter-finals
    /// (57-60), semi-finals (61-62), third-place play-off (63) and final (64).
    pub fn world_cup() -> BracketTable {
        use Source::{Loser, Winner};
        use Stage::*;

        const fn m(stage: Stage, number: u8) -> Fixture {
            Fixture::new(stage, number)
        }
        let slot = |fixture: Fixture, index: usize| Slot { fixture, index };
        let group = |index: usize, position: usize| Source::Group {
            group: GroupId::new(index),
            position,
        };

        // (group, winner's match, runner-up's match, slot of winner, slot of runner-up)
        let group_routes = [
            (0, 49, 51, 0, 0),
            (1, 51, 49, 1, 1),
            (2, 50, 52, 0, 0),
            (3, 52, 50, 1, 1),
            (4, 53, 55, 0, 0),
            (5, 55, 53, 1, 1),
            (6, 54, 56, 0, 0),
            (7, 56, 54, 1, 1),
        ];

        let mut routes = Vec::with_capacity(32);
        for (g, first, second, first_slot, second_slot) in group_routes {
            routes.push((group(g, 0), slot(m(RoundOf16, first), first_slot)));
            routes.push((group(g, 1), slot(m(RoundOf16, second), second_slot)));
        }
        routes.extend([
            (Winner(m(RoundOf16, 49)), slot(m(QuarterFinals, 57), 0)),
            (Winner(m(RoundOf16, 50)), slot(m(QuarterFinals, 57), 1)),
            (Winner(m(RoundOf16, 51)), slot(m(QuarterFinals, 59), 0)),
            (Winner(m(RoundOf16, 52)), slot(m(QuarterFinals, 59), 1)),
            (Winner(m(RoundOf16, 53)), slot(m(QuarterFinals, 58), 0)),
            (Winner(m(RoundOf16, 54)), slot(m(QuarterFinals, 58), 1)),
            (Winner(m(RoundOf16, 55)), slot(m(QuarterFinals, 60), 0)),
            (Winner(m(RoundOf16, 56)), slot(m(QuarterFinals, 60), 1)),
            (Winner(m(QuarterFinals, 57)), slot(m(SemiFinals, 61), 0)),
            (Winner(m(QuarterFinals, 58)), slot(m(SemiFinals, 61), 1)),
            (Winner(m(QuarterFinals, 59)), slot(m(SemiFinals, 62), 0)),
            (Winner(m(QuarterFinals, 60)), slot(m(SemiFinals, 62), 1)),
            (Winner(m(SemiFinals, 61)), slot(m(Final, 64), 0)),
            (Winner(m(SemiFinals, 62)), slot(m(Final, 64), 1)),
            (Loser(m(SemiFinals, 61)), slot(m(ThirdPlacePlayoff, 63), 0)),
            (Loser(m(SemiFinals, 62)), slot(m(ThirdPlacePlayoff, 63), 1)),
        ]);

        // The routes above are fixed, so this only fails if they are edited wrongly
        match BracketTable::new(routes, WORLD_CUP_GROUPS) {
            Ok(table) => table,
            Err(e) => unreachable!("standard bracket is inconsistent: {e}"),
        }
    }

    /// Number of groups feeding the bracket.
    #[inline]
    pub fn groups(&self) -> usize {
        self.groups
    }

    #[inline]
    pub fn route(&self, source: Source) -> Option<Slot> {
        self.lookup.get(&source).copied()
    }

    /// Fixtures of a round, in playing order.
    pub fn fixtures(&self, round: Round) -> impl Iterator<Item = Fixture> + '_ {
        self.fixtures
            .iter()
            .copied()
            .filter(move |f| round.stages().contains(&f.stage))
    }

    /// Sources feeding `round`, in table order.
    ///
    /// This is the order in which a list of teams resuming at `round` is read.
    pub fn entry_sources(&self, round: Round) -> Vec<Source> {
        self.routes
            .iter()
            .filter(|(_, slot)| round.stages().contains(&slot.fixture.stage))
            .map(|&(source, _)| source)
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_world_cup_table() {
        let table = BracketTable::world_cup();
        assert_eq!(table.groups(), 8);
        assert_eq!(table.fixtures(Round::RoundOf16).count(), 8);
        assert_eq!(table.fixtures(Round::QuarterFinals).count(), 4);
        assert_eq!(table.fixtures(Round::SemiFinals).count(), 2);

        let final_round: Vec<_> = table
            .fixtures(Round::FinalRound)
            .map(|f| f.number)
            .collect();
        assert_eq!(final_round, vec![63, 64]);

        let a_winner = table
            .route(Source::Group {
                group: GroupId::new(0),
                position: 0,
            })
            .unwrap();
        assert_eq!(a_winner.fixture.number, 49);
        let b_runner_up = table
            .route(Source::Group {
                group: GroupId::new(1),
                position: 1,
            })
            .unwrap();
        assert_eq!(b_runner_up.fixture, a_winner.fixture);
        assert_ne!(b_runner_up.index, a_winner.index);
    }

    #[test]
    fn test_entry_sources() {
        let table = BracketTable::world_cup();
        let sixteen = table.entry_sources(Round::RoundOf16);
        assert_eq!(sixteen.len(), 16);
        assert_eq!(
            sixteen[1],
            Source::Group {
                group: GroupId::new(0),
                position: 1
            }
        );

        let eight: Vec<_> = table
            .entry_sources(Round::QuarterFinals)
            .into_iter()
            .map(|s| match s {
                Source::Winner(f) => f.number,
                _ => 0,
            })
            .collect();
        assert_eq!(eight, vec![49, 50, 51, 52, 53, 54, 55, 56]);

        let last = table.entry_sources(Round::FinalRound);
        assert_eq!(
            last,
            vec![
                Source::Winner(Fixture::new(Stage::SemiFinals, 61)),
                Source::Winner(Fixture::new(Stage::SemiFinals, 62)),
                Source::Loser(Fixture::new(Stage::SemiFinals, 61)),
                Source::Loser(Fixture::new(Stage::SemiFinals, 62)),
            ]
        );
    }

    #[test]
    fn test_incomplete_tables() {
        let sf = Fixture::new(Stage::SemiFinals, 61);
        let fin = Fixture::new(Stage::Final, 64);
        let a = |position| Source::Group {
            group: GroupId::new(0),
            position,
        };

        // Slot 1 of the semi-final fed twice
        let routes = vec![
            (a(0), Slot { fixture: sf, index: 1 }),
            (a(1), Slot { fixture: sf, index: 1 }),
            (Source::Winner(sf), Slot { fixture: fin, index: 0 }),
        ];
        assert!(matches!(
            BracketTable::new(routes, 1),
            Err(InvariantViolation::SlotFeed { fixture: 61, .. })
        ));

        // Winner of the semi-final has nowhere to go
        let routes = vec![
            (a(0), Slot { fixture: sf, index: 0 }),
            (a(1), Slot { fixture: sf, index: 1 }),
        ];
        assert!(matches!(
            BracketTable::new(routes, 1),
            Err(InvariantViolation::UnroutedSource(_))
        ));

        // Same source twice
        let routes = vec![
            (a(0), Slot { fixture: sf, index: 0 }),
            (a(0), Slot { fixture: sf, index: 1 }),
        ];
        assert!(matches!(
            BracketTable::new(routes, 1),
            Err(InvariantViolation::DuplicateSource(_))
        ));

        // Group runner-up missing
        let routes = vec![
            (a(0), Slot { fixture: fin, index: 0 }),
            (Source::Loser(sf), Slot { fixture: fin, index: 1 }),
        ];
        assert!(matches!(
            BracketTable::new(routes, 1),
            Err(InvariantViolation::UnroutedSource(source)) if source == "position 2 of group A"
        ));
    }

    #[test]
    fn test_source_names() {
        let source = |group, position| Source::Group {
            group: GroupId::new(group),
            position,
        };
        assert_eq!(source(0, 0).to_string(), "position 1 of group A");
        assert_eq!(source(7, 1).to_string(), "position 2 of group H");
        assert_eq!(source(26, 0).to_string(), "position 1 of group #26");
        assert_eq!(
            Source::Loser(Fixture::new(Stage::SemiFinals, 61)).to_string(),
            "loser of match 61"
        );
    }

    #[test]
    fn test_rounds() {
        assert_eq!(Round::of(Stage::Final), Some(Round::FinalRound));
        assert_eq!(Round::of(Stage::GroupStage), None);
        assert_eq!(Round::RoundOf16.next(), Some(Round::QuarterFinals));
        assert_eq!(Round::FinalRound.next(), None);
        assert_eq!(Round::SemiFinals.to_string(), "semi-finals");
    }
}
