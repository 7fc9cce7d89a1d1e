use crate::bracket::Stage;
use crate::teams::TeamId;
use crate::tournament::FixtureResult;
use crate::InvariantViolation;
use itertools::Itertools;

/// Number of final positions decided on the pitch.
pub const DECIDED_POSITIONS: usize = 4;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
/// The first four of a tournament.
pub struct FinalPositions {
    pub champion: TeamId,
    pub runner_up: TeamId,
    pub third: TeamId,
    pub fourth: TeamId,
}

impl FinalPositions {
    /// Evaluates the final positions from the results of the final round
    /// (third-place play-off and final).
    pub fn evaluate(results: &[FixtureResult]) -> Result<FinalPositions, InvariantViolation> {
        let find = |stage| results.iter().find(|r| r.fixture.stage == stage);
        let final_match = find(Stage::Final).ok_or(MISSING_FINAL)?;
        let third_place = find(Stage::ThirdPlacePlayoff).ok_or(MISSING_THIRD_PLACE)?;

        let positions = FinalPositions {
            champion: final_match.winner,
            runner_up: final_match.loser,
            third: third_place.winner,
            fourth: third_place.loser,
        };
        if !positions.teams().iter().all_unique() {
            return Err(InvariantViolation::InternalError(
                "a team holds two final positions",
            ));
        }

        Ok(positions)
    }

    /// The four teams, champion first.
    #[inline]
    pub fn teams(&self) -> [TeamId; DECIDED_POSITIONS] {
        [self.champion, self.runner_up, self.third, self.fourth]
    }

    /// Final position (1-based) of `team`, if it finished in the first four.
    #[inline]
    pub fn position_of(&self, team: TeamId) -> Option<usize> {
        self.teams().iter().position(|&t| t == team).map(|i| i + 1)
    }
}

const MISSING_FINAL: InvariantViolation = InvariantViolation::InternalError("final not played");
const MISSING_THIRD_PLACE: InvariantViolation =
    InvariantViolation::InternalError("third-place play-off not played");

#[cfg(test)]
mod test {
    use super::*;
    use crate::bracket::Fixture;
    use crate::match_sim::Score;

    fn result(stage: Stage, number: u8, winner: usize, loser: usize) -> FixtureResult {
        FixtureResult {
            fixture: Fixture::new(stage, number),
            home: TeamId::new(winner),
            away: TeamId::new(loser),
            score: Score::new(1, 0),
            winner: TeamId::new(winner),
            loser: TeamId::new(loser),
        }
    }

    #[test]
    fn test_final_positions() {
        let results = [
            result(Stage::ThirdPlacePlayoff, 63, 3, 4),
            result(Stage::Final, 64, 2, 1),
        ];
        let positions = FinalPositions::evaluate(&results).unwrap();

        assert_eq!(positions.champion, TeamId::new(2));
        assert_eq!(positions.runner_up, TeamId::new(1));
        assert_eq!(positions.third, TeamId::new(3));
        assert_eq!(positions.fourth, TeamId::new(4));
        assert_eq!(positions.position_of(TeamId::new(3)), Some(3));
        assert_eq!(positions.position_of(TeamId::new(9)), None);
    }

    #[test]
    fn test_missing_and_repeated_teams() {
        let only_final = [result(Stage::Final, 64, 2, 1)];
        assert_eq!(
            FinalPositions::evaluate(&only_final),
            Err(MISSING_THIRD_PLACE)
        );

        let repeated = [
            result(Stage::ThirdPlacePlayoff, 63, 2, 4),
            result(Stage::Final, 64, 2, 1),
        ];
        assert!(FinalPositions::evaluate(&repeated).is_err());
    }
}
