use crate::teams::Team;
use crate::{ConfigError, Error, InvariantViolation};
use rand::Rng;
use rand_distr::{Distribution, Poisson};
use serde::{Deserialize, Serialize};

/// Largest accepted `high / low` ratio of [`Goaliness`].
pub const MAX_GOALINESS_RATIO: f64 = 1000.0;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Bounds of the scoring-rate model.
///
/// Calibrated against the goal distributions of past tournaments.
pub struct Goaliness {
    pub low: f64,
    pub high: f64,
}

impl Goaliness {
    /// Creates validated bounds.
    #[inline]
    pub fn new(low: f64, high: f64) -> Result<Goaliness, ConfigError> {
        let goaliness = Goaliness { low, high };
        goaliness.validate()?;
        Ok(goaliness)
    }

    /// Both bounds must be finite and strictly positive, otherwise the damping loop
    /// never ends or the Poisson mean leaves its domain.
    ///
    /// Damping takes about `2 * high / low` steps per match, so `high` may be at most
    /// [`MAX_GOALINESS_RATIO`] times `low`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if valid(self.low) && valid(self.high) && self.high <= self.low * MAX_GOALINESS_RATIO {
            Ok(())
        } else {
            Err(ConfigError::InvalidGoaliness {
                low: self.low,
                high: self.high,
            })
        }
    }

    /// Expected score of a team before damping.
    #[inline]
    pub fn base_score(&self, rank: u32, total_teams: usize) -> f64 {
        let total = total_teams as f64;
        let reduction = total / self.high;
        self.low + (total - rank as f64) / reduction
    }
}

impl Default for Goaliness {
    #[inline]
    fn default() -> Self {
        Goaliness {
            low: 1.53,
            high: 1.54,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
/// Goals scored by both sides of a match.
pub struct Score {
    pub home: u32,
    pub away: u32,
}

impl Score {
    #[inline]
    pub fn new(home: u32, away: u32) -> Self {
        Score { home, away }
    }

    #[inline]
    pub fn total(&self) -> u32 {
        self.home + self.away
    }

    #[inline]
    pub fn margin(&self) -> u32 {
        self.home.abs_diff(self.away)
    }

    #[inline]
    pub fn is_draw(&self) -> bool {
        self.home == self.away
    }
}

/// Produces match results.
pub trait MatchModel {
    /// Plays a match between `home` and `away`.
    fn play(&mut self, home: &Team, away: &Team) -> Result<Score, Error>;
}

/// Damped Poisson model driven by the teams' seed ranks.
#[derive(Debug, Clone)]
pub struct PoissonModel<R: Rng> {
    goaliness: Goaliness,
    total_teams: usize,
    rng: R,
}

impl<R: Rng> PoissonModel<R> {
    #[inline]
    pub fn new(goaliness: Goaliness, total_teams: usize, rng: R) -> PoissonModel<R> {
        PoissonModel {
            goaliness,
            total_teams,
            rng,
        }
    }

    /// Expected scores of both sides after damping.
    ///
    /// Both scores are lowered by uniform noise (scaled by `low`) until at least one
    /// of them reaches `low`. The rule is a calibrated heuristic, not a statistical model.
    pub fn damped_scores(&mut self, home_rank: u32, away_rank: u32) -> (f64, f64) {
        let low = self.goaliness.low;
        let mut home = self.goaliness.base_score(home_rank, self.total_teams);
        let mut away = self.goaliness.base_score(away_rank, self.total_teams);
        while home > low && away > low {
            home -= self.rng.gen::<f64>() * low;
            away -= self.rng.gen::<f64>() * low;
        }
        (home, away)
    }
}

impl<R: Rng> MatchModel for PoissonModel<R> {
    fn play(&mut self, home: &Team, away: &Team) -> Result<Score, Error> {
        let (home_mean, away_mean) = self.damped_scores(home.rank(), away.rank());
        let home_goals = poisson_goals(home_mean, &mut self.rng)?;
        let away_goals = poisson_goals(away_mean, &mut self.rng)?;
        Ok(Score::new(home_goals, away_goals))
    }
}

fn poisson_goals(mean: f64, rng: &mut impl Rng) -> Result<u32, InvariantViolation> {
    let poisson = Poisson::new(mean).map_err(|_| InvariantViolation::InvalidScoringRate(mean))?;
    let goals: f64 = poisson.sample(rng);
    Ok(goals as u32)
}

// TRAIT DEFAULT IMPLEMENTATIONS

impl<M: MatchModel + ?Sized> MatchModel for &mut M {
    #[inline]
    fn play(&mut self, home: &Team, away: &Team) -> Result<Score, Error> {
        (**self).play(home, away)
    }
}

impl<M: MatchModel + ?Sized> MatchModel for Box<M> {
    #[inline]
    fn play(&mut self, home: &Team, away: &Team) -> Result<Score, Error> {
        (**self).play(home, away)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::teams::Teams;
    use crate::{RandGen, Seeder};

    fn ranked_teams() -> Teams {
        let mut teams = Teams::new();
        for (rank, name) in ["A", "B", "C", "D"].iter().enumerate() {
            teams.add(*name, *name, rank as u32).unwrap();
        }
        teams
    }

    #[test]
    fn test_goaliness_validation() {
        assert!(Goaliness::new(1.5, 3.0).is_ok());
        assert!(Goaliness::new(0.0, 3.0).is_err());
        assert!(Goaliness::new(1.5, -1.0).is_err());
        assert!(Goaliness::new(f64::NAN, 3.0).is_err());
        assert!(Goaliness::default().validate().is_ok());
    }

    #[test]
    fn test_goaliness_ratio_bound() {
        // A vanishing low bound would take billions of damping steps per match
        assert!(matches!(
            Goaliness::new(1e-9, 1.54),
            Err(ConfigError::InvalidGoaliness { .. })
        ));
        assert!(Goaliness::new(0.01, 9.5).is_ok());
        assert!(Goaliness::new(0.01, 10.5).is_err());
        assert!(Goaliness::new(1e-6, 1e-4).is_ok());
    }

    #[test]
    fn test_base_score() {
        let goaliness = Goaliness::new(1.5, 3.0).unwrap();
        // Strongest team of 21: 1.5 + 21 / (21 / 3)
        assert!((goaliness.base_score(0, 21) - 4.5).abs() < 1e-12);
        assert!(goaliness.base_score(1, 21) > goaliness.base_score(5, 21));
        assert!(goaliness.base_score(20, 21) > goaliness.low);
    }

    #[test]
    fn test_damping_stops_at_low() {
        let goaliness = Goaliness::new(1.5, 3.0).unwrap();
        let rng: RandGen = Seeder::from(0u64).make_rng();
        let mut model = PoissonModel::new(goaliness, 21, rng);
        for _ in 0..1000 {
            let (home, away) = model.damped_scores(1, 20);
            assert!(home <= 1.5 || away <= 1.5);
            assert!(home > 0.0 && away > 0.0);
        }
    }

    #[test]
    fn test_reproducibility() {
        let teams = ranked_teams();
        let play = |seed: u64| {
            let rng: RandGen = Seeder::from(seed).make_rng();
            let mut model = PoissonModel::new(Goaliness::new(1.5, 3.0).unwrap(), 21, rng);
            (0..20)
                .map(|_| {
                    let home = teams.iter().next().unwrap().1;
                    let away = teams.iter().last().unwrap().1;
                    model.play(home, away).unwrap()
                })
                .collect::<Vec<_>>()
        };

        assert_eq!(play(0), play(0));
        assert_eq!(play(7), play(7));
    }

    #[test]
    fn test_stronger_team_scores_more() {
        let teams = ranked_teams();
        let rng: RandGen = Seeder::from(42u64).make_rng();
        let mut model = PoissonModel::new(Goaliness::default(), teams.len(), rng);
        let (strong, weak) = (teams.iter().next().unwrap().1, teams.iter().last().unwrap().1);

        let (mut strong_goals, mut weak_goals) = (0u64, 0u64);
        for _ in 0..20_000 {
            let score = model.play(strong, weak).unwrap();
            strong_goals += score.home as u64;
            weak_goals += score.away as u64;
        }
        assert!(strong_goals > weak_goals);
    }

    #[test]
    fn test_score() {
        let score = Score::new(1, 3);
        assert_eq!(score.total(), 4);
        assert_eq!(score.margin(), 2);
        assert!(!score.is_draw());
        assert!(Score::new(2, 2).is_draw());
    }
}
