use crate::teams::{Team, TeamId, Teams};
use crate::{Error, InvariantViolation};
use log::warn;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// What to do when two teams are tied on every criterion of [`compare`].
pub enum TieBreakPolicy {
    /// Decide by team name and log a warning.
    #[default]
    NameFallback,
    /// Abort with [`Error::StatisticalDegeneracy`].
    Strict,
}

/// Compares two teams by points, goal difference and goals scored (all descending),
/// then by seed rank (ascending). [`Ordering::Less`] means `a` ranks ahead of `b`.
///
/// Head-to-head results and fair-play points are not taken into account.
#[inline]
pub fn compare(a: &Team, b: &Team) -> Ordering {
    let (a_stats, b_stats) = (a.stats(), b.stats());
    b_stats
        .points
        .cmp(&a_stats.points)
        .then(b_stats.goal_difference.cmp(&a_stats.goal_difference))
        .then(b_stats.goals.cmp(&a_stats.goals))
        .then(a.rank().cmp(&b.rank()))
}

/// Returns the best team among `candidates`.
pub fn best_of(
    candidates: &[TeamId],
    teams: &Teams,
    policy: TieBreakPolicy,
) -> Result<TeamId, Error> {
    let mut iter = candidates.iter().copied();
    let mut best = iter
        .next()
        .ok_or(InvariantViolation::InternalError("no team to rank"))?;

    for candidate in iter {
        let (challenger, holder) = (&teams[candidate], &teams[best]);
        let ordering = match compare(challenger, holder) {
            Ordering::Equal => settle_exact_tie(challenger, holder, policy)?,
            ordering => ordering,
        };
        if ordering == Ordering::Less {
            best = candidate;
        }
    }

    Ok(best)
}

/// Orders `group` best first by extracting the best remaining team until none is left.
///
/// The result does not depend on the order of `group`.
pub fn placements(
    group: &[TeamId],
    teams: &Teams,
    policy: TieBreakPolicy,
) -> Result<Vec<TeamId>, Error> {
    let mut remaining = group.to_vec();
    let mut ordered = Vec::with_capacity(group.len());
    while !remaining.is_empty() {
        let best = best_of(&remaining, teams, policy)?;
        remaining.retain(|&team| team != best);
        ordered.push(best);
    }
    Ok(ordered)
}

fn settle_exact_tie(a: &Team, b: &Team, policy: TieBreakPolicy) -> Result<Ordering, Error> {
    match policy {
        TieBreakPolicy::Strict => Err(Error::StatisticalDegeneracy {
            first: a.name().to_owned(),
            second: b.name().to_owned(),
        }),
        TieBreakPolicy::NameFallback => {
            warn!(
                "{} and {} are tied on every criterion, deciding by name",
                a.name(),
                b.name()
            );
            Ok(a.name().cmp(b.name()))
        }
    }
}
