//! Named skill brackets and the role changes needed to reflect them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::ids::RoleId;

/// Skill bracket derived from a display rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// 1333.33 and above.
    Grandmaster,
    /// 1250 and above.
    Legend,
    /// 1166.67 and above.
    Master,
    /// 1083.33 and above.
    Expert,
    /// 1000 and above.
    Distinguished,
    /// 583.33 and above.
    Apprentice,
    /// 500 and above.
    Novice,
    /// 416.67 and above.
    Initiate,
    /// 83.33 and above.
    Rookie,
    /// Everything below.
    Incompetent,
}

/// Tier floors, highest first.
pub const TIER_FLOORS: [(Tier, f64); 10] = [
    (Tier::Grandmaster, 1333.0 + 1.0 / 3.0),
    (Tier::Legend, 1250.0),
    (Tier::Master, 1166.0 + 2.0 / 3.0),
    (Tier::Expert, 1083.0 + 1.0 / 3.0),
    (Tier::Distinguished, 1000.0),
    (Tier::Apprentice, 583.0 + 1.0 / 3.0),
    (Tier::Novice, 500.0),
    (Tier::Initiate, 416.0 + 2.0 / 3.0),
    (Tier::Rookie, 83.0 + 1.0 / 3.0),
    (Tier::Incompetent, 0.0),
];

impl Tier {
    /// Human readable title.
    pub fn title(&self) -> &'static str {
        match self {
            Tier::Grandmaster => "Grandmaster",
            Tier::Legend => "Legend",
            Tier::Master => "Master",
            Tier::Expert => "Expert",
            Tier::Distinguished => "Distinguished",
            Tier::Apprentice => "Apprentice",
            Tier::Novice => "Novice",
            Tier::Initiate => "Initiate",
            Tier::Rookie => "Rookie",
            Tier::Incompetent => "Incompetent",
        }
    }
}

/// Highest tier whose floor does not exceed `rating`; anything lower maps to the last tier.
pub fn floor_tier(rating: f64) -> Tier {
    TIER_FLOORS
        .iter()
        .find(|(_, floor)| *floor <= rating)
        .map(|(tier, _)| *tier)
        .unwrap_or(Tier::Incompetent)
}

/// Role mutations needed so a member holds exactly one tier role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierSync {
    /// Role to grant, if not already held.
    pub add: Option<RoleId>,
    /// Stale tier roles to revoke.
    pub remove: Vec<RoleId>,
}

impl TierSync {
    /// Whether the member already holds exactly the right tier role.
    pub fn is_noop(&self) -> bool {
        self.add.is_none() && self.remove.is_empty()
    }
}

/// Compute the role changes that move a member holding `held` to `target`.
///
/// Returns `None` when no role is configured for `target`.
pub fn plan_tier_sync(
    target: Tier,
    held: &[RoleId],
    tier_roles: &HashMap<Tier, RoleId>,
) -> Option<TierSync> {
    let target_role = *tier_roles.get(&target)?;

    let add = (!held.contains(&target_role)).then_some(target_role);
    let mut remove: Vec<RoleId> = tier_roles
        .values()
        .copied()
        .filter(|role| *role != target_role && held.contains(role))
        .collect();
    remove.sort();

    Some(TierSync { add, remove })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles() -> HashMap<Tier, RoleId> {
        TIER_FLOORS
            .iter()
            .enumerate()
            .map(|(index, (tier, _))| (*tier, RoleId(100 + index as u64)))
            .collect()
    }

    #[test]
    fn floors_pick_highest_threshold_not_above_rating() {
        assert_eq!(floor_tier(2000.0), Tier::Grandmaster);
        assert_eq!(floor_tier(1250.0), Tier::Legend);
        assert_eq!(floor_tier(1249.99), Tier::Master);
        assert_eq!(floor_tier(999.0), Tier::Apprentice);
        assert_eq!(floor_tier(500.0), Tier::Novice);
        assert_eq!(floor_tier(83.4), Tier::Rookie);
        assert_eq!(floor_tier(0.0), Tier::Incompetent);
    }

    #[test]
    fn ratings_below_lowest_floor_map_to_lowest_tier() {
        assert_eq!(floor_tier(-250.0), Tier::Incompetent);
    }

    #[test]
    fn sync_adds_target_and_removes_stale_roles() {
        let roles = roles();
        let novice = roles[&Tier::Novice];
        let rookie = roles[&Tier::Rookie];
        let unrelated = RoleId(7);

        let plan = plan_tier_sync(Tier::Novice, &[rookie, unrelated], &roles).unwrap();
        assert_eq!(plan.add, Some(novice));
        assert_eq!(plan.remove, vec![rookie]);
    }

    #[test]
    fn sync_is_noop_when_target_already_exclusively_held() {
        let roles = roles();
        let novice = roles[&Tier::Novice];

        let plan = plan_tier_sync(Tier::Novice, &[novice, RoleId(7)], &roles).unwrap();
        assert!(plan.is_noop());

        let again = plan_tier_sync(floor_tier(500.0), &[novice, RoleId(7)], &roles).unwrap();
        assert!(again.is_noop());
    }

    #[test]
    fn sync_requires_configured_role() {
        assert!(plan_tier_sync(Tier::Legend, &[], &HashMap::new()).is_none());
    }
}
