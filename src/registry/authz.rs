//! Capability check applied before every registry mutation.

use crate::auth::Actor;
use crate::errors::ClanError;
use crate::models::{ClanData, ClanRank};

/// What an operation requires of its actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Elevated global privilege only
    Elevated,
    /// Elevated privilege, or the Leader of the target clan
    ElevatedOrLeader,
}

/// Decide whether `actor` may perform an operation needing `capability`.
///
/// `clan` is the target record for clan-scoped operations; leader rank is read
/// from it rather than trusted from the caller.
pub fn authorize(
    capability: Capability,
    actor: &Actor,
    clan: Option<&ClanData>,
    action: &str,
) -> Result<(), ClanError> {
    if actor.elevated {
        return Ok(());
    }

    match capability {
        Capability::Elevated => Err(ClanError::Unauthorized(format!(
            "Access denied: you need elevated privileges to {}.",
            action
        ))),
        Capability::ElevatedOrLeader => {
            let is_leader = clan
                .and_then(|c| c.rank_of(&actor.id))
                .is_some_and(|rank| rank == ClanRank::Leader);
            if is_leader {
                Ok(())
            } else {
                Err(ClanError::Unauthorized(format!(
                    "You must be the clan leader to {}.",
                    action
                )))
            }
        }
    }
}
