//! Clan registry: the rank-gated mutation engine.
//!
//! Every mutation runs validate -> authorize -> mutate -> persist -> report while
//! holding the per-clan lock, so concurrent operations on one clan queue up
//! instead of overwriting each other. Successful mutations are announced in
//! the clan room, written to the modlog and broadcast as [`ClanEvent`]s.

mod authz;
mod locks;

pub use authz::*;
pub use locks::*;

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::audit::AuditSink;
use crate::auth::Actor;
use crate::channels::{ChannelHost, ChannelMetadata};
use crate::db::ClanStore;
use crate::errors::ClanError;
use crate::models::{
    actions, timestamp, to_id, AuditEntry, ClanData, ClanEvent, ClanMember, ClanRank,
};

const EVENT_CAPACITY: usize = 256;

/// Direction of an administrative points adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointsDirection {
    Give,
    Take,
}

/// Owns the clan store and applies all clan state transitions.
pub struct ClanRegistry {
    store: Arc<dyn ClanStore>,
    channels: Arc<dyn ChannelHost>,
    audit: Arc<dyn AuditSink>,
    locks: KeyedLocks,
    events: broadcast::Sender<ClanEvent>,
}

impl ClanRegistry {
    pub fn new(
        store: Arc<dyn ClanStore>,
        channels: Arc<dyn ChannelHost>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            channels,
            audit,
            locks: KeyedLocks::new(),
            events,
        }
    }

    /// Receive clan events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ClanEvent> {
        self.events.subscribe()
    }

    /// Look up a clan by name or id.
    pub async fn get_clan(&self, name: &str) -> Result<Option<ClanData>, ClanError> {
        self.store.get(&to_id(name)).await
    }

    pub async fn list_clans(&self) -> Result<Vec<ClanData>, ClanError> {
        self.store.list().await
    }

    /// Recreate missing rooms for persisted clans, e.g. after a restart.
    pub async fn restore_channels(&self) -> Result<usize, ClanError> {
        let mut restored = 0;
        for clan in self.store.list().await? {
            if self.channels.channel_exists(&clan.id).await {
                continue;
            }
            let metadata = ChannelMetadata::for_clan(&clan.name, &clan.leader);
            match self.channels.create_channel(&clan.id, &metadata).await {
                Ok(()) => restored += 1,
                Err(e) => tracing::warn!("Failed to restore room for clan {}: {}", clan.id, e),
            }
        }
        Ok(restored)
    }

    /// Create a clan led by `leader`.
    ///
    /// The record is saved first and the room created second; if the room
    /// cannot be created the record is deleted again and the whole operation
    /// fails.
    pub async fn create_clan(
        &self,
        actor: &Actor,
        name: &str,
        leader: &str,
    ) -> Result<ClanData, ClanError> {
        authorize(Capability::Elevated, actor, None, "create clans")?;

        let name = name.trim();
        if name.is_empty() {
            return Err(ClanError::InvalidName("Clan name cannot be empty.".to_string()));
        }
        let id = to_id(name);
        if id.is_empty() {
            return Err(ClanError::InvalidName(format!(
                "Clan name '{}' must contain at least one letter or digit.",
                name
            )));
        }
        let leader_id = to_id(leader);
        if leader_id.is_empty() {
            return Err(ClanError::InvalidInput(
                "Leader username is required.".to_string(),
            ));
        }

        let _guard = self.locks.acquire(&id).await;

        if self.store.get(&id).await?.is_some() || self.channels.channel_exists(&id).await {
            return Err(ClanError::DuplicateClan(id));
        }

        let clan = ClanData::new(id.clone(), name.to_string(), leader_id.clone(), timestamp());
        self.store.save(&clan).await?;

        let metadata = ChannelMetadata::for_clan(name, &leader_id);
        if let Err(e) = self.channels.create_channel(&id, &metadata).await {
            tracing::warn!("Room creation failed for clan {}, rolling back: {}", id, e);
            if let Err(rollback) = self.store.delete(&id).await {
                tracing::error!("Rollback of clan {} failed: {}", id, rollback);
            }
            return Err(ClanError::ExternalCollaborator(format!(
                "Failed to create clan room '{}': {}",
                id, e
            )));
        }

        tracing::info!(clan = %id, leader = %leader_id, actor = %actor.id, "Clan created");
        self.channels
            .post_system_message(
                &id,
                &format!(
                    "The clan {} has been created with {} as the leader.",
                    name,
                    leader.trim()
                ),
            )
            .await;
        self.audit.record(AuditEntry::new(
            actions::CLAN_CREATE,
            &actor.id,
            format!("{} (leader: {}, by {})", name, leader_id, actor.name),
        ));
        self.publish(ClanEvent::Created {
            clan_id: id,
            leader: leader_id,
        });

        Ok(clan)
    }

    /// Delete a clan and tear down its room. Returns the removed record.
    pub async fn delete_clan(&self, actor: &Actor, name: &str) -> Result<ClanData, ClanError> {
        authorize(Capability::Elevated, actor, None, "delete clans")?;

        let id = to_id(name);
        let _guard = self.locks.acquire(&id).await;
        let clan = self.load(&id, name).await?;

        if !self.store.delete(&id).await? {
            return Err(ClanError::UnknownClan(name.trim().to_string()));
        }

        // Members see the notice before the room goes away
        self.channels
            .post_system_message(
                &id,
                &format!("The clan {} has been deleted by {}.", clan.name, actor.name),
            )
            .await;

        tracing::info!(clan = %id, actor = %actor.id, "Clan deleted");
        self.audit.record(AuditEntry::new(
            actions::CLAN_DELETE,
            &actor.id,
            format!("{} (by {})", clan.name, actor.name),
        ));
        self.publish(ClanEvent::Deleted {
            clan_id: id.clone(),
        });

        if self.channels.channel_exists(&id).await {
            if let Err(e) = self.channels.destroy_channel(&id).await {
                tracing::warn!("Clan {} deleted but its room survived: {}", id, e);
                return Err(ClanError::ExternalCollaborator(format!(
                    "Clan \"{}\" was deleted but its room could not be destroyed: {}",
                    clan.name, e
                )));
            }
        }

        Ok(clan)
    }

    /// Give or take points. `amount` must be positive.
    pub async fn adjust_points(
        &self,
        actor: &Actor,
        name: &str,
        amount: i64,
        direction: PointsDirection,
    ) -> Result<ClanData, ClanError> {
        authorize(Capability::Elevated, actor, None, "adjust clan points")?;
        if amount <= 0 {
            return Err(ClanError::InvalidAmount(
                "Points must be a positive number.".to_string(),
            ));
        }

        let (clan, _) = self
            .update(actor, name, Capability::Elevated, "adjust clan points", |clan| {
                clan.points = match direction {
                    PointsDirection::Give => clan.points.checked_add(amount).ok_or_else(|| {
                        ClanError::InvalidAmount(format!(
                            "Giving {} points would overflow the balance of clan \"{}\".",
                            amount, clan.name
                        ))
                    })?,
                    PointsDirection::Take if clan.points < amount => {
                        return Err(ClanError::InsufficientPoints {
                            clan: clan.name.clone(),
                            available: clan.points,
                            requested: amount,
                        })
                    }
                    PointsDirection::Take => clan.points - amount,
                };
                Ok(())
            })
            .await?;

        let (action, notice, delta) = match direction {
            PointsDirection::Give => (
                actions::GIVE_POINTS,
                format!(
                    "{} has given {} points to the clan. Total points: {}",
                    actor.name, amount, clan.points
                ),
                amount,
            ),
            PointsDirection::Take => (
                actions::TAKE_POINTS,
                format!(
                    "{} has deducted {} points from the clan. Total points: {}",
                    actor.name, amount, clan.points
                ),
                -amount,
            ),
        };
        let preposition = if delta > 0 { "to" } else { "from" };
        self.report(
            &clan,
            actor,
            action,
            format!("{} points {} {} (by {})", amount, preposition, clan.name, actor.name),
            notice,
            ClanEvent::PointsChanged {
                clan_id: clan.id.clone(),
                delta,
                total: clan.points,
            },
        )
        .await;

        Ok(clan)
    }

    /// Set a member's rank (1-5).
    ///
    /// Promoting someone to Leader demotes the previous Leader to Deputy in the
    /// same write. The current Leader cannot be demoted directly.
    pub async fn set_rank(
        &self,
        actor: &Actor,
        name: &str,
        user: &str,
        level: u8,
    ) -> Result<ClanData, ClanError> {
        let rank = ClanRank::from_level(level).ok_or_else(|| {
            ClanError::InvalidRank(format!("Rank must be between 1 and 5, got {}.", level))
        })?;
        let user_id = to_id(user);

        let mut demoted = None;
        let (clan, changed) = self
            .update(actor, name, Capability::ElevatedOrLeader, "change member ranks", |clan| {
                let current = clan.rank_of(&user_id).ok_or_else(|| ClanError::UnknownMember {
                    clan: clan.name.clone(),
                    user: user_id.clone(),
                })?;
                if current == rank {
                    return Ok(());
                }
                if current == ClanRank::Leader {
                    return Err(ClanError::InvalidRank(
                        "The clan leader cannot be demoted; promote another member to Leader instead."
                            .to_string(),
                    ));
                }
                if rank == ClanRank::Leader {
                    let previous = clan.leader.clone();
                    if let Some(member) = clan.member_mut(&previous) {
                        member.rank = ClanRank::Deputy;
                    }
                    clan.leader = user_id.clone();
                    demoted = Some(previous);
                }
                if let Some(member) = clan.member_mut(&user_id) {
                    member.rank = rank;
                }
                Ok(())
            })
            .await?;
        if !changed {
            return Ok(clan);
        }

        let mut notice = format!("{} is now a clan {}.", user.trim(), rank);
        if let Some(previous) = &demoted {
            notice.push_str(&format!(" {} has been demoted to Deputy.", previous));
            self.publish(ClanEvent::RankChanged {
                clan_id: clan.id.clone(),
                user_id: previous.clone(),
                rank: ClanRank::Deputy,
            });
        }
        self.report(
            &clan,
            actor,
            actions::CLAN_RANK,
            format!("{}: {} to {} (by {})", clan.name, user_id, rank, actor.name),
            notice,
            ClanEvent::RankChanged {
                clan_id: clan.id.clone(),
                user_id,
                rank,
            },
        )
        .await;

        Ok(clan)
    }

    /// Set or clear (`None` or blank) the clan icon URL.
    pub async fn set_clan_icon(
        &self,
        actor: &Actor,
        name: &str,
        icon: Option<&str>,
    ) -> Result<ClanData, ClanError> {
        let icon = non_blank(icon);
        let action = if icon.is_some() {
            "set the clan icon"
        } else {
            "remove the clan icon"
        };

        let (clan, changed) = self
            .update(actor, name, Capability::ElevatedOrLeader, action, |clan| {
                clan.icon = icon.clone();
                Ok(())
            })
            .await?;
        if !changed {
            return Ok(clan);
        }

        let (audit_action, notice) = match &icon {
            Some(_) => (actions::SET_ICON, format!("{} has set a new clan icon.", actor.name)),
            None => (
                actions::REMOVE_ICON,
                format!("{} has removed the clan icon.", actor.name),
            ),
        };
        self.report(
            &clan,
            actor,
            audit_action,
            clan.name.clone(),
            notice,
            ClanEvent::IconChanged {
                clan_id: clan.id.clone(),
                icon,
            },
        )
        .await;

        Ok(clan)
    }

    /// Set or clear (`None` or blank) the clan description.
    pub async fn set_clan_description(
        &self,
        actor: &Actor,
        name: &str,
        description: Option<&str>,
    ) -> Result<ClanData, ClanError> {
        let description = non_blank(description);
        let action = if description.is_some() {
            "set the clan description"
        } else {
            "remove the clan description"
        };

        let (clan, changed) = self
            .update(actor, name, Capability::ElevatedOrLeader, action, |clan| {
                clan.description = description.clone();
                Ok(())
            })
            .await?;
        if !changed {
            return Ok(clan);
        }

        let (audit_action, notice) = match &description {
            Some(_) => (
                actions::SET_DESC,
                format!("{} has set a new clan description.", actor.name),
            ),
            None => (
                actions::REMOVE_DESC,
                format!("{} has removed the clan description.", actor.name),
            ),
        };
        self.report(
            &clan,
            actor,
            audit_action,
            clan.name.clone(),
            notice,
            ClanEvent::DescriptionChanged {
                clan_id: clan.id.clone(),
                description,
            },
        )
        .await;

        Ok(clan)
    }

    /// Admit a user as a Recruit.
    pub async fn add_member(
        &self,
        actor: &Actor,
        name: &str,
        user: &str,
    ) -> Result<ClanData, ClanError> {
        let user_id = to_id(user);
        if user_id.is_empty() {
            return Err(ClanError::InvalidInput("Username is required.".to_string()));
        }

        let (clan, _) = self
            .update(actor, name, Capability::ElevatedOrLeader, "add members", |clan| {
                if clan.member(&user_id).is_some() {
                    return Err(ClanError::InvalidInput(format!(
                        "User '{}' is already a member of clan \"{}\".",
                        user_id, clan.name
                    )));
                }
                clan.members.push(ClanMember {
                    id: user_id.clone(),
                    rank: ClanRank::Recruit,
                    joined_at: timestamp(),
                });
                Ok(())
            })
            .await?;

        self.report(
            &clan,
            actor,
            actions::ADD_MEMBER,
            format!("{}: {} (by {})", clan.name, user_id, actor.name),
            format!("{} has joined the clan as a Recruit.", user.trim()),
            ClanEvent::MemberAdded {
                clan_id: clan.id.clone(),
                user_id,
            },
        )
        .await;

        Ok(clan)
    }

    /// Remove a non-leader member.
    pub async fn remove_member(
        &self,
        actor: &Actor,
        name: &str,
        user: &str,
    ) -> Result<ClanData, ClanError> {
        let user_id = to_id(user);

        let (clan, _) = self
            .update(actor, name, Capability::ElevatedOrLeader, "remove members", |clan| {
                match clan.rank_of(&user_id) {
                    None => Err(ClanError::UnknownMember {
                        clan: clan.name.clone(),
                        user: user_id.clone(),
                    }),
                    Some(ClanRank::Leader) => Err(ClanError::InvalidRank(
                        "The clan leader cannot be removed from the clan.".to_string(),
                    )),
                    Some(_) => {
                        clan.members.retain(|m| m.id != user_id);
                        Ok(())
                    }
                }
            })
            .await?;

        self.report(
            &clan,
            actor,
            actions::REMOVE_MEMBER,
            format!("{}: {} (by {})", clan.name, user_id, actor.name),
            format!("{} has been removed from the clan.", user.trim()),
            ClanEvent::MemberRemoved {
                clan_id: clan.id.clone(),
                user_id,
            },
        )
        .await;

        Ok(clan)
    }

    /// Locked read-modify-write of one clan record.
    ///
    /// Returns the record and whether `mutate` changed it. Unchanged records
    /// are not written back.
    async fn update<F>(
        &self,
        actor: &Actor,
        name: &str,
        capability: Capability,
        action: &str,
        mutate: F,
    ) -> Result<(ClanData, bool), ClanError>
    where
        F: FnOnce(&mut ClanData) -> Result<(), ClanError>,
    {
        let id = to_id(name);
        let _guard = self.locks.acquire(&id).await;

        let original = self.load(&id, name).await?;
        authorize(capability, actor, Some(&original), action)?;
        let mut clan = original.clone();
        mutate(&mut clan)?;
        if clan == original {
            return Ok((clan, false));
        }
        debug_assert_eq!(clan.validate(), Ok(()));

        self.store.save(&clan).await?;
        Ok((clan, true))
    }

    async fn load(&self, id: &str, name: &str) -> Result<ClanData, ClanError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| ClanError::UnknownClan(name.trim().to_string()))
    }

    async fn report(
        &self,
        clan: &ClanData,
        actor: &Actor,
        action: &str,
        detail: String,
        notice: String,
        event: ClanEvent,
    ) {
        tracing::info!(clan = %clan.id, actor = %actor.id, action, "{}", detail);
        self.channels.post_system_message(&clan.id, &notice).await;
        self.audit.record(AuditEntry::new(action, &actor.id, detail));
        self.publish(event);
    }

    fn publish(&self, event: ClanEvent) {
        tracing::trace!(clan = event.clan_id(), "Publishing clan event");
        // No subscribers is not an error
        let _ = self.events.send(event);
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
