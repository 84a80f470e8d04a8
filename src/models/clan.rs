//! Clan and member models.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Points every new clan starts with.
pub const STARTING_POINTS: i64 = 1000;

/// Current time at the microsecond precision the store keeps.
pub fn timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Ordinal authority level within a clan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ClanRank {
    Recruit = 1,
    Member = 2,
    Senior = 3,
    Deputy = 4,
    Leader = 5,
}

impl ClanRank {
    /// All ranks, highest first.
    pub const ALL: [ClanRank; 5] = [
        ClanRank::Leader,
        ClanRank::Deputy,
        ClanRank::Senior,
        ClanRank::Member,
        ClanRank::Recruit,
    ];

    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            5 => Some(ClanRank::Leader),
            4 => Some(ClanRank::Deputy),
            3 => Some(ClanRank::Senior),
            2 => Some(ClanRank::Member),
            1 => Some(ClanRank::Recruit),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ClanRank::Leader => "Leader",
            ClanRank::Deputy => "Deputy",
            ClanRank::Senior => "Senior",
            ClanRank::Member => "Member",
            ClanRank::Recruit => "Recruit",
        }
    }

    /// Parse a rank from its name (case-insensitive) or its numeric level.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(level) = s.parse::<u8>() {
            return Self::from_level(level);
        }
        Self::ALL
            .into_iter()
            .find(|rank| rank.name().eq_ignore_ascii_case(s))
    }

    /// Room auth symbol granted to this rank in the clan channel.
    pub fn room_symbol(self) -> Option<char> {
        match self {
            ClanRank::Leader => Some('#'),
            ClanRank::Deputy => Some('@'),
            ClanRank::Senior => Some('%'),
            ClanRank::Member => Some('+'),
            ClanRank::Recruit => None,
        }
    }
}

impl From<ClanRank> for u8 {
    fn from(rank: ClanRank) -> Self {
        rank.level()
    }
}

impl TryFrom<u8> for ClanRank {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        ClanRank::from_level(level).ok_or_else(|| format!("Invalid clan rank: {}", level))
    }
}

impl std::fmt::Display for ClanRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A user admitted to a clan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClanMember {
    pub id: String,
    pub rank: ClanRank,
    pub joined_at: DateTime<Utc>,
}

/// A clan record as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClanData {
    pub id: String,
    pub name: String,
    pub leader: String,
    pub members: Vec<ClanMember>,
    pub points: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ClanData {
    /// Build a fresh clan whose only member is its leader.
    pub fn new(id: String, name: String, leader_id: String, now: DateTime<Utc>) -> Self {
        let now = now.trunc_subsecs(6);
        Self {
            id,
            name,
            leader: leader_id.clone(),
            members: vec![ClanMember {
                id: leader_id,
                rank: ClanRank::Leader,
                joined_at: now,
            }],
            points: STARTING_POINTS,
            icon: None,
            description: None,
            created_at: now,
        }
    }

    pub fn member(&self, user_id: &str) -> Option<&ClanMember> {
        self.members.iter().find(|m| m.id == user_id)
    }

    pub fn member_mut(&mut self, user_id: &str) -> Option<&mut ClanMember> {
        self.members.iter_mut().find(|m| m.id == user_id)
    }

    pub fn rank_of(&self, user_id: &str) -> Option<ClanRank> {
        self.member(user_id).map(|m| m.rank)
    }

    /// Check the structural invariants of the record.
    pub fn validate(&self) -> Result<(), String> {
        if self.points < 0 {
            return Err(format!("clan {} has negative points", self.id));
        }
        let leaders: Vec<&ClanMember> = self
            .members
            .iter()
            .filter(|m| m.rank == ClanRank::Leader)
            .collect();
        match leaders.as_slice() {
            [only] if only.id == self.leader => {}
            [only] => {
                return Err(format!(
                    "clan {} leader field '{}' does not match leader member '{}'",
                    self.id, self.leader, only.id
                ))
            }
            other => {
                return Err(format!(
                    "clan {} has {} leaders",
                    self.id,
                    other.len()
                ))
            }
        }
        for (i, member) in self.members.iter().enumerate() {
            if self.members[..i].iter().any(|m| m.id == member.id) {
                return Err(format!("clan {} lists '{}' twice", self.id, member.id));
            }
        }
        Ok(())
    }
}
