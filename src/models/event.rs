//! Clan events broadcast after successful mutations, and modlog entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{timestamp, ClanRank};

/// State change published for room-sync consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClanEvent {
    Created {
        clan_id: String,
        leader: String,
    },
    Deleted {
        clan_id: String,
    },
    PointsChanged {
        clan_id: String,
        delta: i64,
        total: i64,
    },
    IconChanged {
        clan_id: String,
        icon: Option<String>,
    },
    DescriptionChanged {
        clan_id: String,
        description: Option<String>,
    },
    RankChanged {
        clan_id: String,
        user_id: String,
        rank: ClanRank,
    },
    MemberAdded {
        clan_id: String,
        user_id: String,
    },
    MemberRemoved {
        clan_id: String,
        user_id: String,
    },
}

impl ClanEvent {
    pub fn clan_id(&self) -> &str {
        match self {
            ClanEvent::Created { clan_id, .. }
            | ClanEvent::Deleted { clan_id }
            | ClanEvent::PointsChanged { clan_id, .. }
            | ClanEvent::IconChanged { clan_id, .. }
            | ClanEvent::DescriptionChanged { clan_id, .. }
            | ClanEvent::RankChanged { clan_id, .. }
            | ClanEvent::MemberAdded { clan_id, .. }
            | ClanEvent::MemberRemoved { clan_id, .. } => clan_id,
        }
    }
}

/// Moderation log action names.
pub mod actions {
    pub const CLAN_CREATE: &str = "CLANCREATE";
    pub const CLAN_DELETE: &str = "CLANDELETE";
    pub const GIVE_POINTS: &str = "GIVEPOINTS";
    pub const TAKE_POINTS: &str = "TAKEPOINTS";
    pub const SET_ICON: &str = "SETCLANICON";
    pub const REMOVE_ICON: &str = "REMOVECLANICON";
    pub const SET_DESC: &str = "SETCLANDESC";
    pub const REMOVE_DESC: &str = "REMOVECLANDESC";
    pub const CLAN_RANK: &str = "CLANRANK";
    pub const ADD_MEMBER: &str = "CLANADDMEMBER";
    pub const REMOVE_MEMBER: &str = "CLANREMOVEMEMBER";
}

/// One moderation log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    pub action: String,
    pub actor: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(action: &str, actor: &str, detail: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            action: action.to_string(),
            actor: actor.to_string(),
            detail: detail.into(),
            created_at: timestamp(),
        }
    }
}
