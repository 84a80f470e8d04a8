//! Clan channel collaborator.
//!
//! Each clan owns one private chat room keyed by the clan id. The registry only
//! talks to rooms through [`ChannelHost`]; [`RoomDirectory`] is the in-process
//! room namespace used by the standalone service.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::models::{to_id, ClanRank};

/// System lines kept per room; older lines are dropped.
pub const ROOM_LOG_CAPACITY: usize = 100;

/// Settings a clan room is created with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMetadata {
    pub title: String,
    pub leader: String,
    pub is_private: bool,
    /// Minimum room symbol required to join
    pub modjoin: char,
    pub rank_symbols: Vec<(ClanRank, char)>,
}

impl ChannelMetadata {
    pub fn for_clan(title: &str, leader: &str) -> Self {
        Self {
            title: title.to_string(),
            leader: leader.to_string(),
            is_private: true,
            modjoin: '+',
            rank_symbols: ClanRank::ALL
                .into_iter()
                .filter_map(|rank| rank.room_symbol().map(|symbol| (rank, symbol)))
                .collect(),
        }
    }
}

/// Failure reported by the channel host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelError(pub String);

impl std::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ChannelError {}

/// Room lifecycle operations the registry depends on.
#[async_trait]
pub trait ChannelHost: Send + Sync {
    /// Whether any room, clan-owned or not, already uses this id.
    async fn channel_exists(&self, id: &str) -> bool;

    async fn create_channel(&self, id: &str, metadata: &ChannelMetadata)
        -> Result<(), ChannelError>;

    async fn destroy_channel(&self, id: &str) -> Result<(), ChannelError>;

    /// Post a system line to the room. Missing rooms are ignored.
    async fn post_system_message(&self, id: &str, text: &str);
}

/// A room known to the directory.
#[derive(Debug, Clone)]
pub struct Room {
    pub title: String,
    pub metadata: Option<ChannelMetadata>,
    /// user id -> room auth symbol
    pub auth: HashMap<String, char>,
    /// Most recent system lines, oldest first
    pub log: VecDeque<String>,
}

/// In-memory room namespace.
#[derive(Default)]
pub struct RoomDirectory {
    rooms: RwLock<HashMap<String, Room>>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed rooms that exist independently of any clan, keyed by their
    /// normalized id so they share the clan id namespace.
    pub fn with_reserved<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rooms = titles
            .into_iter()
            .filter_map(|title| {
                let title = title.into();
                let id = to_id(&title);
                if id.is_empty() {
                    return None;
                }
                let room = Room {
                    title,
                    metadata: None,
                    auth: HashMap::new(),
                    log: VecDeque::new(),
                };
                Some((id, room))
            })
            .collect();
        Self {
            rooms: RwLock::new(rooms),
        }
    }

    pub async fn room(&self, id: &str) -> Option<Room> {
        self.rooms.read().await.get(id).cloned()
    }

    pub async fn messages(&self, id: &str) -> Vec<String> {
        self.rooms
            .read()
            .await
            .get(id)
            .map(|room| room.log.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChannelHost for RoomDirectory {
    async fn channel_exists(&self, id: &str) -> bool {
        self.rooms.read().await.contains_key(id)
    }

    async fn create_channel(
        &self,
        id: &str,
        metadata: &ChannelMetadata,
    ) -> Result<(), ChannelError> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(id) {
            return Err(ChannelError(format!("Room '{}' already exists.", id)));
        }

        let mut auth = HashMap::new();
        if let Some(symbol) = ClanRank::Leader.room_symbol() {
            auth.insert(metadata.leader.clone(), symbol);
        }
        rooms.insert(
            id.to_string(),
            Room {
                title: metadata.title.clone(),
                metadata: Some(metadata.clone()),
                auth,
                log: VecDeque::new(),
            },
        );
        tracing::debug!(room = id, "Created clan room");
        Ok(())
    }

    async fn destroy_channel(&self, id: &str) -> Result<(), ChannelError> {
        match self.rooms.write().await.remove(id) {
            Some(_) => {
                tracing::debug!(room = id, "Destroyed clan room");
                Ok(())
            }
            None => Err(ChannelError(format!("Room '{}' does not exist.", id))),
        }
    }

    async fn post_system_message(&self, id: &str, text: &str) {
        if let Some(room) = self.rooms.write().await.get_mut(id) {
            if room.log.len() == ROOM_LOG_CAPACITY {
                room.log.pop_front();
            }
            room.log.push_back(format!("|c|~|{}", text));
        }
    }
}
