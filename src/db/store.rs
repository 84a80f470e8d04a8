//! Keyed storage contract the registry persists clans through.

use async_trait::async_trait;

use crate::errors::ClanError;
use crate::models::ClanData;

/// Durable clan records addressed by normalized clan id.
///
/// Implementations do no business validation. A failed `save` or `delete`
/// means nothing was committed and is reported as [`ClanError::Persistence`].
#[async_trait]
pub trait ClanStore: Send + Sync {
    /// Look up a clan. Absence is `Ok(None)`.
    async fn get(&self, id: &str) -> Result<Option<ClanData>, ClanError>;

    /// Upsert the full record, members included, in one transaction.
    async fn save(&self, clan: &ClanData) -> Result<(), ClanError>;

    /// Remove a clan and its members. Returns whether a row existed.
    async fn delete(&self, id: &str) -> Result<bool, ClanError>;

    /// All clans ordered by id.
    async fn list(&self) -> Result<Vec<ClanData>, ClanError>;
}
