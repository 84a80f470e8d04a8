//! SQLite repository for clans and the modlog.
//!
//! Uses prepared statements and transactions for data integrity.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::ClanStore;
use crate::errors::ClanError;
use crate::models::{AuditEntry, ClanData, ClanMember, ClanRank};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== MODLOG OPERATIONS ====================

    /// Append a modlog entry.
    pub async fn insert_audit(&self, entry: &AuditEntry) -> Result<(), ClanError> {
        sqlx::query(
            "INSERT INTO modlog (id, action, actor, detail, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&entry.id)
        .bind(&entry.action)
        .bind(&entry.actor)
        .bind(&entry.detail)
        .bind(entry.created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent modlog entries, newest first.
    pub async fn list_audit(&self, limit: u32) -> Result<Vec<AuditEntry>, ClanError> {
        let rows = sqlx::query(
            "SELECT id, action, actor, detail, created_at FROM modlog ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(audit_from_row).collect()
    }
}

#[async_trait]
impl ClanStore for Repository {
    async fn get(&self, id: &str) -> Result<Option<ClanData>, ClanError> {
        // One read transaction so the clan row and its members come from the same snapshot
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT id, name, leader, points, icon, description, created_at FROM clans WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let members = load_members(&mut *tx, id).await?;
        tx.commit().await?;
        clan_from_row(&row, members).map(Some)
    }

    async fn save(&self, clan: &ClanData) -> Result<(), ClanError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO clans (id, name, leader, points, icon, description, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                   name = excluded.name,
                   leader = excluded.leader,
                   points = excluded.points,
                   icon = excluded.icon,
                   description = excluded.description"#,
        )
        .bind(&clan.id)
        .bind(&clan.name)
        .bind(&clan.leader)
        .bind(clan.points)
        .bind(&clan.icon)
        .bind(&clan.description)
        .bind(clan.created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&mut *tx)
        .await?;

        // Members are rewritten wholesale so the stored set always equals the record
        sqlx::query("DELETE FROM clan_members WHERE clan_id = ?")
            .bind(&clan.id)
            .execute(&mut *tx)
            .await?;

        for member in &clan.members {
            sqlx::query(
                "INSERT INTO clan_members (clan_id, user_id, rank, joined_at) VALUES (?, ?, ?, ?)",
            )
            .bind(&clan.id)
            .bind(&member.id)
            .bind(i64::from(member.rank.level()))
            .bind(member.joined_at.to_rfc3339_opts(SecondsFormat::Micros, true))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, ClanError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM clan_members WHERE clan_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM clans WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<ClanData>, ClanError> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(
            "SELECT id, name, leader, points, icon, description, created_at FROM clans ORDER BY id",
        )
        .fetch_all(&mut *tx)
        .await?;

        let mut clans = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.try_get("id")?;
            let members = load_members(&mut *tx, &id).await?;
            clans.push(clan_from_row(row, members)?);
        }
        tx.commit().await?;
        Ok(clans)
    }
}

// Helper functions for row conversion

async fn load_members(
    conn: &mut SqliteConnection,
    clan_id: &str,
) -> Result<Vec<ClanMember>, ClanError> {
    let rows = sqlx::query(
        "SELECT user_id, rank, joined_at FROM clan_members WHERE clan_id = ? ORDER BY rank DESC, joined_at, user_id",
    )
    .bind(clan_id)
    .fetch_all(conn)
    .await?;

    rows.iter().map(member_from_row).collect()
}

fn clan_from_row(
    row: &sqlx::sqlite::SqliteRow,
    members: Vec<ClanMember>,
) -> Result<ClanData, ClanError> {
    let created_at: String = row.try_get("created_at")?;
    Ok(ClanData {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        leader: row.try_get("leader")?,
        members,
        points: row.try_get("points")?,
        icon: row.try_get("icon")?,
        description: row.try_get("description")?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn member_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ClanMember, ClanError> {
    let level: i64 = row.try_get("rank")?;
    let rank = u8::try_from(level)
        .ok()
        .and_then(ClanRank::from_level)
        .ok_or_else(|| ClanError::Persistence(format!("Stored rank {} is out of range", level)))?;
    let joined_at: String = row.try_get("joined_at")?;
    Ok(ClanMember {
        id: row.try_get("user_id")?,
        rank,
        joined_at: parse_timestamp(&joined_at)?,
    })
}

fn audit_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<AuditEntry, ClanError> {
    let created_at: String = row.try_get("created_at")?;
    Ok(AuditEntry {
        id: row.try_get("id")?,
        action: row.try_get("action")?,
        actor: row.try_get("actor")?,
        detail: row.try_get("detail")?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, ClanError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ClanError::Persistence(format!("Invalid stored timestamp '{}': {}", s, e)))
}
