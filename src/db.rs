use crate::ports::{RegistrationStore, StoreError};
use crate::types::{ChannelId, CommunityId, CompletionRecord, Registration, UserId};

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use time::OffsetDateTime;

const REGISTRATION_COLUMNS: &str = "guild_id, user_id, username, channel_id, is_active, added_at";

pub async fn connect(database_url: &str) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct RegistrationRow {
    guild_id: i64,
    user_id: i64,
    username: Option<String>,
    channel_id: Option<i64>,
    is_active: bool,
    added_at: OffsetDateTime,
}

impl From<RegistrationRow> for Registration {
    fn from(row: RegistrationRow) -> Self {
        Registration {
            community: CommunityId::from_db(row.guild_id),
            user: UserId::from_db(row.user_id),
            display_name: row.username,
            channel: row.channel_id.map(ChannelId::from_db),
            is_active: row.is_active,
            added_at: row.added_at,
        }
    }
}

#[derive(Clone)]
pub struct PgRegistrationStore {
    pool: PgPool,
}

impl PgRegistrationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegistrationStore for PgRegistrationStore {
    async fn find(
        &self,
        community: CommunityId,
        user: UserId,
    ) -> Result<Option<Registration>, StoreError> {
        let query = format!(
            "SELECT {REGISTRATION_COLUMNS} FROM party_registrations \
             WHERE guild_id = $1 AND user_id = $2"
        );
        let row = sqlx::query_as::<_, RegistrationRow>(&query)
            .bind(community.to_db())
            .bind(user.to_db())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Registration::from))
    }

    async fn upsert(
        &self,
        community: CommunityId,
        user: UserId,
        display_name: Option<&str>,
        channel: Option<ChannelId>,
    ) -> Result<Registration, StoreError> {
        let query = format!(
            "INSERT INTO party_registrations (guild_id, user_id, username, channel_id, is_active) \
             VALUES ($1, $2, $3, $4, TRUE) \
             ON CONFLICT (guild_id, user_id) DO UPDATE SET \
                username = COALESCE(EXCLUDED.username, party_registrations.username), \
                channel_id = COALESCE(EXCLUDED.channel_id, party_registrations.channel_id), \
                is_active = TRUE \
             RETURNING {REGISTRATION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, RegistrationRow>(&query)
            .bind(community.to_db())
            .bind(user.to_db())
            .bind(display_name)
            .bind(channel.map(ChannelId::to_db))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn list(&self) -> Result<Vec<Registration>, StoreError> {
        let query = format!(
            "SELECT {REGISTRATION_COLUMNS} FROM party_registrations \
             ORDER BY guild_id, added_at"
        );
        let rows = sqlx::query_as::<_, RegistrationRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Registration::from).collect())
    }

    async fn record_completion(&self, record: &CompletionRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO party_history (completed_at, completed_by, guild_id) VALUES ($1, $2, $3)",
        )
        .bind(record.completed_at)
        .bind(record.completed_by.to_db())
        .bind(record.community.to_db())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn completion_count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM party_history")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
