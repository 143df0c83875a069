//! PostgreSQL implementation of link repository.

use async_trait::async_trait;
use serde_json::json;
use sqlx::PgPool;
use sqlx::types::Json;
use std::collections::BTreeMap;
use std::sync::Arc;
use validator::Validate;

use crate::domain::entities::LinkRecord;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

/// Row shape of the `links` table.
#[derive(sqlx::FromRow)]
struct LinkRow {
    id: String,
    account_id: String,
    destinations: Json<BTreeMap<String, String>>,
}

impl From<LinkRow> for LinkRecord {
    fn from(row: LinkRow) -> Self {
        LinkRecord::new(row.id, row.account_id, row.destinations.0)
    }
}

/// PostgreSQL repository for link records.
///
/// Destinations are stored as a JSONB object keyed by country code.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Inserts a record or replaces the account and destinations of an existing one.
    ///
    /// Cached copies are not invalidated and stay visible until their TTL runs out.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the record fails validation (e.g. a
    /// destination that is not an http(s) URL) and [`AppError::Internal`] on
    /// database errors.
    pub async fn upsert(&self, record: &LinkRecord) -> Result<LinkRecord, AppError> {
        record.validate().map_err(|e| {
            AppError::bad_request(
                format!("Invalid link record: {}", e),
                json!({ "id": record.id }),
            )
        })?;

        let row = sqlx::query_as::<_, LinkRow>(
            r#"
            INSERT INTO links (id, account_id, destinations)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET account_id = EXCLUDED.account_id,
                destinations = EXCLUDED.destinations,
                updated_at = NOW()
            RETURNING id, account_id, destinations
            "#,
        )
        .bind(&record.id)
        .bind(&record.account_id)
        .bind(Json(&record.destinations))
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.into())
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<LinkRecord>, AppError> {
        let row = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT id, account_id, destinations
            FROM links
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(LinkRecord::from))
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .is_ok()
    }
}
