use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::MessageOutbox;
use crate::outbox::error::OutboxError;
use crate::outbox::event::Event;
use crate::outbox::message::{MessageType, OutboxMessage};
use crate::persistence::PgTransaction;

// ============================================================================
// PostgreSQL Message Outbox
// ============================================================================
//
// `position` is a BIGSERIAL that breaks ties between messages saved in the
// same instant. Pending rows are selected FOR UPDATE SKIP LOCKED so that
// concurrent processors never deliver the same row twice at once.
//
// ============================================================================

#[derive(FromRow)]
struct OutboxMessageRow {
    id: Uuid,
    occurred_at: DateTime<Utc>,
    #[sqlx(rename = "type")]
    message_type: String,
    payload: Json<serde_json::Value>,
    processed_at: Option<DateTime<Utc>>,
}

impl From<OutboxMessageRow> for OutboxMessage {
    fn from(row: OutboxMessageRow) -> Self {
        Self {
            id: row.id,
            occurred_at: row.occurred_at,
            message_type: MessageType::new(row.message_type),
            payload: row.payload.0,
            processed_at: row.processed_at,
        }
    }
}

#[derive(Default)]
pub struct PostgresMessageOutbox;

impl PostgresMessageOutbox {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MessageOutbox for PostgresMessageOutbox {
    type Tx = PgTransaction;

    async fn save(&self, tx: &mut Self::Tx, event: &dyn Event) -> Result<OutboxMessage, OutboxError> {
        let message = OutboxMessage::pending(event)?;

        sqlx::query(
            r#"
            INSERT INTO outbox_messages (id, occurred_at, type, payload)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(message.id)
        .bind(message.occurred_at)
        .bind(message.message_type.as_str())
        .bind(Json(&message.payload))
        .execute(&mut **tx)
        .await
        .map_err(OutboxError::storage)?;

        tracing::debug!(
            message_id = %message.id,
            message_type = %message.message_type,
            "Saved outbox message"
        );
        Ok(message)
    }

    async fn to_publish(&self, tx: &mut Self::Tx, limit: usize) -> Result<Vec<OutboxMessage>, OutboxError> {
        let rows: Vec<OutboxMessageRow> = sqlx::query_as::<_, OutboxMessageRow>(
            r#"
            SELECT id, occurred_at, type, payload, processed_at
            FROM outbox_messages
            WHERE processed_at IS NULL
            ORDER BY occurred_at ASC, position ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&mut **tx)
        .await
        .map_err(OutboxError::storage)?;

        Ok(rows.into_iter().map(OutboxMessage::from).collect())
    }

    async fn lock_pending(&self, tx: &mut Self::Tx, message: &OutboxMessage) -> Result<bool, OutboxError> {
        let locked: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM outbox_messages
            WHERE id = $1 AND processed_at IS NULL
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(message.id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(OutboxError::storage)?;

        Ok(locked.is_some())
    }

    async fn mark_as_published(&self, tx: &mut Self::Tx, message: &OutboxMessage) -> Result<(), OutboxError> {
        sqlx::query("UPDATE outbox_messages SET processed_at = COALESCE(processed_at, $2) WHERE id = $1")
            .bind(message.id)
            .bind(Utc::now())
            .execute(&mut **tx)
            .await
            .map_err(OutboxError::storage)?;

        Ok(())
    }
}

// ============================================================================
// Integration Tests
// ============================================================================
